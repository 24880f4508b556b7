//! 포지션 뷰와 트레일링 임계값.
//!
//! 포지션은 별도 레코드가 아니라 같은 `position_id`를 공유하는 주문 묶음입니다.
//! 진입 주문의 방향이 포지션 방향(롱/숏)을 결정합니다.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Order, OrderStatus, Side};

/// 전략이 제안하는 익절/손절 임계값 수정.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitAdjustment {
    pub take_profit_price: Option<Decimal>,
    pub stop_price: Option<Decimal>,
}

impl ExitAdjustment {
    pub fn is_empty(&self) -> bool {
        self.take_profit_price.is_none() && self.stop_price.is_none()
    }
}

/// 래칫 규칙으로 임계값 갱신 여부 결정.
///
/// 롱(`Side::Buy` 진입)은 임계값이 올라갈 때만, 숏은 내려갈 때만 받아들입니다.
/// 기존 값이 없으면 항상 받아들입니다. 받아들인 새 값을 반환합니다.
pub fn ratchet(direction: Side, current: Option<Decimal>, proposed: Decimal) -> Option<Decimal> {
    match current {
        None => Some(proposed),
        Some(cur) => {
            let favorable = match direction {
                Side::Buy => proposed > cur,
                Side::Sell => proposed < cur,
            };
            favorable.then_some(proposed)
        }
    }
}

/// 주문에 래칫 규칙으로 임계값 수정 적용. 하나라도 바뀌면 `true`.
pub fn apply_exit_adjustment(order: &mut Order, direction: Side, adj: &ExitAdjustment) -> bool {
    let mut changed = false;
    if let Some(tp) = adj.take_profit_price {
        if let Some(next) = ratchet(direction, order.take_profit_price, tp) {
            order.take_profit_price = Some(next);
            changed = true;
        }
    }
    if let Some(sp) = adj.stop_price {
        if let Some(next) = ratchet(direction, order.stop_price, sp) {
            order.stop_price = Some(next);
            changed = true;
        }
    }
    changed
}

/// 포지션 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionState {
    /// 진입 주문 미체결
    PendingEntry,
    /// 진입 체결, 청산 전
    Open,
    /// 청산 완료 또는 진입 실패/취소
    Closed,
}

/// 같은 `position_id`를 가진 주문 묶음.
#[derive(Debug, Clone)]
pub struct PositionView {
    pub position_id: String,
    pub orders: Vec<Order>,
}

impl PositionView {
    /// 주문 목록으로 생성 (생성 시각 순 정렬).
    pub fn new(position_id: impl Into<String>, mut orders: Vec<Order>) -> Self {
        orders.sort_by_key(|o| o.created_at);
        Self {
            position_id: position_id.into(),
            orders,
        }
    }

    /// 진입 주문.
    pub fn entry(&self) -> Option<&Order> {
        self.orders.iter().find(|o| o.is_entry)
    }

    /// 포지션 방향 (진입 주문 방향).
    pub fn direction(&self) -> Option<Side> {
        self.entry().map(|o| o.side)
    }

    pub fn entry_price(&self) -> Option<Decimal> {
        self.orders.iter().find_map(|o| o.entry_price)
    }

    /// 미체결 청산 주문.
    pub fn open_exit_orders(&self) -> impl Iterator<Item = &Order> {
        self.orders.iter().filter(|o| !o.is_entry && o.is_open())
    }

    /// 가장 최근 주문 (트레일링 임계값을 담고 있는 주문).
    pub fn latest(&self) -> Option<&Order> {
        self.orders.last()
    }

    pub fn state(&self) -> PositionState {
        let Some(entry) = self.entry() else {
            return PositionState::Closed;
        };
        match entry.status {
            OrderStatus::Open => PositionState::PendingEntry,
            OrderStatus::Canceled | OrderStatus::Rejected => PositionState::Closed,
            OrderStatus::Closed => {
                if self.orders.iter().any(|o| !o.is_entry && o.is_filled()) {
                    PositionState::Closed
                } else {
                    PositionState::Open
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{OrderParams, OrderType};
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn order(side: Side, is_entry: bool, status: OrderStatus, created_at: i64) -> Order {
        let mut params = OrderParams::new(1, side, OrderType::Market, dec!(1));
        params.is_entry = is_entry;
        let mut o = Order::from_params("BTC/USDT", &params, None, true, created_at);
        o.position_id = "pos".to_string();
        o.status = status;
        o
    }

    #[test]
    fn test_ratchet_long_only_moves_up() {
        assert_eq!(ratchet(Side::Buy, None, dec!(90)), Some(dec!(90)));
        assert_eq!(ratchet(Side::Buy, Some(dec!(90)), dec!(95)), Some(dec!(95)));
        assert_eq!(ratchet(Side::Buy, Some(dec!(95)), dec!(92)), None);
        assert_eq!(ratchet(Side::Buy, Some(dec!(95)), dec!(95)), None);
    }

    #[test]
    fn test_ratchet_short_only_moves_down() {
        assert_eq!(ratchet(Side::Sell, Some(dec!(110)), dec!(105)), Some(dec!(105)));
        assert_eq!(ratchet(Side::Sell, Some(dec!(105)), dec!(108)), None);
    }

    #[test]
    fn test_apply_adjustment_partial() {
        let mut o = order(Side::Buy, true, OrderStatus::Closed, 0);
        o.stop_price = Some(dec!(90));
        o.take_profit_price = Some(dec!(110));

        let adj = ExitAdjustment {
            take_profit_price: Some(dec!(120)),
            stop_price: Some(dec!(85)),
        };
        assert!(apply_exit_adjustment(&mut o, Side::Buy, &adj));
        assert_eq!(o.take_profit_price, Some(dec!(120)));
        assert_eq!(o.stop_price, Some(dec!(90)));
    }

    #[test]
    fn test_position_state_transitions() {
        let entry_open = order(Side::Buy, true, OrderStatus::Open, 1);
        let view = PositionView::new("pos", vec![entry_open.clone()]);
        assert_eq!(view.state(), PositionState::PendingEntry);

        let entry_filled = order(Side::Buy, true, OrderStatus::Closed, 1);
        let tp_open = order(Side::Sell, false, OrderStatus::Open, 2);
        let view = PositionView::new("pos", vec![tp_open.clone(), entry_filled.clone()]);
        assert_eq!(view.state(), PositionState::Open);
        assert_eq!(view.open_exit_orders().count(), 1);
        assert_eq!(view.latest().map(|o| o.id.clone()), Some(tp_open.id.clone()));

        let tp_filled = order(Side::Sell, false, OrderStatus::Closed, 3);
        let view = PositionView::new("pos", vec![entry_filled, tp_open, tp_filled]);
        assert_eq!(view.state(), PositionState::Closed);

        let entry_canceled = order(Side::Buy, true, OrderStatus::Canceled, 1);
        let view = PositionView::new("pos", vec![entry_canceled]);
        assert_eq!(view.state(), PositionState::Closed);
    }

    proptest! {
        #[test]
        fn prop_long_stop_never_decreases(moves in proptest::collection::vec(1i64..10_000, 1..50)) {
            let mut current: Option<Decimal> = None;
            for m in moves {
                let proposed = Decimal::from(m);
                let before = current;
                if let Some(next) = ratchet(Side::Buy, current, proposed) {
                    current = Some(next);
                }
                if let (Some(b), Some(c)) = (before, current) {
                    prop_assert!(c >= b);
                }
            }
        }
    }
}
