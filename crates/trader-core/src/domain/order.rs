//! 주문 레코드.
//!
//! 포지션의 한 구성 주문(진입/청산/조정)을 나타내는 영속 레코드입니다.
//! 같은 `position_id`를 공유하는 주문들이 하나의 논리적 포지션을 이룹니다.
//!
//! # 불변 조건
//!
//! - `id`는 생성 시 한 번 발급되며 거래소 client order id로도 쓰입니다.
//! - `entry_price`는 진입 주문 체결 시 한 번만 설정되고 이후 변하지 않습니다.
//! - `last_checked_time`은 단조 증가합니다.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{OrderStatus, OrderType, Side};

/// 새 주문/포지션 식별자 발급 (하이픈 없는 32자리 hex).
pub fn new_order_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// 주문 생성 파라미터.
///
/// 필수 값(`bot_id`, `side`, `order_type`, `quantity`)은 생성자에서 받고,
/// 가격 관련 값은 지정하지 않으면 `None`, `is_entry`는 `false`입니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderParams {
    pub bot_id: i64,
    pub side: Side,
    pub order_type: OrderType,
    pub quantity: Decimal,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub take_profit_price: Option<Decimal>,
    #[serde(default)]
    pub stop_price: Option<Decimal>,
    #[serde(default)]
    pub is_entry: bool,
}

impl OrderParams {
    pub fn new(bot_id: i64, side: Side, order_type: OrderType, quantity: Decimal) -> Self {
        Self {
            bot_id,
            side,
            order_type,
            quantity,
            price: None,
            take_profit_price: None,
            stop_price: None,
            is_entry: false,
        }
    }

    /// 지정가/트리거 가격 설정.
    pub fn with_price(mut self, price: Decimal) -> Self {
        self.price = Some(price);
        self
    }

    pub fn with_take_profit(mut self, price: Decimal) -> Self {
        self.take_profit_price = Some(price);
        self
    }

    pub fn with_stop(mut self, price: Decimal) -> Self {
        self.stop_price = Some(price);
        self
    }

    /// 진입 주문으로 표시.
    pub fn entry(mut self) -> Self {
        self.is_entry = true;
        self
    }

    /// 제출 전 검증.
    ///
    /// 수량은 양수여야 하고, 지정가/스톱 주문은 양수 가격이 필요합니다.
    pub fn validate(&self) -> Result<(), String> {
        if self.quantity <= Decimal::ZERO {
            return Err(format!("수량은 양수여야 합니다: {}", self.quantity));
        }
        if self.order_type.requires_price() {
            match self.price {
                Some(p) if p > Decimal::ZERO => {}
                Some(p) => return Err(format!("가격은 양수여야 합니다: {}", p)),
                None => return Err(format!("{} 주문에 가격 필수", self.order_type)),
            }
        }
        Ok(())
    }
}

/// 영속화되는 주문 레코드.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// 주문 ID (거래소 client order id 겸 멱등성 키)
    pub id: String,
    /// 포지션 ID
    pub position_id: String,
    /// 봇 ID
    pub bot_id: i64,
    /// 심볼 (예: "BTC/USDT")
    pub symbol: String,
    /// 방향
    pub side: Side,
    /// 주문 유형
    pub order_type: OrderType,
    /// 지정가/트리거 가격 (시장가는 체결 전까지 None)
    pub price: Option<Decimal>,
    /// 포지션 진입 체결가
    pub entry_price: Option<Decimal>,
    /// 익절 임계값 (트레일링)
    pub take_profit_price: Option<Decimal>,
    /// 손절 임계값 (트레일링)
    pub stop_price: Option<Decimal>,
    /// 요청 수량
    pub original_quantity: Decimal,
    /// 체결 수량
    pub executed_quantity: Decimal,
    /// 진입 주문 여부
    pub is_entry: bool,
    /// 시뮬레이션 주문 여부
    pub is_test: bool,
    /// 상태
    pub status: OrderStatus,
    /// 거래소가 부여한 주문번호
    pub exchange_order_id: Option<String>,
    /// 제출 실패 사유
    pub submit_error: Option<String>,
    /// 마지막 상태 확인 시각 (ms)
    pub last_checked_time: i64,
    /// 생성 시각 (ms)
    pub created_at: i64,
}

impl Order {
    /// 파라미터로 새 주문 레코드 생성.
    ///
    /// `parent`가 있으면 그 주문의 `position_id`와 `entry_price`를 이어받고,
    /// 없으면 새 포지션 ID를 발급하고 `entry_price`는 비워둡니다.
    pub fn from_params(
        symbol: impl Into<String>,
        params: &OrderParams,
        parent: Option<&Order>,
        is_test: bool,
        now_ms: i64,
    ) -> Self {
        let (position_id, entry_price) = match parent {
            Some(p) => (p.position_id.clone(), p.entry_price),
            None => (new_order_id(), None),
        };

        Self {
            id: new_order_id(),
            position_id,
            bot_id: params.bot_id,
            symbol: symbol.into(),
            side: params.side,
            order_type: params.order_type,
            price: params.price,
            entry_price,
            take_profit_price: params.take_profit_price,
            stop_price: params.stop_price,
            original_quantity: params.quantity,
            executed_quantity: Decimal::ZERO,
            is_entry: params.is_entry,
            is_test,
            status: OrderStatus::Open,
            exchange_order_id: None,
            submit_error: None,
            last_checked_time: now_ms,
            created_at: now_ms,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == OrderStatus::Open
    }

    pub fn is_filled(&self) -> bool {
        self.status == OrderStatus::Closed
    }

    /// 마지막 확인 시각 갱신. 과거 값으로는 되돌리지 않습니다.
    pub fn touch(&mut self, now_ms: i64) {
        self.last_checked_time = self.last_checked_time.max(now_ms);
    }

    /// 진입가 설정. 이미 설정되어 있으면 무시하고 `false`를 반환합니다.
    pub fn set_entry_price_once(&mut self, price: Decimal) -> bool {
        if self.entry_price.is_some() {
            return false;
        }
        self.entry_price = Some(price);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn params() -> OrderParams {
        OrderParams::new(1, Side::Buy, OrderType::Limit, dec!(2)).with_price(dec!(100))
    }

    #[test]
    fn test_new_position_gets_fresh_ids() {
        let a = Order::from_params("BTC/USDT", &params(), None, true, 1_000);
        let b = Order::from_params("BTC/USDT", &params(), None, true, 1_000);

        assert_ne!(a.id, b.id);
        assert_ne!(a.position_id, b.position_id);
        assert_eq!(a.id.len(), 32);
        assert!(a.entry_price.is_none());
        assert_eq!(a.status, OrderStatus::Open);
        assert_eq!(a.last_checked_time, 1_000);
    }

    #[test]
    fn test_follow_up_inherits_position() {
        let mut parent = Order::from_params("BTC/USDT", &params().entry(), None, true, 1_000);
        parent.entry_price = Some(dec!(99.5));

        let exit = OrderParams::new(1, Side::Sell, OrderType::Market, dec!(2));
        let child = Order::from_params("BTC/USDT", &exit, Some(&parent), true, 2_000);

        assert_eq!(child.position_id, parent.position_id);
        assert_eq!(child.entry_price, Some(dec!(99.5)));
        assert_ne!(child.id, parent.id);
        assert!(!child.is_entry);
    }

    #[test]
    fn test_validate_requires_price_for_limit() {
        let p = OrderParams::new(1, Side::Buy, OrderType::Limit, dec!(1));
        assert!(p.validate().is_err());
        assert!(params().validate().is_ok());

        let market = OrderParams::new(1, Side::Buy, OrderType::Market, dec!(1));
        assert!(market.validate().is_ok());

        let zero = OrderParams::new(1, Side::Buy, OrderType::Market, dec!(0));
        assert!(zero.validate().is_err());
    }

    #[test]
    fn test_entry_price_set_once() {
        let mut order = Order::from_params("ETH/USDT", &params(), None, true, 0);
        assert!(order.set_entry_price_once(dec!(10)));
        assert!(!order.set_entry_price_once(dec!(11)));
        assert_eq!(order.entry_price, Some(dec!(10)));
    }

    #[test]
    fn test_touch_never_moves_backwards() {
        let mut order = Order::from_params("ETH/USDT", &params(), None, true, 5_000);
        order.touch(4_000);
        assert_eq!(order.last_checked_time, 5_000);
        order.touch(6_000);
        assert_eq!(order.last_checked_time, 6_000);
    }
}
