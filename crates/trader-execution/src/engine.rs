//! 주문 엔진.
//!
//! 주문 레코드의 생명주기를 관리합니다.
//!
//! ```text
//! place_order ──► Open ──reconcile_order──► Closed (체결) ──► 체결 처리
//!                  │                          │
//!                  └──cancel_order──► Canceled └─ 진입: entry_price 기록/전파
//!                                               청산: 포지션 잔여 주문 취소
//! ```
//!
//! # 원자성
//!
//! 한 주문의 읽기-수정-쓰기는 주문별 비동기 락 안에서 수행되며,
//! 거래소 호출이 실패하면 레코드를 전혀 쓰지 않습니다.

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, instrument, warn};
use trader_core::{
    apply_exit_adjustment, now_millis, ExitAdjustment, KlineInterval, Order, OrderParams,
    OrderStatus, OrderType,
};
use trader_data::{DataError, OrderRepository};
use trader_exchange::{ExchangeAdapter, ExchangeError, OrderResponse, OrderStatusReport};

use crate::error::{ExecutionError, Result};
use crate::simulator;

// ==================== 주문별 락 ====================

/// 주문 ID별 비동기 락 테이블.
#[derive(Debug, Default)]
struct OrderLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl OrderLocks {
    async fn acquire(&self, order_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.entry(order_id.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// 종료된 주문의 락 제거. 대기 중인 작업이 있으면 유지합니다.
    async fn release(&self, order_id: &str) {
        let mut locks = self.locks.lock().await;
        if locks
            .get(order_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(order_id);
        }
    }
}

// ==================== 결과 타입 ====================

/// 한 주문의 상태 확인 결과.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// 이번 확인에서 체결됨
    Filled { fill_price: Option<Decimal> },
    /// 이번 확인에서 취소됨 (거래소 측 취소 포함)
    Canceled,
    /// 변화 없음
    Unchanged,
    /// 이미 종료된 주문
    AlreadyTerminal(OrderStatus),
}

/// 한 폴링 주기의 상태 확인 요약.
#[derive(Debug, Default)]
pub struct ReconcileReport {
    pub checked: usize,
    pub filled: Vec<String>,
    pub canceled: Vec<String>,
    pub unchanged: usize,
    /// 실패한 주문 (다른 주문 처리는 계속됨)
    pub failures: Vec<(String, ExecutionError)>,
}

impl ReconcileReport {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// 첫 저장소 에러를 꺼냅니다.
    pub fn take_storage_failure(&mut self) -> Option<ExecutionError> {
        let idx = self.failures.iter().position(|(_, e)| e.is_storage())?;
        Some(self.failures.swap_remove(idx).1)
    }
}

// ==================== 엔진 ====================

/// 주문 엔진.
///
/// 거래소 어댑터와 저장소를 명시적으로 주입받습니다.
pub struct OrderEngine {
    exchange: Arc<dyn ExchangeAdapter>,
    repository: Arc<dyn OrderRepository>,
    locks: OrderLocks,
}

impl OrderEngine {
    pub fn new(exchange: Arc<dyn ExchangeAdapter>, repository: Arc<dyn OrderRepository>) -> Self {
        Self {
            exchange,
            repository,
            locks: OrderLocks::default(),
        }
    }

    pub fn exchange(&self) -> &Arc<dyn ExchangeAdapter> {
        &self.exchange
    }

    pub fn repository(&self) -> &Arc<dyn OrderRepository> {
        &self.repository
    }

    async fn load(&self, order_id: &str) -> Result<Order> {
        self.repository
            .get(order_id)
            .await?
            .ok_or_else(|| ExecutionError::Storage(DataError::NotFound(order_id.to_string())))
    }

    /// 주문 유형에 맞는 거래소 제출 경로 선택.
    async fn submit(&self, order: &Order) -> std::result::Result<OrderResponse, ExchangeError> {
        let ex = &self.exchange;
        let price = || {
            order.price.ok_or_else(|| {
                ExchangeError::Rejected(format!("{} 주문에 가격 없음", order.order_type))
            })
        };
        match order.order_type {
            OrderType::Limit => {
                ex.place_limit_order(
                    &order.symbol,
                    order.side,
                    order.original_quantity,
                    price()?,
                    false,
                    &order.id,
                )
                .await
            }
            OrderType::Market => {
                ex.place_market_order(
                    &order.symbol,
                    order.side,
                    order.original_quantity,
                    false,
                    &order.id,
                )
                .await
            }
            OrderType::StopLoss => {
                ex.place_stop_loss_market_order(
                    &order.symbol,
                    order.side,
                    order.original_quantity,
                    price()?,
                    false,
                    &order.id,
                )
                .await
            }
        }
    }

    // ==================== 주문 제출 ====================

    /// 주문 생성 및 제출.
    ///
    /// `position`이 있으면 그 포지션의 후속 주문이 됩니다. 테스트 모드에서는
    /// 거래소에 제출하지 않습니다. 거부된 주문도 감사용으로 저장한 뒤 에러를 반환합니다.
    #[instrument(skip(self, position, params), fields(side = %params.side, order_type = %params.order_type))]
    pub async fn place_order(
        &self,
        symbol: &str,
        position: Option<&Order>,
        params: OrderParams,
        test_mode: bool,
    ) -> Result<Order> {
        params.validate().map_err(ExecutionError::InvalidOrder)?;

        let mut order = Order::from_params(symbol, &params, position, test_mode, now_millis());

        let (response, error) = if test_mode {
            (None, None)
        } else {
            match self.submit(&order).await {
                Ok(resp) => (Some(resp), None),
                Err(e) => (None, Some(e)),
            }
        };
        self.exchange
            .update_record_from_response(&mut order, response.as_ref(), error.as_ref());
        self.repository.create(&order).await?;

        if let Some(err) = error {
            warn!(
                order_id = %order.id,
                position_id = %order.position_id,
                error = %err,
                "주문 제출 실패"
            );
            return Err(ExecutionError::from_submit(err, &order.id));
        }

        info!(
            order_id = %order.id,
            position_id = %order.position_id,
            quantity = %order.original_quantity,
            price = ?order.price,
            test = order.is_test,
            "주문 생성"
        );
        Ok(order)
    }

    /// 저장된 주문을 같은 ID로 다시 제출.
    ///
    /// 거래소는 client order id로 중복을 제거하므로 재시도해도 거래소 주문은
    /// 하나입니다. 로컬 레코드는 새로 만들지 않고 갱신합니다.
    #[instrument(skip(self))]
    pub async fn resubmit_order(&self, order_id: &str) -> Result<Order> {
        let _guard = self.locks.acquire(order_id).await;
        let mut order = self.load(order_id).await?;
        if !order.is_open() || order.is_test {
            return Ok(order);
        }

        let result = self.submit(&order).await;
        match result {
            Ok(resp) => {
                self.exchange
                    .update_record_from_response(&mut order, Some(&resp), None);
                self.repository.update(&order).await?;
                debug!(order_id, "주문 재제출 완료");
                Ok(order)
            }
            Err(e) if e.is_retryable() => Err(ExecutionError::from_submit(e, order_id)),
            Err(e) => {
                self.exchange
                    .update_record_from_response(&mut order, None, Some(&e));
                self.repository.update(&order).await?;
                Err(ExecutionError::from_submit(e, order_id))
            }
        }
    }

    // ==================== 상태 확인 ====================

    /// 주문 상태 조회 (레코드는 변경하지 않음).
    ///
    /// 실거래 주문은 거래소에 조회하고, 테스트 주문은 캔들로 체결을 추론합니다.
    pub async fn check_order_status(
        &self,
        order: &Order,
        interval: &KlineInterval,
    ) -> std::result::Result<OrderStatusReport, ExchangeError> {
        if order.is_test {
            simulator::simulate_order_status(self.exchange.as_ref(), order, interval, now_millis())
                .await
        } else {
            self.exchange.get_order(&order.symbol, &order.id, true).await
        }
    }

    /// 주문 하나의 상태를 확인하고 레코드에 반영.
    ///
    /// 거래소 호출이 일시적으로 실패하면 레코드를 쓰지 않고 에러를 반환합니다.
    /// 거래소에 주문이 없으면 이미 종료된 것으로 보고 취소 처리합니다.
    #[instrument(skip(self, interval))]
    pub async fn reconcile_order(
        &self,
        order_id: &str,
        interval: &KlineInterval,
    ) -> Result<ReconcileOutcome> {
        let (order, fill_price) = {
            let _guard = self.locks.acquire(order_id).await;
            let mut order = self.load(order_id).await?;
            if !order.is_open() {
                return Ok(ReconcileOutcome::AlreadyTerminal(order.status));
            }

            let mut fill_price = None;
            match self.check_order_status(&order, interval).await {
                Ok(report) => {
                    order.touch(now_millis());
                    order.executed_quantity = report.executed_quantity;
                    order.status = report.status;
                    if order.status == OrderStatus::Closed {
                        fill_price = Self::settle_fill(&mut order, &report);
                    }
                }
                Err(ExchangeError::OrderNotFound(_)) => {
                    warn!(order_id, "거래소에 주문 없음, 종료된 것으로 처리");
                    order.touch(now_millis());
                    order.status = OrderStatus::Canceled;
                }
                Err(e) => return Err(ExecutionError::from_exchange(e, order_id)),
            }

            // 진입가는 체결 상태와 같은 쓰기로 저장
            self.repository.update(&order).await?;
            (order, fill_price)
        };

        match order.status {
            OrderStatus::Closed => {
                self.locks.release(order_id).await;
                info!(
                    order_id,
                    position_id = %order.position_id,
                    fill_price = ?fill_price,
                    is_entry = order.is_entry,
                    "주문 체결"
                );
                self.on_filled(&order).await?;
                Ok(ReconcileOutcome::Filled { fill_price })
            }
            OrderStatus::Canceled | OrderStatus::Rejected => {
                self.locks.release(order_id).await;
                Ok(ReconcileOutcome::Canceled)
            }
            OrderStatus::Open => Ok(ReconcileOutcome::Unchanged),
        }
    }

    /// 체결 보고를 레코드에 반영하고 체결가를 반환.
    ///
    /// 실거래 주문은 거래소가 보고한 평균 체결가를, 테스트 주문은 시뮬레이터 체결가를
    /// 씁니다. 체결가가 없으면 주문 가격으로 대신합니다. 시장가 주문은 체결가를
    /// `price`에 기록하고, 진입 주문이면 `entry_price`도 함께 설정합니다.
    fn settle_fill(order: &mut Order, report: &OrderStatusReport) -> Option<Decimal> {
        if order.order_type == OrderType::Market {
            if let Some(price) = report.fill_price {
                order.price = Some(price);
            }
        }
        let fill_price = report.fill_price.or(order.price);
        if order.is_entry {
            if let Some(price) = fill_price {
                order.set_entry_price_once(price);
            }
        }
        fill_price
    }

    /// 봇의 모든 미체결 주문 상태 확인.
    ///
    /// 한 주문의 실패는 나머지 주문 처리를 막지 않고 보고서에 기록됩니다.
    #[instrument(skip(self, interval))]
    pub async fn reconcile_open_orders(
        &self,
        bot_id: i64,
        interval: &KlineInterval,
    ) -> Result<ReconcileReport> {
        let open_orders = self.repository.find_open_by_bot(bot_id).await?;
        let mut report = ReconcileReport::default();

        for order in open_orders {
            report.checked += 1;
            match self.reconcile_order(&order.id, interval).await {
                Ok(ReconcileOutcome::Filled { .. }) => report.filled.push(order.id),
                Ok(ReconcileOutcome::Canceled) => report.canceled.push(order.id),
                Ok(ReconcileOutcome::Unchanged) | Ok(ReconcileOutcome::AlreadyTerminal(_)) => {
                    report.unchanged += 1
                }
                Err(e) => {
                    warn!(order_id = %order.id, error = %e, "주문 상태 확인 실패");
                    report.failures.push((order.id, e));
                }
            }
        }

        debug!(
            checked = report.checked,
            filled = report.filled.len(),
            canceled = report.canceled.len(),
            failures = report.failures.len(),
            "상태 확인 주기 완료"
        );
        Ok(report)
    }

    // ==================== 체결 처리 ====================

    /// 체결 후 포지션 정리.
    ///
    /// 진입 주문 체결: 진입가를 기록하고 같은 포지션의 다른 주문에 전파합니다.
    /// 청산 주문 체결: 포지션의 남은 미체결 주문을 취소합니다.
    async fn on_filled(&self, order: &Order) -> Result<()> {
        if order.is_entry {
            if let Some(entry_price) = order.entry_price {
                self.propagate_entry_price(&order.position_id, entry_price)
                    .await?;
            }
            return Ok(());
        }

        let siblings = self.repository.find_by_position(&order.position_id).await?;
        for sibling in siblings.iter().filter(|o| o.id != order.id && o.is_open()) {
            match self.cancel_order(&sibling.id).await {
                Ok(_) | Err(ExecutionError::OrderNotFound(_)) => {}
                Err(e) => {
                    warn!(order_id = %sibling.id, error = %e, "포지션 잔여 주문 취소 실패");
                }
            }
        }
        info!(position_id = %order.position_id, "포지션 종료");
        Ok(())
    }

    /// 체결된 진입 주문의 진입가를 포지션 전체에 다시 맞춤.
    ///
    /// 체결 처리 도중 저장소 에러나 중단으로 전파가 끝나지 않은 포지션을 복구합니다.
    /// 진입 주문 자신에게 진입가가 없으면 주문 가격으로 채웁니다. 기록된 진입가를
    /// 반환하며, 진입 주문이 아직 체결되지 않았거나 가격을 알 수 없으면 `None`입니다.
    pub async fn restore_entry_price(&self, entry: &Order) -> Result<Option<Decimal>> {
        if !entry.is_entry || !entry.is_filled() {
            return Ok(None);
        }
        let Some(entry_price) = entry.entry_price.or(entry.price) else {
            return Ok(None);
        };
        let orders = self.repository.find_by_position(&entry.position_id).await?;
        if orders.iter().any(|o| o.entry_price.is_none()) {
            info!(
                order_id = %entry.id,
                position_id = %entry.position_id,
                entry_price = %entry_price,
                "미기록 진입가 복구"
            );
            self.propagate_entry_price(&entry.position_id, entry_price)
                .await?;
        }
        Ok(Some(entry_price))
    }

    /// 포지션의 `entry_price`가 비어 있는 모든 주문에 진입가 기록.
    async fn propagate_entry_price(&self, position_id: &str, price: Decimal) -> Result<()> {
        let orders = self.repository.find_by_position(position_id).await?;
        for stale in orders.iter().filter(|o| o.entry_price.is_none()) {
            let _guard = self.locks.acquire(&stale.id).await;
            let mut current = self.load(&stale.id).await?;
            if current.set_entry_price_once(price) {
                self.repository.update(&current).await?;
            }
        }
        debug!(position_id, entry_price = %price, "진입가 기록");
        Ok(())
    }

    // ==================== 취소 ====================

    /// 주문 취소.
    ///
    /// 스톱 주문은 조건부 주문 취소 경로로, 나머지는 일반 취소 경로로 보냅니다.
    /// 테스트 주문은 거래소 호출 없이 로컬에서 취소합니다. 거래소에 주문이 없으면
    /// 레코드를 바꾸지 않고 `OrderNotFound`를 반환합니다.
    #[instrument(skip(self))]
    pub async fn cancel_order(&self, order_id: &str) -> Result<Order> {
        let _guard = self.locks.acquire(order_id).await;
        let mut order = self.load(order_id).await?;
        if !order.is_open() {
            return Ok(order);
        }

        if !order.is_test {
            let result = match order.order_type {
                OrderType::StopLoss => {
                    self.exchange
                        .cancel_algo_order(&order.symbol, &order.id, true)
                        .await
                }
                OrderType::Limit | OrderType::Market => {
                    self.exchange
                        .cancel_order(&order.symbol, &order.id, true)
                        .await
                }
            };
            if let Err(e) = result {
                return Err(ExecutionError::from_exchange(e, order_id));
            }
        }

        order.status = OrderStatus::Canceled;
        order.touch(now_millis());
        self.repository.update(&order).await?;
        info!(order_id, position_id = %order.position_id, "주문 취소");
        Ok(order)
    }

    // ==================== 임계값 ====================

    /// 익절/손절 임계값 수정 적용 (래칫 규칙).
    ///
    /// 포지션 방향은 진입 주문이면 그 주문의 방향, 청산 주문이면 반대 방향입니다.
    /// 하나라도 바뀌면 저장하고 `true`를 반환합니다.
    pub async fn apply_exit_adjustment(
        &self,
        order_id: &str,
        adjustment: &ExitAdjustment,
    ) -> Result<bool> {
        if adjustment.is_empty() {
            return Ok(false);
        }
        let _guard = self.locks.acquire(order_id).await;
        let mut order = self.load(order_id).await?;
        let direction = if order.is_entry {
            order.side
        } else {
            order.side.opposite()
        };

        let changed = apply_exit_adjustment(&mut order, direction, adjustment);
        if changed {
            self.repository.update(&order).await?;
            debug!(
                order_id,
                take_profit = ?order.take_profit_price,
                stop = ?order.stop_price,
                "임계값 갱신"
            );
        }
        Ok(changed)
    }
}
