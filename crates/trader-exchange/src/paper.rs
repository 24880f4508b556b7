//! 인메모리 페이퍼 거래소.
//!
//! 실제 네트워크 없이 `ExchangeAdapter` 계약을 구현합니다.
//! 드라이런과 테스트에서 사용하며 다음을 지원합니다:
//!
//! - 심볼별 캔들 시퀀스 보관 및 `get_ohlcv` 응답
//! - client order id 기준 중복 제출 제거
//! - 체결/취소 상태 관리 (`fill_order`로 체결 주입)
//! - 연산별 장애 주입 (`fail_next`)

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use tracing::{debug, info};
use trader_core::{Kline, OrderStatus, OrderType, Side};

use crate::{ExchangeAdapter, ExchangeError, OrderResponse, OrderStatusReport};

/// 장애 주입 대상 연산.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaperOp {
    Place,
    Cancel,
    Query,
    Ohlcv,
}

/// 페이퍼 거래소에 접수된 주문.
#[derive(Debug, Clone)]
pub struct PaperOrder {
    pub client_order_id: String,
    pub exchange_order_id: String,
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    pub quantity: Decimal,
    pub price: Option<Decimal>,
    pub status: OrderStatus,
    pub executed_quantity: Decimal,
    pub fill_price: Option<Decimal>,
}

impl PaperOrder {
    fn response(&self) -> OrderResponse {
        OrderResponse {
            client_order_id: self.client_order_id.clone(),
            exchange_order_id: Some(self.exchange_order_id.clone()),
            status: self.status,
            executed_quantity: self.executed_quantity,
            message: None,
        }
    }

    fn report(&self) -> OrderStatusReport {
        OrderStatusReport {
            status: self.status,
            side: self.side,
            executed_quantity: self.executed_quantity,
            fill_price: self.fill_price,
        }
    }
}

/// `get_ohlcv` 호출 기록.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OhlcvRequest {
    pub symbol: String,
    pub interval: String,
    pub limit: usize,
    pub start_time: Option<i64>,
}

#[derive(Debug, Default)]
struct PaperState {
    klines: HashMap<String, Vec<Kline>>,
    orders: HashMap<String, PaperOrder>,
    faults: HashMap<PaperOp, VecDeque<ExchangeError>>,
    ohlcv_requests: Vec<OhlcvRequest>,
    next_order_no: u64,
}

impl PaperState {
    fn take_fault(&mut self, op: PaperOp) -> Result<(), ExchangeError> {
        match self.faults.get_mut(&op).and_then(|q| q.pop_front()) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn find_mut(&mut self, id: &str, is_custom_id: bool) -> Option<&mut PaperOrder> {
        if is_custom_id {
            self.orders.get_mut(id)
        } else {
            self.orders
                .values_mut()
                .find(|o| o.exchange_order_id == id)
        }
    }
}

/// 인메모리 페이퍼 거래소.
#[derive(Debug, Default)]
pub struct PaperExchange {
    state: RwLock<PaperState>,
}

impl PaperExchange {
    pub fn new() -> Self {
        Self::default()
    }

    /// 심볼의 캔들 시퀀스 설정 (시간 오름차순).
    pub async fn set_klines(&self, symbol: &str, mut klines: Vec<Kline>) {
        klines.sort_by_key(|k| k.open_time);
        self.state
            .write()
            .await
            .klines
            .insert(symbol.to_string(), klines);
    }

    /// 캔들 하나 추가.
    pub async fn push_kline(&self, symbol: &str, kline: Kline) {
        self.state
            .write()
            .await
            .klines
            .entry(symbol.to_string())
            .or_default()
            .push(kline);
    }

    /// 다음 `op` 호출을 주어진 에러로 실패시킵니다.
    pub async fn fail_next(&self, op: PaperOp, error: ExchangeError) {
        self.state
            .write()
            .await
            .faults
            .entry(op)
            .or_default()
            .push_back(error);
    }

    /// 접수된 주문을 전량 체결 처리.
    pub async fn fill_order(&self, client_order_id: &str, fill_price: Decimal) -> bool {
        let mut state = self.state.write().await;
        match state.orders.get_mut(client_order_id) {
            Some(order) if order.status == OrderStatus::Open => {
                order.status = OrderStatus::Closed;
                order.executed_quantity = order.quantity;
                order.fill_price = Some(fill_price);
                true
            }
            _ => false,
        }
    }

    /// 접수된 주문 조회.
    pub async fn order(&self, client_order_id: &str) -> Option<PaperOrder> {
        self.state.read().await.orders.get(client_order_id).cloned()
    }

    /// 접수된 (중복 제거 후) 주문 수.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// 지금까지의 캔들 조회 요청.
    pub async fn ohlcv_requests(&self) -> Vec<OhlcvRequest> {
        self.state.read().await.ohlcv_requests.clone()
    }

    #[allow(clippy::too_many_arguments)]
    async fn submit(
        &self,
        symbol: &str,
        side: Side,
        order_type: OrderType,
        quantity: Decimal,
        price: Option<Decimal>,
        custom_id: &str,
    ) -> Result<OrderResponse, ExchangeError> {
        let mut state = self.state.write().await;
        state.take_fault(PaperOp::Place)?;

        if let Some(existing) = state.orders.get(custom_id) {
            debug!(client_order_id = custom_id, "[Paper] 중복 제출 무시");
            return Ok(existing.response());
        }

        state.next_order_no += 1;
        let order = PaperOrder {
            client_order_id: custom_id.to_string(),
            exchange_order_id: format!("PAPER-{:08}", state.next_order_no),
            symbol: symbol.to_string(),
            side,
            order_type,
            quantity,
            price,
            status: OrderStatus::Open,
            executed_quantity: Decimal::ZERO,
            fill_price: None,
        };
        info!(
            "[Paper] 주문 접수: {} {} {} {} @ {:?}",
            symbol, order_type, side, quantity, price
        );
        let response = order.response();
        state.orders.insert(custom_id.to_string(), order);
        Ok(response)
    }

    async fn cancel(
        &self,
        id: &str,
        is_custom_id: bool,
        algo: bool,
    ) -> Result<OrderResponse, ExchangeError> {
        let mut state = self.state.write().await;
        state.take_fault(PaperOp::Cancel)?;

        let order = state
            .find_mut(id, is_custom_id)
            .filter(|o| o.status == OrderStatus::Open)
            // 조건부 주문과 일반 주문은 취소 경로가 분리되어 있음
            .filter(|o| (o.order_type == OrderType::StopLoss) == algo)
            .ok_or_else(|| ExchangeError::OrderNotFound(id.to_string()))?;

        order.status = OrderStatus::Canceled;
        Ok(order.response())
    }
}

#[async_trait]
impl ExchangeAdapter for PaperExchange {
    fn exchange_name(&self) -> &str {
        "paper"
    }

    async fn place_limit_order(
        &self,
        symbol: &str,
        side: Side,
        quantity: Decimal,
        price: Decimal,
        _test_mode: bool,
        custom_id: &str,
    ) -> Result<OrderResponse, ExchangeError> {
        self.submit(symbol, side, OrderType::Limit, quantity, Some(price), custom_id)
            .await
    }

    async fn place_market_order(
        &self,
        symbol: &str,
        side: Side,
        quantity: Decimal,
        _test_mode: bool,
        custom_id: &str,
    ) -> Result<OrderResponse, ExchangeError> {
        self.submit(symbol, side, OrderType::Market, quantity, None, custom_id)
            .await
    }

    async fn place_stop_loss_market_order(
        &self,
        symbol: &str,
        side: Side,
        quantity: Decimal,
        price: Decimal,
        _test_mode: bool,
        custom_id: &str,
    ) -> Result<OrderResponse, ExchangeError> {
        self.submit(
            symbol,
            side,
            OrderType::StopLoss,
            quantity,
            Some(price),
            custom_id,
        )
        .await
    }

    async fn cancel_order(
        &self,
        _symbol: &str,
        id: &str,
        is_custom_id: bool,
    ) -> Result<OrderResponse, ExchangeError> {
        self.cancel(id, is_custom_id, false).await
    }

    async fn cancel_algo_order(
        &self,
        _symbol: &str,
        id: &str,
        is_custom_id: bool,
    ) -> Result<OrderResponse, ExchangeError> {
        self.cancel(id, is_custom_id, true).await
    }

    async fn get_order(
        &self,
        _symbol: &str,
        id: &str,
        is_custom_id: bool,
    ) -> Result<OrderStatusReport, ExchangeError> {
        let mut state = self.state.write().await;
        state.take_fault(PaperOp::Query)?;
        state
            .find_mut(id, is_custom_id)
            .map(|o| o.report())
            .ok_or_else(|| ExchangeError::OrderNotFound(id.to_string()))
    }

    async fn get_open_orders(
        &self,
        symbol: &str,
    ) -> Result<Vec<(String, OrderStatusReport)>, ExchangeError> {
        let mut state = self.state.write().await;
        state.take_fault(PaperOp::Query)?;
        Ok(state
            .orders
            .values()
            .filter(|o| o.symbol == symbol && o.status == OrderStatus::Open)
            .map(|o| (o.client_order_id.clone(), o.report()))
            .collect())
    }

    async fn get_ohlcv(
        &self,
        symbol: &str,
        interval: &str,
        limit: usize,
        start_time: Option<i64>,
    ) -> Result<Vec<Kline>, ExchangeError> {
        let mut state = self.state.write().await;
        state.take_fault(PaperOp::Ohlcv)?;
        state.ohlcv_requests.push(OhlcvRequest {
            symbol: symbol.to_string(),
            interval: interval.to_string(),
            limit,
            start_time,
        });

        let klines = state.klines.get(symbol).cloned().unwrap_or_default();
        let selected = match start_time {
            Some(start) => klines
                .into_iter()
                .filter(|k| k.open_time >= start)
                .take(limit)
                .collect(),
            None => {
                let skip = klines.len().saturating_sub(limit);
                klines.into_iter().skip(skip).collect()
            }
        };
        Ok(selected)
    }
}
