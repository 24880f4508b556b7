//! 거래소 어댑터 추상화.
//!
//! 엔진이 소비하는 거래소 계약입니다. 모든 주문 관련 호출은
//! 주문 레코드의 `id`를 client order id(멱등성 키)로 사용합니다.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use trader_core::{Kline, Order, OrderStatus, Side};

use crate::ExchangeError;

/// 주문 제출/취소 응답.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderResponse {
    /// client order id (주문 레코드 id)
    pub client_order_id: String,
    /// 거래소 주문번호
    pub exchange_order_id: Option<String>,
    /// 응답 시점 상태
    pub status: OrderStatus,
    /// 응답 시점 체결 수량
    pub executed_quantity: Decimal,
    /// 부가 메시지
    pub message: Option<String>,
}

impl OrderResponse {
    /// 네트워크 제출 없이 합성한 성공 응답 (테스트 모드).
    pub fn simulated(client_order_id: impl Into<String>) -> Self {
        Self {
            client_order_id: client_order_id.into(),
            exchange_order_id: None,
            status: OrderStatus::Open,
            executed_quantity: Decimal::ZERO,
            message: Some("success".to_string()),
        }
    }
}

/// 주문 상태 조회 결과.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatusReport {
    pub status: OrderStatus,
    pub side: Side,
    /// 체결 수량 (미체결이면 0)
    pub executed_quantity: Decimal,
    /// 체결 가격 (알 수 있는 경우)
    pub fill_price: Option<Decimal>,
}

impl OrderStatusReport {
    /// 변화 없음 (미체결).
    pub fn open(side: Side) -> Self {
        Self {
            status: OrderStatus::Open,
            side,
            executed_quantity: Decimal::ZERO,
            fill_price: None,
        }
    }

    /// 전량 체결.
    pub fn filled(side: Side, quantity: Decimal, fill_price: Option<Decimal>) -> Self {
        Self {
            status: OrderStatus::Closed,
            side,
            executed_quantity: quantity,
            fill_price,
        }
    }
}

/// 거래소 어댑터 trait.
///
/// 구현체는 재시도/타임아웃 정책을 스스로 가집니다.
/// 엔진은 실패한 호출을 다음 폴링 주기에 다시 시도할 뿐입니다.
#[async_trait]
pub trait ExchangeAdapter: Send + Sync {
    /// 거래소 이름 (로깅용).
    fn exchange_name(&self) -> &str;

    /// 지정가 주문 제출.
    async fn place_limit_order(
        &self,
        symbol: &str,
        side: Side,
        quantity: Decimal,
        price: Decimal,
        test_mode: bool,
        custom_id: &str,
    ) -> Result<OrderResponse, ExchangeError>;

    /// 시장가 주문 제출.
    async fn place_market_order(
        &self,
        symbol: &str,
        side: Side,
        quantity: Decimal,
        test_mode: bool,
        custom_id: &str,
    ) -> Result<OrderResponse, ExchangeError>;

    /// 스톱 시장가 주문 제출 (`price`가 트리거 가격).
    async fn place_stop_loss_market_order(
        &self,
        symbol: &str,
        side: Side,
        quantity: Decimal,
        price: Decimal,
        test_mode: bool,
        custom_id: &str,
    ) -> Result<OrderResponse, ExchangeError>;

    /// 일반 주문 취소.
    async fn cancel_order(
        &self,
        symbol: &str,
        id: &str,
        is_custom_id: bool,
    ) -> Result<OrderResponse, ExchangeError>;

    /// 조건부(algo) 주문 취소.
    async fn cancel_algo_order(
        &self,
        symbol: &str,
        id: &str,
        is_custom_id: bool,
    ) -> Result<OrderResponse, ExchangeError>;

    /// 주문 상태 조회.
    async fn get_order(
        &self,
        symbol: &str,
        id: &str,
        is_custom_id: bool,
    ) -> Result<OrderStatusReport, ExchangeError>;

    /// 미체결 주문 목록 (client order id, 상태).
    async fn get_open_orders(
        &self,
        symbol: &str,
    ) -> Result<Vec<(String, OrderStatusReport)>, ExchangeError>;

    /// 캔들 조회 (시간 오름차순).
    ///
    /// `start_time`이 있으면 그 시각부터 `limit`개, 없으면 최신 `limit`개를 반환합니다.
    async fn get_ohlcv(
        &self,
        symbol: &str,
        interval: &str,
        limit: usize,
        start_time: Option<i64>,
    ) -> Result<Vec<Kline>, ExchangeError>;

    /// 제출 결과를 주문 레코드에 반영.
    ///
    /// 거래소가 거부한 경우 레코드를 거부 상태로 남기고 사유를 기록합니다.
    /// 일시적 장애는 주문이 접수됐는지 알 수 없으므로 상태를 `Open`으로 두고
    /// 사유만 기록합니다. 체결 여부는 여기서 판단하지 않고 상태 조회에 맡깁니다.
    fn update_record_from_response(
        &self,
        order: &mut Order,
        response: Option<&OrderResponse>,
        error: Option<&ExchangeError>,
    ) {
        if let Some(err) = error {
            if !err.is_retryable() {
                order.status = OrderStatus::Rejected;
            }
            order.submit_error = Some(err.to_string());
            return;
        }
        if let Some(resp) = response {
            if resp.exchange_order_id.is_some() {
                order.exchange_order_id = resp.exchange_order_id.clone();
            }
            order.submit_error = None;
        }
    }
}
