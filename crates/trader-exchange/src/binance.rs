//! Binance 현물 REST 어댑터.
//!
//! # 엔드포인트
//!
//! ```text
//! BinanceClient
//! ├── GET    /api/v3/klines      - 캔들 (공개, 재시도)
//! ├── POST   /api/v3/order       - 주문 제출 (서명)
//! ├── POST   /api/v3/order/test  - 주문 검증만 (test_mode)
//! ├── DELETE /api/v3/order       - 주문 취소 (서명)
//! ├── GET    /api/v3/order       - 주문 조회 (서명, 재시도)
//! └── GET    /api/v3/openOrders  - 미체결 주문 (서명, 재시도)
//! ```
//!
//! 주문 제출/취소는 `newClientOrderId`/`origClientOrderId`로 주문 레코드 id를 전달하므로
//! 같은 id로 다시 보내도 거래소 쪽에 주문이 두 개 생기지 않습니다.

use std::time::Duration;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::{Client, Method, StatusCode};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::Sha256;
use tracing::{debug, warn};
use trader_core::{Kline, OrderStatus, Side};

use crate::retry::{retry_read, ReadRetry};
use crate::{ExchangeAdapter, ExchangeError, OrderResponse, OrderStatusReport};

type HmacSha256 = Hmac<Sha256>;

const DEFAULT_BASE_URL: &str = "https://api.binance.com";
const RECV_WINDOW_MS: u64 = 5_000;
/// klines 요청 1회 최대 개수
const KLINES_PAGE_LIMIT: usize = 1000;

// ============================================================================
// 설정
// ============================================================================

#[derive(Clone)]
pub struct BinanceConfig {
    pub api_key: String,
    pub secret_key: SecretString,
    pub base_url: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for BinanceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinanceConfig")
            .field("api_key", &"***")
            .field("secret_key", &"***")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl BinanceConfig {
    pub fn new(api_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            secret_key: SecretString::from(secret_key.into()),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

// ============================================================================
// API 응답 타입
// ============================================================================

#[derive(Debug, Deserialize)]
struct BinanceErrorBody {
    code: i64,
    msg: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BinanceOrder {
    order_id: i64,
    client_order_id: String,
    #[serde(with = "rust_decimal::serde::str")]
    price: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    executed_qty: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    cummulative_quote_qty: Decimal,
    status: String,
    side: String,
}

impl BinanceOrder {
    fn order_status(&self) -> Result<OrderStatus, ExchangeError> {
        self.status.parse().map_err(ExchangeError::ParseError)
    }

    fn report(&self) -> Result<OrderStatusReport, ExchangeError> {
        let side: Side = self.side.parse().map_err(ExchangeError::ParseError)?;
        // 평균 체결가 = 누적 체결 금액 / 체결 수량
        let fill_price = if self.executed_qty > Decimal::ZERO {
            Some(self.cummulative_quote_qty / self.executed_qty)
        } else if self.price > Decimal::ZERO {
            Some(self.price)
        } else {
            None
        };
        Ok(OrderStatusReport {
            status: self.order_status()?,
            side,
            executed_quantity: self.executed_qty,
            fill_price,
        })
    }

    fn response(&self) -> Result<OrderResponse, ExchangeError> {
        Ok(OrderResponse {
            client_order_id: self.client_order_id.clone(),
            exchange_order_id: Some(self.order_id.to_string()),
            status: self.order_status()?,
            executed_quantity: self.executed_qty,
            message: None,
        })
    }
}

// ============================================================================
// 클라이언트
// ============================================================================

pub struct BinanceClient {
    client: Client,
    config: BinanceConfig,
    retry: ReadRetry,
}

impl BinanceClient {
    pub fn new(config: BinanceConfig) -> Result<Self, ExchangeError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            config,
            retry: ReadRetry::default(),
        })
    }

    pub fn with_read_retry(mut self, retry: ReadRetry) -> Self {
        self.retry = retry;
        self
    }

    /// "BTC/USDT" → "BTCUSDT"
    fn market_symbol(symbol: &str) -> String {
        symbol.replace(['/', '-'], "").to_uppercase()
    }

    fn side_param(side: Side) -> &'static str {
        match side {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }

    fn sign(&self, query: &str) -> Result<String, ExchangeError> {
        let mut mac = HmacSha256::new_from_slice(self.config.secret_key.expose_secret().as_bytes())
            .map_err(|e| ExchangeError::Unauthorized(e.to_string()))?;
        mac.update(query.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// 서명 요청 쿼리 생성 (timestamp, recvWindow, signature 추가).
    fn signed_query(&self, params: &[(&str, String)]) -> Result<String, ExchangeError> {
        let mut params: Vec<(&str, String)> = params.to_vec();
        params.push(("recvWindow", RECV_WINDOW_MS.to_string()));
        params.push(("timestamp", trader_core::now_millis().to_string()));
        let query = serde_urlencoded::to_string(&params)
            .map_err(|e| ExchangeError::ParseError(e.to_string()))?;
        let signature = self.sign(&query)?;
        Ok(format!("{}&signature={}", query, signature))
    }

    async fn request<T: for<'de> Deserialize<'de>>(
        &self,
        method: Method,
        endpoint: &str,
        params: &[(&str, String)],
        signed: bool,
    ) -> Result<T, ExchangeError> {
        let query = if signed {
            self.signed_query(params)?
        } else {
            serde_urlencoded::to_string(params)
                .map_err(|e| ExchangeError::ParseError(e.to_string()))?
        };
        let url = format!("{}{}?{}", self.config.base_url, endpoint, query);

        let mut builder = self.client.request(method, &url);
        if signed {
            builder = builder.header("X-MBX-APIKEY", &self.config.api_key);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(Self::map_error(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| ExchangeError::ParseError(e.to_string()))
    }

    /// HTTP 상태 + 에러 본문을 `ExchangeError`로 변환.
    fn map_error(status: StatusCode, body: &str) -> ExchangeError {
        if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() == 418 {
            return ExchangeError::RateLimited {
                retry_after_ms: None,
            };
        }
        if status.is_server_error() {
            return ExchangeError::NetworkError(format!("HTTP {}: {}", status, body));
        }

        match serde_json::from_str::<BinanceErrorBody>(body) {
            Ok(err) => match err.code {
                // -2011: Unknown order sent, -2013: Order does not exist
                -2011 | -2013 => ExchangeError::OrderNotFound(err.msg),
                -2010 if err.msg.contains("insufficient balance") => {
                    ExchangeError::InsufficientBalance(err.msg)
                }
                -2010 | -1013 | -1111 | -1121 => ExchangeError::Rejected(err.msg),
                -2014 | -2015 | -1022 => ExchangeError::Unauthorized(err.msg),
                code => ExchangeError::Api {
                    code,
                    message: err.msg,
                },
            },
            Err(_) => ExchangeError::Api {
                code: i64::from(status.as_u16()),
                message: body.to_string(),
            },
        }
    }

    async fn fetch_klines(
        &self,
        symbol: &str,
        interval: &str,
        limit: usize,
        start_time: Option<i64>,
    ) -> Result<Vec<Kline>, ExchangeError> {
        let mut params = vec![
            ("symbol", Self::market_symbol(symbol)),
            ("interval", interval.to_string()),
            ("limit", limit.to_string()),
        ];
        if let Some(start) = start_time {
            params.push(("startTime", start.to_string()));
        }

        let rows: Vec<Vec<serde_json::Value>> = self
            .request(Method::GET, "/api/v3/klines", &params, false)
            .await?;
        rows.iter().map(|row| parse_kline_row(row)).collect()
    }

    /// `start_time`부터 `limit`개를 1000개 단위로 나눠 조회.
    ///
    /// 다음 페이지는 직전 페이지 마지막 캔들 다음 시각부터 시작합니다.
    /// 요청보다 적게 오면 더 이상 캔들이 없는 것으로 보고 멈춥니다.
    async fn fetch_klines_paged(
        &self,
        symbol: &str,
        interval: &str,
        limit: usize,
        start_time: i64,
    ) -> Result<Vec<Kline>, ExchangeError> {
        let mut klines: Vec<Kline> = Vec::with_capacity(limit);
        let mut cursor = start_time;
        let mut pages = 0;

        while klines.len() < limit {
            let page_limit = (limit - klines.len()).min(KLINES_PAGE_LIMIT);
            let page = retry_read(&self.retry, "klines", || {
                self.fetch_klines(symbol, interval, page_limit, Some(cursor))
            })
            .await?;
            pages += 1;

            let Some(last_open) = page.last().map(|k| k.open_time) else {
                break;
            };
            let exhausted = page.len() < page_limit;
            klines.extend(page);
            if exhausted {
                break;
            }
            cursor = last_open + 1;
        }

        debug!(symbol, interval, pages, count = klines.len(), "[Binance] 캔들 분할 조회");
        Ok(klines)
    }

    async fn submit_order(
        &self,
        mut params: Vec<(&str, String)>,
        test_mode: bool,
    ) -> Result<OrderResponse, ExchangeError> {
        let client_order_id = params
            .iter()
            .find(|(k, _)| *k == "newClientOrderId")
            .map(|(_, v)| v.clone())
            .unwrap_or_default();

        if test_mode {
            // 검증 전용 엔드포인트는 빈 객체를 반환
            let _: serde_json::Value = self
                .request(Method::POST, "/api/v3/order/test", &params, true)
                .await?;
            return Ok(OrderResponse::simulated(client_order_id));
        }

        params.push(("newOrderRespType", "RESULT".to_string()));
        let order: BinanceOrder = self
            .request(Method::POST, "/api/v3/order", &params, true)
            .await?;
        debug!(
            client_order_id = %order.client_order_id,
            order_id = order.order_id,
            "[Binance] 주문 접수"
        );
        order.response()
    }

    async fn cancel(
        &self,
        symbol: &str,
        id: &str,
        is_custom_id: bool,
    ) -> Result<OrderResponse, ExchangeError> {
        let id_key = if is_custom_id {
            "origClientOrderId"
        } else {
            "orderId"
        };
        let params = [
            ("symbol", Self::market_symbol(symbol)),
            (id_key, id.to_string()),
        ];
        let order: BinanceOrder = self
            .request(Method::DELETE, "/api/v3/order", &params, true)
            .await?;
        order.response()
    }
}

/// `[openTime, "open", "high", "low", "close", "volume", ...]` 배열 파싱.
fn parse_kline_row(row: &[serde_json::Value]) -> Result<Kline, ExchangeError> {
    let decimal_at = |i: usize| -> Result<Decimal, ExchangeError> {
        row.get(i)
            .and_then(|v| v.as_str())
            .ok_or_else(|| ExchangeError::ParseError(format!("캔들 필드 {} 누락", i)))?
            .parse::<Decimal>()
            .map_err(|e| ExchangeError::ParseError(e.to_string()))
    };
    let open_time = row
        .first()
        .and_then(|v| v.as_i64())
        .ok_or_else(|| ExchangeError::ParseError("캔들 시작 시각 누락".to_string()))?;

    Ok(Kline::new(
        open_time,
        decimal_at(1)?,
        decimal_at(2)?,
        decimal_at(3)?,
        decimal_at(4)?,
        decimal_at(5)?,
    ))
}

#[async_trait]
impl ExchangeAdapter for BinanceClient {
    fn exchange_name(&self) -> &str {
        "binance"
    }

    async fn place_limit_order(
        &self,
        symbol: &str,
        side: Side,
        quantity: Decimal,
        price: Decimal,
        test_mode: bool,
        custom_id: &str,
    ) -> Result<OrderResponse, ExchangeError> {
        let params = vec![
            ("symbol", Self::market_symbol(symbol)),
            ("side", Self::side_param(side).to_string()),
            ("type", "LIMIT".to_string()),
            ("timeInForce", "GTC".to_string()),
            ("quantity", quantity.normalize().to_string()),
            ("price", price.normalize().to_string()),
            ("newClientOrderId", custom_id.to_string()),
        ];
        self.submit_order(params, test_mode).await
    }

    async fn place_market_order(
        &self,
        symbol: &str,
        side: Side,
        quantity: Decimal,
        test_mode: bool,
        custom_id: &str,
    ) -> Result<OrderResponse, ExchangeError> {
        let params = vec![
            ("symbol", Self::market_symbol(symbol)),
            ("side", Self::side_param(side).to_string()),
            ("type", "MARKET".to_string()),
            ("quantity", quantity.normalize().to_string()),
            ("newClientOrderId", custom_id.to_string()),
        ];
        self.submit_order(params, test_mode).await
    }

    async fn place_stop_loss_market_order(
        &self,
        symbol: &str,
        side: Side,
        quantity: Decimal,
        price: Decimal,
        test_mode: bool,
        custom_id: &str,
    ) -> Result<OrderResponse, ExchangeError> {
        let params = vec![
            ("symbol", Self::market_symbol(symbol)),
            ("side", Self::side_param(side).to_string()),
            ("type", "STOP_LOSS".to_string()),
            ("quantity", quantity.normalize().to_string()),
            ("stopPrice", price.normalize().to_string()),
            ("newClientOrderId", custom_id.to_string()),
        ];
        self.submit_order(params, test_mode).await
    }

    async fn cancel_order(
        &self,
        symbol: &str,
        id: &str,
        is_custom_id: bool,
    ) -> Result<OrderResponse, ExchangeError> {
        self.cancel(symbol, id, is_custom_id).await
    }

    async fn cancel_algo_order(
        &self,
        symbol: &str,
        id: &str,
        is_custom_id: bool,
    ) -> Result<OrderResponse, ExchangeError> {
        // 현물 STOP_LOSS 주문은 일반 주문 취소 엔드포인트를 공유
        self.cancel(symbol, id, is_custom_id).await
    }

    async fn get_order(
        &self,
        symbol: &str,
        id: &str,
        is_custom_id: bool,
    ) -> Result<OrderStatusReport, ExchangeError> {
        let id_key = if is_custom_id {
            "origClientOrderId"
        } else {
            "orderId"
        };
        let params = [
            ("symbol", Self::market_symbol(symbol)),
            (id_key, id.to_string()),
        ];
        let order: BinanceOrder = retry_read(&self.retry, "order", || {
            self.request(Method::GET, "/api/v3/order", &params, true)
        })
        .await?;
        order.report()
    }

    async fn get_open_orders(
        &self,
        symbol: &str,
    ) -> Result<Vec<(String, OrderStatusReport)>, ExchangeError> {
        let params = [("symbol", Self::market_symbol(symbol))];
        let orders: Vec<BinanceOrder> = retry_read(&self.retry, "openOrders", || {
            self.request(Method::GET, "/api/v3/openOrders", &params, true)
        })
        .await?;
        orders
            .iter()
            .map(|o| Ok((o.client_order_id.clone(), o.report()?)))
            .collect()
    }

    async fn get_ohlcv(
        &self,
        symbol: &str,
        interval: &str,
        limit: usize,
        start_time: Option<i64>,
    ) -> Result<Vec<Kline>, ExchangeError> {
        let result = match start_time {
            Some(start) if limit > KLINES_PAGE_LIMIT => {
                self.fetch_klines_paged(symbol, interval, limit, start).await
            }
            // 시작 시각 없이 최신 캔들만 볼 때는 한 페이지로 충분
            _ => {
                let limit = limit.clamp(1, KLINES_PAGE_LIMIT);
                retry_read(&self.retry, "klines", || {
                    self.fetch_klines(symbol, interval, limit, start_time)
                })
                .await
            }
        };
        if let Err(e) = &result {
            warn!(symbol, interval, error = %e, "[Binance] 캔들 조회 실패");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use rust_decimal_macros::dec;

    fn client(url: &str) -> BinanceClient {
        BinanceClient::new(BinanceConfig::new("key", "secret").with_base_url(url))
            .unwrap()
            .with_read_retry(ReadRetry::once())
    }

    #[test]
    fn test_market_symbol() {
        assert_eq!(BinanceClient::market_symbol("btc/usdt"), "BTCUSDT");
        assert_eq!(BinanceClient::market_symbol("DASH-ETH"), "DASHETH");
    }

    #[test]
    fn test_debug_masks_secret() {
        let config = BinanceConfig::new("key", "secret");
        let printed = format!("{:?}", config);
        assert!(!printed.contains("secret\""));
        assert!(printed.contains("***"));
    }

    #[tokio::test]
    async fn test_klines_parsed() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v3/klines")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("symbol".into(), "BTCUSDT".into()),
                Matcher::UrlEncoded("interval".into(), "1m".into()),
                Matcher::UrlEncoded("startTime".into(), "60000".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"[[60000,"100.0","105.0","99.0","101.0","12.5",119999,"0",1,"0","0","0"]]"#,
            )
            .create_async()
            .await;

        let klines = client(&server.url())
            .get_ohlcv("BTC/USDT", "1m", 2, Some(60_000))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(klines.len(), 1);
        assert_eq!(klines[0].open_time, 60_000);
        assert_eq!(klines[0].low, dec!(99.0));
        assert_eq!(klines[0].volume, dec!(12.5));
    }

    /// 1분 캔들 `count`개 응답 본문 (`first`번째 분부터).
    fn kline_rows(first: i64, count: i64) -> String {
        let rows: Vec<String> = (first..first + count)
            .map(|i| {
                let t = i * 60_000;
                format!(
                    r#"[{},"100","101","99","100","1",{},"0",1,"0","0","0"]"#,
                    t,
                    t + 59_999
                )
            })
            .collect();
        format!("[{}]", rows.join(","))
    }

    #[tokio::test]
    async fn test_long_gap_is_fetched_in_pages() {
        let mut server = mockito::Server::new_async().await;
        let first = server
            .mock("GET", "/api/v3/klines")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("startTime".into(), "0".into()),
                Matcher::UrlEncoded("limit".into(), "1000".into()),
            ]))
            .with_status(200)
            .with_body(kline_rows(0, 1000))
            .create_async()
            .await;
        let second = server
            .mock("GET", "/api/v3/klines")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("startTime".into(), (999 * 60_000 + 1).to_string()),
                Matcher::UrlEncoded("limit".into(), "500".into()),
            ]))
            .with_status(200)
            .with_body(kline_rows(1000, 500))
            .create_async()
            .await;

        let klines = client(&server.url())
            .get_ohlcv("BTC/USDT", "1m", 1500, Some(0))
            .await
            .unwrap();

        first.assert_async().await;
        second.assert_async().await;
        assert_eq!(klines.len(), 1500);
        assert_eq!(klines[999].open_time, 999 * 60_000);
        assert_eq!(klines[1000].open_time, 1000 * 60_000);
        assert_eq!(klines[1499].open_time, 1499 * 60_000);
    }

    #[tokio::test]
    async fn test_paging_stops_when_history_ends() {
        let mut server = mockito::Server::new_async().await;
        let page = server
            .mock("GET", "/api/v3/klines")
            .match_query(Matcher::UrlEncoded("limit".into(), "1000".into()))
            .with_status(200)
            .with_body(kline_rows(0, 300))
            .expect(1)
            .create_async()
            .await;

        let klines = client(&server.url())
            .get_ohlcv("BTC/USDT", "1m", 2000, Some(0))
            .await
            .unwrap();

        page.assert_async().await;
        assert_eq!(klines.len(), 300);
    }

    #[test]
    fn test_signed_query_appends_signature() {
        let c = BinanceClient::new(BinanceConfig::new("key", "secret")).unwrap();
        let query = c
            .signed_query(&[("symbol", "BTCUSDT".to_string()), ("newClientOrderId", "a b".to_string())])
            .unwrap();

        let (payload, signature) = query.rsplit_once("&signature=").unwrap();
        assert!(payload.starts_with("symbol=BTCUSDT&newClientOrderId=a+b&recvWindow=5000&timestamp="));
        assert_eq!(signature, c.sign(payload).unwrap());
        assert_eq!(signature.len(), 64);
    }

    #[tokio::test]
    async fn test_unknown_order_maps_to_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("DELETE", "/api/v3/order")
            .match_query(Matcher::UrlEncoded(
                "origClientOrderId".into(),
                "abc123".into(),
            ))
            .with_status(400)
            .with_body(r#"{"code":-2011,"msg":"Unknown order sent."}"#)
            .create_async()
            .await;

        let result = client(&server.url())
            .cancel_order("BTC/USDT", "abc123", true)
            .await;
        assert!(matches!(result, Err(ExchangeError::OrderNotFound(_))));
    }

    #[tokio::test]
    async fn test_limit_order_sends_client_id() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v3/order")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("newClientOrderId".into(), "cid1".into()),
                Matcher::UrlEncoded("type".into(), "LIMIT".into()),
                Matcher::UrlEncoded("price".into(), "100.5".into()),
            ]))
            .match_header("X-MBX-APIKEY", "key")
            .with_status(200)
            .with_body(
                r#"{"symbol":"BTCUSDT","orderId":42,"clientOrderId":"cid1","price":"100.5",
                   "origQty":"1","executedQty":"0","cummulativeQuoteQty":"0",
                   "status":"NEW","type":"LIMIT","side":"BUY"}"#,
            )
            .create_async()
            .await;

        let response = client(&server.url())
            .place_limit_order("BTC/USDT", Side::Buy, dec!(1), dec!(100.50), false, "cid1")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.exchange_order_id.as_deref(), Some("42"));
        assert_eq!(response.status, OrderStatus::Open);
    }

    #[tokio::test]
    async fn test_rejection_and_rate_limit() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/v3/order")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body(r#"{"code":-1013,"msg":"Filter failure: LOT_SIZE"}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/api/v3/order")
            .match_query(Matcher::Any)
            .with_status(429)
            .create_async()
            .await;

        let c = client(&server.url());
        let rejected = c
            .place_market_order("BTC/USDT", Side::Buy, dec!(0.00001), false, "cid2")
            .await;
        assert!(matches!(rejected, Err(ExchangeError::Rejected(_))));

        let limited = c.get_order("BTC/USDT", "cid2", true).await;
        assert!(matches!(limited, Err(ExchangeError::RateLimited { .. })));
    }

    #[tokio::test]
    async fn test_filled_order_reports_average_price() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v3/order")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                r#"{"symbol":"BTCUSDT","orderId":7,"clientOrderId":"cid3","price":"0.00",
                   "origQty":"2","executedQty":"2","cummulativeQuoteQty":"201",
                   "status":"FILLED","type":"MARKET","side":"BUY"}"#,
            )
            .create_async()
            .await;

        let report = client(&server.url())
            .get_order("BTC/USDT", "cid3", true)
            .await
            .unwrap();
        assert_eq!(report.status, OrderStatus::Closed);
        assert_eq!(report.fill_price, Some(dec!(100.5)));
    }
}
