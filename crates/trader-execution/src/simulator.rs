//! 주문 체결 시뮬레이터.
//!
//! 테스트 모드 주문은 거래소에 제출되지 않으므로 체결 이벤트가 없습니다.
//! 대신 마지막 확인 이후의 캔들을 가져와 체결 여부를 추론합니다.
//!
//! # 체결 규칙
//!
//! | 주문 유형 | 체결 조건 | 체결가 |
//! |-----------|-----------|--------|
//! | 지정가 매수 | 저가 ≤ 지정가 | 지정가 |
//! | 지정가 매도 | 고가 ≥ 지정가 | 지정가 |
//! | 시장가 | 첫 캔들 | (시가 + 종가) / 2 |
//! | 스톱 | 저가 ≥ 트리거 가격 | 트리거 가격 |
//!
//! 체결은 항상 전량 체결입니다.

use rust_decimal::Decimal;
use tracing::debug;
use trader_core::{Kline, KlineInterval, Order, OrderType, Side};
use trader_exchange::{ExchangeAdapter, ExchangeError, OrderStatusReport};

/// 캔들 조회 계획.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandleRequest {
    pub limit: usize,
    pub start_time: Option<i64>,
}

/// 마지막 확인 이후 공백을 빠짐없이 덮는 캔들 조회 계획.
///
/// 경과 시간이 캔들 하나보다 짧으면 최신 캔들 1개, 그렇지 않으면
/// `last_checked_time`부터 `ceil(경과 / 간격)`개를 가져옵니다.
pub fn candle_request(last_checked_time: i64, now_ms: i64, interval_ms: i64) -> CandleRequest {
    let elapsed = (now_ms - last_checked_time).max(0);
    if interval_ms <= 0 || elapsed < interval_ms {
        return CandleRequest {
            limit: 1,
            start_time: None,
        };
    }
    let count = (elapsed + interval_ms - 1) / interval_ms;
    CandleRequest {
        limit: count as usize,
        start_time: Some(last_checked_time),
    }
}

/// 시뮬레이션 체결 결과.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulatedFill {
    /// 체결된 캔들 인덱스
    pub candle_index: usize,
    /// 체결된 캔들 시작 시각
    pub open_time: i64,
    pub price: Decimal,
}

/// 캔들을 시간순으로 훑어 첫 체결 지점을 찾습니다.
pub fn find_fill(order: &Order, klines: &[Kline]) -> Option<SimulatedFill> {
    klines.iter().enumerate().find_map(|(i, k)| {
        let price = match order.order_type {
            OrderType::Market => Some(k.mid_open_close()),
            OrderType::Limit => {
                let limit = order.price?;
                let touched = match order.side {
                    Side::Buy => k.low <= limit,
                    Side::Sell => k.high >= limit,
                };
                touched.then_some(limit)
            }
            OrderType::StopLoss => {
                let trigger = order.price?;
                (k.low >= trigger).then_some(trigger)
            }
        }?;
        Some(SimulatedFill {
            candle_index: i,
            open_time: k.open_time,
            price,
        })
    })
}

/// 캔들 기반 주문 상태 추론.
///
/// 주문 레코드는 변경하지 않습니다. 캔들 조회가 실패하면 에러를 그대로 반환합니다.
pub async fn simulate_order_status(
    exchange: &dyn ExchangeAdapter,
    order: &Order,
    interval: &KlineInterval,
    now_ms: i64,
) -> Result<OrderStatusReport, ExchangeError> {
    let plan = candle_request(order.last_checked_time, now_ms, interval.as_millis());
    let klines = exchange
        .get_ohlcv(
            &order.symbol,
            &interval.to_string(),
            plan.limit,
            plan.start_time,
        )
        .await?;

    match find_fill(order, &klines) {
        Some(fill) => {
            debug!(
                order_id = %order.id,
                candle = fill.candle_index,
                price = %fill.price,
                "[Simulator] 체결"
            );
            Ok(OrderStatusReport::filled(
                order.side,
                order.original_quantity,
                Some(fill.price),
            ))
        }
        None => Ok(OrderStatusReport::open(order.side)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use trader_core::{OrderParams, OrderStatus};
    use trader_exchange::PaperExchange;

    const MINUTE: i64 = 60_000;

    fn order(side: Side, order_type: OrderType, price: Option<Decimal>) -> Order {
        let mut params = OrderParams::new(1, side, order_type, dec!(3));
        params.price = price;
        Order::from_params("BTC/USDT", &params, None, true, 0)
    }

    fn candle(t: i64, open: Decimal, high: Decimal, low: Decimal, close: Decimal) -> Kline {
        Kline::new(t, open, high, low, close, dec!(1))
    }

    fn lows(values: &[Decimal]) -> Vec<Kline> {
        values
            .iter()
            .enumerate()
            .map(|(i, low)| candle(i as i64 * MINUTE, dec!(110), dec!(120), *low, dec!(110)))
            .collect()
    }

    #[test]
    fn test_candle_request_within_one_interval() {
        let plan = candle_request(1_000, 1_000 + MINUTE - 1, MINUTE);
        assert_eq!(
            plan,
            CandleRequest {
                limit: 1,
                start_time: None
            }
        );
    }

    #[test]
    fn test_candle_request_covers_gap() {
        assert_eq!(
            candle_request(0, MINUTE, MINUTE),
            CandleRequest {
                limit: 1,
                start_time: Some(0)
            }
        );
        assert_eq!(
            candle_request(0, 2 * MINUTE + 1, MINUTE),
            CandleRequest {
                limit: 3,
                start_time: Some(0)
            }
        );
        // 시계가 뒤로 가도 음수 경과 시간은 0으로 취급
        assert_eq!(candle_request(5 * MINUTE, 0, MINUTE).limit, 1);
    }

    #[test]
    fn test_limit_buy_fills_on_first_touch() {
        let o = order(Side::Buy, OrderType::Limit, Some(dec!(100)));
        let fill = find_fill(&o, &lows(&[dec!(105), dec!(102), dec!(99)])).unwrap();
        assert_eq!(fill.candle_index, 2);
        assert_eq!(fill.price, dec!(100));

        assert!(find_fill(&o, &lows(&[dec!(105), dec!(100.01)])).is_none());
        assert!(find_fill(&o, &lows(&[dec!(100)])).is_some());
    }

    #[test]
    fn test_limit_sell_fills_on_high() {
        let o = order(Side::Sell, OrderType::Limit, Some(dec!(115)));
        let klines = vec![
            candle(0, dec!(100), dec!(110), dec!(95), dec!(105)),
            candle(MINUTE, dec!(105), dec!(116), dec!(104), dec!(112)),
        ];
        let fill = find_fill(&o, &klines).unwrap();
        assert_eq!(fill.candle_index, 1);
        assert_eq!(fill.price, dec!(115));
    }

    #[test]
    fn test_market_fills_on_first_candle_at_mid() {
        let o = order(Side::Buy, OrderType::Market, None);
        let klines = vec![
            candle(0, dec!(100), dec!(130), dec!(90), dec!(104)),
            candle(MINUTE, dec!(1), dec!(1), dec!(1), dec!(1)),
        ];
        let fill = find_fill(&o, &klines).unwrap();
        assert_eq!(fill.candle_index, 0);
        assert_eq!(fill.price, dec!(102));
        assert!(find_fill(&o, &[]).is_none());
    }

    #[test]
    fn test_stop_loss_fills_when_low_at_or_above_trigger() {
        let o = order(Side::Sell, OrderType::StopLoss, Some(dec!(100)));
        assert!(find_fill(&o, &lows(&[dec!(99), dec!(98)])).is_none());
        let fill = find_fill(&o, &lows(&[dec!(99), dec!(100)])).unwrap();
        assert_eq!(fill.candle_index, 1);
        assert_eq!(fill.price, dec!(100));
    }

    #[tokio::test]
    async fn test_simulate_fetches_gap_from_last_check() {
        let paper = PaperExchange::new();
        paper
            .set_klines("BTC/USDT", lows(&[dec!(105), dec!(102), dec!(99)]))
            .await;
        let o = order(Side::Buy, OrderType::Limit, Some(dec!(100)));
        let interval: KlineInterval = "1m".parse().unwrap();

        let report = simulate_order_status(&paper, &o, &interval, 3 * MINUTE)
            .await
            .unwrap();

        assert_eq!(report.status, OrderStatus::Closed);
        assert_eq!(report.executed_quantity, dec!(3));
        assert_eq!(report.fill_price, Some(dec!(100)));

        let requests = paper.ohlcv_requests().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].limit, 3);
        assert_eq!(requests[0].start_time, Some(0));
        assert_eq!(requests[0].interval, "1m");
    }

    #[tokio::test]
    async fn test_simulate_no_fill_stays_open() {
        let paper = PaperExchange::new();
        paper
            .set_klines("BTC/USDT", lows(&[dec!(105), dec!(102)]))
            .await;
        let o = order(Side::Buy, OrderType::Limit, Some(dec!(100)));
        let interval: KlineInterval = "1m".parse().unwrap();

        let report = simulate_order_status(&paper, &o, &interval, 10)
            .await
            .unwrap();
        assert_eq!(report.status, OrderStatus::Open);
        assert_eq!(report.executed_quantity, Decimal::ZERO);
    }
}
