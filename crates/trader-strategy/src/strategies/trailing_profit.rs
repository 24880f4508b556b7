//! 트레일링 익절 전략.
//!
//! # 진입
//!
//! 최근 `window`개 캔들 평균 대비 마지막 캔들의 거래량이 `vol_threshold`배를 넘고,
//! 고가는 평균 종가의 `price_threshold`배를 넘지 않으며, 직전 종가보다 올랐을 때.
//!
//! # 청산
//!
//! ```text
//! 손절선 초기값 = 진입가 × (1 - stop_loss)
//! 종가 ≥ 진입가 × (1 + 목표수익률)  →  목표수익률 += increase_profit
//!                                     손절선 = 종가 × (1 - profit_margin)
//! 종가 ≤ 손절선                      →  청산 신호
//! ```
//!
//! 손절선은 엔진의 래칫 규칙을 거쳐 올라가기만 합니다.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;
use trader_core::{ExitAdjustment, Kline, Order};

use crate::{Strategy, StrategyError};

/// 트레일링 익절 전략 설정.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrailingProfitConfig {
    /// 첫 목표 수익률 (0.05 = 5%)
    pub profit: Decimal,
    /// 목표 도달 시 목표 수익률 증가분
    pub increase_profit: Decimal,
    /// 목표 도달 시 손절선과 종가 사이 간격
    pub profit_margin: Decimal,
    /// 초기 손절 비율
    pub stop_loss: Decimal,
    /// 평균 계산 캔들 수
    pub window: usize,
    /// 가격 과열 배수 (고가 > 평균 종가 × 배수면 진입 안 함)
    pub price_threshold: Decimal,
    /// 거래량 급증 배수
    pub vol_threshold: Decimal,
}

impl Default for TrailingProfitConfig {
    fn default() -> Self {
        Self {
            profit: Decimal::new(5, 2),
            increase_profit: Decimal::new(5, 2),
            profit_margin: Decimal::new(1, 2),
            stop_loss: Decimal::new(1, 1),
            window: 48,
            price_threshold: Decimal::new(11, 1),
            vol_threshold: Decimal::TEN,
        }
    }
}

impl TrailingProfitConfig {
    fn validate(&self) -> Result<(), StrategyError> {
        let non_negative = [
            ("profit", self.profit),
            ("increase_profit", self.increase_profit),
            ("profit_margin", self.profit_margin),
        ];
        for (name, value) in non_negative {
            if value < Decimal::ZERO {
                return Err(StrategyError::InvalidParams(format!(
                    "{}는 음수일 수 없습니다: {}",
                    name, value
                )));
            }
        }
        if self.stop_loss <= Decimal::ZERO || self.stop_loss >= Decimal::ONE {
            return Err(StrategyError::InvalidParams(format!(
                "stop_loss는 0과 1 사이여야 합니다: {}",
                self.stop_loss
            )));
        }
        if self.window < 2 {
            return Err(StrategyError::InvalidParams(
                "window는 2 이상이어야 합니다".to_string(),
            ));
        }
        Ok(())
    }
}

/// 포지션별 트레일링 상태.
#[derive(Debug, Clone, PartialEq)]
struct TrailState {
    position_id: String,
    target_profit: Decimal,
    stop: Decimal,
}

#[derive(Debug, Clone)]
pub struct TrailingProfit {
    config: TrailingProfitConfig,
    klines: Vec<Kline>,
    trail: Option<TrailState>,
}

impl TrailingProfit {
    pub fn new(config: TrailingProfitConfig) -> Result<Self, StrategyError> {
        config.validate()?;
        Ok(Self {
            config,
            klines: Vec::new(),
            trail: None,
        })
    }

    /// JSON 파라미터로 생성. `null`이면 기본 설정.
    pub fn from_params(params: &Value) -> Result<Self, StrategyError> {
        let config = if params.is_null() {
            TrailingProfitConfig::default()
        } else {
            serde_json::from_value(params.clone())
                .map_err(|e| StrategyError::InvalidParams(e.to_string()))?
        };
        Self::new(config)
    }

    pub fn config(&self) -> &TrailingProfitConfig {
        &self.config
    }

    fn last_close(&self) -> Option<Decimal> {
        self.klines.last().map(|k| k.close)
    }

    fn initial_stop(&self, entry_price: Decimal) -> Decimal {
        entry_price * (Decimal::ONE - self.config.stop_loss)
    }

    /// 현재 포지션에 적용되는 손절선.
    fn current_stop(&self, position: &Order) -> Option<Decimal> {
        let entry_price = position.entry_price?;
        match &self.trail {
            Some(t) if t.position_id == position.position_id => Some(t.stop),
            _ => Some(self.initial_stop(entry_price)),
        }
    }
}

impl Strategy for TrailingProfit {
    fn name(&self) -> &str {
        "trailing_profit"
    }

    fn set_up(&mut self, klines: &[Kline]) -> Result<(), StrategyError> {
        if klines.len() < 2 {
            return Err(StrategyError::InsufficientData {
                required: 2,
                actual: klines.len(),
            });
        }
        let start = klines.len().saturating_sub(self.config.window);
        self.klines = klines[start..].to_vec();
        Ok(())
    }

    fn check_long_signal(&self) -> bool {
        let n = self.klines.len();
        if n < 2 {
            return false;
        }
        let last = &self.klines[n - 1];
        let prev = &self.klines[n - 2];

        let count = Decimal::from(n);
        let avg_close = self.klines.iter().map(|k| k.close).sum::<Decimal>() / count;
        let avg_volume = self.klines.iter().map(|k| k.volume).sum::<Decimal>() / count;

        let price_increased = last.close > prev.close;
        let price_over_threshold = last.high > self.config.price_threshold * avg_close;
        let volume_spike = last.volume > self.config.vol_threshold * avg_volume;

        volume_spike && !price_over_threshold && price_increased
    }

    fn check_short_signal(&self, position: Option<&Order>) -> bool {
        let (Some(position), Some(close)) = (position, self.last_close()) else {
            return false;
        };
        match self.current_stop(position) {
            Some(stop) => close <= stop,
            None => false,
        }
    }

    fn update_exit_thresholds(&mut self, position: &Order) -> Option<ExitAdjustment> {
        let entry_price = position.entry_price?;
        let close = self.last_close()?;

        let is_same_position = self
            .trail
            .as_ref()
            .is_some_and(|t| t.position_id == position.position_id);
        if !is_same_position {
            self.trail = Some(TrailState {
                position_id: position.position_id.clone(),
                target_profit: self.config.profit,
                stop: self.initial_stop(entry_price),
            });
        }

        let config = &self.config;
        let trail = self.trail.as_mut()?;
        if close >= entry_price * (Decimal::ONE + trail.target_profit) {
            trail.target_profit += config.increase_profit;
            trail.stop = close * (Decimal::ONE - config.profit_margin);
            debug!(
                position_id = %position.position_id,
                target_profit = %trail.target_profit,
                stop = %trail.stop,
                "목표 수익 도달, 손절선 상향"
            );
        }

        Some(ExitAdjustment {
            take_profit_price: None,
            stop_price: Some(trail.stop),
        })
    }

    fn get_state(&self) -> Value {
        match &self.trail {
            Some(t) => json!({
                "position_id": t.position_id,
                "target_profit": t.target_profit.to_string(),
                "stop": t.stop.to_string(),
            }),
            None => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use trader_core::{OrderParams, OrderType, Side};

    fn kline(i: i64, close: Decimal, volume: Decimal) -> Kline {
        Kline::new(i * 60_000, close, close, close, close, volume)
    }

    fn flat_series(n: i64) -> Vec<Kline> {
        (0..n).map(|i| kline(i, dec!(100), dec!(1))).collect()
    }

    fn filled_entry(entry_price: Decimal) -> Order {
        let params = OrderParams::new(1, Side::Buy, OrderType::Market, dec!(1)).entry();
        let mut order = Order::from_params("BTC/USDT", &params, None, true, 0);
        order.entry_price = Some(entry_price);
        order
    }

    fn strategy() -> TrailingProfit {
        TrailingProfit::new(TrailingProfitConfig {
            window: 20,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_volume_spike_triggers_long() {
        let mut s = strategy();
        let mut klines = flat_series(19);
        klines.push(kline(19, dec!(101), dec!(50)));
        s.set_up(&klines).unwrap();
        assert!(s.check_long_signal());
    }

    #[test]
    fn test_no_long_without_spike_or_rise() {
        let mut s = strategy();
        s.set_up(&flat_series(20)).unwrap();
        assert!(!s.check_long_signal());

        // 거래량은 급증했지만 가격 하락
        let mut klines = flat_series(19);
        klines.push(kline(19, dec!(99), dec!(50)));
        s.set_up(&klines).unwrap();
        assert!(!s.check_long_signal());
    }

    #[test]
    fn test_set_up_requires_two_candles() {
        let mut s = strategy();
        assert!(matches!(
            s.set_up(&flat_series(1)),
            Err(StrategyError::InsufficientData { actual: 1, .. })
        ));
    }

    #[test]
    fn test_stop_trails_after_target() {
        let mut s = strategy();
        let entry = filled_entry(dec!(100));

        s.set_up(&flat_series(5)).unwrap();
        let adj = s.update_exit_thresholds(&entry).unwrap();
        assert_eq!(adj.stop_price, Some(dec!(90.0)));
        assert_eq!(adj.take_profit_price, None);

        // 종가 106 ≥ 100 × 1.05 → 손절선 106 × 0.99
        let mut klines = flat_series(4);
        klines.push(kline(4, dec!(106), dec!(1)));
        s.set_up(&klines).unwrap();
        let adj = s.update_exit_thresholds(&entry).unwrap();
        assert_eq!(adj.stop_price, Some(dec!(104.94)));

        // 다음 목표는 110; 108에서는 변화 없음
        let mut klines = flat_series(4);
        klines.push(kline(4, dec!(108), dec!(1)));
        s.set_up(&klines).unwrap();
        let adj = s.update_exit_thresholds(&entry).unwrap();
        assert_eq!(adj.stop_price, Some(dec!(104.94)));
    }

    #[test]
    fn test_short_signal_at_stop() {
        let mut s = strategy();
        let entry = filled_entry(dec!(100));

        let mut klines = flat_series(4);
        klines.push(kline(4, dec!(91), dec!(1)));
        s.set_up(&klines).unwrap();
        assert!(!s.check_short_signal(Some(&entry)));

        let mut klines = flat_series(4);
        klines.push(kline(4, dec!(90), dec!(1)));
        s.set_up(&klines).unwrap();
        assert!(s.check_short_signal(Some(&entry)));
        assert!(!s.check_short_signal(None));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = TrailingProfitConfig {
            stop_loss: dec!(1.5),
            ..Default::default()
        };
        assert!(matches!(
            TrailingProfit::new(config),
            Err(StrategyError::InvalidParams(_))
        ));
    }
}
