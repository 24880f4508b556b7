//! 신호를 항상 내는 템플릿 전략.
//!
//! 진입 신호와 청산 신호가 모두 항상 참입니다. 봇 배선 점검과
//! 페이퍼 트레이딩 테스트용입니다.

use serde_json::{json, Value};
use trader_core::{Kline, Order};

use crate::{Strategy, StrategyError};

#[derive(Debug, Default, Clone)]
pub struct AlwaysSignal {
    candles_seen: usize,
}

impl AlwaysSignal {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Strategy for AlwaysSignal {
    fn name(&self) -> &str {
        "always_signal"
    }

    fn set_up(&mut self, klines: &[Kline]) -> Result<(), StrategyError> {
        self.candles_seen = klines.len();
        Ok(())
    }

    fn check_long_signal(&self) -> bool {
        true
    }

    fn check_short_signal(&self, _position: Option<&Order>) -> bool {
        true
    }

    fn get_state(&self) -> Value {
        json!({ "candles_seen": self.candles_seen })
    }
}
