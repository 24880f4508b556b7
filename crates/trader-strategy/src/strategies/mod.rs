//! 내장 트레이딩 전략.
//!
//! - **AlwaysSignal**: 진입/청산 신호를 항상 내는 템플릿 전략.
//! - **TrailingProfit**: 거래량 급증 진입 + 트레일링 익절/손절.
//!
//! 전략 선택은 설정 시점에 [`create_strategy`]로 합니다.

pub mod always_signal;
pub mod trailing_profit;

pub use always_signal::AlwaysSignal;
pub use trailing_profit::{TrailingProfit, TrailingProfitConfig};

use serde_json::Value;
use tracing::debug;

use crate::{Strategy, StrategyError};

/// 이름과 JSON 파라미터로 전략 생성.
///
/// `params`가 `null`이면 기본 설정을 사용합니다.
pub fn create_strategy(name: &str, params: &Value) -> Result<Box<dyn Strategy>, StrategyError> {
    let strategy: Box<dyn Strategy> = match name.to_lowercase().as_str() {
        "always" | "always_signal" => Box::new(AlwaysSignal::new()),
        "trailing_profit" | "trailing" => Box::new(TrailingProfit::from_params(params)?),
        other => return Err(StrategyError::UnknownStrategy(other.to_string())),
    };
    debug!(strategy = strategy.name(), "전략 생성");
    Ok(strategy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_factory_selects_by_name() {
        let s = create_strategy("always", &Value::Null).unwrap();
        assert_eq!(s.name(), "always_signal");

        let s = create_strategy("Trailing_Profit", &json!({"profit": "0.1"})).unwrap();
        assert_eq!(s.name(), "trailing_profit");
    }

    #[test]
    fn test_factory_rejects_unknown() {
        assert!(matches!(
            create_strategy("rsi", &Value::Null),
            Err(StrategyError::UnknownStrategy(_))
        ));
        assert!(matches!(
            create_strategy("trailing_profit", &json!({"profit": "abc"})),
            Err(StrategyError::InvalidParams(_))
        ));
    }
}
