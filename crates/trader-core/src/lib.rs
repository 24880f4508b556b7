//! 주문 생명주기 엔진의 핵심 도메인 타입.
//!
//! 이 crate는 다음을 제공합니다:
//! - 캔들 간격 문자열("15m", "1h" 등)의 밀리초 변환
//! - 영속화되는 주문 레코드(`Order`)와 주문 파라미터
//! - 매수/매도, 주문 유형, 주문 상태 등 닫힌 열거형
//! - 포지션 뷰와 트레일링 임계값 래칫
//!
//! # 예제
//!
//! ```rust
//! use trader_core::kline_interval_to_ms;
//!
//! assert_eq!(kline_interval_to_ms("15m").unwrap(), 900_000);
//! ```

pub mod domain;
pub mod interval;

pub use domain::*;
pub use interval::{kline_interval_to_ms, IntervalError, IntervalUnit, KlineInterval};

/// 현재 시각 (Unix epoch 기준 밀리초).
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
