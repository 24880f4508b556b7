//! 매매 신호 전략.
//!
//! 전략은 캔들 데이터를 받아 진입/청산 신호(불리언)를 내고,
//! 보유 포지션의 익절/손절 임계값 수정을 제안합니다.
//! 구체 전략은 설정 시점에 [`create_strategy`]로 선택합니다.

pub mod error;
pub mod strategies;
pub mod traits;

pub use error::StrategyError;
pub use strategies::{create_strategy, AlwaysSignal, TrailingProfit, TrailingProfitConfig};
pub use traits::Strategy;
