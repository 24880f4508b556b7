//! 전략 에러 타입.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StrategyError {
    /// 등록되지 않은 전략 이름
    #[error("알 수 없는 전략: {0}")]
    UnknownStrategy(String),

    /// 파라미터 파싱/검증 실패
    #[error("잘못된 전략 파라미터: {0}")]
    InvalidParams(String),

    /// 신호 계산에 필요한 캔들 부족
    #[error("캔들 부족: 필요 {required}, 현재 {actual}")]
    InsufficientData { required: usize, actual: usize },
}
