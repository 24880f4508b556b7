//! 실행 엔진 에러 타입.

use thiserror::Error;
use trader_core::IntervalError;
use trader_data::DataError;
use trader_exchange::ExchangeError;
use trader_strategy::StrategyError;

/// 주문 엔진/봇 컨트롤러 에러.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// 잘못된 캔들 간격 문자열
    #[error(transparent)]
    InvalidInterval(#[from] IntervalError),

    /// 거래소가 주문을 거부 (레코드는 거부 상태로 저장됨)
    #[error("주문 거부 [{order_id}]: {reason}")]
    ExchangeRejected { order_id: String, reason: String },

    /// 거래소에 해당 주문이 없음 (이미 종료된 것으로 취급)
    #[error("주문을 찾을 수 없음: {0}")]
    OrderNotFound(String),

    /// 일시적 네트워크 장애 (레코드는 변경되지 않음, 다음 주기에 재시도)
    #[error("일시적 네트워크 에러: {0}")]
    TransientNetwork(String),

    /// 그 밖의 거래소 에러 (인증, 파싱 등)
    #[error("거래소 에러: {0}")]
    Exchange(ExchangeError),

    /// 저장소 에러
    #[error("저장소 에러: {0}")]
    Storage(#[from] DataError),

    /// 주문 파라미터 검증 실패
    #[error("잘못된 주문: {0}")]
    InvalidOrder(String),

    /// 전략 에러
    #[error(transparent)]
    Strategy(#[from] StrategyError),
}

impl ExecutionError {
    /// 거래소 에러를 주문 문맥과 함께 분류.
    pub fn from_exchange(err: ExchangeError, order_id: &str) -> Self {
        match err {
            ExchangeError::Rejected(reason) | ExchangeError::InsufficientBalance(reason) => {
                ExecutionError::ExchangeRejected {
                    order_id: order_id.to_string(),
                    reason,
                }
            }
            ExchangeError::OrderNotFound(_) => ExecutionError::OrderNotFound(order_id.to_string()),
            e if e.is_retryable() => ExecutionError::TransientNetwork(e.to_string()),
            e => ExecutionError::Exchange(e),
        }
    }

    /// 주문 제출 실패 분류.
    ///
    /// 일시적 에러가 아니면 레코드가 `Rejected`로 저장되므로, 원인과 관계없이
    /// `ExchangeRejected`로 보고합니다.
    pub fn from_submit(err: ExchangeError, order_id: &str) -> Self {
        if err.is_retryable() {
            return ExecutionError::TransientNetwork(err.to_string());
        }
        let reason = match err {
            ExchangeError::Rejected(reason) | ExchangeError::InsufficientBalance(reason) => reason,
            other => other.to_string(),
        };
        ExecutionError::ExchangeRejected {
            order_id: order_id.to_string(),
            reason,
        }
    }

    /// 저장소 손상/장애 여부 (저장소 복구 정책 대상).
    pub fn is_storage(&self) -> bool {
        matches!(self, ExecutionError::Storage(_))
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, ExecutionError::TransientNetwork(_))
    }
}

impl From<ExchangeError> for ExecutionError {
    fn from(err: ExchangeError) -> Self {
        ExecutionError::from_exchange(err, "")
    }
}

pub type Result<T> = std::result::Result<T, ExecutionError>;
