//! 거래소 에러 타입.

use thiserror::Error;

/// 거래소 어댑터 에러.
///
/// 재시도 가능 여부(`is_retryable`)와 치명성(`is_fatal`) 분류를 함께 제공합니다.
/// 엔진은 재시도 가능한 에러를 "다음 폴링 주기에 다시 시도"로 취급합니다.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExchangeError {
    /// 네트워크 에러 (연결 실패, 응답 없음)
    #[error("네트워크 에러: {0}")]
    NetworkError(String),

    /// 요청 시간 초과
    #[error("요청 시간 초과: {0}")]
    Timeout(String),

    /// Rate Limit 초과
    #[error("Rate limit 초과")]
    RateLimited {
        /// 거래소가 지정한 대기 시간 (ms)
        retry_after_ms: Option<u64>,
    },

    /// 주문 접수 거부
    #[error("주문 거부: {0}")]
    Rejected(String),

    /// 거래소에 해당 주문이 없음 (이미 체결/취소되었거나 존재하지 않음)
    #[error("주문을 찾을 수 없음: {0}")]
    OrderNotFound(String),

    /// 잔고 부족
    #[error("잔고 부족: {0}")]
    InsufficientBalance(String),

    /// 인증 실패
    #[error("인증 실패: {0}")]
    Unauthorized(String),

    /// 응답 파싱 실패
    #[error("파싱 에러: {0}")]
    ParseError(String),

    /// 기타 API 에러
    #[error("API 에러 [{code}]: {message}")]
    Api { code: i64, message: String },

    /// 지원하지 않는 기능
    #[error("지원하지 않는 기능: {0}")]
    NotSupported(String),
}

impl ExchangeError {
    /// 일시적 장애로 재시도하면 성공할 수 있는 에러인지 여부.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ExchangeError::NetworkError(_)
                | ExchangeError::Timeout(_)
                | ExchangeError::RateLimited { .. }
        )
    }

    /// 재시도해도 결과가 바뀌지 않는 치명적 에러인지 여부.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ExchangeError::Rejected(_)
                | ExchangeError::InsufficientBalance(_)
                | ExchangeError::Unauthorized(_)
        )
    }

    /// 거래소가 지정한 재시도 대기 시간.
    pub fn retry_delay_ms(&self) -> Option<u64> {
        match self {
            ExchangeError::RateLimited { retry_after_ms } => *retry_after_ms,
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ExchangeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ExchangeError::Timeout(err.to_string())
        } else if err.is_decode() {
            ExchangeError::ParseError(err.to_string())
        } else {
            ExchangeError::NetworkError(err.to_string())
        }
    }
}
