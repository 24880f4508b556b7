//! 조회 요청 재시도.
//!
//! 캔들, 주문 상태, 미체결 목록처럼 다시 보내도 결과가 같은 조회에만 씁니다.
//! 주문 제출/취소는 재시도하지 않습니다. 실패하면 엔진이 다음 폴링 주기에
//! 같은 client order id로 다시 처리합니다.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::ExchangeError;

/// 조회 재시도 정책.
///
/// 대기 시간은 `base_delay`에서 시도마다 두 배로 늘어나며 `max_delay`를 넘지 않습니다.
/// 거래소가 `Retry-After`를 알려준 경우 그 값을 그대로 따릅니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadRetry {
    /// 전체 시도 횟수 (첫 시도 포함, 최소 1)
    pub attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// 대기 시간에 최대 25% 무작위 추가
    pub jitter: bool,
}

impl Default for ReadRetry {
    /// 한 폴링 주기 안에 끝나는 정도의 재시도.
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_millis(300),
            max_delay: Duration::from_secs(5),
            jitter: true,
        }
    }
}

impl ReadRetry {
    /// 한 번만 시도.
    pub fn once() -> Self {
        Self {
            attempts: 1,
            ..Default::default()
        }
    }

    /// `failed_attempts`번 실패한 뒤의 대기 시간.
    pub fn delay_after(&self, failed_attempts: u32, error: &ExchangeError) -> Duration {
        if let Some(ms) = error.retry_delay_ms() {
            return Duration::from_millis(ms).min(self.max_delay);
        }
        let exp = failed_attempts.saturating_sub(1).min(16);
        let delay = self.base_delay.saturating_mul(1 << exp).min(self.max_delay);
        if self.jitter {
            delay.mul_f64(1.0 + rand::random::<f64>() * 0.25)
        } else {
            delay
        }
    }
}

/// 조회 요청을 정책에 따라 실행.
///
/// 일시적 에러(`ExchangeError::is_retryable`)만 재시도하고, 나머지는 즉시 반환합니다.
/// `what`은 로그에 남길 요청 이름입니다.
pub async fn retry_read<T, F, Fut>(policy: &ReadRetry, what: &str, request: F) -> Result<T, ExchangeError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, ExchangeError>>,
{
    let attempts = policy.attempts.max(1);
    let mut failed = 0;

    loop {
        let err = match request().await {
            Ok(value) => {
                if failed > 0 {
                    debug!(request = what, failed, "재조회 성공");
                }
                return Ok(value);
            }
            Err(e) => e,
        };

        failed += 1;
        if !err.is_retryable() || failed >= attempts {
            if err.is_retryable() {
                warn!(request = what, attempts, error = %err, "재조회 한도 초과");
            }
            return Err(err);
        }

        let delay = policy.delay_after(failed, &err);
        debug!(
            request = what,
            failed,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "조회 실패, 재시도 대기"
        );
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn fixed(attempts: u32) -> ReadRetry {
        ReadRetry {
            attempts,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
            jitter: false,
        }
    }

    #[test]
    fn test_delay_doubles_and_caps() {
        let policy = fixed(5);
        let err = ExchangeError::NetworkError("reset".into());
        assert_eq!(policy.delay_after(1, &err), Duration::from_millis(1));
        assert_eq!(policy.delay_after(2, &err), Duration::from_millis(2));
        assert_eq!(policy.delay_after(3, &err), Duration::from_millis(4));
        assert_eq!(policy.delay_after(10, &err), Duration::from_millis(4));
    }

    #[test]
    fn test_rate_limit_hint_is_honored() {
        let policy = ReadRetry {
            max_delay: Duration::from_secs(10),
            ..fixed(3)
        };
        let err = ExchangeError::RateLimited {
            retry_after_ms: Some(1500),
        };
        assert_eq!(policy.delay_after(1, &err), Duration::from_millis(1500));
    }

    #[tokio::test]
    async fn test_transient_errors_then_success() {
        let counter = AtomicU32::new(0);
        let calls = &counter;

        let result = retry_read(&fixed(3), "klines", move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(ExchangeError::Timeout("slow".into()))
            } else {
                Ok("candles")
            }
        })
        .await;

        assert_eq!(result.unwrap(), "candles");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_unknown_order_returns_immediately() {
        let counter = AtomicU32::new(0);
        let calls = &counter;

        let result: Result<(), _> = retry_read(&fixed(3), "order", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ExchangeError::OrderNotFound("abc".into()))
        })
        .await;

        assert!(matches!(result, Err(ExchangeError::OrderNotFound(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_attempts() {
        let counter = AtomicU32::new(0);
        let calls = &counter;

        let result: Result<(), _> = retry_read(&fixed(2), "openOrders", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ExchangeError::NetworkError("down".into()))
        })
        .await;

        assert!(result.unwrap_err().is_retryable());
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        counter.store(0, Ordering::SeqCst);
        let _ = retry_read::<(), _, _>(&ReadRetry::once(), "openOrders", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ExchangeError::NetworkError("down".into()))
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
