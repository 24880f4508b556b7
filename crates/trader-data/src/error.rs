//! 저장소 에러 타입.

use thiserror::Error;

/// 주문 저장소 에러.
#[derive(Debug, Error)]
pub enum DataError {
    /// 데이터베이스 연결 실패
    #[error("데이터베이스 연결 에러: {0}")]
    ConnectionError(String),

    /// 쿼리 실행 실패
    #[error("쿼리 에러: {0}")]
    QueryError(String),

    /// 저장된 레코드를 도메인 타입으로 읽을 수 없음
    #[error("손상된 레코드 [{id}]: {reason}")]
    Corrupted { id: String, reason: String },

    /// 레코드 없음
    #[error("레코드를 찾을 수 없음: {0}")]
    NotFound(String),

    /// 같은 ID의 레코드가 이미 존재
    #[error("중복 레코드: {0}")]
    Duplicate(String),
}

impl From<sqlx::Error> for DataError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DataError::NotFound(err.to_string()),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                DataError::ConnectionError(err.to_string())
            }
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                DataError::Duplicate(db.message().to_string())
            }
            other => DataError::QueryError(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, DataError>;
