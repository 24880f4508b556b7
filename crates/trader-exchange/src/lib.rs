//! 거래소 연동 계층.
//!
//! 엔진은 [`ExchangeAdapter`] trait만 알고, 실제 거래소(Binance)와
//! 인메모리 페이퍼 거래소는 모두 이 trait을 구현합니다.

pub mod adapter;
pub mod binance;
pub mod error;
pub mod paper;
pub mod retry;

pub use adapter::{ExchangeAdapter, OrderResponse, OrderStatusReport};
pub use binance::{BinanceClient, BinanceConfig};
pub use error::ExchangeError;
pub use paper::{PaperExchange, PaperOp};
pub use retry::{retry_read, ReadRetry};
