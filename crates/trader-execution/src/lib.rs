//! 주문 생명주기 실행 엔진.
//!
//! 이 crate는 다음을 제공합니다:
//! - 주문 제출/재제출, 상태 확인, 취소를 담당하는 [`OrderEngine`]
//! - 테스트 모드 주문의 캔들 기반 체결 시뮬레이터
//! - 폴링 루프를 구동하는 [`BotController`]
//!
//! # 예제
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use trader_data::InMemoryOrderRepository;
//! use trader_exchange::PaperExchange;
//! use trader_execution::OrderEngine;
//!
//! let engine = OrderEngine::new(
//!     Arc::new(PaperExchange::new()),
//!     Arc::new(InMemoryOrderRepository::new()),
//! );
//! let order = engine.place_order("BTC/USDT", None, params, true).await?;
//! ```

pub mod controller;
pub mod engine;
pub mod error;
pub mod simulator;

pub use controller::{BotConfig, BotController, CycleSummary, StoreRecovery};
pub use engine::{OrderEngine, ReconcileOutcome, ReconcileReport};
pub use error::{ExecutionError, Result};
pub use simulator::{candle_request, find_fill, CandleRequest, SimulatedFill};
