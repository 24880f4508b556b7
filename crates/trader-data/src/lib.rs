//! 주문 저장소.
//!
//! 엔진은 [`OrderRepository`] trait을 통해서만 주문 레코드를 읽고 씁니다.
//! 프로세스 내 테스트/페이퍼 트레이딩용 [`InMemoryOrderRepository`]와
//! PostgreSQL 구현 [`PgOrderRepository`]를 제공합니다.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod repository;

pub use error::{DataError, Result};
pub use memory::InMemoryOrderRepository;
pub use postgres::PgOrderRepository;
pub use repository::OrderRepository;
