//! 도메인 모델.

pub mod market;
pub mod order;
pub mod position;
pub mod types;

pub use market::Kline;
pub use order::{new_order_id, Order, OrderParams};
pub use position::{apply_exit_adjustment, ratchet, ExitAdjustment, PositionState, PositionView};
pub use types::{OrderStatus, OrderType, Side};
