//! 주문 저장소 trait.

use async_trait::async_trait;
use trader_core::Order;

use crate::Result;

/// 주문 레코드 저장소.
///
/// 레코드는 `id`로 식별되며, 엔진은 한 주문을 읽고 수정한 뒤
/// 전체 레코드를 `update`로 다시 씁니다.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// 새 레코드 저장. 같은 `id`가 있으면 `DataError::Duplicate`.
    async fn create(&self, order: &Order) -> Result<()>;

    async fn get(&self, id: &str) -> Result<Option<Order>>;

    /// 기존 레코드 덮어쓰기. 없으면 `DataError::NotFound`.
    async fn update(&self, order: &Order) -> Result<()>;

    /// 봇의 미체결(open) 주문 목록 (생성 순).
    async fn find_open_by_bot(&self, bot_id: i64) -> Result<Vec<Order>>;

    /// 포지션에 속한 모든 주문 (생성 순).
    async fn find_by_position(&self, position_id: &str) -> Result<Vec<Order>>;

    /// 봇/심볼의 가장 최근 진입 주문.
    async fn latest_entry(&self, bot_id: i64, symbol: &str) -> Result<Option<Order>>;

    /// 저장소 초기화 (모든 레코드 삭제).
    async fn reset(&self) -> Result<()>;
}
