//! 인메모리 주문 저장소.
//!
//! 테스트와 데이터베이스 없이 실행하는 페이퍼 트레이딩에서 사용합니다.
//! 삽입 순서를 기억해 조회 결과를 생성 순으로 돌려줍니다.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use trader_core::Order;

use crate::{DataError, OrderRepository, Result};

#[derive(Debug, Default)]
struct Inner {
    orders: HashMap<String, Order>,
    insertion: Vec<String>,
}

impl Inner {
    fn ordered(&self) -> impl Iterator<Item = &Order> {
        self.insertion.iter().filter_map(|id| self.orders.get(id))
    }
}

#[derive(Debug, Default)]
pub struct InMemoryOrderRepository {
    inner: RwLock<Inner>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 저장된 레코드 수.
    pub async fn len(&self) -> usize {
        self.inner.read().await.orders.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// 모든 레코드 (생성 순).
    pub async fn all(&self) -> Vec<Order> {
        self.inner.read().await.ordered().cloned().collect()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn create(&self, order: &Order) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.orders.contains_key(&order.id) {
            return Err(DataError::Duplicate(order.id.clone()));
        }
        inner.insertion.push(order.id.clone());
        inner.orders.insert(order.id.clone(), order.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Order>> {
        Ok(self.inner.read().await.orders.get(id).cloned())
    }

    async fn update(&self, order: &Order) -> Result<()> {
        let mut inner = self.inner.write().await;
        match inner.orders.get_mut(&order.id) {
            Some(existing) => {
                *existing = order.clone();
                Ok(())
            }
            None => Err(DataError::NotFound(order.id.clone())),
        }
    }

    async fn find_open_by_bot(&self, bot_id: i64) -> Result<Vec<Order>> {
        let inner = self.inner.read().await;
        Ok(inner
            .ordered()
            .filter(|o| o.bot_id == bot_id && o.is_open())
            .cloned()
            .collect())
    }

    async fn find_by_position(&self, position_id: &str) -> Result<Vec<Order>> {
        let inner = self.inner.read().await;
        Ok(inner
            .ordered()
            .filter(|o| o.position_id == position_id)
            .cloned()
            .collect())
    }

    async fn latest_entry(&self, bot_id: i64, symbol: &str) -> Result<Option<Order>> {
        let inner = self.inner.read().await;
        Ok(inner
            .ordered()
            .filter(|o| o.bot_id == bot_id && o.symbol == symbol && o.is_entry)
            .last()
            .cloned())
    }

    async fn reset(&self) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.orders.clear();
        inner.insertion.clear();
        Ok(())
    }
}
