//! PostgreSQL 주문 저장소.
//!
//! 테이블이 없으면 `ensure_schema`가 생성합니다. 열거형 값은 TEXT로,
//! 가격/수량은 NUMERIC으로 저장합니다.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use tracing::{debug, info, instrument, warn};
use trader_core::{Order, OrderStatus, OrderType, Side};

use crate::{DataError, OrderRepository, Result};

const CREATE_ORDERS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS bot_orders (
        id                TEXT PRIMARY KEY,
        position_id       TEXT NOT NULL,
        bot_id            BIGINT NOT NULL,
        symbol            TEXT NOT NULL,
        side              TEXT NOT NULL,
        order_type        TEXT NOT NULL,
        price             NUMERIC,
        entry_price       NUMERIC,
        take_profit_price NUMERIC,
        stop_price        NUMERIC,
        original_quantity NUMERIC NOT NULL,
        executed_quantity NUMERIC NOT NULL DEFAULT 0,
        is_entry          BOOLEAN NOT NULL,
        is_test           BOOLEAN NOT NULL,
        status            TEXT NOT NULL,
        exchange_order_id TEXT,
        submit_error      TEXT,
        last_checked_time BIGINT NOT NULL,
        created_at        BIGINT NOT NULL
    )
"#;

const CREATE_INDEXES: [&str; 2] = [
    "CREATE INDEX IF NOT EXISTS idx_bot_orders_bot_status ON bot_orders (bot_id, status)",
    "CREATE INDEX IF NOT EXISTS idx_bot_orders_position ON bot_orders (position_id)",
];

const SELECT_COLUMNS: &str = "SELECT id, position_id, bot_id, symbol, side, order_type, price, \
     entry_price, take_profit_price, stop_price, original_quantity, executed_quantity, \
     is_entry, is_test, status, exchange_order_id, submit_error, last_checked_time, created_at \
     FROM bot_orders";

/// `bot_orders` 테이블 레코드.
#[derive(Debug, Clone, FromRow)]
struct OrderRecord {
    id: String,
    position_id: String,
    bot_id: i64,
    symbol: String,
    side: String,
    order_type: String,
    price: Option<Decimal>,
    entry_price: Option<Decimal>,
    take_profit_price: Option<Decimal>,
    stop_price: Option<Decimal>,
    original_quantity: Decimal,
    executed_quantity: Decimal,
    is_entry: bool,
    is_test: bool,
    status: String,
    exchange_order_id: Option<String>,
    submit_error: Option<String>,
    last_checked_time: i64,
    created_at: i64,
}

impl OrderRecord {
    /// 도메인 객체로 변환. 열거형 값을 읽을 수 없으면 `Corrupted`.
    fn into_order(self) -> Result<Order> {
        let corrupted = |reason: String| DataError::Corrupted {
            id: self.id.clone(),
            reason,
        };
        let side: Side = self.side.parse().map_err(corrupted)?;
        let order_type: OrderType = self.order_type.parse().map_err(corrupted)?;
        let status: OrderStatus = self.status.parse().map_err(corrupted)?;

        Ok(Order {
            id: self.id,
            position_id: self.position_id,
            bot_id: self.bot_id,
            symbol: self.symbol,
            side,
            order_type,
            price: self.price,
            entry_price: self.entry_price,
            take_profit_price: self.take_profit_price,
            stop_price: self.stop_price,
            original_quantity: self.original_quantity,
            executed_quantity: self.executed_quantity,
            is_entry: self.is_entry,
            is_test: self.is_test,
            status,
            exchange_order_id: self.exchange_order_id,
            submit_error: self.submit_error,
            last_checked_time: self.last_checked_time,
            created_at: self.created_at,
        })
    }
}

fn into_orders(records: Vec<OrderRecord>) -> Result<Vec<Order>> {
    records.into_iter().map(OrderRecord::into_order).collect()
}

/// PostgreSQL 기반 주문 저장소.
#[derive(Clone)]
pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 연결 후 스키마 준비.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(|e| DataError::ConnectionError(e.to_string()))?;
        let repo = Self::new(pool);
        repo.ensure_schema().await?;
        info!("주문 저장소 연결 완료");
        Ok(repo)
    }

    /// 테이블/인덱스 생성 (이미 있으면 유지).
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(CREATE_ORDERS_TABLE).execute(&self.pool).await?;
        for stmt in CREATE_INDEXES {
            sqlx::query(stmt).execute(&self.pool).await?;
        }
        Ok(())
    }

    async fn fetch_where(&self, clause: &str, binds: QueryBinds<'_>) -> Result<Vec<Order>> {
        let sql = format!("{} WHERE {} ORDER BY created_at ASC, id ASC", SELECT_COLUMNS, clause);
        let query = sqlx::query_as::<_, OrderRecord>(&sql);
        let records = match binds {
            QueryBinds::Bot(bot_id) => query.bind(bot_id).fetch_all(&self.pool).await?,
            QueryBinds::Text(value) => query.bind(value).fetch_all(&self.pool).await?,
            QueryBinds::BotSymbol(bot_id, symbol) => {
                query.bind(bot_id).bind(symbol).fetch_all(&self.pool).await?
            }
        };
        into_orders(records)
    }
}

enum QueryBinds<'a> {
    Bot(i64),
    Text(&'a str),
    BotSymbol(i64, &'a str),
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    #[instrument(skip(self, order), fields(id = %order.id))]
    async fn create(&self, order: &Order) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO bot_orders (
                id, position_id, bot_id, symbol, side, order_type, price, entry_price,
                take_profit_price, stop_price, original_quantity, executed_quantity,
                is_entry, is_test, status, exchange_order_id, submit_error,
                last_checked_time, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
            "#,
        )
        .bind(&order.id)
        .bind(&order.position_id)
        .bind(order.bot_id)
        .bind(&order.symbol)
        .bind(order.side.to_string())
        .bind(order.order_type.to_string())
        .bind(order.price)
        .bind(order.entry_price)
        .bind(order.take_profit_price)
        .bind(order.stop_price)
        .bind(order.original_quantity)
        .bind(order.executed_quantity)
        .bind(order.is_entry)
        .bind(order.is_test)
        .bind(order.status.to_string())
        .bind(&order.exchange_order_id)
        .bind(&order.submit_error)
        .bind(order.last_checked_time)
        .bind(order.created_at)
        .execute(&self.pool)
        .await?;

        debug!("주문 레코드 생성");
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Order>> {
        let sql = format!("{} WHERE id = $1", SELECT_COLUMNS);
        let record: Option<OrderRecord> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        record.map(OrderRecord::into_order).transpose()
    }

    #[instrument(skip(self, order), fields(id = %order.id, status = %order.status))]
    async fn update(&self, order: &Order) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE bot_orders SET
                price = $2,
                entry_price = $3,
                take_profit_price = $4,
                stop_price = $5,
                executed_quantity = $6,
                status = $7,
                exchange_order_id = $8,
                submit_error = $9,
                last_checked_time = $10
            WHERE id = $1
            "#,
        )
        .bind(&order.id)
        .bind(order.price)
        .bind(order.entry_price)
        .bind(order.take_profit_price)
        .bind(order.stop_price)
        .bind(order.executed_quantity)
        .bind(order.status.to_string())
        .bind(&order.exchange_order_id)
        .bind(&order.submit_error)
        .bind(order.last_checked_time)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DataError::NotFound(order.id.clone()));
        }
        Ok(())
    }

    async fn find_open_by_bot(&self, bot_id: i64) -> Result<Vec<Order>> {
        self.fetch_where("bot_id = $1 AND status = 'open'", QueryBinds::Bot(bot_id))
            .await
    }

    async fn find_by_position(&self, position_id: &str) -> Result<Vec<Order>> {
        self.fetch_where("position_id = $1", QueryBinds::Text(position_id))
            .await
    }

    async fn latest_entry(&self, bot_id: i64, symbol: &str) -> Result<Option<Order>> {
        let sql = format!(
            "{} WHERE bot_id = $1 AND symbol = $2 AND is_entry ORDER BY created_at DESC, id DESC LIMIT 1",
            SELECT_COLUMNS
        );
        let record: Option<OrderRecord> = sqlx::query_as(&sql)
            .bind(bot_id)
            .bind(symbol)
            .fetch_optional(&self.pool)
            .await?;
        record.map(OrderRecord::into_order).transpose()
    }

    /// 테이블을 지우고 다시 생성.
    #[instrument(skip(self))]
    async fn reset(&self) -> Result<()> {
        warn!("주문 저장소 초기화: 모든 레코드 삭제");
        sqlx::query("DROP TABLE IF EXISTS bot_orders")
            .execute(&self.pool)
            .await?;
        self.ensure_schema().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn record(status: &str) -> OrderRecord {
        OrderRecord {
            id: "abc".to_string(),
            position_id: "pos".to_string(),
            bot_id: 1,
            symbol: "BTC/USDT".to_string(),
            side: "buy".to_string(),
            order_type: "stop_loss".to_string(),
            price: Some(dec!(95)),
            entry_price: Some(dec!(100)),
            take_profit_price: None,
            stop_price: None,
            original_quantity: dec!(1),
            executed_quantity: dec!(0),
            is_entry: false,
            is_test: true,
            status: status.to_string(),
            exchange_order_id: None,
            submit_error: None,
            last_checked_time: 10,
            created_at: 5,
        }
    }

    #[test]
    fn test_record_converts_to_order() {
        let order = record("open").into_order().unwrap();
        assert_eq!(order.side, Side::Buy);
        assert_eq!(order.order_type, OrderType::StopLoss);
        assert_eq!(order.status, OrderStatus::Open);
        assert_eq!(order.entry_price, Some(dec!(100)));
    }

    #[test]
    fn test_unknown_status_is_corrupted() {
        let err = record("half-done").into_order().unwrap_err();
        assert!(matches!(err, DataError::Corrupted { ref id, .. } if id == "abc"));
    }
}
