//! 봇 컨트롤러 (폴링 루프).
//!
//! 한 주기마다:
//!
//! 1. 봇의 미체결 주문 상태 확인 (체결/취소 반영)
//! 2. 심볼별로 캔들 조회 → `Strategy::set_up`
//! 3. 포지션 상태에 따라 진입/청산/임계값 조정
//!
//! 종료 신호는 주기 사이에서만 확인하므로 주문 처리가 중간에 끊기지 않습니다.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use trader_core::{
    ExitAdjustment, KlineInterval, Order, OrderParams, OrderType, PositionState, PositionView,
    Side,
};
use trader_data::OrderRepository;
use trader_exchange::ExchangeAdapter;
use trader_strategy::{Strategy, StrategyError};

use crate::engine::{OrderEngine, ReconcileReport};
use crate::error::{ExecutionError, Result};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

// ==================== 설정 ====================

/// 저장소 에러 발생 시 대응.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreRecovery {
    /// 저장소를 비우고 다시 시작 (이력 손실)
    #[default]
    Reinitialize,
    /// 루프 중단
    Abort,
}

impl fmt::Display for StoreRecovery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreRecovery::Reinitialize => write!(f, "reinitialize"),
            StoreRecovery::Abort => write!(f, "abort"),
        }
    }
}

impl FromStr for StoreRecovery {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reinitialize" | "reset" | "wipe" => Ok(StoreRecovery::Reinitialize),
            "abort" | "stop" => Ok(StoreRecovery::Abort),
            _ => Err(format!("Invalid store recovery policy: {}", s)),
        }
    }
}

/// 봇 설정.
///
/// 비율 값(`initial_entry_allocation`, `signal_distance`, `take_profit_pct`,
/// `stop_loss_pct`)은 모두 퍼센트 단위입니다 (5 = 5%).
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub bot_id: i64,
    pub name: String,
    pub symbols: Vec<String>,
    pub kline_interval: KlineInterval,
    /// 전략에 넘길 캔들 수
    pub history_limit: usize,
    pub test_mode: bool,
    pub poll_interval: Duration,
    pub starting_balance: Decimal,
    /// 진입 1회에 쓰는 잔고 비율 (0~100)
    pub initial_entry_allocation: Decimal,
    /// 0이면 시장가 진입, 양수면 마지막 종가보다 그만큼 낮은 지정가 진입
    pub signal_distance: Decimal,
    /// 청산 신호로 포지션 종료 여부
    pub exit_on_signal: bool,
    pub take_profit_pct: Option<Decimal>,
    pub stop_loss_pct: Option<Decimal>,
    pub store_recovery: StoreRecovery,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            bot_id: 1,
            name: "trader-bot".to_string(),
            symbols: Vec::new(),
            kline_interval: KlineInterval::new(1, trader_core::IntervalUnit::Minute),
            history_limit: 50,
            test_mode: true,
            poll_interval: Duration::from_secs(60),
            starting_balance: Decimal::ONE,
            initial_entry_allocation: HUNDRED,
            signal_distance: Decimal::ZERO,
            exit_on_signal: true,
            take_profit_pct: None,
            stop_loss_pct: None,
            store_recovery: StoreRecovery::default(),
        }
    }
}

impl BotConfig {
    /// 설정 검증.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.symbols.is_empty() {
            return Err("심볼이 하나 이상 필요합니다".to_string());
        }
        if self.starting_balance <= Decimal::ZERO {
            return Err(format!("시작 잔고는 양수여야 합니다: {}", self.starting_balance));
        }
        if self.initial_entry_allocation <= Decimal::ZERO || self.initial_entry_allocation > HUNDRED
        {
            return Err(format!(
                "진입 비율은 0 초과 100 이하여야 합니다: {}",
                self.initial_entry_allocation
            ));
        }
        if self.signal_distance < Decimal::ZERO || self.signal_distance >= HUNDRED {
            return Err(format!(
                "신호 거리는 0 이상 100 미만이어야 합니다: {}",
                self.signal_distance
            ));
        }
        if let Some(sl) = self.stop_loss_pct {
            if sl <= Decimal::ZERO || sl >= HUNDRED {
                return Err(format!("손절 비율은 0 초과 100 미만이어야 합니다: {}", sl));
            }
        }
        if let Some(tp) = self.take_profit_pct {
            if tp <= Decimal::ZERO {
                return Err(format!("익절 비율은 양수여야 합니다: {}", tp));
            }
        }
        if self.history_limit < 2 {
            return Err("history_limit은 2 이상이어야 합니다".to_string());
        }
        Ok(())
    }
}

// ==================== 컨트롤러 ====================

/// 한 주기 요약.
#[derive(Debug, Default)]
pub struct CycleSummary {
    pub reconcile: ReconcileReport,
    pub orders_placed: usize,
    pub orders_canceled: usize,
}

/// 폴링 루프를 구동하는 봇 컨트롤러.
pub struct BotController {
    config: BotConfig,
    engine: OrderEngine,
    /// 심볼별 전략 인스턴스
    strategies: HashMap<String, Box<dyn Strategy>>,
}

impl BotController {
    /// 컨트롤러 생성. 심볼마다 `make_strategy`로 전략 인스턴스를 만듭니다.
    pub fn new<F>(
        config: BotConfig,
        exchange: Arc<dyn ExchangeAdapter>,
        repository: Arc<dyn OrderRepository>,
        make_strategy: F,
    ) -> Result<Self>
    where
        F: Fn() -> std::result::Result<Box<dyn Strategy>, StrategyError>,
    {
        config.validate().map_err(ExecutionError::InvalidOrder)?;
        let strategies = config
            .symbols
            .iter()
            .map(|s| -> Result<(String, Box<dyn Strategy>)> { Ok((s.clone(), make_strategy()?)) })
            .collect::<Result<HashMap<_, _>>>()?;

        Ok(Self {
            engine: OrderEngine::new(exchange, repository),
            config,
            strategies,
        })
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    pub fn engine(&self) -> &OrderEngine {
        &self.engine
    }

    /// 종료 신호가 올 때까지 폴링 루프 실행.
    ///
    /// 저장소 에러는 `StoreRecovery` 정책에 따라 저장소를 초기화하고 계속하거나
    /// 에러를 반환하며 종료합니다. 그 밖의 에러는 기록 후 다음 주기로 넘어갑니다.
    pub async fn run(&mut self, shutdown: CancellationToken) -> Result<()> {
        info!(
            bot = %self.config.name,
            symbols = ?self.config.symbols,
            interval = %self.config.kline_interval,
            test_mode = self.config.test_mode,
            exchange = self.engine.exchange().exchange_name(),
            "봇 시작"
        );

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            match self.run_cycle().await {
                Ok(summary) => debug!(
                    filled = summary.reconcile.filled.len(),
                    placed = summary.orders_placed,
                    canceled = summary.orders_canceled,
                    "주기 완료"
                ),
                Err(e) if e.is_storage() => self.recover_store(e).await?,
                Err(e) => warn!(error = %e, "주기 실패, 다음 주기에 재시도"),
            }

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }

        info!(bot = %self.config.name, "봇 종료");
        Ok(())
    }

    async fn recover_store(&self, err: ExecutionError) -> Result<()> {
        match self.config.store_recovery {
            StoreRecovery::Reinitialize => {
                error!(error = %err, "저장소 에러, 저장소를 초기화합니다");
                self.engine.repository().reset().await?;
                Ok(())
            }
            StoreRecovery::Abort => {
                error!(error = %err, "저장소 에러, 봇을 중단합니다");
                Err(err)
            }
        }
    }

    /// 폴링 한 주기.
    pub async fn run_cycle(&mut self) -> Result<CycleSummary> {
        let mut reconcile = self
            .engine
            .reconcile_open_orders(self.config.bot_id, &self.config.kline_interval)
            .await?;
        if let Some(storage) = reconcile.take_storage_failure() {
            return Err(storage);
        }

        let mut summary = CycleSummary {
            reconcile,
            ..Default::default()
        };

        let symbols = self.config.symbols.clone();
        for symbol in &symbols {
            match self.execute_symbol(symbol, &mut summary).await {
                Ok(()) => {}
                Err(e) if e.is_storage() => return Err(e),
                Err(e) => warn!(symbol = %symbol, error = %e, "심볼 처리 실패"),
            }
        }
        Ok(summary)
    }

    async fn execute_symbol(&mut self, symbol: &str, summary: &mut CycleSummary) -> Result<()> {
        let klines = self
            .engine
            .exchange()
            .get_ohlcv(
                symbol,
                &self.config.kline_interval.to_string(),
                self.config.history_limit,
                None,
            )
            .await?;
        let Some(last_close) = klines.last().map(|k| k.close) else {
            debug!(symbol, "캔들 없음");
            return Ok(());
        };

        let Some(strategy) = self.strategies.get_mut(symbol) else {
            return Ok(());
        };
        match strategy.set_up(&klines) {
            Ok(()) => {}
            Err(StrategyError::InsufficientData { required, actual }) => {
                debug!(symbol, required, actual, "캔들 부족, 건너뜀");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }

        let repository = self.engine.repository();
        let latest_entry = repository.latest_entry(self.config.bot_id, symbol).await?;
        let view = match latest_entry {
            Some(entry) => {
                let orders = repository.find_by_position(&entry.position_id).await?;
                Some(PositionView::new(entry.position_id, orders))
            }
            None => None,
        };

        match view.as_ref().map(PositionView::state) {
            None | Some(PositionState::Closed) => {
                if strategy.check_long_signal() {
                    self.place_entry(symbol, last_close).await?;
                    summary.orders_placed += 1;
                }
            }
            Some(PositionState::PendingEntry) => {}
            Some(PositionState::Open) => {
                if let Some(view) = view {
                    self.manage_position(symbol, view, last_close, summary)
                        .await?;
                }
            }
        }
        Ok(())
    }

    /// 진입 주문 제출.
    async fn place_entry(&self, symbol: &str, last_close: Decimal) -> Result<Order> {
        let cfg = &self.config;
        let amount = cfg.starting_balance * cfg.initial_entry_allocation / HUNDRED;

        let params = if cfg.signal_distance.is_zero() {
            let quantity = amount / last_close;
            OrderParams::new(cfg.bot_id, Side::Buy, OrderType::Market, quantity)
        } else {
            let price = last_close * (HUNDRED - cfg.signal_distance) / HUNDRED;
            let quantity = amount / price;
            OrderParams::new(cfg.bot_id, Side::Buy, OrderType::Limit, quantity).with_price(price)
        };

        info!(symbol, quantity = %params.quantity, price = ?params.price, "진입 신호");
        self.engine
            .place_order(symbol, None, params.entry(), cfg.test_mode)
            .await
    }

    /// 보유 포지션 관리: 임계값 갱신, 청산 판단, 익절 주문 유지.
    async fn manage_position(
        &mut self,
        symbol: &str,
        view: PositionView,
        last_close: Decimal,
        summary: &mut CycleSummary,
    ) -> Result<()> {
        let Some(entry) = view.entry().cloned() else {
            return Ok(());
        };
        // 체결 처리 중 끊긴 진입가 전파를 먼저 복구
        let entry_price = if view.orders.iter().all(|o| o.entry_price.is_some()) {
            entry.entry_price
        } else {
            self.engine.restore_entry_price(&entry).await?
        };
        let Some(entry_price) = entry_price else {
            warn!(order_id = %entry.id, "진입가를 알 수 없는 포지션, 건너뜀");
            return Ok(());
        };

        let open_exits: Vec<Order> = view.open_exit_orders().cloned().collect();
        if open_exits.iter().any(|o| o.order_type == OrderType::Market) {
            // 시장가 청산 대기 중
            return Ok(());
        }

        // 설정 기반 초기 임계값
        let seed = ExitAdjustment {
            take_profit_price: self
                .config
                .take_profit_pct
                .filter(|_| entry.take_profit_price.is_none())
                .map(|tp| entry_price * (HUNDRED + tp) / HUNDRED),
            stop_price: self
                .config
                .stop_loss_pct
                .filter(|_| entry.stop_price.is_none())
                .map(|sl| entry_price * (HUNDRED - sl) / HUNDRED),
        };
        self.engine.apply_exit_adjustment(&entry.id, &seed).await?;

        // 전략 제안 (래칫 적용)
        let Some(strategy) = self.strategies.get_mut(symbol) else {
            return Ok(());
        };
        if let Some(adj) = strategy.update_exit_thresholds(&entry) {
            self.engine.apply_exit_adjustment(&entry.id, &adj).await?;
        }
        let short_signal = self.config.exit_on_signal && strategy.check_short_signal(Some(&entry));

        let repository = self.engine.repository();
        let entry = repository.get(&entry.id).await?.unwrap_or(entry);
        let quantity = if entry.executed_quantity > Decimal::ZERO {
            entry.executed_quantity
        } else {
            entry.original_quantity
        };

        let stop_hit = entry.stop_price.is_some_and(|stop| last_close <= stop);
        if stop_hit || short_signal {
            info!(
                symbol,
                position_id = %entry.position_id,
                close = %last_close,
                stop = ?entry.stop_price,
                stop_hit,
                "청산"
            );
            if !self.cancel_all(&open_exits, summary).await? {
                warn!(
                    symbol,
                    position_id = %entry.position_id,
                    "잔여 청산 주문 취소 미확인, 다음 주기에 청산 재시도"
                );
                return Ok(());
            }
            let params = OrderParams::new(self.config.bot_id, Side::Sell, OrderType::Market, quantity);
            self.engine
                .place_order(symbol, Some(&entry), params, self.config.test_mode)
                .await?;
            summary.orders_placed += 1;
            return Ok(());
        }

        let Some(take_profit) = entry.take_profit_price else {
            return Ok(());
        };
        let resting: Vec<&Order> = open_exits
            .iter()
            .filter(|o| o.order_type == OrderType::Limit)
            .collect();
        if resting.iter().any(|o| o.price == Some(take_profit)) {
            return Ok(());
        }

        // 익절가가 올라갔거나 아직 익절 주문이 없음
        for stale in &resting {
            match self.engine.cancel_order(&stale.id).await {
                Ok(_) => summary.orders_canceled += 1,
                // 취소 직전에 체결된 경우: 다음 주기 상태 확인이 포지션을 종료
                Err(ExecutionError::OrderNotFound(_)) => return Ok(()),
                Err(e) => return Err(e),
            }
        }
        let params = OrderParams::new(self.config.bot_id, Side::Sell, OrderType::Limit, quantity)
            .with_price(take_profit)
            .with_take_profit(take_profit);
        self.engine
            .place_order(symbol, Some(&entry), params, self.config.test_mode)
            .await?;
        summary.orders_placed += 1;
        Ok(())
    }

    /// 남아 있는 청산 주문 취소. 모두 취소를 확인하면 `true`.
    ///
    /// 거래소에 없는 주문은 직전에 체결되었을 수 있으므로 확인되지 않은 것으로 봅니다.
    /// 저장소 에러만 호출자에게 전달합니다.
    async fn cancel_all(&self, orders: &[Order], summary: &mut CycleSummary) -> Result<bool> {
        let mut all_canceled = true;
        for order in orders {
            match self.engine.cancel_order(&order.id).await {
                Ok(_) => summary.orders_canceled += 1,
                Err(ExecutionError::OrderNotFound(_)) => {
                    debug!(order_id = %order.id, "거래소에 없는 주문, 상태 확인 대기");
                    all_canceled = false;
                }
                Err(e) if e.is_storage() => return Err(e),
                Err(e) => {
                    warn!(order_id = %order.id, error = %e, "주문 취소 실패");
                    all_canceled = false;
                }
            }
        }
        Ok(all_canceled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn config() -> BotConfig {
        BotConfig {
            symbols: vec!["BTC/USDT".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_store_recovery_parse() {
        assert_eq!("reinitialize".parse(), Ok(StoreRecovery::Reinitialize));
        assert_eq!("ABORT".parse(), Ok(StoreRecovery::Abort));
        assert!("keep".parse::<StoreRecovery>().is_err());
        assert_eq!(StoreRecovery::default(), StoreRecovery::Reinitialize);
    }

    #[test]
    fn test_config_validation() {
        assert!(config().validate().is_ok());
        assert!(BotConfig::default().validate().is_err());

        let bad = BotConfig {
            initial_entry_allocation: dec!(120),
            ..config()
        };
        assert!(bad.validate().is_err());

        let bad = BotConfig {
            stop_loss_pct: Some(dec!(0)),
            ..config()
        };
        assert!(bad.validate().is_err());
    }
}
