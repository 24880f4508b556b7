//! 주문 생명주기 봇 CLI.
//!
//! # 사용 예시
//!
//! ```bash
//! # 드라이런 (실제 주문 없이 캔들로 체결 시뮬레이션)
//! BOT_SYMBOLS=BTC/USDT trader-bot run
//!
//! # 실거래 (BINANCE_API_KEY / BINANCE_API_SECRET 필요)
//! trader-bot run --live -s BTC/USDT,ETH/USDT -i 15m
//!
//! # 캔들 간격을 밀리초로 변환
//! trader-bot interval 4h
//!
//! # 주문 저장소 초기화
//! trader-bot reset-store
//! ```

use std::sync::Arc;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use trader_core::kline_interval_to_ms;
use trader_data::{InMemoryOrderRepository, OrderRepository, PgOrderRepository};
use trader_exchange::{BinanceClient, ExchangeAdapter};
use trader_execution::BotController;
use trader_strategy::create_strategy;

mod config;

use config::{mask_database_url, AppConfig, Overrides};

#[derive(Parser)]
#[command(name = "trader-bot")]
#[command(about = "주문 생명주기 트레이딩 봇", long_about = None)]
#[command(version)]
struct Cli {
    /// 로그 레벨 (RUST_LOG가 설정되어 있으면 무시)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 폴링 루프 실행 (Ctrl+C로 종료)
    Run(RunArgs),

    /// 캔들 간격 문자열을 밀리초로 변환
    Interval {
        /// 간격 (예: 1m, 4h, 2d, 1w, 1M)
        value: String,
    },

    /// 주문 저장소 초기화 (모든 주문 이력 삭제)
    ResetStore,
}

#[derive(Args)]
struct RunArgs {
    /// 거래 심볼 (쉼표 구분, 예: BTC/USDT,ETH/USDT)
    #[arg(short, long, value_delimiter = ',')]
    symbols: Vec<String>,

    /// 캔들 간격 (예: 1m, 15m, 1h)
    #[arg(short, long)]
    interval: Option<String>,

    /// 전략 이름 (always_signal, trailing_profit)
    #[arg(long)]
    strategy: Option<String>,

    /// 폴링 주기 (초)
    #[arg(long)]
    poll_secs: Option<u64>,

    /// 실거래 모드 (기본: 테스트 모드)
    #[arg(long, default_value = "false")]
    live: bool,
}

impl From<RunArgs> for Overrides {
    fn from(args: RunArgs) -> Self {
        Self {
            symbols: args.symbols,
            interval: args.interval,
            strategy: args.strategy,
            poll_interval_secs: args.poll_secs,
            live: args.live,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env 파일 로드 (없어도 에러 안남)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match cli.command {
        Commands::Run(args) => run_bot(args).await,
        Commands::Interval { value } => {
            let ms = kline_interval_to_ms(&value)?;
            println!("{} = {} ms", value, ms);
            Ok(())
        }
        Commands::ResetStore => reset_store().await,
    }
}

/// 로깅 초기화. `LOG_FORMAT=json`이면 JSON 출력.
fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "trader_bot={0},trader_execution={0},trader_exchange={0},trader_data={0},trader_strategy={0}",
            log_level
        )
        .into()
    });
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn open_repository(database_url: Option<&str>) -> Result<Arc<dyn OrderRepository>> {
    match database_url {
        Some(url) => {
            info!(database_url = %mask_database_url(url), "Postgres 주문 저장소 사용");
            Ok(Arc::new(PgOrderRepository::connect(url).await?))
        }
        None => {
            warn!("DATABASE_URL 미설정, 인메모리 저장소 사용 (재시작 시 주문 이력 없음)");
            Ok(Arc::new(InMemoryOrderRepository::new()))
        }
    }
}

async fn run_bot(args: RunArgs) -> Result<()> {
    let mut config = AppConfig::from_env()?;
    config.apply_overrides(args.into())?;
    info!(
        bot = %config.bot.name,
        strategy = %config.strategy,
        symbols = ?config.bot.symbols,
        interval = %config.bot.kline_interval,
        test_mode = config.bot.test_mode,
        "설정 로드 완료"
    );

    // 테스트 모드는 공개 캔들 API만 사용하므로 키가 없어도 됨
    let exchange: Arc<dyn ExchangeAdapter> = Arc::new(BinanceClient::new(config.binance)?);
    let repository = open_repository(config.database_url.as_deref()).await?;

    let strategy = config.strategy;
    let params = config.strategy_params;
    let mut bot = BotController::new(config.bot, exchange, repository, move || {
        create_strategy(&strategy, &params)
    })?;

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("종료 신호 수신, 현재 주기 완료 후 종료합니다");
            signal.cancel();
        }
    });

    bot.run(shutdown).await?;
    Ok(())
}

async fn reset_store() -> Result<()> {
    let config = AppConfig::from_env()?;
    let Some(url) = config.database_url.as_deref() else {
        warn!("DATABASE_URL 미설정, 초기화할 저장소가 없습니다");
        return Ok(());
    };
    let repository = open_repository(Some(url)).await?;
    repository.reset().await?;
    info!(database_url = %mask_database_url(url), "주문 저장소 초기화 완료");
    Ok(())
}
