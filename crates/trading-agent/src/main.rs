use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use broker_trait::{ExchangeClient, PaperExchange};
use tokio::signal::unix::SignalKind;
use tokio::time;

use trading_agent::{
    AgentConfig, DecisionOutcome, DecisionPipeline, SnapshotReplay, TrendConflictGuard,
};

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load .env, init tracing
    dotenvy::dotenv().ok();

    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
        tracing::error!("PANIC: {info}");
    }));

    tracing::info!("Starting derivatives decision pipeline");

    // 2. Configuration
    let config = AgentConfig::from_env()?;
    let params = &config.parameters;
    tracing::info!("Configuration loaded and validated");
    tracing::info!("  Leverage: {}x", params.leverage);
    tracing::info!("  Position size: {}% of equity", params.position_size_percent);
    tracing::info!("  Max daily loss: {}%", params.max_daily_loss_percent);
    tracing::info!("  Daily trade limit: {}", params.daily_trade_limit);
    tracing::info!(
        "  Min confidence: {:.0}% | Min ADX: {}",
        params.min_confidence * 100.0,
        params.min_adx
    );
    tracing::info!("  Pairs: {}", params.trading_pairs.join(", "));
    tracing::info!("  Scan interval: {} seconds", config.scan_interval_seconds);
    tracing::debug!("  Credentials: {:?}", config.credentials);

    // 3. Collaborators
    let exchange = Arc::new(PaperExchange::new(config.paper_balance));
    if exchange.is_paper() {
        tracing::info!(
            "Paper trading mode ({}), starting balance {}",
            exchange.exchange_name(),
            config.paper_balance
        );
    } else {
        tracing::warn!("LIVE trading on {}: orders use real funds", exchange.exchange_name());
    }

    let feed = Arc::new(SnapshotReplay::from_file(&config.snapshot_file)?);
    for pair in &params.trading_pairs {
        if !feed.symbols().any(|s| s == pair.as_str()) {
            tracing::warn!("Replay feed has no data for {}; it will hold every cycle", pair);
        }
    }

    let mut pipeline = DecisionPipeline::new(
        config.parameters.clone(),
        exchange,
        feed.clone(),
        feed,
        Arc::new(TrendConflictGuard::default()),
    )?;

    // 4. Main loop with graceful shutdown (SIGINT + SIGTERM)
    let mut interval = time::interval(Duration::from_secs(config.scan_interval_seconds));
    let mut sigterm = tokio::signal::unix::signal(SignalKind::terminate())?;
    let shutdown = async {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received SIGINT");
            }
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM");
            }
        }
    };
    tokio::pin!(shutdown);

    let mut cycles: u64 = 0;
    loop {
        tokio::select! {
            _ = interval.tick() => {
                cycles += 1;
                tracing::info!("Cycle #{} starting", cycles);
                for (symbol, outcome) in pipeline.run_cycle().await {
                    match &outcome {
                        DecisionOutcome::Executed { trade, confidence, .. } => tracing::info!(
                            "{}: EXECUTED {} {} (confidence {:.0}%, order {})",
                            symbol,
                            trade.side,
                            trade.size,
                            confidence * 100.0,
                            trade.order_id
                        ),
                        DecisionOutcome::Hold { reason, confidence } => tracing::info!(
                            "{}: HOLD (confidence {:.0}%) {}",
                            symbol,
                            confidence * 100.0,
                            reason
                        ),
                    }
                }
            }
            _ = &mut shutdown => {
                tracing::info!("Shutdown signal received, exiting gracefully...");
                break;
            }
        }
    }

    let stats = pipeline.stats();
    match serde_json::to_string(&stats) {
        Ok(json) => tracing::info!("Final stats: {}", json),
        Err(_) => tracing::info!("Final stats: {}", stats),
    }
    tracing::info!("Trading agent shut down after {} cycles.", cycles);
    Ok(())
}
