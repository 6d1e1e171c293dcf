use polyledger::datasource::HttpWarehouse;
use polyledger::orchestration::BatchCoordinator;
use polyledger::{Config, Wallet};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    if config.wallets.is_empty() {
        eprintln!("No wallets configured; set WALLETS or WALLETS_FILE");
        std::process::exit(1);
    }

    let warehouse = Arc::new(HttpWarehouse::new(config.warehouse_url.clone()));
    let coordinator = BatchCoordinator::new(warehouse, config.engine_options())
        .with_max_chunk(config.chunk_size);

    let wallets: Vec<Wallet> = config.wallets.iter().map(|w| Wallet::new(w.as_str())).collect();
    tracing::info!(
        "running {} batch over {} wallets",
        config.policy,
        wallets.len()
    );

    let reports = coordinator.run(&wallets).await?;

    for report in &reports {
        tracing::info!(
            wallet = %report.wallet,
            total_pnl = %report.total_pnl,
            realized = %report.realized_pnl,
            coverage = %report.resolution_coverage.fraction,
            "wallet replayed"
        );
    }

    println!("{}", serde_json::to_string_pretty(&reports)?);
    Ok(())
}
