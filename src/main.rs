use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bandscan::application::scan_coordinator::{ScanCoordinator, ScanProgress};
use bandscan::config::ScanConfiguration;
use bandscan::infrastructure::coinbase::CoinbaseMarketData;
use bandscan::infrastructure::throttle::RequestThrottle;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bandscan=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ScanConfiguration::from_env();
    info!(
        criterion = ?config.criterion,
        class = ?config.instrument_class,
        band = format!("{}-{}%", config.min_fluctuation_pct, config.max_fluctuation_pct),
        consecutive = config.consecutive_periods,
        "Screening engine starting"
    );

    let provider = Arc::new(CoinbaseMarketData::new(RequestThrottle::default()));
    let mut coordinator = ScanCoordinator::new(provider, config)?;
    let verbose = coordinator.config().verbose;

    if verbose {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        coordinator = coordinator.with_progress(tx);
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                match event {
                    ScanProgress::Started { symbol } => info!(symbol = %symbol, "analyzing"),
                    ScanProgress::Evaluated { symbol, qualified } => {
                        info!(symbol = %symbol, qualified, "evaluated")
                    }
                    ScanProgress::Skipped { symbol, reason } => {
                        warn!(symbol = %symbol, reason = %reason, "skipped")
                    }
                }
            }
        });
    }

    let outcome = coordinator.run_scan().await?;

    for (rank, result) in outcome.results.iter().enumerate() {
        info!(
            rank = rank + 1,
            symbol = %result.symbol,
            score = format!("{:.2}", result.score),
            close = result.snapshot.latest_close.value(),
            rsi = ?result.snapshot.rsi,
            avg_weekly_change = ?result.snapshot.average_weekly_change_pct,
            buy = ?result.snapshot.buy_reference.map(|p| p.value()),
            sell = ?result.snapshot.sell_reference.map(|p| p.value()),
            "opportunity"
        );
    }
    info!(
        qualified = outcome.results.len(),
        skipped = outcome.skipped.len(),
        "Scan finished"
    );
    if !outcome.skipped.is_empty() && !verbose {
        info!(
            count = outcome.skipped.len(),
            "Some instruments were skipped; set SCAN_VERBOSE=1 for per-symbol reasons"
        );
    }

    Ok(())
}
