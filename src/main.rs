use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{oneshot, watch};
use tracing_subscriber::EnvFilter;

use smart_sign::adapters::{
    display::LogSignDisplay,
    replay::{JsonLinesSource, RecordedDetector},
    tcp::spawn_feed,
};
use smart_sign::application::{pipeline::Pipeline, services::AdvisoryService};
use smart_sign::config::{AppConfig, CONFIG_ENV};

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Logs (RUST_LOG, info by default)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // 2. Configuration. Any error here is fatal.
    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var(CONFIG_ENV).ok())
        .map(PathBuf::from);
    let config = AppConfig::load(config_path.as_deref())?;
    config.validate().context("invalid configuration")?;

    let advisory = AdvisoryService::new(
        config.policy()?,
        config.artifact_table()?,
        config.smoothing,
        config.min_confidence,
    )?;
    tracing::info!(
        car_busy = config.car_busy_threshold,
        pedestrian_caution = config.pedestrian_caution_threshold,
        min_confidence = config.min_confidence,
        "Advisory policy loaded"
    );

    // 3. Feed server
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (publisher, local_addr, server) = spawn_feed(
        &config.listen_addr(),
        config.feed_format,
        config.publisher(),
        shutdown_rx,
    )
    .await?;
    tracing::info!(addr = %local_addr, format = ?config.feed_format, "Feed listening");

    // 4. Frame loop on its own thread, away from the runtime
    let mut source = JsonLinesSource::open(config.detections_path.as_deref())?;
    let mut pipeline = Pipeline::new(
        advisory,
        Box::new(LogSignDisplay::new()),
        Arc::new(publisher),
        config.frame_interval(),
    );
    let stop = Arc::new(AtomicBool::new(false));
    let (done_tx, done_rx) = oneshot::channel();
    {
        let stop = stop.clone();
        std::thread::Builder::new()
            .name("pipeline".into())
            .spawn(move || {
                let result = pipeline.run(&mut source, &mut RecordedDetector, &stop);
                let _ = done_tx.send(result);
            })
            .context("failed to start pipeline thread")?;
    }

    // 5. Run until the detections end or the operator interrupts
    tokio::select! {
        finished = done_rx => match finished {
            Ok(Ok(stats)) => tracing::info!(frames = stats.frames, "Detection stream ended"),
            Ok(Err(e)) => tracing::error!("Pipeline stopped: {}", e),
            Err(_) => tracing::error!("Pipeline thread exited unexpectedly"),
        },
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupt received, shutting down");
            stop.store(true, Ordering::Relaxed);
        }
    }

    let _ = shutdown_tx.send(true);
    server.await.context("feed server task failed")?;
    Ok(())
}
