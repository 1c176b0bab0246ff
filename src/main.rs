//! pingkeeper daemon: runs the monitoring engine headless until Ctrl-C.

use pingkeeper::{MonitorConfig, ProjectManager};

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("pingkeeper=info".parse()?))
        .init();

    // Load configuration
    let cfg = MonitorConfig::load();
    cfg.validate()?;
    tracing::info!("Using state files {} and {}", cfg.projects_path().display(), cfg.stats_path().display());

    let manager = Arc::new(ProjectManager::new(&cfg)?);
    let report = manager.status_report();
    tracing::info!("Loaded {} projects ({} active)", report.total, report.active);

    if cfg.autostart {
        manager.start_monitoring();
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    manager.stop_monitoring();

    Ok(())
}
