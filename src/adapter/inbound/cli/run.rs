//! `signalbot run`.

use tracing::{error, info};

use super::command::RunArgs;
use crate::error::Result;
use crate::infrastructure::bootstrap;
use crate::infrastructure::config::settings::Config;

/// Load configuration, start logging, and run the bot until shutdown.
pub async fn execute_run(args: &RunArgs) -> Result<()> {
    let mut config = Config::load(&args.config)?;
    if args.json_logs {
        config.logging.format = "json".into();
    }

    config.init_logging();
    info!(version = env!("CARGO_PKG_VERSION"), "signalbot starting");

    if let Err(e) = bootstrap::run(config).await {
        error!(error = %e, "Fatal error");
        return Err(e);
    }

    info!("signalbot stopped");
    Ok(())
}
