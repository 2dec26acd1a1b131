//! `signalbot check` diagnostics.

use std::path::Path;
use std::time::Duration;

use serde_json::{json, Value};

use super::output;
use crate::error::{Error, Result};
use crate::infrastructure::config::settings::Config;

/// Validate configuration without starting the bot.
pub fn execute_config<P: AsRef<Path>>(config_path: P) -> Result<()> {
    let path = config_path.as_ref();
    let config = Config::load(path)?;

    output::section("Configuration Check");
    output::field("Config", path.display());
    output::success("Configuration is valid");

    output::section("Summary");
    output::field("Database", &config.database.path);
    output::field("Exchange API", &config.exchange.base_url);
    output::field(
        "Admin",
        config
            .telegram
            .admin_id
            .map_or_else(|| "-".to_string(), |id| id.to_string()),
    );
    output::field(
        "Updates",
        config
            .telegram
            .full_webhook_url()
            .map_or_else(|| "long polling".to_string(), |url| format!("webhook {url}")),
    );
    output::field(
        "Listen",
        format!("{}:{}", config.server.host, config.server.port),
    );
    output::field(
        "Registration",
        if config.bot.allow_registration {
            "open"
        } else {
            "closed"
        },
    );
    output::field(
        "Defaults",
        format!(
            "{} USDT, {}x",
            config.bot.default_trade_amount.normalize(),
            config.bot.default_max_leverage
        ),
    );

    if config.telegram.signal_channel_id.is_some() {
        output::success("Signal channel configured");
    } else {
        output::warning("No SIGNAL_CHANNEL_ID; signals are accepted from admin DMs only");
    }

    Ok(())
}

/// Probe a running instance's health endpoint.
///
/// Fails when the endpoint is unreachable or reports unhealthy, so the
/// exit status can drive a container `HEALTHCHECK`.
pub async fn execute_health(url: &str, timeout: Duration) -> Result<()> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    let response = client.get(url).send().await?;
    let status = response.status();
    let body: Value = response.json().await.unwrap_or(Value::Null);

    if output::is_json() {
        output::json_output(json!({
            "command": "check.health",
            "http_status": status.as_u16(),
            "body": body,
        }));
    } else {
        output::section("Health Check");
        output::field("Endpoint", url);
        if let Some(checks) = body["checks"].as_array() {
            for check in checks {
                let name = check["name"].as_str().unwrap_or("?");
                let critical = check["critical"].as_bool().unwrap_or(false);
                let healthy = check["healthy"].as_bool().unwrap_or(false);
                let suffix = if critical { " (critical)" } else { "" };
                let detail = match check["detail"].as_str() {
                    Some(detail) if !healthy => format!("unhealthy: {detail}"),
                    _ if healthy => "healthy".to_string(),
                    _ => "unhealthy".to_string(),
                };
                output::field(&format!("{name}{suffix}"), detail);
            }
        }
    }

    if !status.is_success() {
        output::error("Health check failed");
        return Err(Error::Connection(format!(
            "health endpoint returned {status}"
        )));
    }
    output::success("Health check passed");
    Ok(())
}
