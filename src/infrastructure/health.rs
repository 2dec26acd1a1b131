//! Runtime health reporting.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use crate::port::outbound::store::SubscriberStore;

/// Upper bound for the database round trip, well inside the probe timeout.
const DATABASE_CHECK_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Unhealthy(String),
}

#[derive(Debug, Clone)]
pub struct HealthCheck {
    name: &'static str,
    critical: bool,
    status: HealthStatus,
}

impl HealthCheck {
    pub fn new(name: &'static str, critical: bool, status: HealthStatus) -> Self {
        Self {
            name,
            critical,
            status,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn critical(&self) -> bool {
        self.critical
    }

    pub fn status(&self) -> &HealthStatus {
        &self.status
    }

    pub fn is_healthy(&self) -> bool {
        matches!(self.status, HealthStatus::Healthy)
    }
}

#[derive(Debug, Clone)]
pub struct HealthReport {
    checks: Vec<HealthCheck>,
}

impl HealthReport {
    pub fn new(checks: Vec<HealthCheck>) -> Self {
        Self { checks }
    }

    pub fn checks(&self) -> &[HealthCheck] {
        &self.checks
    }

    /// Healthy when every critical check passes.
    pub fn is_healthy(&self) -> bool {
        self.checks
            .iter()
            .filter(|check| check.critical())
            .all(HealthCheck::is_healthy)
    }

    /// Body served by `GET /health`.
    pub fn to_json(&self) -> Value {
        let checks = self
            .checks
            .iter()
            .map(|check| {
                let detail = match check.status() {
                    HealthStatus::Healthy => None,
                    HealthStatus::Unhealthy(reason) => Some(reason.as_str()),
                };
                json!({
                    "name": check.name(),
                    "critical": check.critical(),
                    "healthy": check.is_healthy(),
                    "detail": detail,
                })
            })
            .collect::<Vec<_>>();

        json!({
            "status": if self.is_healthy() { "healthy" } else { "unhealthy" },
            "checks": checks,
        })
    }
}

/// Runs the liveness checks for a running bot.
pub struct HealthChecker {
    store: Arc<dyn SubscriberStore>,
    telegram_token_configured: bool,
    signal_channel_id: Option<i64>,
    database_timeout: Duration,
}

impl HealthChecker {
    pub fn new(
        store: Arc<dyn SubscriberStore>,
        telegram_token: &str,
        signal_channel_id: Option<i64>,
    ) -> Self {
        Self {
            store,
            telegram_token_configured: !telegram_token.trim().is_empty(),
            signal_channel_id,
            database_timeout: DATABASE_CHECK_TIMEOUT,
        }
    }

    /// Override the bound on the database check.
    #[must_use]
    pub fn with_database_timeout(mut self, timeout: Duration) -> Self {
        self.database_timeout = timeout;
        self
    }

    pub async fn report(&self) -> HealthReport {
        let database = match tokio::time::timeout(self.database_timeout, self.store.ping()).await
        {
            Ok(Ok(())) => HealthStatus::Healthy,
            Ok(Err(e)) => HealthStatus::Unhealthy(e.to_string()),
            Err(_) => HealthStatus::Unhealthy("database ping timed out".to_string()),
        };

        let telegram_token = if self.telegram_token_configured {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy("bot token is empty".to_string())
        };

        let signal_source = if self.signal_channel_id.is_some() {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy("no signal channel; admin DMs only".to_string())
        };

        HealthReport::new(vec![
            HealthCheck::new("database", true, database),
            HealthCheck::new("telegram_token", true, telegram_token),
            HealthCheck::new("signal_source", false, signal_source),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_check_struct_accessors() {
        let check = HealthCheck::new("database", true, HealthStatus::Healthy);

        assert_eq!(check.name(), "database");
        assert!(check.critical());
        assert!(matches!(check.status(), HealthStatus::Healthy));
        assert!(check.is_healthy());
    }

    #[test]
    fn health_report_is_healthy_when_all_critical_pass() {
        let report = HealthReport::new(vec![
            HealthCheck::new("critical_pass", true, HealthStatus::Healthy),
            HealthCheck::new(
                "non_critical_fail",
                false,
                HealthStatus::Unhealthy("warning".to_string()),
            ),
        ]);

        assert!(report.is_healthy());
    }

    #[test]
    fn health_report_is_unhealthy_when_critical_fails() {
        let report = HealthReport::new(vec![
            HealthCheck::new(
                "critical_fail",
                true,
                HealthStatus::Unhealthy("error".to_string()),
            ),
            HealthCheck::new("critical_pass", true, HealthStatus::Healthy),
        ]);

        assert!(!report.is_healthy());
    }

    #[test]
    fn json_body_lists_checks() {
        let report = HealthReport::new(vec![
            HealthCheck::new("database", true, HealthStatus::Healthy),
            HealthCheck::new(
                "signal_source",
                false,
                HealthStatus::Unhealthy("none".to_string()),
            ),
        ]);
        let body = report.to_json();

        assert_eq!(body["status"], "healthy");
        assert_eq!(body["checks"][0]["name"], "database");
        assert_eq!(body["checks"][0]["detail"], Value::Null);
        assert_eq!(body["checks"][1]["healthy"], false);
        assert_eq!(body["checks"][1]["detail"], "none");
    }

    #[test]
    fn json_body_reports_unhealthy() {
        let report = HealthReport::new(vec![HealthCheck::new(
            "telegram_token",
            true,
            HealthStatus::Unhealthy("bot token is empty".to_string()),
        )]);
        assert_eq!(report.to_json()["status"], "unhealthy");
    }
}
