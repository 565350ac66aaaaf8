use std::time::Duration;

use anyhow::Context;
use common::ServiceConfig;

use crate::state::AppState;

pub struct AppConfig {
    pub service: ServiceConfig,
    pub bind_addr: String,
    pub status_check_interval: Duration,
    pub cleanup_interval: Duration,
    pub packages_yaml: Option<String>,
}

fn secs_from_env(key: &str, default: u64) -> anyhow::Result<Duration> {
    let secs = match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .with_context(|| format!("{} must be a number of seconds", key))?,
        Err(_) => default,
    };
    if secs == 0 {
        return Err(anyhow::anyhow!("{} must be greater than zero", key));
    }
    Ok(Duration::from_secs(secs))
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let service = ServiceConfig::from_env()?;

        let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());

        let status_check_interval = secs_from_env("STATUS_CHECK_INTERVAL_SECS", 60)?;

        let cleanup_interval = secs_from_env("CLEANUP_INTERVAL_SECS", 3_600)?;

        let packages_yaml = std::env::var("PACKAGES_YAML").ok();

        Ok(Self {
            service,
            bind_addr,
            status_check_interval,
            cleanup_interval,
            packages_yaml,
        })
    }

    pub async fn create_app_state(&self) -> anyhow::Result<AppState> {
        let payments = self
            .service
            .create_payment_service()
            .await
            .context("Failed to initialize AppState")?;
        Ok(AppState::new(payments))
    }
}
