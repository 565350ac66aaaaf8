use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use crate::db::Database;
use crate::gateways::{
    CINEMAUG, CinemaUgConfig, CinemaUgGateway, PaymentGateway, PaymentGatewayFactory,
    SelectionStrategy, YO_PAYMENTS, YoPaymentsConfig, YoPaymentsGateway, canonical_name,
};
use crate::mikrotik::MikroTikService;
use crate::payments::PaymentService;

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{} has an invalid value `{}`: {}", key, raw, e)),
        Err(_) => Ok(default),
    }
}

/// Settings shared by the server and the command line tool.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub database_url: String,
    pub strategy: SelectionStrategy,
    pub default_gateway: String,
    pub yo: YoPaymentsConfig,
    pub cinemaug: CinemaUgConfig,
    pub gateway_timeout: Duration,
    pub router_timeout: Duration,
    pub pending_timeout: chrono::Duration,
}

impl ServiceConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

        let default_gateway = env_or("DEFAULT_GATEWAY", YO_PAYMENTS);
        canonical_name(&default_gateway).with_context(|| {
            format!("DEFAULT_GATEWAY `{}` is not a known gateway", default_gateway)
        })?;

        let mut strategy: SelectionStrategy = env_or("GATEWAY_STRATEGY", "fixed")
            .parse()
            .context("GATEWAY_STRATEGY is invalid")?;
        if let SelectionStrategy::TimeBased(window) = &mut strategy {
            window.start_hour = env_parse("DAY_START_HOUR", window.start_hour)?;
            window.end_hour = env_parse("DAY_END_HOUR", window.end_hour)?;
            window.day_gateway = env_or("DAY_GATEWAY", &window.day_gateway);
            window.night_gateway = env_or("NIGHT_GATEWAY", &window.night_gateway);
            window.utc_offset_hours = env_parse("UTC_OFFSET_HOURS", window.utc_offset_hours)?;
            if window.start_hour > 23 || window.end_hour > 24 {
                return Err(anyhow::anyhow!(
                    "DAY_START_HOUR/DAY_END_HOUR must be within 0..=23 / 0..=24"
                ));
            }
        }

        let yo = YoPaymentsConfig {
            api_url: env_or("YO_API_URL", crate::gateways::DEFAULT_YO_API_URL),
            username: env_or("YO_API_USERNAME", ""),
            password: env_or("YO_API_PASSWORD", ""),
        };
        let cinemaug = CinemaUgConfig {
            api_url: env_or("CINEMAUG_API_URL", "https://api.cinemaug.com/v1"),
            api_key: env_or("CINEMAUG_API_KEY", ""),
        };
        if yo.username.is_empty() {
            log::warn!("YO_API_USERNAME is not set; YoPayments calls will be rejected");
        }
        if cinemaug.api_key.is_empty() {
            log::warn!("CINEMAUG_API_KEY is not set; CinemaUG calls will be rejected");
        }

        Ok(Self {
            database_url,
            strategy,
            default_gateway,
            yo,
            cinemaug,
            gateway_timeout: Duration::from_secs(env_parse("GATEWAY_TIMEOUT_SECS", 30)?),
            router_timeout: Duration::from_secs(env_parse("ROUTER_TIMEOUT_SECS", 10)?),
            pending_timeout: chrono::Duration::minutes(env_parse("PENDING_TIMEOUT_MINUTES", 30)?),
        })
    }

    pub fn gateways(&self) -> anyhow::Result<Vec<Arc<dyn PaymentGateway>>> {
        let yo = YoPaymentsGateway::new(self.yo.clone(), self.gateway_timeout)
            .context("Failed to build YoPayments client")?;
        let cinemaug = CinemaUgGateway::new(self.cinemaug.clone(), self.gateway_timeout)
            .context("Failed to build CinemaUG client")?;
        log::debug!("Registered gateways: {}, {}", YO_PAYMENTS, CINEMAUG);
        let gateways: Vec<Arc<dyn PaymentGateway>> = vec![Arc::new(yo), Arc::new(cinemaug)];
        Ok(gateways)
    }

    pub async fn create_payment_service(&self) -> anyhow::Result<PaymentService> {
        let db = Database::new(&self.database_url).await?;
        log::info!("Database initialized successfully!");

        let factory = PaymentGatewayFactory::new(
            self.gateways()?,
            self.strategy.clone(),
            &self.default_gateway,
            db.clone(),
        );
        Ok(PaymentService::new(
            db,
            factory,
            Arc::new(MikroTikService::new(self.router_timeout)),
            self.pending_timeout,
        ))
    }
}
