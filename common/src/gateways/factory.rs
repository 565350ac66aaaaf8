use std::str::FromStr;
use std::sync::Arc;

use chrono::{FixedOffset, Timelike, Utc};

use super::{CINEMAUG, GatewayError, PaymentGateway, YO_PAYMENTS};
use crate::db::Database;

const ROUND_ROBIN_KEY: &str = "payment_gateway_round_robin";

/// Maps user-facing aliases onto the registered gateway names.
pub fn canonical_name(name: &str) -> Option<&'static str> {
    match name.trim().to_ascii_lowercase().as_str() {
        "yo" | "yopayments" | "yo_payments" => Some(YO_PAYMENTS),
        "cinemaug" | "cinema" | "cinema_ug" => Some(CINEMAUG),
        _ => None,
    }
}

/// Day gateway inside `[start_hour, end_hour)`, night gateway otherwise.
/// A window with `start_hour > end_hour` wraps past midnight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeWindow {
    pub start_hour: u32,
    pub end_hour: u32,
    pub day_gateway: String,
    pub night_gateway: String,
    pub utc_offset_hours: i32,
}

impl TimeWindow {
    pub fn gateway_for_hour(&self, hour: u32) -> &str {
        let in_window = if self.start_hour <= self.end_hour {
            self.start_hour <= hour && hour < self.end_hour
        } else {
            hour >= self.start_hour || hour < self.end_hour
        };
        if in_window {
            &self.day_gateway
        } else {
            &self.night_gateway
        }
    }

    fn local_hour(&self) -> u32 {
        let now = Utc::now();
        FixedOffset::east_opt(self.utc_offset_hours * 3_600)
            .map(|offset| now.with_timezone(&offset).hour())
            .unwrap_or_else(|| now.hour())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionStrategy {
    /// Always the configured default gateway.
    Fixed,
    RoundRobin,
    TimeBased(TimeWindow),
}

impl FromStr for SelectionStrategy {
    type Err = anyhow::Error;

    /// `time_based` parses to a default 06:00–18:00 window; callers refine it.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed" | "default" | "name" => Ok(SelectionStrategy::Fixed),
            "round_robin" | "roundrobin" | "round-robin" => Ok(SelectionStrategy::RoundRobin),
            "time_based" | "time" | "time-based" => Ok(SelectionStrategy::TimeBased(TimeWindow {
                start_hour: 6,
                end_hour: 18,
                day_gateway: YO_PAYMENTS.to_string(),
                night_gateway: CINEMAUG.to_string(),
                utc_offset_hours: 3,
            })),
            other => Err(anyhow::anyhow!("Unknown gateway strategy `{}`", other)),
        }
    }
}

pub struct PaymentGatewayFactory {
    gateways: Vec<Arc<dyn PaymentGateway>>,
    strategy: SelectionStrategy,
    default_gateway: String,
    db: Database,
}

impl PaymentGatewayFactory {
    pub fn new(
        gateways: Vec<Arc<dyn PaymentGateway>>,
        strategy: SelectionStrategy,
        default_gateway: &str,
        db: Database,
    ) -> Self {
        PaymentGatewayFactory {
            gateways,
            strategy,
            default_gateway: canonical_name(default_gateway)
                .unwrap_or(default_gateway)
                .to_string(),
            db,
        }
    }

    pub fn strategy(&self) -> &SelectionStrategy {
        &self.strategy
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.gateways.iter().map(|g| g.name()).collect()
    }

    pub fn by_name(&self, name: &str) -> Result<Arc<dyn PaymentGateway>, GatewayError> {
        let wanted = canonical_name(name).unwrap_or(name);
        self.gateways
            .iter()
            .find(|g| g.name() == wanted)
            .cloned()
            .ok_or_else(|| GatewayError::UnknownGateway(name.to_string()))
    }

    /// An explicit name always wins; otherwise the configured strategy decides.
    pub async fn make(&self, name: Option<&str>) -> Result<Arc<dyn PaymentGateway>, GatewayError> {
        if let Some(name) = name.filter(|n| !n.trim().is_empty()) {
            return self.by_name(name);
        }
        match &self.strategy {
            SelectionStrategy::Fixed => self.by_name(&self.default_gateway),
            SelectionStrategy::RoundRobin => {
                if self.gateways.is_empty() {
                    return Err(GatewayError::Selection("no gateways registered".into()));
                }
                let counter = self
                    .db
                    .increment_counter(ROUND_ROBIN_KEY)
                    .await
                    .map_err(|e| GatewayError::Selection(format!("{e:#}")))?;
                let index = counter.rem_euclid(self.gateways.len() as i64) as usize;
                let gateway = self.gateways[index].clone();
                log::debug!("Round robin picked {} (counter {})", gateway.name(), counter);
                Ok(gateway)
            }
            SelectionStrategy::TimeBased(window) => {
                let hour = window.local_hour();
                let name = window.gateway_for_hour(hour);
                log::debug!("Time window picked {} for hour {}", name, hour);
                self.by_name(name)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::gateways::{CollectionRequest, GatewayResponse};
    use crate::schema::{Transaction, TransactionStatus};

    struct StubGateway(&'static str);

    #[async_trait]
    impl PaymentGateway for StubGateway {
        fn name(&self) -> &'static str {
            self.0
        }

        async fn collect(
            &self,
            _request: &CollectionRequest,
        ) -> Result<GatewayResponse, GatewayError> {
            Ok(GatewayResponse {
                status: TransactionStatus::Pending,
                external_ref: None,
                message: None,
                raw_payload: String::new(),
            })
        }

        async fn check_status(
            &self,
            _transaction: &Transaction,
        ) -> Result<GatewayResponse, GatewayError> {
            unreachable!("not used by selection tests")
        }
    }

    async fn factory(strategy: SelectionStrategy) -> PaymentGatewayFactory {
        let db = Database::in_memory().await.unwrap();
        PaymentGatewayFactory::new(
            vec![
                Arc::new(StubGateway(YO_PAYMENTS)) as Arc<dyn PaymentGateway>,
                Arc::new(StubGateway(CINEMAUG)),
            ],
            strategy,
            "yo",
            db,
        )
    }

    #[tokio::test]
    async fn explicit_name_and_aliases() {
        let f = factory(SelectionStrategy::Fixed).await;
        assert_eq!(f.make(Some("cinema")).await.unwrap().name(), CINEMAUG);
        assert_eq!(f.make(Some("YO")).await.unwrap().name(), YO_PAYMENTS);
        assert!(matches!(
            f.make(Some("mpesa")).await,
            Err(GatewayError::UnknownGateway(_))
        ));
    }

    #[tokio::test]
    async fn fixed_uses_default() {
        let f = factory(SelectionStrategy::Fixed).await;
        assert_eq!(f.make(None).await.unwrap().name(), YO_PAYMENTS);
        assert_eq!(f.make(Some("  ")).await.unwrap().name(), YO_PAYMENTS);
    }

    #[tokio::test]
    async fn round_robin_alternates() {
        let f = factory(SelectionStrategy::RoundRobin).await;
        let picks: Vec<_> = pick_names(&f, 4).await;
        assert_eq!(picks, vec![YO_PAYMENTS, CINEMAUG, YO_PAYMENTS, CINEMAUG]);
    }

    async fn pick_names(f: &PaymentGatewayFactory, n: usize) -> Vec<&'static str> {
        let mut out = Vec::new();
        for _ in 0..n {
            out.push(f.make(None).await.unwrap().name());
        }
        out
    }

    #[test]
    fn time_window_boundaries() {
        let window = TimeWindow {
            start_hour: 6,
            end_hour: 18,
            day_gateway: YO_PAYMENTS.into(),
            night_gateway: CINEMAUG.into(),
            utc_offset_hours: 3,
        };
        assert_eq!(window.gateway_for_hour(5), CINEMAUG);
        assert_eq!(window.gateway_for_hour(6), YO_PAYMENTS);
        assert_eq!(window.gateway_for_hour(17), YO_PAYMENTS);
        assert_eq!(window.gateway_for_hour(18), CINEMAUG);
    }

    #[test]
    fn time_window_wraps_midnight() {
        let window = TimeWindow {
            start_hour: 22,
            end_hour: 4,
            day_gateway: CINEMAUG.into(),
            night_gateway: YO_PAYMENTS.into(),
            utc_offset_hours: 0,
        };
        assert_eq!(window.gateway_for_hour(23), CINEMAUG);
        assert_eq!(window.gateway_for_hour(2), CINEMAUG);
        assert_eq!(window.gateway_for_hour(12), YO_PAYMENTS);
    }

    #[tokio::test]
    async fn time_based_selects_a_registered_gateway() {
        let f = factory("time_based".parse().unwrap()).await;
        let name = f.make(None).await.unwrap().name();
        assert!(name == YO_PAYMENTS || name == CINEMAUG);
    }

    #[test]
    fn parses_strategy_names() {
        assert_eq!(
            "round-robin".parse::<SelectionStrategy>().unwrap(),
            SelectionStrategy::RoundRobin
        );
        assert!("random".parse::<SelectionStrategy>().is_err());
    }
}
