//! Mobile-money collection gateways and the factory that picks one per payment.

mod cinemaug;
mod factory;
mod yo;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

pub use cinemaug::{CinemaUgConfig, CinemaUgGateway, map_cinemaug_status};
pub use factory::{PaymentGatewayFactory, SelectionStrategy, TimeWindow, canonical_name};
pub use yo::{DEFAULT_YO_API_URL, YoPaymentsConfig, YoPaymentsGateway, map_yo_status};

use crate::schema::{Network, Transaction, TransactionStatus};

pub const YO_PAYMENTS: &str = "yopayments";
pub const CINEMAUG: &str = "cinemaug";

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("HTTP request to gateway failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Gateway returned an error: {0}")]
    Api(String),
    #[error("Failed to parse gateway response: {0}")]
    Parse(String),
    #[error("Unknown payment gateway `{0}`")]
    UnknownGateway(String),
    #[error("Gateway selection failed: {0}")]
    Selection(String),
}

/// A debit request sent to the customer's phone.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionRequest {
    pub reference: String,
    pub phone: String,
    pub network: Network,
    pub amount: i64,
    pub narrative: String,
}

impl CollectionRequest {
    pub fn for_transaction(transaction: &Transaction, narrative: String) -> Self {
        CollectionRequest {
            reference: transaction.reference.clone(),
            phone: transaction.phone.clone(),
            network: transaction.network,
            amount: transaction.total(),
            narrative,
        }
    }
}

/// Gateway answer already mapped onto the internal status.
#[derive(Debug, Clone)]
pub struct GatewayResponse {
    pub status: TransactionStatus,
    pub external_ref: Option<String>,
    pub message: Option<String>,
    /// Body exactly as received, kept on the transaction row.
    pub raw_payload: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    fn name(&self) -> &'static str;

    async fn collect(&self, request: &CollectionRequest) -> Result<GatewayResponse, GatewayError>;

    async fn check_status(&self, transaction: &Transaction)
    -> Result<GatewayResponse, GatewayError>;
}
