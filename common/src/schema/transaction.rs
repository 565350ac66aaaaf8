use chrono::NaiveDateTime;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{Network, TransactionStatus};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Transaction {
    pub id: i64,
    pub reference: String,
    pub phone: String,
    pub network: Network,
    /// Package price in UGX.
    pub amount: i64,
    /// Network fee collected on top of `amount`.
    pub charge: i64,
    pub status: TransactionStatus,
    pub gateway: String,
    pub external_ref: Option<String>,
    pub package_id: i64,
    pub router_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_payload: Option<String>,
    pub error_message: Option<String>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl Transaction {
    pub fn new(
        phone: String,
        network: Network,
        amount: i64,
        charge: i64,
        gateway: &str,
        package_id: i64,
        router_id: Option<i64>,
    ) -> Self {
        Transaction {
            id: 0, // set by DB
            reference: generate_reference(),
            phone,
            network,
            amount,
            charge,
            status: TransactionStatus::Pending,
            gateway: gateway.to_string(),
            external_ref: None,
            package_id,
            router_id,
            raw_payload: None,
            error_message: None,
            created_at: None,
            updated_at: None,
        }
    }

    /// What the customer is actually debited.
    pub fn total(&self) -> i64 {
        self.amount + self.charge
    }
}

/// `HS` + UTC timestamp + six random digits.
pub fn generate_reference() -> String {
    let mut rng = rand::rng();
    let suffix: u32 = rng.random_range(0..1_000_000);
    format!(
        "HS{}{:06}",
        chrono::Utc::now().format("%Y%m%d%H%M%S"),
        suffix
    )
}
