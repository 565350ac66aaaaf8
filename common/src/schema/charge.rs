use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::Network;

/// Maps an inclusive amount range on one network to a flat fee.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TransactionCharge {
    #[serde(default)]
    pub id: i64,
    pub network: Network,
    pub min_amount: i64,
    pub max_amount: i64,
    pub charge: i64,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub updated_at: Option<NaiveDateTime>,
}

impl TransactionCharge {
    pub fn new(network: Network, min_amount: i64, max_amount: i64, charge: i64) -> Self {
        TransactionCharge {
            id: 0,
            network,
            min_amount,
            max_amount,
            charge,
            created_at: None,
            updated_at: None,
        }
    }
}
