use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Voucher {
    pub id: i64,
    pub code: String,
    pub package_id: i64,
    pub router_id: Option<i64>,
    pub transaction_id: Option<i64>,
    pub expires_at: NaiveDateTime,
    pub used: bool,
    pub router_synced: bool,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<NaiveDateTime>,
}

impl Voucher {
    pub fn new(
        code: String,
        package_id: i64,
        router_id: Option<i64>,
        transaction_id: Option<i64>,
        expires_at: NaiveDateTime,
    ) -> Self {
        Voucher {
            id: 0, // set by DB
            code,
            package_id,
            router_id,
            transaction_id,
            expires_at,
            used: false,
            router_synced: false,
            created_at: None,
            updated_at: None,
            deleted_at: None,
        }
    }

    pub fn is_expired(&self, now: NaiveDateTime) -> bool {
        self.expires_at <= now
    }
}
