use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub const DEFAULT_API_PORT: i64 = 8728;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RouterConfiguration {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    pub host: String,
    #[serde(default = "default_port")]
    pub port: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    /// Hotspot server name on the router; `None` means all servers.
    #[serde(default)]
    pub hotspot_server: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub updated_at: Option<NaiveDateTime>,
}

fn default_port() -> i64 {
    DEFAULT_API_PORT
}

fn default_true() -> bool {
    true
}

impl RouterConfiguration {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.name.trim().is_empty() || self.host.trim().is_empty() {
            return Err(anyhow::anyhow!("Router name and host are required"));
        }
        if self.username.trim().is_empty() {
            return Err(anyhow::anyhow!("Router username is required"));
        }
        if !(1..=65_535).contains(&self.port) {
            return Err(anyhow::anyhow!("Router port {} is out of range", self.port));
        }
        Ok(())
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
