use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A priced bundle of hotspot time.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct VoucherPackage {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    /// Price in UGX.
    pub price: i64,
    /// Passed to the router as `limit-uptime`.
    pub session_timeout_secs: i64,
    /// How long an unused voucher stays valid after issue.
    pub validity_hours: i64,
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub updated_at: Option<NaiveDateTime>,
}

fn default_profile() -> String {
    "default".to_string()
}

fn default_true() -> bool {
    true
}

impl VoucherPackage {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.name.trim().is_empty() {
            return Err(anyhow::anyhow!("Package name must not be empty"));
        }
        if self.price <= 0 {
            return Err(anyhow::anyhow!("Package price must be positive"));
        }
        if self.session_timeout_secs <= 0 || self.validity_hours <= 0 {
            return Err(anyhow::anyhow!(
                "Session timeout and validity must be positive"
            ));
        }
        Ok(())
    }

    /// Loads seed packages from a YAML list.
    pub async fn from_yaml_file(path: &str) -> anyhow::Result<Vec<VoucherPackage>> {
        let content = tokio::fs::read_to_string(path).await?;
        let packages: Vec<VoucherPackage> = serde_yaml::from_str(&content)?;
        for package in &packages {
            package.validate()?;
        }
        Ok(packages)
    }

    /// RouterOS duration notation, e.g. `1d2h30m`.
    pub fn limit_uptime(&self) -> String {
        let mut secs = self.session_timeout_secs.max(0);
        let days = secs / 86_400;
        secs %= 86_400;
        let hours = secs / 3_600;
        secs %= 3_600;
        let minutes = secs / 60;
        secs %= 60;

        let mut out = String::new();
        for (value, unit) in [(days, 'd'), (hours, 'h'), (minutes, 'm'), (secs, 's')] {
            if value > 0 {
                out.push_str(&format!("{value}{unit}"));
            }
        }
        if out.is_empty() {
            out.push_str("0s");
        }
        out
    }
}
