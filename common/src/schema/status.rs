use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Internal lifecycle of a mobile-money transaction. Every gateway status
/// string is mapped onto one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
    Expired,
}

impl TransactionStatus {
    pub const ALL: [TransactionStatus; 6] = [
        TransactionStatus::Pending,
        TransactionStatus::Processing,
        TransactionStatus::Completed,
        TransactionStatus::Failed,
        TransactionStatus::Cancelled,
        TransactionStatus::Expired,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Processing => "processing",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Cancelled => "cancelled",
            TransactionStatus::Expired => "expired",
        }
    }

    /// Terminal statuses are never polled again.
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            TransactionStatus::Pending | TransactionStatus::Processing
        )
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TransactionStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| anyhow::anyhow!("Unknown transaction status `{}`", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Network {
    Mtn,
    Airtel,
    /// Only meaningful on charge rows: applies to every network.
    All,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Mtn => "mtn",
            Network::Airtel => "airtel",
            Network::All => "all",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mtn" => Ok(Network::Mtn),
            "airtel" => Ok(Network::Airtel),
            "all" | "*" => Ok(Network::All),
            other => Err(anyhow::anyhow!("Unknown network `{}`", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_pending_and_processing_are_open() {
        let open: Vec<_> = TransactionStatus::ALL
            .into_iter()
            .filter(|s| !s.is_terminal())
            .collect();
        assert_eq!(
            open,
            vec![TransactionStatus::Pending, TransactionStatus::Processing]
        );
    }

    #[test]
    fn parses_status_case_insensitively() {
        assert_eq!(
            "Completed".parse::<TransactionStatus>().unwrap(),
            TransactionStatus::Completed
        );
        assert!("done".parse::<TransactionStatus>().is_err());
    }

    #[test]
    fn parses_network_aliases() {
        assert_eq!("MTN".parse::<Network>().unwrap(), Network::Mtn);
        assert_eq!("*".parse::<Network>().unwrap(), Network::All);
        assert!("safaricom".parse::<Network>().is_err());
    }
}
