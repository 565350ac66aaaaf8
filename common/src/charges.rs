use anyhow::{Context, anyhow};
use serde::Deserialize;
use tokio_stream::StreamExt;

use crate::db::Database;
use crate::schema::{Network, TransactionCharge};

/// Fee for moving `amount` over `network`. No matching range means no fee.
pub async fn calculate_charge(db: &Database, network: Network, amount: i64) -> anyhow::Result<i64> {
    match db.find_charge_for(network, amount).await? {
        Some(row) => {
            log::debug!(
                "Charge {} applies to {} on {} (range {}..={})",
                row.charge,
                amount,
                network,
                row.min_amount,
                row.max_amount
            );
            Ok(row.charge)
        }
        None => {
            log::warn!("No charge range covers {} on {}; charging 0", amount, network);
            Ok(0)
        }
    }
}

/// Shape and overlap checks shared by create, update and import.
pub async fn validate_charge(
    db: &Database,
    charge: &TransactionCharge,
    exclude_id: Option<i64>,
) -> anyhow::Result<()> {
    if charge.min_amount < 0 {
        return Err(anyhow!("Minimum amount must not be negative"));
    }
    if charge.min_amount > charge.max_amount {
        return Err(anyhow!(
            "Minimum amount {} is greater than maximum amount {}",
            charge.min_amount,
            charge.max_amount
        ));
    }
    if charge.charge < 0 {
        return Err(anyhow!("Charge must not be negative"));
    }
    if let Some(existing) = db
        .find_overlapping_charge(
            charge.network,
            charge.min_amount,
            charge.max_amount,
            exclude_id,
        )
        .await?
    {
        return Err(anyhow!(
            "Range {}..={} overlaps existing {} range {}..={} (id {})",
            charge.min_amount,
            charge.max_amount,
            existing.network,
            existing.min_amount,
            existing.max_amount,
            existing.id
        ));
    }
    Ok(())
}

pub async fn create_charge(db: &Database, charge: &TransactionCharge) -> anyhow::Result<i64> {
    validate_charge(db, charge, None).await?;
    db.save_charge(charge).await
}

pub async fn update_charge(
    db: &Database,
    id: i64,
    charge: &TransactionCharge,
) -> anyhow::Result<bool> {
    validate_charge(db, charge, Some(id)).await?;
    db.update_charge(id, charge).await
}

#[derive(Debug, Deserialize)]
struct ChargeRecord {
    network: String,
    min_amount: i64,
    max_amount: i64,
    charge: i64,
}

/// Imports `network,min_amount,max_amount,charge` rows. Invalid rows are
/// logged and skipped; returns the number imported.
pub async fn import_charges_csv(db: &Database, path: &str) -> anyhow::Result<usize> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read `{}`", path))?;
    let mut rdr = csv_async::AsyncReaderBuilder::new()
        .has_headers(true)
        .trim(csv_async::Trim::All)
        .create_deserializer(content.as_bytes());
    let mut records = rdr.deserialize::<ChargeRecord>();

    let mut imported = 0;
    while let Some(record) = records.next().await {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                log::error!("Error deserializing charge row: {}", e);
                continue;
            }
        };
        let network = match record.network.parse::<Network>() {
            Ok(network) => network,
            Err(e) => {
                log::error!("Skipping charge row: {}", e);
                continue;
            }
        };
        let charge = TransactionCharge::new(
            network,
            record.min_amount,
            record.max_amount,
            record.charge,
        );
        match create_charge(db, &charge).await {
            Ok(id) => {
                log::debug!("Imported charge id={} {:?}", id, charge);
                imported += 1;
            }
            Err(e) => log::error!("Skipping charge row: {:#}", e),
        }
    }
    Ok(imported)
}
