use anyhow::{Context, anyhow};
use chrono::{Duration, NaiveDateTime, Utc};
use rand::Rng;
use serde::Serialize;

use crate::db::{Database, VoucherInsert};
use crate::schema::{Transaction, Voucher, VoucherPackage};

/// No `0 O 1 I L`: codes get typed on phones.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
pub const CODE_LENGTH: usize = 8;
const MAX_CODE_ATTEMPTS: usize = 10;

pub fn generate_code(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

pub fn expiry_for(package: &VoucherPackage, issued_at: NaiveDateTime) -> NaiveDateTime {
    issued_at + Duration::hours(package.validity_hours)
}

/// Inserts a voucher with a fresh code, retrying on code collisions.
pub async fn create_voucher(
    db: &Database,
    package: &VoucherPackage,
    router_id: Option<i64>,
    transaction_id: Option<i64>,
) -> anyhow::Result<Voucher> {
    let expires_at = expiry_for(package, Utc::now().naive_utc());
    for _ in 0..MAX_CODE_ATTEMPTS {
        let mut voucher = Voucher::new(
            generate_code(CODE_LENGTH),
            package.id,
            router_id,
            transaction_id,
            expires_at,
        );
        match db.save_voucher(&voucher).await? {
            VoucherInsert::Inserted(id) => {
                voucher.id = id;
                return Ok(voucher);
            }
            VoucherInsert::CodeTaken => {
                log::debug!("Voucher code {} already taken, retrying", voucher.code);
            }
            VoucherInsert::TransactionTaken => {
                // a concurrent caller issued it first
                let existing = match transaction_id {
                    Some(id) => db.get_voucher_by_transaction(id).await?,
                    None => None,
                };
                return existing.ok_or_else(|| {
                    anyhow!("Voucher for transaction {:?} vanished", transaction_id)
                });
            }
        }
    }
    Err(anyhow!(
        "Could not find a free voucher code after {} attempts",
        MAX_CODE_ATTEMPTS
    ))
}

/// Voucher for a paid transaction. Calling it twice returns the same voucher.
pub async fn issue_voucher(db: &Database, transaction: &Transaction) -> anyhow::Result<Voucher> {
    if let Some(existing) = db.get_voucher_by_transaction(transaction.id).await? {
        return Ok(existing);
    }
    let package = db
        .get_package(transaction.package_id)
        .await?
        .ok_or_else(|| anyhow!("Package {} no longer exists", transaction.package_id))?;

    let voucher = create_voucher(db, &package, transaction.router_id, Some(transaction.id))
        .await
        .with_context(|| format!("Failed to issue voucher for {}", transaction.reference))?;
    log::info!(
        "Issued voucher {} for transaction {} (package {}, expires {})",
        voucher.code,
        transaction.reference,
        package.name,
        voucher.expires_at
    );
    Ok(voucher)
}

#[derive(Debug, Serialize)]
struct VoucherExportRow<'a> {
    code: &'a str,
    package: &'a str,
    price: i64,
    expires_at: NaiveDateTime,
}

/// Pre-prints `count` vouchers for offline sale and writes them to `out` as CSV.
pub async fn generate_batch_csv(
    db: &Database,
    package_id: i64,
    router_id: Option<i64>,
    count: usize,
    out: &str,
) -> anyhow::Result<Vec<Voucher>> {
    let package = db
        .get_package(package_id)
        .await?
        .ok_or_else(|| anyhow!("Package {} not found", package_id))?;

    let file = tokio::fs::File::create(out)
        .await
        .with_context(|| format!("Failed to create `{}`", out))?;
    let mut wtr = csv_async::AsyncSerializer::from_writer(file);

    let mut vouchers = Vec::with_capacity(count);
    for _ in 0..count {
        let voucher = create_voucher(db, &package, router_id, None).await?;
        wtr.serialize(VoucherExportRow {
            code: &voucher.code,
            package: &package.name,
            price: package.price,
            expires_at: voucher.expires_at,
        })
        .await?;
        vouchers.push(voucher);
    }
    wtr.flush().await?;
    log::info!("Generated {} vouchers for {} at {}", count, package.name, out);
    Ok(vouchers)
}
