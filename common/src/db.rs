use std::str::FromStr;

use anyhow::Context;
use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::schema::{
    Network, RouterConfiguration, Transaction, TransactionCharge, TransactionStatus, User,
    Voucher, VoucherPackage,
};

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoucherInsert {
    Inserted(i64),
    CodeTaken,
    /// The transaction already has its voucher.
    TransactionTaken,
}

impl VoucherInsert {
    pub fn id(self) -> Option<i64> {
        match self {
            VoucherInsert::Inserted(id) => Some(id),
            _ => None,
        }
    }
}

/// Delete refused because other rows still point at the target.
pub fn is_foreign_key_violation(e: &anyhow::Error) -> bool {
    matches!(
        e.downcast_ref::<sqlx::Error>(),
        Some(sqlx::Error::Database(db)) if db.is_foreign_key_violation()
    )
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct DashboardStats {
    pub active_vouchers: i64,
    pub total_vouchers: i64,
    pub unsynced_vouchers: i64,
    pub pending_transactions: i64,
    pub completed_transactions: i64,
    pub failed_transactions: i64,
    pub revenue: i64,
    pub charges_collected: i64,
}

impl Database {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .context("Failed to create SQLite connect options")?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;
        Self::migrate(pool).await
    }

    /// Fresh private database, used by tests and dry runs.
    pub async fn in_memory() -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .context("Failed to create SQLite connect options")?
            .foreign_keys(true);
        // every connection to :memory: is a separate database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .context("Failed to open in-memory database")?;
        Self::migrate(pool).await
    }

    async fn migrate(pool: SqlitePool) -> anyhow::Result<Self> {
        sqlx::migrate!()
            .run(&pool)
            .await
            .context("Database migration error")?;
        Ok(Self { pool })
    }

    // ---- users ----

    pub async fn save_user(&self, user: &User) -> anyhow::Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (username, email, password_hash, is_superuser)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.is_superuser)
        .execute(&self.pool)
        .await
        .context("Failed to save user")?;
        Ok(result.last_insert_rowid())
    }

    pub async fn get_user(&self, username: &str) -> anyhow::Result<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .context(format!("Failed to get user {}", username))
    }

    // ---- packages ----

    pub async fn save_package(&self, package: &VoucherPackage) -> anyhow::Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO voucher_packages (
                name, price, session_timeout_secs, validity_hours, profile, is_active
            ) VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&package.name)
        .bind(package.price)
        .bind(package.session_timeout_secs)
        .bind(package.validity_hours)
        .bind(&package.profile)
        .bind(package.is_active)
        .execute(&self.pool)
        .await
        .context("Failed to save voucher package")?;
        Ok(result.last_insert_rowid())
    }

    pub async fn update_package(&self, id: i64, package: &VoucherPackage) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE voucher_packages
            SET name = ?, price = ?, session_timeout_secs = ?, validity_hours = ?,
                profile = ?, is_active = ?, updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "#,
        )
        .bind(&package.name)
        .bind(package.price)
        .bind(package.session_timeout_secs)
        .bind(package.validity_hours)
        .bind(&package.profile)
        .bind(package.is_active)
        .bind(id)
        .execute(&self.pool)
        .await
        .context(format!("Failed to update voucher package {}", id))?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_package(&self, id: i64) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM voucher_packages WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context(format!("Failed to delete voucher package {}", id))?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn get_package(&self, id: i64) -> anyhow::Result<Option<VoucherPackage>> {
        sqlx::query_as::<_, VoucherPackage>("SELECT * FROM voucher_packages WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context(format!("Failed to get voucher package {}", id))
    }

    pub async fn get_packages(&self, active_only: bool) -> anyhow::Result<Vec<VoucherPackage>> {
        let sql = if active_only {
            "SELECT * FROM voucher_packages WHERE is_active = 1 ORDER BY price"
        } else {
            "SELECT * FROM voucher_packages ORDER BY price"
        };
        sqlx::query_as::<_, VoucherPackage>(sql)
            .fetch_all(&self.pool)
            .await
            .context("Failed to get voucher packages")
    }

    // ---- routers ----

    pub async fn save_router(&self, router: &RouterConfiguration) -> anyhow::Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO router_configurations (
                name, host, port, username, password, hotspot_server, is_active
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&router.name)
        .bind(&router.host)
        .bind(router.port)
        .bind(&router.username)
        .bind(&router.password)
        .bind(&router.hotspot_server)
        .bind(router.is_active)
        .execute(&self.pool)
        .await
        .context("Failed to save router configuration")?;
        Ok(result.last_insert_rowid())
    }

    pub async fn update_router(
        &self,
        id: i64,
        router: &RouterConfiguration,
    ) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE router_configurations
            SET name = ?, host = ?, port = ?, username = ?, password = ?,
                hotspot_server = ?, is_active = ?, updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "#,
        )
        .bind(&router.name)
        .bind(&router.host)
        .bind(router.port)
        .bind(&router.username)
        .bind(&router.password)
        .bind(&router.hotspot_server)
        .bind(router.is_active)
        .bind(id)
        .execute(&self.pool)
        .await
        .context(format!("Failed to update router {}", id))?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_router(&self, id: i64) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM router_configurations WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context(format!("Failed to delete router {}", id))?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn get_router(&self, id: i64) -> anyhow::Result<Option<RouterConfiguration>> {
        sqlx::query_as::<_, RouterConfiguration>(
            "SELECT * FROM router_configurations WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context(format!("Failed to get router {}", id))
    }

    pub async fn get_routers(&self) -> anyhow::Result<Vec<RouterConfiguration>> {
        sqlx::query_as::<_, RouterConfiguration>("SELECT * FROM router_configurations ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .context("Failed to get routers")
    }

    // ---- charges ----

    pub async fn save_charge(&self, charge: &TransactionCharge) -> anyhow::Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO transaction_charges (network, min_amount, max_amount, charge)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(charge.network)
        .bind(charge.min_amount)
        .bind(charge.max_amount)
        .bind(charge.charge)
        .execute(&self.pool)
        .await
        .context("Failed to save transaction charge")?;
        Ok(result.last_insert_rowid())
    }

    pub async fn update_charge(&self, id: i64, charge: &TransactionCharge) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE transaction_charges
            SET network = ?, min_amount = ?, max_amount = ?, charge = ?,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "#,
        )
        .bind(charge.network)
        .bind(charge.min_amount)
        .bind(charge.max_amount)
        .bind(charge.charge)
        .bind(id)
        .execute(&self.pool)
        .await
        .context(format!("Failed to update transaction charge {}", id))?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_charge(&self, id: i64) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM transaction_charges WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context(format!("Failed to delete transaction charge {}", id))?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn get_charges(&self) -> anyhow::Result<Vec<TransactionCharge>> {
        sqlx::query_as::<_, TransactionCharge>(
            "SELECT * FROM transaction_charges ORDER BY network, min_amount",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to get transaction charges")
    }

    /// First row on the same network whose inclusive range intersects
    /// `[min_amount, max_amount]`, ignoring `exclude_id`.
    pub async fn find_overlapping_charge(
        &self,
        network: Network,
        min_amount: i64,
        max_amount: i64,
        exclude_id: Option<i64>,
    ) -> anyhow::Result<Option<TransactionCharge>> {
        sqlx::query_as::<_, TransactionCharge>(
            r#"
            SELECT * FROM transaction_charges
            WHERE network = ? AND min_amount <= ? AND max_amount >= ? AND id != ?
            LIMIT 1
            "#,
        )
        .bind(network)
        .bind(max_amount)
        .bind(min_amount)
        .bind(exclude_id.unwrap_or(0))
        .fetch_optional(&self.pool)
        .await
        .context("Failed to check charge overlap")
    }

    /// Range match for `amount`; an exact network row wins over an `all` row.
    pub async fn find_charge_for(
        &self,
        network: Network,
        amount: i64,
    ) -> anyhow::Result<Option<TransactionCharge>> {
        sqlx::query_as::<_, TransactionCharge>(
            r#"
            SELECT * FROM transaction_charges
            WHERE (network = ? OR network = 'all') AND min_amount <= ? AND max_amount >= ?
            ORDER BY CASE WHEN network = 'all' THEN 1 ELSE 0 END, min_amount
            LIMIT 1
            "#,
        )
        .bind(network)
        .bind(amount)
        .bind(amount)
        .fetch_optional(&self.pool)
        .await
        .context(format!("Failed to look up charge for {} on {}", amount, network))
    }

    // ---- transactions ----

    pub async fn save_transaction(&self, transaction: &Transaction) -> anyhow::Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO transactions (
                reference, phone, network, amount, charge, status, gateway,
                external_ref, package_id, router_id, raw_payload, error_message
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&transaction.reference)
        .bind(&transaction.phone)
        .bind(transaction.network)
        .bind(transaction.amount)
        .bind(transaction.charge)
        .bind(transaction.status)
        .bind(&transaction.gateway)
        .bind(&transaction.external_ref)
        .bind(transaction.package_id)
        .bind(transaction.router_id)
        .bind(&transaction.raw_payload)
        .bind(&transaction.error_message)
        .execute(&self.pool)
        .await
        .context("Failed to save transaction")?;
        Ok(result.last_insert_rowid())
    }

    pub async fn get_transaction(&self, id: i64) -> anyhow::Result<Option<Transaction>> {
        sqlx::query_as::<_, Transaction>("SELECT * FROM transactions WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context(format!("Failed to get transaction {}", id))
    }

    pub async fn get_transaction_by_reference(
        &self,
        reference: &str,
    ) -> anyhow::Result<Option<Transaction>> {
        sqlx::query_as::<_, Transaction>(
            "SELECT * FROM transactions WHERE reference = ? OR external_ref = ? LIMIT 1",
        )
        .bind(reference)
        .bind(reference)
        .fetch_optional(&self.pool)
        .await
        .context(format!("Failed to get transaction {}", reference))
    }

    pub async fn get_transactions(
        &self,
        status: Option<TransactionStatus>,
    ) -> anyhow::Result<Vec<Transaction>> {
        let query = match status {
            Some(status) => sqlx::query_as::<_, Transaction>(
                "SELECT * FROM transactions WHERE status = ? ORDER BY id DESC",
            )
            .bind(status),
            None => sqlx::query_as::<_, Transaction>("SELECT * FROM transactions ORDER BY id DESC"),
        };
        query
            .fetch_all(&self.pool)
            .await
            .context("Failed to get transactions")
    }

    /// Transactions still waiting on a gateway.
    pub async fn get_open_transactions(&self) -> anyhow::Result<Vec<Transaction>> {
        sqlx::query_as::<_, Transaction>(
            "SELECT * FROM transactions WHERE status IN ('pending', 'processing') ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to get open transactions")
    }

    pub async fn update_transaction_status(
        &self,
        id: i64,
        status: TransactionStatus,
        external_ref: Option<&str>,
        raw_payload: Option<&str>,
        error_message: Option<&str>,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE transactions
            SET status = ?,
                external_ref = COALESCE(?, external_ref),
                raw_payload = COALESCE(?, raw_payload),
                error_message = ?,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "#,
        )
        .bind(status)
        .bind(external_ref)
        .bind(raw_payload)
        .bind(error_message)
        .bind(id)
        .execute(&self.pool)
        .await
        .context(format!("Failed to update status of transaction {}", id))?;
        Ok(())
    }

    /// Marks open transactions created before `cutoff` as expired.
    pub async fn expire_stale_transactions(&self, cutoff: NaiveDateTime) -> anyhow::Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE transactions
            SET status = 'expired',
                error_message = 'No final status from gateway before timeout',
                updated_at = CURRENT_TIMESTAMP
            WHERE status IN ('pending', 'processing') AND created_at <= ?
            "#,
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await
        .context("Failed to expire stale transactions")?;
        Ok(result.rows_affected())
    }

    // ---- vouchers ----

    /// Inserts unless the code is taken or the transaction already has a voucher.
    pub async fn save_voucher(&self, voucher: &Voucher) -> anyhow::Result<VoucherInsert> {
        let result = sqlx::query(
            r#"
            INSERT INTO vouchers (
                code, package_id, router_id, transaction_id, expires_at, used, router_synced
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(transaction_id) DO NOTHING
            "#,
        )
        .bind(&voucher.code)
        .bind(voucher.package_id)
        .bind(voucher.router_id)
        .bind(voucher.transaction_id)
        .bind(voucher.expires_at)
        .bind(voucher.used)
        .bind(voucher.router_synced)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) if done.rows_affected() == 0 => Ok(VoucherInsert::TransactionTaken),
            Ok(done) => Ok(VoucherInsert::Inserted(done.last_insert_rowid())),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Ok(VoucherInsert::CodeTaken),
            Err(e) => Err(anyhow::Error::new(e).context("Failed to save voucher")),
        }
    }

    pub async fn get_voucher_by_transaction(
        &self,
        transaction_id: i64,
    ) -> anyhow::Result<Option<Voucher>> {
        sqlx::query_as::<_, Voucher>("SELECT * FROM vouchers WHERE transaction_id = ?")
            .bind(transaction_id)
            .fetch_optional(&self.pool)
            .await
            .context(format!(
                "Failed to get voucher for transaction {}",
                transaction_id
            ))
    }

    pub async fn get_vouchers(&self, include_deleted: bool) -> anyhow::Result<Vec<Voucher>> {
        let sql = if include_deleted {
            "SELECT * FROM vouchers ORDER BY id DESC"
        } else {
            "SELECT * FROM vouchers WHERE deleted_at IS NULL ORDER BY id DESC"
        };
        sqlx::query_as::<_, Voucher>(sql)
            .fetch_all(&self.pool)
            .await
            .context("Failed to get vouchers")
    }

    pub async fn get_unsynced_vouchers(&self) -> anyhow::Result<Vec<Voucher>> {
        sqlx::query_as::<_, Voucher>(
            r#"
            SELECT * FROM vouchers
            WHERE router_synced = 0 AND router_id IS NOT NULL AND deleted_at IS NULL
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to get unsynced vouchers")
    }

    pub async fn mark_voucher_synced(&self, id: i64) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE vouchers SET router_synced = 1, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .context(format!("Failed to mark voucher {} as synced", id))?;
        Ok(())
    }

    pub async fn get_expired_vouchers(&self, now: NaiveDateTime) -> anyhow::Result<Vec<Voucher>> {
        sqlx::query_as::<_, Voucher>(
            "SELECT * FROM vouchers WHERE expires_at <= ? AND deleted_at IS NULL ORDER BY id",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .context("Failed to get expired vouchers")
    }

    pub async fn soft_delete_voucher(&self, id: i64) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE vouchers
            SET deleted_at = CURRENT_TIMESTAMP, updated_at = CURRENT_TIMESTAMP
            WHERE id = ? AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .context(format!("Failed to delete voucher {}", id))?;
        Ok(())
    }

    // ---- cache ----

    /// Atomically bumps a named counter and returns the value before the bump.
    pub async fn increment_counter(&self, key: &str) -> anyhow::Result<i64> {
        let value: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO cache_counters (key, value) VALUES (?, 1)
            ON CONFLICT(key) DO UPDATE SET value = value + 1
            RETURNING value
            "#,
        )
        .bind(key)
        .fetch_one(&self.pool)
        .await
        .context(format!("Failed to increment counter {}", key))?;
        Ok(value - 1)
    }

    // ---- dashboard ----

    pub async fn dashboard_stats(&self, now: NaiveDateTime) -> anyhow::Result<DashboardStats> {
        let (active_vouchers, total_vouchers, unsynced_vouchers): (i64, i64, i64) =
            sqlx::query_as(
                r#"
                SELECT
                    COALESCE(SUM(CASE WHEN deleted_at IS NULL AND expires_at > ? THEN 1 ELSE 0 END), 0),
                    COUNT(*),
                    COALESCE(SUM(CASE WHEN deleted_at IS NULL AND router_synced = 0 AND router_id IS NOT NULL THEN 1 ELSE 0 END), 0)
                FROM vouchers
                "#,
            )
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .context("Failed to count vouchers")?;

        let (pending, completed, failed, revenue, charges): (i64, i64, i64, i64, i64) =
            sqlx::query_as(
                r#"
                SELECT
                    COALESCE(SUM(CASE WHEN status IN ('pending', 'processing') THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN status = 'completed' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN status IN ('failed', 'cancelled', 'expired') THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN status = 'completed' THEN amount ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN status = 'completed' THEN charge ELSE 0 END), 0)
                FROM transactions
                "#,
            )
            .fetch_one(&self.pool)
            .await
            .context("Failed to summarize transactions")?;

        Ok(DashboardStats {
            active_vouchers,
            total_vouchers,
            unsynced_vouchers,
            pending_transactions: pending,
            completed_transactions: completed,
            failed_transactions: failed,
            revenue,
            charges_collected: charges,
        })
    }
}
