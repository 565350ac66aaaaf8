//! Purchase, status-check and cleanup flows tying the database, the payment
//! gateways and the hotspot router together.

use std::sync::Arc;

use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::charges::calculate_charge;
use crate::db::Database;
use crate::gateways::{
    CollectionRequest, GatewayError, PaymentGatewayFactory, canonical_name,
};
use crate::mikrotik::{HotspotRouter, RouterOsError};
use crate::phone::parse_phone;
use crate::schema::{Transaction, TransactionStatus, Voucher};
use crate::vouchers::issue_voucher;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Router(#[from] RouterOsError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct PurchaseRequest {
    pub phone: String,
    pub package_id: i64,
    #[serde(default)]
    pub router_id: Option<i64>,
    #[serde(default)]
    pub gateway: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PurchaseReceipt {
    pub reference: String,
    pub status: TransactionStatus,
    pub amount: i64,
    pub charge: i64,
    pub total: i64,
    pub gateway: String,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub reference: String,
    pub status: TransactionStatus,
    pub voucher_code: Option<String>,
    pub expires_at: Option<NaiveDateTime>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct RefreshSummary {
    pub checked: usize,
    pub completed: usize,
    pub failed: usize,
    pub expired: u64,
}

pub struct PaymentService {
    db: Database,
    gateways: PaymentGatewayFactory,
    router: Arc<dyn HotspotRouter>,
    pending_timeout: chrono::Duration,
}

impl PaymentService {
    pub fn new(
        db: Database,
        gateways: PaymentGatewayFactory,
        router: Arc<dyn HotspotRouter>,
        pending_timeout: chrono::Duration,
    ) -> Self {
        PaymentService {
            db,
            gateways,
            router,
            pending_timeout,
        }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn gateways(&self) -> &PaymentGatewayFactory {
        &self.gateways
    }

    pub fn router(&self) -> &dyn HotspotRouter {
        self.router.as_ref()
    }

    /// Records a pending transaction and asks the chosen gateway to debit
    /// the customer for the package price plus the network charge.
    pub async fn initiate_purchase(
        &self,
        request: &PurchaseRequest,
    ) -> Result<PurchaseReceipt, PaymentError> {
        let (phone, network) =
            parse_phone(&request.phone).map_err(|e| PaymentError::Validation(e.to_string()))?;

        let package = self
            .db
            .get_package(request.package_id)
            .await?
            .ok_or_else(|| {
                PaymentError::NotFound(format!("Package {} not found", request.package_id))
            })?;
        if !package.is_active {
            return Err(PaymentError::Validation(format!(
                "Package `{}` is not available",
                package.name
            )));
        }

        if let Some(router_id) = request.router_id {
            let router = self.db.get_router(router_id).await?.ok_or_else(|| {
                PaymentError::NotFound(format!("Router {} not found", router_id))
            })?;
            if !router.is_active {
                return Err(PaymentError::Validation(format!(
                    "Router `{}` is disabled",
                    router.name
                )));
            }
        }

        let gateway = self
            .gateways
            .make(request.gateway.as_deref())
            .await
            .map_err(|e| match e {
                GatewayError::UnknownGateway(_) => PaymentError::Validation(e.to_string()),
                other => PaymentError::Gateway(other),
            })?;

        let charge = calculate_charge(&self.db, network, package.price).await?;
        let mut transaction = Transaction::new(
            phone,
            network,
            package.price,
            charge,
            gateway.name(),
            package.id,
            request.router_id,
        );
        transaction.id = self.db.save_transaction(&transaction).await?;
        log::info!(
            "Purchase {} started: {} UGX + {} charge from {} via {}",
            transaction.reference,
            transaction.amount,
            transaction.charge,
            transaction.phone,
            transaction.gateway
        );

        let collection =
            CollectionRequest::for_transaction(&transaction, format!("WiFi voucher: {}", package.name));
        match gateway.collect(&collection).await {
            Ok(response) => {
                let error_message = match response.status {
                    TransactionStatus::Failed
                    | TransactionStatus::Cancelled
                    | TransactionStatus::Expired => response.message.as_deref(),
                    _ => None,
                };
                self.db
                    .update_transaction_status(
                        transaction.id,
                        response.status,
                        response.external_ref.as_deref(),
                        Some(&response.raw_payload),
                        error_message,
                    )
                    .await?;
                transaction.status = response.status;
                transaction.external_ref = response.external_ref.clone();

                if transaction.status == TransactionStatus::Completed {
                    self.finalize(&transaction).await?;
                }

                Ok(PurchaseReceipt {
                    reference: transaction.reference.clone(),
                    status: transaction.status,
                    amount: transaction.amount,
                    charge: transaction.charge,
                    total: transaction.total(),
                    gateway: transaction.gateway.clone(),
                    message: response.message,
                })
            }
            Err(e) => {
                log::error!(
                    "Gateway {} rejected purchase {}: {}",
                    transaction.gateway,
                    transaction.reference,
                    e
                );
                self.db
                    .update_transaction_status(
                        transaction.id,
                        TransactionStatus::Failed,
                        None,
                        None,
                        Some(&e.to_string()),
                    )
                    .await?;
                Err(PaymentError::Gateway(e))
            }
        }
    }

    /// Polls the owning gateway for a non-terminal transaction and persists
    /// the outcome. Gateway errors are logged and leave the row untouched.
    pub async fn refresh_transaction(
        &self,
        mut transaction: Transaction,
    ) -> Result<Transaction, PaymentError> {
        if transaction.status.is_terminal() {
            if transaction.status == TransactionStatus::Completed {
                self.finalize(&transaction).await?;
            }
            return Ok(transaction);
        }

        let gateway = self.gateways.by_name(&transaction.gateway)?;
        let response = match gateway.check_status(&transaction).await {
            Ok(response) => response,
            Err(e) => {
                log::warn!(
                    "Status check for {} via {} failed: {}",
                    transaction.reference,
                    transaction.gateway,
                    e
                );
                return Ok(transaction);
            }
        };

        if response.status != transaction.status {
            log::info!(
                "Transaction {} moved {} -> {}",
                transaction.reference,
                transaction.status,
                response.status
            );
        }
        let error_message = if response.status.is_terminal()
            && response.status != TransactionStatus::Completed
        {
            response.message.clone()
        } else {
            None
        };
        self.db
            .update_transaction_status(
                transaction.id,
                response.status,
                response.external_ref.as_deref(),
                Some(&response.raw_payload),
                error_message.as_deref(),
            )
            .await?;
        transaction.status = response.status;
        transaction.error_message = error_message;
        if response.external_ref.is_some() {
            transaction.external_ref = response.external_ref;
        }

        if transaction.status == TransactionStatus::Completed {
            self.finalize(&transaction).await?;
        }
        Ok(transaction)
    }

    /// Issues the voucher for a paid transaction and pushes it to the router.
    async fn finalize(&self, transaction: &Transaction) -> Result<Voucher, PaymentError> {
        let mut voucher = issue_voucher(&self.db, transaction).await?;
        if !voucher.router_synced && voucher.router_id.is_some() {
            voucher.router_synced = self.sync_voucher(&voucher).await?;
        }
        Ok(voucher)
    }

    /// Creates the hotspot user for `voucher`. Router failures are logged and
    /// reported as `false` so the next status-check run retries.
    pub async fn sync_voucher(&self, voucher: &Voucher) -> Result<bool, PaymentError> {
        let Some(router_id) = voucher.router_id else {
            return Ok(false);
        };
        if voucher.deleted_at.is_some() || voucher.is_expired(Utc::now().naive_utc()) {
            log::debug!("Voucher {} has expired, not pushing it to a router", voucher.code);
            return Ok(false);
        }
        let Some(router) = self.db.get_router(router_id).await? else {
            log::warn!(
                "Voucher {} points at missing router {}",
                voucher.code,
                router_id
            );
            return Ok(false);
        };
        let package = self
            .db
            .get_package(voucher.package_id)
            .await?
            .ok_or_else(|| PaymentError::NotFound(format!("Package {} not found", voucher.package_id)))?;

        match self.router.create_hotspot_user(&router, voucher, &package).await {
            Ok(()) => {}
            Err(RouterOsError::Trap(message)) if message.contains("already have user") => {
                log::info!("Hotspot user {} already present on {}", voucher.code, router.name);
            }
            Err(e) => {
                log::error!(
                    "Voucher {} not pushed to router {}: {}",
                    voucher.code,
                    router.name,
                    e
                );
                return Ok(false);
            }
        }
        self.db.mark_voucher_synced(voucher.id).await?;
        Ok(true)
    }

    pub async fn status_report(&self, reference: &str) -> Result<StatusReport, PaymentError> {
        let transaction = self
            .db
            .get_transaction_by_reference(reference)
            .await?
            .ok_or_else(|| PaymentError::NotFound(format!("Transaction {} not found", reference)))?;
        self.report_for(transaction).await
    }

    async fn report_for(&self, transaction: Transaction) -> Result<StatusReport, PaymentError> {
        let transaction = self.refresh_transaction(transaction).await?;
        let voucher = if transaction.status == TransactionStatus::Completed {
            self.db.get_voucher_by_transaction(transaction.id).await?
        } else {
            None
        };
        Ok(StatusReport {
            reference: transaction.reference,
            status: transaction.status,
            voucher_code: voucher.as_ref().map(|v| v.code.clone()),
            expires_at: voucher.as_ref().map(|v| v.expires_at),
            message: transaction.error_message,
        })
    }

    /// Gateway notification: re-checks the referenced transaction with the
    /// gateway instead of trusting the callback body.
    pub async fn handle_callback(
        &self,
        gateway: &str,
        reference: &str,
    ) -> Result<StatusReport, PaymentError> {
        let gateway = canonical_name(gateway)
            .ok_or_else(|| PaymentError::Validation(format!("Unknown gateway `{}`", gateway)))?;
        let transaction = self
            .db
            .get_transaction_by_reference(reference)
            .await?
            .ok_or_else(|| PaymentError::NotFound(format!("Transaction {} not found", reference)))?;
        if transaction.gateway != gateway {
            return Err(PaymentError::Validation(format!(
                "Transaction {} does not belong to {}",
                reference, gateway
            )));
        }
        self.report_for(transaction).await
    }

    /// One status-check pass: expire stale rows, then poll the rest.
    pub async fn refresh_open_transactions(&self) -> anyhow::Result<RefreshSummary> {
        let cutoff = Utc::now().naive_utc() - self.pending_timeout;
        let mut summary = RefreshSummary {
            expired: self.db.expire_stale_transactions(cutoff).await?,
            ..Default::default()
        };
        if summary.expired > 0 {
            log::info!("Expired {} stale transactions", summary.expired);
        }

        for transaction in self.db.get_open_transactions().await? {
            summary.checked += 1;
            let reference = transaction.reference.clone();
            match self.refresh_transaction(transaction).await {
                Ok(tx) if tx.status == TransactionStatus::Completed => summary.completed += 1,
                Ok(tx) if tx.status.is_terminal() => summary.failed += 1,
                Ok(_) => {}
                Err(e) => log::error!("Failed to refresh transaction {}: {}", reference, e),
            }
        }
        Ok(summary)
    }

    pub async fn sync_unsynced_vouchers(&self) -> anyhow::Result<usize> {
        let mut synced = 0;
        for voucher in self.db.get_unsynced_vouchers().await? {
            match self.sync_voucher(&voucher).await {
                Ok(true) => synced += 1,
                Ok(false) => {}
                Err(e) => log::error!("Failed to sync voucher {}: {}", voucher.code, e),
            }
        }
        Ok(synced)
    }

    /// Soft-deletes expired vouchers and removes their hotspot users (best effort).
    pub async fn cleanup_expired_vouchers(&self) -> anyhow::Result<usize> {
        let now = Utc::now().naive_utc();
        let expired = self.db.get_expired_vouchers(now).await?;
        for voucher in &expired {
            if let (Some(router_id), true) = (voucher.router_id, voucher.router_synced) {
                match self.db.get_router(router_id).await? {
                    Some(router) => {
                        if let Err(e) = self.router.remove_hotspot_user(&router, &voucher.code).await {
                            log::warn!(
                                "Could not remove hotspot user {} from {}: {}",
                                voucher.code,
                                router.name,
                                e
                            );
                        }
                    }
                    None => log::debug!("Router {} gone, skipping removal", router_id),
                }
            }
            self.db.soft_delete_voucher(voucher.id).await?;
        }
        if !expired.is_empty() {
            log::info!("Soft-deleted {} expired vouchers", expired.len());
        }
        Ok(expired.len())
    }

    pub async fn test_router(&self, router_id: i64) -> Result<String, PaymentError> {
        let router = self
            .db
            .get_router(router_id)
            .await?
            .ok_or_else(|| PaymentError::NotFound(format!("Router {} not found", router_id)))?;
        Ok(self.router.test_connection(&router).await?)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::db::test_utils::seeded_db;
    use crate::mikrotik::fake::{FakeRouter, PASSWORD, USERNAME};
    use crate::gateways::YO_PAYMENTS;
    use crate::schema::{Network, RouterConfiguration, TransactionCharge, VoucherPackage};

    fn router_config(port: u16) -> RouterConfiguration {
        RouterConfiguration {
            id: 0,
            name: "cafe".into(),
            host: "127.0.0.1".into(),
            port: port as i64,
            username: USERNAME.into(),
            password: PASSWORD.into(),
            hotspot_server: None,
            is_active: true,
            created_at: None,
            updated_at: None,
        }
    }

    async fn setup() -> (PaymentService, Arc<ScriptedGateway>, VoucherPackage) {
        let (db, package) = seeded_db().await;
        db.save_charge(&TransactionCharge::new(Network::Mtn, 0, 5_000, 150))
            .await
            .unwrap();
        let gateway = Arc::new(ScriptedGateway::new());
        let service = service_with(db, gateway.clone(), chrono::Duration::minutes(30)).await;
        (service, gateway, package)
    }

    fn purchase(package_id: i64, router_id: Option<i64>) -> PurchaseRequest {
        PurchaseRequest {
            phone: "0772123456".into(),
            package_id,
            router_id,
            gateway: None,
        }
    }

    #[tokio::test]
    async fn purchase_debits_price_plus_charge() {
        let (service, gateway, package) = setup().await;
        let receipt = service
            .initiate_purchase(&purchase(package.id, None))
            .await
            .unwrap();

        assert_eq!(receipt.status, TransactionStatus::Pending);
        assert_eq!(receipt.amount, 1000);
        assert_eq!(receipt.charge, 150);
        assert_eq!(receipt.total, 1150);
        assert_eq!(*gateway.last_amount.lock().unwrap(), Some(1150));

        let tx = service
            .db()
            .get_transaction_by_reference(&receipt.reference)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(tx.phone, "256772123456");
        assert_eq!(tx.network, Network::Mtn);
        assert_eq!(tx.external_ref.as_deref(), Some(format!("EXT-{}", tx.reference).as_str()));
        assert!(tx.raw_payload.is_some());
    }

    #[tokio::test]
    async fn purchase_rejects_bad_phone_and_unknown_package() {
        let (service, _gateway, package) = setup().await;
        let mut bad_phone = purchase(package.id, None);
        bad_phone.phone = "12345".into();
        assert!(matches!(
            service.initiate_purchase(&bad_phone).await,
            Err(PaymentError::Validation(_))
        ));
        assert!(matches!(
            service.initiate_purchase(&purchase(999, None)).await,
            Err(PaymentError::NotFound(_))
        ));
        let mut unknown_gateway = purchase(package.id, None);
        unknown_gateway.gateway = Some("mpesa".into());
        assert!(matches!(
            service.initiate_purchase(&unknown_gateway).await,
            Err(PaymentError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn gateway_error_marks_transaction_failed() {
        let (service, gateway, package) = setup().await;
        *gateway.collect_status.lock().unwrap() = Err("insufficient funds".into());
        let err = service
            .initiate_purchase(&purchase(package.id, None))
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::Gateway(_)));

        let failed = service
            .db()
            .get_transactions(Some(TransactionStatus::Failed))
            .await
            .unwrap();
        assert_eq!(failed.len(), 1);
        assert!(failed[0].error_message.as_deref().unwrap().contains("insufficient funds"));
    }

    #[tokio::test]
    async fn completed_payment_issues_voucher_and_creates_hotspot_user() {
        let (service, gateway, package) = setup().await;
        let (fake, port) = FakeRouter::spawn().await;
        let router_id = service.db().save_router(&router_config(port)).await.unwrap();

        let receipt = service
            .initiate_purchase(&purchase(package.id, Some(router_id)))
            .await
            .unwrap();
        let report = service.status_report(&receipt.reference).await.unwrap();
        assert_eq!(report.status, TransactionStatus::Pending);
        assert!(report.voucher_code.is_none());

        *gateway.check_status.lock().unwrap() = TransactionStatus::Completed;
        let report = service.status_report(&receipt.reference).await.unwrap();
        assert_eq!(report.status, TransactionStatus::Completed);
        let code = report.voucher_code.unwrap();
        assert!(fake.has_user(&code));

        let tx = service
            .db()
            .get_transaction_by_reference(&receipt.reference)
            .await
            .unwrap()
            .unwrap();
        let voucher = service.db().get_voucher_by_transaction(tx.id).await.unwrap().unwrap();
        assert!(voucher.router_synced);

        // asking again neither re-issues nor re-pushes
        let again = service.status_report(&receipt.reference).await.unwrap();
        assert_eq!(again.voucher_code.as_deref(), Some(code.as_str()));
    }

    #[tokio::test]
    async fn unreachable_router_leaves_voucher_unsynced() {
        let (service, gateway, package) = setup().await;
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let dead_port = listener.local_addr().unwrap().port();
        drop(listener);
        let router_id = service.db().save_router(&router_config(dead_port)).await.unwrap();

        *gateway.collect_status.lock().unwrap() = Ok(TransactionStatus::Completed);
        let receipt = service
            .initiate_purchase(&purchase(package.id, Some(router_id)))
            .await
            .unwrap();
        assert_eq!(receipt.status, TransactionStatus::Completed);

        let unsynced = service.db().get_unsynced_vouchers().await.unwrap();
        assert_eq!(unsynced.len(), 1);
        assert_eq!(service.sync_unsynced_vouchers().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn refresh_pass_counts_outcomes_and_expires_stale() {
        let (db, package) = seeded_db().await;
        let gateway = Arc::new(ScriptedGateway::new());
        // negative timeout: everything already open counts as stale
        let service = service_with(db, gateway.clone(), chrono::Duration::minutes(-1)).await;

        service
            .initiate_purchase(&purchase(package.id, None))
            .await
            .unwrap();
        let summary = service.refresh_open_transactions().await.unwrap();
        assert_eq!(summary.expired, 1);
        assert_eq!(summary.checked, 0);

        let (db, package) = seeded_db().await;
        let gateway = Arc::new(ScriptedGateway::new());
        let service = service_with(db, gateway.clone(), chrono::Duration::minutes(30)).await;
        service
            .initiate_purchase(&purchase(package.id, None))
            .await
            .unwrap();
        *gateway.check_status.lock().unwrap() = TransactionStatus::Failed;
        let summary = service.refresh_open_transactions().await.unwrap();
        assert_eq!(
            summary,
            RefreshSummary {
                checked: 1,
                completed: 0,
                failed: 1,
                expired: 0
            }
        );
        let failed = service
            .db()
            .get_transactions(Some(TransactionStatus::Failed))
            .await
            .unwrap();
        assert_eq!(failed[0].error_message.as_deref(), Some("Declined"));
    }

    #[tokio::test]
    async fn callback_checks_gateway_ownership() {
        let (service, gateway, package) = setup().await;
        let receipt = service
            .initiate_purchase(&purchase(package.id, None))
            .await
            .unwrap();
        assert!(matches!(
            service.handle_callback("cinemaug", &receipt.reference).await,
            Err(PaymentError::Validation(_))
        ));

        *gateway.check_status.lock().unwrap() = TransactionStatus::Completed;
        let report = service
            .handle_callback("yo", &receipt.reference)
            .await
            .unwrap();
        assert_eq!(report.status, TransactionStatus::Completed);
        assert!(report.voucher_code.is_some());
    }

    #[tokio::test]
    async fn cleanup_soft_deletes_and_removes_hotspot_user() {
        let (service, _gateway, package) = setup().await;
        let (fake, port) = FakeRouter::spawn().await;
        let router_id = service.db().save_router(&router_config(port)).await.unwrap();

        let past = Utc::now().naive_utc() - chrono::Duration::hours(1);
        let mut voucher = Voucher::new("PAST2345".into(), package.id, Some(router_id), None, past);
        voucher.id = service.db().save_voucher(&voucher).await.unwrap().id().unwrap();
        // pushed while it was still valid
        let router = service.db().get_router(router_id).await.unwrap().unwrap();
        service
            .router()
            .create_hotspot_user(&router, &voucher, &package)
            .await
            .unwrap();
        service.db().mark_voucher_synced(voucher.id).await.unwrap();
        assert!(fake.has_user("PAST2345"));

        assert_eq!(service.cleanup_expired_vouchers().await.unwrap(), 1);
        assert!(!fake.has_user("PAST2345"));
        assert!(service.db().get_vouchers(false).await.unwrap().is_empty());
        assert_eq!(service.db().get_vouchers(true).await.unwrap().len(), 1);

        // second pass finds nothing left
        assert_eq!(service.cleanup_expired_vouchers().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn expired_voucher_is_not_pushed_again_after_cleanup() {
        let (service, _gateway, package) = setup().await;
        let (fake, port) = FakeRouter::spawn().await;
        let router_id = service.db().save_router(&router_config(port)).await.unwrap();

        let mut tx = Transaction::new(
            "256772123456".into(),
            Network::Mtn,
            package.price,
            0,
            YO_PAYMENTS,
            package.id,
            Some(router_id),
        );
        tx.id = service.db().save_transaction(&tx).await.unwrap();
        service
            .db()
            .update_transaction_status(tx.id, TransactionStatus::Completed, None, None, None)
            .await
            .unwrap();
        let past = Utc::now().naive_utc() - chrono::Duration::hours(1);
        let voucher = Voucher::new("LATE2345".into(), package.id, Some(router_id), Some(tx.id), past);
        service.db().save_voucher(&voucher).await.unwrap();

        assert_eq!(service.sync_unsynced_vouchers().await.unwrap(), 0);
        assert_eq!(service.cleanup_expired_vouchers().await.unwrap(), 1);

        let report = service.status_report(&tx.reference).await.unwrap();
        assert_eq!(report.status, TransactionStatus::Completed);
        assert!(!fake.has_user("LATE2345"));
        assert!(fake.users.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn existing_hotspot_user_counts_as_synced() {
        let (service, _gateway, package) = setup().await;
        let (fake, port) = FakeRouter::spawn().await;
        let router_id = service.db().save_router(&router_config(port)).await.unwrap();

        let future = Utc::now().naive_utc() + chrono::Duration::hours(24);
        let mut voucher = Voucher::new("DUPE2345".into(), package.id, Some(router_id), None, future);
        voucher.id = service.db().save_voucher(&voucher).await.unwrap().id().unwrap();
        let router = service.db().get_router(router_id).await.unwrap().unwrap();
        service
            .router()
            .create_hotspot_user(&router, &voucher, &package)
            .await
            .unwrap();

        // the router answers the second add with an "already have user" trap
        assert!(service.sync_voucher(&voucher).await.unwrap());
        assert!(fake.has_user("DUPE2345"));
        assert!(service.db().get_unsynced_vouchers().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_router_reports_identity() {
        let (service, _gateway, _package) = setup().await;
        let (_fake, port) = FakeRouter::spawn().await;
        let router_id = service.db().save_router(&router_config(port)).await.unwrap();
        assert_eq!(service.test_router(router_id).await.unwrap(), "FakeRouter");
        assert!(matches!(
            service.test_router(router_id + 100).await,
            Err(PaymentError::NotFound(_))
        ));
    }
}
