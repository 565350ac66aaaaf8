use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use common::VoucherPackage;
use common::payments::PaymentService;

pub struct AppState {
    pub payments: PaymentService,
    pub status_check_lock: JobLock,
    pub cleanup_lock: JobLock,
}

impl AppState {
    pub fn new(payments: PaymentService) -> Self {
        AppState {
            payments,
            status_check_lock: JobLock::default(),
            cleanup_lock: JobLock::default(),
        }
    }

    /// Seeds packages from YAML when the table is still empty.
    pub async fn initialize_packages_from_file(&self, packages_yaml: &str) -> Result<usize> {
        let db = self.payments.db();
        if !db.get_packages(false).await?.is_empty() {
            log::info!("Packages already present, skipping `{}`", packages_yaml);
            return Ok(0);
        }

        let packages = VoucherPackage::from_yaml_file(packages_yaml)
            .await
            .with_context(|| format!("Failed to load packages from `{}`", packages_yaml))?;
        for package in &packages {
            db.save_package(package)
                .await
                .with_context(|| format!("Failed to save package `{}`", package.name))?;
        }
        Ok(packages.len())
    }
}

/// Keeps two runs of the same scheduled job from overlapping.
#[derive(Default)]
pub struct JobLock {
    running: AtomicBool,
}

pub struct JobGuard<'a> {
    lock: &'a JobLock,
}

impl JobLock {
    /// `None` while another run holds the lock.
    pub fn try_acquire(&self) -> Option<JobGuard<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| JobGuard { lock: self })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

impl Drop for JobGuard<'_> {
    fn drop(&mut self) {
        self.lock.running.store(false, Ordering::Release);
    }
}
