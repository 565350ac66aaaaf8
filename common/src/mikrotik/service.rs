use std::time::Duration;

use async_trait::async_trait;

use super::client::{Command, MikroTikClient};
use super::RouterOsError;
use crate::schema::{RouterConfiguration, Voucher, VoucherPackage};

/// What the payment flow needs from a hotspot router.
#[async_trait]
pub trait HotspotRouter: Send + Sync {
    async fn create_hotspot_user(
        &self,
        router: &RouterConfiguration,
        voucher: &Voucher,
        package: &VoucherPackage,
    ) -> Result<(), RouterOsError>;

    async fn remove_hotspot_user(
        &self,
        router: &RouterConfiguration,
        code: &str,
    ) -> Result<bool, RouterOsError>;

    async fn test_connection(&self, router: &RouterConfiguration) -> Result<String, RouterOsError>;
}

/// Opens one API session per call; nothing is pooled.
#[derive(Debug, Clone)]
pub struct MikroTikService {
    timeout: Duration,
}

impl MikroTikService {
    pub fn new(timeout: Duration) -> Self {
        MikroTikService { timeout }
    }

    async fn connect(&self, router: &RouterConfiguration) -> Result<MikroTikClient, RouterOsError> {
        MikroTikClient::connect(
            &router.address(),
            &router.username,
            &router.password,
            self.timeout,
        )
        .await
    }
}

impl Default for MikroTikService {
    fn default() -> Self {
        MikroTikService::new(Duration::from_secs(10))
    }
}

#[async_trait]
impl HotspotRouter for MikroTikService {
    async fn create_hotspot_user(
        &self,
        router: &RouterConfiguration,
        voucher: &Voucher,
        package: &VoucherPackage,
    ) -> Result<(), RouterOsError> {
        let mut command = Command::new("/ip/hotspot/user/add")
            .attr("name", &voucher.code)
            .attr("password", &voucher.code)
            .attr("profile", &package.profile)
            .attr("limit-uptime", &package.limit_uptime())
            .attr("comment", &format!("voucher:{} package:{}", voucher.id, package.name));
        if let Some(server) = router.hotspot_server.as_deref().filter(|s| !s.is_empty()) {
            command = command.attr("server", server);
        }

        let result = async {
            let mut client = self.connect(router).await?;
            client.execute(&command).await
        }
        .await;

        match result {
            Ok(_) => {
                log::info!(
                    "Created hotspot user {} on router {} ({})",
                    voucher.code,
                    router.name,
                    router.host
                );
                Ok(())
            }
            Err(e) => {
                log::error!(
                    "Failed to create hotspot user {} on router {} ({}): {}",
                    voucher.code,
                    router.name,
                    router.host,
                    e
                );
                Err(e)
            }
        }
    }

    async fn remove_hotspot_user(
        &self,
        router: &RouterConfiguration,
        code: &str,
    ) -> Result<bool, RouterOsError> {
        let mut client = self.connect(router).await?;
        let rows = client
            .execute(
                &Command::new("/ip/hotspot/user/print")
                    .attr(".proplist", ".id")
                    .query("name", code),
            )
            .await?;

        let Some(id) = rows.iter().find_map(|row| row.get(".id")) else {
            log::debug!("Hotspot user {} not present on {}", code, router.name);
            return Ok(false);
        };
        client
            .execute(&Command::new("/ip/hotspot/user/remove").attr(".id", id))
            .await?;
        log::info!("Removed hotspot user {} from router {}", code, router.name);
        Ok(true)
    }

    async fn test_connection(&self, router: &RouterConfiguration) -> Result<String, RouterOsError> {
        let mut client = self.connect(router).await?;
        let rows = client
            .execute(&Command::new("/system/identity/print"))
            .await?;
        let identity = rows
            .iter()
            .find_map(|row| row.get("name"))
            .unwrap_or("unknown")
            .to_string();
        log::info!(
            "Router {} ({}) reachable, identity `{}`",
            router.name,
            router.address(),
            identity
        );
        Ok(identity)
    }
}
