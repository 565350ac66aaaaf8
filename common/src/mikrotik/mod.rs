//! MikroTik RouterOS API client and the hotspot user operations built on it.

mod client;
mod connection;
mod service;

use std::time::Duration;

use thiserror::Error;

pub use client::{Command, MikroTikClient};
pub use connection::{Sentence, encode_length};
pub use service::{HotspotRouter, MikroTikService};

#[derive(Debug, Error)]
pub enum RouterOsError {
    #[error("Router I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Router did not answer within {0:?}")]
    Timeout(Duration),
    #[error("Router login failed: {0}")]
    Login(String),
    #[error("Router rejected command: {0}")]
    Trap(String),
    #[error("Router closed the session: {0}")]
    Fatal(String),
    #[error("Malformed RouterOS reply: {0}")]
    Protocol(String),
}

/// In-process stand-in for a RouterOS API endpoint.
#[cfg(test)]
pub(crate) mod fake {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use tokio::net::{TcpListener, TcpStream};

    use super::connection::{read_sentence, write_sentence};

    pub(crate) const USERNAME: &str = "api";
    pub(crate) const PASSWORD: &str = "secret";

    /// Hotspot users currently known to the fake router, by name.
    #[derive(Clone, Default)]
    pub(crate) struct FakeRouter {
        pub(crate) users: Arc<Mutex<HashMap<String, HashMap<String, String>>>>,
    }

    impl FakeRouter {
        pub(crate) async fn spawn() -> (Self, u16) {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let port = listener.local_addr().unwrap().port();
            let router = FakeRouter::default();
            let state = router.clone();
            tokio::spawn(async move {
                while let Ok((stream, _)) = listener.accept().await {
                    let state = state.clone();
                    tokio::spawn(async move { state.serve(stream).await });
                }
            });
            (router, port)
        }

        pub(crate) fn has_user(&self, name: &str) -> bool {
            self.users.lock().unwrap().contains_key(name)
        }

        async fn serve(&self, mut stream: TcpStream) {
            while let Ok(words) = read_sentence(&mut stream).await {
                let Some(path) = words.first().cloned() else {
                    continue;
                };
                let attrs: HashMap<String, String> = words
                    .iter()
                    .skip(1)
                    .filter_map(|w| {
                        let rest = w.strip_prefix('=').or_else(|| w.strip_prefix('?'))?;
                        let (k, v) = rest.split_once('=')?;
                        Some((k.to_string(), v.to_string()))
                    })
                    .collect();

                let replies = self.handle(&path, &attrs);
                for reply in replies {
                    if write_sentence(&mut stream, &reply).await.is_err() {
                        return;
                    }
                }
            }
        }

        fn handle(&self, path: &str, attrs: &HashMap<String, String>) -> Vec<Vec<String>> {
            let done = vec![vec!["!done".to_string()]];
            let trap = |message: &str| {
                vec![
                    vec!["!trap".to_string(), format!("=message={message}")],
                    vec!["!done".to_string()],
                ]
            };
            let get = |k: &str| attrs.get(k).cloned().unwrap_or_default();

            match path {
                "/login" => {
                    if get("name") == USERNAME && get("password") == PASSWORD {
                        done
                    } else {
                        trap("invalid user name or password (6)")
                    }
                }
                "/system/identity/print" => vec![
                    vec!["!re".to_string(), "=name=FakeRouter".to_string()],
                    vec!["!done".to_string()],
                ],
                "/ip/hotspot/user/add" => {
                    let name = get("name");
                    let mut users = self.users.lock().unwrap();
                    if users.contains_key(&name) {
                        return trap("failure: already have user with this name for this server");
                    }
                    users.insert(name, attrs.clone());
                    vec![vec!["!done".to_string(), "=ret=*1".to_string()]]
                }
                "/ip/hotspot/user/print" => {
                    let name = get("name");
                    let mut out = Vec::new();
                    if self.users.lock().unwrap().contains_key(&name) {
                        out.push(vec!["!re".to_string(), format!("=.id=*{name}")]);
                    }
                    out.push(vec!["!done".to_string()]);
                    out
                }
                "/ip/hotspot/user/remove" => {
                    let id = get(".id");
                    let name = id.trim_start_matches('*');
                    self.users.lock().unwrap().remove(name);
                    done
                }
                _ => trap("no such command"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fake::{FakeRouter, PASSWORD, USERNAME};
    use super::*;
    use crate::schema::{RouterConfiguration, Voucher, VoucherPackage};

    fn router(port: u16, password: &str) -> RouterConfiguration {
        RouterConfiguration {
            id: 1,
            name: "lobby".into(),
            host: "127.0.0.1".into(),
            port: port as i64,
            username: USERNAME.into(),
            password: password.into(),
            hotspot_server: Some("hotspot1".into()),
            is_active: true,
            created_at: None,
            updated_at: None,
        }
    }

    fn package() -> VoucherPackage {
        VoucherPackage {
            id: 1,
            name: "Hourly".into(),
            price: 500,
            session_timeout_secs: 3_600,
            validity_hours: 24,
            profile: "hourly".into(),
            is_active: true,
            created_at: None,
            updated_at: None,
        }
    }

    fn voucher(code: &str) -> Voucher {
        Voucher::new(
            code.into(),
            1,
            Some(1),
            None,
            chrono::Utc::now().naive_utc(),
        )
    }

    #[tokio::test]
    async fn test_connection_returns_identity() {
        let (_fake, port) = FakeRouter::spawn().await;
        let service = MikroTikService::default();
        let identity = service.test_connection(&router(port, PASSWORD)).await.unwrap();
        assert_eq!(identity, "FakeRouter");
    }

    #[tokio::test]
    async fn bad_credentials_surface_as_login_error() {
        let (_fake, port) = FakeRouter::spawn().await;
        let service = MikroTikService::default();
        let err = service
            .test_connection(&router(port, "wrong"))
            .await
            .unwrap_err();
        assert!(matches!(err, RouterOsError::Login(_)), "{err:?}");
    }

    #[tokio::test]
    async fn creates_user_with_profile_and_uptime() {
        let (fake, port) = FakeRouter::spawn().await;
        let service = MikroTikService::default();
        service
            .create_hotspot_user(&router(port, PASSWORD), &voucher("ABCD2345"), &package())
            .await
            .unwrap();

        let users = fake.users.lock().unwrap();
        let user = users.get("ABCD2345").unwrap();
        assert_eq!(user.get("password").unwrap(), "ABCD2345");
        assert_eq!(user.get("profile").unwrap(), "hourly");
        assert_eq!(user.get("limit-uptime").unwrap(), "1h");
        assert_eq!(user.get("server").unwrap(), "hotspot1");
    }

    #[tokio::test]
    async fn duplicate_user_is_a_trap() {
        let (_fake, port) = FakeRouter::spawn().await;
        let service = MikroTikService::default();
        let r = router(port, PASSWORD);
        service
            .create_hotspot_user(&r, &voucher("ABCD2345"), &package())
            .await
            .unwrap();
        let err = service
            .create_hotspot_user(&r, &voucher("ABCD2345"), &package())
            .await
            .unwrap_err();
        assert!(matches!(err, RouterOsError::Trap(ref m) if m.contains("already have user")));
    }

    #[tokio::test]
    async fn removes_existing_user_only() {
        let (fake, port) = FakeRouter::spawn().await;
        let service = MikroTikService::default();
        let r = router(port, PASSWORD);
        service
            .create_hotspot_user(&r, &voucher("WXYZ6789"), &package())
            .await
            .unwrap();

        assert!(service.remove_hotspot_user(&r, "WXYZ6789").await.unwrap());
        assert!(!fake.has_user("WXYZ6789"));
        assert!(!service.remove_hotspot_user(&r, "WXYZ6789").await.unwrap());
    }

    #[tokio::test]
    async fn unreachable_router_is_an_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let service = MikroTikService::new(std::time::Duration::from_secs(2));
        assert!(service.test_connection(&router(port, PASSWORD)).await.is_err());
    }
}
