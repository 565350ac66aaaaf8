use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::{CINEMAUG, CollectionRequest, GatewayError, GatewayResponse, PaymentGateway};
use crate::schema::{Transaction, TransactionStatus};

#[derive(Debug, Clone)]
pub struct CinemaUgConfig {
    pub api_url: String,
    pub api_key: String,
}

/// CinemaUG collections API: JSON over HTTPS with a bearer key.
pub struct CinemaUgGateway {
    client: Client,
    config: CinemaUgConfig,
}

#[derive(Debug, Deserialize)]
struct CinemaUgReply {
    status: String,
    #[serde(default, alias = "transactionId", alias = "transaction_reference")]
    transaction_id: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl CinemaUgGateway {
    pub fn new(config: CinemaUgConfig, timeout: Duration) -> Result<Self, GatewayError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(CinemaUgGateway { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_url.trim_end_matches('/'), path)
    }

    async fn read(response: reqwest::Response) -> Result<GatewayResponse, GatewayError> {
        let http_status = response.status();
        let raw = response.text().await?;
        if !http_status.is_success() {
            return Err(GatewayError::Api(format!("HTTP {http_status}: {raw}")));
        }
        parse_cinemaug_response(&raw)
    }
}

#[async_trait]
impl PaymentGateway for CinemaUgGateway {
    fn name(&self) -> &'static str {
        CINEMAUG
    }

    async fn collect(&self, request: &CollectionRequest) -> Result<GatewayResponse, GatewayError> {
        log::debug!("CinemaUG collection request for {}", request.reference);
        let response = self
            .client
            .post(self.url("collections"))
            .bearer_auth(&self.config.api_key)
            .json(request)
            .send()
            .await?;
        Self::read(response).await
    }

    async fn check_status(
        &self,
        transaction: &Transaction,
    ) -> Result<GatewayResponse, GatewayError> {
        let response = self
            .client
            .get(self.url(&format!("collections/{}", transaction.reference)))
            .bearer_auth(&self.config.api_key)
            .send()
            .await?;
        Self::read(response).await
    }
}

pub fn map_cinemaug_status(status: &str) -> TransactionStatus {
    match status.trim().to_ascii_uppercase().as_str() {
        "SUCCESSFUL" | "SUCCESS" | "COMPLETED" => TransactionStatus::Completed,
        "PENDING" | "INITIATED" | "QUEUED" => TransactionStatus::Pending,
        "PROCESSING" => TransactionStatus::Processing,
        "FAILED" | "DECLINED" | "REJECTED" => TransactionStatus::Failed,
        "CANCELLED" | "CANCELED" => TransactionStatus::Cancelled,
        "EXPIRED" | "TIMEOUT" => TransactionStatus::Expired,
        other => {
            log::warn!("Unknown CinemaUG status `{}`", other);
            TransactionStatus::Pending
        }
    }
}

fn parse_cinemaug_response(raw: &str) -> Result<GatewayResponse, GatewayError> {
    let reply: CinemaUgReply =
        serde_json::from_str(raw).map_err(|e| GatewayError::Parse(format!("{e}: `{raw}`")))?;
    Ok(GatewayResponse {
        status: map_cinemaug_status(&reply.status),
        external_ref: reply.transaction_id,
        message: reply.message,
        raw_payload: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_every_documented_status() {
        let cases = [
            ("SUCCESSFUL", TransactionStatus::Completed),
            ("success", TransactionStatus::Completed),
            ("Pending", TransactionStatus::Pending),
            ("INITIATED", TransactionStatus::Pending),
            ("PROCESSING", TransactionStatus::Processing),
            ("DECLINED", TransactionStatus::Failed),
            ("FAILED", TransactionStatus::Failed),
            ("CANCELED", TransactionStatus::Cancelled),
            ("TIMEOUT", TransactionStatus::Expired),
            ("something-new", TransactionStatus::Pending),
        ];
        for (raw, expected) in cases {
            assert_eq!(map_cinemaug_status(raw), expected, "{raw}");
        }
    }

    #[test]
    fn parses_reply_with_camel_case_id() {
        let raw = r#"{"status":"SUCCESSFUL","transactionId":"CUG-9","message":"Paid"}"#;
        let response = parse_cinemaug_response(raw).unwrap();
        assert_eq!(response.status, TransactionStatus::Completed);
        assert_eq!(response.external_ref.as_deref(), Some("CUG-9"));
        assert_eq!(response.message.as_deref(), Some("Paid"));
    }

    #[test]
    fn invalid_json_is_a_parse_error() {
        assert!(matches!(
            parse_cinemaug_response("not json"),
            Err(GatewayError::Parse(_))
        ));
    }

    use crate::gateways::stub::StubServer;
    use crate::schema::Network;

    fn gateway(base_url: &str) -> CinemaUgGateway {
        CinemaUgGateway::new(
            CinemaUgConfig {
                api_url: format!("{base_url}/v1/"),
                api_key: "key-123".into(),
            },
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn transaction() -> Transaction {
        Transaction::new(
            "256702123456".into(),
            Network::Airtel,
            2000,
            100,
            CINEMAUG,
            1,
            None,
        )
    }

    #[tokio::test]
    async fn collection_posts_json_with_bearer_key() {
        let (server, url) =
            StubServer::spawn(200, r#"{"status":"PENDING","transactionId":"CUG-1"}"#).await;
        let tx = transaction();
        let request = CollectionRequest::for_transaction(&tx, "WiFi voucher: Weekly".into());

        let response = gateway(&url).collect(&request).await.unwrap();
        assert_eq!(response.status, TransactionStatus::Pending);
        assert_eq!(response.external_ref.as_deref(), Some("CUG-1"));

        let sent = &server.requests()[0];
        assert!(sent.starts_with("post /v1/collections "));
        assert!(sent.contains("authorization: bearer key-123"));
        let body: serde_json::Value =
            serde_json::from_str(&sent[sent.find("\r\n\r\n").unwrap() + 4..]).unwrap();
        assert_eq!(body["amount"], 2100);
        assert_eq!(body["phone"], "256702123456");
        assert_eq!(body["network"], "airtel");
        assert_eq!(body["reference"], tx.reference.as_str());
    }

    #[tokio::test]
    async fn status_check_gets_collection_by_reference() {
        let (server, url) = StubServer::spawn(
            200,
            r#"{"status":"SUCCESSFUL","transaction_reference":"CUG-1"}"#,
        )
        .await;
        let tx = transaction();

        let response = gateway(&url).check_status(&tx).await.unwrap();
        assert_eq!(response.status, TransactionStatus::Completed);

        let sent = &server.requests()[0];
        let expected = format!("get /v1/collections/{} ", tx.reference.to_ascii_lowercase());
        assert!(sent.starts_with(&expected), "{sent}");
        assert!(sent.contains("authorization: bearer key-123"));
    }

    #[tokio::test]
    async fn rejected_key_is_an_api_error() {
        let (_server, url) = StubServer::spawn(401, r#"{"message":"bad key"}"#).await;
        let err = gateway(&url).check_status(&transaction()).await.unwrap_err();
        assert!(matches!(err, GatewayError::Api(ref m) if m.contains("401")));
    }
}
