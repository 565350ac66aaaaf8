use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::{
    CollectionRequest, GatewayError, GatewayResponse, PaymentGateway, YO_PAYMENTS,
};
use crate::schema::{Transaction, TransactionStatus};

pub const DEFAULT_YO_API_URL: &str = "https://paymentsapi1.yo.co.ug/ybs/task.php";

#[derive(Debug, Clone)]
pub struct YoPaymentsConfig {
    pub api_url: String,
    pub username: String,
    pub password: String,
}

/// YoPayments business API: XML documents POSTed to a single endpoint.
pub struct YoPaymentsGateway {
    client: Client,
    config: YoPaymentsConfig,
}

impl YoPaymentsGateway {
    pub fn new(config: YoPaymentsConfig, timeout: Duration) -> Result<Self, GatewayError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(YoPaymentsGateway { client, config })
    }

    fn envelope(&self, method: &str, fields: &[(&str, String)]) -> String {
        let mut body = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<AutoCreate>\n<Request>\n");
        let credentials = [
            ("APIUsername", self.config.username.clone()),
            ("APIPassword", self.config.password.clone()),
            ("Method", method.to_string()),
        ];
        for (tag, value) in credentials.iter().chain(fields.iter()) {
            body.push_str(&format!("<{tag}>{}</{tag}>\n", xml_escape(value)));
        }
        body.push_str("</Request>\n</AutoCreate>");
        body
    }

    async fn post(&self, body: String) -> Result<GatewayResponse, GatewayError> {
        let response = self
            .client
            .post(&self.config.api_url)
            .header("Content-Type", "text/xml")
            .header("Content-transfer-encoding", "text")
            .body(body)
            .send()
            .await?;
        let http_status = response.status();
        let raw = response.text().await?;
        if !http_status.is_success() {
            return Err(GatewayError::Api(format!("HTTP {http_status}: {raw}")));
        }
        parse_yo_response(&raw)
    }
}

#[async_trait]
impl PaymentGateway for YoPaymentsGateway {
    fn name(&self) -> &'static str {
        YO_PAYMENTS
    }

    async fn collect(&self, request: &CollectionRequest) -> Result<GatewayResponse, GatewayError> {
        let body = self.envelope(
            "acdepositfunds",
            &[
                ("NonBlocking", "TRUE".to_string()),
                ("Amount", request.amount.to_string()),
                ("Account", request.phone.clone()),
                ("Narrative", request.narrative.clone()),
                ("ExternalReference", request.reference.clone()),
            ],
        );
        log::debug!("YoPayments deposit request for {}", request.reference);
        self.post(body).await
    }

    async fn check_status(
        &self,
        transaction: &Transaction,
    ) -> Result<GatewayResponse, GatewayError> {
        let field = match &transaction.external_ref {
            Some(external) => ("TransactionReference", external.clone()),
            None => ("PrivateTransactionReference", transaction.reference.clone()),
        };
        let body = self.envelope("actransactioncheckstatus", &[field]);
        self.post(body).await
    }
}

/// `Status` is the API-level verdict; `TransactionStatus` the payment's.
pub fn map_yo_status(status: &str, transaction_status: Option<&str>) -> TransactionStatus {
    if status.eq_ignore_ascii_case("ERROR") {
        return TransactionStatus::Failed;
    }
    match transaction_status.map(|s| s.trim().to_ascii_uppercase()).as_deref() {
        Some("SUCCEEDED") => TransactionStatus::Completed,
        Some("PENDING") => TransactionStatus::Pending,
        Some("INDETERMINATE") => TransactionStatus::Processing,
        Some("FAILED") => TransactionStatus::Failed,
        Some(other) => {
            log::warn!("Unknown YoPayments transaction status `{}`", other);
            TransactionStatus::Pending
        }
        // non-blocking deposit accepted (StatusCode 1)
        None => TransactionStatus::Pending,
    }
}

fn parse_yo_response(raw: &str) -> Result<GatewayResponse, GatewayError> {
    let status = xml_tag(raw, "Status")
        .ok_or_else(|| GatewayError::Parse(format!("no <Status> in `{raw}`")))?;
    let transaction_status = xml_tag(raw, "TransactionStatus");
    let mapped = map_yo_status(&status, transaction_status.as_deref());

    let message = xml_tag(raw, "ErrorMessage")
        .or_else(|| xml_tag(raw, "StatusMessage"))
        .filter(|m| !m.is_empty());
    if status.eq_ignore_ascii_case("ERROR") {
        log::warn!(
            "YoPayments error (code {}): {}",
            xml_tag(raw, "StatusCode").unwrap_or_default(),
            message.as_deref().unwrap_or("no message")
        );
    }

    Ok(GatewayResponse {
        status: mapped,
        external_ref: xml_tag(raw, "TransactionReference").filter(|r| !r.is_empty()),
        message,
        raw_payload: raw.to_string(),
    })
}

/// Text of the first `<tag>...</tag>`; Yo responses are flat.
fn xml_tag(xml: &str, tag: &str) -> Option<String> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = xml.find(&open)? + open.len();
    let end = start + xml[start..].find(&close)?;
    Some(xml_unescape(xml[start..end].trim()))
}

fn xml_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn xml_unescape(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
