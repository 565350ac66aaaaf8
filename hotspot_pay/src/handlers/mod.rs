mod auth;
mod charges;
mod dashboard;
mod packages;
mod routers;
mod transactions;
mod vouchers;

use actix_web::{
    Error, HttpResponse, Responder, error::InternalError, get, http::StatusCode,
};
use common::gateways::GatewayError;
use common::is_foreign_key_violation;
use common::payments::PaymentError;

pub use auth::*;
pub use charges::*;
pub use dashboard::*;
pub use packages::*;
pub use routers::*;
pub use transactions::*;
pub use vouchers::*;

#[get("/")]
pub async fn index() -> impl Responder {
    HttpResponse::Ok().body("Welcome to Hotspot Pay!")
}

/// Error rendered as `{"error": message}`.
pub(crate) fn json_error(message: impl Into<String>, status: StatusCode) -> Error {
    let message = message.into();
    let body = serde_json::json!({ "error": message });
    InternalError::from_response(message, HttpResponse::build(status).json(body)).into()
}

pub(crate) fn internal_error(context: &str, e: anyhow::Error) -> Error {
    log::error!("{}: {:#}", context, e);
    json_error(
        format!("{}. Please try again later.", context),
        StatusCode::INTERNAL_SERVER_ERROR,
    )
}

/// Delete failures; rows still referenced by transactions or vouchers are a
/// client error, not a server one.
pub(crate) fn delete_error(kind: &str, id: i64, e: anyhow::Error) -> Error {
    if is_foreign_key_violation(&e) {
        log::warn!("Refused to delete {} {}: still referenced", kind, id);
        return json_error(
            format!(
                "{} {} is used by existing transactions or vouchers; deactivate it instead",
                kind, id
            ),
            StatusCode::UNPROCESSABLE_ENTITY,
        );
    }
    internal_error(&format!("Failed to delete {}", kind.to_ascii_lowercase()), e)
}

pub(crate) fn payment_error(e: PaymentError) -> Error {
    match e {
        PaymentError::Validation(message) => {
            log::warn!("Rejected request: {}", message);
            json_error(message, StatusCode::UNPROCESSABLE_ENTITY)
        }
        PaymentError::NotFound(message) => json_error(message, StatusCode::NOT_FOUND),
        PaymentError::Gateway(GatewayError::UnknownGateway(name)) => json_error(
            format!("Unknown payment gateway `{}`", name),
            StatusCode::BAD_REQUEST,
        ),
        PaymentError::Gateway(e) => {
            log::error!("Payment gateway error: {}", e);
            json_error(e.to_string(), StatusCode::BAD_GATEWAY)
        }
        PaymentError::Router(e) => {
            log::error!("Router error: {}", e);
            json_error(e.to_string(), StatusCode::BAD_GATEWAY)
        }
        PaymentError::Internal(e) => internal_error("Internal server error", e),
    }
}
