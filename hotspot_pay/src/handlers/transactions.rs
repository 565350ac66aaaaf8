use actix_web::{Either, Error, HttpResponse, get, http::StatusCode, post, web};
use common::TransactionStatus;
use serde::Deserialize;

use super::{internal_error, json_error, payment_error};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct TransactionQuery {
    #[serde(default)]
    status: Option<String>,
}

#[get("/api/transactions")]
pub async fn get_transactions(
    query: web::Query<TransactionQuery>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let status = match query.status.as_deref() {
        Some(raw) => Some(raw.parse::<TransactionStatus>().map_err(|_| {
            json_error(
                format!(
                    "Transaction status must be one of: {}.",
                    TransactionStatus::ALL
                        .iter()
                        .map(|s| s.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
                StatusCode::BAD_REQUEST,
            )
        })?),
        None => None,
    };

    let transactions = app_state
        .payments
        .db()
        .get_transactions(status)
        .await
        .map_err(|e| internal_error("Failed to get transactions", e))?;

    Ok(HttpResponse::Ok().json(transactions))
}

/// Gateways name the payment differently; any of these carries our
/// reference or theirs.
#[derive(Debug, Deserialize)]
pub struct CallbackBody {
    #[serde(
        alias = "external_ref",
        alias = "transaction_reference",
        alias = "transactionId",
        alias = "private_transaction_reference"
    )]
    reference: String,
}

#[post("/api/payments/callback/{gateway}")]
pub async fn payment_callback(
    path: web::Path<String>,
    body: Either<web::Json<CallbackBody>, web::Form<CallbackBody>>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let gateway = path.into_inner();
    let reference = match body {
        Either::Left(json) => json.into_inner().reference,
        Either::Right(form) => form.into_inner().reference,
    };
    log::info!("Callback from {} for {}", gateway, reference);

    let report = app_state
        .payments
        .handle_callback(&gateway, &reference)
        .await
        .map_err(payment_error)?;

    Ok(HttpResponse::Ok().json(report))
}
