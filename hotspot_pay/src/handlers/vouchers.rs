use actix_web::{Error, HttpResponse, get, post, web};
use common::payments::PurchaseRequest;
use serde::Deserialize;

use super::{internal_error, payment_error};
use crate::state::AppState;

#[post("/api/vouchers/purchase")]
pub async fn purchase_voucher(
    request: web::Json<PurchaseRequest>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let receipt = app_state
        .payments
        .initiate_purchase(&request)
        .await
        .map_err(payment_error)?;

    Ok(HttpResponse::Created().json(receipt))
}

#[get("/api/vouchers/status/{reference}")]
pub async fn voucher_status(
    path: web::Path<String>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let report = app_state
        .payments
        .status_report(&path.into_inner())
        .await
        .map_err(payment_error)?;

    Ok(HttpResponse::Ok().json(report))
}

#[derive(Debug, Deserialize)]
struct VoucherQuery {
    #[serde(default)]
    include_deleted: bool,
}

#[get("/api/vouchers")]
pub async fn get_vouchers(
    query: web::Query<VoucherQuery>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let vouchers = app_state
        .payments
        .db()
        .get_vouchers(query.include_deleted)
        .await
        .map_err(|e| internal_error("Failed to get vouchers", e))?;

    Ok(HttpResponse::Ok().json(vouchers))
}
