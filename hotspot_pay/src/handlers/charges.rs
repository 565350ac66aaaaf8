use actix_web::{Error, HttpResponse, delete, get, http::StatusCode, post, put, web};
use common::charges::{calculate_charge, validate_charge};
use common::{TransactionCharge, parse_phone};
use serde::Deserialize;

use super::{internal_error, json_error};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct ChargeQuery {
    phone: String,
    amount: i64,
}

/// Fee preview shown before the customer confirms a purchase.
#[get("/api/charges/calculate")]
pub async fn calculate_transaction_charge(
    query: web::Query<ChargeQuery>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let (phone, network) = parse_phone(&query.phone)
        .map_err(|e| json_error(e.to_string(), StatusCode::UNPROCESSABLE_ENTITY))?;
    if query.amount <= 0 {
        return Err(json_error(
            "Amount must be positive",
            StatusCode::UNPROCESSABLE_ENTITY,
        ));
    }

    let charge = calculate_charge(app_state.payments.db(), network, query.amount)
        .await
        .map_err(|e| internal_error("Failed to calculate charge", e))?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "phone": phone,
        "network": network,
        "amount": query.amount,
        "charge": charge,
        "total": query.amount + charge,
    })))
}

#[get("/api/charges")]
pub async fn get_charges(app_state: web::Data<AppState>) -> Result<HttpResponse, Error> {
    let charges = app_state
        .payments
        .db()
        .get_charges()
        .await
        .map_err(|e| internal_error("Failed to get charges", e))?;

    Ok(HttpResponse::Ok().json(charges))
}

#[post("/api/charges")]
pub async fn create_charge(
    charge: web::Json<TransactionCharge>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let mut charge = charge.into_inner();
    let db = app_state.payments.db();
    validate_charge(db, &charge, None).await.map_err(|e| {
        log::warn!("Rejected charge range: {:#}", e);
        json_error(e.to_string(), StatusCode::UNPROCESSABLE_ENTITY)
    })?;

    charge.id = db
        .save_charge(&charge)
        .await
        .map_err(|e| internal_error("Failed to save charge", e))?;

    Ok(HttpResponse::Created().json(charge))
}

#[put("/api/charges/{charge_id}")]
pub async fn update_charge(
    path: web::Path<i64>,
    charge: web::Json<TransactionCharge>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let charge_id = path.into_inner();
    let mut charge = charge.into_inner();
    let db = app_state.payments.db();
    validate_charge(db, &charge, Some(charge_id))
        .await
        .map_err(|e| {
            log::warn!("Rejected charge range: {:#}", e);
            json_error(e.to_string(), StatusCode::UNPROCESSABLE_ENTITY)
        })?;

    let updated = db
        .update_charge(charge_id, &charge)
        .await
        .map_err(|e| internal_error("Failed to update charge", e))?;
    if !updated {
        return Err(json_error(
            format!("Charge {} not found", charge_id),
            StatusCode::NOT_FOUND,
        ));
    }

    charge.id = charge_id;
    Ok(HttpResponse::Ok().json(charge))
}

#[delete("/api/charges/{charge_id}")]
pub async fn delete_charge(
    path: web::Path<i64>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let charge_id = path.into_inner();

    let deleted = app_state
        .payments
        .db()
        .delete_charge(charge_id)
        .await
        .map_err(|e| internal_error("Failed to delete charge", e))?;
    if !deleted {
        return Err(json_error(
            format!("Charge {} not found", charge_id),
            StatusCode::NOT_FOUND,
        ));
    }

    Ok(HttpResponse::NoContent().finish())
}
