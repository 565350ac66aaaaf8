use actix_web::{Error, HttpResponse, get, web};
use chrono::Utc;

use super::internal_error;
use crate::state::AppState;

#[get("/api/dashboard")]
pub async fn dashboard(app_state: web::Data<AppState>) -> Result<HttpResponse, Error> {
    let stats = app_state
        .payments
        .db()
        .dashboard_stats(Utc::now().naive_utc())
        .await
        .map_err(|e| internal_error("Failed to build dashboard", e))?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "stats": stats,
        "gateway_strategy": format!("{:?}", app_state.payments.gateways().strategy()),
        "gateways": app_state.payments.gateways().names(),
        "jobs": {
            "status_check_running": app_state.status_check_lock.is_running(),
            "cleanup_running": app_state.cleanup_lock.is_running(),
        },
    })))
}
