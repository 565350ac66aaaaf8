use actix_web::{Error, HttpResponse, delete, get, http::StatusCode, post, put, web};
use common::RouterConfiguration;

use super::{delete_error, internal_error, json_error, payment_error};
use crate::state::AppState;

fn router_not_found(router_id: i64) -> Error {
    log::warn!("Router not found: {}", router_id);
    json_error(
        format!("Router {} not found", router_id),
        StatusCode::NOT_FOUND,
    )
}

#[get("/api/routers")]
pub async fn get_routers(app_state: web::Data<AppState>) -> Result<HttpResponse, Error> {
    let routers = app_state
        .payments
        .db()
        .get_routers()
        .await
        .map_err(|e| internal_error("Failed to get routers", e))?;

    Ok(HttpResponse::Ok().json(routers))
}

#[get("/api/routers/{router_id}")]
pub async fn get_router_by_id(
    path: web::Path<i64>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let router_id = path.into_inner();

    let router = app_state
        .payments
        .db()
        .get_router(router_id)
        .await
        .map_err(|e| internal_error("Failed to get router", e))?
        .ok_or_else(|| router_not_found(router_id))?;

    Ok(HttpResponse::Ok().json(router))
}

#[post("/api/routers")]
pub async fn create_router(
    router: web::Json<RouterConfiguration>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let mut router = router.into_inner();
    router
        .validate()
        .map_err(|e| json_error(e.to_string(), StatusCode::UNPROCESSABLE_ENTITY))?;

    router.id = app_state
        .payments
        .db()
        .save_router(&router)
        .await
        .map_err(|e| internal_error("Failed to save router", e))?;
    log::info!("Registered router {} at {}", router.name, router.address());

    Ok(HttpResponse::Created().json(router))
}

#[put("/api/routers/{router_id}")]
pub async fn update_router(
    path: web::Path<i64>,
    router: web::Json<RouterConfiguration>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let router_id = path.into_inner();
    let mut router = router.into_inner();
    router
        .validate()
        .map_err(|e| json_error(e.to_string(), StatusCode::UNPROCESSABLE_ENTITY))?;

    let updated = app_state
        .payments
        .db()
        .update_router(router_id, &router)
        .await
        .map_err(|e| internal_error("Failed to update router", e))?;
    if !updated {
        return Err(router_not_found(router_id));
    }

    router.id = router_id;
    Ok(HttpResponse::Ok().json(router))
}

#[delete("/api/routers/{router_id}")]
pub async fn delete_router(
    path: web::Path<i64>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let router_id = path.into_inner();

    let deleted = app_state
        .payments
        .db()
        .delete_router(router_id)
        .await
        .map_err(|e| delete_error("Router", router_id, e))?;
    if !deleted {
        return Err(router_not_found(router_id));
    }

    log::info!("Deleted router {}", router_id);
    Ok(HttpResponse::NoContent().finish())
}

/// Opens an API session and reports the router identity.
#[post("/api/routers/{router_id}/test")]
pub async fn test_router_connection(
    path: web::Path<i64>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let router_id = path.into_inner();

    let identity = app_state
        .payments
        .test_router(router_id)
        .await
        .map_err(payment_error)?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "router_id": router_id,
        "connected": true,
        "identity": identity,
    })))
}
