use actix_web::{Error, HttpResponse, delete, get, http::StatusCode, post, put, web};
use common::VoucherPackage;

use super::{delete_error, internal_error, json_error};
use crate::state::AppState;

#[get("/api/packages/available")]
pub async fn get_available_packages(app_state: web::Data<AppState>) -> Result<HttpResponse, Error> {
    let packages = app_state
        .payments
        .db()
        .get_packages(true)
        .await
        .map_err(|e| internal_error("Failed to get packages", e))?;

    Ok(HttpResponse::Ok().json(packages))
}

#[get("/api/packages")]
pub async fn get_packages(app_state: web::Data<AppState>) -> Result<HttpResponse, Error> {
    let packages = app_state
        .payments
        .db()
        .get_packages(false)
        .await
        .map_err(|e| internal_error("Failed to get packages", e))?;

    Ok(HttpResponse::Ok().json(packages))
}

#[get("/api/packages/{package_id}")]
pub async fn get_package_by_id(
    path: web::Path<i64>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let package_id = path.into_inner();

    let maybe_package = app_state
        .payments
        .db()
        .get_package(package_id)
        .await
        .map_err(|e| internal_error("Failed to get package", e))?;

    match maybe_package {
        Some(package) => Ok(HttpResponse::Ok().json(package)),
        None => {
            log::warn!("Package not found: {}", package_id);
            Err(json_error(
                format!("Package {} not found", package_id),
                StatusCode::NOT_FOUND,
            ))
        }
    }
}

#[post("/api/packages")]
pub async fn create_package(
    package: web::Json<VoucherPackage>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let mut package = package.into_inner();
    package
        .validate()
        .map_err(|e| json_error(e.to_string(), StatusCode::UNPROCESSABLE_ENTITY))?;

    package.id = app_state
        .payments
        .db()
        .save_package(&package)
        .await
        .map_err(|e| internal_error("Failed to save package", e))?;
    log::info!("Created package {} ({})", package.name, package.id);

    Ok(HttpResponse::Created().json(package))
}

#[put("/api/packages/{package_id}")]
pub async fn update_package(
    path: web::Path<i64>,
    package: web::Json<VoucherPackage>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let package_id = path.into_inner();
    let mut package = package.into_inner();
    package
        .validate()
        .map_err(|e| json_error(e.to_string(), StatusCode::UNPROCESSABLE_ENTITY))?;

    let updated = app_state
        .payments
        .db()
        .update_package(package_id, &package)
        .await
        .map_err(|e| internal_error("Failed to update package", e))?;
    if !updated {
        return Err(json_error(
            format!("Package {} not found", package_id),
            StatusCode::NOT_FOUND,
        ));
    }

    package.id = package_id;
    Ok(HttpResponse::Ok().json(package))
}

#[delete("/api/packages/{package_id}")]
pub async fn delete_package(
    path: web::Path<i64>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let package_id = path.into_inner();

    let deleted = app_state
        .payments
        .db()
        .delete_package(package_id)
        .await
        .map_err(|e| delete_error("Package", package_id, e))?;
    if !deleted {
        return Err(json_error(
            format!("Package {} not found", package_id),
            StatusCode::NOT_FOUND,
        ));
    }

    log::info!("Deleted package {}", package_id);
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use actix_web::{App, test};
    use common::{Network, Transaction, TransactionStatus};

    use super::*;
    use crate::handlers::test_utils::{app_state, package};

    #[actix_web::test]
    async fn crud_and_availability() {
        let (state, _) = app_state(TransactionStatus::Pending).await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .service(get_available_packages)
                .service(get_packages)
                .service(get_package_by_id)
                .service(create_package)
                .service(update_package)
                .service(delete_package),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/packages")
            .set_json(serde_json::json!({
                "name": "Hourly",
                "price": 500,
                "session_timeout_secs": 3600,
                "validity_hours": 24
            }))
            .to_request();
        let created: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        let id = created["id"].as_i64().unwrap();
        assert!(id > 0);
        assert_eq!(created["profile"], "default");

        let req = test::TestRequest::put()
            .uri(&format!("/api/packages/{}", id))
            .set_json(serde_json::json!({
                "name": "Hourly",
                "price": 600,
                "session_timeout_secs": 3600,
                "validity_hours": 24,
                "is_active": false
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = test::TestRequest::get()
            .uri("/api/packages/available")
            .to_request();
        let available: Vec<serde_json::Value> = test::call_and_read_body_json(&app, req).await;
        assert!(available.is_empty());

        let req = test::TestRequest::get()
            .uri(&format!("/api/packages/{}", id))
            .to_request();
        let fetched: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(fetched["price"], 600);

        let req = test::TestRequest::delete()
            .uri(&format!("/api/packages/{}", id))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::NO_CONTENT
        );

        let req = test::TestRequest::get()
            .uri(&format!("/api/packages/{}", id))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::NOT_FOUND
        );
    }

    #[actix_web::test]
    async fn package_in_use_cannot_be_deleted() {
        let (state, gateway) = app_state(TransactionStatus::Pending).await;
        let pkg = package(&state).await;
        let tx = Transaction::new(
            "256772123456".into(),
            Network::Mtn,
            pkg.price,
            0,
            gateway,
            pkg.id,
            None,
        );
        state.payments.db().save_transaction(&tx).await.unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .service(delete_package),
        )
        .await;

        let req = test::TestRequest::delete()
            .uri(&format!("/api/packages/{}", pkg.id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert!(body["error"].as_str().unwrap().contains("deactivate"));
    }

    #[actix_web::test]
    async fn rejects_invalid_package() {
        let (state, _) = app_state(TransactionStatus::Pending).await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .service(create_package),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/packages")
            .set_json(serde_json::json!({
                "name": "Free",
                "price": 0,
                "session_timeout_secs": 3600,
                "validity_hours": 24
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
