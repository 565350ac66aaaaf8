use super::{internal_error, json_error};
use crate::state::AppState;
use actix_jwt_auth_middleware::TokenSigner;
use actix_web::Error;
use actix_web::{HttpResponse, error::InternalError, http::StatusCode, post, web};
use common::User;
use jwt_compact::alg::Ed25519;

#[derive(Debug, serde::Deserialize)]
pub struct LoginData {
    pub username: String,
    pub password: String,
}

fn invalid_credentials() -> Error {
    json_error("Invalid username or password", StatusCode::UNAUTHORIZED)
}

#[post("/login")]
pub async fn login(
    login_data: web::Json<LoginData>,
    app_state: web::Data<AppState>,
    cookie_signer: web::Data<TokenSigner<User, Ed25519>>,
) -> Result<HttpResponse, Error> {
    let user = app_state
        .payments
        .db()
        .get_user(&login_data.username)
        .await
        .map_err(|e| internal_error("Failed to load user", e))?;

    let Some(user) = user else {
        log::warn!("Login attempt for unknown user {}", login_data.username);
        return Err(invalid_credentials());
    };

    if let Err(err) = user.verify_password(&login_data.password) {
        log::warn!(
            "Invalid password for user {}: {:?}",
            login_data.username,
            err
        );
        return Err(invalid_credentials());
    }

    let access_cookie = cookie_signer.create_access_cookie(&user).map_err(|err| {
        log::error!("Failed to create access token: {:?}", err);
        InternalError::new("Token error", StatusCode::INTERNAL_SERVER_ERROR)
    })?;

    let refresh_cookie = cookie_signer.create_refresh_cookie(&user).map_err(|err| {
        log::error!("Failed to create refresh token: {:?}", err);
        InternalError::new("Token error", StatusCode::INTERNAL_SERVER_ERROR)
    })?;
    Ok(HttpResponse::Ok()
        .cookie(access_cookie)
        .cookie(refresh_cookie)
        .body("Login successful."))
}
