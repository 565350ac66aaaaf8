mod config;
mod handlers;
mod jobs;
mod state;

use actix_jwt_auth_middleware::{Authority, TokenSigner, use_jwt::UseJWTOnApp};
use actix_state_guards::UseStateGuardOnScope;
use actix_web::{App, HttpServer, error::InternalError, http::StatusCode, middleware::Logger, web};
use common::User;
use dotenv::dotenv;
use ed25519_compact::KeyPair;
use jwt_compact::alg::Ed25519;
use pretty_env_logger::env_logger::{Builder, Env};

use crate::config::AppConfig;

fn init_error(stage: &str, e: anyhow::Error) -> std::io::Error {
    log::error!("{} failed: {:#}", stage, e);
    std::io::Error::other(e.to_string())
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();

    if cli::run_cli().await {
        return Ok(());
    }

    let logger_env = Env::default().default_filter_or("info");
    let mut logger_builder = Builder::from_env(logger_env);
    logger_builder.init();

    let config = AppConfig::from_env().map_err(|e| init_error("Application initialization", e))?;

    let state = config
        .create_app_state()
        .await
        .map_err(|e| init_error("Application initialization", e))?;

    log::info!("App state initialized successfully");

    if let Some(packages_yaml) = &config.packages_yaml {
        let seeded = state
            .initialize_packages_from_file(packages_yaml)
            .await
            .map_err(|e| init_error("Package seeding", e))?;
        log::info!("Seeded {} packages from {}", seeded, packages_yaml);
    }

    log::info!(
        "Payment gateways: {:?} ({:?})",
        state.payments.gateways().names(),
        state.payments.gateways().strategy()
    );

    let data = web::Data::new(state);

    // Scheduled jobs
    tokio::spawn(jobs::start_status_check_runner(
        data.clone(),
        config.status_check_interval,
    ));
    tokio::spawn(jobs::start_cleanup_runner(
        data.clone(),
        config.cleanup_interval,
    ));

    //Authorization
    let KeyPair {
        pk: public_key,
        sk: secret_key,
    } = KeyPair::generate();

    let bind_addr = config.bind_addr.clone();
    log::info!("Listening on {}", bind_addr);

    HttpServer::new(move || {
        let authority = Authority::<User, Ed25519, _, _>::new()
            .refresh_authorizer(|| async move { Ok(()) })
            .token_signer(Some(
                TokenSigner::new()
                    .signing_key(secret_key.clone())
                    .algorithm(Ed25519)
                    .build()
                    .expect("Failed to generate TokenSigner"),
            ))
            .verifying_key(public_key)
            .build()
            .expect("Failed to create Authority");

        App::new()
            .app_data(data.clone())
            .wrap(Logger::new("%a %t %r %s  %{Referer}i %Dms"))
            .service(handlers::index)
            .service(handlers::login)
            .service(handlers::get_available_packages)
            .service(handlers::purchase_voucher)
            .service(handlers::voucher_status)
            .service(handlers::calculate_transaction_charge)
            .service(handlers::payment_callback)
            .use_jwt(
                authority,
                web::scope("")
                    .service(handlers::dashboard)
                    .service(handlers::get_transactions)
                    .service(handlers::get_vouchers)
                    .service(handlers::get_packages)
                    .service(handlers::get_package_by_id)
                    .service(handlers::get_routers)
                    .service(handlers::get_router_by_id)
                    .service(handlers::test_router_connection)
                    .service(handlers::get_charges)
                    .use_state_guard(
                        |user: User| async move {
                            if user.is_superuser {
                                Ok(())
                            } else {
                                Err(InternalError::new(
                                    "You are not an Admin",
                                    StatusCode::UNAUTHORIZED,
                                ))
                            }
                        },
                        web::scope("")
                            .service(handlers::create_package)
                            .service(handlers::update_package)
                            .service(handlers::delete_package)
                            .service(handlers::create_router)
                            .service(handlers::update_router)
                            .service(handlers::delete_router)
                            .service(handlers::create_charge)
                            .service(handlers::update_charge)
                            .service(handlers::delete_charge),
                    ),
            )
    })
    .bind(bind_addr)?
    .run()
    .await
}
