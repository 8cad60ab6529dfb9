//! Composition root: builds the store and shared state, and wires routes.

use std::sync::Arc;

use actix_web::web;
use log::{info, warn};

use crate::config::Settings;
use crate::db;
use crate::errors::AppError;
use crate::handlers;
use crate::security::PasswordEncoder;
use crate::store::{MemoryStore, PgStore, Store, StoreError};

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub passwords: PasswordEncoder,
    pub jwt_secret: Option<String>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, jwt_secret: Option<String>) -> Self {
        AppState {
            store,
            passwords: PasswordEncoder::new(),
            jwt_secret,
        }
    }
}

/// PostgreSQL when `DATABASE_URL` is set, otherwise the in-memory store.
pub async fn build_store(settings: &Settings) -> Result<Arc<dyn Store>, StoreError> {
    match &settings.database_url {
        Some(url) => {
            let pool = db::create_pool(url, settings.database_max_connections).await?;
            db::migrate(&pool).await?;
            info!("Using PostgreSQL store");
            Ok(Arc::new(PgStore::new(pool)))
        }
        None => {
            warn!("DATABASE_URL is not set, data will be kept in memory only");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default().error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default().error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default().error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
    )
    .service(web::resource("/register").route(web::post().to(handlers::auth::register)))
    .service(web::resource("/authenticate").route(web::post().to(handlers::auth::authenticate)))
    .service(
        web::resource("/verify-username/{username}")
            .route(web::get().to(handlers::auth::verify_username)),
    )
    .service(web::resource("/reset-password").route(web::post().to(handlers::auth::reset_password)))
    .service(
        web::scope("/api")
            .service(web::resource("/auth/me").route(web::get().to(handlers::auth::current_user)))
            .service(
                web::resource("/departments")
                    .route(web::get().to(handlers::department::get_departments))
                    .route(web::post().to(handlers::department::create_department)),
            )
            .service(
                web::resource("/departments/{id}")
                    .route(web::get().to(handlers::department::get_department))
                    .route(web::put().to(handlers::department::update_department))
                    .route(web::delete().to(handlers::department::delete_department)),
            )
            .service(
                web::resource("/employees")
                    .route(web::get().to(handlers::employee::get_employees))
                    .route(web::post().to(handlers::employee::create_employee)),
            )
            .service(
                web::resource("/employees/{id}")
                    .route(web::get().to(handlers::employee::get_employee))
                    .route(web::put().to(handlers::employee::update_employee))
                    .route(web::delete().to(handlers::employee::delete_employee)),
            ),
    );
}
