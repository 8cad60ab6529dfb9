use std::io;

use actix_web::middleware::{from_fn, Logger};
use actix_web::{web, App, HttpServer};
use dotenv::dotenv;
use log::{error, info};

use employee_management_backend::config::Settings;
use employee_management_backend::security;
use employee_management_backend::startup::{self, AppState};

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let settings = Settings::from_env().map_err(|err| {
        error!("Invalid configuration: {}", err);
        io::Error::new(io::ErrorKind::InvalidInput, err)
    })?;

    let store = startup::build_store(&settings).await.map_err(|err| {
        error!("Failed to initialize the store: {}", err);
        io::Error::new(io::ErrorKind::Other, err)
    })?;

    let state = web::Data::new(AppState::new(store, settings.jwt_secret.clone()));
    let filter_chain = web::Data::new(settings.filter_chain());

    info!(
        "Security filter chain: csrf={:?}, policy={:?}",
        filter_chain.csrf, filter_chain.policy
    );
    info!("Starting server at {}", settings.bind_address);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .app_data(filter_chain.clone())
            .wrap(from_fn(security::gate))
            .wrap(Logger::default())
            .configure(startup::configure)
    })
    .bind(&settings.bind_address)?
    .run()
    .await
}
