//! main file for the server

pub(crate) mod billing;
mod controller;
pub(crate) mod database;
pub mod model;
mod routes;
mod state;
pub(crate) mod store;
pub(crate) mod util;

use crate::server::model::config::{ServerConfig, StoreBackend};
use crate::server::state::AppState;
use crate::server::store::memory::MemoryStore;
use crate::server::store::postgres::PgStore;
use crate::server::store::Backend;
use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Error;
use log::info;

/// Run the server
pub async fn run(config: ServerConfig) -> Result<(), Error> {
    let store = match config.store {
        StoreBackend::Memory => {
            info!("using the in-memory store seeded with the demo restaurant");
            Backend::Memory(MemoryStore::seeded().await)
        }
        StoreBackend::Postgres => Backend::Postgres(PgStore::connect(&config.db).await?),
    };
    let data = web::Data::new(AppState::new(store, config.restaurant_name, config.admin_token));

    info!("listening on {}", config.addr);
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(data.clone())
            .configure(routes::configure)
    })
    .bind(config.addr)?
    .run()
    .await?;
    Ok(())
}
