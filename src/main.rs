#[macro_use]
extern crate rocket;

mod access;
mod api;
mod auth;
mod dashboard;
mod db;
mod env;
mod error;
mod models;
mod store;
mod telemetry;
#[cfg(test)]
mod test;
mod validation;

use std::str::FromStr;
use std::time::Duration;

use auth::{forbidden_api, not_found_api, unauthorized_api};
use db::{clean_expired_sessions, ensure_bootstrap_admin};
use env::{Settings, load_environment};
use error::AppError;
use rocket::{Build, Rocket, tokio};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use store::SqliteStore;
use telemetry::{TelemetryFairing, init_tracing, shutdown_telemetry};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Anyhow(anyhow::Error),
    #[error("{0}")]
    Figment(rocket::figment::Error),
    #[error("{0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Database migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("{0}")]
    Rocket(Box<rocket::Error>),
    #[error("Application error: {0}")]
    App(#[from] AppError),
}

impl From<anyhow::Error> for Error {
    fn from(value: anyhow::Error) -> Self {
        Error::Anyhow(value)
    }
}

impl From<rocket::figment::Error> for Error {
    fn from(value: rocket::figment::Error) -> Self {
        Error::Figment(value)
    }
}

impl From<rocket::Error> for Error {
    fn from(value: rocket::Error) -> Self {
        Error::Rocket(Box::new(value))
    }
}

#[rocket::main]
async fn main() -> Result<(), Error> {
    load_environment().map_err(|e| anyhow::anyhow!("Failed to load environment: {}", e))?;
    let settings = Settings::from_env()?;

    init_tracing(&settings)?;

    let options = SqliteConnectOptions::from_str(&settings.database_url)?
        .foreign_keys(true)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new().connect_with(options).await?;

    info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Migrations completed successfully");

    ensure_bootstrap_admin(&pool, settings.bootstrap_admin.as_ref()).await?;

    spawn_session_cleanup(pool.clone(), settings.session_cleanup_interval_secs);

    let result = init_rocket(pool, settings).launch().await;
    shutdown_telemetry();
    result?;

    Ok(())
}

fn spawn_session_cleanup(pool: SqlitePool, interval_secs: u64) {
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(5)).await;

        loop {
            match clean_expired_sessions(&pool).await {
                Ok(count) => {
                    if count > 0 {
                        info!("Cleaned up {} expired sessions", count);
                    }
                }
                Err(e) => {
                    e.log_and_record("Session cleanup");
                }
            }

            tokio::time::sleep(Duration::from_secs(interval_secs)).await;
        }
    });
}

pub fn init_rocket(pool: SqlitePool, settings: Settings) -> Rocket<Build> {
    info!(environment = %settings.deployment_environment, "Starting track team hub");

    rocket::build()
        .manage(SqliteStore::new(pool.clone()))
        .manage(pool)
        .manage(settings)
        .mount("/api", api::routes())
        .register(
            "/api",
            catchers![unauthorized_api, forbidden_api, not_found_api],
        )
        .attach(TelemetryFairing)
}
