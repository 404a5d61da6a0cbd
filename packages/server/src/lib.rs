#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web server for the safety map application.
//!
//! Streams each dataset's backing CSV file to the viewer as
//! `text/event-stream` frames, one `row` event per valid record followed by
//! a single `done` event. Every request gets its own reader over the file;
//! nothing is cached server-side.

mod handlers;
pub mod interactive;

use std::path::PathBuf;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use safety_map_stream_models::Dataset;
use thiserror::Error;

/// Environment variable holding the bind address.
pub const BIND_ADDR_ENV: &str = "BIND_ADDR";
/// Environment variable holding the port.
pub const PORT_ENV: &str = "PORT";
/// Environment variable holding the directory the CSV files live in.
pub const DATA_DIR_ENV: &str = "DATA_DIR";
/// Environment variable overriding the emergency call file name.
pub const DIAL112_CSV_ENV: &str = "DIAL112_CSV";
/// Environment variable overriding the accident file name.
pub const ACCIDENTS_CSV_ENV: &str = "ACCIDENTS_CSV";

/// Errors that can occur while reading server configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `PORT` is not a valid port number.
    #[error("Invalid PORT value '{value}': {source}")]
    InvalidPort {
        /// The rejected value.
        value: String,
        /// Parse failure.
        source: std::num::ParseIntError,
    },
}

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind_addr: String,
    /// Port to listen on.
    pub port: u16,
    /// Directory containing the dataset CSV files.
    pub data_dir: PathBuf,
    /// Emergency call file name, relative to `data_dir`.
    pub dial112_csv: String,
    /// Accident file name, relative to `data_dir`.
    pub accidents_csv: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".to_string(),
            port: 8080,
            data_dir: PathBuf::from("emergency-data"),
            dial112_csv: Dataset::Dial112.default_file_name().to_string(),
            accidents_csv: Dataset::Accidents.default_file_name().to_string(),
        }
    }
}

impl ServerConfig {
    /// Reads configuration from the process environment. Unset variables
    /// fall back to [`ServerConfig::default`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPort`] if `PORT` is set but is not a
    /// valid port number.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`, which maps a variable name to
    /// its value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPort`] if the port is set but is not a
    /// valid port number.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = match lookup(PORT_ENV) {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|source| ConfigError::InvalidPort { value, source })?,
            None => defaults.port,
        };

        Ok(Self {
            bind_addr: lookup(BIND_ADDR_ENV).unwrap_or(defaults.bind_addr),
            port,
            data_dir: lookup(DATA_DIR_ENV).map_or(defaults.data_dir, PathBuf::from),
            dial112_csv: lookup(DIAL112_CSV_ENV).unwrap_or(defaults.dial112_csv),
            accidents_csv: lookup(ACCIDENTS_CSV_ENV).unwrap_or(defaults.accidents_csv),
        })
    }

    /// Path of the CSV file backing `dataset`.
    #[must_use]
    pub fn csv_path(&self, dataset: Dataset) -> PathBuf {
        let file_name = match dataset {
            Dataset::Dial112 => &self.dial112_csv,
            Dataset::Accidents => &self.accidents_csv,
        };
        self.data_dir.join(file_name)
    }
}

/// Shared application state.
pub struct AppState {
    /// Active configuration.
    pub config: ServerConfig,
}

/// Registers the `/api` routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/datasets", web::get().to(handlers::datasets))
            .route("/dial112/stream", web::get().to(handlers::dial112_stream))
            .route("/accidents/stream", web::get().to(handlers::accidents_stream)),
    );
}

/// Starts the safety map server.
///
/// Reads [`ServerConfig`] from the environment and serves the API until
/// shut down. This is a regular async function; the caller is responsible
/// for providing the Actix runtime (e.g. via `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if the configuration is invalid, or
/// if the HTTP server fails to bind or encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    let config = ServerConfig::from_env().map_err(std::io::Error::other)?;
    serve(config).await
}

/// Serves the API with an explicit configuration until shut down.
///
/// # Errors
///
/// Returns an `std::io::Result` error if the HTTP server fails to bind or
/// encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn serve(config: ServerConfig) -> std::io::Result<()> {
    pretty_env_logger::try_init_custom_env("RUST_LOG").ok();

    for dataset in Dataset::ALL {
        let path = config.csv_path(*dataset);
        if path.is_file() {
            log::info!("{} -> {}", dataset.label(), path.display());
        } else {
            log::warn!(
                "{} file {} not found; its stream will answer 404",
                dataset.label(),
                path.display()
            );
        }
    }

    let bind_addr = config.bind_addr.clone();
    let port = config.port;
    let state = web::Data::new(AppState { config });

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((bind_addr, port))?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::Path;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(
            config.csv_path(Dataset::Dial112),
            Path::new("emergency-data").join("dial112.csv")
        );
    }

    #[test]
    fn reads_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            (BIND_ADDR_ENV, "0.0.0.0"),
            (PORT_ENV, " 9000 "),
            (DATA_DIR_ENV, "/srv/data"),
            (ACCIDENTS_CSV_ENV, "hotspots.csv"),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0");
        assert_eq!(config.port, 9000);
        assert_eq!(
            config.csv_path(Dataset::Accidents),
            Path::new("/srv/data").join("hotspots.csv")
        );
        assert_eq!(
            config.csv_path(Dataset::Dial112),
            Path::new("/srv/data").join("dial112.csv")
        );
    }

    #[test]
    fn rejects_invalid_port() {
        let err = ServerConfig::from_lookup(lookup(&[(PORT_ENV, "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPort { ref value, .. } if value == "eighty"));
    }
}
