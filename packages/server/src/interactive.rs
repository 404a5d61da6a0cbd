//! Interactive mode for the server.
//!
//! Prompts for bind address, port and data directory before starting the
//! server.

use dialoguer::{Confirm, Input};

use crate::ServerConfig;

/// Runs the server in interactive mode, prompting for configuration.
///
/// Current environment values (or the defaults) are offered as the prompt
/// defaults. The answers override the environment configuration passed to
/// [`super::serve`]; the process environment is left untouched.
///
/// # Errors
///
/// Returns an `std::io::Result` error if the underlying server fails to
/// start.
#[allow(clippy::future_not_send)]
pub async fn run() -> std::io::Result<()> {
    println!("Safety Map Server");
    println!();

    let current = ServerConfig::from_env().unwrap_or_default();

    let bind_addr: String = Input::new()
        .with_prompt("Bind address")
        .default(current.bind_addr.clone())
        .interact_text()
        .unwrap_or_else(|_| current.bind_addr.clone());

    let port: u16 = Input::new()
        .with_prompt("Port")
        .default(current.port)
        .interact_text()
        .unwrap_or(current.port);

    let data_dir: String = Input::new()
        .with_prompt("Data directory")
        .default(current.data_dir.display().to_string())
        .interact_text()
        .unwrap_or_else(|_| current.data_dir.display().to_string());

    if !Confirm::new()
        .with_prompt(format!(
            "Start server on {bind_addr}:{port} serving {data_dir}?"
        ))
        .default(true)
        .interact()
        .unwrap_or(true)
    {
        println!("Cancelled.");
        return Ok(());
    }

    super::serve(answered(current, bind_addr, port, &data_dir)).await
}

/// Applies the prompted values on top of `current`, keeping its file names.
fn answered(current: ServerConfig, bind_addr: String, port: u16, data_dir: &str) -> ServerConfig {
    ServerConfig {
        bind_addr,
        port,
        data_dir: data_dir.into(),
        ..current
    }
}
