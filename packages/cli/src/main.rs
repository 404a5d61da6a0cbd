#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line client for the safety map.
//!
//! `safety_map watch` streams a dataset from a running server through the
//! same batching and decimation the map viewer uses, `safety_map
//! skip-factor` prints the decimation stride for a zoom level, and
//! `safety_map serve` starts the server interactively. Run without a
//! subcommand to pick one interactively.
//!
//! Uses `indicatif-log-bridge` (via [`safety_map_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and spinners never fight for the terminal.

mod watch;

use clap::{Parser, Subcommand};
use dialoguer::Select;
use safety_map_viewport::skip_factor;

use crate::watch::WatchArgs;

#[derive(Parser)]
#[command(name = "safety_map", about = "Safety map streaming client")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream a dataset and report what a viewport would draw
    Watch(WatchArgs),
    /// Print the decimation stride for a zoom level
    SkipFactor {
        /// Map zoom level
        #[arg(allow_negative_numbers = true)]
        zoom: f64,
    },
    /// Start the server, prompting for its configuration
    Serve,
}

/// Interactive tool selection.
enum Tool {
    Watch,
    Server,
}

impl Tool {
    const ALL: &[Self] = &[Self::Watch, Self::Server];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::Watch => "Watch a dataset stream",
            Self::Server => "Start server",
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = safety_map_cli_utils::init_logger();
    let cli = Cli::parse();

    let command = match cli.command {
        Some(command) => command,
        None => {
            let labels: Vec<&str> = Tool::ALL.iter().map(Tool::label).collect();
            let idx = Select::new()
                .with_prompt("What would you like to do?")
                .items(&labels)
                .default(0)
                .interact()?;

            match Tool::ALL[idx] {
                Tool::Watch => Commands::Watch(watch::prompt()?),
                Tool::Server => Commands::Serve,
            }
        }
    };

    match command {
        Commands::Watch(args) => watch::run(&multi, args).await?,
        Commands::SkipFactor { zoom } => println!("{}", skip_factor(zoom)),
        Commands::Serve => {
            // The server uses actix-web's runtime, so we need to run it
            // in a blocking task to avoid nesting tokio runtimes.
            tokio::task::spawn_blocking(|| {
                actix_web::rt::System::new().block_on(safety_map_server::interactive::run())
            })
            .await??;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory as _;
    use safety_map_stream_models::Dataset;

    use super::*;

    #[test]
    fn command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_watch_with_negative_longitudes() {
        let cli = Cli::try_parse_from([
            "safety_map",
            "watch",
            "accidents",
            "--north",
            "40.0",
            "--south",
            "30.0",
            "--east",
            "-70.5",
            "--west",
            "-80",
            "--zoom",
            "12",
            "--heatmap",
        ])
        .unwrap();

        let Some(Commands::Watch(args)) = cli.command else {
            panic!("expected watch");
        };
        assert_eq!(args.dataset, Dataset::Accidents);
        assert_eq!(args.server, watch::DEFAULT_SERVER);
        assert!(args.heatmap);
        assert_eq!(args.frame_ms, watch::DEFAULT_FRAME_MS);
        let bounds = args.bounds();
        assert!((bounds.west + 80.0).abs() < f64::EPSILON);
        assert!((bounds.zoom - 12.0).abs() < f64::EPSILON);
    }

    #[test]
    fn parses_watch_frame_period() {
        let cli = Cli::try_parse_from([
            "safety_map", "watch", "dial112", "--north", "1", "--south", "0", "--east", "1",
            "--west", "0", "--zoom", "5", "--frame-ms", "250",
        ])
        .unwrap();

        let Some(Commands::Watch(args)) = cli.command else {
            panic!("expected watch");
        };
        assert_eq!(args.frame_ms, 250);
    }

    #[test]
    fn rejects_unknown_dataset() {
        let result = Cli::try_parse_from([
            "safety_map", "watch", "cctv", "--north", "1", "--south", "0", "--east", "1",
            "--west", "0", "--zoom", "5",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn parses_skip_factor() {
        let cli = Cli::try_parse_from(["safety_map", "skip-factor", "14.5"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::SkipFactor { zoom }) if (zoom - 14.5).abs() < f64::EPSILON));
    }
}
