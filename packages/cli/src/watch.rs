//! `safety_map watch`: stream one dataset the way the map viewer does and
//! report what the given viewport would draw.

use std::time::Duration;

use clap::Args;
use dialoguer::{Confirm, Input, Select};
use safety_map_cli_utils::{MultiProgress, records_spinner};
use safety_map_client::layer::LayerKind;
use safety_map_client::session::ViewerSession;
use safety_map_geo_models::ViewportBounds;
use safety_map_stream_models::Dataset;
use safety_map_viewport::skip_factor;

/// Server queried when `--server` is not given.
pub const DEFAULT_SERVER: &str = "http://127.0.0.1:8080";

/// Flush frame period when `--frame-ms` is not given.
pub const DEFAULT_FRAME_MS: u64 = 16;

/// Dataset, server and viewport for a watch run.
#[derive(Debug, Clone, Args)]
pub struct WatchArgs {
    /// Dataset to stream (`dial112` or `accidents`)
    #[arg(value_parser = parse_dataset)]
    pub dataset: Dataset,
    /// Base URL of the safety map server
    #[arg(long, default_value = DEFAULT_SERVER)]
    pub server: String,
    /// Northern edge of the viewport (degrees latitude)
    #[arg(long, allow_negative_numbers = true)]
    pub north: f64,
    /// Southern edge of the viewport (degrees latitude)
    #[arg(long, allow_negative_numbers = true)]
    pub south: f64,
    /// Eastern edge of the viewport (degrees longitude)
    #[arg(long, allow_negative_numbers = true)]
    pub east: f64,
    /// Western edge of the viewport (degrees longitude)
    #[arg(long, allow_negative_numbers = true)]
    pub west: f64,
    /// Map zoom level
    #[arg(long)]
    pub zoom: f64,
    /// Also enable the heatmap layer and report its points
    #[arg(long)]
    pub heatmap: bool,
    /// Delay between scheduling and applying a batch flush (milliseconds)
    #[arg(long, default_value_t = DEFAULT_FRAME_MS)]
    pub frame_ms: u64,
}

impl WatchArgs {
    /// The viewport described by the edge and zoom arguments.
    #[must_use]
    pub const fn bounds(&self) -> ViewportBounds {
        ViewportBounds::new(self.north, self.south, self.east, self.west, self.zoom)
    }
}

fn parse_dataset(value: &str) -> Result<Dataset, String> {
    value
        .parse()
        .map_err(|_| format!("unknown dataset '{value}' (expected dial112 or accidents)"))
}

/// Prompts for every watch argument.
///
/// # Errors
///
/// Returns an error if a prompt cannot be shown or is aborted.
pub fn prompt() -> Result<WatchArgs, dialoguer::Error> {
    let labels: Vec<&str> = Dataset::ALL.iter().map(|d| d.label()).collect();
    let idx = Select::new()
        .with_prompt("Dataset")
        .items(&labels)
        .default(0)
        .interact()?;

    let server: String = Input::new()
        .with_prompt("Server")
        .default(DEFAULT_SERVER.to_string())
        .interact_text()?;

    // Defaults frame mainland India at a country-wide zoom.
    let north = Input::new().with_prompt("North").default(37.1).interact_text()?;
    let south = Input::new().with_prompt("South").default(6.5).interact_text()?;
    let east = Input::new().with_prompt("East").default(97.4).interact_text()?;
    let west = Input::new().with_prompt("West").default(68.1).interact_text()?;
    let zoom = Input::new().with_prompt("Zoom").default(5.0).interact_text()?;

    let heatmap = Confirm::new()
        .with_prompt("Enable heatmap layer?")
        .default(false)
        .interact()?;

    Ok(WatchArgs {
        dataset: Dataset::ALL[idx],
        server,
        north,
        south,
        east,
        west,
        zoom,
        heatmap,
        frame_ms: DEFAULT_FRAME_MS,
    })
}

/// Streams the dataset into a [`ViewerSession`] and prints the cache total
/// and the decimated marker count for the viewport.
///
/// # Errors
///
/// Returns an error if the loader task panics or is cancelled.
pub async fn run(multi: &MultiProgress, args: WatchArgs) -> Result<(), Box<dyn std::error::Error>> {
    let dataset = args.dataset;
    let label = dataset.label();
    let bounds = args.bounds();

    let mut session = ViewerSession::new(args.server)
        .with_frame_period(Duration::from_millis(args.frame_ms));
    session.set_bounds(bounds);

    let Some(mut load) = session.set_layer_visible(dataset, LayerKind::Points, true) else {
        return Err(format!("{label} load did not start").into());
    };
    if args.heatmap {
        // Shares the in-flight load.
        drop(session.set_layer_visible(dataset, LayerKind::Heatmap, true));
    }

    let spinner = records_spinner(multi, &format!("Streaming {label}"));
    let mut refresh = tokio::time::interval(Duration::from_millis(100));

    let total = loop {
        tokio::select! {
            result = &mut load => break result?,
            _ = refresh.tick() => {
                spinner.set_message(format!(
                    "Streaming {label}: {} records",
                    session.cached_len(dataset)
                ));
            }
        }
    };
    spinner.finish_with_message(format!("{label}: {total} records cached"));

    if total == 0 {
        log::warn!(
            "No {label} records received from {}",
            session.stream_url(dataset)
        );
    }

    let visible = match dataset {
        Dataset::Dial112 => session.visible_emergency_calls().len(),
        Dataset::Accidents => session.visible_accidents().len(),
    };

    println!(
        "Viewport N{} S{} E{} W{} at zoom {} (every {} record(s))",
        bounds.north,
        bounds.south,
        bounds.east,
        bounds.west,
        bounds.zoom,
        skip_factor(bounds.zoom),
    );
    println!("Visible markers: {visible}");

    if args.heatmap {
        let points = session.heatmap_points();
        let weight: f64 = points.iter().map(|p| p.weight).sum();
        println!("Heatmap points: {} (total weight {weight})", points.len());
    }

    Ok(())
}
