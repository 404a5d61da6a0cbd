//! Viewer session: the state a map widget reads from.

use std::time::Duration;

use safety_map_geo_models::{HeatmapPoint, ViewportBounds};
use safety_map_stream_models::{AccidentRecord, Dataset, EmergencyCall};
use tokio::task::JoinHandle;

use crate::layer::{DatasetLayer, LayerKind};
use crate::loader::{LoadOptions, spawn_load};
use crate::scheduler::DEFAULT_FRAME_PERIOD;

/// Layer toggles, viewport and caches for every dataset, plus the HTTP
/// client used to stream them from one server.
#[derive(Debug)]
pub struct ViewerSession {
    client: reqwest::Client,
    base_url: String,
    frame_period: Duration,
    bounds: Option<ViewportBounds>,
    dial112: DatasetLayer<EmergencyCall>,
    accidents: DatasetLayer<AccidentRecord>,
}

impl ViewerSession {
    /// Creates a session streaming from `base_url` (scheme, host and port,
    /// no trailing path). No viewport is known until [`Self::set_bounds`].
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Like [`Self::new`] with a caller-supplied client.
    #[must_use]
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            frame_period: DEFAULT_FRAME_PERIOD,
            bounds: None,
            dial112: DatasetLayer::new(Dataset::Dial112),
            accidents: DatasetLayer::new(Dataset::Accidents),
        }
    }

    /// Overrides the flush frame period for subsequent loads.
    #[must_use]
    pub const fn with_frame_period(mut self, frame_period: Duration) -> Self {
        self.frame_period = frame_period;
        self
    }

    /// Stream URL for `dataset`.
    #[must_use]
    pub fn stream_url(&self, dataset: Dataset) -> String {
        format!("{}{}", self.base_url, dataset.stream_path())
    }

    /// Shows or hides one of a dataset's layers.
    ///
    /// When this starts a load, the handle to the loader task is returned;
    /// it resolves to the number of records cached once the stream ends.
    /// Must be called from within a tokio runtime.
    pub fn set_layer_visible(
        &mut self,
        dataset: Dataset,
        kind: LayerKind,
        visible: bool,
    ) -> Option<JoinHandle<usize>> {
        let options = self.load_options(dataset);
        let url = self.stream_url(dataset);

        let handle = match dataset {
            Dataset::Dial112 => self
                .dial112
                .set_visible(kind, visible)
                .map(|ticket| spawn_load(&self.client, &url, ticket, options)),
            Dataset::Accidents => self
                .accidents
                .set_visible(kind, visible)
                .map(|ticket| spawn_load(&self.client, &url, ticket, options)),
        };

        if handle.is_some() {
            log::info!("Loading {} from {url}", dataset.label());
        }
        handle
    }

    const fn load_options(&self, dataset: Dataset) -> LoadOptions {
        LoadOptions {
            frame_period: self.frame_period,
            ..LoadOptions::for_dataset(dataset)
        }
    }

    /// Whether a dataset's layer is shown.
    #[must_use]
    pub const fn is_layer_visible(&self, dataset: Dataset, kind: LayerKind) -> bool {
        match dataset {
            Dataset::Dial112 => self.dial112.is_visible(kind),
            Dataset::Accidents => self.accidents.is_visible(kind),
        }
    }

    /// Records the current viewport. Visible records are recomputed from it
    /// on the next read.
    pub fn set_bounds(&mut self, bounds: ViewportBounds) {
        log::debug!(
            "Viewport N{:.4} S{:.4} E{:.4} W{:.4} z{}",
            bounds.north,
            bounds.south,
            bounds.east,
            bounds.west,
            bounds.zoom,
        );
        self.bounds = Some(bounds);
    }

    /// Current viewport, if one has been reported.
    #[must_use]
    pub const fn bounds(&self) -> Option<&ViewportBounds> {
        self.bounds.as_ref()
    }

    /// Emergency call markers to draw.
    #[must_use]
    pub fn visible_emergency_calls(&self) -> Vec<EmergencyCall> {
        self.dial112.visible(self.bounds.as_ref())
    }

    /// Accident markers to draw.
    #[must_use]
    pub fn visible_accidents(&self) -> Vec<AccidentRecord> {
        self.accidents.visible(self.bounds.as_ref())
    }

    /// Heatmap points for every dataset whose heatmap is shown.
    #[must_use]
    pub fn heatmap_points(&self) -> Vec<HeatmapPoint> {
        let mut points = self.dial112.heatmap();
        points.extend(self.accidents.heatmap());
        points
    }

    /// Number of cached records for `dataset`.
    #[must_use]
    pub fn cached_len(&self, dataset: Dataset) -> usize {
        match dataset {
            Dataset::Dial112 => self.dial112.cached_len(),
            Dataset::Accidents => self.accidents.cached_len(),
        }
    }

    /// Whether a load for `dataset` is in flight.
    #[must_use]
    pub fn is_loading(&self, dataset: Dataset) -> bool {
        match dataset {
            Dataset::Dial112 => self.dial112.is_loading(),
            Dataset::Accidents => self.accidents.is_loading(),
        }
    }
}
