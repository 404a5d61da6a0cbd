#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Viewport filtering and zoom-based decimation.
//!
//! The viewer caches every streamed record, which can reach tens of
//! thousands of points. Before handing markers to the map widget the cache
//! is reduced to the records inside the visible rectangle, keeping only
//! every `n`th record by absolute cache index where `n` depends on the
//! zoom tier. Because the stride is applied to the cache index rather than
//! to the position within the viewport, the same records survive every pan
//! at a given zoom level.

use safety_map_geo_models::{HeatmapPoint, Located, ViewportBounds, Weighted};

/// Zoom tiers as `(zoom ceiling, stride)`, most zoomed-out first. A zoom
/// below the ceiling uses that stride.
const TIERS: &[(f64, usize)] = &[(10.0, 50), (12.0, 20), (14.0, 10), (16.0, 5)];

/// Stride at street level and above: every record is drawn.
const MIN_SKIP_FACTOR: usize = 1;

/// Returns the decimation stride for a zoom level.
///
/// | zoom | stride |
/// |---|---|
/// | < 10 | 50 |
/// | 10 - 11 | 20 |
/// | 12 - 13 | 10 |
/// | 14 - 15 | 5 |
/// | >= 16 | 1 |
///
/// A `NaN` zoom matches no tier and draws every record.
#[must_use]
pub fn skip_factor(zoom: f64) -> usize {
    TIERS
        .iter()
        .find(|(ceiling, _)| zoom < *ceiling)
        .map_or(MIN_SKIP_FACTOR, |(_, stride)| *stride)
}

/// Returns the records that should be drawn as markers for `bounds`.
///
/// Returns an empty list if `bounds` is `None` or `cache` is empty.
#[must_use]
pub fn decimate<'a, T: Located>(cache: &'a [T], bounds: Option<&ViewportBounds>) -> Vec<&'a T> {
    let Some(bounds) = bounds else {
        return Vec::new();
    };
    if cache.is_empty() {
        return Vec::new();
    }

    let stride = skip_factor(bounds.zoom);
    let visible: Vec<&T> = cache
        .iter()
        .enumerate()
        .filter(|(index, record)| {
            bounds.contains(record.latitude(), record.longitude()) && index % stride == 0
        })
        .map(|(_, record)| record)
        .collect();

    log::debug!(
        "{}/{} records in viewport (zoom {}, skip factor {stride})",
        visible.len(),
        cache.len(),
        bounds.zoom
    );

    visible
}

/// Maps every cached record to a heatmap point. Heatmaps are drawn from
/// the whole cache, without viewport filtering or decimation.
#[must_use]
pub fn heatmap_points<T: Weighted>(cache: &[T]) -> Vec<HeatmapPoint> {
    cache
        .iter()
        .map(|record| HeatmapPoint {
            latitude: record.latitude(),
            longitude: record.longitude(),
            weight: record.weight(),
        })
        .collect()
}
