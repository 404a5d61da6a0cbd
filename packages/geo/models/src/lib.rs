#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geographic primitives shared across the safety map workspace.
//!
//! The map widget reports its visible area as a [`ViewportBounds`]; every
//! streamed record type exposes its position through [`Located`] so the
//! viewport filter and heatmap builder can work over any dataset.

use serde::{Deserialize, Serialize};

/// The visible area of the map in WGS84 coordinates, plus the current zoom
/// level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportBounds {
    /// Northern latitude boundary.
    pub north: f64,
    /// Southern latitude boundary.
    pub south: f64,
    /// Eastern longitude boundary.
    pub east: f64,
    /// Western longitude boundary.
    pub west: f64,
    /// Map zoom level (fractional zoom is allowed).
    pub zoom: f64,
}

impl ViewportBounds {
    /// Creates a new viewport from the given edges and zoom level.
    #[must_use]
    pub const fn new(north: f64, south: f64, east: f64, west: f64, zoom: f64) -> Self {
        Self {
            north,
            south,
            east,
            west,
            zoom,
        }
    }

    /// Returns `true` if the point lies inside the closed rectangle
    /// `[south, north] x [west, east]`.
    #[must_use]
    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        latitude >= self.south
            && latitude <= self.north
            && longitude >= self.west
            && longitude <= self.east
    }
}

/// Anything with a WGS84 position.
pub trait Located {
    /// Latitude in degrees.
    fn latitude(&self) -> f64;

    /// Longitude in degrees.
    fn longitude(&self) -> f64;
}

/// A [`Located`] value that contributes a weight to a heatmap.
pub trait Weighted: Located {
    /// Heatmap weight of this point. Defaults to 1.
    fn weight(&self) -> f64 {
        1.0
    }
}

/// A single weighted point handed to the heatmap renderer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeatmapPoint {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Relative intensity.
    pub weight: f64,
}

impl Located for HeatmapPoint {
    fn latitude(&self) -> f64 {
        self.latitude
    }

    fn longitude(&self) -> f64 {
        self.longitude
    }
}
