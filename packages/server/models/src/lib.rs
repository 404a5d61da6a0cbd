#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API response types for the safety map server.
//!
//! These types are serialized to JSON for the REST API. Event stream
//! payloads live in `safety_map_stream_models`; everything here is a plain
//! JSON response.

use safety_map_stream_models::Dataset;
use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiHealth {
    /// Whether the server is healthy.
    pub healthy: bool,
    /// Server version.
    pub version: String,
}

/// Error body returned before a stream starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// Always `false`.
    pub success: bool,
    /// Short description of what went wrong.
    pub error: String,
}

impl ApiError {
    /// Creates an error body with `success: false`.
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

/// A streamable dataset as listed by `GET /api/datasets`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiDataset {
    /// Dataset identifier, as used in the stream path.
    pub id: Dataset,
    /// Human-readable name.
    pub name: String,
    /// Stream endpoint path.
    pub path: String,
    /// Whether the backing CSV file is present.
    pub available: bool,
}

impl ApiDataset {
    /// Describes `dataset`.
    #[must_use]
    pub fn new(dataset: Dataset, available: bool) -> Self {
        Self {
            id: dataset,
            name: dataset.label().to_string(),
            path: dataset.stream_path(),
            available,
        }
    }
}
