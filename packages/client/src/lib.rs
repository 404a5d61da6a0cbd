#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Viewer-side half of the safety map streaming pipeline.
//!
//! [`subscription::subscribe`] consumes a dataset's event stream, the
//! [`accumulator::Accumulator`] batches incoming records into a
//! [`cache::RecordCache`] at most once per frame, and
//! [`session::ViewerSession`] owns the per-dataset layer state that the map
//! widget reads visible markers and heatmap points from.

pub mod accumulator;
pub mod cache;
pub mod layer;
pub mod loader;
pub mod scheduler;
pub mod session;
pub mod sse;
pub mod subscription;

#[cfg(test)]
mod test_server;

use thiserror::Error;

/// Errors that can occur while consuming an event stream.
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed or the connection dropped.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status before streaming.
    #[error("Unexpected HTTP status {status}")]
    Status {
        /// Response status code.
        status: u16,
    },
}
