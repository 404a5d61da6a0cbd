#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CSV-to-event streaming for safety map datasets.
//!
//! A [`reader::RecordReader`] walks a large CSV file one line at a time,
//! dropping malformed rows, and [`publisher::publish`] drives it from a
//! spawned task that frames every record as a `text/event-stream` event.
//! Each HTTP request gets its own reader; nothing is shared between
//! clients.

pub mod publisher;
pub mod reader;
pub mod row;

use std::path::PathBuf;

/// Errors that can occur while streaming a dataset.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// The backing CSV file does not exist.
    #[error("CSV file not found: {}", path.display())]
    NotFound {
        /// Path that was looked up.
        path: PathBuf,
    },

    /// I/O error while opening or reading the file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A record could not be serialized.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
