#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Record types carried by the safety map event streams.
//!
//! Each [`Dataset`] is backed by one CSV file on the server and streamed to
//! the viewer as `text/event-stream` frames. The record shapes here are the
//! JSON payloads of the `row` events; [`StreamEvent`] renders the frame
//! grammar shared by every dataset.

use safety_map_geo_models::{Located, Weighted};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Name of the event carrying one record.
pub const ROW_EVENT: &str = "row";

/// Name of the terminal event.
pub const DONE_EVENT: &str = "done";

/// Payload of the terminal event.
pub const DONE_DATA: &str = "end";

/// Comment sent as the first frame so intermediaries flush the response
/// headers immediately.
pub const STREAM_START_COMMENT: &str = "stream start";

/// A streamable dataset.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Dataset {
    /// Dial 112 emergency calls.
    Dial112,
    /// Road accident hotspots.
    Accidents,
}

impl Dataset {
    /// Every dataset, in sidebar order.
    pub const ALL: &[Self] = &[Self::Dial112, Self::Accidents];

    /// Human-readable name.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Dial112 => "Dial 112 Calls",
            Self::Accidents => "Accident Records",
        }
    }

    /// Default CSV file name inside the data directory.
    #[must_use]
    pub const fn default_file_name(self) -> &'static str {
        match self {
            Self::Dial112 => "dial112.csv",
            Self::Accidents => "accidents.csv",
        }
    }

    /// Path of the stream endpoint, relative to the server root.
    #[must_use]
    pub fn stream_path(self) -> String {
        format!("/api/{}/stream", self.as_ref())
    }

    /// Number of buffered records that triggers a cache flush on the
    /// client.
    ///
    /// Accidents are sparser, so a smaller batch keeps the layer visibly
    /// filling in.
    #[must_use]
    pub const fn flush_threshold(self) -> usize {
        match self {
            Self::Dial112 => 100,
            Self::Accidents => 50,
        }
    }
}

/// A Dial 112 emergency call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyCall {
    /// Row identifier.
    pub id: String,
    /// Dispatch event identifier.
    pub event_id: String,
    /// Police station that took the call.
    pub police_station: String,
    /// Call type label.
    pub call_type: String,
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// When the call was received. Free text; may contain commas.
    pub received_at: String,
}

impl Located for EmergencyCall {
    fn latitude(&self) -> f64 {
        self.latitude
    }

    fn longitude(&self) -> f64 {
        self.longitude
    }
}

impl Weighted for EmergencyCall {}

/// An accident hotspot grid cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccidentRecord {
    /// Serial number from the source sheet.
    pub sr_no: String,
    /// State name.
    pub state: String,
    /// District name.
    pub district: String,
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// Grid cell identifier.
    pub grid_id: String,
    /// Number of accidents recorded in the cell.
    pub accident_count: u32,
    /// Nationwide rank of the cell.
    pub all_india_rank: u32,
    /// Nearest ambulance availability.
    pub ambulance: String,
}

impl Located for AccidentRecord {
    fn latitude(&self) -> f64 {
        self.latitude
    }

    fn longitude(&self) -> f64 {
        self.longitude
    }
}

impl Weighted for AccidentRecord {
    fn weight(&self) -> f64 {
        if self.accident_count == 0 {
            1.0
        } else {
            f64::from(self.accident_count)
        }
    }
}

/// One frame on an event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A comment line with no event name.
    Comment(String),
    /// A `row` event with a pre-serialized JSON record.
    Row(String),
    /// The terminal `done` event.
    Done,
}

impl StreamEvent {
    /// Renders the frame in `text/event-stream` wire format, including the
    /// blank line terminating it.
    #[must_use]
    pub fn to_frame(&self) -> String {
        match self {
            Self::Comment(text) => format!(": {text}\n\n"),
            Self::Row(json) => format!("event: {ROW_EVENT}\ndata: {json}\n\n"),
            Self::Done => format!("event: {DONE_EVENT}\ndata: {DONE_DATA}\n\n"),
        }
    }
}
