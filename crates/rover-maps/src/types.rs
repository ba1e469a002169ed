//! Wire types for the driving-time check.
//!
//! [`DrivingTimePair`] and [`DrivingTimeResult`] are the shapes our own API
//! exposes; the `Matrix*` types model the upstream distance-matrix JSON.

use serde::{Deserialize, Serialize};

/// One origin/destination pair, both as free-form postal addresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrivingTimePair {
    pub origin_address: String,
    pub destination_address: String,
}

/// Per-pair outcome. `status` is `"OK"` when the fields are populated;
/// any other value means the pair could not be resolved and the fields
/// are `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrivingTimeResult {
    pub status: String,
    pub duration_seconds: Option<i64>,
    pub duration_text: Option<String>,
    pub distance_text: Option<String>,
}

impl DrivingTimeResult {
    #[must_use]
    pub fn failed(status: &str) -> Self {
        Self {
            status: status.to_string(),
            duration_seconds: None,
            duration_text: None,
            distance_text: None,
        }
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == "OK"
    }
}

/// Top-level distance-matrix envelope: `status` is `"OK"` on success;
/// on failure `error_message` may carry detail.
#[derive(Debug, Deserialize)]
pub struct MatrixResponse {
    pub status: String,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub rows: Vec<MatrixRow>,
}

#[derive(Debug, Deserialize)]
pub struct MatrixRow {
    #[serde(default)]
    pub elements: Vec<MatrixElement>,
}

/// One origin/destination cell. `status` is per-element: `"OK"`,
/// `"NOT_FOUND"` or `"ZERO_RESULTS"`.
#[derive(Debug, Deserialize)]
pub struct MatrixElement {
    pub status: String,
    #[serde(default)]
    pub duration: Option<TextValue>,
    #[serde(default)]
    pub distance: Option<TextValue>,
}

/// Value with a human-readable rendering, e.g. `{"text": "1 hour 5 mins", "value": 3900}`.
#[derive(Debug, Deserialize)]
pub struct TextValue {
    pub text: String,
    pub value: i64,
}
