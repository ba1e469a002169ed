//! Client for the distance-matrix API used to spot-check the planner's
//! driving time estimates against real road data.
//!
//! One upstream request per origin/destination pair; [`DrivingTimesClient::driving_times`]
//! fans a batch out concurrently and degrades per-pair failures to a
//! non-`OK` slot status instead of failing the whole batch.

pub mod client;
pub mod error;
pub mod types;

pub use client::DrivingTimesClient;
pub use error::MapsError;
pub use types::{DrivingTimePair, DrivingTimeResult};
