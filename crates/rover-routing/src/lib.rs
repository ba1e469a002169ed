//! Tour planning primitives: distance/time estimation, nearest-neighbor
//! route optimization, and the itinerary progress state machine.
//!
//! Everything in this crate is a pure function over its inputs; time-dependent
//! behavior (elapsed displays, the pager debounce window) takes the current
//! instant as an argument so callers and tests control the clock.

pub mod format;
pub mod geo;
pub mod itinerary;
pub mod optimize;

pub use format::{format_elapsed, format_minutes};
pub use geo::{driving_minutes, haversine_km, Coordinate};
pub use itinerary::{EndSummary, Itinerary, PendingPager, TourState};
pub use optimize::{optimize_route, Route, RouteLeg, Stop, WORK_MINUTES_PER_STOP};
