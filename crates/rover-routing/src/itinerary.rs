use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::optimize::Route;

/// Debounce window between accepted page transitions.
pub const PAGE_DEBOUNCE_MS: i64 = 350;

/// Minimum wheel delta that counts as a paging gesture.
pub const WHEEL_STEP_THRESHOLD: f64 = 15.0;

/// Minimum swipe distance in pixels that counts as a paging gesture.
pub const SWIPE_STEP_THRESHOLD_PX: f64 = 40.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TourState {
    NotStarted,
    InProgress,
    Completed,
    EndedEarly,
}

/// Completion report handed out when a tour ends, for either terminal state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndSummary {
    pub visited: Vec<String>,
    pub not_visited: Vec<String>,
}

/// Progress through one tour: which stops are done, when the tour started
/// and ended. Completion order is insertion order. The end timestamp is
/// captured exactly once, on the first transition into a terminal state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Itinerary {
    route: Route,
    state: TourState,
    completed: Vec<String>,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
}

impl Itinerary {
    #[must_use]
    pub fn new(route: Route) -> Self {
        Self {
            route,
            state: TourState::NotStarted,
            completed: Vec::new(),
            started_at: None,
            ended_at: None,
        }
    }

    /// Begin the tour. A tour over zero stops is complete the moment it
    /// starts. No-op unless the tour is untouched.
    pub fn start(&mut self, now: DateTime<Utc>) {
        if self.state != TourState::NotStarted {
            return;
        }
        self.started_at = Some(now);
        if self.route.optimized_order.is_empty() {
            self.state = TourState::Completed;
            self.ended_at = Some(now);
        } else {
            self.state = TourState::InProgress;
        }
    }

    /// Mark a stop as visited. Returns `true` when the completed set changed.
    ///
    /// Completing an unknown id, an already-completed id, or any stop while
    /// the tour is not in progress is a no-op. Completing the final pending
    /// stop captures the end timestamp and moves the tour to `Completed`.
    pub fn complete_stop(&mut self, id: &str, now: DateTime<Utc>) -> bool {
        if self.state != TourState::InProgress {
            return false;
        }
        if !self.route.optimized_order.iter().any(|s| s == id) {
            return false;
        }
        if self.completed.iter().any(|s| s == id) {
            return false;
        }

        self.completed.push(id.to_string());

        if self.completed.len() == self.route.optimized_order.len() {
            self.state = TourState::Completed;
            if self.ended_at.is_none() {
                self.ended_at = Some(now);
            }
        }
        true
    }

    /// Stop the tour before every stop is visited. Captures the end timestamp
    /// if it is not already set. Calling this on a finished tour changes
    /// nothing; the summary reflects whatever state the tour is in.
    pub fn end_early(&mut self, now: DateTime<Utc>) -> EndSummary {
        if matches!(self.state, TourState::NotStarted | TourState::InProgress) {
            self.state = TourState::EndedEarly;
            if self.ended_at.is_none() {
                self.ended_at = Some(now);
            }
        }
        self.summary()
    }

    /// The stop the operator should be at: the first entry of the optimized
    /// order that has not been completed. `None` once everything is done.
    #[must_use]
    pub fn active_stop(&self) -> Option<&str> {
        self.route
            .optimized_order
            .iter()
            .find(|id| !self.completed.iter().any(|done| done == *id))
            .map(String::as_str)
    }

    /// Not-yet-completed stops in optimized order.
    #[must_use]
    pub fn pending_ids(&self) -> Vec<&str> {
        self.route
            .optimized_order
            .iter()
            .filter(|id| !self.completed.iter().any(|done| done == *id))
            .map(String::as_str)
            .collect()
    }

    #[must_use]
    pub fn summary(&self) -> EndSummary {
        EndSummary {
            visited: self.completed.clone(),
            not_visited: self.pending_ids().iter().map(ToString::to_string).collect(),
        }
    }

    /// Wall-clock time spent on the tour so far; frozen once the tour ended.
    /// Zero before the tour starts.
    #[must_use]
    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        match self.started_at {
            Some(start) => self.ended_at.unwrap_or(now) - start,
            None => Duration::zero(),
        }
    }

    #[must_use]
    pub fn state(&self) -> TourState {
        self.state
    }

    #[must_use]
    pub fn route(&self) -> &Route {
        &self.route
    }

    #[must_use]
    pub fn completed_ids(&self) -> &[String] {
        &self.completed
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    #[must_use]
    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }
}

/// Display index over the pending stack. Purely presentational: paging never
/// touches the optimized order or completion state. Rapid gestures inside the
/// debounce window are dropped so one transition settles before the next.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PendingPager {
    index: usize,
    last_step: Option<DateTime<Utc>>,
}

impl PendingPager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Feed a wheel delta. Deltas below the threshold are ignored; positive
    /// deltas page forward, negative page back.
    pub fn scroll(&mut self, delta: f64, pending_count: usize, now: DateTime<Utc>) -> bool {
        if delta.abs() < WHEEL_STEP_THRESHOLD {
            return false;
        }
        self.step(delta.is_sign_positive(), pending_count, now)
    }

    /// Feed a swipe distance in pixels. Swiping up (positive) pages forward.
    pub fn swipe(&mut self, delta_px: f64, pending_count: usize, now: DateTime<Utc>) -> bool {
        if delta_px.abs() < SWIPE_STEP_THRESHOLD_PX {
            return false;
        }
        self.step(delta_px.is_sign_positive(), pending_count, now)
    }

    /// Re-clamp after the pending set shrank (a stop was completed).
    pub fn clamp_to(&mut self, pending_count: usize) {
        self.index = self.index.min(pending_count.saturating_sub(1));
    }

    fn step(&mut self, forward: bool, pending_count: usize, now: DateTime<Utc>) -> bool {
        if pending_count == 0 {
            self.index = 0;
            return false;
        }
        if let Some(prev) = self.last_step {
            if now - prev < Duration::milliseconds(PAGE_DEBOUNCE_MS) {
                return false;
            }
        }

        let max = pending_count - 1;
        let next = if forward {
            self.index.saturating_add(1).min(max)
        } else {
            self.index.saturating_sub(1)
        };

        if next == self.index {
            return false;
        }
        self.index = next;
        self.last_step = Some(now);
        true
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::geo::Coordinate;
    use crate::optimize::optimize_route;
    use crate::optimize::Stop;

    fn stop(id: &str, lat: f64) -> Stop {
        Stop {
            id: id.to_string(),
            name: format!("Markt {id}"),
            coordinate: Some(Coordinate {
                latitude: lat,
                longitude: 16.0,
            }),
        }
    }

    fn three_stop_tour() -> Itinerary {
        let route = optimize_route(&[stop("A", 48.0), stop("B", 48.1), stop("C", 48.2)]);
        Itinerary::new(route)
    }

    fn t(seconds: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + seconds, 0).unwrap()
    }

    #[test]
    fn fresh_tour_is_not_started() {
        let tour = three_stop_tour();
        assert_eq!(tour.state(), TourState::NotStarted);
        assert!(tour.started_at().is_none());
        assert_eq!(tour.elapsed(t(100)), Duration::zero());
    }

    #[test]
    fn completing_before_start_is_a_no_op() {
        let mut tour = three_stop_tour();
        assert!(!tour.complete_stop("A", t(0)));
        assert!(tour.completed_ids().is_empty());
    }

    #[test]
    fn start_moves_to_in_progress_and_sets_active_stop() {
        let mut tour = three_stop_tour();
        tour.start(t(0));
        assert_eq!(tour.state(), TourState::InProgress);
        assert_eq!(tour.active_stop(), Some("A"));
    }

    #[test]
    fn completing_a_stop_advances_the_active_stop() {
        let mut tour = three_stop_tour();
        tour.start(t(0));
        assert!(tour.complete_stop("A", t(60)));
        assert_eq!(tour.active_stop(), Some("B"));
        assert_eq!(tour.pending_ids(), vec!["B", "C"]);
    }

    #[test]
    fn completing_the_same_stop_twice_changes_nothing() {
        let mut tour = three_stop_tour();
        tour.start(t(0));
        assert!(tour.complete_stop("A", t(60)));
        assert!(!tour.complete_stop("A", t(120)));
        assert_eq!(tour.completed_ids(), ["A"]);
        assert!(tour.ended_at().is_none());
        assert_eq!(tour.state(), TourState::InProgress);
    }

    #[test]
    fn completing_an_unknown_stop_changes_nothing() {
        let mut tour = three_stop_tour();
        tour.start(t(0));
        assert!(!tour.complete_stop("NOPE", t(60)));
        assert!(tour.completed_ids().is_empty());
    }

    #[test]
    fn completing_every_stop_captures_the_end_exactly_once() {
        let mut tour = three_stop_tour();
        tour.start(t(0));
        tour.complete_stop("A", t(60));
        tour.complete_stop("B", t(120));
        assert!(tour.ended_at().is_none());

        tour.complete_stop("C", t(180));
        assert_eq!(tour.state(), TourState::Completed);
        assert_eq!(tour.ended_at(), Some(t(180)));
        assert!(tour.active_stop().is_none());

        // Nothing after completion moves the timestamp.
        assert!(!tour.complete_stop("C", t(240)));
        tour.end_early(t(300));
        assert_eq!(tour.ended_at(), Some(t(180)));
        assert_eq!(tour.state(), TourState::Completed);
    }

    #[test]
    fn completion_order_is_insertion_order() {
        let mut tour = three_stop_tour();
        tour.start(t(0));
        tour.complete_stop("C", t(10));
        tour.complete_stop("A", t(20));
        assert_eq!(tour.completed_ids(), ["C", "A"]);
    }

    #[test]
    fn end_early_reports_visited_and_not_visited() {
        let mut tour = three_stop_tour();
        tour.start(t(0));
        tour.complete_stop("A", t(60));

        let summary = tour.end_early(t(90));
        assert_eq!(tour.state(), TourState::EndedEarly);
        assert_eq!(tour.ended_at(), Some(t(90)));
        assert_eq!(summary.visited, vec!["A"]);
        assert_eq!(summary.not_visited, vec!["B", "C"]);

        // A second call keeps the original timestamp.
        let summary2 = tour.end_early(t(500));
        assert_eq!(tour.ended_at(), Some(t(90)));
        assert_eq!(summary2, summary);
    }

    #[test]
    fn elapsed_freezes_at_the_end_timestamp() {
        let mut tour = three_stop_tour();
        tour.start(t(0));
        assert_eq!(tour.elapsed(t(600)), Duration::seconds(600));

        tour.end_early(t(900));
        assert_eq!(tour.elapsed(t(5_000)), Duration::seconds(900));
    }

    #[test]
    fn starting_an_empty_route_completes_immediately() {
        let mut tour = Itinerary::new(optimize_route(&[]));
        tour.start(t(0));
        assert_eq!(tour.state(), TourState::Completed);
        assert_eq!(tour.ended_at(), Some(t(0)));
    }

    #[test]
    fn itinerary_round_trips_through_json() {
        let mut tour = three_stop_tour();
        tour.start(t(0));
        tour.complete_stop("A", t(60));

        let json = serde_json::to_string(&tour).unwrap();
        let restored: Itinerary = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, tour);
        assert_eq!(restored.active_stop(), Some("B"));
    }

    // ------------------------------------------------------------------
    // Pager
    // ------------------------------------------------------------------

    #[test]
    fn pager_ignores_small_deltas() {
        let mut pager = PendingPager::new();
        assert!(!pager.scroll(10.0, 5, t(0)));
        assert!(!pager.swipe(20.0, 5, t(0)));
        assert_eq!(pager.index(), 0);
    }

    #[test]
    fn pager_advances_and_clamps_at_the_end() {
        let mut pager = PendingPager::new();
        assert!(pager.scroll(30.0, 2, t(0)));
        assert_eq!(pager.index(), 1);
        // Already at the last pending entry.
        assert!(!pager.scroll(30.0, 2, t(10)));
        assert_eq!(pager.index(), 1);
    }

    #[test]
    fn pager_retreats_and_clamps_at_zero() {
        let mut pager = PendingPager::new();
        pager.scroll(30.0, 3, t(0));
        assert!(pager.scroll(-30.0, 3, t(10)));
        assert_eq!(pager.index(), 0);
        assert!(!pager.scroll(-30.0, 3, t(20)));
        assert_eq!(pager.index(), 0);
    }

    #[test]
    fn pager_coalesces_rapid_gestures() {
        let base = t(0);
        let mut pager = PendingPager::new();
        assert!(pager.scroll(30.0, 5, base));
        // 100 ms later: inside the debounce window, dropped.
        assert!(!pager.scroll(30.0, 5, base + Duration::milliseconds(100)));
        assert_eq!(pager.index(), 1);
        // 400 ms later: accepted.
        assert!(pager.scroll(30.0, 5, base + Duration::milliseconds(400)));
        assert_eq!(pager.index(), 2);
    }

    #[test]
    fn pager_reclamps_when_pending_shrinks() {
        let base = t(0);
        let mut pager = PendingPager::new();
        pager.scroll(30.0, 4, base);
        pager.scroll(30.0, 4, base + Duration::milliseconds(400));
        pager.scroll(30.0, 4, base + Duration::milliseconds(800));
        assert_eq!(pager.index(), 3);

        pager.clamp_to(2);
        assert_eq!(pager.index(), 1);
        pager.clamp_to(0);
        assert_eq!(pager.index(), 0);
    }

    #[test]
    fn pager_with_no_pending_stays_at_zero() {
        let mut pager = PendingPager::new();
        assert!(!pager.scroll(50.0, 0, t(0)));
        assert_eq!(pager.index(), 0);
    }
}
