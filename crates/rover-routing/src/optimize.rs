use serde::{Deserialize, Serialize};

use crate::geo::{driving_minutes, haversine_km, Coordinate};

/// Fixed on-site service duration per stop, in minutes.
pub const WORK_MINUTES_PER_STOP: u32 = 45;

/// One visit location as the optimizer sees it. The coordinate is optional;
/// a stop without one is never chosen as "nearest" and ends up after every
/// located stop, in its original relative position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub id: String,
    pub name: String,
    pub coordinate: Option<Coordinate>,
}

/// An optimized visiting order over a set of stops, with aggregate estimates.
///
/// Invariants: `optimized_order` is a permutation of the ids in `markets`,
/// and `total_time = total_driving_time + total_work_time`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub markets: Vec<Stop>,
    pub optimized_order: Vec<String>,
    pub total_driving_time: u32,
    pub total_work_time: u32,
    pub total_time: u32,
}

/// One leg of the optimized order. `distance_km` is `None` when either end
/// lacks a coordinate; such legs contribute zero driving minutes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteLeg {
    pub from_id: String,
    pub to_id: String,
    pub distance_km: Option<f64>,
    pub driving_minutes: u32,
}

impl Route {
    /// Per-leg estimates along `optimized_order`.
    #[must_use]
    pub fn legs(&self) -> Vec<RouteLeg> {
        self.optimized_order
            .windows(2)
            .map(|pair| {
                let distance_km = self
                    .coordinate_of(&pair[0])
                    .zip(self.coordinate_of(&pair[1]))
                    .map(|(a, b)| haversine_km(a, b));
                RouteLeg {
                    from_id: pair[0].clone(),
                    to_id: pair[1].clone(),
                    distance_km,
                    driving_minutes: distance_km.map_or(0, driving_minutes),
                }
            })
            .collect()
    }

    /// Ids of stops that carry no coordinate and were therefore only appended,
    /// never routed.
    #[must_use]
    pub fn unlocated(&self) -> Vec<String> {
        self.markets
            .iter()
            .filter(|stop| stop.coordinate.is_none())
            .map(|stop| stop.id.clone())
            .collect()
    }

    fn coordinate_of(&self, id: &str) -> Option<Coordinate> {
        self.markets
            .iter()
            .find(|stop| stop.id == id)
            .and_then(|stop| stop.coordinate)
    }
}

/// Nearest-neighbor tour over the given stops.
///
/// Starts from the first stop in input order and repeatedly takes the
/// remaining stop with the smallest haversine distance to the current one.
/// Stops without coordinates compare as infinitely far, so they are appended
/// in original relative order once every located candidate is used up. This
/// is a deliberate heuristic, not an optimal traveling-salesperson solution.
///
/// Total over any input: an empty slice yields an empty route with all
/// durations zero.
#[must_use]
pub fn optimize_route(stops: &[Stop]) -> Route {
    if stops.is_empty() {
        return Route {
            markets: Vec::new(),
            optimized_order: Vec::new(),
            total_driving_time: 0,
            total_work_time: 0,
            total_time: 0,
        };
    }

    let mut remaining: Vec<&Stop> = stops.iter().collect();
    let mut ordered: Vec<&Stop> = vec![remaining.remove(0)];

    while !remaining.is_empty() {
        let current = ordered[ordered.len() - 1];
        let mut best_idx = 0;
        let mut best_distance = leg_distance(current, remaining[0]);

        for (idx, candidate) in remaining.iter().enumerate().skip(1) {
            let distance = leg_distance(current, candidate);
            // Strict less-than keeps the earliest stop on ties, which is what
            // preserves input order when every remaining distance is unknown.
            if distance < best_distance {
                best_idx = idx;
                best_distance = distance;
            }
        }

        ordered.push(remaining.remove(best_idx));
    }

    let total_driving_time = ordered
        .windows(2)
        .map(|pair| match (pair[0].coordinate, pair[1].coordinate) {
            (Some(a), Some(b)) => driving_minutes(haversine_km(a, b)),
            _ => 0,
        })
        .sum();

    #[allow(clippy::cast_possible_truncation)]
    let total_work_time = WORK_MINUTES_PER_STOP * stops.len() as u32;

    Route {
        markets: stops.to_vec(),
        optimized_order: ordered.into_iter().map(|stop| stop.id.clone()).collect(),
        total_driving_time,
        total_work_time,
        total_time: total_driving_time + total_work_time,
    }
}

/// Distance between two stops for candidate selection. Either end missing a
/// coordinate makes the leg infinitely long.
fn leg_distance(a: &Stop, b: &Stop) -> f64 {
    match (a.coordinate, b.coordinate) {
        (Some(from), Some(to)) => haversine_km(from, to),
        _ => f64::INFINITY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn located(id: &str, latitude: f64, longitude: f64) -> Stop {
        Stop {
            id: id.to_string(),
            name: format!("Markt {id}"),
            coordinate: Some(Coordinate {
                latitude,
                longitude,
            }),
        }
    }

    fn unlocated(id: &str) -> Stop {
        Stop {
            id: id.to_string(),
            name: format!("Markt {id}"),
            coordinate: None,
        }
    }

    fn ids(route: &Route) -> Vec<&str> {
        route.optimized_order.iter().map(String::as_str).collect()
    }

    #[test]
    fn empty_input_yields_empty_route() {
        let route = optimize_route(&[]);
        assert!(route.optimized_order.is_empty());
        assert_eq!(route.total_driving_time, 0);
        assert_eq!(route.total_work_time, 0);
        assert_eq!(route.total_time, 0);
    }

    #[test]
    fn single_stop_is_work_only() {
        let route = optimize_route(&[located("M1", 48.2, 16.3)]);
        assert_eq!(ids(&route), vec!["M1"]);
        assert_eq!(route.total_driving_time, 0);
        assert_eq!(route.total_work_time, 45);
        assert_eq!(route.total_time, 45);
    }

    #[test]
    fn visits_nearest_neighbor_along_a_line() {
        // A(0,0) - B(0,1) - C(0,3): from A the nearest is B, then C.
        let a = located("A", 0.0, 0.0);
        let b = located("B", 0.0, 1.0);
        let c = located("C", 0.0, 3.0);
        let route = optimize_route(&[a.clone(), c.clone(), b.clone()]);

        assert_eq!(ids(&route), vec!["A", "B", "C"]);

        let ab = driving_minutes(haversine_km(
            a.coordinate.unwrap(),
            b.coordinate.unwrap(),
        ));
        let bc = driving_minutes(haversine_km(
            b.coordinate.unwrap(),
            c.coordinate.unwrap(),
        ));
        assert_eq!(route.total_driving_time, ab + bc);
        assert_eq!(route.total_work_time, 3 * 45);
        assert_eq!(route.total_time, route.total_driving_time + route.total_work_time);
    }

    #[test]
    fn all_unlocated_preserves_input_order() {
        let stops = vec![unlocated("X"), unlocated("Y"), unlocated("Z")];
        let route = optimize_route(&stops);
        assert_eq!(ids(&route), vec!["X", "Y", "Z"]);
        assert_eq!(route.total_driving_time, 0);
        assert_eq!(route.total_work_time, 3 * 45);
    }

    #[test]
    fn unlocated_stops_are_appended_after_located_ones() {
        let stops = vec![
            located("A", 48.0, 16.0),
            unlocated("U1"),
            located("B", 48.01, 16.0),
            unlocated("U2"),
        ];
        let route = optimize_route(&stops);
        assert_eq!(ids(&route), vec!["A", "B", "U1", "U2"]);
        assert_eq!(route.unlocated(), vec!["U1", "U2"]);
    }

    #[test]
    fn order_is_a_permutation_of_input_ids() {
        let stops = vec![
            located("M1", 48.21, 16.37),
            located("M2", 48.19, 16.34),
            unlocated("M3"),
            located("M4", 48.25, 16.41),
            located("M5", 48.18, 16.30),
        ];
        let route = optimize_route(&stops);

        let mut input_ids: Vec<&str> = stops.iter().map(|s| s.id.as_str()).collect();
        let mut order_ids = ids(&route);
        input_ids.sort_unstable();
        order_ids.sort_unstable();
        assert_eq!(input_ids, order_ids);
        assert_eq!(route.optimized_order.len(), stops.len());
    }

    #[test]
    fn totals_always_add_up() {
        let stops = vec![
            located("M1", 47.8, 13.0),
            located("M2", 48.3, 14.3),
            located("M3", 47.1, 15.4),
        ];
        let route = optimize_route(&stops);
        assert_eq!(
            route.total_time,
            route.total_driving_time + route.total_work_time
        );
    }

    #[test]
    fn legs_skip_distance_for_unlocated_ends() {
        let stops = vec![
            located("A", 48.0, 16.0),
            located("B", 48.02, 16.0),
            unlocated("U"),
        ];
        let route = optimize_route(&stops);
        let legs = route.legs();
        assert_eq!(legs.len(), 2);
        assert!(legs[0].distance_km.is_some());
        assert!(legs[0].driving_minutes >= 5);
        assert_eq!(legs[1].to_id, "U");
        assert!(legs[1].distance_km.is_none());
        assert_eq!(legs[1].driving_minutes, 0);
    }

    #[test]
    fn identical_coordinates_cost_buffer_only() {
        let stops = vec![located("A", 48.2, 16.3), located("B", 48.2, 16.3)];
        let route = optimize_route(&stops);
        assert_eq!(route.total_driving_time, 5);
    }

    #[test]
    fn route_serializes_with_snake_case_fields() {
        let route = optimize_route(&[located("M1", 48.2, 16.3)]);
        let json = serde_json::to_value(&route).unwrap();
        assert_eq!(json["total_work_time"], 45);
        assert_eq!(json["optimized_order"][0], "M1");
    }
}
