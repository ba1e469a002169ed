//! Tour planning: the haversine route optimizer and the external
//! driving-time lookup.

use axum::{extract::State, Extension, Json};
use rover_maps::DrivingTimePair;
use rover_routing::{optimize_route, Coordinate, Route, RouteLeg, Stop};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState, ResponseMeta};

/// Matrix lookups fan out one upstream request per pair.
const MAX_DRIVING_TIME_PAIRS: usize = 25;

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(super) struct PlanStop {
    pub id: String,
    pub name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct PlanRequest {
    pub markets: Vec<PlanStop>,
}

#[derive(Debug, Deserialize)]
pub(super) struct DrivingTimesRequest {
    pub pairs: Vec<DrivingTimePair>,
}

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub(super) struct PlanData {
    #[serde(flatten)]
    route: Route,
    legs: Vec<RouteLeg>,
    /// Stops without coordinates, appended after the optimized part.
    unlocated: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct DrivingTimesData {
    results: Vec<rover_maps::DrivingTimeResult>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/routes/plan — nearest-neighbor ordering over the given stops.
/// Purely computational; an empty list yields an empty route.
#[allow(clippy::unused_async)]
pub(super) async fn plan_route(
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<PlanRequest>,
) -> Result<Json<ApiResponse<PlanData>>, ApiError> {
    let stops: Vec<Stop> = body
        .markets
        .into_iter()
        .map(|stop| Stop {
            id: stop.id,
            name: stop.name,
            coordinate: stop
                .latitude
                .zip(stop.longitude)
                .map(|(latitude, longitude)| Coordinate {
                    latitude,
                    longitude,
                }),
        })
        .collect();

    let route = optimize_route(&stops);
    let legs = route.legs();
    let unlocated = route.unlocated();

    Ok(Json(ApiResponse {
        data: PlanData {
            route,
            legs,
            unlocated,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/maps/driving-times — resolve driving estimates between
/// address pairs. Failed pairs come back with an error status instead
/// of failing the batch.
pub(super) async fn driving_times(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<DrivingTimesRequest>,
) -> Result<Json<ApiResponse<DrivingTimesData>>, ApiError> {
    let rid = &req_id.0;

    if body.pairs.is_empty() {
        return Err(ApiError::new(rid, "validation_error", "pairs must not be empty"));
    }
    if body.pairs.len() > MAX_DRIVING_TIME_PAIRS {
        return Err(ApiError::new(
            rid,
            "validation_error",
            format!("at most {MAX_DRIVING_TIME_PAIRS} pairs per request"),
        ));
    }

    let Some(ref client) = state.maps else {
        return Err(ApiError::new(
            rid,
            "internal_error",
            "driving time lookups are not configured",
        ));
    };

    let results = client.driving_times(&body.pairs).await;

    Ok(Json(ApiResponse {
        data: DrivingTimesData { results },
        meta: ResponseMeta::new(req_id.0),
    }))
}
