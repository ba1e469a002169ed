//! HTTP client for the distance-matrix API.
//!
//! Wraps `reqwest` with API key management and typed response
//! deserialization. Every lookup is a single attempt; the operator retries
//! by re-running the check. Element-level failures (`NOT_FOUND`,
//! `ZERO_RESULTS`) are data, not errors: they come back as a
//! [`DrivingTimeResult`] with a non-`OK` status.

use std::time::Duration;

use futures::future::join_all;
use reqwest::{Client, Url};
use tracing::warn;

use crate::error::MapsError;
use crate::types::{DrivingTimePair, DrivingTimeResult, MatrixResponse};

const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com/maps/api/distancematrix/json";

/// Client for the distance-matrix API.
///
/// Use [`DrivingTimesClient::new`] for production or
/// [`DrivingTimesClient::with_base_url`] to point at a mock server in tests.
#[derive(Debug)]
pub struct DrivingTimesClient {
    client: Client,
    api_key: String,
    base_url: Url,
}

impl DrivingTimesClient {
    /// Creates a new client pointed at the production API.
    ///
    /// # Errors
    ///
    /// Returns [`MapsError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(api_key: &str, timeout_secs: u64, user_agent: &str) -> Result<Self, MapsError> {
        Self::with_base_url(api_key, timeout_secs, user_agent, DEFAULT_BASE_URL)
    }

    /// Creates a new client with a custom endpoint URL (for testing with
    /// wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`MapsError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`MapsError::ApiError`] if `base_url` is
    /// not a valid URL.
    pub fn with_base_url(
        api_key: &str,
        timeout_secs: u64,
        user_agent: &str,
        base_url: &str,
    ) -> Result<Self, MapsError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        let base_url = Url::parse(base_url)
            .map_err(|e| MapsError::ApiError(format!("invalid base URL '{base_url}': {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            base_url,
        })
    }

    /// Looks up a whole batch concurrently, one result slot per pair in the
    /// same order. A pair whose lookup fails outright occupies its slot with
    /// status `"ERROR"` rather than sinking the batch.
    pub async fn driving_times(&self, pairs: &[DrivingTimePair]) -> Vec<DrivingTimeResult> {
        let lookups = pairs.iter().map(|pair| async move {
            match self.driving_time(pair).await {
                Ok(result) => result,
                Err(err) => {
                    warn!(
                        origin = %pair.origin_address,
                        destination = %pair.destination_address,
                        error = %err,
                        "driving time lookup failed"
                    );
                    DrivingTimeResult::failed("ERROR")
                }
            }
        });
        join_all(lookups).await
    }

    /// Looks up the road driving time for one address pair. A single
    /// attempt: failures are reported, never retried.
    ///
    /// # Errors
    ///
    /// - [`MapsError::ApiError`] if the API rejects the request as a whole.
    /// - [`MapsError::QuotaExceeded`] when the query quota is exhausted.
    /// - [`MapsError::Http`] on network failure or non-2xx HTTP status.
    /// - [`MapsError::Deserialize`] if the response does not match the
    ///   expected shape.
    pub async fn driving_time(
        &self,
        pair: &DrivingTimePair,
    ) -> Result<DrivingTimeResult, MapsError> {
        let url = self.build_url(pair);
        let response = self.client.get(url).send().await?;
        let response = response.error_for_status()?;
        let body = response.text().await?;

        let matrix: MatrixResponse =
            serde_json::from_str(&body).map_err(|e| MapsError::Deserialize {
                context: format!(
                    "driving time {} -> {}",
                    pair.origin_address, pair.destination_address
                ),
                source: e,
            })?;

        match matrix.status.as_str() {
            "OK" => {}
            "OVER_QUERY_LIMIT" | "OVER_DAILY_LIMIT" => {
                return Err(MapsError::QuotaExceeded(
                    matrix.error_message.unwrap_or(matrix.status),
                ));
            }
            _ => {
                let detail = matrix
                    .error_message
                    .map_or(matrix.status.clone(), |msg| {
                        format!("{}: {msg}", matrix.status)
                    });
                return Err(MapsError::ApiError(detail));
            }
        }

        let element = matrix
            .rows
            .into_iter()
            .next()
            .and_then(|row| row.elements.into_iter().next());

        Ok(match element {
            Some(el) if el.status == "OK" => DrivingTimeResult {
                status: el.status,
                duration_seconds: el.duration.as_ref().map(|d| d.value),
                duration_text: el.duration.map(|d| d.text),
                distance_text: el.distance.map(|d| d.text),
            },
            Some(el) => DrivingTimeResult::failed(&el.status),
            None => DrivingTimeResult::failed("UNKNOWN"),
        })
    }

    /// Builds the full request URL with properly percent-encoded query
    /// parameters.
    fn build_url(&self, pair: &DrivingTimePair) -> Url {
        let mut url = self.base_url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("origins", &pair.origin_address);
            pairs.append_pair("destinations", &pair.destination_address);
            pairs.append_pair("mode", "driving");
            pairs.append_pair("units", "metric");
            pairs.append_pair("language", "de");
            pairs.append_pair("key", &self.api_key);
        }
        url
    }
}
