use thiserror::Error;

/// Errors returned by the distance-matrix client.
#[derive(Debug, Error)]
pub enum MapsError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API rejected the request as a whole (bad key, malformed request).
    #[error("distance matrix API error: {0}")]
    ApiError(String),

    /// The API reported its query quota as exhausted.
    #[error("distance matrix quota exhausted: {0}")]
    QuotaExceeded(String),

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}
