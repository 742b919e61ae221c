//! CoxEdge API error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoxError {
    /// The remote object does not exist. Never fatal: callers branch on
    /// this to decide between "needs creation" and "already deleted".
    #[error("resource not found")]
    NotFound,

    /// The API answered with a non-success status. The raw body is kept
    /// because CoxEdge error payloads are not reliably structured JSON.
    #[error("CoxEdge API returned status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to decode API response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid base URL '{0}'")]
    InvalidBaseUrl(String),

    /// The workload exists but does not carry the reserved load-balancer
    /// environment variables.
    #[error("workload is not a load-balancer")]
    NotALoadBalancer,

    /// Changing a load-balancer port would require a network-policy update
    /// the CoxEdge API does not support in place.
    #[error("updating the load-balancer port is not supported")]
    PortUpdateNotSupported,

    #[error("environment variable '{0}' is not set")]
    MissingEnvVar(String),
}

impl CoxError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, CoxError::NotFound)
            || matches!(self, CoxError::Api { status: 404, .. })
    }
}

pub type Result<T> = std::result::Result<T, CoxError>;
