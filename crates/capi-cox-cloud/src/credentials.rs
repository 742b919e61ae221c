//! CoxEdge credential configuration.
//!
//! Credentials are resolved once (at process startup or per reconcile from
//! a referenced secret) and passed down explicitly; business logic never
//! reads the environment on its own.

use crate::error::{CoxError, Result};

pub const ENV_COX_API_KEY: &str = "COX_API_KEY";
pub const ENV_COX_SERVICE: &str = "COX_SERVICE";
pub const ENV_COX_ENVIRONMENT: &str = "COX_ENVIRONMENT";
pub const ENV_COX_ORGANIZATION: &str = "COX_ORGANIZATION";
pub const ENV_COX_API_BASE_URL: &str = "COX_API_BASE_URL";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub service: String,
    pub environment: String,
    pub organization: Option<String>,
    /// Override for the portal base URL, mainly for test endpoints.
    pub base_url: Option<String>,
}

impl Credentials {
    pub fn new(
        api_key: impl Into<String>,
        service: impl Into<String>,
        environment: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            service: service.into(),
            environment: environment.into(),
            organization: None,
            base_url: None,
        }
    }

    /// Read credentials from the process environment.
    pub fn from_env() -> Result<Self> {
        let required = |key: &str| {
            std::env::var(key).map_err(|_| CoxError::MissingEnvVar(key.to_string()))
        };

        Ok(Self {
            api_key: required(ENV_COX_API_KEY)?,
            service: required(ENV_COX_SERVICE)?,
            environment: required(ENV_COX_ENVIRONMENT)?,
            organization: std::env::var(ENV_COX_ORGANIZATION).ok(),
            base_url: std::env::var(ENV_COX_API_BASE_URL).ok(),
        })
    }
}
