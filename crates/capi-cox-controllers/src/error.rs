use capi_cox_cloud::CoxError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Cloud(#[from] CoxError),

    /// The management cluster could not serve a read the reconciler needs.
    #[error("management api: {0}")]
    Management(String),

    #[error("bootstrap data: {0}")]
    Bootstrap(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, ControllerError>;
