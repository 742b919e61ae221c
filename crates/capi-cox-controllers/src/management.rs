//! Read access to the management cluster.
//!
//! The controller framework owns the actual object store; reconcilers only
//! need a few targeted reads, expressed here as a trait so tests can serve
//! them from memory.

use crate::error::Result;
use async_trait::async_trait;
use capi_cox_api::{CoxCluster, CoxMachine};
use capi_cox_cloud::Credentials;

#[async_trait]
pub trait ManagementApi: Send + Sync {
    /// CoxEdge credentials from the named secret.
    async fn credentials(&self, namespace: &str, secret: &str) -> Result<Credentials>;

    /// Bootstrap (cloud-init) payload from the named secret's `value` key.
    async fn bootstrap_data(&self, namespace: &str, secret: &str) -> Result<String>;

    /// All `CoxMachine` resources in a namespace.
    async fn list_cox_machines(&self, namespace: &str) -> Result<Vec<CoxMachine>>;
}

/// Credentials for a cluster: its referenced secret when it names one,
/// otherwise the controller-wide defaults from the environment.
pub async fn resolve_credentials(
    management: &dyn ManagementApi,
    cox_cluster: &CoxCluster,
) -> Result<Credentials> {
    match &cox_cluster.spec.credentials {
        Some(secret) => {
            management
                .credentials(&cox_cluster.metadata.namespace, secret)
                .await
        }
        None => Ok(Credentials::from_env()?),
    }
}
