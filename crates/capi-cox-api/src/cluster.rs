//! `CoxCluster` resource types.

use crate::condition::Conditions;
use crate::meta::ObjectMeta;
use serde::{Deserialize, Serialize};

/// Finalizer blocking `CoxCluster` deletion until the control-plane
/// load balancer has been torn down.
pub const CLUSTER_FINALIZER: &str = "coxcluster.infrastructure.cluster.x-k8s.io";

/// Host/port pair used to reach a cluster's control plane.
///
/// Once published together with `status.ready == true` the endpoint is
/// immutable: downstream consumers cache it for the life of the cluster.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEndpoint {
    #[serde(default)]
    pub host: String,

    #[serde(default)]
    pub port: u16,
}

impl ApiEndpoint {
    pub fn is_set(&self) -> bool {
        !self.host.is_empty() && self.port != 0
    }
}

/// Desired state of the cluster's control-plane load balancer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoxLoadBalancerSpec {
    /// Name override; derived from the cluster name when empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Image override for the load-balancer container.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    #[serde(default, rename = "port", skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<u16>,

    /// CoxEdge points of presence the load balancer is deployed to.
    #[serde(default, rename = "pop", skip_serializing_if = "Vec::is_empty")]
    pub pops: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoxLoadBalancerStatus {
    #[serde(default, rename = "publicIP", skip_serializing_if = "Option::is_none")]
    pub public_ip: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoxClusterSpec {
    #[serde(default)]
    pub control_plane_endpoint: ApiEndpoint,

    /// Name of the secret holding CoxEdge credentials for this cluster.
    /// Falls back to the controller-wide defaults when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<String>,

    #[serde(default)]
    pub control_plane_load_balancer: CoxLoadBalancerSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoxClusterStatus {
    #[serde(default)]
    pub ready: bool,

    #[serde(default, skip_serializing_if = "Conditions::is_empty")]
    pub conditions: Conditions,

    #[serde(default)]
    pub control_plane_load_balancer: CoxLoadBalancerStatus,
}

/// Provider-side view of one cluster's infrastructure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoxCluster {
    pub metadata: ObjectMeta,

    #[serde(default)]
    pub spec: CoxClusterSpec,

    #[serde(default)]
    pub status: CoxClusterStatus,
}
