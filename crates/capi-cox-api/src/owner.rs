//! Projections of the owning Cluster API objects.
//!
//! The generic `Cluster` and `Machine` resources live in the external
//! framework; the reconcilers only ever read a handful of their fields, so
//! the embedding layer hands us these trimmed-down views.

use serde::{Deserialize, Serialize};

/// The owning Cluster API `Cluster`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    pub name: String,

    #[serde(default)]
    pub namespace: String,

    /// True once the cluster's infrastructure (our `CoxCluster`) reports
    /// ready. Machines do not provision before this.
    #[serde(default)]
    pub infrastructure_ready: bool,
}

/// The owning Cluster API `Machine`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Machine {
    pub name: String,

    #[serde(default)]
    pub namespace: String,

    /// Name of the cluster this machine belongs to.
    #[serde(default)]
    pub cluster_name: String,

    /// Secret holding the bootstrap (user-data) payload. Machines do not
    /// provision before the bootstrap provider has populated this.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bootstrap_secret_name: Option<String>,
}
