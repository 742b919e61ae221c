//! `CoxMachine` resource types.

use crate::condition::Conditions;
use crate::meta::ObjectMeta;
use capi_cox_cloud::{Deployment, PersistentStorage, Port, TaskStatus};
use serde::{Deserialize, Serialize};

/// Finalizer blocking `CoxMachine` deletion until the remote workload has
/// been deleted.
pub const MACHINE_FINALIZER: &str = "coxmachine.infrastructure.cluster.x-k8s.io";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MachineAddressType {
    ExternalIP,
    InternalIP,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineAddress {
    #[serde(rename = "type")]
    pub address_type: MachineAddressType,
    pub address: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoxMachineSpec {
    /// Unique identifier assigned by the provider, in the form
    /// `coxedge://<workload-id>`. Immutable once set.
    #[serde(default, rename = "providerID", skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,

    /// CoxEdge workload type, `VM` or `CONTAINER`.
    #[serde(default, rename = "type", skip_serializing_if = "String::is_empty")]
    pub workload_type: String,

    /// VM image or container image reference.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub image: String,

    #[serde(default, rename = "addAnyCastIPAddress")]
    pub add_anycast_ip_address: bool,

    /// Storage volumes mounted into the workload's instances.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub persistent_storages: Vec<PersistentStorage>,

    /// Ports exposed by the workload's instances.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<Port>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ssh_authorized_keys: Vec<String>,

    /// Regional deployment and autoscaling targets.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deployments: Vec<Deployment>,

    /// CoxEdge spec tier, e.g. `SP-5`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub specs: String,

    /// Container entrypoint commands.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoxMachineStatus {
    /// Handle of the outstanding provisioning task, if any.
    #[serde(default, rename = "taskID", skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_status: Option<TaskStatus>,

    #[serde(default)]
    pub ready: bool,

    /// Sticky terminal error. While set, reconciliation halts until the
    /// message is cleared externally.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub addresses: Vec<MachineAddress>,

    #[serde(default, skip_serializing_if = "Conditions::is_empty")]
    pub conditions: Conditions,
}

/// Provider-side view of one compute instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoxMachine {
    pub metadata: ObjectMeta,

    #[serde(default)]
    pub spec: CoxMachineSpec,

    #[serde(default)]
    pub status: CoxMachineStatus,
}

impl CoxMachine {
    /// External IP published for this machine, if any.
    pub fn external_address(&self) -> Option<&str> {
        self.status
            .addresses
            .iter()
            .find(|a| a.address_type == MachineAddressType::ExternalIP)
            .map(|a| a.address.as_str())
    }
}
