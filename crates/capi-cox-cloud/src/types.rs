//! Wire types for the CoxEdge workload API.
//!
//! Field names mirror the JSON the portal emits; everything that the API
//! may omit carries a default so partial payloads still decode.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const TYPE_VM: &str = "VM";
pub const TYPE_CONTAINER: &str = "CONTAINER";

pub const PORT_PROTOCOL_TCP: &str = "TCP";

/// Spec tiers available on CoxEdge.
pub const SPEC_SP1: &str = "SP-1";
pub const SPEC_SP2: &str = "SP-2";
pub const SPEC_SP3: &str = "SP-3";
pub const SPEC_SP4: &str = "SP-4";
pub const SPEC_SP5: &str = "SP-5";

/// Status an instance reports once it serves traffic.
pub const INSTANCE_STATUS_RUNNING: &str = "RUNNING";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Port {
    pub protocol: String,

    pub public_port: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub public_port_desc: String,
}

impl Port {
    pub fn tcp(public_port: impl Into<String>) -> Self {
        Self {
            protocol: PORT_PROTOCOL_TCP.to_string(),
            public_port: public_port.into(),
            public_port_desc: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentVariable {
    pub key: String,
    pub value: String,
}

/// Regional deployment target with optional autoscaling bounds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// CoxEdge points of presence this deployment covers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pops: Vec<String>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub enable_auto_scaling: bool,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub instances_per_pop: String,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub cpu_utilization: i32,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub min_instances_per_pop: i32,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub max_instances_per_pop: i32,
}

fn is_zero(v: &i32) -> bool {
    *v == 0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistentStorage {
    pub path: String,
    pub size: String,
}

/// A workload as returned by the API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadData {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub stack_id: String,

    #[serde(default)]
    pub slug: String,

    #[serde(default)]
    pub version: String,

    #[serde(default, rename = "type")]
    pub workload_type: String,

    #[serde(default)]
    pub network: String,

    #[serde(default)]
    pub cpu: String,

    #[serde(default)]
    pub memory: String,

    #[serde(default)]
    pub is_remote_management_enabled: bool,

    #[serde(default)]
    pub image: String,

    #[serde(default)]
    pub add_image_pull_credentials_option: bool,

    #[serde(default)]
    pub environment_variables: Vec<EnvironmentVariable>,

    #[serde(default)]
    pub secret_environment_variables: Vec<EnvironmentVariable>,

    #[serde(default, rename = "addAnyCastIpAddress")]
    pub add_anycast_ip_address: bool,

    /// Stable anycast IP routed to the nearest healthy instance.
    #[serde(default, rename = "anycastIpAddress")]
    pub anycast_ip_address: String,

    #[serde(default)]
    pub first_boot_ssh_key: String,

    #[serde(default)]
    pub specs: String,

    #[serde(default)]
    pub deployments: Vec<Deployment>,

    #[serde(default)]
    pub status: String,

    #[serde(default)]
    pub created: Option<DateTime<Utc>>,

    #[serde(default)]
    pub ports: Vec<Port>,

    #[serde(default)]
    pub persistence_storage_total_size: i64,
}

impl WorkloadData {
    pub fn environment_variable(&self, key: &str) -> Option<&str> {
        self.environment_variables
            .iter()
            .find(|kv| kv.key == key)
            .map(|kv| kv.value.as_str())
    }
}

/// Payload for creating a workload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWorkloadRequest {
    pub name: String,

    #[serde(rename = "type")]
    pub workload_type: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub image: String,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub add_image_pull_credentials_option: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub environment_variables: Vec<EnvironmentVariable>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secret_environment_variables: Vec<EnvironmentVariable>,

    #[serde(default, rename = "addAnyCastIpAddress", skip_serializing_if = "std::ops::Not::not")]
    pub add_anycast_ip_address: bool,

    #[serde(default)]
    pub persistence_storage_total_size: i64,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<Port>,

    #[serde(default)]
    pub first_boot_ssh_key: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deployments: Vec<Deployment>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub specs: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub persistent_storages: Vec<PersistentStorage>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub container_username: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub container_password: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub container_server: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user_data: String,
}

/// A concrete running replica of a workload in one point of presence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceData {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub stack_id: String,

    #[serde(default)]
    pub workload_id: String,

    #[serde(default)]
    pub workload_name: String,

    #[serde(default)]
    pub name: String,

    #[serde(default, rename = "type")]
    pub instance_type: String,

    /// Internal IP.
    #[serde(default)]
    pub ip_address: String,

    #[serde(default)]
    pub public_ip_address: String,

    #[serde(default)]
    pub location: String,

    #[serde(default)]
    pub created: Option<DateTime<Utc>>,

    #[serde(default)]
    pub started_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub status: String,
}

impl InstanceData {
    pub fn is_running(&self) -> bool {
        self.status == INSTANCE_STATUS_RUNNING
    }
}

/// Status of an asynchronous provisioning task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    #[serde(rename = "SUCCESS")]
    Success,
    #[serde(rename = "FAILURE")]
    Failure,
    /// Anything that is not terminal yet.
    #[serde(other, rename = "PENDING")]
    Pending,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResult {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub workload_id: String,

    #[serde(default)]
    pub stack_id: String,

    #[serde(default)]
    pub action: String,

    #[serde(default)]
    pub network_policy_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskData {
    #[serde(default)]
    pub id: String,

    pub status: TaskStatus,

    #[serde(default)]
    pub created: Option<DateTime<Utc>>,

    #[serde(default)]
    pub result: TaskResult,
}

impl TaskData {
    /// ID of the workload the task produced, once it has one.
    pub fn workload_id(&self) -> &str {
        if !self.result.workload_id.is_empty() {
            &self.result.workload_id
        } else {
            &self.result.id
        }
    }
}

/// Handle returned by every mutating workload call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskHandle {
    #[serde(default, rename = "taskId")]
    pub task_id: String,

    #[serde(default)]
    pub task_status: String,
}

// Response envelopes: every payload is wrapped in a `data` field.

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WorkloadEnvelope {
    #[serde(default)]
    pub data: WorkloadData,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WorkloadsEnvelope {
    #[serde(default)]
    pub data: Vec<WorkloadData>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct InstancesEnvelope {
    #[serde(default)]
    pub data: Vec<InstanceData>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TaskEnvelope {
    pub data: TaskData,
}

#[cfg(test)]
mod tests {
    use super::*;

    // Captured from a live portal response.
    const WORKLOAD_FIXTURE: &str = r#"{"name":"testk0s","stackId":"58191cc3-fe0d-4fd6-9557-28f1cffd1900","slug":"testk0s","version":"1","created":"2021-11-30T19:52:38.388831514Z","type":"VM","network":"default","cpu":"8","memory":"32Gi","isRemoteManagementEnabled":false,"image":"stackpath-edge/centos-7:v202103021226","addImagePullCredentialsOption":false,"environmentVariables":[],"secretEnvironmentVariables":[],"addAnyCastIpAddress":true,"anycastIpAddress":"185.85.196.18","firstBootSshKey":"ssh-rsa AAAA","specs":"SP-5","persistenceStorageTotalSize":0,"userData":"","deployments":[{"name":"testk0s","pops":["WAW"],"enableAutoScaling":false,"instancesPerPop":"1","cpuUtilization":0}],"id":"b17dd1cd-c50d-464f-9497-71b44b35ef89","status":"ACTIVE"}"#;

    #[test]
    fn decodes_portal_workload_payload() {
        let workload: WorkloadData = serde_json::from_str(WORKLOAD_FIXTURE).unwrap();
        assert_eq!(workload.id, "b17dd1cd-c50d-464f-9497-71b44b35ef89");
        assert_eq!(workload.workload_type, TYPE_VM);
        assert_eq!(workload.anycast_ip_address, "185.85.196.18");
        assert_eq!(workload.deployments[0].pops, vec!["WAW"]);
        assert!(workload.ports.is_empty());
    }

    #[test]
    fn task_status_tolerates_unknown_values() {
        let task: TaskData = serde_json::from_str(
            r#"{"id":"t-1","status":"SCHEDULED","result":{"workloadId":"wl-1"}}"#,
        )
        .unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.workload_id(), "wl-1");
    }

    #[test]
    fn task_result_falls_back_to_object_id() {
        let task: TaskData =
            serde_json::from_str(r#"{"id":"t-2","status":"SUCCESS","result":{"id":"obj-9"}}"#)
                .unwrap();
        assert_eq!(task.workload_id(), "obj-9");
    }
}
