//! Provider operation seam.
//!
//! Reconcilers and the load-balancer layer talk to CoxEdge through this
//! trait so tests can run against an in-memory double instead of the
//! portal.

use crate::client::{shorten_name, WORKLOAD_NAME_LIMIT};
use crate::error::{CoxError, Result};
use crate::types::{CreateWorkloadRequest, InstanceData, TaskData, TaskHandle, WorkloadData};
use async_trait::async_trait;

#[async_trait]
pub trait WorkloadApi: Send + Sync {
    async fn get_workload(&self, id: &str) -> Result<WorkloadData>;

    async fn list_workloads(&self) -> Result<Vec<WorkloadData>>;

    /// Submit a create. The name is shortened before transmission; the
    /// returned handle must be polled via [`WorkloadApi::get_task`].
    async fn create_workload(&self, request: CreateWorkloadRequest) -> Result<TaskHandle>;

    async fn update_workload(&self, id: &str, workload: WorkloadData) -> Result<TaskHandle>;

    async fn delete_workload(&self, id: &str) -> Result<TaskHandle>;

    async fn list_instances(&self, workload_id: &str) -> Result<Vec<InstanceData>>;

    async fn get_task(&self, id: &str) -> Result<TaskData>;

    /// Look up a workload by display name.
    ///
    /// The remote store only holds shortened names, so the same transform
    /// used at creation time is applied before comparing.
    async fn get_workload_by_name(&self, name: &str) -> Result<WorkloadData> {
        let short = shorten_name(name, WORKLOAD_NAME_LIMIT);
        self.list_workloads()
            .await?
            .into_iter()
            .find(|w| w.name == short)
            .ok_or(CoxError::NotFound)
    }
}
