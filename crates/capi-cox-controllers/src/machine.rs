//! `CoxMachine` reconciler.
//!
//! Drives a machine from "no provider ID" to "ready" against the CoxEdge
//! workload API. Provisioning is asynchronous on the remote side, so the
//! reconciler records the task handle in status and requeues until the
//! task settles; it never blocks a reconcile pass on remote progress.

use crate::error::Result;
use crate::management::ManagementApi;
use crate::outcome::Outcome;
use crate::scope::MachineScope;
use capi_cox_api::{MachineAddress, MachineAddressType, MACHINE_FINALIZER};
use capi_cox_cloud::{
    CreateWorkloadRequest, InstanceData, TaskStatus, WorkloadApi,
};
use std::sync::Arc;
use std::time::Duration;

pub const MACHINE_READY_CONDITION: &str = "CoxMachineReady";

pub const WAITING_FOR_CLUSTER_INFRASTRUCTURE_REASON: &str = "WaitingForClusterInfrastructure";
pub const WAITING_FOR_BOOTSTRAP_DATA_REASON: &str = "WaitingForBootstrapData";
pub const MACHINE_ERRORED_REASON: &str = "MachineErroredState";
pub const WORKLOAD_CREATE_FAILED_REASON: &str = "WorkloadCreateFailed";
pub const TASK_PENDING_REASON: &str = "ProvisioningTaskPending";
pub const TASK_FAILED_REASON: &str = "ProvisioningTaskFailed";
pub const INSTANCE_NOT_READY_REASON: &str = "InstanceNotReady";

/// Requeue delay while waiting on remote progress.
const RETRY_INTERVAL: Duration = Duration::from_secs(60);

/// Requeue delay once the machine is ready; catches out-of-band drift.
const STEADY_INTERVAL: Duration = Duration::from_secs(300);

/// Where the machine's workload stands after resolving remote state.
enum Resolution {
    /// Workload exists and the provider ID points at it.
    Linked(String),
    /// A provisioning task is still running.
    InProgress,
    /// Provisioning failed terminally; status carries the error.
    Halted,
}

pub struct MachineReconciler {
    api: Arc<dyn WorkloadApi>,
    management: Arc<dyn ManagementApi>,
}

impl MachineReconciler {
    pub fn new(api: Arc<dyn WorkloadApi>, management: Arc<dyn ManagementApi>) -> Self {
        Self { api, management }
    }

    pub async fn reconcile(&self, scope: &mut MachineScope) -> Result<Outcome> {
        if scope.cox_machine.metadata.deletion_requested() {
            return self.reconcile_delete(scope).await;
        }
        self.reconcile_normal(scope).await
    }

    async fn reconcile_normal(&self, scope: &mut MachineScope) -> Result<Outcome> {
        if let Some(message) = scope.error_message().map(str::to_string) {
            tracing::warn!(machine = scope.name(), %message, "machine is in an errored state");
            scope.cox_machine.status.conditions.mark_false(
                MACHINE_READY_CONDITION,
                MACHINE_ERRORED_REASON,
                &message,
            );
            return Ok(Outcome::done());
        }

        scope.cox_machine.metadata.add_finalizer(MACHINE_FINALIZER);

        if !scope.cluster.infrastructure_ready {
            tracing::info!(machine = scope.name(), "cluster infrastructure is not ready yet");
            scope.cox_machine.status.conditions.mark_false(
                MACHINE_READY_CONDITION,
                WAITING_FOR_CLUSTER_INFRASTRUCTURE_REASON,
                "cluster infrastructure is not ready",
            );
            return Ok(Outcome::after(RETRY_INTERVAL));
        }

        let Some(bootstrap_secret) = scope.machine.bootstrap_secret_name.clone() else {
            tracing::info!(machine = scope.name(), "bootstrap data is not available yet");
            scope.cox_machine.status.conditions.mark_false(
                MACHINE_READY_CONDITION,
                WAITING_FOR_BOOTSTRAP_DATA_REASON,
                "bootstrap provider has not published a data secret",
            );
            return Ok(Outcome::after(RETRY_INTERVAL));
        };

        let workload_id = match self.resolve_workload(scope, &bootstrap_secret).await? {
            Resolution::Linked(id) => id,
            Resolution::InProgress => {
                scope.cox_machine.status.conditions.mark_false(
                    MACHINE_READY_CONDITION,
                    TASK_PENDING_REASON,
                    "provisioning task has not finished",
                );
                return Ok(Outcome::after(RETRY_INTERVAL));
            }
            Resolution::Halted => return Ok(Outcome::done()),
        };

        let instances = match self.api.list_instances(&workload_id).await {
            Ok(instances) => instances,
            Err(err) => {
                scope.cox_machine.status.conditions.mark_false(
                    MACHINE_READY_CONDITION,
                    INSTANCE_NOT_READY_REASON,
                    &err.to_string(),
                );
                return Err(err.into());
            }
        };
        let Some(instance) = instances.iter().find(|i| i.is_running()) else {
            tracing::info!(machine = scope.name(), %workload_id, "no running instance yet");
            scope.cox_machine.status.ready = false;
            scope.cox_machine.status.conditions.mark_false(
                MACHINE_READY_CONDITION,
                INSTANCE_NOT_READY_REASON,
                "workload has no running instance",
            );
            return Ok(Outcome::after(RETRY_INTERVAL));
        };

        scope.cox_machine.status.addresses = addresses_of(instance);
        scope.cox_machine.status.ready = true;
        scope
            .cox_machine
            .status
            .conditions
            .mark_true(MACHINE_READY_CONDITION);

        tracing::info!(machine = scope.name(), %workload_id, "machine is ready");
        Ok(Outcome::after(STEADY_INTERVAL))
    }

    /// Find or start the workload backing this machine.
    async fn resolve_workload(
        &self,
        scope: &mut MachineScope,
        bootstrap_secret: &str,
    ) -> Result<Resolution> {
        if let Some(id) = scope.workload_id() {
            return Ok(Resolution::Linked(id.to_string()));
        }

        // An outstanding task decides before anything else: its result is
        // the only way to learn the workload ID of an in-flight create.
        if let Some(task_id) = scope.cox_machine.status.task_id.clone() {
            let task = match self.api.get_task(&task_id).await {
                Ok(task) => task,
                Err(err) => {
                    scope.cox_machine.status.conditions.mark_false(
                        MACHINE_READY_CONDITION,
                        TASK_PENDING_REASON,
                        &err.to_string(),
                    );
                    return Err(err.into());
                }
            };
            scope.cox_machine.status.task_status = Some(task.status);
            return Ok(match task.status {
                TaskStatus::Success => {
                    let workload_id = task.workload_id().to_string();
                    scope.set_provider_id(&workload_id);
                    Resolution::Linked(workload_id)
                }
                TaskStatus::Failure => {
                    let message = format!("provisioning task {task_id} failed");
                    tracing::error!(machine = scope.name(), %task_id, "provisioning task failed");
                    scope.cox_machine.status.error_message = Some(message.clone());
                    scope.cox_machine.status.conditions.mark_false(
                        MACHINE_READY_CONDITION,
                        TASK_FAILED_REASON,
                        &message,
                    );
                    Resolution::Halted
                }
                TaskStatus::Pending => Resolution::InProgress,
            });
        }

        // Adopt a workload left over from an interrupted earlier pass.
        match self.api.get_workload_by_name(scope.name()).await {
            Ok(workload) => {
                scope.set_provider_id(&workload.id);
                return Ok(Resolution::Linked(workload.id));
            }
            Err(err) if err.is_not_found() => {}
            Err(err) => return Err(err.into()),
        }

        let user_data = self
            .management
            .bootstrap_data(scope.namespace(), bootstrap_secret)
            .await?;

        tracing::info!(machine = scope.name(), "creating workload");
        let handle = match self
            .api
            .create_workload(build_create_request(scope, user_data))
            .await
        {
            Ok(handle) => handle,
            Err(err) => {
                scope.cox_machine.status.conditions.mark_false(
                    MACHINE_READY_CONDITION,
                    WORKLOAD_CREATE_FAILED_REASON,
                    &err.to_string(),
                );
                return Err(err.into());
            }
        };
        scope.cox_machine.status.task_id = Some(handle.task_id);
        scope.cox_machine.status.task_status = Some(TaskStatus::Pending);
        Ok(Resolution::InProgress)
    }

    async fn reconcile_delete(&self, scope: &mut MachineScope) -> Result<Outcome> {
        if !scope.cox_machine.metadata.has_finalizer(MACHINE_FINALIZER) {
            return Ok(Outcome::done());
        }

        let workload_id = if let Some(id) = scope.workload_id() {
            Some(id.to_string())
        } else if let Some(task_id) = scope.cox_machine.status.task_id.clone() {
            // A create may still be in flight; deleting concurrently would
            // race the task, so wait for it to settle first.
            let task = self.api.get_task(&task_id).await?;
            scope.cox_machine.status.task_status = Some(task.status);
            match task.status {
                TaskStatus::Pending => {
                    tracing::info!(machine = scope.name(), %task_id, "waiting for outstanding task before delete");
                    return Ok(Outcome::after(RETRY_INTERVAL));
                }
                TaskStatus::Success => Some(task.workload_id().to_string()),
                TaskStatus::Failure => None,
            }
        } else {
            match self.api.get_workload_by_name(scope.name()).await {
                Ok(workload) => Some(workload.id),
                Err(err) if err.is_not_found() => None,
                Err(err) => return Err(err.into()),
            }
        };

        if let Some(id) = workload_id {
            match self.api.delete_workload(&id).await {
                Ok(_) => tracing::info!(machine = scope.name(), workload_id = %id, "workload delete accepted"),
                Err(err) if err.is_not_found() => {}
                Err(err) => return Err(err.into()),
            }
        }

        scope
            .cox_machine
            .metadata
            .remove_finalizer(MACHINE_FINALIZER);
        Ok(Outcome::done())
    }
}

fn build_create_request(scope: &MachineScope, user_data: String) -> CreateWorkloadRequest {
    let spec = &scope.cox_machine.spec;
    CreateWorkloadRequest {
        name: scope.name().to_string(),
        workload_type: spec.workload_type.clone(),
        image: spec.image.clone(),
        add_anycast_ip_address: spec.add_anycast_ip_address,
        ports: spec.ports.clone(),
        first_boot_ssh_key: spec.ssh_authorized_keys.join("\n"),
        deployments: spec.deployments.clone(),
        specs: spec.specs.clone(),
        persistent_storages: spec.persistent_storages.clone(),
        commands: spec.commands.clone(),
        user_data,
        ..Default::default()
    }
}

fn addresses_of(instance: &InstanceData) -> Vec<MachineAddress> {
    let mut addresses = Vec::new();
    if !instance.public_ip_address.is_empty() {
        addresses.push(MachineAddress {
            address_type: MachineAddressType::ExternalIP,
            address: instance.public_ip_address.clone(),
        });
    }
    if !instance.ip_address.is_empty() {
        addresses.push(MachineAddress {
            address_type: MachineAddressType::InternalIP,
            address: instance.ip_address.clone(),
        });
    }
    addresses
}
