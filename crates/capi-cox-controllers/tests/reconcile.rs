//! End-to-end reconciler behavior against in-memory doubles.

use async_trait::async_trait;
use capi_cox_api::{
    Cluster, CoxCluster, CoxMachine, Machine, MachineAddress, MachineAddressType, ObjectMeta,
    CLUSTER_FINALIZER, CLUSTER_NAME_LABEL, CONTROL_PLANE_LABEL, MACHINE_FINALIZER,
};
use capi_cox_cloud::{
    shorten_name, CoxError, CreateWorkloadRequest, Credentials, InstanceData, TaskData,
    TaskHandle, TaskStatus, WorkloadApi, WorkloadData, WORKLOAD_NAME_LIMIT,
};
use capi_cox_api::ConditionStatus;
use capi_cox_controllers::cluster::LOAD_BALANCER_UPDATE_FAILED_REASON;
use capi_cox_controllers::machine::{INSTANCE_NOT_READY_REASON, MACHINE_ERRORED_REASON};
use capi_cox_controllers::{
    resolve_credentials, ClusterReconciler, ClusterScope, MachineReconciler, MachineScope,
    ManagementApi,
};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct CloudState {
    workloads: HashMap<String, WorkloadData>,
    instances: HashMap<String, Vec<InstanceData>>,
    tasks: HashMap<String, TaskData>,
    create_calls: usize,
    update_calls: usize,
    delete_calls: usize,
    next_id: usize,
    fail_instances: bool,
    fail_updates: bool,
}

/// In-memory CoxEdge double. Creates settle through a task the test
/// completes explicitly, mirroring the asynchronous portal behavior.
#[derive(Default)]
struct FakeCloud {
    state: Mutex<CloudState>,
}

impl FakeCloud {
    fn complete_task(&self, task_id: &str) {
        let mut state = self.state.lock().unwrap();
        let task = state.tasks.get_mut(task_id).unwrap();
        task.status = TaskStatus::Success;
    }

    fn add_instance(&self, workload_id: &str, status: &str, public_ip: &str, internal_ip: &str) {
        let mut state = self.state.lock().unwrap();
        state
            .instances
            .entry(workload_id.to_string())
            .or_default()
            .push(InstanceData {
                id: format!("{workload_id}-inst"),
                workload_id: workload_id.to_string(),
                public_ip_address: public_ip.to_string(),
                ip_address: internal_ip.to_string(),
                status: status.to_string(),
                ..Default::default()
            });
    }

    fn add_running_instance(&self, workload_id: &str, public_ip: &str, internal_ip: &str) {
        self.add_instance(workload_id, "RUNNING", public_ip, internal_ip);
    }

    fn set_instance_status(&self, workload_id: &str, status: &str) {
        let mut state = self.state.lock().unwrap();
        for instance in state.instances.entry(workload_id.to_string()).or_default() {
            instance.status = status.to_string();
        }
    }

    fn fail_instance_lists(&self) {
        self.state.lock().unwrap().fail_instances = true;
    }

    fn fail_updates(&self) {
        self.state.lock().unwrap().fail_updates = true;
    }

    fn workload_by_name(&self, name: &str) -> Option<WorkloadData> {
        let short = shorten_name(name, WORKLOAD_NAME_LIMIT);
        self.state
            .lock()
            .unwrap()
            .workloads
            .values()
            .find(|w| w.name == short)
            .cloned()
    }

    fn create_calls(&self) -> usize {
        self.state.lock().unwrap().create_calls
    }

    fn update_calls(&self) -> usize {
        self.state.lock().unwrap().update_calls
    }
}

#[async_trait]
impl WorkloadApi for FakeCloud {
    async fn get_workload(&self, id: &str) -> Result<WorkloadData, CoxError> {
        self.state
            .lock()
            .unwrap()
            .workloads
            .get(id)
            .cloned()
            .ok_or(CoxError::NotFound)
    }

    async fn list_workloads(&self) -> Result<Vec<WorkloadData>, CoxError> {
        Ok(self.state.lock().unwrap().workloads.values().cloned().collect())
    }

    async fn create_workload(
        &self,
        request: CreateWorkloadRequest,
    ) -> Result<TaskHandle, CoxError> {
        let mut state = self.state.lock().unwrap();
        state.create_calls += 1;
        state.next_id += 1;

        let workload_id = format!("wl-{}", state.next_id);
        let task_id = format!("task-{}", state.next_id);
        let anycast = if request.add_anycast_ip_address {
            "185.85.196.18".to_string()
        } else {
            String::new()
        };

        state.workloads.insert(
            workload_id.clone(),
            WorkloadData {
                id: workload_id.clone(),
                name: shorten_name(&request.name, WORKLOAD_NAME_LIMIT),
                workload_type: request.workload_type,
                image: request.image,
                environment_variables: request.environment_variables,
                deployments: request.deployments,
                ports: request.ports,
                anycast_ip_address: anycast,
                ..Default::default()
            },
        );
        state.tasks.insert(
            task_id.clone(),
            TaskData {
                id: task_id.clone(),
                status: TaskStatus::Pending,
                created: Some(Utc::now()),
                result: capi_cox_cloud::types::TaskResult {
                    workload_id,
                    ..Default::default()
                },
            },
        );

        Ok(TaskHandle {
            task_id,
            task_status: "PENDING".to_string(),
        })
    }

    async fn update_workload(
        &self,
        id: &str,
        workload: WorkloadData,
    ) -> Result<TaskHandle, CoxError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_updates {
            return Err(CoxError::Api {
                status: 500,
                body: "upstream error".to_string(),
            });
        }
        if !state.workloads.contains_key(id) {
            return Err(CoxError::NotFound);
        }
        state.update_calls += 1;
        state.workloads.insert(id.to_string(), workload);
        Ok(TaskHandle::default())
    }

    async fn delete_workload(&self, id: &str) -> Result<TaskHandle, CoxError> {
        let mut state = self.state.lock().unwrap();
        if state.workloads.remove(id).is_none() {
            return Err(CoxError::NotFound);
        }
        state.delete_calls += 1;
        Ok(TaskHandle::default())
    }

    async fn list_instances(&self, workload_id: &str) -> Result<Vec<InstanceData>, CoxError> {
        let state = self.state.lock().unwrap();
        if state.fail_instances {
            return Err(CoxError::Api {
                status: 500,
                body: "upstream error".to_string(),
            });
        }
        Ok(state.instances.get(workload_id).cloned().unwrap_or_default())
    }

    async fn get_task(&self, id: &str) -> Result<TaskData, CoxError> {
        self.state
            .lock()
            .unwrap()
            .tasks
            .get(id)
            .cloned()
            .ok_or(CoxError::NotFound)
    }
}

#[derive(Default)]
struct FakeManagement {
    machines: Mutex<Vec<CoxMachine>>,
}

#[async_trait]
impl ManagementApi for FakeManagement {
    async fn credentials(
        &self,
        _namespace: &str,
        _secret: &str,
    ) -> capi_cox_controllers::Result<Credentials> {
        Ok(Credentials::new("key", "svc", "env"))
    }

    async fn bootstrap_data(
        &self,
        _namespace: &str,
        _secret: &str,
    ) -> capi_cox_controllers::Result<String> {
        Ok("#cloud-config\n".to_string())
    }

    async fn list_cox_machines(
        &self,
        _namespace: &str,
    ) -> capi_cox_controllers::Result<Vec<CoxMachine>> {
        Ok(self.machines.lock().unwrap().clone())
    }
}

fn machine_scope(name: &str) -> MachineScope {
    let cluster = Cluster {
        name: "prod".to_string(),
        namespace: "default".to_string(),
        infrastructure_ready: true,
    };
    let machine = Machine {
        name: name.to_string(),
        namespace: "default".to_string(),
        cluster_name: "prod".to_string(),
        bootstrap_secret_name: Some(format!("{name}-bootstrap")),
    };
    let mut cox_machine = CoxMachine {
        metadata: ObjectMeta::new(name, "default"),
        ..Default::default()
    };
    cox_machine.spec.workload_type = "VM".to_string();
    cox_machine.spec.image = "stackpath-edge/ubuntu-2004".to_string();
    cox_machine.spec.specs = "SP-5".to_string();

    MachineScope::new(cluster, machine, CoxCluster::default(), cox_machine).unwrap()
}

fn cluster_scope() -> ClusterScope {
    let cluster = Cluster {
        name: "prod".to_string(),
        namespace: "default".to_string(),
        infrastructure_ready: false,
    };
    let cox_cluster = CoxCluster {
        metadata: ObjectMeta::new("prod", "default"),
        ..Default::default()
    };
    ClusterScope::new(cluster, cox_cluster).unwrap()
}

fn control_plane_machine(ip: &str) -> CoxMachine {
    let mut machine = CoxMachine {
        metadata: ObjectMeta::new("prod-cp-0", "default"),
        ..Default::default()
    };
    machine
        .metadata
        .labels
        .insert(CLUSTER_NAME_LABEL.to_string(), "prod".to_string());
    machine
        .metadata
        .labels
        .insert(CONTROL_PLANE_LABEL.to_string(), String::new());
    machine.status.addresses = vec![MachineAddress {
        address_type: MachineAddressType::ExternalIP,
        address: ip.to_string(),
    }];
    machine
}

#[tokio::test]
async fn machine_converges_to_ready() {
    let cloud = Arc::new(FakeCloud::default());
    let management = Arc::new(FakeManagement::default());
    let reconciler = MachineReconciler::new(cloud.clone(), management);
    let mut scope = machine_scope("prod-worker-0");

    // First pass submits the create and records the task handle.
    let outcome = reconciler.reconcile(&mut scope).await.unwrap();
    assert!(outcome.requeue);
    assert_eq!(cloud.create_calls(), 1);
    let task_id = scope.cox_machine.status.task_id.clone().unwrap();
    assert_eq!(scope.cox_machine.status.task_status, Some(TaskStatus::Pending));
    assert!(scope.cox_machine.metadata.has_finalizer(MACHINE_FINALIZER));

    // While the task is pending no second create is submitted.
    reconciler.reconcile(&mut scope).await.unwrap();
    assert_eq!(cloud.create_calls(), 1);
    assert!(scope.provider_id().is_none());

    // Task success links the workload through the provider ID.
    cloud.complete_task(&task_id);
    let outcome = reconciler.reconcile(&mut scope).await.unwrap();
    assert_eq!(scope.provider_id(), Some("coxedge://wl-1"));
    assert!(!scope.cox_machine.status.ready);
    assert_eq!(outcome.requeue_after, Some(Duration::from_secs(60)));

    // An instance that exists but is not RUNNING yet keeps the machine
    // not-ready on the same backoff.
    cloud.add_instance("wl-1", "PENDING", "185.85.196.20", "10.0.0.4");
    let outcome = reconciler.reconcile(&mut scope).await.unwrap();
    assert!(!scope.cox_machine.status.ready);
    assert_eq!(outcome.requeue_after, Some(Duration::from_secs(60)));

    // A running instance makes the machine ready and publishes addresses.
    cloud.set_instance_status("wl-1", "RUNNING");
    let outcome = reconciler.reconcile(&mut scope).await.unwrap();
    assert!(scope.cox_machine.status.ready);
    assert_eq!(scope.cox_machine.external_address(), Some("185.85.196.20"));
    assert_eq!(outcome.requeue_after, Some(Duration::from_secs(300)));
    assert_eq!(cloud.create_calls(), 1);
}

#[tokio::test]
async fn errored_machine_halts_without_touching_the_cloud() {
    let cloud = Arc::new(FakeCloud::default());
    let management = Arc::new(FakeManagement::default());
    let reconciler = MachineReconciler::new(cloud.clone(), management);

    let mut scope = machine_scope("prod-worker-1");
    scope.cox_machine.status.error_message = Some("task task-9 failed".to_string());

    let outcome = reconciler.reconcile(&mut scope).await.unwrap();
    assert!(!outcome.requeue);
    assert_eq!(cloud.create_calls(), 0);

    let condition = scope
        .cox_machine
        .status
        .conditions
        .get("CoxMachineReady")
        .unwrap();
    assert_eq!(condition.reason.as_deref(), Some(MACHINE_ERRORED_REASON));
}

#[tokio::test]
async fn failed_task_sets_a_sticky_error() {
    let cloud = Arc::new(FakeCloud::default());
    let management = Arc::new(FakeManagement::default());
    let reconciler = MachineReconciler::new(cloud.clone(), management);
    let mut scope = machine_scope("prod-worker-2");

    reconciler.reconcile(&mut scope).await.unwrap();
    let task_id = scope.cox_machine.status.task_id.clone().unwrap();
    {
        let mut state = cloud.state.lock().unwrap();
        state.tasks.get_mut(&task_id).unwrap().status = TaskStatus::Failure;
    }

    let outcome = reconciler.reconcile(&mut scope).await.unwrap();
    assert!(!outcome.requeue);
    assert!(scope.cox_machine.status.error_message.is_some());
    assert_eq!(scope.cox_machine.status.task_status, Some(TaskStatus::Failure));

    // The error is sticky: nothing further happens until it is cleared.
    reconciler.reconcile(&mut scope).await.unwrap();
    assert_eq!(cloud.create_calls(), 1);
    assert!(scope.provider_id().is_none());
}

#[tokio::test]
async fn instance_list_error_refreshes_the_ready_condition() {
    let cloud = Arc::new(FakeCloud::default());
    let management = Arc::new(FakeManagement::default());
    let reconciler = MachineReconciler::new(cloud.clone(), management);
    let mut scope = machine_scope("prod-worker-5");

    reconciler.reconcile(&mut scope).await.unwrap();
    let task_id = scope.cox_machine.status.task_id.clone().unwrap();
    cloud.complete_task(&task_id);
    cloud.add_running_instance("wl-1", "185.85.196.20", "10.0.0.4");
    reconciler.reconcile(&mut scope).await.unwrap();
    assert!(scope.cox_machine.status.ready);

    // A failing instance read must not leave the stale ready condition
    // standing while the pass errors out.
    cloud.fail_instance_lists();
    reconciler.reconcile(&mut scope).await.unwrap_err();

    let condition = scope
        .cox_machine
        .status
        .conditions
        .get("CoxMachineReady")
        .unwrap();
    assert_eq!(condition.status, ConditionStatus::False);
    assert_eq!(condition.reason.as_deref(), Some(INSTANCE_NOT_READY_REASON));
}

#[tokio::test]
async fn machine_delete_releases_the_finalizer() {
    let cloud = Arc::new(FakeCloud::default());
    let management = Arc::new(FakeManagement::default());
    let reconciler = MachineReconciler::new(cloud.clone(), management);
    let mut scope = machine_scope("prod-worker-3");

    reconciler.reconcile(&mut scope).await.unwrap();
    let task_id = scope.cox_machine.status.task_id.clone().unwrap();
    cloud.complete_task(&task_id);
    reconciler.reconcile(&mut scope).await.unwrap();
    assert!(scope.workload_id().is_some());

    scope.cox_machine.metadata.deletion_timestamp = Some(Utc::now());
    let outcome = reconciler.reconcile(&mut scope).await.unwrap();
    assert!(!outcome.requeue);
    assert!(!scope.cox_machine.metadata.has_finalizer(MACHINE_FINALIZER));
    assert!(cloud.workload_by_name("prod-worker-3").is_none());

    // Deleting again is a no-op.
    let outcome = reconciler.reconcile(&mut scope).await.unwrap();
    assert!(!outcome.requeue);
}

#[tokio::test]
async fn delete_waits_for_an_outstanding_create_task() {
    let cloud = Arc::new(FakeCloud::default());
    let management = Arc::new(FakeManagement::default());
    let reconciler = MachineReconciler::new(cloud.clone(), management);
    let mut scope = machine_scope("prod-worker-4");

    // Create submitted, task still pending.
    reconciler.reconcile(&mut scope).await.unwrap();
    let task_id = scope.cox_machine.status.task_id.clone().unwrap();

    scope.cox_machine.metadata.deletion_timestamp = Some(Utc::now());
    let outcome = reconciler.reconcile(&mut scope).await.unwrap();
    assert!(outcome.requeue);
    assert!(scope.cox_machine.metadata.has_finalizer(MACHINE_FINALIZER));

    // Once the task settles the workload is deleted and the finalizer
    // released.
    cloud.complete_task(&task_id);
    let outcome = reconciler.reconcile(&mut scope).await.unwrap();
    assert!(!outcome.requeue);
    assert!(!scope.cox_machine.metadata.has_finalizer(MACHINE_FINALIZER));
    assert!(cloud.workload_by_name("prod-worker-4").is_none());
}

#[tokio::test]
async fn cluster_waits_for_a_real_backend_before_going_ready() {
    let cloud = Arc::new(FakeCloud::default());
    let management = Arc::new(FakeManagement::default());
    let reconciler = ClusterReconciler::new(cloud.clone(), management.clone());
    let mut scope = cluster_scope();

    // First pass creates the load balancer with the placeholder backend
    // and asks to come back immediately.
    let outcome = reconciler.reconcile(&mut scope).await.unwrap();
    assert!(outcome.requeue);
    assert_eq!(outcome.requeue_after, None);
    assert_eq!(cloud.create_calls(), 1);
    assert!(scope.cox_cluster.metadata.has_finalizer(CLUSTER_FINALIZER));
    let lb = cloud.workload_by_name("lb-prod").unwrap();
    assert_eq!(lb.image, "erwinvaneyk/nginx-lb:latest");

    // Anycast IP is up, but only the placeholder backend is configured:
    // the cluster must not publish an endpoint yet.
    cloud.add_running_instance(&lb.id, "", "10.1.0.4");
    let outcome = reconciler.reconcile(&mut scope).await.unwrap();
    assert!(outcome.requeue);
    assert!(!scope.cox_cluster.status.ready);
    assert!(!scope.cox_cluster.spec.control_plane_endpoint.is_set());
    assert_eq!(
        scope
            .cox_cluster
            .status
            .control_plane_load_balancer
            .public_ip
            .as_deref(),
        Some("185.85.196.18")
    );

    // A routable control-plane machine appears; its address replaces the
    // placeholder.
    management
        .machines
        .lock()
        .unwrap()
        .push(control_plane_machine("185.85.196.20"));
    reconciler.reconcile(&mut scope).await.unwrap();
    assert_eq!(cloud.update_calls(), 1);
    let lb = cloud.workload_by_name("lb-prod").unwrap();
    assert_eq!(
        lb.environment_variable("LB_BACKENDS"),
        Some("185.85.196.20:6443")
    );

    // Now the cluster is ready and the endpoint is published.
    let outcome = reconciler.reconcile(&mut scope).await.unwrap();
    assert!(scope.cox_cluster.status.ready);
    assert_eq!(scope.cox_cluster.spec.control_plane_endpoint.host, "185.85.196.18");
    assert_eq!(scope.cox_cluster.spec.control_plane_endpoint.port, 6443);
    assert_eq!(outcome.requeue_after, Some(Duration::from_secs(300)));
}

#[tokio::test]
async fn load_balancer_update_error_marks_the_cluster_condition() {
    let cloud = Arc::new(FakeCloud::default());
    let management = Arc::new(FakeManagement::default());
    let reconciler = ClusterReconciler::new(cloud.clone(), management.clone());
    let mut scope = cluster_scope();

    reconciler.reconcile(&mut scope).await.unwrap();

    // New backends force an update, which the remote side refuses.
    management
        .machines
        .lock()
        .unwrap()
        .push(control_plane_machine("185.85.196.20"));
    cloud.fail_updates();
    reconciler.reconcile(&mut scope).await.unwrap_err();

    let condition = scope
        .cox_cluster
        .status
        .conditions
        .get("CoxClusterReady")
        .unwrap();
    assert_eq!(condition.status, ConditionStatus::False);
    assert_eq!(
        condition.reason.as_deref(),
        Some(LOAD_BALANCER_UPDATE_FAILED_REASON)
    );
}

#[tokio::test]
async fn cluster_referenced_secret_supplies_credentials() {
    let management = FakeManagement::default();
    let mut cox_cluster = CoxCluster {
        metadata: ObjectMeta::new("prod", "default"),
        ..Default::default()
    };
    cox_cluster.spec.credentials = Some("cox-credentials".to_string());

    let credentials = resolve_credentials(&management, &cox_cluster).await.unwrap();
    assert_eq!(credentials.api_key, "key");
    assert_eq!(credentials.service, "svc");
}

#[tokio::test]
async fn cluster_delete_tears_down_the_load_balancer() {
    let cloud = Arc::new(FakeCloud::default());
    let management = Arc::new(FakeManagement::default());
    let reconciler = ClusterReconciler::new(cloud.clone(), management);
    let mut scope = cluster_scope();

    reconciler.reconcile(&mut scope).await.unwrap();
    assert!(cloud.workload_by_name("lb-prod").is_some());

    scope.cox_cluster.metadata.deletion_timestamp = Some(Utc::now());
    let outcome = reconciler.reconcile(&mut scope).await.unwrap();
    assert!(!outcome.requeue);
    assert!(!scope.cox_cluster.metadata.has_finalizer(CLUSTER_FINALIZER));
    assert!(cloud.workload_by_name("lb-prod").is_none());

    // Deleting an already-deleted cluster succeeds.
    let outcome = reconciler.reconcile(&mut scope).await.unwrap();
    assert!(!outcome.requeue);
}
