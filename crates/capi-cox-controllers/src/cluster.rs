//! `CoxCluster` reconciler.
//!
//! Owns the control-plane load balancer: creates it (with a placeholder
//! backend until a control-plane machine is routable), keeps its backend
//! list in sync with the cluster's control-plane machines, and publishes
//! the anycast IP as the cluster's control-plane endpoint.

use crate::error::Result;
use crate::management::ManagementApi;
use crate::outcome::Outcome;
use crate::scope::{ClusterScope, DEFAULT_BACKEND};
use capi_cox_api::CLUSTER_FINALIZER;
use capi_cox_cloud::{CoxError, LoadBalancers, WorkloadApi};
use std::sync::Arc;
use std::time::Duration;

pub const CLUSTER_READY_CONDITION: &str = "CoxClusterReady";

pub const LOAD_BALANCER_PROVISIONING_REASON: &str = "LoadBalancerProvisioning";
pub const LOAD_BALANCER_NOT_FOUND_REASON: &str = "LoadBalancerNotFound";
pub const LOAD_BALANCER_NOT_READY_REASON: &str = "LoadBalancerNotReady";
pub const LOAD_BALANCER_CREATE_FAILED_REASON: &str = "LoadBalancerCreateFailed";
pub const LOAD_BALANCER_UPDATE_FAILED_REASON: &str = "LoadBalancerUpdateFailed";
pub const WAITING_FOR_CONTROL_PLANE_REASON: &str = "WaitingForControlPlane";

/// Requeue delay while the load balancer has no public IP or only the
/// placeholder backend.
const IP_WAIT_INTERVAL: Duration = Duration::from_secs(10);

/// Requeue delay once the cluster is ready; picks up machine churn.
const STEADY_INTERVAL: Duration = Duration::from_secs(300);

pub struct ClusterReconciler {
    api: Arc<dyn WorkloadApi>,
    management: Arc<dyn ManagementApi>,
}

impl ClusterReconciler {
    pub fn new(api: Arc<dyn WorkloadApi>, management: Arc<dyn ManagementApi>) -> Self {
        Self { api, management }
    }

    pub async fn reconcile(&self, scope: &mut ClusterScope) -> Result<Outcome> {
        if scope.cox_cluster.metadata.deletion_requested() {
            return self.reconcile_delete(scope).await;
        }
        self.reconcile_normal(scope).await
    }

    async fn reconcile_normal(&self, scope: &mut ClusterScope) -> Result<Outcome> {
        scope.cox_cluster.metadata.add_finalizer(CLUSTER_FINALIZER);

        let machines = self.management.list_cox_machines(scope.namespace()).await?;
        let backends = scope.control_plane_backends(&machines);
        let mut desired = scope.load_balancer_spec(backends.clone());

        let lbs = LoadBalancers::new(self.api.as_ref());
        let lb = match lbs.get(&desired.name).await {
            Ok(lb) => lb,
            Err(err) if err.is_not_found() => {
                if let Err(err) = lbs.create(&desired).await {
                    scope.cox_cluster.status.conditions.mark_false(
                        CLUSTER_READY_CONDITION,
                        LOAD_BALANCER_CREATE_FAILED_REASON,
                        &err.to_string(),
                    );
                    return Err(err.into());
                }
                scope.cox_cluster.status.conditions.mark_false(
                    CLUSTER_READY_CONDITION,
                    LOAD_BALANCER_PROVISIONING_REASON,
                    "load balancer workload is being created",
                );
                // Creation is asynchronous; come back right away.
                return Ok(Outcome::requeue());
            }
            Err(err) => {
                scope.cox_cluster.status.conditions.mark_false(
                    CLUSTER_READY_CONDITION,
                    LOAD_BALANCER_NOT_FOUND_REASON,
                    &err.to_string(),
                );
                return Err(err.into());
            }
        };

        // Placement is sticky once provisioned; only ever diff what can
        // still change.
        if desired.pops.is_empty() {
            desired.pops = lb.spec.pops.clone();
        }

        if desired.ports != lb.spec.ports
            || desired.backends != lb.spec.backends
            || desired.image != lb.spec.image
        {
            if let Err(err) = lbs.update(&desired).await {
                let message = if matches!(err, CoxError::PortUpdateNotSupported) {
                    "load balancer ports cannot be changed after creation".to_string()
                } else {
                    err.to_string()
                };
                scope.cox_cluster.status.conditions.mark_false(
                    CLUSTER_READY_CONDITION,
                    LOAD_BALANCER_UPDATE_FAILED_REASON,
                    &message,
                );
                return Err(err.into());
            }
            // The observed state is stale now; re-derive it next pass.
            scope.cox_cluster.status.control_plane_load_balancer = Default::default();
            scope.cox_cluster.status.ready = false;
            scope.cox_cluster.status.conditions.mark_false(
                CLUSTER_READY_CONDITION,
                LOAD_BALANCER_PROVISIONING_REASON,
                "load balancer backends are being updated",
            );
            return Ok(Outcome::after(IP_WAIT_INTERVAL));
        }

        let Some(public_ip) = lb.status.public_ip else {
            tracing::info!(cluster = scope.name(), "load balancer has no public IP yet");
            scope.cox_cluster.status.ready = false;
            scope.cox_cluster.status.conditions.mark_false(
                CLUSTER_READY_CONDITION,
                LOAD_BALANCER_NOT_READY_REASON,
                "load balancer has no running instance with a public IP",
            );
            return Ok(Outcome::after(IP_WAIT_INTERVAL));
        };

        scope
            .cox_cluster
            .status
            .control_plane_load_balancer
            .public_ip = Some(public_ip.clone());

        // Until a real control-plane machine backs the load balancer the
        // endpoint would route nowhere; hold off on declaring readiness.
        if backends == [DEFAULT_BACKEND] {
            scope.cox_cluster.status.ready = false;
            scope.cox_cluster.status.conditions.mark_false(
                CLUSTER_READY_CONDITION,
                WAITING_FOR_CONTROL_PLANE_REASON,
                "load balancer is serving only the placeholder backend",
            );
            return Ok(Outcome::after(IP_WAIT_INTERVAL));
        }

        // The endpoint is immutable once published.
        let apiserver_port = scope.apiserver_port();
        let endpoint = &mut scope.cox_cluster.spec.control_plane_endpoint;
        if !endpoint.is_set() {
            endpoint.host = public_ip;
            endpoint.port = apiserver_port;
        }

        scope.cox_cluster.status.ready = true;
        scope
            .cox_cluster
            .status
            .conditions
            .mark_true(CLUSTER_READY_CONDITION);

        tracing::info!(cluster = scope.name(), "cluster infrastructure is ready");
        Ok(Outcome::after(STEADY_INTERVAL))
    }

    async fn reconcile_delete(&self, scope: &mut ClusterScope) -> Result<Outcome> {
        if !scope.cox_cluster.metadata.has_finalizer(CLUSTER_FINALIZER) {
            return Ok(Outcome::done());
        }

        let lbs = LoadBalancers::new(self.api.as_ref());
        lbs.delete(&scope.load_balancer_name()).await?;

        scope
            .cox_cluster
            .metadata
            .remove_finalizer(CLUSTER_FINALIZER);
        Ok(Outcome::done())
    }
}
