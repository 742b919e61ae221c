//! Reconcile scopes.
//!
//! A scope bundles the resource being reconciled with the owning objects
//! it depends on, plus the derived values both reconcilers keep needing
//! (provider IDs, load-balancer defaults). The reconciler mutates the
//! resource through the scope and the embedding layer persists whatever
//! `close` hands back.

use crate::error::{ControllerError, Result};
use capi_cox_api::{
    Cluster, CoxCluster, CoxMachine, Machine, CLUSTER_NAME_LABEL, CONTROL_PLANE_LABEL,
};
use capi_cox_cloud::LoadBalancerSpec;

/// Prefix turning a CoxEdge workload ID into a Cluster API provider ID.
pub const PROVIDER_ID_PREFIX: &str = "coxedge://";

/// Default apiserver port when the load-balancer spec names none.
pub const DEFAULT_APISERVER_PORT: u16 = 6443;

/// Placeholder backend installed while no control-plane machine has an
/// address yet. The load balancer can be created early, but the cluster
/// must not report ready while this is the only backend.
pub const DEFAULT_BACKEND: &str = "example.com:80";

/// Default image for the control-plane load balancer.
pub const DEFAULT_LB_IMAGE: &str = "erwinvaneyk/nginx-lb:latest";

pub struct MachineScope {
    pub cluster: Cluster,
    pub machine: Machine,
    pub cox_cluster: CoxCluster,
    pub cox_machine: CoxMachine,
}

impl MachineScope {
    pub fn new(
        cluster: Cluster,
        machine: Machine,
        cox_cluster: CoxCluster,
        cox_machine: CoxMachine,
    ) -> Result<Self> {
        if cluster.name.is_empty() || machine.name.is_empty() {
            return Err(ControllerError::InvalidConfig(
                "machine scope requires owning Cluster and Machine".to_string(),
            ));
        }
        Ok(Self {
            cluster,
            machine,
            cox_cluster,
            cox_machine,
        })
    }

    pub fn name(&self) -> &str {
        &self.cox_machine.metadata.name
    }

    pub fn namespace(&self) -> &str {
        &self.cox_machine.metadata.namespace
    }

    /// Sticky terminal error, if the machine has hit one.
    pub fn error_message(&self) -> Option<&str> {
        self.cox_machine.status.error_message.as_deref()
    }

    pub fn provider_id(&self) -> Option<&str> {
        self.cox_machine.spec.provider_id.as_deref()
    }

    /// Record the workload backing this machine. Immutable once set.
    pub fn set_provider_id(&mut self, workload_id: &str) {
        if self.cox_machine.spec.provider_id.is_none() {
            self.cox_machine.spec.provider_id =
                Some(format!("{PROVIDER_ID_PREFIX}{workload_id}"));
        }
    }

    /// Workload ID encoded in the provider ID.
    pub fn workload_id(&self) -> Option<&str> {
        self.provider_id()
            .and_then(|id| id.strip_prefix(PROVIDER_ID_PREFIX))
    }

    /// Hand the mutated resource back for persistence.
    pub fn close(self) -> CoxMachine {
        self.cox_machine
    }
}

pub struct ClusterScope {
    pub cluster: Cluster,
    pub cox_cluster: CoxCluster,
}

impl ClusterScope {
    pub fn new(cluster: Cluster, cox_cluster: CoxCluster) -> Result<Self> {
        if cluster.name.is_empty() {
            return Err(ControllerError::InvalidConfig(
                "cluster scope requires an owning Cluster".to_string(),
            ));
        }
        Ok(Self {
            cluster,
            cox_cluster,
        })
    }

    pub fn name(&self) -> &str {
        &self.cox_cluster.metadata.name
    }

    pub fn namespace(&self) -> &str {
        &self.cox_cluster.metadata.namespace
    }

    /// Name of the control-plane load-balancer workload.
    pub fn load_balancer_name(&self) -> String {
        self.cox_cluster
            .spec
            .control_plane_load_balancer
            .name
            .clone()
            .unwrap_or_else(|| format!("lb-{}", self.cox_cluster.metadata.name))
    }

    /// Apiserver port served by the load balancer.
    pub fn apiserver_port(&self) -> u16 {
        self.cox_cluster
            .spec
            .control_plane_load_balancer
            .ports
            .first()
            .copied()
            .unwrap_or(DEFAULT_APISERVER_PORT)
    }

    /// Desired load-balancer state with all defaults applied.
    pub fn load_balancer_spec(&self, backends: Vec<String>) -> LoadBalancerSpec {
        let lb = &self.cox_cluster.spec.control_plane_load_balancer;
        let ports = if lb.ports.is_empty() {
            vec![DEFAULT_APISERVER_PORT]
        } else {
            lb.ports.clone()
        };

        LoadBalancerSpec {
            name: self.load_balancer_name(),
            image: lb
                .image
                .clone()
                .unwrap_or_else(|| DEFAULT_LB_IMAGE.to_string()),
            ports: ports.iter().map(u16::to_string).collect(),
            backends,
            pops: lb.pops.clone(),
        }
    }

    /// Addresses of this cluster's control-plane machines, as `ip:port`
    /// backends. Falls back to the placeholder when none is routable yet.
    pub fn control_plane_backends(&self, machines: &[CoxMachine]) -> Vec<String> {
        let port = self.apiserver_port();
        let backends: Vec<String> = machines
            .iter()
            .filter(|m| {
                m.metadata.label(CLUSTER_NAME_LABEL) == Some(self.cluster.name.as_str())
                    && m.metadata.has_label(CONTROL_PLANE_LABEL)
            })
            .filter_map(|m| m.external_address())
            .map(|ip| format!("{ip}:{port}"))
            .collect();

        if backends.is_empty() {
            vec![DEFAULT_BACKEND.to_string()]
        } else {
            backends
        }
    }

    pub fn close(self) -> CoxCluster {
        self.cox_cluster
    }
}
