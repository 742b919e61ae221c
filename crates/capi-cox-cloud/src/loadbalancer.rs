//! Workload-backed load balancers.
//!
//! CoxEdge has no native load-balancer object, so a logical load balancer
//! is encoded as a container workload: the backend list and port list are
//! round-tripped through two reserved environment variables, and the
//! workload's anycast IP doubles as the load balancer's public IP.

use crate::api::WorkloadApi;
use crate::error::{CoxError, Result};
use crate::types::{
    CreateWorkloadRequest, Deployment, EnvironmentVariable, InstanceData, Port, WorkloadData,
    SPEC_SP1, TYPE_CONTAINER,
};

/// Reserved key holding the `;`-joined backend address list. A workload
/// without this key is not recognized as a load balancer.
pub const ENV_KEY_LB_BACKENDS: &str = "LB_BACKENDS";

/// Reserved key holding the `,`-joined port list.
pub const ENV_KEY_LB_PORT: &str = "LB_PORT";

const BACKEND_SEPARATOR: char = ';';
const PORT_SEPARATOR: char = ',';
const LB_DEPLOYMENT_NAME: &str = "default";
const LB_INSTANCES_PER_POP: &str = "1";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadBalancerSpec {
    pub name: String,
    pub image: String,
    pub ports: Vec<String>,
    pub backends: Vec<String>,
    pub pops: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadBalancerStatus {
    /// Anycast IP of the backing workload. Only set once at least one
    /// instance is RUNNING; stable for the life of the workload.
    pub public_ip: Option<String>,

    pub running_instances: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadBalancer {
    pub spec: LoadBalancerSpec,
    pub status: LoadBalancerStatus,
}

/// Manager for workload-backed load balancers.
pub struct LoadBalancers<'a> {
    api: &'a dyn WorkloadApi,
}

impl<'a> LoadBalancers<'a> {
    pub fn new(api: &'a dyn WorkloadApi) -> Self {
        Self { api }
    }

    pub async fn get(&self, name: &str) -> Result<LoadBalancer> {
        let workload = self.api.get_workload_by_name(name).await?;
        let instances = self.api.list_instances(&workload.id).await?;

        let spec = parse_spec(&workload)?;
        let status = derive_status(&workload, &instances);
        Ok(LoadBalancer { spec, status })
    }

    pub async fn create(&self, spec: &LoadBalancerSpec) -> Result<()> {
        tracing::info!(name = %spec.name, backends = spec.backends.len(), "creating load balancer");
        self.api.create_workload(build_create_request(spec)).await?;
        Ok(())
    }

    /// Replace the backend list and image of an existing load balancer.
    ///
    /// The stored port list is carried over unchanged; attempting to change
    /// it is rejected because the remote network policy cannot be updated
    /// in place.
    pub async fn update(&self, spec: &LoadBalancerSpec) -> Result<()> {
        let mut workload = self.api.get_workload_by_name(&spec.name).await?;
        let existing = parse_spec(&workload)?;

        if !spec.ports.is_empty() && spec.ports != existing.ports {
            return Err(CoxError::PortUpdateNotSupported);
        }

        workload.image = spec.image.clone();
        workload.environment_variables = vec![
            EnvironmentVariable {
                key: ENV_KEY_LB_BACKENDS.to_string(),
                value: spec.backends.join(&BACKEND_SEPARATOR.to_string()),
            },
            EnvironmentVariable {
                key: ENV_KEY_LB_PORT.to_string(),
                value: existing.ports.join(&PORT_SEPARATOR.to_string()),
            },
        ];

        tracing::info!(name = %existing.name, backends = ?spec.backends, "updating load balancer backends");
        let id = workload.id.clone();
        self.api.update_workload(&id, workload).await?;
        Ok(())
    }

    /// Delete the load balancer. Not-found is success.
    pub async fn delete(&self, name: &str) -> Result<()> {
        let workload = match self.api.get_workload_by_name(name).await {
            Ok(workload) => workload,
            Err(err) if err.is_not_found() => return Ok(()),
            Err(err) => return Err(err),
        };

        tracing::info!(name, id = %workload.id, "deleting load balancer");
        match self.api.delete_workload(&workload.id).await {
            Ok(_) => Ok(()),
            Err(err) if err.is_not_found() => Ok(()),
            Err(err) => Err(err),
        }
    }
}

fn build_create_request(spec: &LoadBalancerSpec) -> CreateWorkloadRequest {
    CreateWorkloadRequest {
        name: spec.name.clone(),
        workload_type: TYPE_CONTAINER.to_string(),
        image: spec.image.clone(),
        add_anycast_ip_address: true,
        ports: spec.ports.iter().map(Port::tcp).collect(),
        environment_variables: vec![
            EnvironmentVariable {
                key: ENV_KEY_LB_PORT.to_string(),
                value: spec.ports.join(&PORT_SEPARATOR.to_string()),
            },
            EnvironmentVariable {
                key: ENV_KEY_LB_BACKENDS.to_string(),
                value: spec.backends.join(&BACKEND_SEPARATOR.to_string()),
            },
        ],
        deployments: vec![Deployment {
            name: LB_DEPLOYMENT_NAME.to_string(),
            pops: spec.pops.clone(),
            instances_per_pop: LB_INSTANCES_PER_POP.to_string(),
            ..Default::default()
        }],
        specs: SPEC_SP1.to_string(),
        ..Default::default()
    }
}

fn parse_spec(workload: &WorkloadData) -> Result<LoadBalancerSpec> {
    let backends = workload
        .environment_variable(ENV_KEY_LB_BACKENDS)
        .ok_or(CoxError::NotALoadBalancer)?;
    let ports = workload
        .environment_variable(ENV_KEY_LB_PORT)
        .map(|v| v.split(PORT_SEPARATOR).map(str::to_string).collect())
        .unwrap_or_default();

    Ok(LoadBalancerSpec {
        name: workload.name.clone(),
        image: workload.image.clone(),
        ports,
        backends: backends
            .split(BACKEND_SEPARATOR)
            .map(str::to_string)
            .collect(),
        pops: workload
            .deployments
            .first()
            .map(|d| d.pops.clone())
            .unwrap_or_default(),
    })
}

fn derive_status(workload: &WorkloadData, instances: &[InstanceData]) -> LoadBalancerStatus {
    let running = instances.iter().filter(|i| i.is_running()).count();
    let public_ip = (running > 0 && !workload.anycast_ip_address.is_empty())
        .then(|| workload.anycast_ip_address.clone());

    LoadBalancerStatus {
        public_ip,
        running_instances: running,
    }
}
