//! CoxEdge cloud layer.
//!
//! Typed client for the CoxEdge workload API plus the load-balancer
//! abstraction layered on top of it. All mutating calls are asynchronous
//! on the remote side and return a task handle; callers poll the task to
//! learn the outcome.

pub mod api;
pub mod client;
pub mod credentials;
pub mod error;
pub mod loadbalancer;
pub mod types;

pub use api::WorkloadApi;
pub use client::{shorten_name, CoxClient, DEFAULT_BASE_URL, WORKLOAD_NAME_LIMIT};
pub use credentials::Credentials;
pub use error::{CoxError, Result};
pub use loadbalancer::{LoadBalancer, LoadBalancerSpec, LoadBalancerStatus, LoadBalancers};
pub use types::{
    CreateWorkloadRequest, Deployment, EnvironmentVariable, InstanceData, PersistentStorage, Port,
    TaskData, TaskHandle, TaskStatus, WorkloadData,
};
