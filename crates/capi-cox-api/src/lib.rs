//! Resource model for the CoxEdge Cluster API infrastructure provider.
//!
//! These are the schema-level types for the `CoxCluster` and `CoxMachine`
//! infrastructure resources, plus small projections of the owning
//! Cluster API `Cluster`/`Machine` objects. The surrounding controller
//! framework (storage, watches, caches) is an external collaborator; the
//! types here only need to round-trip through JSON faithfully.

pub mod cluster;
pub mod condition;
pub mod machine;
pub mod meta;
pub mod owner;

pub use cluster::{
    ApiEndpoint, CoxCluster, CoxClusterSpec, CoxClusterStatus, CoxLoadBalancerSpec,
    CoxLoadBalancerStatus, CLUSTER_FINALIZER,
};
pub use condition::{Condition, ConditionStatus, Conditions};
pub use machine::{
    CoxMachine, CoxMachineSpec, CoxMachineStatus, MachineAddress, MachineAddressType,
    MACHINE_FINALIZER,
};
pub use meta::{ObjectMeta, CLUSTER_NAME_LABEL, CONTROL_PLANE_LABEL};
pub use owner::{Cluster, Machine};
