//! Reconcilers for the CoxEdge Cluster API infrastructure provider.
//!
//! Each reconciler takes a scope (the resource plus its owners), mutates
//! it toward the desired state, and returns an [`Outcome`] telling the
//! embedding controller runtime when to run again. All remote waiting is
//! expressed through requeues; a reconcile pass never sleeps.

pub mod cluster;
pub mod error;
pub mod machine;
pub mod management;
pub mod outcome;
pub mod scope;

pub use cluster::ClusterReconciler;
pub use error::{ControllerError, Result};
pub use machine::MachineReconciler;
pub use management::{resolve_credentials, ManagementApi};
pub use outcome::Outcome;
pub use scope::{ClusterScope, MachineScope, PROVIDER_ID_PREFIX};
