//! Reconcile results.

use std::time::Duration;

/// What the embedding controller runtime should do after a reconcile.
///
/// Waiting on remote state is expressed by requeueing with a delay rather
/// than blocking inside the reconciler, so a single pass stays short and
/// the work queue keeps draining.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Outcome {
    pub requeue: bool,
    pub requeue_after: Option<Duration>,
}

impl Outcome {
    /// Nothing left to do until the resource changes again.
    pub fn done() -> Self {
        Self::default()
    }

    /// Run again as soon as the queue allows.
    pub fn requeue() -> Self {
        Self {
            requeue: true,
            requeue_after: None,
        }
    }

    /// Run again after `delay`.
    pub fn after(delay: Duration) -> Self {
        Self {
            requeue: true,
            requeue_after: Some(delay),
        }
    }
}
