//! Typed status conditions.
//!
//! Conditions are the durable, inspectable record of why a resource is or
//! is not ready. The set is keyed by condition type: setting a condition
//! replaces the entry of the same type and only bumps the transition
//! timestamp when the status actually changed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub condition_type: String,

    pub status: ConditionStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    pub last_transition_time: DateTime<Utc>,
}

/// Ordered condition list with type-keyed upsert semantics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Conditions(Vec<Condition>);

impl Conditions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, condition_type: &str) -> Option<&Condition> {
        self.0.iter().find(|c| c.condition_type == condition_type)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Condition> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn mark_true(&mut self, condition_type: &str) {
        self.set(condition_type, ConditionStatus::True, None, None);
    }

    pub fn mark_false(&mut self, condition_type: &str, reason: &str, message: &str) {
        self.set(
            condition_type,
            ConditionStatus::False,
            Some(reason.to_string()),
            Some(message.to_string()),
        );
    }

    pub fn mark_unknown(&mut self, condition_type: &str) {
        self.set(condition_type, ConditionStatus::Unknown, None, None);
    }

    pub fn set(
        &mut self,
        condition_type: &str,
        status: ConditionStatus,
        reason: Option<String>,
        message: Option<String>,
    ) {
        match self
            .0
            .iter_mut()
            .find(|c| c.condition_type == condition_type)
        {
            Some(existing) => {
                if existing.status != status {
                    existing.last_transition_time = Utc::now();
                }
                existing.status = status;
                existing.reason = reason;
                existing.message = message;
            }
            None => self.0.push(Condition {
                condition_type: condition_type.to_string(),
                status,
                reason,
                message,
                last_transition_time: Utc::now(),
            }),
        }
    }
}
