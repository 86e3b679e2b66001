//! Access gate
//!
//! The engine's only authorization seam: an injected predicate consulted
//! before any field mapping or storage access when `check_access` is on.

mod role;

pub use role::RoleAccessGate;

use crate::crud::TaskContext;
use crate::models::TaskType;

/// Outcome of an access check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    Deny(String),
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AccessDecision::Allow)
    }
}

/// Decides whether a task may run
pub trait AccessGate: Send + Sync {
    fn check(&self, task: TaskType, ctx: &TaskContext) -> AccessDecision;
}

/// Allows every task
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl AccessGate for AllowAll {
    fn check(&self, _task: TaskType, _ctx: &TaskContext) -> AccessDecision {
        AccessDecision::Allow
    }
}

/// Denies every task with a fixed reason
#[derive(Debug, Clone)]
pub struct DenyAll {
    reason: String,
}

impl DenyAll {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl Default for DenyAll {
    fn default() -> Self {
        Self::new("access denied")
    }
}

impl AccessGate for DenyAll {
    fn check(&self, _task: TaskType, _ctx: &TaskContext) -> AccessDecision {
        AccessDecision::Deny(self.reason.clone())
    }
}
