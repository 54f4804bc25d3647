//! Workspace permission check.
//!
//! Evaluation yields an [`AccessDecision`] that keeps "not a member" apart from
//! "could not tell"; [`WorkspaceAuthorizer::has_workspace_permission`] then
//! collapses everything except `Granted` to `false`.

use std::sync::Arc;

use super::membership::MembershipStore;
use super::role::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    MissingIdentifier,
    NotAMember,
    InsufficientRole { held: Role },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    Granted { held: Role },
    Denied(DenyReason),
    /// The store could not answer; never treated as a grant.
    Indeterminate { cause: String },
}

impl AccessDecision {
    pub fn is_granted(&self) -> bool { matches!(self, AccessDecision::Granted { .. }) }
}

#[derive(Clone)]
pub struct WorkspaceAuthorizer {
    store: Arc<dyn MembershipStore>,
}

impl WorkspaceAuthorizer {
    pub fn new(store: Arc<dyn MembershipStore>) -> Self { Self { store } }

    /// Full decision for diagnostics. Reads the store at most once.
    pub fn evaluate(&self, user_id: &str, workspace_id: &str, required: Role) -> AccessDecision {
        if user_id.trim().is_empty() || workspace_id.trim().is_empty() {
            return AccessDecision::Denied(DenyReason::MissingIdentifier);
        }
        match self.store.find(user_id, workspace_id) {
            Ok(None) => AccessDecision::Denied(DenyReason::NotAMember),
            Ok(Some(m)) if m.role.satisfies(required) => AccessDecision::Granted { held: m.role },
            Ok(Some(m)) => AccessDecision::Denied(DenyReason::InsufficientRole { held: m.role }),
            Err(e) => AccessDecision::Indeterminate { cause: e.to_string() },
        }
    }

    /// Fail-closed boolean check; `None` requires `viewer`.
    pub fn has_workspace_permission(&self, user_id: &str, workspace_id: &str, required: Option<Role>) -> bool {
        let required = required.unwrap_or_default();
        let decision = self.evaluate(user_id, workspace_id, required);
        match &decision {
            AccessDecision::Granted { held } => {
                tracing::debug!(user = %user_id, workspace = %workspace_id, %required, %held, "workspace.access granted");
            }
            AccessDecision::Denied(reason) => {
                tracing::debug!(user = %user_id, workspace = %workspace_id, %required, ?reason, "workspace.access denied");
            }
            AccessDecision::Indeterminate { cause } => {
                tracing::warn!(user = %user_id, workspace = %workspace_id, %required, %cause, "workspace.access indeterminate; denying");
            }
        }
        decision.is_granted()
    }
}
