use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::role::Role;

/// Grants `role` to `user_id` inside `workspace_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Membership {
    pub user_id: String,
    pub workspace_id: String,
    pub role: Role,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Membership {
    pub fn new(user_id: impl Into<String>, workspace_id: impl Into<String>, role: Role) -> Self {
        Self { user_id: user_id.into(), workspace_id: workspace_id.into(), role, expires_at: None }
    }

    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|t| t > now).unwrap_or(true)
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("membership store unavailable: {0}")]
    Unavailable(String),
}

/// Exact-match lookup of a (user, workspace) pair. `Ok(None)` means no membership.
pub trait MembershipStore: Send + Sync {
    fn find(&self, user_id: &str, workspace_id: &str) -> Result<Option<Membership>, StoreError>;

    fn list_for_workspace(&self, workspace_id: &str) -> Result<Vec<Membership>, StoreError>;
}
