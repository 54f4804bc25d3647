//! Startup seed: memberships and pre-provisioned API tokens loaded from a JSON file.
//!
//! ```json
//! {
//!   "memberships": [{"user_id": "u1", "workspace_id": "w1", "role": "admin"}],
//!   "api_tokens":  [{"token": "dev-token", "user_id": "u1"}]
//! }
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::identity::{Attrs, Principal, SessionError, SessionManager};
use crate::workspace::{InMemoryMembershipStore, Membership};

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("cannot read seed file {path}: {source}")]
    Io { path: PathBuf, #[source] source: std::io::Error },
    #[error("cannot parse seed file {path}: {source}")]
    Parse { path: PathBuf, #[source] source: serde_json::Error },
    #[error("invalid seed: {0}")]
    Invalid(String),
    #[error("cannot install api token: {0}")]
    Session(#[from] SessionError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiToken {
    pub token: String,
    pub user_id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub memberships: Vec<Membership>,
    #[serde(default)]
    pub api_tokens: Vec<ApiToken>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub memberships: usize,
    pub api_tokens: usize,
}

pub fn load_seed(path: &Path) -> Result<SeedFile, SeedError> {
    let raw = std::fs::read_to_string(path).map_err(|source| SeedError::Io { path: path.to_path_buf(), source })?;
    let seed: SeedFile = serde_json::from_str(&raw).map_err(|source| SeedError::Parse { path: path.to_path_buf(), source })?;
    seed.validate()?;
    Ok(seed)
}

impl SeedFile {
    pub fn validate(&self) -> Result<(), SeedError> {
        let mut pairs = HashSet::new();
        for m in &self.memberships {
            if m.user_id.trim().is_empty() || m.workspace_id.trim().is_empty() {
                return Err(SeedError::Invalid("membership with empty user_id or workspace_id".into()));
            }
            if !pairs.insert((m.user_id.as_str(), m.workspace_id.as_str())) {
                return Err(SeedError::Invalid(format!("duplicate membership for user '{}' in workspace '{}'", m.user_id, m.workspace_id)));
            }
        }
        let mut tokens = HashSet::new();
        for t in &self.api_tokens {
            if t.token.trim().is_empty() || t.user_id.trim().is_empty() {
                return Err(SeedError::Invalid("api token with empty token or user_id".into()));
            }
            if t.token.chars().any(char::is_whitespace) {
                return Err(SeedError::Invalid(format!("api token for user '{}' contains whitespace", t.user_id)));
            }
            if !tokens.insert(t.token.as_str()) {
                return Err(SeedError::Invalid(format!("duplicate api token for user '{}'", t.user_id)));
            }
        }
        Ok(())
    }

    pub fn apply(self, store: &InMemoryMembershipStore, sessions: &SessionManager) -> Result<SeedSummary, SeedError> {
        let summary = SeedSummary { memberships: self.memberships.len(), api_tokens: self.api_tokens.len() };
        for m in self.memberships { store.upsert(m); }
        for t in self.api_tokens {
            let principal = Principal {
                user_id: t.user_id,
                authenticated: true,
                attrs: Attrs { email: t.email },
            };
            sessions.install(t.token, principal)?;
        }
        tracing::info!(memberships = summary.memberships, api_tokens = summary.api_tokens, "seed applied");
        Ok(summary)
    }
}
