use std::sync::Arc;

use thiserror::Error;

use super::principal::Principal;
use super::request_context::RequestContext;
use super::session::SessionManager;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("identity backend unavailable: {0}")]
    Unavailable(String),
    #[error("malformed credentials: {0}")]
    Malformed(String),
}

/// Resolves the principal behind a request. `Ok(None)` means "not logged in".
pub trait IdentityProvider: Send + Sync {
    fn current_principal(&self, ctx: &RequestContext) -> Result<Option<Principal>, IdentityError>;
}

/// Identity provider backed by locally issued session tokens.
pub struct SessionIdentityProvider {
    sessions: Arc<SessionManager>,
}

impl SessionIdentityProvider {
    pub fn new(sessions: Arc<SessionManager>) -> Self { Self { sessions } }
}

impl IdentityProvider for SessionIdentityProvider {
    fn current_principal(&self, ctx: &RequestContext) -> Result<Option<Principal>, IdentityError> {
        let Some(token) = ctx.token.as_deref() else { return Ok(None); };
        if token.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(IdentityError::Malformed("token contains whitespace".into()));
        }
        Ok(self.sessions.validate(token))
    }
}
