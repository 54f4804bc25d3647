//! Authorization gate: the single entry point handlers use to turn a request
//! into a principal and to check workspace roles.

use std::sync::Arc;

use crate::error::AppError;
use crate::identity::{IdentityProvider, Principal, RequestContext};
use crate::workspace::{MembershipStore, Role, WorkspaceAuthorizer};

pub const UNAUTHORIZED_CODE: &str = "Unauthorized";
pub const UNAUTHORIZED_MESSAGE: &str = "Authentication required";
pub const FORBIDDEN_CODE: &str = "Forbidden";
pub const FORBIDDEN_MESSAGE: &str = "Insufficient permissions";

/// No usable principal behind the request. Carries no internal detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unauthorized;

impl Unauthorized {
    pub fn code(&self) -> &'static str { UNAUTHORIZED_CODE }
    pub fn message(&self) -> &'static str { UNAUTHORIZED_MESSAGE }
}

impl From<Unauthorized> for AppError {
    fn from(u: Unauthorized) -> Self { AppError::unauthorized(u.code(), u.message()) }
}

pub struct AuthorizationGate {
    identity: Arc<dyn IdentityProvider>,
    authorizer: WorkspaceAuthorizer,
}

impl AuthorizationGate {
    pub fn new(identity: Arc<dyn IdentityProvider>, store: Arc<dyn MembershipStore>) -> Self {
        Self { identity, authorizer: WorkspaceAuthorizer::new(store) }
    }

    /// Resolve the request's principal; every failure path is `Unauthorized`.
    pub fn require_authenticated(&self, ctx: &RequestContext) -> Result<Principal, Unauthorized> {
        match self.identity.current_principal(ctx) {
            Ok(Some(p)) if p.is_valid() => Ok(p),
            Ok(Some(p)) => {
                tracing::debug!(user = %p.user_id, request_id = ?ctx.request_id, "auth.reject invalid principal");
                Err(Unauthorized)
            }
            Ok(None) => Err(Unauthorized),
            Err(e) => {
                tracing::warn!(error = %e, request_id = ?ctx.request_id, "auth.reject identity provider error");
                Err(Unauthorized)
            }
        }
    }

    pub fn has_workspace_permission(&self, user_id: &str, workspace_id: &str, required: Option<Role>) -> bool {
        self.authorizer.has_workspace_permission(user_id, workspace_id, required)
    }

    /// 401 without a principal, 403 when the principal lacks `required` in the workspace.
    pub fn require_workspace_role(&self, ctx: &RequestContext, workspace_id: &str, required: Option<Role>) -> Result<Principal, AppError> {
        let principal = self.require_authenticated(ctx)?;
        if !self.has_workspace_permission(&principal.user_id, workspace_id, required) {
            return Err(AppError::forbidden(FORBIDDEN_CODE, FORBIDDEN_MESSAGE));
        }
        Ok(principal)
    }
}
