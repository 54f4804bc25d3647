//! Request identity: principals, sessions and the provider seam the gate consumes.
//! Keep the public surface thin and split implementation across sub-modules.

mod principal;
mod session;
mod provider;
mod request_context;

pub use principal::{Principal, Attrs};
pub use session::{Session, SessionError, SessionToken, SessionManager};
pub use provider::{IdentityProvider, IdentityError, SessionIdentityProvider};
pub use request_context::{RequestContext, SESSION_COOKIE};
