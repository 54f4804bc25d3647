//! Workspace roles, memberships and the permission check over them.

mod role;
mod membership;
mod memory_store;
mod authorizer;

pub use role::{Role, ParseRoleError};
pub use membership::{Membership, MembershipStore, StoreError};
pub use memory_store::InMemoryMembershipStore;
pub use authorizer::{AccessDecision, DenyReason, WorkspaceAuthorizer};
