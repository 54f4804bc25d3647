pub mod config;
pub mod error;
pub mod gate;
pub mod identity;
pub mod seed;
pub mod server;
pub mod workspace;

pub use gate::{AuthorizationGate, Unauthorized};
