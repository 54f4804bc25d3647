use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Attrs {
    #[serde(default)]
    pub email: Option<String>,
}

/// The authenticated identity making a request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Principal {
    pub user_id: String,
    #[serde(default)]
    pub authenticated: bool,
    #[serde(default)]
    pub attrs: Attrs,
}

impl Principal {
    pub fn authenticated(user_id: impl Into<String>) -> Self {
        Self { user_id: user_id.into(), authenticated: true, attrs: Attrs::default() }
    }

    /// A principal is only usable when the provider vouched for it and it names someone.
    pub fn is_valid(&self) -> bool { self.authenticated && !self.user_id.trim().is_empty() }
}
