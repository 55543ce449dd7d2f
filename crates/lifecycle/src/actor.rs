//! The principal performing an operation.

use serde::{Deserialize, Serialize};

/// Principal on whose behalf an operation runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    name: Option<String>,
    admin: bool,
}

impl Actor {
    /// A regular authenticated user
    pub fn user(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            admin: false,
        }
    }

    /// An administrator
    pub fn admin(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            admin: true,
        }
    }

    /// An unauthenticated caller (e.g. a machine enlisting itself)
    pub fn anonymous() -> Self {
        Self {
            name: None,
            admin: false,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn is_admin(&self) -> bool {
        self.admin
    }

    pub fn is_anonymous(&self) -> bool {
        self.name.is_none()
    }
}
