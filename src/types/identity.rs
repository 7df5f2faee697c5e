//! Authenticated identity as returned by the session provider

use serde::{Deserialize, Serialize};

/// An authenticated user as resolved by the identity provider.
///
/// Every owner-scoped read and write path filters on `id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    /// Stable user id, the owner key for all entities
    pub id: String,
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
    /// Email address
    #[serde(default)]
    pub email: Option<String>,
    /// Avatar URL
    #[serde(default)]
    pub image: Option<String>,
}

impl Identity {
    /// Identity with only an id, for the static token provider and tests
    pub fn from_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            email: None,
            image: None,
        }
    }
}
