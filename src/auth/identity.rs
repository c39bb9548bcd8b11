//! Authenticated identity.

use serde::{Deserialize, Serialize};

/// User identity attached to the request context after a successful OAuth
/// handshake or a valid session lookup. Absent means anonymous.
///
/// The identity serializes as itself into the session record; there is no
/// database lookup on deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: u64,
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl Identity {
    pub fn new(id: u64, login: impl Into<String>) -> Self {
        Self {
            id,
            login: login.into(),
            name: None,
            avatar_url: None,
        }
    }
}
