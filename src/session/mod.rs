//! Session records and the per-request session gate.
//!
//! # Responsibilities
//! - Define the session record stored in the cache backend
//! - Track the per-request session state machine:
//!   Unresolved -> {Anonymous, Active} -> {Active dirty, Destroyed}
//! - Expose a shared cell so route tables can write through a request
//!   extension while the session stage owns persistence
//!
//! # Design Decisions
//! - Sessions are created only on first write (`saveUninitialized: false`)
//! - Unchanged sessions are never re-persisted (`resave: false`)
//! - Stages after session attachment always observe either an `Active`
//!   record or the explicit `Anonymous` marker, never `Unresolved`

pub mod cookie;
pub mod store;

use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::auth::Identity;

pub use store::{MemorySessionStore, RedisSessionStore, SessionStore, StoreError};

/// Server-side session record, serialized as JSON in the cache backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    #[serde(default)]
    pub user: Option<Identity>,
    /// Per-session CSRF secret, generated lazily.
    #[serde(default)]
    pub csrf_secret: Option<String>,
}

/// Session state for one request.
#[derive(Debug)]
enum SessionGate {
    /// Before the session stage ran.
    Unresolved,
    /// Explicit no-session marker.
    Anonymous,
    Active {
        id: String,
        data: SessionData,
        /// Record changed and must be persisted.
        dirty: bool,
        /// Record was created during this request; the cookie must be set.
        fresh: bool,
    },
    /// Logout: record and cookie are removed on the way out.
    Destroyed { id: String },
}

/// What the session stage must do on the way out.
#[derive(Debug, PartialEq)]
pub enum SessionOutcome {
    Nothing,
    Persist {
        id: String,
        data: SessionData,
        fresh: bool,
    },
    Destroy {
        id: String,
    },
}

/// Shared handle to the request's session gate.
#[derive(Clone)]
pub struct SessionCell(Arc<Mutex<SessionGate>>);

impl SessionCell {
    pub fn unresolved() -> Self {
        Self(Arc::new(Mutex::new(SessionGate::Unresolved)))
    }

    /// Attach a record loaded from the store.
    pub async fn resolve_active(&self, id: String, data: SessionData) {
        *self.0.lock().await = SessionGate::Active {
            id,
            data,
            dirty: false,
            fresh: false,
        };
    }

    /// Mark the request as having no session.
    pub async fn resolve_anonymous(&self) {
        *self.0.lock().await = SessionGate::Anonymous;
    }

    /// True once the session stage resolved the gate either way.
    pub async fn is_resolved(&self) -> bool {
        !matches!(&*self.0.lock().await, SessionGate::Unresolved)
    }

    /// User carried by the active session, if any.
    pub async fn user(&self) -> Option<Identity> {
        match &*self.0.lock().await {
            SessionGate::Active { data, .. } => data.user.clone(),
            _ => None,
        }
    }

    /// CSRF secret of the active session, if one was generated.
    pub async fn csrf_secret(&self) -> Option<String> {
        match &*self.0.lock().await {
            SessionGate::Active { data, .. } => data.csrf_secret.clone(),
            _ => None,
        }
    }

    /// Mutate the session record, creating a fresh record when the request
    /// is anonymous. Returns the session id, or `None` when the gate does
    /// not accept writes (unresolved or destroyed).
    pub async fn update<F>(&self, mutate: F) -> Option<String>
    where
        F: FnOnce(&mut SessionData),
    {
        let mut gate = self.0.lock().await;
        match &mut *gate {
            SessionGate::Active {
                id, data, dirty, ..
            } => {
                mutate(data);
                *dirty = true;
                Some(id.clone())
            }
            SessionGate::Anonymous => {
                let id = Uuid::new_v4().simple().to_string();
                let mut data = SessionData::default();
                mutate(&mut data);
                *gate = SessionGate::Active {
                    id: id.clone(),
                    data,
                    dirty: true,
                    fresh: true,
                };
                Some(id)
            }
            SessionGate::Unresolved | SessionGate::Destroyed { .. } => None,
        }
    }

    /// Fetch the CSRF secret, generating one on first use. An anonymous
    /// request gets a fresh session to hold it: the token rendered into a
    /// form must still be matchable when the form comes back.
    pub async fn get_or_create_csrf_secret(&self) -> Option<String> {
        let mut gate = self.0.lock().await;
        match &mut *gate {
            SessionGate::Active { data, dirty, .. } => match &data.csrf_secret {
                Some(secret) => Some(secret.clone()),
                None => {
                    let secret = generate_csrf_secret();
                    data.csrf_secret = Some(secret.clone());
                    *dirty = true;
                    Some(secret)
                }
            },
            SessionGate::Anonymous => {
                let id = Uuid::new_v4().simple().to_string();
                let secret = generate_csrf_secret();
                *gate = SessionGate::Active {
                    id,
                    data: SessionData {
                        user: None,
                        csrf_secret: Some(secret.clone()),
                    },
                    dirty: true,
                    fresh: true,
                };
                Some(secret)
            }
            SessionGate::Unresolved | SessionGate::Destroyed { .. } => None,
        }
    }

    /// Destroy the session (logout). No-op for anonymous requests.
    pub async fn destroy(&self) {
        let mut gate = self.0.lock().await;
        if let SessionGate::Active { id, .. } = &*gate {
            let id = id.clone();
            *gate = SessionGate::Destroyed { id };
        }
    }

    /// Outcome for the session stage's response hook.
    pub async fn outcome(&self) -> SessionOutcome {
        match &*self.0.lock().await {
            SessionGate::Active {
                id,
                data,
                dirty: true,
                fresh,
            } => SessionOutcome::Persist {
                id: id.clone(),
                data: data.clone(),
                fresh: *fresh,
            },
            SessionGate::Destroyed { id } => SessionOutcome::Destroy { id: id.clone() },
            _ => SessionOutcome::Nothing,
        }
    }
}

fn generate_csrf_secret() -> String {
    let bytes: [u8; 16] = rand::thread_rng().gen();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_anonymous_session_persists_nothing() {
        let cell = SessionCell::unresolved();
        cell.resolve_anonymous().await;
        assert!(cell.is_resolved().await);
        assert_eq!(cell.user().await, None);
        assert_eq!(cell.outcome().await, SessionOutcome::Nothing);
    }

    #[tokio::test]
    async fn test_unchanged_session_is_not_repersisted() {
        let cell = SessionCell::unresolved();
        cell.resolve_active("sid".to_string(), SessionData::default())
            .await;
        assert_eq!(cell.outcome().await, SessionOutcome::Nothing);
    }

    #[tokio::test]
    async fn test_write_through_anonymous_creates_fresh_session() {
        let cell = SessionCell::unresolved();
        cell.resolve_anonymous().await;

        let user = Identity::new(7, "alice");
        let id = cell
            .update(|data| data.user = Some(user.clone()))
            .await
            .expect("write accepted");

        match cell.outcome().await {
            SessionOutcome::Persist {
                id: out_id,
                data,
                fresh,
            } => {
                assert_eq!(out_id, id);
                assert!(fresh);
                assert_eq!(data.user, Some(user));
            }
            other => panic!("expected persist, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_destroy_reports_the_stored_id() {
        let cell = SessionCell::unresolved();
        cell.resolve_active("sid".to_string(), SessionData::default())
            .await;
        cell.destroy().await;
        assert_eq!(
            cell.outcome().await,
            SessionOutcome::Destroy {
                id: "sid".to_string()
            }
        );
        // A destroyed gate refuses further writes.
        assert_eq!(cell.update(|_| {}).await, None);
    }

    #[tokio::test]
    async fn test_csrf_secret_is_lazy_and_stable() {
        let cell = SessionCell::unresolved();
        cell.resolve_active("sid".to_string(), SessionData::default())
            .await;
        let first = cell.get_or_create_csrf_secret().await.unwrap();
        let second = cell.get_or_create_csrf_secret().await.unwrap();
        assert_eq!(first, second);
        // Generating the secret dirties the record.
        assert!(matches!(
            cell.outcome().await,
            SessionOutcome::Persist { .. }
        ));
    }

    #[tokio::test]
    async fn test_csrf_secret_creates_session_for_anonymous_visitor() {
        let cell = SessionCell::unresolved();
        cell.resolve_anonymous().await;

        let secret = cell
            .get_or_create_csrf_secret()
            .await
            .expect("anonymous visitor gets a token-backing session");

        match cell.outcome().await {
            SessionOutcome::Persist { data, fresh, .. } => {
                assert!(fresh);
                assert_eq!(data.csrf_secret, Some(secret));
                assert_eq!(data.user, None);
            }
            other => panic!("expected persist, got {other:?}"),
        }
    }
}
