//! In-memory registry of authenticated portal sessions
//!
//! One [`ErpSession`] per username. Each entry sits behind its own mutex so
//! concurrent dashboard fetches for the same user never interleave on one
//! cookie jar, while different users proceed in parallel.
//!
//! Entries live as long as the token issued with them. Expired entries are
//! invisible to [`SessionRegistry::get`] and are swept on every insert.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::debug;
use tokio::sync::{Mutex, RwLock};

use crate::portal::ErpSession;

pub type SharedSession = Arc<Mutex<ErpSession>>;

#[derive(Debug)]
struct Entry {
    session: SharedSession,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Entry>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a session until `expires_at`, replacing any previous one for
    /// the same user
    pub async fn insert(&self, session: ErpSession, expires_at: DateTime<Utc>) {
        self.insert_at(session, expires_at, Utc::now()).await
    }

    pub async fn insert_at(
        &self,
        session: ErpSession,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) {
        let username = session.username().to_string();
        let mut sessions = self.sessions.write().await;

        let before = sessions.len();
        sessions.retain(|_, entry| entry.expires_at > now);
        if sessions.len() < before {
            debug!("Swept {} expired portal session(s)", before - sessions.len());
        }

        let entry = Entry {
            session: Arc::new(Mutex::new(session)),
            expires_at,
        };
        if sessions.insert(username.clone(), entry).is_some() {
            debug!("[{}] replaced existing portal session", username);
        }
    }

    pub async fn get(&self, username: &str) -> Option<SharedSession> {
        self.get_at(username, Utc::now()).await
    }

    /// The user's session, unless it expired at or before `now`
    pub async fn get_at(&self, username: &str, now: DateTime<Utc>) -> Option<SharedSession> {
        self.sessions
            .read()
            .await
            .get(username)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.session.clone())
    }

    /// Drop the user's session. Returns whether one existed.
    pub async fn remove(&self, username: &str) -> bool {
        self.sessions.write().await.remove(username).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
