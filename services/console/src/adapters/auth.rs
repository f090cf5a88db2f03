//! services/console/src/adapters/auth.rs
//!
//! The Postgres-backed implementation of the `AuthGateway` port.
//!
//! Users live in `auth_users` with argon2 password hashes; every sign-in opens a
//! row in `auth_sessions` that expires after thirty days. The current session is
//! remembered in local storage so a restarted console restores it, and every
//! sign-in/sign-out is fanned out to subscribers, each over its own unbounded queue.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use hr_console_core::domain::{AuthChange, Session, SignUpProfile, User};
use hr_console_core::ports::{
    AuthChangeStream, AuthGateway, LocalStorage, PortError, PortResult,
};
use sqlx::{types::Json, FromRow, PgPool};
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Local storage key holding the serialized current session.
pub const SESSION_STORAGE_KEY: &str = "auth.session";

const SESSION_LIFETIME_DAYS: i64 = 30;

//=========================================================================================
// Change-event Fan-out
//=========================================================================================

/// Delivers every published change to every live subscriber, in publish order.
///
/// Each subscriber owns an unbounded queue, so a slow reader never loses events.
/// Subscribers whose stream was dropped are pruned on the next publish.
#[derive(Clone, Default)]
pub(crate) struct ChangeFanout {
    subscribers: Arc<StdMutex<Vec<mpsc::UnboundedSender<AuthChange>>>>,
}

impl ChangeFanout {
    /// Registers a subscriber. Events published after this call are all delivered.
    pub(crate) fn subscribe(&self) -> AuthChangeStream {
        let (sender, mut receiver) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(sender);
        Box::pin(async_stream::stream! {
            while let Some(change) = receiver.recv().await {
                yield change;
            }
        })
    }

    pub(crate) fn publish(&self, change: AuthChange) {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        subscribers.retain(|subscriber| subscriber.send(change.clone()).is_ok());
        if subscribers.is_empty() {
            info!("Auth change published with no active subscribers");
        }
    }
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An auth adapter that implements the `AuthGateway` port on top of PostgreSQL.
#[derive(Clone)]
pub struct PgAuthGateway {
    pool: PgPool,
    storage: Arc<dyn LocalStorage>,
    events: ChangeFanout,
}

impl PgAuthGateway {
    /// Creates a new `PgAuthGateway`.
    pub fn new(pool: PgPool, storage: Arc<dyn LocalStorage>) -> Self {
        Self {
            pool,
            storage,
            events: ChangeFanout::default(),
        }
    }

    fn stored_session(&self) -> PortResult<Option<Session>> {
        let Some(raw) = self.storage.get(SESSION_STORAGE_KEY)? else {
            return Ok(None);
        };
        match serde_json::from_str::<Session>(&raw) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                warn!("Discarding unreadable stored session: {}", e);
                self.storage.remove(SESSION_STORAGE_KEY)?;
                Ok(None)
            }
        }
    }

    /// Opens a fresh auth session for `user` and remembers it locally.
    async fn open_session(&self, user: User) -> PortResult<Session> {
        let access_token = Uuid::new_v4().to_string();
        let expires_at = Utc::now() + Duration::days(SESSION_LIFETIME_DAYS);

        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(&access_token)
            .bind(user.id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let session = Session {
            access_token,
            user,
            expires_at,
        };
        let serialized =
            serde_json::to_string(&session).map_err(|e| PortError::Unexpected(e.to_string()))?;
        self.storage.set(SESSION_STORAGE_KEY, &serialized)?;
        Ok(session)
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct CredentialsRecord {
    id: Uuid,
    email: String,
    hashed_password: String,
}

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    email: String,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            id: self.id,
            email: self.email,
        }
    }
}

#[derive(FromRow)]
struct AuthSessionRecord {
    id: String,
    user_id: Uuid,
    email: String,
    expires_at: DateTime<Utc>,
}
impl AuthSessionRecord {
    fn to_domain(self) -> Session {
        Session {
            access_token: self.id,
            user: User {
                id: self.user_id,
                email: self.email,
            },
            expires_at: self.expires_at,
        }
    }
}

//=========================================================================================
// `AuthGateway` Trait Implementation
//=========================================================================================

#[async_trait]
impl AuthGateway for PgAuthGateway {
    async fn get_current_session(&self) -> PortResult<Option<Session>> {
        let Some(stored) = self.stored_session()? else {
            return Ok(None);
        };

        let record = sqlx::query_as::<_, AuthSessionRecord>(
            "SELECT s.id, s.user_id, u.email, s.expires_at \
             FROM auth_sessions s JOIN auth_users u ON u.id = s.user_id \
             WHERE s.id = $1 AND s.expires_at > now()",
        )
        .bind(&stored.access_token)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        match record {
            Some(record) => Ok(Some(record.to_domain())),
            None => {
                info!("Stored session is no longer valid, clearing it");
                self.storage.remove(SESSION_STORAGE_KEY)?;
                Ok(None)
            }
        }
    }

    fn on_session_change(&self) -> AuthChangeStream {
        self.events.subscribe()
    }

    async fn sign_in(&self, email: &str, password: &str) -> PortResult<Session> {
        // 1. Get user by email
        let creds = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT id, email, hashed_password FROM auth_users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?
        .ok_or(PortError::Unauthorized)?;

        // 2. Verify password
        let parsed_hash = PasswordHash::new(&creds.hashed_password).map_err(|e| {
            error!("Failed to parse password hash: {:?}", e);
            PortError::Unexpected("Authentication error".to_string())
        })?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .map_err(|_| PortError::Unauthorized)?;

        // 3. Open the session and tell subscribers
        let session = self
            .open_session(User {
                id: creds.id,
                email: creds.email,
            })
            .await?;
        info!("User {} signed in", session.user.id);
        self.events.publish(AuthChange::signed_in(session.clone()));
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        profile: &SignUpProfile,
    ) -> PortResult<User> {
        // 1. Hash the password
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| {
                error!("Failed to hash password: {:?}", e);
                PortError::Unexpected("Failed to hash password".to_string())
            })?
            .to_string();

        // 2. Create the user
        let user = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO auth_users (id, email, hashed_password, metadata) \
             VALUES ($1, $2, $3, $4) RETURNING id, email",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(&password_hash)
        .bind(Json(profile.clone()))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                PortError::Unexpected("User already registered".to_string())
            }
            other => PortError::Unexpected(other.to_string()),
        })?
        .to_domain();

        // 3. New accounts are signed in straight away
        let session = self.open_session(user.clone()).await?;
        info!("User {} registered", user.id);
        self.events.publish(AuthChange::signed_in(session));
        Ok(user)
    }

    async fn sign_out(&self) -> PortResult<()> {
        if let Some(stored) = self.stored_session()? {
            sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
                .bind(&stored.access_token)
                .execute(&self.pool)
                .await
                .map_err(|e| PortError::Unexpected(e.to_string()))?;
        }
        self.storage.remove(SESSION_STORAGE_KEY)?;
        info!("Signed out");
        self.events.publish(AuthChange::signed_out());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use hr_console_core::domain::AuthEvent;

    #[tokio::test]
    async fn slow_subscriber_receives_every_change_in_order() {
        let fanout = ChangeFanout::default();
        let mut stream = fanout.subscribe();
        let session = crate::adapters::MemoryAuthGateway::session_for("hr@example.com");

        for i in 0..100 {
            if i % 2 == 0 {
                fanout.publish(AuthChange::signed_in(session.clone()));
            } else {
                fanout.publish(AuthChange::signed_out());
            }
        }

        for i in 0..100 {
            let change = stream.next().await.unwrap();
            let expected = if i % 2 == 0 {
                AuthEvent::SignedIn
            } else {
                AuthEvent::SignedOut
            };
            assert_eq!(change.event, expected);
        }
    }

    #[tokio::test]
    async fn dropped_subscribers_are_pruned() {
        let fanout = ChangeFanout::default();
        let kept = fanout.subscribe();
        drop(fanout.subscribe());

        fanout.publish(AuthChange::signed_out());
        assert_eq!(fanout.subscribers.lock().unwrap().len(), 1);
        drop(kept);
    }
}
