//! services/console/src/forms.rs
//!
//! The login, registration and logout actions behind the auth pages.
//!
//! None of them touches the session state directly. The gateway publishes the
//! resulting change event and the session manager reacts to it.

use crate::session::{ToastBoard, ToastRegion};
use crate::stores::BusyFlag;
use chrono::Utc;
use hr_console_core::domain::{SignUpProfile, User, UserProfile};
use hr_console_core::ports::{AuthGateway, PortError, Table, TableGateway};
use std::sync::Arc;
use tracing::{error, info, warn};

/// An inline form error. The display text is what the form shows.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FormError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Remote(String),
}

impl From<PortError> for FormError {
    fn from(e: PortError) -> Self {
        FormError::Remote(e.message())
    }
}

#[derive(Debug, Clone, Default)]
pub struct RegistrationForm {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub confirm_password: String,
}

/// Splits a display name on its first space into first and last name.
fn split_name(name: &str) -> (String, String) {
    match name.trim().split_once(' ') {
        Some((first, last)) => (first.to_string(), last.trim().to_string()),
        None => (name.trim().to_string(), String::new()),
    }
}

pub struct AuthForms {
    auth: Arc<dyn AuthGateway>,
    tables: Arc<dyn TableGateway>,
    toasts: ToastBoard,
    busy: BusyFlag,
}

impl AuthForms {
    pub fn new(
        auth: Arc<dyn AuthGateway>,
        tables: Arc<dyn TableGateway>,
        toasts: ToastBoard,
    ) -> Self {
        Self {
            auth,
            tables,
            toasts,
            busy: BusyFlag::default(),
        }
    }

    pub fn is_submitting(&self) -> bool {
        self.busy.is_set()
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<(), FormError> {
        let _busy = self.busy.acquire();
        match self.auth.sign_in(email, password).await {
            Ok(_) => {
                info!(email, "Login submitted");
                Ok(())
            }
            Err(e) => {
                warn!(email, "Login failed: {}", e);
                Err(e.into())
            }
        }
    }

    /// Creates the account, then writes the user's profile row.
    pub async fn register(&self, form: &RegistrationForm) -> Result<User, FormError> {
        if form.password != form.confirm_password {
            return Err(FormError::Validation("Passwords do not match".to_string()));
        }
        let _busy = self.busy.acquire();

        let profile = SignUpProfile {
            name: form.name.clone(),
            phone: form.phone.clone(),
        };
        let user = self
            .auth
            .sign_up(&form.email, &form.password, &profile)
            .await
            .map_err(|e| {
                warn!(email = %form.email, "Sign-up failed: {}", e);
                FormError::from(e)
            })?;

        let (first_name, last_name) = split_name(&form.name);
        let record = UserProfile {
            id: user.id,
            email: form.email.clone(),
            first_name,
            last_name,
            phone: form.phone.clone(),
            created_at: Utc::now(),
        };
        let row = serde_json::to_value(&record)
            .map_err(|e| FormError::Remote(format!("DB Error: {}", e)))?;
        if let Err(e) = self.tables.insert(Table::UserCredentials, row).await {
            error!(user = %user.id, "Failed to store the user profile: {}", e);
            return Err(FormError::Remote(format!("DB Error: {}", e.message())));
        }

        info!(user = %user.id, "Registered new user");
        Ok(user)
    }

    pub async fn sign_out(&self) -> Result<(), FormError> {
        let _busy = self.busy.acquire();
        if let Err(e) = self.auth.sign_out().await {
            error!("Sign-out failed: {}", e);
            return Err(e.into());
        }
        self.toasts.show(ToastRegion::Layout, "Successfully logged out!").await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{MemoryAuthGateway, MemoryTableGateway};
    use async_trait::async_trait;
    use hr_console_core::domain::Session;
    use hr_console_core::ports::{AuthChangeStream, PortResult};
    use tokio::sync::{oneshot, Mutex, Notify};

    /// Delegates to the in-memory gateway, but parks `sign_in` until released.
    struct GatedAuth {
        inner: MemoryAuthGateway,
        entered: Notify,
        gate: Mutex<Option<oneshot::Receiver<()>>>,
    }

    #[async_trait]
    impl AuthGateway for GatedAuth {
        async fn get_current_session(&self) -> PortResult<Option<Session>> {
            self.inner.get_current_session().await
        }

        fn on_session_change(&self) -> AuthChangeStream {
            self.inner.on_session_change()
        }

        async fn sign_in(&self, email: &str, password: &str) -> PortResult<Session> {
            let gate = self.gate.lock().await.take();
            self.entered.notify_one();
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            self.inner.sign_in(email, password).await
        }

        async fn sign_up(
            &self,
            email: &str,
            password: &str,
            profile: &SignUpProfile,
        ) -> PortResult<User> {
            self.inner.sign_up(email, password, profile).await
        }

        async fn sign_out(&self) -> PortResult<()> {
            self.inner.sign_out().await
        }
    }

    #[test]
    fn names_split_on_the_first_space() {
        assert_eq!(
            split_name("Ada King Lovelace"),
            ("Ada".to_string(), "King Lovelace".to_string())
        );
        assert_eq!(split_name("Plato"), ("Plato".to_string(), String::new()));
    }

    #[tokio::test]
    async fn finishing_sign_out_keeps_a_pending_login_submitting() {
        let (release, gate) = oneshot::channel();
        let auth = Arc::new(GatedAuth {
            inner: MemoryAuthGateway::new(),
            entered: Notify::new(),
            gate: Mutex::new(Some(gate)),
        });
        auth.inner.add_account("hr@example.com", "secret").await;
        let forms = AuthForms::new(
            auth.clone(),
            Arc::new(MemoryTableGateway::new()),
            ToastBoard::new(),
        );

        let (login, ()) = tokio::join!(forms.login("hr@example.com", "secret"), async {
            auth.entered.notified().await;
            assert!(forms.is_submitting());

            forms.sign_out().await.unwrap();
            assert!(forms.is_submitting());

            release.send(()).unwrap();
        });

        login.unwrap();
        assert!(!forms.is_submitting());
    }
}
