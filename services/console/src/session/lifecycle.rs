//! services/console/src/session/lifecycle.rs
//!
//! The authentication state machine, free of any I/O.
//!
//! It consumes the initial-session result and session change events one at a
//! time and answers with the effects the driver must carry out (toasts and
//! notification loads). Keeping it synchronous makes every ordering of events
//! directly testable.

use hr_console_core::domain::{AuthChange, AuthEvent, Session, Visibility};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Initializing,
    SignedOut,
    SignedIn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    LoggedIn,
    LoggedOut,
}

impl ToastKind {
    pub fn text(self) -> &'static str {
        match self {
            ToastKind::LoggedIn => "Logged in successfully!",
            ToastKind::LoggedOut => "Logged out successfully!",
        }
    }
}

/// Work requested by the state machine after a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    ShowToast(ToastKind),
    LoadNotifications,
}

/// What the view layer gets to see of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSnapshot {
    pub state: AuthState,
    pub session: Option<Session>,
    pub last_error: Option<String>,
    /// Number of change events processed so far, ignored kinds included.
    pub events_processed: u64,
}

impl AuthSnapshot {
    pub fn is_signed_in(&self) -> bool {
        self.state == AuthState::SignedIn
    }
}

pub struct SessionLifecycle {
    state: AuthState,
    session: Option<Session>,
    tab_focused: bool,
    // Set once the login toast fired; cleared by every sign-out.
    login_toast_latched: bool,
    // The first observation is a page-load restoration and never toasts.
    first_observation_pending: bool,
    last_error: Option<String>,
    events_processed: u64,
}

impl SessionLifecycle {
    pub fn new(visibility: Visibility) -> Self {
        Self {
            state: AuthState::Initializing,
            session: None,
            tab_focused: visibility.is_visible(),
            login_toast_latched: false,
            first_observation_pending: true,
            last_error: None,
            events_processed: 0,
        }
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn is_tab_focused(&self) -> bool {
        self.tab_focused
    }

    pub fn login_toast_latched(&self) -> bool {
        self.login_toast_latched
    }

    pub fn snapshot(&self) -> AuthSnapshot {
        AuthSnapshot {
            state: self.state,
            session: self.session.clone(),
            last_error: self.last_error.clone(),
            events_processed: self.events_processed,
        }
    }

    pub fn set_visibility(&mut self, visibility: Visibility) {
        self.tab_focused = visibility.is_visible();
    }

    /// Applies the result of the startup session query.
    ///
    /// A result arriving after an event already settled the state is stale and dropped.
    pub fn initial_session(&mut self, session: Option<Session>) -> Vec<Effect> {
        if self.state != AuthState::Initializing {
            debug!("Initial session arrived after a change event, discarding it");
            return Vec::new();
        }
        self.first_observation_pending = false;
        self.last_error = None;
        match session {
            Some(session) => {
                info!("Restored session for user {}", session.user.id);
                self.state = AuthState::SignedIn;
                self.session = Some(session);
                vec![Effect::LoadNotifications]
            }
            None => {
                info!("No session to restore");
                self.state = AuthState::SignedOut;
                self.session = None;
                Vec::new()
            }
        }
    }

    /// Records a failed startup query. The state is left untouched.
    pub fn initial_session_failed(&mut self, message: String) {
        warn!("Failed to fetch the current session: {}", message);
        self.last_error = Some(message);
    }

    pub fn handle(&mut self, change: AuthChange) -> Vec<Effect> {
        self.events_processed += 1;
        let first_observation = std::mem::replace(&mut self.first_observation_pending, false);

        match change.event {
            AuthEvent::SignedIn => {
                let Some(session) = change.session else {
                    warn!("SIGNED_IN event without a session, ignoring it");
                    return Vec::new();
                };
                if self.state != AuthState::SignedIn {
                    info!("Signed in as user {}", session.user.id);
                }
                self.state = AuthState::SignedIn;
                self.session = Some(session);
                self.last_error = None;

                let mut effects = vec![Effect::LoadNotifications];
                if self.tab_focused && !self.login_toast_latched && !first_observation {
                    effects.push(Effect::ShowToast(ToastKind::LoggedIn));
                    self.login_toast_latched = true;
                }
                effects
            }
            AuthEvent::SignedOut => {
                if self.state != AuthState::SignedOut {
                    info!("Signed out");
                }
                self.state = AuthState::SignedOut;
                self.session = None;
                self.last_error = None;
                self.login_toast_latched = false;

                if self.tab_focused {
                    vec![Effect::ShowToast(ToastKind::LoggedOut)]
                } else {
                    Vec::new()
                }
            }
            other => {
                debug!(event = ?other, "Ignoring auth event");
                Vec::new()
            }
        }
    }
}
