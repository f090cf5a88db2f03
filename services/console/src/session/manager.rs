//! services/console/src/session/manager.rs
//!
//! The session lifecycle manager: a single task that owns the auth change
//! subscription and the visibility receiver, feeds them through
//! [`SessionLifecycle`] and carries out the resulting effects.
//!
//! Each step (initial query result or change event) is processed to completion,
//! effects included, before the next one is taken, so toasts and notification
//! loads happen in the order the gateway emitted its events.

use crate::notifications::NotificationCenter;
use crate::session::lifecycle::{AuthSnapshot, Effect, SessionLifecycle};
use crate::session::toast::{ToastBoard, ToastRegion};
use futures::StreamExt;
use hr_console_core::domain::{AuthChange, Session, Visibility};
use hr_console_core::ports::{AuthChangeStream, AuthGateway, PortResult};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// The collaborators a manager works with.
pub struct SessionManager {
    lifecycle: SessionLifecycle,
    auth: Arc<dyn AuthGateway>,
    visibility: watch::Receiver<Visibility>,
    notifications: Arc<Mutex<NotificationCenter>>,
    toasts: ToastBoard,
    snapshots: watch::Sender<AuthSnapshot>,
}

impl SessionManager {
    /// Subscribes to session changes, starts the initial session query and
    /// returns a handle to the running manager.
    ///
    /// The subscription is in place before this returns, so no change event
    /// emitted afterwards can be missed.
    pub fn start(
        auth: Arc<dyn AuthGateway>,
        visibility: watch::Receiver<Visibility>,
        notifications: Arc<Mutex<NotificationCenter>>,
        toasts: ToastBoard,
    ) -> SessionManagerHandle {
        let lifecycle = SessionLifecycle::new(*visibility.borrow());
        let (snapshots, snapshot_rx) = watch::channel(lifecycle.snapshot());
        let changes = auth.on_session_change();
        let cancel = CancellationToken::new();

        let manager = SessionManager {
            lifecycle,
            auth,
            visibility,
            notifications,
            toasts,
            snapshots,
        };
        let task = tokio::spawn(manager.run(changes, cancel.clone()));
        info!("Session manager started");

        SessionManagerHandle {
            snapshot: snapshot_rx,
            cancel,
            task: Some(task),
        }
    }

    async fn run(mut self, mut changes: AuthChangeStream, cancel: CancellationToken) {
        let auth = self.auth.clone();
        let mut initial = auth.get_current_session();
        let mut initial_pending = true;
        let mut stream_open = true;

        loop {
            if !initial_pending && !stream_open {
                cancel.cancelled().await;
                break;
            }
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                result = &mut initial, if initial_pending => {
                    initial_pending = false;
                    self.on_initial_session(result).await;
                }
                change = changes.next(), if stream_open => match change {
                    Some(change) => self.on_change(change).await,
                    None => {
                        warn!("Auth change stream closed");
                        stream_open = false;
                    }
                },
            }
        }
        // Dropping `changes` and `self.visibility` here ends both subscriptions.
        info!("Session manager stopped");
    }

    async fn on_initial_session(&mut self, result: PortResult<Option<Session>>) {
        self.sync_focus();
        match result {
            Ok(session) => {
                let effects = self.lifecycle.initial_session(session);
                self.apply(effects).await;
            }
            Err(e) => self.lifecycle.initial_session_failed(e.to_string()),
        }
        self.publish();
    }

    async fn on_change(&mut self, change: AuthChange) {
        // Focus must be current at the moment the event is judged.
        self.sync_focus();
        let effects = self.lifecycle.handle(change);
        self.apply(effects).await;
        self.publish();
    }

    fn sync_focus(&mut self) {
        let visibility = *self.visibility.borrow_and_update();
        self.lifecycle.set_visibility(visibility);
    }

    async fn apply(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::ShowToast(kind) => self.toasts.show(ToastRegion::App, kind.text()).await,
                Effect::LoadNotifications => {
                    if let Err(e) = self.notifications.lock().await.load() {
                        error!("Failed to load notifications: {}", e);
                    }
                }
            }
        }
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.lifecycle.snapshot());
    }
}

/// Handle to a running [`SessionManager`]. Dropping it stops the manager.
pub struct SessionManagerHandle {
    snapshot: watch::Receiver<AuthSnapshot>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl SessionManagerHandle {
    pub fn snapshot(&self) -> AuthSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthSnapshot> {
        self.snapshot.clone()
    }

    /// Waits until a published snapshot satisfies `predicate`.
    ///
    /// Returns the latest snapshot if the manager stops first.
    pub async fn wait_for<F>(&self, predicate: F) -> AuthSnapshot
    where
        F: FnMut(&AuthSnapshot) -> bool,
    {
        let mut receiver = self.snapshot.clone();
        let result = receiver.wait_for(predicate).await.map(|s| s.clone());
        match result {
            Ok(snapshot) => snapshot,
            Err(_) => self.snapshot(),
        }
    }

    /// Stops the manager and waits for it to finish. Safe to call repeatedly.
    pub async fn shutdown(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                error!("Session manager task failed: {}", e);
            }
        }
    }
}

impl Drop for SessionManagerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
