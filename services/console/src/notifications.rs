//! services/console/src/notifications.rs
//!
//! The notification center: the ordered list of notices behind the header bell.
//!
//! The collection is mirrored to local storage under [`NOTIFICATIONS_KEY`]. Every
//! mutation builds the next collection, persists it, and only then replaces the
//! in-memory copy, so memory and storage agree whenever a call returns, whether
//! it succeeded or not. Separate consoles sharing one profile overwrite each
//! other's writes (last writer wins).

use chrono::{TimeZone, Utc};
use hr_console_core::domain::{Notification, NotificationFilter};
use hr_console_core::ports::{LocalStorage, PortError, PortResult};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Local storage key of the persisted collection.
pub const NOTIFICATIONS_KEY: &str = "notifications";

/// The placeholder notices written on first use of a profile.
pub fn seed_notifications() -> Vec<Notification> {
    vec![
        Notification {
            id: 1,
            message: "Pending leave request".to_string(),
            category: "request".to_string(),
            target_link: "/employees/requests".to_string(),
            is_read: false,
            created_at: Utc.with_ymd_and_hms(2025, 4, 22, 10, 0, 0).single().unwrap_or_default(),
        },
        Notification {
            id: 2,
            message: "New project assigned".to_string(),
            category: "info".to_string(),
            target_link: "/projects".to_string(),
            is_read: false,
            created_at: Utc.with_ymd_and_hms(2025, 4, 21, 15, 30, 0).single().unwrap_or_default(),
        },
    ]
}

pub struct NotificationCenter {
    storage: Arc<dyn LocalStorage>,
    notifications: Vec<Notification>,
    loaded: bool,
}

impl NotificationCenter {
    pub fn new(storage: Arc<dyn LocalStorage>) -> Self {
        Self {
            storage,
            notifications: Vec::new(),
            loaded: false,
        }
    }

    /// Loads the persisted collection, seeding it on first use.
    ///
    /// An existing collection is taken verbatim and never overwritten. One that
    /// cannot be parsed, or that repeats an id, is replaced by the seed.
    pub fn load(&mut self) -> PortResult<()> {
        match self.storage.get(NOTIFICATIONS_KEY)? {
            Some(raw) => match parse_collection(&raw) {
                Ok(notifications) => {
                    debug!("Loaded {} notifications", notifications.len());
                    self.notifications = notifications;
                    self.loaded = true;
                }
                Err(reason) => {
                    warn!("Persisted notifications are unusable ({}), re-seeding", reason);
                    self.reseed()?;
                }
            },
            None => {
                info!("No persisted notifications, seeding placeholders");
                self.reseed()?;
            }
        }
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn filter(&self, filter: NotificationFilter) -> Vec<&Notification> {
        self.notifications
            .iter()
            .filter(|n| match filter {
                NotificationFilter::All => true,
                NotificationFilter::Unread => !n.is_read,
            })
            .collect()
    }

    pub fn unread_count(&self) -> usize {
        self.notifications.iter().filter(|n| !n.is_read).count()
    }

    pub fn mark_read(&mut self, id: i64) -> PortResult<()> {
        self.set_read(id, true)
    }

    pub fn mark_unread(&mut self, id: i64) -> PortResult<()> {
        self.set_read(id, false)
    }

    /// Marks every unread entry read with a single write.
    pub fn mark_all_read(&mut self) -> PortResult<()> {
        self.apply(|notifications| {
            notifications
                .iter_mut()
                .filter(|n| !n.is_read)
                .for_each(|n| n.is_read = true);
        })
    }

    pub fn delete(&mut self, id: i64) -> PortResult<()> {
        self.apply(|notifications| notifications.retain(|n| n.id != id))
    }

    /// Marks the entry read and returns the route it points to.
    pub fn open(&mut self, id: i64) -> PortResult<Option<String>> {
        self.mark_read(id)?;
        Ok(self
            .notifications
            .iter()
            .find(|n| n.id == id)
            .map(|n| n.target_link.clone()))
    }

    fn set_read(&mut self, id: i64, is_read: bool) -> PortResult<()> {
        self.apply(|notifications| {
            if let Some(entry) = notifications.iter_mut().find(|n| n.id == id) {
                entry.is_read = is_read;
            }
        })
    }

    /// Persist-then-commit. Unknown ids still rewrite the (unchanged) collection.
    fn apply<F>(&mut self, change: F) -> PortResult<()>
    where
        F: FnOnce(&mut Vec<Notification>),
    {
        if !self.loaded {
            self.load()?;
        }
        let mut next = self.notifications.clone();
        change(&mut next);
        self.persist(&next)?;
        self.notifications = next;
        Ok(())
    }

    fn reseed(&mut self) -> PortResult<()> {
        let seed = seed_notifications();
        self.persist(&seed)?;
        self.notifications = seed;
        self.loaded = true;
        Ok(())
    }

    fn persist(&self, notifications: &[Notification]) -> PortResult<()> {
        let serialized = serde_json::to_string(notifications)
            .map_err(|e| PortError::Storage(e.to_string()))?;
        self.storage.set(NOTIFICATIONS_KEY, &serialized).map_err(|e| {
            warn!("Failed to persist notifications: {}", e);
            e
        })
    }
}

fn parse_collection(raw: &str) -> Result<Vec<Notification>, String> {
    let notifications: Vec<Notification> =
        serde_json::from_str(raw).map_err(|e| e.to_string())?;
    let mut seen = HashSet::new();
    if let Some(duplicate) = notifications.iter().find(|n| !seen.insert(n.id)) {
        return Err(format!("duplicate id {}", duplicate.id));
    }
    Ok(notifications)
}
