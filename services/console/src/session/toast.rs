//! services/console/src/session/toast.rs
//!
//! Transient success notices. Each layout region shows at most one toast; a new
//! toast replaces the visible one, and every toast hides itself after
//! [`TOAST_DURATION`] unless it has been replaced in the meantime.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

pub const TOAST_DURATION: Duration = Duration::from_millis(3000);

/// Where a toast is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToastRegion {
    /// The application shell, used for session transitions.
    App,
    /// The signed-in layout, used by the sidebar's sign-out action.
    Layout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub text: String,
    pub visible: bool,
}

struct Slot {
    toast: Toast,
    generation: u64,
}

#[derive(Default)]
struct BoardState {
    slots: HashMap<ToastRegion, Slot>,
    next_generation: u64,
    shown: Vec<(ToastRegion, String)>,
}

/// Shared handle to the toast slots of every region.
#[derive(Clone, Default)]
pub struct ToastBoard {
    inner: Arc<Mutex<BoardState>>,
}

impl ToastBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shows `text` in `region` and schedules its dismissal.
    pub async fn show(&self, region: ToastRegion, text: impl Into<String>) {
        let text = text.into();
        let generation = {
            let mut state = self.inner.lock().await;
            state.next_generation += 1;
            let generation = state.next_generation;
            state.slots.insert(
                region,
                Slot {
                    toast: Toast {
                        text: text.clone(),
                        visible: true,
                    },
                    generation,
                },
            );
            state.shown.push((region, text.clone()));
            generation
        };
        info!(?region, "Toast: {}", text);

        let board = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(TOAST_DURATION).await;
            board.expire(region, generation).await;
        });
    }

    /// Hides the toast in `region` right away (the close button).
    pub async fn dismiss(&self, region: ToastRegion) {
        if let Some(slot) = self.inner.lock().await.slots.get_mut(&region) {
            slot.toast.visible = false;
        }
    }

    /// The visible toast of `region`, if any.
    pub async fn current(&self, region: ToastRegion) -> Option<Toast> {
        self.inner
            .lock()
            .await
            .slots
            .get(&region)
            .filter(|slot| slot.toast.visible)
            .map(|slot| slot.toast.clone())
    }

    /// Every toast shown so far, oldest first.
    pub async fn shown(&self) -> Vec<(ToastRegion, String)> {
        self.inner.lock().await.shown.clone()
    }

    async fn expire(&self, region: ToastRegion, generation: u64) {
        let mut state = self.inner.lock().await;
        match state.slots.get_mut(&region) {
            Some(slot) if slot.generation == generation => {
                slot.toast.visible = false;
                debug!(?region, "Toast expired");
            }
            _ => {}
        }
    }
}
