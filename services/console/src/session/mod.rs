pub mod lifecycle;
pub mod manager;
pub mod toast;

pub use lifecycle::{AuthSnapshot, AuthState, Effect, SessionLifecycle, ToastKind};
pub use manager::{SessionManager, SessionManagerHandle};
pub use toast::{Toast, ToastBoard, ToastRegion, TOAST_DURATION};
