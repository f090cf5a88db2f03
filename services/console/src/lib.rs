//! services/console/src/lib.rs
//!
//! The HR console library: session lifecycle, notifications, entity stores,
//! auth forms and the adapters backing them.

pub mod adapters;
pub mod config;
pub mod error;
pub mod forms;
pub mod notifications;
pub mod session;
pub mod state;
pub mod stores;
