//! # Event subscribers for the carousel runtime.
//!
//! This module provides the [`Subscribe`] trait — the injected diagnostics sink —
//! and built-in implementations for events broadcast through the [`Bus`](crate::Bus).
//!
//! ## Architecture
//! ```text
//! ServiceActor ── publish(Event) ──► Bus ──► Orchestrator listener ──► SubscriberSet
//!                                                    │                    │
//!                                                    ▼           ┌────────┴────────┐
//!                                              AliveTracker      ▼                 ▼
//!                                                            LogWriter          Custom
//! ```

mod alive;
mod log;
mod set;
mod subscriber;

pub use alive::AliveTracker;
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscriber::Subscribe;
