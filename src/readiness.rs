//! # One-shot readiness gate.
//!
//! A [`ReadinessGate`] tells downstream consumers that a dependency became usable.
//! It leaves its initial state at most once:
//!
//! ```text
//!              try_fire()
//! Unsignaled ─────────────► Signaled       wait() → true
//!      │
//!      │ close()
//!      └──────────────────► Closed         wait() → false
//! ```
//!
//! Both transitions are a single compare-and-swap, so concurrent `try_fire` and
//! `close` calls race safely: exactly one wins, the others are no-ops returning `false`.
//! Every waiter is woken by whichever transition happens.
//!
//! ## Example
//! ```rust
//! use carousel::{GateState, ReadinessGate};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let gate = ReadinessGate::new();
//! let waiter = gate.clone();
//! let handle = tokio::spawn(async move { waiter.wait().await });
//!
//! assert!(gate.try_fire());
//! assert!(!gate.try_fire());
//! assert!(!gate.close());
//! assert_eq!(gate.state(), GateState::Signaled);
//! assert!(handle.await.unwrap());
//! # }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

const UNSIGNALED: u8 = 0;
const SIGNALED: u8 = 1;
const CLOSED: u8 = 2;

/// Observable state of a [`ReadinessGate`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateState {
    /// Nothing happened yet.
    Unsignaled,
    /// The dependency became ready.
    Signaled,
    /// Released without ever becoming ready.
    Closed,
}

struct Inner {
    state: AtomicU8,
    notify: Notify,
}

/// Cloneable handle to a shared one-shot gate.
#[derive(Clone)]
pub struct ReadinessGate {
    inner: Arc<Inner>,
}

impl ReadinessGate {
    /// Creates an unsignaled gate.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                state: AtomicU8::new(UNSIGNALED),
                notify: Notify::new(),
            }),
        }
    }

    /// Signals readiness. Returns `true` only for the call that made the transition.
    pub fn try_fire(&self) -> bool {
        self.transition(SIGNALED)
    }

    /// Releases waiters without signalling readiness, if nothing happened yet.
    ///
    /// Returns `true` only for the call that made the transition.
    pub fn close(&self) -> bool {
        self.transition(CLOSED)
    }

    /// Current state.
    pub fn state(&self) -> GateState {
        match self.inner.state.load(Ordering::Acquire) {
            UNSIGNALED => GateState::Unsignaled,
            SIGNALED => GateState::Signaled,
            _ => GateState::Closed,
        }
    }

    /// True once the gate was fired.
    pub fn is_ready(&self) -> bool {
        self.state() == GateState::Signaled
    }

    /// Waits until the gate leaves `Unsignaled`; returns whether it was fired.
    pub async fn wait(&self) -> bool {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            // Register before reading the state so a concurrent transition cannot be missed.
            notified.as_mut().enable();

            match self.state() {
                GateState::Signaled => return true,
                GateState::Closed => return false,
                GateState::Unsignaled => notified.await,
            }
        }
    }

    /// Like [`wait`](Self::wait) but gives up (returning `false`) when `quit` fires first.
    pub async fn wait_or_cancel(&self, quit: &CancellationToken) -> bool {
        tokio::select! {
            fired = self.wait() => fired,
            _ = quit.cancelled() => self.is_ready(),
        }
    }

    fn transition(&self, to: u8) -> bool {
        let won = self
            .inner
            .state
            .compare_exchange(UNSIGNALED, to, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if won {
            self.inner.notify.notify_waiters();
        }
        won
    }
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ReadinessGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadinessGate")
            .field("state", &self.state())
            .finish()
    }
}
