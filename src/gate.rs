//! Action gate
//!
//! User actions (uploads, folder navigation, saving settings) run one at a time.
//! An `ActionGate` owns the state an action mutates and hands out exclusive
//! access either in arrival order (`enter`) or not at all when busy (`try_enter`).

use tokio::sync::{Mutex, MutexGuard};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GateError {
    #[error("Another {0} is still in progress")]
    Busy(&'static str),
}

pub struct ActionGate<T> {
    name: &'static str,
    state: Mutex<T>,
}

impl<T> ActionGate<T> {
    pub fn new(name: &'static str, state: T) -> Self {
        Self {
            name,
            state: Mutex::new(state),
        }
    }

    /// Wait for the running action to finish. Waiters are served FIFO.
    pub async fn enter(&self) -> MutexGuard<'_, T> {
        self.state.lock().await
    }

    /// Enter only if idle, otherwise reject.
    pub fn try_enter(&self) -> Result<MutexGuard<'_, T>, GateError> {
        self.state.try_lock().map_err(|_| {
            tracing::debug!("Rejected {} while another is running", self.name);
            GateError::Busy(self.name)
        })
    }

    pub fn is_busy(&self) -> bool {
        self.state.try_lock().is_err()
    }
}
