//! Stop control for the turn in flight.

use std::sync::{Arc, Mutex, PoisonError};

use parley_common::ValidationError;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Default)]
struct ControlState {
    generating: bool,
    token: CancellationToken,
}

/// Cloneable handle that can stop the current turn from another task.
///
/// Each turn gets a fresh [`CancellationToken`], so a stop issued while idle
/// or during an earlier turn never affects the next one.
#[derive(Clone, Default)]
pub struct TurnControl {
    inner: Arc<Mutex<ControlState>>,
}

impl TurnControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that the current turn stop. Returns `false` (and does
    /// nothing) when no turn is running.
    pub fn stop(&self) -> bool {
        let state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if !state.generating {
            return false;
        }
        state.token.cancel();
        debug!("stop requested");
        true
    }

    pub fn is_generating(&self) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .generating
    }

    /// Enter the generating state with a fresh token. The returned guard
    /// leaves it again when dropped.
    pub(crate) fn begin(&self) -> Result<TurnGuard, ValidationError> {
        let mut state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if state.generating {
            return Err(ValidationError::TurnInProgress);
        }
        state.generating = true;
        state.token = CancellationToken::new();
        Ok(TurnGuard {
            control: self.clone(),
            token: state.token.clone(),
        })
    }

    fn finish(&self) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .generating = false;
    }
}

/// Marks a turn as running for as long as it lives.
pub(crate) struct TurnGuard {
    control: TurnControl,
    token: CancellationToken,
}

impl TurnGuard {
    pub(crate) fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

impl Drop for TurnGuard {
    fn drop(&mut self) {
        self.control.finish();
    }
}
