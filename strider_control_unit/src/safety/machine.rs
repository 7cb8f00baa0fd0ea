//! Global safety latch: `Normal → Tripped`.
//!
//! `Tripped` is terminal for the lifetime of a run. [`SafetyStateMachine::trip`]
//! is the only transition; there is no reset.

use strider_common::robot::state::{SafetyState, TripCause};

/// Result of a trip request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SafetyTransition {
    /// `Normal → Tripped`; the given cause is recorded.
    Tripped,
    /// Already tripped; the original cause is kept.
    AlreadyTripped,
}

#[derive(Debug, Clone, Default)]
pub struct SafetyStateMachine {
    state: SafetyState,
    cause: Option<TripCause>,
}

impl SafetyStateMachine {
    pub const fn new() -> Self {
        Self {
            state: SafetyState::Normal,
            cause: None,
        }
    }

    #[inline]
    pub const fn state(&self) -> SafetyState {
        self.state
    }

    #[inline]
    pub const fn is_tripped(&self) -> bool {
        self.state.is_tripped()
    }

    /// Cause of the first trip, if any.
    pub fn cause(&self) -> Option<&TripCause> {
        self.cause.as_ref()
    }

    /// Close the latch. Only the first cause is recorded.
    pub fn trip(&mut self, cause: TripCause) -> SafetyTransition {
        match self.state {
            SafetyState::Normal => {
                self.state = SafetyState::Tripped;
                self.cause = Some(cause);
                SafetyTransition::Tripped
            }
            SafetyState::Tripped => SafetyTransition::AlreadyTripped,
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
