//! Auto-pause state machine
//!
//! Owned by the lifecycle bridge task. Each transition method returns the
//! new state when the state changed, `None` otherwise.

use serde::Serialize;

/// Pause state of the simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PauseState {
    #[default]
    Running,
    /// Paused by an operator
    Paused,
    /// Paused because only one player is left
    AutoPaused,
}

impl PauseState {
    pub fn is_paused(&self) -> bool {
        !matches!(self, PauseState::Running)
    }
}

#[derive(Debug, Default)]
pub struct PauseMachine {
    state: PauseState,
}

impl PauseMachine {
    pub fn new(initial: PauseState) -> Self {
        Self { state: initial }
    }

    pub fn state(&self) -> PauseState {
        self.state
    }

    /// A player joined. Only clears an automatic pause.
    pub fn on_join(&mut self) -> Option<PauseState> {
        match self.state {
            PauseState::AutoPaused => self.transition(PauseState::Running),
            PauseState::Running | PauseState::Paused => None,
        }
    }

    /// A player left, `remaining` players are still connected
    pub fn on_leave(&mut self, remaining: usize) -> Option<PauseState> {
        match self.state {
            PauseState::Running if remaining == 1 => self.transition(PauseState::AutoPaused),
            _ => None,
        }
    }

    /// Operator pause or resume
    pub fn request(&mut self, paused: bool) -> Option<PauseState> {
        match (self.state, paused) {
            (PauseState::Running | PauseState::AutoPaused, true) => {
                self.transition(PauseState::Paused)
            }
            (PauseState::Paused | PauseState::AutoPaused, false) => {
                self.transition(PauseState::Running)
            }
            _ => None,
        }
    }

    fn transition(&mut self, next: PauseState) -> Option<PauseState> {
        self.state = next;
        Some(next)
    }
}
