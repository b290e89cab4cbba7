use crate::DrainOutcome;

use std::fmt;

/// Coordinator lifecycle. Moves strictly forward: Ready -> Preparing -> Dead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Ready,
    Preparing,
    Dead(DrainOutcome),
}

impl LifecycleState {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    pub fn is_preparing(&self) -> bool {
        matches!(self, Self::Preparing)
    }

    pub fn is_dead(&self) -> bool {
        matches!(self, Self::Dead(_))
    }

    /// True once `begin` has run, whether or not the drain has finished.
    pub fn has_begun(&self) -> bool {
        !self.is_ready()
    }

    pub fn outcome(&self) -> Option<DrainOutcome> {
        match self {
            Self::Dead(outcome) => Some(*outcome),
            _ => None,
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready => write!(f, "ready"),
            Self::Preparing => write!(f, "preparing"),
            Self::Dead(_) => write!(f, "dead"),
        }
    }
}
