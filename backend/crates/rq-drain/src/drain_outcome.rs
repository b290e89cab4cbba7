use std::fmt;

/// How a drain ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Every socket closed and every tracker finished
    Clean,
    /// A phase hit its timeout; the counts are what was left behind
    Forced {
        sockets_remaining: usize,
        trackers_remaining: usize,
    },
}

impl DrainOutcome {
    pub(crate) fn from_remaining(sockets_remaining: usize, trackers_remaining: usize) -> Self {
        if sockets_remaining == 0 && trackers_remaining == 0 {
            Self::Clean
        } else {
            Self::Forced {
                sockets_remaining,
                trackers_remaining,
            }
        }
    }

    pub fn is_clean(&self) -> bool {
        matches!(self, Self::Clean)
    }

    pub fn is_forced(&self) -> bool {
        !self.is_clean()
    }
}

impl fmt::Display for DrainOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Clean => write!(f, "clean"),
            Self::Forced {
                sockets_remaining,
                trackers_remaining,
            } => write!(
                f,
                "forced ({sockets_remaining} sockets, {trackers_remaining} trackers left)"
            ),
        }
    }
}
