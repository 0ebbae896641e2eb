//! Invocation outcomes

use crate::fault::FailureKind;
use crate::progress::ProgressRecord;

/// Result of exactly one invocation
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<M> {
    /// Operation finished; `None` for deletes
    Success(Option<M>),

    /// Operation stopped; `message` is the remote message verbatim
    Failed { kind: FailureKind, message: String },

    /// Re-invoke no sooner than `delay_seconds` with `progress`
    InProgress {
        delay_seconds: u64,
        progress: ProgressRecord<M>,
    },
}

impl<M> Outcome<M> {
    pub fn failed(kind: FailureKind, message: impl Into<String>) -> Self {
        Self::Failed {
            kind,
            message: message.into(),
        }
    }

    pub fn in_progress(delay_seconds: u64, progress: ProgressRecord<M>) -> Self {
        Self::InProgress {
            delay_seconds,
            progress,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::InProgress { .. })
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Failed { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

impl<M> std::fmt::Display for Outcome<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Success(_) => write!(f, "success"),
            Outcome::Failed { kind, message } => write!(f, "failed ({}): {}", kind, message),
            Outcome::InProgress { delay_seconds, .. } => {
                write!(f, "in progress (retry in {}s)", delay_seconds)
            }
        }
    }
}
