#![forbid(unsafe_code)]

//! Errors reported by event targets.

/// Error type for listener registration against an [`EventTarget`](crate::target::EventTarget).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetError {
    /// The host refused to register a listener for this event.
    Rejected {
        /// Target label as reported by [`EventTarget::label`](crate::target::EventTarget::label).
        target: String,
        /// Event name that was refused.
        event: String,
        /// Host-provided reason.
        reason: String,
    },
    /// The target has been closed and no longer accepts listeners.
    Detached {
        /// Target label.
        target: String,
    },
}

impl TargetError {
    /// Label of the target that produced the error.
    #[must_use]
    pub fn target(&self) -> &str {
        match self {
            Self::Rejected { target, .. } | Self::Detached { target } => target,
        }
    }
}

impl std::fmt::Display for TargetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rejected {
                target,
                event,
                reason,
            } => write!(f, "{target} rejected listener for {event:?}: {reason}"),
            Self::Detached { target } => write!(f, "{target} is detached"),
        }
    }
}

impl std::error::Error for TargetError {}
