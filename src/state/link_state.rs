//! Per-URL lifecycle during a crawl
use std::fmt;

/// Represents where a URL is in the crawl process
///
/// `Undiscovered → Queued → Resolving → Resolved`. There is no failure state:
/// a 404 is `Resolved` with that status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkState {
    /// Never admitted to the frontier
    Undiscovered,

    /// Admitted; a GET or HEAD is being handed to the fetcher
    Queued,

    /// Accepted by the fetcher, waiting for its response or error
    Resolving,

    /// A real status code has been recorded
    Resolved,
}

impl LinkState {
    /// Returns true once no further work is expected for the URL
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolved)
    }

    /// Returns true while a request is pending or about to be sent
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Queued | Self::Resolving)
    }

    /// Returns true if moving from `self` to `next` is allowed
    ///
    /// Transitions only move forward, except that a resolved URL may be
    /// resolved again (a redirect or an SSL probe overwriting the status).
    pub fn can_transition_to(&self, next: LinkState) -> bool {
        use LinkState::*;
        matches!(
            (self, next),
            (Undiscovered, Queued)
                | (Queued, Resolving)
                | (Queued, Resolved)
                | (Resolving, Resolved)
                | (Undiscovered, Resolved)
                | (Resolved, Resolved)
        )
    }

    /// Short lowercase name used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Undiscovered => "undiscovered",
            Self::Queued => "queued",
            Self::Resolving => "resolving",
            Self::Resolved => "resolved",
        }
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_terminal() {
        assert!(!LinkState::Undiscovered.is_terminal());
        assert!(!LinkState::Queued.is_terminal());
        assert!(!LinkState::Resolving.is_terminal());
        assert!(LinkState::Resolved.is_terminal());
    }

    #[test]
    fn test_is_active() {
        assert!(LinkState::Queued.is_active());
        assert!(LinkState::Resolving.is_active());
        assert!(!LinkState::Undiscovered.is_active());
        assert!(!LinkState::Resolved.is_active());
    }

    #[test]
    fn test_forward_transitions() {
        assert!(LinkState::Undiscovered.can_transition_to(LinkState::Queued));
        assert!(LinkState::Queued.can_transition_to(LinkState::Resolving));
        assert!(LinkState::Resolving.can_transition_to(LinkState::Resolved));
        assert!(LinkState::Resolved.can_transition_to(LinkState::Resolved));
    }

    #[test]
    fn test_backward_transitions_rejected() {
        assert!(!LinkState::Resolved.can_transition_to(LinkState::Queued));
        assert!(!LinkState::Resolving.can_transition_to(LinkState::Queued));
        assert!(!LinkState::Queued.can_transition_to(LinkState::Undiscovered));
    }

    #[test]
    fn test_display() {
        assert_eq!(LinkState::Resolving.to_string(), "resolving");
    }
}
