//! Connection-status state machine for one upstream subscription.

use ledgerway_types::ConnectionStatus;

/// Mirrors the upstream collaborator's connection notifications.
///
/// The tracker has no timers and infers nothing: it stores whatever status it
/// is told, in the order it is told. Before the first notification it
/// reports `disconnected`.
#[derive(Debug)]
pub struct ConnectionStatusTracker {
    current: ConnectionStatus,
    transitions: u64,
}

impl ConnectionStatusTracker {
    pub fn new() -> Self {
        Self::with_initial(ConnectionStatus::Disconnected)
    }

    pub fn with_initial(status: ConnectionStatus) -> Self {
        Self {
            current: status,
            transitions: 0,
        }
    }

    pub fn current(&self) -> ConnectionStatus {
        self.current
    }

    /// Record a notification and return the previous status.
    pub fn apply(&mut self, status: ConnectionStatus) -> ConnectionStatus {
        self.transitions += 1;
        std::mem::replace(&mut self.current, status)
    }

    /// Number of notifications applied so far.
    pub fn transitions(&self) -> u64 {
        self.transitions
    }
}

impl Default for ConnectionStatusTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ConnectionStatus::*;

    #[test]
    fn starts_disconnected() {
        let tracker = ConnectionStatusTracker::new();
        assert_eq!(tracker.current(), Disconnected);
        assert_eq!(tracker.transitions(), 0);
    }

    #[test]
    fn cycles_without_terminal_state() {
        let mut tracker = ConnectionStatusTracker::new();
        for status in [Connecting, Connected, Disconnected, Connecting, Connected] {
            tracker.apply(status);
            assert_eq!(tracker.current(), status);
        }
        assert_eq!(tracker.transitions(), 5);
    }

    #[test]
    fn apply_returns_previous_and_keeps_repeats() {
        let mut tracker = ConnectionStatusTracker::new();
        assert_eq!(tracker.apply(Connected), Disconnected);
        assert_eq!(tracker.apply(Connected), Connected);
        assert_eq!(tracker.transitions(), 2);
    }
}
