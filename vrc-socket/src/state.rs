//! Connection state and the observability hook.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

use crate::error::StreamError;

/// Connection state of the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No socket is held; a reconnect is pending.
    Disconnected,
    /// Dialing the pipeline.
    Connecting,
    /// Connected and receiving events.
    Connected,
    /// Shutdown requested; waiting for the read task to exit.
    Closing,
    /// The read task has exited. Terminal.
    Closed,
}

impl ConnectionState {
    /// Whether shutdown has begun.
    pub fn is_shutting_down(self) -> bool {
        matches!(self, Self::Closing | Self::Closed)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Closing => write!(f, "closing"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Optional hook for failures and state changes the stream handles internally.
///
/// Callbacks run on the read task or a dispatch worker and must not block.
pub trait StreamObserver: Send + Sync {
    fn on_state_change(&self, _state: ConnectionState) {}

    fn on_error(&self, _error: &StreamError) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl StreamObserver for NoopObserver {}

/// Current state plus its watchers.
///
/// Once `Closing` is published only `Closed` may follow, and `Closed` is final.
pub(crate) struct StateCell {
    tx: watch::Sender<ConnectionState>,
    observer: Arc<dyn StreamObserver>,
}

impl StateCell {
    pub(crate) fn new(initial: ConnectionState, observer: Arc<dyn StreamObserver>) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx, observer }
    }

    pub(crate) fn get(&self) -> ConnectionState {
        *self.tx.borrow()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.tx.subscribe()
    }

    pub(crate) fn observer(&self) -> &Arc<dyn StreamObserver> {
        &self.observer
    }

    /// Publish `new_state`. Returns false when the transition is not allowed
    /// or the state is unchanged.
    pub(crate) fn set(&self, new_state: ConnectionState) -> bool {
        let mut old_state = new_state;
        let changed = self.tx.send_if_modified(|state| {
            let allowed = match *state {
                ConnectionState::Closed => false,
                ConnectionState::Closing => new_state == ConnectionState::Closed,
                current => current != new_state,
            };
            if allowed {
                old_state = *state;
                *state = new_state;
            }
            allowed
        });
        if changed {
            info!("stream state: {} -> {}", old_state, new_state);
            self.observer.on_state_change(new_state);
        }
        changed
    }

    pub(crate) fn report(&self, error: &StreamError) {
        self.observer.on_error(error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        states: Mutex<Vec<ConnectionState>>,
    }

    impl StreamObserver for Recorder {
        fn on_state_change(&self, state: ConnectionState) {
            self.states.lock().push(state);
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(ConnectionState::Connected.to_string(), "connected");
        assert_eq!(ConnectionState::Closing.to_string(), "closing");
    }

    #[test]
    fn test_transitions_notify_watchers_and_observer() {
        let recorder = Arc::new(Recorder::default());
        let cell = StateCell::new(ConnectionState::Connected, recorder.clone());
        let rx = cell.subscribe();

        assert!(cell.set(ConnectionState::Disconnected));
        assert!(!cell.set(ConnectionState::Disconnected));
        assert!(cell.set(ConnectionState::Connecting));
        assert_eq!(*rx.borrow(), ConnectionState::Connecting);
        assert_eq!(
            *recorder.states.lock(),
            vec![ConnectionState::Disconnected, ConnectionState::Connecting]
        );
    }

    #[test]
    fn test_closing_only_leads_to_closed() {
        let cell = StateCell::new(ConnectionState::Connected, Arc::new(NoopObserver));
        assert!(cell.set(ConnectionState::Closing));
        assert!(!cell.set(ConnectionState::Disconnected));
        assert!(!cell.set(ConnectionState::Connected));
        assert_eq!(cell.get(), ConnectionState::Closing);

        assert!(cell.set(ConnectionState::Closed));
        assert!(!cell.set(ConnectionState::Closing));
        assert!(!cell.set(ConnectionState::Connecting));
        assert_eq!(cell.get(), ConnectionState::Closed);
        assert!(cell.get().is_shutting_down());
    }
}
