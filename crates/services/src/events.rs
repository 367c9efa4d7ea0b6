//! Typed auth event channel: components react to sign-in state changes by
//! subscribing here instead of polling stored credentials.

use tokio::sync::broadcast;

use exam_core::model::LearnerId;

/// Auth state changes published to interested components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    /// The learner explicitly signed out of the exam context.
    SignedOut { learner: LearnerId },
    /// Stored credentials were rejected by the backend (401) and cleared.
    SessionExpired,
}

/// Broadcast channel for `AuthEvent`s. Cloneable; late subscribers only see
/// events published after they subscribe.
#[derive(Clone)]
pub struct AuthEvents {
    tx: broadcast::Sender<AuthEvent>,
}

impl AuthEvents {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(16);
        Self { tx }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.tx.subscribe()
    }

    /// Publish an event. A send with no live subscribers is not an error.
    pub fn emit(&self, event: AuthEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for AuthEvents {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let events = AuthEvents::new();
        let mut rx = events.subscribe();

        events.emit(AuthEvent::SessionExpired);
        assert_eq!(rx.recv().await.unwrap(), AuthEvent::SessionExpired);
    }

    #[test]
    fn emitting_without_subscribers_is_a_no_op() {
        let events = AuthEvents::new();
        events.emit(AuthEvent::SignedOut {
            learner: LearnerId::new(1),
        });
    }
}
