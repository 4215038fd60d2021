//! Session teardown events. The pipeline publishes, the navigation layer subscribes; neither
//! holds a reference to the other.

use tokio::sync::broadcast;
use uuid::Uuid;

pub const SESSION_EXPIRED_NOTICE: &str = "Session expired, please login again.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A credentialed call was refused; the store has already been cleared.
    Expired { notice: String, request_id: Uuid },
    /// The user logged out explicitly.
    SignedOut,
}

#[derive(Debug, Clone)]
pub struct SessionEvents {
    tx: broadcast::Sender<SessionEvent>,
}

impl Default for SessionEvents {
    fn default() -> Self { Self::new(16) }
}

impl SessionEvents {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> { self.tx.subscribe() }

    /// Returns how many subscribers saw the event. Zero subscribers is not an error.
    pub fn publish(&self, event: SessionEvent) -> usize {
        match self.tx.send(event) {
            Ok(n) => n,
            Err(broadcast::error::SendError(ev)) => {
                tracing::debug!(target: "session", ?ev, "session event had no subscribers");
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_in_order() {
        let events = SessionEvents::default();
        let mut rx = events.subscribe();
        let id = Uuid::new_v4();
        assert_eq!(events.publish(SessionEvent::Expired { notice: SESSION_EXPIRED_NOTICE.into(), request_id: id }), 1);
        assert_eq!(events.publish(SessionEvent::SignedOut), 1);
        assert_eq!(rx.recv().await.unwrap(), SessionEvent::Expired { notice: SESSION_EXPIRED_NOTICE.into(), request_id: id });
        assert_eq!(rx.recv().await.unwrap(), SessionEvent::SignedOut);
    }

    #[test]
    fn publishing_without_subscribers_is_fine() {
        let events = SessionEvents::new(0);
        assert_eq!(events.publish(SessionEvent::SignedOut), 0);
    }
}
