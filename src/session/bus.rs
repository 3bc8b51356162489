use std::sync::{Arc, Weak};

use tokio::sync::broadcast;
use uuid::Uuid;

use super::store::SessionStore;

// Session changes are tiny and rare; a small ring is plenty.
const BUS_CAPACITY: usize = 16;

/// A session change announced to every other live client instance.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    SignedIn { origin: Uuid, token: String },
    TokenRefreshed { origin: Uuid, token: String },
    SignedOut { origin: Uuid },
}

impl SessionEvent {
    pub fn origin(&self) -> Uuid {
        match self {
            SessionEvent::SignedIn { origin, .. }
            | SessionEvent::TokenRefreshed { origin, .. }
            | SessionEvent::SignedOut { origin } => *origin,
        }
    }
}

/// Same-origin publish/subscribe channel for session changes. Clone a bus
/// into every client instance that should observe the same account; events
/// are delivered without polling and dropped silently when nobody listens.
#[derive(Debug, Clone)]
pub struct SessionBus {
    tx: broadcast::Sender<SessionEvent>,
}

impl SessionBus {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(BUS_CAPACITY);
        Self { tx }
    }

    pub fn publish(&self, event: SessionEvent) {
        // No subscribers is not an error; a single-instance client runs
        // with nobody on the other end.
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }
}

impl Default for SessionBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply foreign session events to a local store until the store is dropped.
///
/// Own events (matching `origin`) are skipped; the publishing instance
/// already mutated its store. The task holds only a weak reference, so a
/// torn-down client stops syncing instead of leaking state updates.
pub fn spawn_sync(
    bus: &SessionBus,
    store: &Arc<SessionStore>,
    origin: Uuid,
) -> tokio::task::JoinHandle<()> {
    let mut rx = bus.subscribe();
    let weak: Weak<SessionStore> = Arc::downgrade(store);
    tokio::spawn(async move {
        loop {
            let event = match rx.recv().await {
                Ok(ev) => ev,
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!("session bus lagged, dropped {} event(s)", missed);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };
            if event.origin() == origin {
                continue;
            }
            let Some(store) = weak.upgrade() else { break };
            match event {
                // A sign-in elsewhere may be a different identity: adopt the
                // token, drop the snapshot until the next /auth/me.
                SessionEvent::SignedIn { token, .. } => store.replace_identity(token),
                // A refresh elsewhere is the same identity with a new token.
                SessionEvent::TokenRefreshed { token, .. } => store.set_token(token),
                SessionEvent::SignedOut { .. } => store.clear(),
            }
        }
    })
}
