//! Session state: the access-token / user-snapshot pair, its persistence,
//! and the broadcast channel that keeps concurrent client instances of the
//! same account in step (the "other open tabs" contract).
//!
//! The store is the single source of truth for "who is signed in"; every
//! mutation goes through its narrow surface (sign-in, token replacement,
//! clear) so the facade in `crate::client` can reason about generations.

mod bus;
mod store;

pub use bus::{spawn_sync, SessionBus, SessionEvent};
pub use store::{Session, SessionStore, TOKEN_FILE_NAME};
