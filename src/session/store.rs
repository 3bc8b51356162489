use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use crate::models::User;
use crate::tprintln;

/// Fixed file name under the state directory; absence means signed out.
pub const TOKEN_FILE_NAME: &str = "token";

/// Point-in-time view of the session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub token: Option<String>,
    pub user: Option<User>,
}

#[derive(Debug, Default)]
struct Inner {
    token: Option<String>,
    user: Option<User>,
    // Bumped on every mutation; the refresh gate uses it to detect that
    // another caller already replaced (or destroyed) the token it saw.
    generation: u64,
}

/// Owns the current access token and authenticated-user snapshot.
///
/// Invariant: `user` is `Some` only while `token` is `Some`. The user
/// snapshot is set only from server responses (login, `/auth/me`), so a
/// populated snapshot always reflects a token the server accepted at least
/// once.
#[derive(Debug)]
pub struct SessionStore {
    inner: RwLock<Inner>,
    token_path: Option<PathBuf>,
}

impl SessionStore {
    /// Create a store, reloading any previously persisted token. The user
    /// snapshot always starts empty; it is re-fetched on demand.
    pub fn open(state_dir: Option<&Path>) -> Self {
        let token_path = state_dir.map(|d| d.join(TOKEN_FILE_NAME));
        let token = token_path.as_deref().and_then(read_token);
        Self {
            inner: RwLock::new(Inner { token, user: None, generation: 0 }),
            token_path,
        }
    }

    /// In-memory store with no persistence.
    pub fn ephemeral() -> Self {
        Self::open(None)
    }

    pub fn token(&self) -> Option<String> {
        self.inner.read().token.clone()
    }

    pub fn user(&self) -> Option<User> {
        self.inner.read().user.clone()
    }

    pub fn snapshot(&self) -> Session {
        let g = self.inner.read();
        Session { token: g.token.clone(), user: g.user.clone() }
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.read().token.is_some()
    }

    pub fn generation(&self) -> u64 {
        self.inner.read().generation
    }

    /// Full sign-in: token plus the server-confirmed user snapshot.
    pub fn set_signed_in(&self, token: String, user: User) {
        {
            let mut g = self.inner.write();
            g.token = Some(token);
            g.user = Some(user);
            g.generation += 1;
        }
        self.persist();
    }

    /// Replace the token in place, keeping the snapshot (refresh for the
    /// same identity). Atomic: callers reading after this see the new token.
    pub fn set_token(&self, token: String) {
        {
            let mut g = self.inner.write();
            g.token = Some(token);
            g.generation += 1;
        }
        self.persist();
    }

    /// Adopt a token established elsewhere for an unknown identity: the
    /// snapshot is dropped until the next `/auth/me` validates it.
    pub fn replace_identity(&self, token: String) {
        {
            let mut g = self.inner.write();
            g.token = Some(token);
            g.user = None;
            g.generation += 1;
        }
        self.persist();
    }

    /// Update the snapshot from a server response. Ignored while signed out
    /// so a late `/auth/me` completion cannot resurrect a cleared session.
    pub fn set_user(&self, user: User) -> bool {
        let mut g = self.inner.write();
        if g.token.is_none() {
            return false;
        }
        g.user = Some(user);
        true
    }

    /// Destroy the session: clears token and snapshot and removes the
    /// persisted token file.
    pub fn clear(&self) {
        {
            let mut g = self.inner.write();
            g.token = None;
            g.user = None;
            g.generation += 1;
        }
        if let Some(p) = &self.token_path {
            let _ = std::fs::remove_file(p);
        }
    }

    // Best-effort write; a read-only state dir must not break the session.
    fn persist(&self) {
        let Some(path) = &self.token_path else { return };
        let token = self.inner.read().token.clone();
        let Some(token) = token else { return };
        if let Some(dir) = path.parent() {
            let _ = std::fs::create_dir_all(dir);
        }
        if let Err(e) = std::fs::write(path, &token) {
            tracing::warn!("failed to persist token to {}: {}", path.display(), e);
        }
    }
}

fn read_token(path: &Path) -> Option<String> {
    let raw = std::fs::read_to_string(path).ok()?;
    let tok = raw.trim();
    if tok.is_empty() {
        return None;
    }
    tprintln!("[session.store] reloaded persisted token from {}", path.display());
    Some(tok.to_string())
}
