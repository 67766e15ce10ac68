use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result};
use tracing::debug;

use super::store::{FileStore, KeyValueStore, MemoryStore};
use super::{Scope, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_DATA_KEY};
use crate::models::{TokenPair, UserProfile};

struct Scopes {
    durable: Box<dyn KeyValueStore>,
    ephemeral: Box<dyn KeyValueStore>,
}

impl Scopes {
    fn get_mut(&mut self, scope: Scope) -> &mut dyn KeyValueStore {
        match scope {
            Scope::Durable => self.durable.as_mut(),
            Scope::Ephemeral => self.ephemeral.as_mut(),
        }
    }

    fn get(&self, scope: Scope) -> &dyn KeyValueStore {
        match scope {
            Scope::Durable => self.durable.as_ref(),
            Scope::Ephemeral => self.ephemeral.as_ref(),
        }
    }

    /// Durable wins when both scopes hold a value.
    fn lookup(&self, key: &str) -> Option<(Scope, String)> {
        Scope::LOOKUP_ORDER
            .into_iter()
            .find_map(|scope| self.get(scope).get(key).map(|v| (scope, v)))
    }
}

/// Token and cached-profile storage split across the durable and ephemeral scopes.
///
/// Clone is cheap; all clones share the same underlying stores, so the
/// API client and the session store see each other's writes.
#[derive(Clone)]
pub struct AuthStorage {
    inner: Arc<Mutex<Scopes>>,
}

impl AuthStorage {
    pub fn new(
        durable: impl KeyValueStore + 'static,
        ephemeral: impl KeyValueStore + 'static,
    ) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Scopes {
                durable: Box::new(durable),
                ephemeral: Box::new(ephemeral),
            })),
        }
    }

    /// File-backed durable scope in `dir`, in-memory ephemeral scope.
    pub fn open(dir: &Path) -> Result<Self> {
        let durable = FileStore::open(dir).context("Failed to open durable storage")?;
        Ok(Self::new(durable, MemoryStore::new()))
    }

    /// Both scopes in memory.
    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new(), MemoryStore::new())
    }

    fn lock(&self) -> MutexGuard<'_, Scopes> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a fresh token pair in `scope` and wipe the other scope, so tokens
    /// never live in both at once.
    pub fn store_tokens(&self, scope: Scope, tokens: &TokenPair) -> Result<()> {
        let mut scopes = self.lock();
        scopes
            .get_mut(scope.other())
            .remove_all(&[ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_DATA_KEY])?;
        scopes.get_mut(scope).set_all(&[
            (ACCESS_TOKEN_KEY, tokens.access_token.as_str()),
            (REFRESH_TOKEN_KEY, tokens.refresh_token.as_str()),
        ])?;
        debug!(?scope, "Tokens stored");
        Ok(())
    }

    pub fn access_token(&self) -> Option<String> {
        self.lock().lookup(ACCESS_TOKEN_KEY).map(|(_, v)| v)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.lock().lookup(REFRESH_TOKEN_KEY).map(|(_, v)| v)
    }

    /// The scope currently holding an access token.
    pub fn token_scope(&self) -> Option<Scope> {
        self.lock().lookup(ACCESS_TOKEN_KEY).map(|(scope, _)| scope)
    }

    /// Replace the access token in whichever scope holds tokens.
    ///
    /// Falls back to the scope holding the refresh token, then ephemeral.
    pub fn update_access_token(&self, token: &str) -> Result<Scope> {
        let mut scopes = self.lock();
        let scope = scopes
            .lookup(ACCESS_TOKEN_KEY)
            .or_else(|| scopes.lookup(REFRESH_TOKEN_KEY))
            .map(|(scope, _)| scope)
            .unwrap_or(Scope::Ephemeral);
        scopes.get_mut(scope).set(ACCESS_TOKEN_KEY, token)?;
        Ok(scope)
    }

    pub fn store_user(&self, scope: Scope, user: &UserProfile) -> Result<()> {
        let json = serde_json::to_string(user).context("Failed to serialize user profile")?;
        self.lock().get_mut(scope).set(USER_DATA_KEY, &json)
    }

    /// The profile cached at last login.
    ///
    /// `Ok(None)` when nothing is cached, `Err` when the cached value is corrupt.
    pub fn cached_user(&self) -> Result<Option<UserProfile>> {
        match self.lock().lookup(USER_DATA_KEY) {
            Some((_, json)) => {
                let user = serde_json::from_str(&json).context("Failed to parse cached user profile")?;
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    pub fn clear_tokens(&self) -> Result<()> {
        let mut scopes = self.lock();
        for scope in Scope::LOOKUP_ORDER {
            scopes
                .get_mut(scope)
                .remove_all(&[ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY])?;
        }
        Ok(())
    }

    pub fn clear_user(&self) -> Result<()> {
        let mut scopes = self.lock();
        for scope in Scope::LOOKUP_ORDER {
            scopes.get_mut(scope).remove(USER_DATA_KEY)?;
        }
        Ok(())
    }

    /// Raw read of one key in one scope.
    pub fn get(&self, scope: Scope, key: &str) -> Option<String> {
        self.lock().get(scope).get(key)
    }

    /// Raw write of one key in one scope. Bypasses the token invariant.
    pub fn set(&self, scope: Scope, key: &str, value: &str) -> Result<()> {
        self.lock().get_mut(scope).set(key, value)
    }
}
