//! Client-side persistence for tokens and the cached user profile.
//!
//! This module provides:
//! - `KeyValueStore`: the string key/value seam, with `FileStore` (durable)
//!   and `MemoryStore` (ephemeral) implementations
//! - `AuthStorage`: the shared handle that keeps tokens in exactly one scope
//!
//! The durable scope is a JSON file in the storage directory; the ephemeral
//! scope lives only as long as the process.

pub mod auth;
pub mod store;

pub use auth::AuthStorage;
pub use store::{FileStore, KeyValueStore, MemoryStore};

pub const ACCESS_TOKEN_KEY: &str = "accessToken";
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";
pub const USER_DATA_KEY: &str = "userData";

/// Where tokens are kept, chosen by "remember me" at login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Survives restarts.
    Durable,
    /// Cleared when the process ends.
    Ephemeral,
}

impl Scope {
    pub(crate) const LOOKUP_ORDER: [Scope; 2] = [Scope::Durable, Scope::Ephemeral];

    pub fn for_remember_me(remember_me: bool) -> Self {
        if remember_me {
            Scope::Durable
        } else {
            Scope::Ephemeral
        }
    }

    pub fn other(&self) -> Self {
        match self {
            Scope::Durable => Scope::Ephemeral,
            Scope::Ephemeral => Scope::Durable,
        }
    }
}
