//! Durable key-value storage for session state.
//!
//! This module provides the `DurableStorage` trait, the client-side
//! persistent store each session writes its token and subject into so a
//! restart restores the session. Values are plain strings; identities are
//! stored as serialized JSON.
//!
//! Implementations:
//! - `FileStorage`: a single JSON document on disk
//! - `MemoryStorage`: process-local, used by tests and ephemeral runs

pub mod file;
pub mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use anyhow::Result;

/// A string key-value store that survives process restarts.
///
/// Writes are last-write-wins. Each session store treats its own keys as
/// exclusively owned, so no locking is exposed here.
pub trait DurableStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;

    fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}
