//! Session persistence contracts and built-in store implementations.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{_prelude::*, auth::TokenRecord};

/// Boxed future returned by [`TokenStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Persistence contract for the session token record.
///
/// `load` degrades missing or unreadable state to `None` so calling code
/// falls back to re-authentication instead of crashing; only `save` and
/// `clear` surface backend failures.
pub trait TokenStore
where
	Self: Send + Sync,
{
	/// Persists or replaces the session record.
	fn save(&self, record: TokenRecord) -> StoreFuture<'_, ()>;

	/// Fetches the current session record, if one exists.
	fn load(&self) -> StoreFuture<'_, Option<TokenRecord>>;

	/// Removes any persisted session state.
	fn clear(&self) -> StoreFuture<'_, ()>;
}

/// Error type produced by [`TokenStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failure surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
