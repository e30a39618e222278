//! Thread-safe in-memory [`TokenStore`] for tests and ephemeral sessions.

// self
use crate::{
	_prelude::*,
	auth::TokenRecord,
	store::{StoreFuture, TokenStore},
};

type Slot = Arc<RwLock<Option<TokenRecord>>>;

/// In-process store whose lifetime matches the owning process; nothing is
/// ever written to disk.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(Slot);
impl TokenStore for MemoryStore {
	fn save(&self, record: TokenRecord) -> StoreFuture<'_, ()> {
		let slot = self.0.clone();

		Box::pin(async move {
			*slot.write() = Some(record);

			Ok(())
		})
	}

	fn load(&self) -> StoreFuture<'_, Option<TokenRecord>> {
		let slot = self.0.clone();

		Box::pin(async move { Ok(slot.read().clone()) })
	}

	fn clear(&self) -> StoreFuture<'_, ()> {
		let slot = self.0.clone();

		Box::pin(async move {
			*slot.write() = None;

			Ok(())
		})
	}
}
