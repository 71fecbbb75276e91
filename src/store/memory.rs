//! Thread-safe in-memory [`CacheStore`]; the agent's default, non-persistent backend.

// self
use crate::{
	_prelude::*,
	store::{CacheStore, StoreFuture},
};

type StoreMap = Arc<RwLock<HashMap<Vec<u8>, Vec<u8>>>>;

/// Ephemeral backend that keeps entries in-process.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	/// Number of stored entries.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when nothing is stored.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}
}
impl CacheStore for MemoryStore {
	fn get<'a>(&'a self, key: &'a [u8]) -> StoreFuture<'a, Option<Vec<u8>>> {
		let value = self.0.read().get(key).cloned();

		Box::pin(async move { Ok(value) })
	}

	fn put<'a>(&'a self, key: &'a [u8], value: Vec<u8>) -> StoreFuture<'a, ()> {
		self.0.write().insert(key.to_vec(), value);

		Box::pin(async { Ok(()) })
	}

	fn delete<'a>(&'a self, key: &'a [u8]) -> StoreFuture<'a, ()> {
		self.0.write().remove(key);

		Box::pin(async { Ok(()) })
	}
}
