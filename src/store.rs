//! Byte-keyed cache contract, built-in backends, and the request-keyed token cache.

pub mod cache;
pub mod file;
pub mod memory;

pub use cache::{CacheKey, TokenCache};
pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::_prelude::*;

/// Boxed future returned by [`CacheStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Key/value backend the token cache writes into.
///
/// Implementations must tolerate concurrent calls. `get` reports a missing key as `Ok(None)`,
/// `put` overwrites, and `delete` of a missing key succeeds.
pub trait CacheStore
where
	Self: Send + Sync,
{
	/// Fetches the value stored under `key`, if present.
	fn get<'a>(&'a self, key: &'a [u8]) -> StoreFuture<'a, Option<Vec<u8>>>;

	/// Stores `value` under `key`, replacing any previous value.
	fn put<'a>(&'a self, key: &'a [u8], value: Vec<u8>) -> StoreFuture<'a, ()>;

	/// Removes `key`; idempotent.
	fn delete<'a>(&'a self, key: &'a [u8]) -> StoreFuture<'a, ()>;
}

/// Error type produced by [`CacheStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend or the token codec.
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
