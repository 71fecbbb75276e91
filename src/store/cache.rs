//! Request-keyed token cache layered over a byte-oriented [`CacheStore`].

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, TokenRequest},
	store::{CacheStore, MemoryStore, StoreError},
};

/// SHA-256 fingerprint of the cache-relevant subset of a [`TokenRequest`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey([u8; 32]);
impl CacheKey {
	/// Raw key bytes handed to the store.
	pub fn as_bytes(&self) -> &[u8] {
		&self.0
	}
}
impl Debug for CacheKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "CacheKey({self})")
	}
}
impl Display for CacheKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&URL_SAFE_NO_PAD.encode(self.0))
	}
}

// Field order is fixed here; changing it invalidates persisted caches.
#[derive(Serialize)]
struct KeyMaterial<'a> {
	client_id: &'a str,
	redirect_uri: Option<&'a str>,
	refresh_token: Option<&'a str>,
	scope: Vec<&'a str>,
}

/// Token cache keyed by the identity of a [`TokenRequest`].
///
/// Requests without a client identifier have no stable key: lookups miss, writes and
/// deletes are skipped.
#[derive(Clone)]
pub struct TokenCache {
	store: Arc<dyn CacheStore>,
}
impl TokenCache {
	/// Wraps a backend.
	pub fn new(store: Arc<dyn CacheStore>) -> Self {
		Self { store }
	}

	/// Computes the cache key for `request`, or `None` when it has no stable identity.
	///
	/// Only `refresh_token`, `client_id`, `redirect_uri`, and the normalized scope contribute.
	pub fn compute_key(request: &TokenRequest) -> Option<CacheKey> {
		let client_id = request.client_id.as_deref()?;
		let material = KeyMaterial {
			client_id,
			redirect_uri: request.redirect_uri.as_ref().map(Url::as_str),
			refresh_token: request.refresh_token.as_ref().map(|secret| secret.expose()),
			scope: request.scope.iter().collect(),
		};
		let encoded = serde_json::to_vec(&material).ok()?;
		let mut key = [0_u8; 32];

		key.copy_from_slice(&Sha256::digest(&encoded));

		Some(CacheKey(key))
	}

	/// Fetches the cached token for `request`.
	pub async fn get(&self, request: &TokenRequest) -> Result<Option<AccessToken>, StoreError> {
		let Some(key) = Self::compute_key(request) else {
			return Ok(None);
		};
		let Some(bytes) = self.store.get(key.as_bytes()).await? else {
			return Ok(None);
		};

		serde_json::from_slice(&bytes).map(Some).map_err(|e| StoreError::Serialization {
			message: format!("Cached token under {key} cannot be decoded: {e}"),
		})
	}

	/// Stores `token` for `request`, replacing the previous entry.
	pub async fn put(&self, request: &TokenRequest, token: &AccessToken) -> Result<(), StoreError> {
		let Some(key) = Self::compute_key(request) else {
			return Ok(());
		};
		let bytes = serde_json::to_vec(token).map_err(|e| StoreError::Serialization {
			message: format!("Token cannot be encoded: {e}"),
		})?;

		self.store.put(key.as_bytes(), bytes).await
	}

	/// Removes the cached token for `request`; missing entries are not an error.
	pub async fn delete(&self, request: &TokenRequest) -> Result<(), StoreError> {
		match Self::compute_key(request) {
			Some(key) => self.store.delete(key.as_bytes()).await,
			None => Ok(()),
		}
	}
}
impl Default for TokenCache {
	fn default() -> Self {
		Self::new(Arc::new(MemoryStore::default()))
	}
}
impl Debug for TokenCache {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("TokenCache(..)")
	}
}
