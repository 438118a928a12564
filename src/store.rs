//! Key/blob persistence backing the application and user token caches.

pub mod memory;

pub use memory::MemoryStore;

// self
use crate::{_prelude::*, auth::IdentityKey};

/// Boxed future returned by [`CacheStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Backend contract for serialized token caches.
pub trait CacheStore
where
	Self: Send + Sync,
{
	/// Loads the blob stored under `key`, if any.
	fn load<'a>(&'a self, key: &'a CacheKey) -> StoreFuture<'a, Option<CacheBlob>>;

	/// Stores `blob` under `key`, replacing any previous value.
	fn save<'a>(&'a self, key: &'a CacheKey, blob: CacheBlob) -> StoreFuture<'a, ()>;

	/// Deletes the blob stored under `key`; returns `false` when nothing was stored.
	fn remove<'a>(&'a self, key: &'a CacheKey) -> StoreFuture<'a, bool>;
}

/// Error type produced by [`CacheStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// A cache blob could not be encoded or decoded.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// The storage engine failed.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Location of one serialized cache.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CacheKey {
	/// The single app-wide cache used for client-credentials tokens.
	Application,
	/// The cache of one signed-in identity.
	User(IdentityKey),
}
impl CacheKey {
	/// Short label used in logs; never includes the identity itself.
	pub fn kind(&self) -> &'static str {
		match self {
			Self::Application => "application",
			Self::User(_) => "user",
		}
	}
}

/// Opaque serialized cache bytes.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CacheBlob(Vec<u8>);
impl CacheBlob {
	/// Wraps serialized bytes.
	pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
		Self(bytes.into())
	}

	/// Serialized bytes.
	pub fn as_bytes(&self) -> &[u8] {
		&self.0
	}

	/// Byte length.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns `true` for an empty blob.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}
impl Debug for CacheBlob {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "CacheBlob({} bytes)", self.0.len())
	}
}
