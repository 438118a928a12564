//! Process-local [`CacheStore`] backed by a shared map.

// self
use crate::{
	_prelude::*,
	store::{CacheBlob, CacheKey, CacheStore, StoreError, StoreFuture},
};

type BlobMap = Arc<RwLock<HashMap<CacheKey, CacheBlob>>>;

/// In-memory cache store; contents vanish with the process.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(BlobMap);
impl MemoryStore {
	/// Number of stored caches.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when nothing is stored.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}

	/// Returns `true` when a blob is stored under `key`.
	pub fn contains(&self, key: &CacheKey) -> bool {
		self.0.read().contains_key(key)
	}

	/// Snapshot of the blob stored under `key`.
	pub fn get(&self, key: &CacheKey) -> Option<CacheBlob> {
		self.0.read().get(key).cloned()
	}
}
impl CacheStore for MemoryStore {
	fn load<'a>(&'a self, key: &'a CacheKey) -> StoreFuture<'a, Option<CacheBlob>> {
		let map = self.0.clone();

		Box::pin(async move { Ok::<_, StoreError>(map.read().get(key).cloned()) })
	}

	fn save<'a>(&'a self, key: &'a CacheKey, blob: CacheBlob) -> StoreFuture<'a, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			map.write().insert(key.to_owned(), blob);

			Ok(())
		})
	}

	fn remove<'a>(&'a self, key: &'a CacheKey) -> StoreFuture<'a, bool> {
		let map = self.0.clone();

		Box::pin(async move { Ok(map.write().remove(key).is_some()) })
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::auth::IdentityKey;

	#[tokio::test]
	async fn save_load_and_remove_by_key() {
		let store = MemoryStore::default();
		let user =
			CacheKey::User(IdentityKey::new("uid.utid").expect("Identity key should be valid."));

		store.save(&user, CacheBlob::new(b"u".to_vec())).await.expect("Save should succeed.");
		store
			.save(&CacheKey::Application, CacheBlob::new(b"a".to_vec()))
			.await
			.expect("Save should succeed.");

		assert_eq!(store.len(), 2);
		assert_eq!(
			store.load(&user).await.expect("Load should succeed."),
			Some(CacheBlob::new(b"u".to_vec()))
		);
		assert!(store.remove(&user).await.expect("Remove should succeed."));
		assert!(!store.remove(&user).await.expect("Second remove should succeed."));
		assert!(!store.contains(&user));
		assert!(store.contains(&CacheKey::Application));
	}
}
