//! Per-identity token caches keyed by home-account identifier.

// self
use crate::{
	_prelude::*,
	auth::IdentityKey,
	cache::{CacheFuture, CacheNotification, HeldLock, TokenCacheAccess},
	obs::{self, CacheStage},
	store::{CacheBlob, CacheKey, CacheStore},
};

type LockRegistry = Arc<Mutex<HashMap<IdentityKey, Arc<AsyncMutex<()>>>>>;

/// Map from identity key to that identity's serialized cache.
#[derive(Clone)]
pub struct UserCacheStore {
	backend: Arc<dyn CacheStore>,
	locks: LockRegistry,
}
impl UserCacheStore {
	/// Creates the user cache over `backend`.
	pub fn new(backend: Arc<dyn CacheStore>) -> Self {
		Self { backend, locks: Default::default() }
	}

	/// Binds a fresh hook set for one acquisition.
	///
	/// `principal_key` is the caller's identity key, used when the client does not report
	/// an account of its own.
	pub fn bind(&self, principal_key: Option<IdentityKey>) -> UserTokenCache {
		UserTokenCache {
			backend: self.backend.clone(),
			locks: self.locks.clone(),
			principal_key,
			held: Default::default(),
		}
	}

	/// Deletes the entry for `key`. Returns `false` when nothing was stored.
	///
	/// The key's lock slot is dropped as well unless another call is using it.
	pub async fn remove(&self, key: &IdentityKey) -> Result<bool> {
		let guard = lock_for(&self.locks, key).lock_arc().await;
		let removed = self.backend.remove(&CacheKey::User(key.to_owned())).await;

		drop(guard);
		prune(&self.locks, key);

		let removed = removed?;

		obs::record_cache_event(CacheStage::Remove, "user", removed);

		Ok(removed)
	}

	/// Number of identities with a live lock slot.
	pub fn tracked_identities(&self) -> usize {
		self.locks.lock().len()
	}
}
impl Debug for UserCacheStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("UserCacheStore").field("tracked_keys", &self.tracked_identities()).finish()
	}
}

/// Per-call binding of [`UserCacheStore`].
pub struct UserTokenCache {
	backend: Arc<dyn CacheStore>,
	locks: LockRegistry,
	principal_key: Option<IdentityKey>,
	held: HeldLock<IdentityKey>,
}
impl UserTokenCache {
	/// Resolves the cache key, preferring the client-reported account over the principal.
	fn resolve_key(&self, args: &CacheNotification) -> Result<Option<IdentityKey>> {
		match (&args.account, &self.principal_key) {
			(Some(response), Some(principal)) if response != principal =>
				Err(Error::IdentityMismatch {
					response: response.to_owned(),
					principal: principal.to_owned(),
				}),
			(Some(key), _) | (None, Some(key)) => Ok(Some(key.to_owned())),
			(None, None) => Ok(None),
		}
	}

	async fn lock(&self, key: &IdentityKey) {
		let lock = lock_for(&self.locks, key);

		self.held.acquire(key, lock).await;
	}

	fn unlock(&self) {
		if let Some(key) = self.held.release() {
			prune(&self.locks, &key);
		}
	}

	async fn persist(&self, args: &CacheNotification, blob: CacheBlob) -> Result<()> {
		let Some(key) = self.resolve_key(args)? else {
			if args.has_state_changed {
				return Err(Error::MissingIdentity);
			}

			return Ok(());
		};

		// Code redemption learns the key only here, so the lock may not be held yet.
		self.lock(&key).await;

		if args.has_state_changed {
			self.backend.save(&CacheKey::User(key), blob).await?;
		}

		obs::record_cache_event(CacheStage::AfterAccess, "user", args.has_state_changed);

		Ok(())
	}
}
impl Debug for UserTokenCache {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("UserTokenCache")
			.field("principal_key", &self.principal_key)
			.field("held", &self.held)
			.finish()
	}
}
impl TokenCacheAccess for UserTokenCache {
	fn before_access<'a>(
		&'a self,
		args: &'a CacheNotification,
	) -> CacheFuture<'a, Option<CacheBlob>> {
		Box::pin(async move {
			let Some(key) = self.resolve_key(args)? else {
				obs::record_cache_event(CacheStage::BeforeAccess, "user", false);

				return Ok(None);
			};

			self.lock(&key).await;

			let blob = self.backend.load(&CacheKey::User(key)).await?;

			obs::record_cache_event(CacheStage::BeforeAccess, "user", false);

			Ok(blob)
		})
	}

	fn before_write<'a>(&'a self, args: &'a CacheNotification) -> CacheFuture<'a, ()> {
		Box::pin(async move {
			obs::record_cache_event(CacheStage::BeforeWrite, "user", args.has_state_changed);

			Ok(())
		})
	}

	fn after_access<'a>(
		&'a self,
		args: &'a CacheNotification,
		blob: CacheBlob,
	) -> CacheFuture<'a, ()> {
		Box::pin(async move {
			let outcome = self.persist(args, blob).await;

			self.unlock();

			outcome
		})
	}
}
impl Drop for UserTokenCache {
	fn drop(&mut self) {
		self.unlock();
	}
}

fn lock_for(locks: &LockRegistry, key: &IdentityKey) -> Arc<AsyncMutex<()>> {
	let mut guards = locks.lock();

	guards.entry(key.to_owned()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
}

/// Forgets `key`'s lock once the registry holds the only reference.
///
/// Clones are only handed out under the registry mutex, so a count of one cannot race.
fn prune(locks: &LockRegistry, key: &IdentityKey) {
	let mut guards = locks.lock();

	if guards.get(key).is_some_and(|lock| Arc::strong_count(lock) == 1) {
		guards.remove(key);
	}
}
