//! Logical token caches layered over a [`CacheStore`](crate::store::CacheStore).
//!
//! Each acquisition binds a fresh handle ([`AppTokenCache`] or [`UserTokenCache`]) whose
//! hooks the confidential client drives in order: `before_access`, then `before_write`
//! when it is about to mutate its cache, then `after_access`. A binding takes the
//! per-key async lock on first use and releases it when `after_access` completes or the
//! binding is dropped, so concurrent read-modify-write cycles on one key are serialized.

pub mod app;
pub mod user;

pub use app::*;
pub use user::*;

// crates.io
use async_lock::MutexGuardArc;
// self
use crate::{_prelude::*, auth::IdentityKey, store::CacheBlob};

/// Boxed future returned by cache hooks.
pub type CacheFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Arguments passed to every cache hook.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CacheNotification {
	/// Identity metadata of the account the client is operating on, when known.
	pub account: Option<IdentityKey>,
	/// Whether the client mutated its cache during this access.
	pub has_state_changed: bool,
}
impl CacheNotification {
	/// Notification for a read-only access.
	pub fn read(account: Option<IdentityKey>) -> Self {
		Self { account, has_state_changed: false }
	}

	/// Notification for an access that mutated the cache.
	pub fn changed(account: Option<IdentityKey>) -> Self {
		Self { account, has_state_changed: true }
	}
}

/// Persistence hooks invoked by a confidential client around each cache access.
pub trait TokenCacheAccess
where
	Self: Send + Sync,
{
	/// Returns previously persisted bytes for the relevant key, if any.
	fn before_access<'a>(
		&'a self,
		args: &'a CacheNotification,
	) -> CacheFuture<'a, Option<CacheBlob>>;

	/// Called right before the client mutates its cache.
	fn before_write<'a>(&'a self, args: &'a CacheNotification) -> CacheFuture<'a, ()> {
		let _ = args;

		Box::pin(async { Ok(()) })
	}

	/// Persists `blob` when `args.has_state_changed` is set and releases the binding's lock.
	fn after_access<'a>(
		&'a self,
		args: &'a CacheNotification,
		blob: CacheBlob,
	) -> CacheFuture<'a, ()>;
}

/// Owned guard slot kept by a binding between `before_access` and `after_access`.
pub(crate) struct HeldLock<K> {
	slot: Mutex<Option<(K, MutexGuardArc<()>)>>,
}
impl<K> Default for HeldLock<K> {
	fn default() -> Self {
		Self { slot: Mutex::new(None) }
	}
}
impl<K> HeldLock<K>
where
	K: PartialEq,
{
	/// Acquires `lock` for `key` unless the binding already holds it.
	pub(crate) async fn acquire(&self, key: &K, lock: Arc<AsyncMutex<()>>)
	where
		K: Clone,
	{
		let held = matches!(self.slot.lock().as_ref(), Some((held, _)) if held == key);

		if held {
			return;
		}

		// A different key must never stay locked while we wait on the next one.
		self.release();

		let guard = lock.lock_arc().await;

		*self.slot.lock() = Some((key.clone(), guard));
	}

	/// Drops the held guard, if any, and returns the key it protected.
	pub(crate) fn release(&self) -> Option<K> {
		self.slot.lock().take().map(|(key, _guard)| key)
	}

	#[cfg(test)]
	pub(crate) fn is_held(&self) -> bool {
		self.slot.lock().is_some()
	}
}
impl<K> Debug for HeldLock<K> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("HeldLock").field("held", &self.slot.lock().is_some()).finish()
	}
}
