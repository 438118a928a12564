//! The app-wide token cache used by client-credentials acquisitions.

// self
use crate::{
	_prelude::*,
	cache::{CacheFuture, CacheNotification, HeldLock, TokenCacheAccess},
	obs::{self, CacheStage},
	store::{CacheBlob, CacheKey, CacheStore},
};

/// Single-slot store for the application's own serialized cache.
#[derive(Clone)]
pub struct AppCacheStore {
	backend: Arc<dyn CacheStore>,
	lock: Arc<AsyncMutex<()>>,
}
impl AppCacheStore {
	/// Creates the app cache over `backend`.
	pub fn new(backend: Arc<dyn CacheStore>) -> Self {
		Self { backend, lock: Default::default() }
	}

	/// Binds a fresh hook set for one acquisition.
	pub fn bind(&self) -> AppTokenCache {
		AppTokenCache {
			backend: self.backend.clone(),
			lock: self.lock.clone(),
			held: Default::default(),
		}
	}
}
impl Debug for AppCacheStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AppCacheStore").finish_non_exhaustive()
	}
}

/// Per-call binding of [`AppCacheStore`].
pub struct AppTokenCache {
	backend: Arc<dyn CacheStore>,
	lock: Arc<AsyncMutex<()>>,
	held: HeldLock<CacheKey>,
}
impl AppTokenCache {
	async fn persist(&self, args: &CacheNotification, blob: CacheBlob) -> Result<()> {
		self.held.acquire(&CacheKey::Application, self.lock.clone()).await;

		if args.has_state_changed {
			self.backend.save(&CacheKey::Application, blob).await?;
		}

		obs::record_cache_event(CacheStage::AfterAccess, "application", args.has_state_changed);

		Ok(())
	}
}
impl Debug for AppTokenCache {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AppTokenCache").field("held", &self.held).finish()
	}
}
impl TokenCacheAccess for AppTokenCache {
	fn before_access<'a>(
		&'a self,
		_: &'a CacheNotification,
	) -> CacheFuture<'a, Option<CacheBlob>> {
		Box::pin(async move {
			self.held.acquire(&CacheKey::Application, self.lock.clone()).await;

			let blob = self.backend.load(&CacheKey::Application).await?;

			obs::record_cache_event(CacheStage::BeforeAccess, "application", false);

			Ok(blob)
		})
	}

	fn after_access<'a>(
		&'a self,
		args: &'a CacheNotification,
		blob: CacheBlob,
	) -> CacheFuture<'a, ()> {
		Box::pin(async move {
			let outcome = self.persist(args, blob).await;

			self.held.release();

			outcome
		})
	}
}
