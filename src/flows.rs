//! Token acquisition flows orchestrated over a [`ClientFactory`].
//!
//! [`TokenProvider`] owns the options, the scope resolver and both logical caches, and
//! builds one confidential-client handle per call with the relevant cache hooks bound.
//! Flows live in submodules: code redemption (`authorization_code`), app-only tokens
//! (`application`) and per-user silent acquisition plus sign-out (`user`).

pub mod common;
pub mod metrics;

mod application;
mod authorization_code;
mod user;

pub use common::*;
pub use metrics::*;

// self
use crate::{
	_prelude::*,
	auth::ScopeResolver,
	cache::{AppCacheStore, UserCacheStore},
	client::ClientFactory,
	config::TokenProviderOptions,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	store::CacheStore,
};
#[cfg(feature = "reqwest")]
use crate::{
	oauth::{OAuth2ClientFactory, ReqwestClientFactory},
	provider::ProviderDescriptor,
};

/// Provider specialized for the crate's default reqwest-backed client.
#[cfg(feature = "reqwest")]
pub type ReqwestTokenProvider = TokenProvider<ReqwestClientFactory>;

/// Acquires tokens for the application and its signed-in users.
///
/// Cloning is cheap; clones share the caches, their lock registries and the metrics.
pub struct TokenProvider<F>
where
	F: ClientFactory,
{
	factory: Arc<F>,
	options: TokenProviderOptions,
	resolver: ScopeResolver,
	app_cache: AppCacheStore,
	user_cache: UserCacheStore,
	metrics: Arc<FlowMetrics>,
}
impl<F> TokenProvider<F>
where
	F: ClientFactory,
{
	/// Creates a provider over a caller-supplied client factory and cache backend.
	///
	/// Fails with [`ConfigError`](crate::error::ConfigError) when `options` are invalid.
	pub fn with_client_factory(
		options: TokenProviderOptions,
		factory: impl Into<Arc<F>>,
		store: Arc<dyn CacheStore>,
	) -> Result<Self> {
		options.validate()?;

		Ok(Self {
			factory: factory.into(),
			resolver: options.resolver()?,
			options,
			app_cache: AppCacheStore::new(store.clone()),
			user_cache: UserCacheStore::new(store),
			metrics: Default::default(),
		})
	}

	/// Validated options.
	pub fn options(&self) -> &TokenProviderOptions {
		&self.options
	}

	/// Scope resolver built from the options' mapping table.
	pub fn resolver(&self) -> &ScopeResolver {
		&self.resolver
	}

	/// Client factory used for every call.
	pub fn factory(&self) -> &F {
		&self.factory
	}

	/// Per-identity cache store shared by every user flow.
	pub fn user_cache(&self) -> &UserCacheStore {
		&self.user_cache
	}

	/// In-process flow counters.
	pub fn metrics(&self) -> &FlowMetrics {
		&self.metrics
	}

	pub(crate) async fn observe<T, Fut>(
		&self,
		kind: FlowKind,
		stage: &'static str,
		fut: Fut,
	) -> Result<T>
	where
		Fut: Future<Output = Result<T>>,
	{
		let span = FlowSpan::new(kind, stage);

		obs::record_flow_outcome(kind, FlowOutcome::Attempt);
		self.metrics.record_attempt();

		let result = span.instrument(fut).await;

		match &result {
			Ok(_) => {
				obs::record_flow_outcome(kind, FlowOutcome::Success);
				self.metrics.record_success();
			},
			Err(_) => {
				obs::record_flow_outcome(kind, FlowOutcome::Failure);
				self.metrics.record_failure();
			},
		}

		result
	}
}
#[cfg(feature = "reqwest")]
impl TokenProvider<ReqwestClientFactory> {
	/// Creates a provider with the default reqwest-backed client for `descriptor`.
	///
	/// The options' client id and secret authenticate the confidential client.
	pub fn new(
		options: TokenProviderOptions,
		descriptor: ProviderDescriptor,
		store: Arc<dyn CacheStore>,
	) -> Result<Self> {
		options.validate()?;

		let factory = OAuth2ClientFactory::new(
			descriptor,
			options.client_id.clone(),
			options.client_secret.clone(),
		)?;

		Self::with_client_factory(options, factory, store)
	}
}
impl<F> Clone for TokenProvider<F>
where
	F: ClientFactory,
{
	fn clone(&self) -> Self {
		Self {
			factory: self.factory.clone(),
			options: self.options.clone(),
			resolver: self.resolver.clone(),
			app_cache: self.app_cache.clone(),
			user_cache: self.user_cache.clone(),
			metrics: self.metrics.clone(),
		}
	}
}
impl<F> Debug for TokenProvider<F>
where
	F: ClientFactory,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenProvider")
			.field("options", &self.options)
			.field("user_cache", &self.user_cache)
			.field("metrics", &self.metrics)
			.finish()
	}
}
