//! Confidential-client contract used by the acquisition flows.
//!
//! A [`ClientFactory`] builds one [`ConfidentialClient`] handle per acquisition, bound to
//! that call's cache hooks through [`CacheBindings`]. The handle owns its in-memory
//! [`TokenCache`] for the duration of the call; persistence happens exclusively through
//! the hooks.

pub mod token_cache;

pub use token_cache::*;

// self
use crate::{
	_prelude::*,
	auth::{IdentityKey, ScopeSet, TokenRecord},
	cache::TokenCacheAccess,
	identity::Account,
};

/// Boxed future returned by [`ConfidentialClient`] operations.
pub type ClientFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Token operations of a confidential OAuth2/OIDC client.
pub trait ConfidentialClient
where
	Self: Send + Sync,
{
	/// Redeems an authorization code for `scopes`.
	fn redeem_authorization_code<'a>(
		&'a self,
		code: &'a str,
		scopes: &'a ScopeSet,
	) -> ClientFuture<'a, TokenRecord>;

	/// Acquires an app-only token for `scopes`.
	fn acquire_token_for_client<'a>(
		&'a self,
		scopes: &'a ScopeSet,
	) -> ClientFuture<'a, TokenRecord>;

	/// Acquires a token for `account` without user interaction.
	///
	/// Fails with [`Error::AccountNotFound`] when `account` is `None`.
	fn acquire_token_silent<'a>(
		&'a self,
		scopes: &'a ScopeSet,
		account: Option<&'a Account>,
	) -> ClientFuture<'a, TokenRecord>;

	/// Looks up a cached account by home-account identifier.
	fn get_account<'a>(&'a self, key: &'a IdentityKey) -> ClientFuture<'a, Option<Account>>;

	/// Removes `account` and its tokens from the client's cache.
	fn remove_account<'a>(&'a self, account: &'a Account) -> ClientFuture<'a, ()>;
}

/// Cache hooks injected into a client handle. Unbound caches are ephemeral.
#[derive(Default)]
pub struct CacheBindings {
	/// Hooks of the app-wide cache.
	pub app: Option<Box<dyn TokenCacheAccess>>,
	/// Hooks of the per-user cache.
	pub user: Option<Box<dyn TokenCacheAccess>>,
}
impl CacheBindings {
	/// Binds only the app cache.
	pub fn app(app: impl 'static + TokenCacheAccess) -> Self {
		Self { app: Some(Box::new(app)), user: None }
	}

	/// Binds only the user cache.
	pub fn user(user: impl 'static + TokenCacheAccess) -> Self {
		Self { app: None, user: Some(Box::new(user)) }
	}

	/// Binds both caches.
	pub fn both(
		app: impl 'static + TokenCacheAccess,
		user: impl 'static + TokenCacheAccess,
	) -> Self {
		Self { app: Some(Box::new(app)), user: Some(Box::new(user)) }
	}
}
impl Debug for CacheBindings {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CacheBindings")
			.field("app", &self.app.is_some())
			.field("user", &self.user.is_some())
			.finish()
	}
}

/// Builds [`ConfidentialClient`] handles for single acquisitions.
pub trait ClientFactory
where
	Self: Send + Sync,
{
	/// Handle type produced by the factory.
	type Client: ConfidentialClient;

	/// Builds a handle with an optional redirect URI and the given cache bindings.
	fn build(&self, redirect_uri: Option<&Url>, caches: CacheBindings) -> Result<Self::Client>;
}
