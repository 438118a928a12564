//! Authorization-code redemption after the interactive sign-in redirect.
//!
//! The identity is unknown until the token response arrives, so the user binding starts
//! without a principal key; the client reports the account with its write and the
//! user cache entry is created (or replaced) under that key.

// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, TokenRecord},
	client::{CacheBindings, ClientFactory, ConfidentialClient},
	config::RequestContext,
	flows::{TokenProvider, common},
	obs::FlowKind,
};

impl<F> TokenProvider<F>
where
	F: ClientFactory,
{
	/// Redeems `code` for `scopes` (placeholders are resolved first).
	///
	/// The redirect URI is rebuilt from `ctx` and the configured callback path and must
	/// match the one used for the authorization request.
	pub async fn redeem_authorization_code(
		&self,
		ctx: &RequestContext,
		code: &str,
		scopes: &ScopeSet,
	) -> Result<TokenRecord> {
		self.observe(FlowKind::AuthorizationCode, "redeem_authorization_code", async {
			let redirect_uri = ctx.redirect_uri(&self.options.callback_path)?;
			let requested = self.resolver.resolve_all(scopes);
			let caches = CacheBindings::both(self.app_cache.bind(), self.user_cache.bind(None));
			let client = self.factory.build(Some(&redirect_uri), caches)?;
			let record = client.redeem_authorization_code(code, &requested).await?;

			common::ensure_scopes_granted(&requested, &record.scope)?;

			Ok(record)
		})
		.await
	}
}
