//! App-only tokens through the client-credentials grant and the app-wide cache.

// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, TokenRecord},
	client::{CacheBindings, ClientFactory, ConfidentialClient},
	flows::{TokenProvider, common},
	obs::FlowKind,
};

impl<F> TokenProvider<F>
where
	F: ClientFactory,
{
	/// Acquires an app-only token for `scopes`, reusing the app cache when it is fresh.
	pub async fn acquire_token_for_application(&self, scopes: &ScopeSet) -> Result<TokenRecord> {
		self.observe(FlowKind::ClientCredentials, "acquire_token_for_application", async {
			let requested = self.resolver.resolve_all(scopes);
			let client = self.factory.build(None, CacheBindings::app(self.app_cache.bind()))?;
			let record = client.acquire_token_for_client(&requested).await?;

			common::ensure_scopes_granted(&requested, &record.scope)?;

			Ok(record)
		})
		.await
	}
}
