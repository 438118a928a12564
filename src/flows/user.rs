//! Per-user silent acquisition, interactive challenges and sign-out.

// self
use crate::{
	_prelude::*,
	auth::{IdentityKey, ScopeSet, TokenRecord},
	client::{CacheBindings, ClientFactory, ConfidentialClient},
	flows::{TokenProvider, common},
	identity::Principal,
	obs::FlowKind,
	reauth::{ReauthenticationSignal, TokenOutcome},
};

impl<F> TokenProvider<F>
where
	F: ClientFactory,
{
	/// Acquires a token for the signed-in `principal` without user interaction.
	///
	/// Fails with [`Error::Unauthenticated`] before any client is built when the principal
	/// is absent or anonymous, and with [`Error::AccountNotFound`] when its account is not
	/// cached (for instance after a restart emptied an in-memory store).
	pub async fn acquire_token_for_user(
		&self,
		principal: Option<&Principal>,
		scopes: &ScopeSet,
	) -> Result<TokenRecord> {
		let key = authenticated_key(principal)?;

		self.observe(FlowKind::Silent, "acquire_token_for_user", async {
			let key = key.ok_or(Error::AccountNotFound)?;
			let requested = self.resolver.resolve_all(scopes);
			let caches = CacheBindings::user(self.user_cache.bind(Some(key.clone())));
			let client = self.factory.build(None, caches)?;
			let account = client.get_account(&key).await?;
			let record = client.acquire_token_silent(&requested, account.as_ref()).await?;

			common::ensure_scopes_granted(&requested, &record.scope)?;

			Ok(record)
		})
		.await
	}

	/// Like [`acquire_token_for_user`](Self::acquire_token_for_user), but converts
	/// interactive-recoverable failures into [`TokenOutcome::Reauthenticate`].
	///
	/// Every other failure is returned unchanged.
	pub async fn acquire_token_for_user_or_challenge(
		&self,
		principal: Option<&Principal>,
		scopes: &ScopeSet,
	) -> Result<TokenOutcome> {
		match self.acquire_token_for_user(principal, scopes).await {
			Ok(record) => Ok(TokenOutcome::Token(record)),
			Err(err) => {
				let directive =
					ReauthenticationSignal::evaluate(err, scopes, principal, &self.resolver)?;

				self.metrics.record_reauthentication();

				Ok(TokenOutcome::Reauthenticate(directive))
			},
		}
	}

	/// Signs `principal` out: drops its account from the client cache and deletes its
	/// user cache entry.
	///
	/// Removing an identity that has nothing cached succeeds; a principal without an
	/// identity key fails with [`Error::AccountNotFound`].
	pub async fn remove_user(&self, principal: &Principal) -> Result<()> {
		let key = authenticated_key(Some(principal))?;

		self.observe(FlowKind::RemoveAccount, "remove_user", async {
			let key = key.ok_or(Error::AccountNotFound)?;
			let caches = CacheBindings::user(self.user_cache.bind(Some(key.clone())));
			let client = self.factory.build(None, caches)?;

			if let Some(account) = client.get_account(&key).await? {
				client.remove_account(&account).await?;
			}

			self.user_cache.remove(&key).await?;

			Ok(())
		})
		.await
	}
}

fn authenticated_key(principal: Option<&Principal>) -> Result<Option<IdentityKey>> {
	match principal {
		Some(principal) if principal.is_authenticated() => Ok(principal.identity_key().cloned()),
		_ => Err(Error::Unauthenticated),
	}
}
