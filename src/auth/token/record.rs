//! Token records handed back by every acquisition flow.

// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, token::secret::TokenSecret},
	identity::Account,
};

/// Errors produced by [`TokenRecordBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum TokenRecordBuilderError {
	/// No access token value was provided.
	#[error("Access token is required.")]
	MissingAccessToken,
	/// Neither `expires_at` nor `expires_in` was provided.
	#[error("Expiry must be supplied via expires_at or expires_in.")]
	MissingExpiry,
}

/// Result of a successful acquisition.
///
/// The refresh token never leaves the client-side cache, so it is not part of the record.
#[derive(Clone)]
pub struct TokenRecord {
	/// Scopes the provider actually granted.
	pub scope: ScopeSet,
	/// Access token for the downstream resource.
	pub access_token: TokenSecret,
	/// ID token, present for user-delegated exchanges.
	pub id_token: Option<TokenSecret>,
	/// Identity metadata of the response; `None` for app-only tokens.
	pub account: Option<Account>,
	/// Issued-at instant.
	pub issued_at: OffsetDateTime,
	/// Expiry instant.
	pub expires_at: OffsetDateTime,
}
impl TokenRecord {
	/// Starts a builder for a record granting `scope`.
	pub fn builder(scope: ScopeSet) -> TokenRecordBuilder {
		TokenRecordBuilder::new(scope)
	}

	/// Returns `true` if the token expires within `window` of `instant`.
	///
	/// Cached access tokens are only served while this is `false` for the expiry margin.
	pub fn expires_within(&self, window: Duration, instant: OffsetDateTime) -> bool {
		self.expires_at - window <= instant
	}
}
impl Debug for TokenRecord {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenRecord")
			.field("scope", &self.scope)
			.field("access_token", &self.access_token)
			.field("id_token", &self.id_token)
			.field("account", &self.account)
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Builder for [`TokenRecord`].
#[derive(Clone, Debug)]
pub struct TokenRecordBuilder {
	scope: ScopeSet,
	access_token: Option<TokenSecret>,
	id_token: Option<TokenSecret>,
	account: Option<Account>,
	issued_at: Option<OffsetDateTime>,
	expires_at: Option<OffsetDateTime>,
	expires_in: Option<Duration>,
}
impl TokenRecordBuilder {
	fn new(scope: ScopeSet) -> Self {
		Self {
			scope,
			access_token: None,
			id_token: None,
			account: None,
			issued_at: None,
			expires_at: None,
			expires_in: None,
		}
	}

	/// Sets the access token value.
	pub fn access_token(mut self, token: impl Into<String>) -> Self {
		self.access_token = Some(TokenSecret::new(token));

		self
	}

	/// Sets the ID token value.
	pub fn id_token(mut self, token: Option<String>) -> Self {
		self.id_token = token.map(TokenSecret::new);

		self
	}

	/// Attaches the response's identity metadata.
	pub fn account(mut self, account: Option<Account>) -> Self {
		self.account = account;

		self
	}

	/// Sets the issued-at instant.
	pub fn issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = Some(instant);

		self
	}

	/// Sets an absolute expiry instant.
	pub fn expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Sets expiry relative to the issued-at instant.
	pub fn expires_in(mut self, duration: Duration) -> Self {
		self.expires_in = Some(duration);

		self
	}

	/// Produces the [`TokenRecord`].
	pub fn build(self) -> Result<TokenRecord, TokenRecordBuilderError> {
		let access_token = self.access_token.ok_or(TokenRecordBuilderError::MissingAccessToken)?;
		let issued_at = self.issued_at.unwrap_or_else(OffsetDateTime::now_utc);
		let expires_at = match (self.expires_at, self.expires_in) {
			(Some(instant), _) => instant,
			(None, Some(delta)) => issued_at + delta,
			(None, None) => return Err(TokenRecordBuilderError::MissingExpiry),
		};

		Ok(TokenRecord {
			scope: self.scope,
			access_token,
			id_token: self.id_token,
			account: self.account,
			issued_at,
			expires_at,
		})
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	fn scope() -> ScopeSet {
		ScopeSet::new(["https://db.example.net/.default"]).expect("Scope fixture should be valid.")
	}

	#[test]
	fn expiry_window_includes_its_boundary() {
		let record = TokenRecord::builder(scope())
			.access_token("access")
			.issued_at(macros::datetime!(2025-01-01 00:00 UTC))
			.expires_at(macros::datetime!(2025-01-01 01:00 UTC))
			.build()
			.expect("Token record builder should succeed with absolute expiry.");
		let margin = Duration::minutes(5);

		assert!(!record.expires_within(margin, macros::datetime!(2025-01-01 00:30 UTC)));
		assert!(record.expires_within(margin, macros::datetime!(2025-01-01 00:55 UTC)));
		assert!(record.expires_within(margin, macros::datetime!(2025-01-01 00:56 UTC)));
		assert!(record.expires_within(margin, macros::datetime!(2025-01-01 01:30 UTC)));
	}

	#[test]
	fn builder_requires_token_and_expiry() {
		assert_eq!(
			TokenRecord::builder(scope()).expires_in(Duration::minutes(1)).build().err(),
			Some(TokenRecordBuilderError::MissingAccessToken)
		);
		assert_eq!(
			TokenRecord::builder(scope()).access_token("a").build().err(),
			Some(TokenRecordBuilderError::MissingExpiry)
		);

		let record = TokenRecord::builder(scope())
			.access_token("secret")
			.id_token(Some("header.payload.sig".into()))
			.issued_at(macros::datetime!(2025-01-01 00:00 UTC))
			.expires_in(Duration::minutes(30))
			.build()
			.expect("Relative expiry should be supported.");

		assert_eq!(record.expires_at, macros::datetime!(2025-01-01 00:30 UTC));

		let rendered = format!("{record:?}");

		assert!(!rendered.contains("secret\""));
		assert!(!rendered.contains("header.payload"));
	}
}
