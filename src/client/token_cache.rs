//! Serialized client-side token cache (accounts, access, refresh and ID tokens).

// self
use crate::{
	_prelude::*,
	auth::{IdentityKey, ScopeSet, TokenRecord},
	error::ConfigError,
	identity::Account,
	store::{CacheBlob, StoreError},
};

/// Cached access tokens expiring within this window are treated as stale.
pub const ACCESS_TOKEN_EXPIRY_MARGIN: Duration = Duration::minutes(5);

/// In-memory view of one serialized cache blob.
///
/// The JSON layout is owned by this type; stores only ever see opaque bytes.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCache {
	#[serde(default)]
	accounts: BTreeMap<IdentityKey, Account>,
	#[serde(default)]
	access_tokens: Vec<CachedAccessToken>,
	#[serde(default)]
	refresh_tokens: BTreeMap<IdentityKey, String>,
	#[serde(default)]
	id_tokens: BTreeMap<IdentityKey, String>,
}
impl TokenCache {
	/// Decodes a persisted blob; missing or empty blobs yield an empty cache.
	pub fn from_blob(blob: Option<&CacheBlob>) -> Result<Self> {
		match blob {
			Some(blob) if !blob.is_empty() => serde_json::from_slice(blob.as_bytes())
				.map_err(|e| Error::from(StoreError::Serialization { message: e.to_string() })),
			_ => Ok(Self::default()),
		}
	}

	/// Encodes the cache for persistence.
	pub fn to_blob(&self) -> Result<CacheBlob> {
		let bytes = serde_json::to_vec(self)
			.map_err(|e| StoreError::Serialization { message: e.to_string() })?;

		Ok(CacheBlob::new(bytes))
	}

	/// Returns `true` when the cache holds nothing.
	pub fn is_empty(&self) -> bool {
		self.accounts.is_empty() && self.access_tokens.is_empty() && self.refresh_tokens.is_empty()
	}

	/// Looks up an account by home-account identifier.
	pub fn account(&self, key: &IdentityKey) -> Option<&Account> {
		self.accounts.get(key)
	}

	/// All cached accounts.
	pub fn accounts(&self) -> impl Iterator<Item = &Account> {
		self.accounts.values()
	}

	/// Refresh token cached for `key`.
	pub fn refresh_token(&self, key: &IdentityKey) -> Option<&str> {
		self.refresh_tokens.get(key).map(String::as_str)
	}

	/// Finds a fresh access token covering `scopes` for `account` (`None` for app tokens).
	pub fn find_access_token(
		&self,
		account: Option<&IdentityKey>,
		scopes: &ScopeSet,
		now: OffsetDateTime,
	) -> Result<Option<TokenRecord>> {
		let candidates = self.access_tokens.iter().filter(|entry| {
			entry.home_account_id.as_ref() == account && scopes.is_covered_by(&entry.scope)
		});

		for entry in candidates {
			let record = TokenRecord::builder(entry.scope.clone())
				.access_token(entry.secret.clone())
				.id_token(account.and_then(|key| self.id_tokens.get(key).cloned()))
				.account(account.and_then(|key| self.accounts.get(key).cloned()))
				.issued_at(entry.issued_at)
				.expires_at(entry.expires_at)
				.build()
				.map_err(ConfigError::from)?;

			if !record.expires_within(ACCESS_TOKEN_EXPIRY_MARGIN, now) {
				return Ok(Some(record));
			}
		}

		Ok(None)
	}

	/// Records the outcome of a successful exchange.
	///
	/// Access tokens of the same account whose scopes overlap the new grant are replaced.
	/// A missing `refresh_token` keeps the previously cached one.
	pub fn store(&mut self, record: &TokenRecord, refresh_token: Option<String>) {
		let home = record.account.as_ref().map(|account| account.home_account_id.clone());

		self.access_tokens.retain(|entry| {
			entry.home_account_id != home || !entry.scope.overlaps(&record.scope)
		});
		self.access_tokens.push(CachedAccessToken {
			home_account_id: home.clone(),
			scope: record.scope.clone(),
			secret: record.access_token.expose().to_owned(),
			issued_at: record.issued_at,
			expires_at: record.expires_at,
		});

		let (Some(account), Some(home)) = (record.account.as_ref(), home) else {
			return;
		};

		self.accounts.insert(home.clone(), account.clone());

		if let Some(refresh) = refresh_token {
			self.refresh_tokens.insert(home.clone(), refresh);
		}
		if let Some(id_token) = record.id_token.as_ref() {
			self.id_tokens.insert(home, id_token.expose().to_owned());
		}
	}

	/// Removes an account with all of its tokens. Returns `false` if it was unknown.
	pub fn remove_account(&mut self, key: &IdentityKey) -> bool {
		let before = self.access_tokens.len();

		self.access_tokens.retain(|entry| entry.home_account_id.as_ref() != Some(key));

		let removed_tokens = before != self.access_tokens.len();
		let removed_refresh = self.refresh_tokens.remove(key).is_some();
		let removed_id = self.id_tokens.remove(key).is_some();
		let removed_account = self.accounts.remove(key).is_some();

		removed_account || removed_refresh || removed_tokens || removed_id
	}
}
impl Debug for TokenCache {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenCache")
			.field("accounts", &self.accounts.len())
			.field("access_tokens", &self.access_tokens.len())
			.field("refresh_tokens", &self.refresh_tokens.len())
			.finish()
	}
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
struct CachedAccessToken {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	home_account_id: Option<IdentityKey>,
	scope: ScopeSet,
	secret: String,
	issued_at: OffsetDateTime,
	expires_at: OffsetDateTime,
}
