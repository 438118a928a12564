//! Typed identity claims of the signed-in principal and the hints derived from them.

// crates.io
use serde_json::{Map, Value};
// self
use crate::{
	_prelude::*,
	auth::{IdentifierError, IdentityKey},
};

/// Well-known tenant identifier of personal (consumer) accounts.
pub const PERSONAL_ACCOUNT_TENANT_ID: &str = "9188040d-6c67-4c5b-b112-36a304b66dad";

/// Claim names read from the principal.
pub mod claims {
	/// Home-account identifier claim, stamped at sign-in.
	pub const ACCOUNT_ID: &str = "aid";
	/// Login hint claim.
	pub const PREFERRED_USERNAME: &str = "preferred_username";
	/// Tenant identifier claim.
	pub const TENANT_ID: &str = "tid";
}

/// Hint steering the authorization endpoint toward a class of accounts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainHint {
	/// Personal accounts.
	Consumers,
	/// Work or school accounts.
	Organizations,
}
impl DomainHint {
	/// Wire value of the hint.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Consumers => "consumers",
			Self::Organizations => "organizations",
		}
	}

	/// Derives the hint from a tenant identifier; blank tenants yield `None`.
	pub fn from_tenant(tenant_id: Option<&str>) -> Option<Self> {
		let tenant_id = tenant_id.map(str::trim).filter(|tenant| !tenant.is_empty())?;

		if tenant_id.eq_ignore_ascii_case(PERSONAL_ACCOUNT_TENANT_ID) {
			Some(Self::Consumers)
		} else {
			Some(Self::Organizations)
		}
	}
}
impl Display for DomainHint {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Identity claims validated once when the principal is ingested.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IdentityClaims {
	identity_key: Option<IdentityKey>,
	login_hint: Option<String>,
	tenant_id: Option<String>,
}
impl IdentityClaims {
	/// Builds claims from explicit parts.
	pub fn new(
		identity_key: Option<IdentityKey>,
		login_hint: Option<String>,
		tenant_id: Option<String>,
	) -> Self {
		Self { identity_key, login_hint, tenant_id }
	}

	/// Reads `aid`, `preferred_username` and `tid` from a claim map.
	///
	/// Missing or non-string claims are treated as absent; a present but malformed `aid`
	/// is rejected.
	pub fn from_claims(claims: &Map<String, Value>) -> Result<Self, IdentifierError> {
		let read = |name: &str| claims.get(name).and_then(Value::as_str).map(str::to_owned);
		let identity_key = read(claims::ACCOUNT_ID).map(IdentityKey::new).transpose()?;

		Ok(Self {
			identity_key,
			login_hint: read(claims::PREFERRED_USERNAME),
			tenant_id: read(claims::TENANT_ID),
		})
	}

	/// Identity key from the `aid` claim.
	pub fn identity_key(&self) -> Option<&IdentityKey> {
		self.identity_key.as_ref()
	}

	/// Login hint from the `preferred_username` claim.
	pub fn login_hint(&self) -> Option<&str> {
		self.login_hint.as_deref()
	}

	/// Tenant identifier from the `tid` claim.
	pub fn tenant_id(&self) -> Option<&str> {
		self.tenant_id.as_deref()
	}

	/// Domain hint derived from the tenant.
	pub fn domain_hint(&self) -> Option<DomainHint> {
		DomainHint::from_tenant(self.tenant_id())
	}
}

/// Caller principal supplied by the hosting layer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Principal {
	/// Whether the host authenticated this principal.
	pub authenticated: bool,
	/// Identity claims of the principal.
	pub claims: IdentityClaims,
}
impl Principal {
	/// An authenticated principal carrying `claims`.
	pub fn authenticated(claims: IdentityClaims) -> Self {
		Self { authenticated: true, claims }
	}

	/// A principal without a session.
	pub fn anonymous() -> Self {
		Self::default()
	}

	/// Returns `true` if the principal is authenticated.
	pub fn is_authenticated(&self) -> bool {
		self.authenticated
	}

	/// Identity key of the principal, if any.
	pub fn identity_key(&self) -> Option<&IdentityKey> {
		self.claims.identity_key()
	}
}

/// Identity metadata attached to a token response and the client-side cache.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
	/// Home-account identifier; also the user cache key.
	pub home_account_id: IdentityKey,
	/// Username reported by the provider.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub username: Option<String>,
	/// Tenant the account signed in with.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub tenant_id: Option<String>,
}
impl Account {
	/// Creates an account record for `home_account_id`.
	pub fn new(home_account_id: IdentityKey) -> Self {
		Self { home_account_id, username: None, tenant_id: None }
	}
}
