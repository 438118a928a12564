//! Provider options and per-request redirect context.

// self
use crate::{
	_prelude::*,
	auth::{ScopeMapping, ScopeResolver},
	error::ConfigError,
};

/// Static configuration of the confidential client registration.
///
/// Loading the values (files, environment, secret stores) is the host's job; the type
/// only deserializes and validates them.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenProviderOptions {
	/// Application (client) identifier.
	pub client_id: String,
	/// Client secret used for confidential-client authentication.
	pub client_secret: String,
	/// Directory (tenant) identifier.
	pub tenant_id: String,
	/// Path appended to the request's path base to form the redirect URI.
	#[serde(default)]
	pub callback_path: String,
	/// Ordered placeholder substitutions applied to requested scopes.
	#[serde(default)]
	pub scope_placeholder_mappings: Vec<ScopeMapping>,
}
impl TokenProviderOptions {
	/// Creates options with an empty callback path and no scope mappings.
	pub fn new(
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
		tenant_id: impl Into<String>,
	) -> Self {
		Self {
			client_id: client_id.into(),
			client_secret: client_secret.into(),
			tenant_id: tenant_id.into(),
			callback_path: String::new(),
			scope_placeholder_mappings: Vec::new(),
		}
	}

	/// Sets the callback path.
	pub fn with_callback_path(mut self, path: impl Into<String>) -> Self {
		self.callback_path = path.into();

		self
	}

	/// Appends a scope placeholder mapping.
	pub fn with_scope_mapping(
		mut self,
		placeholder: impl Into<String>,
		value: impl Into<String>,
	) -> Self {
		self.scope_placeholder_mappings.push(ScopeMapping::new(placeholder, value));

		self
	}

	/// Rejects blank credentials and malformed scope mappings.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.client_id.trim().is_empty() {
			return Err(ConfigError::MissingClientId);
		}
		if self.client_secret.trim().is_empty() {
			return Err(ConfigError::MissingClientSecret);
		}
		if self.tenant_id.trim().is_empty() {
			return Err(ConfigError::MissingTenantId);
		}

		ScopeResolver::validate_mappings(&self.scope_placeholder_mappings)
	}

	/// Resolver over the configured mapping table.
	pub fn resolver(&self) -> Result<ScopeResolver, ConfigError> {
		ScopeResolver::new(self.scope_placeholder_mappings.clone())
	}
}
impl Debug for TokenProviderOptions {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenProviderOptions")
			.field("client_id", &self.client_id)
			.field("client_secret", &"<redacted>")
			.field("tenant_id", &self.tenant_id)
			.field("callback_path", &self.callback_path)
			.field("scope_placeholder_mappings", &self.scope_placeholder_mappings)
			.finish()
	}
}

/// Parts of the incoming HTTP request used to build an absolute redirect URI.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
	/// URI scheme, e.g. `https`.
	pub scheme: String,
	/// Host with optional port, e.g. `app.example.com:8443`.
	pub host: String,
	/// Path base the app is mounted under; empty or starting with `/`.
	#[serde(default)]
	pub path_base: String,
}
impl RequestContext {
	/// Creates a context without a path base.
	pub fn new(scheme: impl Into<String>, host: impl Into<String>) -> Self {
		Self { scheme: scheme.into(), host: host.into(), path_base: String::new() }
	}

	/// Sets the path base.
	pub fn with_path_base(mut self, path_base: impl Into<String>) -> Self {
		self.path_base = path_base.into();

		self
	}

	/// Builds `scheme://host{path_base}{callback_path}`.
	pub fn redirect_uri(&self, callback_path: &str) -> Result<Url, ConfigError> {
		let invalid = |reason: &str| ConfigError::InvalidRequestContext { reason: reason.into() };

		if self.scheme.trim().is_empty() {
			return Err(invalid("scheme is empty"));
		}
		if self.host.trim().is_empty() {
			return Err(invalid("host is empty"));
		}
		if !self.path_base.is_empty() && !self.path_base.starts_with('/') {
			return Err(invalid("path base must start with '/'"));
		}

		let raw = format!("{}://{}{}{callback_path}", self.scheme, self.host, self.path_base);

		Url::parse(&raw).map_err(|source| ConfigError::InvalidRedirect { source })
	}
}
