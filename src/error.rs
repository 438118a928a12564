//! Provider-level error types shared across flows, caches, and the reauthentication signal.

// self
use crate::{_prelude::*, auth::IdentityKey};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Temporary upstream failure; retry with backoff.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// A user-bound operation was invoked without an authenticated principal.
	#[error("The current principal is not authenticated.")]
	Unauthenticated,
	/// A user cache write could not resolve an identity key.
	#[error("No identity key is available for the user token cache.")]
	MissingIdentity,
	/// Exchange-response identity metadata disagrees with the caller's identity key.
	#[error("Token response belongs to `{response}` but the caller is `{principal}`.")]
	IdentityMismatch {
		/// Identity key carried by the token response.
		response: IdentityKey,
		/// Identity key carried by the caller's principal.
		principal: IdentityKey,
	},
	/// The signed-in user's account could not be located in the token cache.
	#[error("The user account could not be found in the token cache.")]
	AccountNotFound,
	/// The cached account has no refresh token to redeem.
	#[error("No refresh token is cached for the user account.")]
	NoTokensFound,
	/// The exchange succeeded but did not grant every requested scope.
	#[error("Requested scopes were not granted: {}.", missing.join(" "))]
	ScopeNotGranted {
		/// Fully-qualified scopes that were requested but not granted.
		missing: Vec<String>,
	},
	/// Provider reported that the requested scopes are invalid or insufficient.
	#[error("Token lacks the required scopes: {reason}.")]
	InsufficientScope {
		/// Provider-supplied reason string.
		reason: String,
	},
	/// Provider rejected the grant (e.g., bad code or refresh token).
	#[error("Provider rejected the grant: {reason}.")]
	InvalidGrant {
		/// Provider-supplied reason string.
		reason: String,
		/// Provider-supplied suberror (e.g. `consent_required`), when present.
		suberror: Option<String>,
	},
	/// Client authentication failed or credentials are malformed.
	#[error("Client authentication failed: {reason}.")]
	InvalidClient {
		/// Provider-supplied reason string.
		reason: String,
	},
}
impl Error {
	/// Reserved code carried by [`Error::ScopeNotGranted`].
	pub const REQUESTED_SCOPE_MISSING: &'static str = "requested_scope_missing";

	/// Returns a stable machine-readable code for the error.
	pub fn code(&self) -> &'static str {
		match self {
			Self::Storage(_) => "storage",
			Self::Config(_) => "configuration",
			Self::Transient(_) => "transient",
			Self::Transport(_) => "transport",
			Self::Unauthenticated => "unauthenticated",
			Self::MissingIdentity => "missing_identity",
			Self::IdentityMismatch { .. } => "identity_mismatch",
			Self::AccountNotFound => "user_null",
			Self::NoTokensFound => "no_tokens_found",
			Self::ScopeNotGranted { .. } => Self::REQUESTED_SCOPE_MISSING,
			Self::InsufficientScope { .. } => "insufficient_scope",
			Self::InvalidGrant { .. } => "invalid_grant",
			Self::InvalidClient { .. } => "invalid_client",
		}
	}
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Provider descriptor contains an invalid URL.
	#[error("Descriptor contains an invalid URL.")]
	InvalidDescriptor {
		/// Underlying parsing failure.
		#[source]
		source: oauth2::url::ParseError,
	},
	/// Redirect URI cannot be parsed.
	#[error("Redirect URI is invalid.")]
	InvalidRedirect {
		/// Underlying parsing failure.
		#[source]
		source: oauth2::url::ParseError,
	},
	/// Request context cannot produce an absolute redirect URI.
	#[error("Request context is invalid: {reason}.")]
	InvalidRequestContext {
		/// Description of the invalid component.
		reason: String,
	},

	/// The client identifier is missing.
	#[error("Client id is required.")]
	MissingClientId,
	/// The client secret is missing.
	#[error("Client secret is required for a confidential client.")]
	MissingClientSecret,
	/// The tenant identifier is missing.
	#[error("Tenant id is required.")]
	MissingTenantId,
	/// A scope placeholder mapping is malformed.
	#[error("Scope placeholder mapping #{index} is invalid: {reason}.")]
	InvalidScopeMapping {
		/// Zero-based position of the mapping in the table.
		index: usize,
		/// Which part of the mapping was rejected.
		reason: &'static str,
	},
	/// Descriptor does not enable the requested grant.
	#[error("Descriptor `{descriptor}` does not enable the {grant} grant.")]
	UnsupportedGrant {
		/// Provider identifier string.
		descriptor: String,
		/// Disabled grant label.
		grant: &'static str,
	},
	/// Request scopes cannot be normalized.
	#[error("Requested scopes are invalid.")]
	InvalidScope(#[from] crate::auth::ScopeValidationError),
	/// Token record builder validation failed.
	#[error("Unable to build token record.")]
	TokenBuild(#[from] crate::auth::TokenRecordBuilderError),
	/// Token endpoint response omitted `expires_in`.
	#[error("Token endpoint response is missing expires_in.")]
	MissingExpiresIn,
	/// Token endpoint returned an excessively large `expires_in`.
	#[error("The expires_in value exceeds the supported range.")]
	ExpiresInOutOfRange,
	/// Token endpoint returned a non-positive duration.
	#[error("The expires_in value must be positive.")]
	NonPositiveExpiresIn,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Temporary failure variants (safe to retry).
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// Provider returned an unexpected but non-fatal response.
	#[error("Token endpoint returned an unexpected response: {message}.")]
	TokenEndpoint {
		/// Provider- or crate-supplied message summarizing the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Token endpoint responded with malformed JSON that could not be parsed.
	#[error("Token endpoint returned malformed JSON.")]
	TokenResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::error::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the token endpoint.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the token endpoint.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
