//! Strategy hooks that decorate token requests and classify provider errors.

// self
use crate::{_prelude::*, provider::descriptor::GrantType};

/// Provider hook for request decoration and error classification.
///
/// Hooks see only crate-owned data so implementations never depend on the HTTP stack.
pub trait ProviderStrategy: Send + Sync {
	/// Maps a failed token request onto a [`ProviderErrorKind`].
	fn classify_token_error(&self, ctx: &ProviderErrorContext) -> ProviderErrorKind;

	/// Adds provider-specific form parameters (e.g. `client_info`, `resource`) before dispatch.
	fn augment_token_request(&self, _grant: GrantType, _form: &mut BTreeMap<String, String>) {}
}

/// Provider error categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderErrorKind {
	/// The grant was rejected, including interaction- and consent-required answers.
	InvalidGrant,
	/// Client authentication failed.
	InvalidClient,
	/// Requested scopes are invalid or exceed what may be issued.
	InsufficientScope,
	/// Temporary failure; retry with backoff.
	Transient,
}

/// Primitive facts about a failed token request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderErrorContext {
	/// Grant of the failing request.
	pub grant_type: GrantType,
	/// HTTP status code, when available.
	pub http_status: Option<u16>,
	/// OAuth `error` field.
	pub oauth_error: Option<String>,
	/// OAuth `error_description` field.
	pub error_description: Option<String>,
	/// Provider `suberror` field (e.g. `consent_required`).
	pub suberror: Option<String>,
	/// Preview of a non-JSON response body.
	pub body_preview: Option<String>,
	/// Set when the failure happened in the network layer.
	pub network_error: bool,
}
impl ProviderErrorContext {
	const BODY_PREVIEW_LIMIT: usize = 256;

	/// Creates a context for `grant_type`.
	pub fn new(grant_type: GrantType) -> Self {
		Self {
			grant_type,
			http_status: None,
			oauth_error: None,
			error_description: None,
			suberror: None,
			body_preview: None,
			network_error: false,
		}
	}

	/// Context for a network-layer failure.
	pub fn network_failure(grant_type: GrantType) -> Self {
		Self { network_error: true, ..Self::new(grant_type) }
	}

	/// Adds an HTTP status code.
	pub fn with_http_status(mut self, status: u16) -> Self {
		self.http_status = Some(status);

		self
	}

	/// Adds the OAuth `error` code.
	pub fn with_oauth_error(mut self, error: impl Into<String>) -> Self {
		self.oauth_error = Some(error.into());

		self
	}

	/// Adds the OAuth `error_description`.
	pub fn with_error_description(mut self, description: impl Into<String>) -> Self {
		self.error_description = Some(description.into());

		self
	}

	/// Adds the provider `suberror`.
	pub fn with_suberror(mut self, suberror: impl Into<String>) -> Self {
		self.suberror = Some(suberror.into());

		self
	}

	/// Adds a body preview, truncated to a fixed number of characters.
	pub fn with_body_preview(mut self, body: impl Into<String>) -> Self {
		let body: String = body.into();

		self.body_preview = Some(match body.char_indices().nth(Self::BODY_PREVIEW_LIMIT) {
			Some((cut, _)) => format!("{}…", &body[..cut]),
			None => body,
		});

		self
	}
}

/// Default RFC 6749 strategy with OIDC interaction-required handling.
///
/// Structured fields win over body hints, which win over the HTTP status. Network
/// failures are always transient.
#[derive(Debug, Default)]
pub struct DefaultProviderStrategy;
impl Display for DefaultProviderStrategy {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("default-provider-strategy")
	}
}
impl ProviderStrategy for DefaultProviderStrategy {
	fn classify_token_error(&self, ctx: &ProviderErrorContext) -> ProviderErrorKind {
		if ctx.network_error {
			return ProviderErrorKind::Transient;
		}

		ctx.oauth_error
			.as_deref()
			.and_then(classify_code)
			.or_else(|| ctx.suberror.as_deref().and_then(classify_code))
			.or_else(|| ctx.error_description.as_deref().and_then(classify_code))
			.or_else(|| classify_text(ctx.error_description.as_deref()))
			.or_else(|| classify_text(ctx.body_preview.as_deref()))
			.unwrap_or_else(|| classify_status(ctx.http_status))
	}
}

fn classify_code(value: &str) -> Option<ProviderErrorKind> {
	const GRANT: &[&str] = &[
		"invalid_grant",
		"access_denied",
		"interaction_required",
		"consent_required",
		"login_required",
	];
	const CLIENT: &[&str] = &["invalid_client", "unauthorized_client"];
	const SCOPE: &[&str] = &["invalid_scope", "insufficient_scope"];
	const TRANSIENT: &[&str] = &["temporarily_unavailable", "server_error"];

	let matches = |codes: &[&str]| codes.iter().any(|code| value.eq_ignore_ascii_case(code));

	if matches(GRANT) {
		Some(ProviderErrorKind::InvalidGrant)
	} else if matches(CLIENT) {
		Some(ProviderErrorKind::InvalidClient)
	} else if matches(SCOPE) {
		Some(ProviderErrorKind::InsufficientScope)
	} else if matches(TRANSIENT) {
		Some(ProviderErrorKind::Transient)
	} else {
		None
	}
}

fn classify_text(text: Option<&str>) -> Option<ProviderErrorKind> {
	let lowered = text?.to_ascii_lowercase();

	if lowered.contains("invalid_grant") || lowered.contains("consent_required") {
		Some(ProviderErrorKind::InvalidGrant)
	} else if lowered.contains("invalid_client") {
		Some(ProviderErrorKind::InvalidClient)
	} else if lowered.contains("insufficient_scope") || lowered.contains("invalid_scope") {
		Some(ProviderErrorKind::InsufficientScope)
	} else if lowered.contains("temporarily_unavailable") || lowered.contains("retry") {
		Some(ProviderErrorKind::Transient)
	} else {
		None
	}
}

fn classify_status(status: Option<u16>) -> ProviderErrorKind {
	match status {
		Some(400 | 404 | 410) => ProviderErrorKind::InvalidGrant,
		Some(401) => ProviderErrorKind::InvalidClient,
		Some(403) => ProviderErrorKind::InsufficientScope,
		_ => ProviderErrorKind::Transient,
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn interaction_required_answers_are_invalid_grants() {
		let strategy = DefaultProviderStrategy;
		let ctx = ProviderErrorContext::new(GrantType::RefreshToken)
			.with_http_status(400)
			.with_oauth_error("interaction_required")
			.with_suberror("consent_required");

		assert_eq!(strategy.classify_token_error(&ctx), ProviderErrorKind::InvalidGrant);

		let ctx = ProviderErrorContext::new(GrantType::RefreshToken)
			.with_oauth_error("unknown_code")
			.with_suberror("consent_required");

		assert_eq!(strategy.classify_token_error(&ctx), ProviderErrorKind::InvalidGrant);
	}

	#[test]
	fn body_preview_is_truncated() {
		let ctx = ProviderErrorContext::new(GrantType::ClientCredentials)
			.with_body_preview("x".repeat(300));
		let preview = ctx.body_preview.expect("Preview should be stored.");

		assert_eq!(preview.chars().count(), ProviderErrorContext::BODY_PREVIEW_LIMIT + 1);
		assert!(preview.ends_with('…'));
	}
}
