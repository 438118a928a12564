//! Turns consent-related failures into typed interactive-sign-in directives.
//!
//! [`classify`] inspects a failure (and every error in its source chain) once. Scope
//! shortfalls, accounts missing from the cache and consent-required invalid grants are
//! recoverable by sending the user through the authorize endpoint again; everything
//! else propagates unchanged. [`ReauthenticationSignal::evaluate`] builds the
//! [`ReauthenticationDirective`] carrying the scopes and sign-in hints for that redirect.

// crates.io
use rand::{Rng, distr::Alphanumeric};
// self
use crate::{
	_prelude::*,
	auth::{OIDC_RESERVED_SCOPES, ScopeResolver, ScopeSet, TokenRecord},
	identity::{DomainHint, Principal},
	obs,
	provider::ProviderDescriptor,
};

/// Scopes every reauthentication request carries.
pub const BASELINE_SCOPES: [&str; 3] = OIDC_RESERVED_SCOPES;

const CONSENT_REQUIRED: &str = "consent_required";
const CONSENT_REQUIRED_CODE: &str = "AADSTS65001";
const STATE_LEN: usize = 32;

/// Why a failure requires interactive sign-in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReauthReason {
	/// The exchange succeeded without granting every requested scope.
	ScopeNotGranted,
	/// The user's account is not in the token cache (e.g. after a restart).
	AccountNotFound,
	/// The provider rejected the grant because consent is missing.
	ConsentRequired,
}
impl ReauthReason {
	/// Stable label for logs and metrics.
	pub const fn as_str(self) -> &'static str {
		match self {
			ReauthReason::ScopeNotGranted => "scope_not_granted",
			ReauthReason::AccountNotFound => "account_not_found",
			ReauthReason::ConsentRequired => "consent_required",
		}
	}
}
impl Display for ReauthReason {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Classifies `err` or the first crate [`Error`] found in its source chain.
pub fn classify(err: &(dyn StdError + 'static)) -> Option<ReauthReason> {
	let mut current = Some(err);

	while let Some(candidate) = current {
		if let Some(err) = candidate.downcast_ref::<Error>() {
			return classify_error(err);
		}

		current = candidate.source();
	}

	None
}

fn classify_error(err: &Error) -> Option<ReauthReason> {
	match err {
		Error::ScopeNotGranted { .. } => Some(ReauthReason::ScopeNotGranted),
		Error::AccountNotFound => Some(ReauthReason::AccountNotFound),
		Error::InvalidGrant { reason, suberror } => {
			let consent_suberror = suberror
				.as_deref()
				.is_some_and(|value| value.eq_ignore_ascii_case(CONSENT_REQUIRED));
			let lowered = reason.to_ascii_lowercase();
			let consent_reason = lowered.contains(&CONSENT_REQUIRED_CODE.to_ascii_lowercase())
				&& lowered.contains(CONSENT_REQUIRED);

			(consent_suberror || consent_reason).then_some(ReauthReason::ConsentRequired)
		},
		_ => None,
	}
}

/// Parameters of the interactive sign-in that recovers from a failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReauthenticationDirective {
	/// Baseline OIDC scopes followed by the fully-qualified resource scopes.
	pub scopes: ScopeSet,
	/// Username to prefill on the sign-in page.
	pub login_hint: Option<String>,
	/// Account-type hint that skips the home-realm discovery page.
	pub domain_hint: Option<DomainHint>,
	/// Classification that triggered the directive.
	pub reason: ReauthReason,
}
impl ReauthenticationDirective {
	/// `scope`, `login_hint` and `domain_hint` parameters for the authorize request.
	///
	/// Absent hints are omitted.
	pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
		let mut pairs = vec![("scope", self.scopes.normalized())];

		if let Some(login_hint) = self.login_hint.as_ref() {
			pairs.push(("login_hint", login_hint.clone()));
		}
		if let Some(domain_hint) = self.domain_hint {
			pairs.push(("domain_hint", domain_hint.as_str().to_owned()));
		}

		pairs
	}

	/// Builds the authorize URL for a code-flow challenge.
	///
	/// A random state is generated when `state` is `None`; the returned pair carries the
	/// state the host must verify on the callback.
	pub fn authorize_url(
		&self,
		descriptor: &ProviderDescriptor,
		client_id: &str,
		redirect_uri: &Url,
		state: Option<&str>,
	) -> (Url, String) {
		let state = state.map(str::to_owned).unwrap_or_else(random_state);
		let delimiter = descriptor.quirks.scope_delimiter.to_string();
		let mut url = descriptor.endpoints.authorization.clone();
		let mut pairs = url.query_pairs_mut();

		pairs.append_pair("response_type", "code");
		pairs.append_pair("client_id", client_id);
		pairs.append_pair("redirect_uri", redirect_uri.as_str());
		pairs.append_pair("scope", &self.scopes.iter().collect::<Vec<_>>().join(&delimiter));
		pairs.append_pair("state", &state);

		for (key, value) in self.query_pairs().into_iter().filter(|(key, _)| *key != "scope") {
			pairs.append_pair(key, &value);
		}

		drop(pairs);

		(url, state)
	}
}

/// Decision point between propagating a failure and challenging the user.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReauthenticationSignal;
impl ReauthenticationSignal {
	/// Builds a directive for an interactive-recoverable `err`, or hands `err` back.
	///
	/// `required` are the scopes the failing operation asked for, before placeholder
	/// resolution; `principal` supplies the sign-in hints.
	pub fn evaluate<E>(
		err: E,
		required: &ScopeSet,
		principal: Option<&Principal>,
		resolver: &ScopeResolver,
	) -> Result<ReauthenticationDirective, E>
	where
		E: 'static + StdError,
	{
		let Some(reason) = classify(&err) else {
			return Err(err);
		};
		let scopes = baseline_scopes().union(&resolver.resolve_all(required));
		let claims = principal.map(|principal| &principal.claims);
		let directive = ReauthenticationDirective {
			login_hint: claims.and_then(|claims| claims.login_hint()).map(str::to_owned),
			domain_hint: claims.and_then(|claims| claims.domain_hint()),
			scopes,
			reason,
		};

		obs::record_reauthentication(reason.as_str());
		obs::record_reauthentication_event(reason.as_str(), directive.scopes.len());

		Ok(directive)
	}
}

/// Result of an acquisition that may require interactive sign-in.
#[derive(Clone, Debug)]
pub enum TokenOutcome {
	/// A token satisfying the requested scopes.
	Token(TokenRecord),
	/// The user must sign in again with the given parameters.
	Reauthenticate(ReauthenticationDirective),
}
impl TokenOutcome {
	/// Returns the token, if one was acquired.
	pub fn token(&self) -> Option<&TokenRecord> {
		match self {
			TokenOutcome::Token(record) => Some(record),
			TokenOutcome::Reauthenticate(_) => None,
		}
	}

	/// Returns the directive, if the user must sign in again.
	pub fn directive(&self) -> Option<&ReauthenticationDirective> {
		match self {
			TokenOutcome::Token(_) => None,
			TokenOutcome::Reauthenticate(directive) => Some(directive),
		}
	}
}

fn baseline_scopes() -> ScopeSet {
	ScopeSet::default().with_oidc_reserved()
}

fn random_state() -> String {
	rand::rng().sample_iter(Alphanumeric).take(STATE_LEN).map(char::from).collect()
}
