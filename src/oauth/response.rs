//! Token endpoint payloads extended with OIDC identity metadata.

// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use oauth2::{
	ErrorResponse, ExtraTokenFields, StandardTokenResponse, TokenResponse, basic::BasicTokenType,
};
use serde_json::{Map, Value};
// self
use crate::{
	_prelude::*,
	auth::{IdentityKey, ScopeSet, TokenRecord},
	error::ConfigError,
	identity::{Account, claims},
};

/// Token response carrying `id_token` and `client_info`.
pub type IdentityTokenResponse = StandardTokenResponse<IdentityTokenFields, BasicTokenType>;

/// Non-standard fields read from successful token responses.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityTokenFields {
	/// OIDC ID token (compact JWS).
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id_token: Option<String>,
	/// Base64url JSON `{uid, utid}` returned when `client_info=1` was requested.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub client_info: Option<String>,
}
impl ExtraTokenFields for IdentityTokenFields {}

/// OAuth error body extended with the provider's `suberror` and numeric codes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityErrorResponse {
	/// OAuth `error` code.
	pub error: String,
	/// OAuth `error_description`.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error_description: Option<String>,
	/// OAuth `error_uri`.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error_uri: Option<String>,
	/// Finer-grained reason such as `consent_required`.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub suberror: Option<String>,
	/// Provider-specific numeric codes (e.g. `65001`).
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub error_codes: Vec<u64>,
}
impl Display for IdentityErrorResponse {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match &self.error_description {
			Some(description) => write!(f, "{}: {description}", self.error),
			None => f.write_str(&self.error),
		}
	}
}
impl ErrorResponse for IdentityErrorResponse {}

/// Converts a token response into a [`TokenRecord`] plus the (optional) refresh token.
///
/// `requested` is assumed granted when the response omits `scope`. App-only exchanges pass
/// `user_bound = false` and never carry account metadata.
pub(crate) fn into_record(
	response: IdentityTokenResponse,
	requested: &ScopeSet,
	user_bound: bool,
) -> Result<(TokenRecord, Option<String>)> {
	let expires_in = response.expires_in().ok_or(ConfigError::MissingExpiresIn)?.as_secs();
	let expires_in = i64::try_from(expires_in).map_err(|_| ConfigError::ExpiresInOutOfRange)?;

	if expires_in <= 0 {
		return Err(ConfigError::NonPositiveExpiresIn.into());
	}

	let granted = match response.scopes() {
		Some(scopes) => ScopeSet::new(scopes.iter().map(|scope| scope.as_str()))
			.map_err(ConfigError::from)?,
		None => requested.clone(),
	};
	let extra = response.extra_fields();
	let (account, id_token) = if user_bound {
		(
			account_from_metadata(extra.client_info.as_deref(), extra.id_token.as_deref()),
			extra.id_token.clone(),
		)
	} else {
		(None, None)
	};
	let record = TokenRecord::builder(granted)
		.access_token(response.access_token().secret().to_owned())
		.id_token(id_token)
		.account(account)
		.issued_at(OffsetDateTime::now_utc())
		.expires_in(Duration::seconds(expires_in))
		.build()
		.map_err(ConfigError::from)?;
	let refresh = response.refresh_token().map(|token| token.secret().to_owned());

	Ok((record, refresh))
}

/// Derives the account from `client_info`, falling back to the unverified ID-token payload.
///
/// Malformed metadata is treated as absent.
pub fn account_from_metadata(client_info: Option<&str>, id_token: Option<&str>) -> Option<Account> {
	let id_claims = id_token.and_then(id_token_claims);
	let read = |name| claim(id_claims.as_ref(), name);
	let home_account_id = client_info
		.and_then(decode_json_segment)
		.and_then(|info| {
			let uid = info.get("uid").and_then(Value::as_str)?;
			let utid = info.get("utid").and_then(Value::as_str)?;

			IdentityKey::from_parts(uid, Some(utid)).ok()
		})
		.or_else(|| {
			let object = read("oid").or_else(|| read("sub"))?;

			IdentityKey::from_parts(object, read(claims::TENANT_ID)).ok()
		})?;

	Some(Account {
		home_account_id,
		username: read(claims::PREFERRED_USERNAME).map(str::to_owned),
		tenant_id: read(claims::TENANT_ID).map(str::to_owned),
	})
}

/// Decodes the payload segment of a compact JWS without verifying it.
pub fn id_token_claims(id_token: &str) -> Option<Map<String, Value>> {
	let mut segments = id_token.split('.');
	let _header = segments.next()?;

	decode_json_segment(segments.next()?)
}

fn claim<'a>(claims: Option<&'a Map<String, Value>>, name: &str) -> Option<&'a str> {
	claims?.get(name).and_then(Value::as_str)
}

fn decode_json_segment(segment: &str) -> Option<Map<String, Value>> {
	let bytes = URL_SAFE_NO_PAD.decode(segment.trim_end_matches('=')).ok()?;

	match serde_json::from_slice(&bytes).ok()? {
		Value::Object(map) => Some(map),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;

	fn encode(value: Value) -> String {
		URL_SAFE_NO_PAD.encode(value.to_string())
	}

	#[test]
	fn client_info_wins_over_id_token_subject() {
		let client_info = encode(json!({ "uid": "u-1", "utid": "t-1" }));
		let id_token = format!(
			"e30.{}.sig",
			encode(json!({ "oid": "o-9", "tid": "t-1", "preferred_username": "ada@example.com" }))
		);
		let account = account_from_metadata(Some(&client_info), Some(&id_token))
			.expect("Account should be derived.");

		assert_eq!(account.home_account_id.as_ref(), "u-1.t-1");
		assert_eq!(account.username.as_deref(), Some("ada@example.com"));
		assert_eq!(account.tenant_id.as_deref(), Some("t-1"));

		let fallback =
			account_from_metadata(None, Some(&id_token)).expect("ID token should suffice.");

		assert_eq!(fallback.home_account_id.as_ref(), "o-9.t-1");
	}

	#[test]
	fn malformed_metadata_is_ignored() {
		assert!(account_from_metadata(Some("%%%"), None).is_none());
		assert!(account_from_metadata(None, Some("only-one-segment")).is_none());
		assert!(account_from_metadata(Some(&encode(json!({ "uid": "u" }))), None).is_none());
		assert!(
			account_from_metadata(Some(&encode(json!({ "uid": "u.x", "utid": "t" }))), None)
				.is_none(),
			"Dotted segments would make the home-account key ambiguous."
		);
		assert!(account_from_metadata(Some(&encode(json!(["array"]))), None).is_none());
	}

	#[test]
	fn error_body_keeps_suberror() {
		let body = r#"{"error":"invalid_grant","error_description":"AADSTS65001: consent","suberror":"consent_required","error_codes":[65001]}"#;
		let parsed: IdentityErrorResponse =
			serde_json::from_str(body).expect("Error body should deserialize.");

		assert_eq!(parsed.suberror.as_deref(), Some("consent_required"));
		assert_eq!(parsed.error_codes, vec![65001]);
		assert_eq!(parsed.to_string(), "invalid_grant: AADSTS65001: consent");
	}
}
