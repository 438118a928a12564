//! Fixtures shared by the integration tests.

#![allow(dead_code)]

// std
use std::sync::Arc;
// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use httpmock::MockServer;
use serde_json::{Value, json};
// self
use oidc_token_provider::{
	auth::{IdentityKey, ProviderId, ScopeSet},
	config::{RequestContext, TokenProviderOptions},
	flows::TokenProvider,
	http::ReqwestHttpClient,
	identity::{IdentityClaims, Principal},
	oauth::{OAuth2ClientFactory, ReqwestClientFactory, ReqwestTransportErrorMapper},
	provider::{
		ClientAuthMethod, DefaultProviderStrategy, GrantType, ProviderDescriptor, ProviderQuirks,
	},
	reqwest::Client as ReqwestClient,
	store::MemoryStore,
	url::Url,
};

pub const CLIENT_ID: &str = "web-client";
pub const CLIENT_SECRET: &str = "web-secret";
pub const TENANT_ID: &str = "contoso-tenant";
pub const SQL_SCOPE: &str = "https://database.example.net/user_impersonation";
pub const USER_KEY: &str = "user-oid.contoso-tenant";

pub type TestProvider = TokenProvider<ReqwestClientFactory>;

/// Builds a reqwest client that accepts the self-signed certificates produced by `httpmock`.
///
/// Like the default transport, it never follows redirects.
pub fn insecure_http_client() -> ReqwestHttpClient {
	let client = ReqwestClient::builder()
		.redirect(oidc_token_provider::reqwest::redirect::Policy::none())
		.danger_accept_invalid_certs(true)
		.danger_accept_invalid_hostnames(true)
		.build()
		.expect("Failed to build insecure Reqwest client for tests.");

	ReqwestHttpClient::with_client(client)
}

pub fn descriptor(server: &MockServer) -> ProviderDescriptor {
	let provider_id =
		ProviderId::new("mock-identity").expect("Provider identifier should be valid for tests.");

	ProviderDescriptor::builder(provider_id)
		.authorization_endpoint(
			Url::parse(&server.url("/authorize"))
				.expect("Mock authorization endpoint should parse successfully."),
		)
		.token_endpoint(
			Url::parse(&server.url("/token"))
				.expect("Mock token endpoint should parse successfully."),
		)
		.support_grants([
			GrantType::AuthorizationCode,
			GrantType::RefreshToken,
			GrantType::ClientCredentials,
		])
		.preferred_client_auth_method(ClientAuthMethod::ClientSecretPost)
		.quirks(ProviderQuirks { request_client_info: true, ..ProviderQuirks::default() })
		.build()
		.expect("Provider descriptor should build successfully.")
}

pub fn options() -> TokenProviderOptions {
	TokenProviderOptions::new(CLIENT_ID, CLIENT_SECRET, TENANT_ID)
		.with_callback_path("/signin-oidc")
		.with_scope_mapping("{sql}", "https://database.example.net/")
}

/// Provider over an in-memory store; the store handle is returned for assertions.
pub fn provider(server: &MockServer) -> (TestProvider, MemoryStore) {
	let store = MemoryStore::default();
	let factory = OAuth2ClientFactory::with_http_client(
		descriptor(server),
		Arc::new(DefaultProviderStrategy),
		CLIENT_ID,
		CLIENT_SECRET,
		insecure_http_client(),
		ReqwestTransportErrorMapper,
	);
	let provider = TokenProvider::with_client_factory(options(), factory, Arc::new(store.clone()))
		.expect("Token provider should build from valid options.");

	(provider, store)
}

pub fn request_context() -> RequestContext {
	RequestContext::new("https", "app.example.com")
}

pub fn scopes(values: &[&str]) -> ScopeSet {
	ScopeSet::new(values.iter().copied()).expect("Scope fixture should be valid.")
}

pub fn user_key() -> IdentityKey {
	IdentityKey::new(USER_KEY).expect("Identity key fixture should be valid.")
}

pub fn principal() -> Principal {
	Principal::authenticated(IdentityClaims::new(
		Some(user_key()),
		Some("ada@contoso.example".into()),
		Some(TENANT_ID.into()),
	))
}

/// `client_info` value identifying [`USER_KEY`].
pub fn client_info() -> String {
	URL_SAFE_NO_PAD.encode(json!({ "uid": "user-oid", "utid": TENANT_ID }).to_string())
}

/// Unsigned ID token carrying the username and tenant claims.
pub fn id_token() -> String {
	let header = URL_SAFE_NO_PAD.encode(json!({ "alg": "none" }).to_string());
	let payload = URL_SAFE_NO_PAD.encode(
		json!({ "oid": "user-oid", "tid": TENANT_ID, "preferred_username": "ada@contoso.example" })
			.to_string(),
	);

	format!("{header}.{payload}.")
}

/// JSON body of a user-delegated token response.
pub fn user_token_body(
	access_token: &str,
	scope: &str,
	expires_in: u64,
	refresh: Option<&str>,
) -> String {
	let mut body = json!({
		"access_token": access_token,
		"token_type": "Bearer",
		"expires_in": expires_in,
		"scope": scope,
		"id_token": id_token(),
		"client_info": client_info(),
	});

	if let (Some(refresh), Value::Object(map)) = (refresh, &mut body) {
		map.insert("refresh_token".into(), Value::String(refresh.into()));
	}

	body.to_string()
}

/// JSON error body as returned by the token endpoint.
pub fn error_body(error: &str, description: &str, suberror: Option<&str>) -> String {
	let mut body = json!({ "error": error, "error_description": description });

	if let (Some(suberror), Value::Object(map)) = (suberror, &mut body) {
		map.insert("suberror".into(), Value::String(suberror.into()));
	}

	body.to_string()
}
