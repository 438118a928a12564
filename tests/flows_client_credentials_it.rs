mod common;

// std
use std::sync::Arc;
// crates.io
use httpmock::prelude::*;
// self
use common::*;
use oidc_token_provider::{
	config::TokenProviderOptions,
	error::{ConfigError, Error},
	flows::TokenProvider,
	store::{CacheKey, MemoryStore},
};

const APP_SCOPE: &str = "https://graph.example.net/.default";

#[tokio::test]
async fn app_tokens_are_cached_across_calls() {
	let server = MockServer::start_async().await;
	let (provider, store) = provider(&server);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/token")
				.body_includes("grant_type=client_credentials")
				.body_includes("client_id=web-client")
				.body_includes("client_secret=web-secret");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"app-token\",\"token_type\":\"bearer\",\"expires_in\":1800}",
			);
		})
		.await;
	let requested = scopes(&[APP_SCOPE]);
	let first = provider
		.acquire_token_for_application(&requested)
		.await
		.expect("Initial client_credentials request should succeed.");
	let second = provider
		.acquire_token_for_application(&requested)
		.await
		.expect("Cached client_credentials request should succeed.");

	assert_eq!(first.access_token.expose(), "app-token");
	assert_eq!(second.access_token.expose(), "app-token");
	assert!(first.account.is_none(), "App-only tokens carry no account.");
	assert_eq!(first.scope, requested, "Omitted scope echoes the requested scopes.");

	mock.assert_calls_async(1).await;

	assert!(store.contains(&CacheKey::Application));
	assert_eq!(store.len(), 1);
	assert_eq!(provider.metrics().attempts(), 2);
	assert_eq!(provider.metrics().successes(), 2);
}

#[tokio::test]
async fn app_tokens_do_not_request_client_info() {
	let server = MockServer::start_async().await;
	let (provider, _store) = provider(&server);
	let with_client_info = server
		.mock_async(|when, then| {
			when.method(POST).path("/token").body_includes("client_info");
			then.status(500);
		})
		.await;
	let plain = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"app-token\",\"token_type\":\"bearer\",\"expires_in\":1800}",
			);
		})
		.await;

	provider
		.acquire_token_for_application(&scopes(&[APP_SCOPE]))
		.await
		.expect("Client credentials request should succeed.");

	with_client_info.assert_calls_async(0).await;
	plain.assert_calls_async(1).await;
}

#[tokio::test]
async fn partial_app_grants_are_reported_as_missing_scopes() {
	let server = MockServer::start_async().await;
	let (provider, _store) = provider(&server);
	let _mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"narrow\",\"token_type\":\"bearer\",\"expires_in\":1800,\"scope\":\"https://graph.example.net/.default\"}",
			);
		})
		.await;
	let err = provider
		.acquire_token_for_application(&scopes(&[APP_SCOPE, "https://vault.example.net/.default"]))
		.await
		.expect_err("Partial grants must fail scope validation.");

	match err {
		Error::ScopeNotGranted { missing } =>
			assert_eq!(missing, vec!["https://vault.example.net/.default".to_string()]),
		other => panic!("Unexpected error variant: {other:?}."),
	}
}

#[tokio::test]
async fn rejected_client_credentials_surface_invalid_client() {
	let server = MockServer::start_async().await;
	let (provider, store) = provider(&server);
	let _mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(401).header("content-type", "application/json").body(error_body(
				"invalid_client",
				"AADSTS7000215: Invalid client secret provided.",
				None,
			));
		})
		.await;
	let err = provider
		.acquire_token_for_application(&scopes(&[APP_SCOPE]))
		.await
		.expect_err("Invalid client secrets must be rejected.");

	assert!(matches!(err, Error::InvalidClient { .. }));
	assert!(store.is_empty(), "Failed exchanges never reach after-access.");
	assert_eq!(provider.metrics().failures(), 1);
}

#[tokio::test]
async fn malformed_scope_mappings_fail_before_any_flow() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(500);
		})
		.await;
	let options = TokenProviderOptions::new(CLIENT_ID, CLIENT_SECRET, TENANT_ID)
		.with_scope_mapping("{sql}", "https://database.example.net/ x");
	let err = TokenProvider::new(options, descriptor(&server), Arc::new(MemoryStore::default()))
		.expect_err("Mapping values with whitespace are a configuration error.");

	assert!(matches!(
		err,
		Error::Config(ConfigError::InvalidScopeMapping { index: 0, reason: "value contains whitespace" })
	));

	mock.assert_calls_async(0).await;
}
