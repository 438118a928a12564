mod common;

// std
use std::{
	error::Error as StdError,
	fmt::{Display, Formatter, Result as FmtResult},
	future::Future,
	pin::Pin,
	sync::{Arc, Mutex},
};
// self
use common::{CLIENT_ID, CLIENT_SECRET, options, scopes};
use oidc_token_provider::{
	auth::ProviderId,
	error::{ConfigError, Error, TransientError, TransportError},
	flows::TokenProvider,
	http::{ResponseMetadata, ResponseMetadataSlot, TokenHttpClient},
	oauth::{
		OAuth2ClientFactory, TransportErrorMapper,
		oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse},
	},
	provider::{
		ClientAuthMethod, DefaultProviderStrategy, GrantType, ProviderDescriptor, ProviderStrategy,
	},
	store::MemoryStore,
	url::Url,
};
use time::Duration;

#[derive(Debug)]
enum FakeTransportError {
	Throttled,
}
impl Display for FakeTransportError {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Throttled => write!(f, "Transport throttled."),
		}
	}
}
impl StdError for FakeTransportError {}

#[derive(Clone, Copy)]
struct ThrottledHttpClient {
	retry_after: Duration,
}
impl TokenHttpClient for ThrottledHttpClient {
	type Handle = ThrottledHandle;
	type TransportError = FakeTransportError;

	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle {
		ThrottledHandle { slot, retry_after: self.retry_after }
	}
}

struct ThrottledHandle {
	slot: ResponseMetadataSlot,
	retry_after: Duration,
}
impl<'a> AsyncHttpClient<'a> for ThrottledHandle {
	type Error = HttpClientError<FakeTransportError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'a + Send + Sync>>;

	fn call(&'a self, request: HttpRequest) -> Self::Future {
		let slot = self.slot.clone();
		let retry_after = self.retry_after;
		let body = String::from_utf8_lossy(request.body()).into_owned();

		Box::pin(async move {
			assert!(slot.take().is_none(), "Each exchange must start with an empty slot.");
			assert!(body.contains("grant_type=client_credentials"));
			assert!(!body.contains("client_info"), "App-only requests carry no client_info.");

			slot.store(ResponseMetadata { status: Some(429), retry_after: Some(retry_after) });

			Err(HttpClientError::Reqwest(Box::new(FakeTransportError::Throttled)))
		})
	}
}

#[derive(Clone, Default)]
struct RecordingTransportErrorMapper {
	metadata: Arc<Mutex<Vec<(GrantType, Option<ResponseMetadata>)>>>,
}
impl RecordingTransportErrorMapper {
	fn recorded(&self) -> Vec<(GrantType, Option<ResponseMetadata>)> {
		self.metadata.lock().expect("Recording mutex should not be poisoned.").clone()
	}
}
impl TransportErrorMapper<FakeTransportError> for RecordingTransportErrorMapper {
	fn map_transport_error(
		&self,
		_strategy: &dyn ProviderStrategy,
		grant: GrantType,
		meta: Option<&ResponseMetadata>,
		err: HttpClientError<FakeTransportError>,
	) -> Error {
		let status = meta.and_then(|value| value.status);
		let retry_after = meta.and_then(|value| value.retry_after);

		self.metadata
			.lock()
			.expect("Recording mutex should not be poisoned.")
			.push((grant, meta.cloned()));

		match err {
			HttpClientError::Reqwest(inner) => TransientError::TokenEndpoint {
				message: format!("Fake transport error: {inner}"),
				status,
				retry_after,
			}
			.into(),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => TransportError::Io(inner).into(),
			other => TransientError::TokenEndpoint {
				message: format!("Unexpected fake transport failure: {other:?}"),
				status,
				retry_after,
			}
			.into(),
		}
	}
}

type ThrottledProvider = TokenProvider<
	OAuth2ClientFactory<ThrottledHttpClient, RecordingTransportErrorMapper>,
>;

fn throttled_provider(
	retry_after: Duration,
	mapper: RecordingTransportErrorMapper,
) -> (ThrottledProvider, MemoryStore) {
	let provider_id =
		ProviderId::new("throttled-identity").expect("Provider identifier should be valid.");
	let descriptor = ProviderDescriptor::builder(provider_id)
		.authorization_endpoint(
			Url::parse("https://login.example.com/contoso/oauth2/v2.0/authorize")
				.expect("Authorization endpoint fixture should parse."),
		)
		.token_endpoint(
			Url::parse("https://login.example.com/contoso/oauth2/v2.0/token")
				.expect("Token endpoint fixture should parse."),
		)
		.support_grant(GrantType::ClientCredentials)
		.preferred_client_auth_method(ClientAuthMethod::ClientSecretPost)
		.build()
		.expect("Descriptor fixture should build.");
	let factory = OAuth2ClientFactory::with_http_client(
		descriptor,
		Arc::new(DefaultProviderStrategy),
		CLIENT_ID,
		CLIENT_SECRET,
		ThrottledHttpClient { retry_after },
		mapper,
	);
	let store = MemoryStore::default();
	let provider = TokenProvider::with_client_factory(options(), factory, Arc::new(store.clone()))
		.expect("Token provider should build from valid options.");

	(provider, store)
}

#[tokio::test]
async fn throttled_exchanges_surface_status_and_retry_hint() {
	let mapper = RecordingTransportErrorMapper::default();
	let (provider, store) = throttled_provider(Duration::seconds(5), mapper.clone());
	let err = provider
		.acquire_token_for_application(&scopes(&["{sql}.default"]))
		.await
		.expect_err("The fake transport always throttles.");

	match err {
		Error::Transient(TransientError::TokenEndpoint { status, retry_after, .. }) => {
			assert_eq!(status, Some(429));
			assert_eq!(retry_after, Some(Duration::seconds(5)));
		},
		other => panic!("Unexpected error variant: {other:?}."),
	}

	assert!(store.is_empty(), "Failed exchanges must not write the app cache.");
	assert_eq!(provider.metrics().failures(), 1);
}

#[tokio::test]
async fn mapper_sees_each_exchange_metadata_once() {
	let mapper = RecordingTransportErrorMapper::default();
	let (provider, _store) = throttled_provider(Duration::seconds(30), mapper.clone());

	for _ in 0..2 {
		let _ = provider
			.acquire_token_for_application(&scopes(&["{sql}.default"]))
			.await
			.expect_err("The fake transport always throttles.");
	}

	let observed = mapper.recorded();

	assert_eq!(observed.len(), 2, "Every exchange reaches the mapper exactly once.");

	for (grant, meta) in observed {
		let meta = meta.expect("Response metadata should be captured for every exchange.");

		assert_eq!(grant, GrantType::ClientCredentials);
		assert_eq!(meta.status, Some(429));
		assert_eq!(meta.retry_after, Some(Duration::seconds(30)));
	}
}
