//! [`ConfidentialClient`] backed by the `oauth2` crate and a [`TokenHttpClient`] transport.
//!
//! Every operation follows the same cache cycle: `before_access` loads the bound cache,
//! the handle serves from it or performs one token exchange, mutates its in-memory
//! [`TokenCache`], then calls `before_write` (when changed) and `after_access`. A failed
//! exchange skips `after_access`; dropping the handle releases the binding instead.

pub mod response;

pub use oauth2;
pub use response::*;

// crates.io
use oauth2::{
	AuthType, AuthUrl, AuthorizationCode, ClientId, ClientSecret, EndpointNotSet, EndpointSet,
	HttpClientError, RedirectUrl, RefreshToken, RequestTokenError, Scope, StandardRevocableToken,
	TokenUrl,
	basic::{BasicRevocationErrorResponse, BasicTokenIntrospectionResponse},
};
// self
use crate::{
	_prelude::*,
	auth::{IdentityKey, ScopeSet, TokenRecord},
	cache::{CacheNotification, TokenCacheAccess},
	client::{CacheBindings, ClientFactory, ClientFuture, ConfidentialClient, TokenCache},
	error::{ConfigError, TransientError, TransportError},
	http::{ResponseMetadata, ResponseMetadataSlot, TokenHttpClient},
	identity::Account,
	provider::{
		ClientAuthMethod, GrantType, ProviderDescriptor, ProviderErrorContext, ProviderErrorKind,
		ProviderStrategy,
	},
	store::CacheBlob,
};
#[cfg(feature = "reqwest")]
use crate::{http::ReqwestHttpClient, provider::DefaultProviderStrategy};

type ConfiguredClient = oauth2::Client<
	IdentityErrorResponse,
	IdentityTokenResponse,
	BasicTokenIntrospectionResponse,
	StandardRevocableToken,
	BasicRevocationErrorResponse,
	EndpointSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointSet,
>;
type IdentityRequestTokenError<E> = RequestTokenError<HttpClientError<E>, IdentityErrorResponse>;

/// Factory specialized for the crate's default reqwest transport.
#[cfg(feature = "reqwest")]
pub type ReqwestClientFactory = OAuth2ClientFactory<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Maps HTTP transport failures into crate [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport.
	fn map_transport_error(
		&self,
		strategy: &dyn ProviderStrategy,
		grant: GrantType,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<E>,
	) -> Error;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		strategy: &dyn ProviderStrategy,
		grant: GrantType,
		meta: Option<&ResponseMetadata>,
		err: HttpClientError<ReqwestError>,
	) -> Error {
		match err {
			HttpClientError::Reqwest(inner) => map_reqwest_error(strategy, grant, meta, *inner),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => TransportError::Io(inner).into(),
			HttpClientError::Other(message) =>
				transient(meta, format!("HTTP client error: {message}")),
			_ => transient(meta, "HTTP client error".into()),
		}
	}
}

/// Builds [`OAuth2Client`] handles for one provider registration.
pub struct OAuth2ClientFactory<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	descriptor: Arc<ProviderDescriptor>,
	strategy: Arc<dyn ProviderStrategy>,
	client_id: String,
	client_secret: String,
	http_client: Arc<C>,
	transport_mapper: Arc<M>,
}
impl<C, M> OAuth2ClientFactory<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a factory that reuses the caller's transport and mapper.
	pub fn with_http_client(
		descriptor: ProviderDescriptor,
		strategy: Arc<dyn ProviderStrategy>,
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		Self {
			descriptor: Arc::new(descriptor),
			strategy,
			client_id: client_id.into(),
			client_secret: client_secret.into(),
			http_client: http_client.into(),
			transport_mapper: mapper.into(),
		}
	}

	/// Provider descriptor used by built handles.
	pub fn descriptor(&self) -> &ProviderDescriptor {
		&self.descriptor
	}

	fn configured_client(&self, redirect_uri: Option<&Url>) -> Result<ConfiguredClient> {
		let auth_url = AuthUrl::new(self.descriptor.endpoints.authorization.to_string())
			.map_err(|source| ConfigError::InvalidDescriptor { source })?;
		let token_url = TokenUrl::new(self.descriptor.endpoints.token.to_string())
			.map_err(|source| ConfigError::InvalidDescriptor { source })?;
		let mut client: ConfiguredClient = oauth2::Client::<
			IdentityErrorResponse,
			IdentityTokenResponse,
			BasicTokenIntrospectionResponse,
			StandardRevocableToken,
			BasicRevocationErrorResponse,
		>::new(ClientId::new(self.client_id.clone()))
			.set_auth_uri(auth_url)
			.set_token_uri(token_url)
			.set_client_secret(ClientSecret::new(self.client_secret.clone()));

		if let Some(redirect) = redirect_uri {
			let redirect = RedirectUrl::new(redirect.to_string())
				.map_err(|source| ConfigError::InvalidRedirect { source })?;

			client = client.set_redirect_uri(redirect);
		}
		if self.descriptor.preferred_client_auth_method == ClientAuthMethod::ClientSecretPost {
			client = client.set_auth_type(AuthType::RequestBody);
		}

		Ok(client)
	}
}
#[cfg(feature = "reqwest")]
impl OAuth2ClientFactory<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a factory with its own reqwest transport and the default strategy.
	///
	/// The transport never follows redirects, so client credentials only reach the
	/// descriptor's token endpoint.
	pub fn new(
		descriptor: ProviderDescriptor,
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
	) -> Result<Self, ConfigError> {
		Ok(Self::with_http_client(
			descriptor,
			Arc::new(DefaultProviderStrategy),
			client_id,
			client_secret,
			ReqwestHttpClient::without_redirects()?,
			ReqwestTransportErrorMapper,
		))
	}
}
impl<C, M> ClientFactory for OAuth2ClientFactory<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	type Client = OAuth2Client<C, M>;

	fn build(&self, redirect_uri: Option<&Url>, caches: CacheBindings) -> Result<Self::Client> {
		Ok(OAuth2Client {
			oauth_client: self.configured_client(redirect_uri)?,
			descriptor: self.descriptor.clone(),
			strategy: self.strategy.clone(),
			http_client: self.http_client.clone(),
			transport_mapper: self.transport_mapper.clone(),
			has_redirect: redirect_uri.is_some(),
			caches,
		})
	}
}
impl<C, M> Debug for OAuth2ClientFactory<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OAuth2ClientFactory")
			.field("descriptor", &self.descriptor.id)
			.field("client_id", &self.client_id)
			.field("client_secret", &"<redacted>")
			.finish()
	}
}

/// Single-call confidential client handle.
pub struct OAuth2Client<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	oauth_client: ConfiguredClient,
	descriptor: Arc<ProviderDescriptor>,
	strategy: Arc<dyn ProviderStrategy>,
	http_client: Arc<C>,
	transport_mapper: Arc<M>,
	has_redirect: bool,
	caches: CacheBindings,
}
impl<C, M> OAuth2Client<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn ensure_grant(&self, grant: GrantType) -> Result<()> {
		if self.descriptor.supports(grant) {
			Ok(())
		} else {
			Err(ConfigError::UnsupportedGrant {
				descriptor: self.descriptor.id.to_string(),
				grant: grant.as_str(),
			}
			.into())
		}
	}

	fn extra_params(&self, grant: GrantType) -> Vec<(String, String)> {
		let mut form = BTreeMap::new();

		if self.descriptor.quirks.request_client_info && grant != GrantType::ClientCredentials {
			form.insert("client_info".to_owned(), "1".to_owned());
		}

		self.strategy.augment_token_request(grant, &mut form);

		form.into_iter().filter(|(key, _)| key != "grant_type" && key != "scope").collect()
	}

	fn scope_param(&self, scopes: &ScopeSet) -> Option<String> {
		if scopes.is_empty() {
			return None;
		}

		let delimiter = self.descriptor.quirks.scope_delimiter.to_string();

		Some(scopes.iter().collect::<Vec<_>>().join(&delimiter))
	}

	async fn load(
		&self,
		hooks: Option<&dyn TokenCacheAccess>,
		args: &CacheNotification,
	) -> Result<TokenCache> {
		let blob = match hooks {
			Some(hooks) => hooks.before_access(args).await?,
			None => None,
		};

		TokenCache::from_blob(blob.as_ref())
	}

	async fn commit(
		&self,
		hooks: Option<&dyn TokenCacheAccess>,
		args: &CacheNotification,
		cache: &TokenCache,
	) -> Result<()> {
		let Some(hooks) = hooks else {
			return Ok(());
		};
		let blob = if args.has_state_changed {
			hooks.before_write(args).await?;

			cache.to_blob()?
		} else {
			CacheBlob::default()
		};

		hooks.after_access(args, blob).await
	}

	async fn exchange_code(&self, code: &str, scopes: &ScopeSet) -> Result<IdentityTokenResponse> {
		let grant = GrantType::AuthorizationCode;
		let meta = ResponseMetadataSlot::default();
		let handle = self.http_client.with_metadata(meta.clone());
		let mut request = self.oauth_client.exchange_code(AuthorizationCode::new(code.to_owned()));

		if let Some(scope) = self.scope_param(scopes) {
			request = request.add_extra_param("scope", scope);
		}
		for (key, value) in self.extra_params(grant) {
			request = request.add_extra_param(key, value);
		}

		request
			.request_async(&handle)
			.await
			.map_err(|err| self.map_request_error(grant, meta.take(), err))
	}

	async fn exchange_client_credentials(
		&self,
		scopes: &ScopeSet,
	) -> Result<IdentityTokenResponse> {
		let grant = GrantType::ClientCredentials;
		let meta = ResponseMetadataSlot::default();
		let handle = self.http_client.with_metadata(meta.clone());
		let mut request = self.oauth_client.exchange_client_credentials();

		for scope in scopes.iter() {
			request = request.add_scope(Scope::new(scope.to_owned()));
		}
		for (key, value) in self.extra_params(grant) {
			request = request.add_extra_param(key, value);
		}

		request
			.request_async(&handle)
			.await
			.map_err(|err| self.map_request_error(grant, meta.take(), err))
	}

	async fn exchange_refresh(
		&self,
		refresh_token: &str,
		scopes: &ScopeSet,
	) -> Result<IdentityTokenResponse> {
		let grant = GrantType::RefreshToken;
		let meta = ResponseMetadataSlot::default();
		let handle = self.http_client.with_metadata(meta.clone());
		let refresh_token = RefreshToken::new(refresh_token.to_owned());
		let mut request = self.oauth_client.exchange_refresh_token(&refresh_token);

		for scope in scopes.iter() {
			request = request.add_scope(Scope::new(scope.to_owned()));
		}
		for (key, value) in self.extra_params(grant) {
			request = request.add_extra_param(key, value);
		}

		request
			.request_async(&handle)
			.await
			.map_err(|err| self.map_request_error(grant, meta.take(), err))
	}

	fn map_request_error(
		&self,
		grant: GrantType,
		meta: Option<ResponseMetadata>,
		err: IdentityRequestTokenError<C::TransportError>,
	) -> Error {
		let meta = meta.as_ref();

		match err {
			RequestTokenError::ServerResponse(response) =>
				map_server_response_error(self.strategy.as_ref(), grant, response, meta),
			RequestTokenError::Request(error) => self.transport_mapper.map_transport_error(
				self.strategy.as_ref(),
				grant,
				meta,
				error,
			),
			RequestTokenError::Parse(source, _body) =>
				TransientError::TokenResponseParse { source, status: meta_status(meta) }.into(),
			RequestTokenError::Other(message) =>
				transient(meta, format!("Unexpected token endpoint response: {message}")),
		}
	}

	async fn redeem(&self, code: &str, scopes: &ScopeSet) -> Result<TokenRecord> {
		self.ensure_grant(GrantType::AuthorizationCode)?;

		if !self.has_redirect {
			return Err(ConfigError::InvalidRequestContext {
				reason: "a redirect URI is required to redeem an authorization code".into(),
			}
			.into());
		}

		let hooks = self.caches.user.as_deref();
		let mut cache = self.load(hooks, &CacheNotification::read(None)).await?;
		let requested = scopes.with_oidc_reserved();
		let response = self.exchange_code(code, &requested).await?;
		let (record, refresh) = response::into_record(response, &requested, true)?;

		cache.store(&record, refresh);

		let account = record.account.as_ref().map(|account| account.home_account_id.clone());

		self.commit(hooks, &CacheNotification::changed(account), &cache).await?;

		Ok(record)
	}

	async fn client_credentials(&self, scopes: &ScopeSet) -> Result<TokenRecord> {
		self.ensure_grant(GrantType::ClientCredentials)?;

		let hooks = self.caches.app.as_deref();
		let unchanged = CacheNotification::read(None);
		let mut cache = self.load(hooks, &unchanged).await?;

		if let Some(record) = cache.find_access_token(None, scopes, OffsetDateTime::now_utc())? {
			self.commit(hooks, &unchanged, &cache).await?;

			return Ok(record);
		}

		let response = self.exchange_client_credentials(scopes).await?;
		let (record, _) = response::into_record(response, scopes, false)?;

		cache.store(&record, None);
		self.commit(hooks, &CacheNotification::changed(None), &cache).await?;

		Ok(record)
	}

	async fn silent(&self, scopes: &ScopeSet, account: Option<&Account>) -> Result<TokenRecord> {
		let account = account.ok_or(Error::AccountNotFound)?;
		let key = account.home_account_id.clone();
		let hooks = self.caches.user.as_deref();
		let unchanged = CacheNotification::read(Some(key.clone()));
		let mut cache = self.load(hooks, &unchanged).await?;

		if let Some(record) =
			cache.find_access_token(Some(&key), scopes, OffsetDateTime::now_utc())?
		{
			self.commit(hooks, &unchanged, &cache).await?;

			return Ok(record);
		}

		let Some(refresh_token) = cache.refresh_token(&key).map(str::to_owned) else {
			self.commit(hooks, &unchanged, &cache).await?;

			return Err(Error::NoTokensFound);
		};

		self.ensure_grant(GrantType::RefreshToken)?;

		let requested = scopes.with_oidc_reserved();
		let response = self.exchange_refresh(&refresh_token, &requested).await?;
		let (mut record, rotated) = response::into_record(response, &requested, true)?;

		// Refresh responses may omit identity metadata; the token still belongs to `account`.
		if record.account.is_none() {
			record.account = Some(account.to_owned());
		}

		cache.store(&record, rotated);

		let changed = CacheNotification::changed(
			record.account.as_ref().map(|account| account.home_account_id.clone()),
		);

		self.commit(hooks, &changed, &cache).await?;

		Ok(record)
	}

	async fn lookup_account(&self, key: &IdentityKey) -> Result<Option<Account>> {
		let hooks = self.caches.user.as_deref();
		let args = CacheNotification::read(Some(key.to_owned()));
		let cache = self.load(hooks, &args).await?;
		let account = cache.account(key).cloned();

		self.commit(hooks, &args, &cache).await?;

		Ok(account)
	}

	async fn forget_account(&self, account: &Account) -> Result<()> {
		let key = account.home_account_id.clone();
		let hooks = self.caches.user.as_deref();
		let mut cache = self.load(hooks, &CacheNotification::read(Some(key.clone()))).await?;
		let args = CacheNotification {
			account: Some(key.clone()),
			has_state_changed: cache.remove_account(&key),
		};

		self.commit(hooks, &args, &cache).await
	}
}
impl<C, M> ConfidentialClient for OAuth2Client<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn redeem_authorization_code<'a>(
		&'a self,
		code: &'a str,
		scopes: &'a ScopeSet,
	) -> ClientFuture<'a, TokenRecord> {
		Box::pin(self.redeem(code, scopes))
	}

	fn acquire_token_for_client<'a>(
		&'a self,
		scopes: &'a ScopeSet,
	) -> ClientFuture<'a, TokenRecord> {
		Box::pin(self.client_credentials(scopes))
	}

	fn acquire_token_silent<'a>(
		&'a self,
		scopes: &'a ScopeSet,
		account: Option<&'a Account>,
	) -> ClientFuture<'a, TokenRecord> {
		Box::pin(self.silent(scopes, account))
	}

	fn get_account<'a>(&'a self, key: &'a IdentityKey) -> ClientFuture<'a, Option<Account>> {
		Box::pin(self.lookup_account(key))
	}

	fn remove_account<'a>(&'a self, account: &'a Account) -> ClientFuture<'a, ()> {
		Box::pin(self.forget_account(account))
	}
}
impl<C, M> Debug for OAuth2Client<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OAuth2Client")
			.field("descriptor", &self.descriptor.id)
			.field("caches", &self.caches)
			.finish()
	}
}

fn map_server_response_error(
	strategy: &dyn ProviderStrategy,
	grant: GrantType,
	response: IdentityErrorResponse,
	meta: Option<&ResponseMetadata>,
) -> Error {
	let mut ctx = ProviderErrorContext::new(grant).with_oauth_error(response.error.clone());

	if let Some(description) = response.error_description.as_ref() {
		ctx = ctx.with_error_description(description.clone());
	}
	if let Some(suberror) = response.suberror.as_ref() {
		ctx = ctx.with_suberror(suberror.clone());
	}
	if let Some(status) = meta_status(meta) {
		ctx = ctx.with_http_status(status);
	}

	let reason = response.to_string();

	match strategy.classify_token_error(&ctx) {
		ProviderErrorKind::InvalidGrant => {
			let suberror = response.suberror.or_else(|| {
				let consent = response.error.eq_ignore_ascii_case("consent_required");

				consent.then(|| response.error.clone())
			});

			Error::InvalidGrant { reason, suberror }
		},
		ProviderErrorKind::InvalidClient => Error::InvalidClient { reason },
		ProviderErrorKind::InsufficientScope => Error::InsufficientScope { reason },
		ProviderErrorKind::Transient => transient(meta, reason),
	}
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(
	strategy: &dyn ProviderStrategy,
	grant: GrantType,
	meta: Option<&ResponseMetadata>,
	err: ReqwestError,
) -> Error {
	if err.is_builder() {
		return ConfigError::from(err).into();
	}
	if err.is_timeout() || err.is_connect() {
		let ctx = ProviderErrorContext::network_failure(grant);

		if strategy.classify_token_error(&ctx) == ProviderErrorKind::Transient {
			return TransientError::TokenEndpoint {
				message: "Token endpoint could not be reached in time".into(),
				status: meta_status(meta).or_else(|| err.status().map(|code| code.as_u16())),
				retry_after: meta_retry_after(meta),
			}
			.into();
		}
	}

	TransportError::from(err).into()
}

fn transient(meta: Option<&ResponseMetadata>, message: String) -> Error {
	TransientError::TokenEndpoint {
		message,
		status: meta_status(meta),
		retry_after: meta_retry_after(meta),
	}
	.into()
}

fn meta_status(meta: Option<&ResponseMetadata>) -> Option<u16> {
	meta.and_then(|value| value.status)
}

fn meta_retry_after(meta: Option<&ResponseMetadata>) -> Option<Duration> {
	meta.and_then(|value| value.retry_after)
}

#[cfg(all(test, feature = "reqwest"))]
mod tests {
	// self
	use super::*;
	use crate::{auth::ProviderId, provider::DefaultProviderStrategy};

	fn factory(method: ClientAuthMethod) -> ReqwestClientFactory {
		let descriptor = ProviderDescriptor::builder(
			ProviderId::new("unit").expect("Provider id fixture should be valid."),
		)
		.authorization_endpoint(
			Url::parse("https://login.example.com/authorize").expect("Authorize URL should parse."),
		)
		.token_endpoint(
			Url::parse("https://login.example.com/token").expect("Token URL should parse."),
		)
		.support_grant(GrantType::ClientCredentials)
		.preferred_client_auth_method(method)
		.build()
		.expect("Descriptor fixture should build.");

		OAuth2ClientFactory::new(descriptor, "client", "secret")
			.expect("Default reqwest transport should build.")
	}

	#[tokio::test]
	async fn handles_enforce_descriptor_grants_and_redirects() {
		let client = factory(ClientAuthMethod::ClientSecretBasic)
			.build(None, CacheBindings::default())
			.expect("Handle should build.");
		let scopes = ScopeSet::new(["openid"]).expect("Scope fixture should be valid.");
		let err = client
			.redeem_authorization_code("code", &scopes)
			.await
			.expect_err("Authorization code is not enabled on this descriptor.");

		assert!(matches!(err, Error::Config(ConfigError::UnsupportedGrant { .. })));

		let err = client
			.acquire_token_silent(&scopes, None)
			.await
			.expect_err("Silent acquisition without an account must fail.");

		assert!(matches!(err, Error::AccountNotFound));
	}

	#[test]
	fn consent_required_invalid_grants_keep_their_suberror() {
		let response = IdentityErrorResponse {
			error: "invalid_grant".into(),
			error_description: Some("AADSTS65001: The user has not consented.".into()),
			error_uri: None,
			suberror: Some("consent_required".into()),
			error_codes: vec![65001],
		};
		let err = map_server_response_error(
			&DefaultProviderStrategy,
			GrantType::RefreshToken,
			response,
			None,
		);

		match err {
			Error::InvalidGrant { reason, suberror } => {
				assert!(reason.contains("AADSTS65001"));
				assert_eq!(suberror.as_deref(), Some("consent_required"));
			},
			other => panic!("Unexpected error: {other:?}."),
		}
	}

	#[test]
	fn post_auth_factories_build_handles() {
		let factory = factory(ClientAuthMethod::ClientSecretPost);
		let redirect =
			Url::parse("https://app.example.com/signin-oidc").expect("Redirect should parse.");

		assert!(factory.build(Some(&redirect), CacheBindings::default()).is_ok());
		assert!(!format!("{factory:?}").contains("\"secret\""));
	}
}
