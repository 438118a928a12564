//! Provider descriptor data shared by every flow.

/// Builder API for assembling provider descriptors.
pub mod builder;
/// Grant flags wired into provider descriptors.
pub mod grant;
/// Provider-specific quirk toggles.
pub mod quirks;

pub use builder::*;
pub use grant::*;
pub use quirks::*;

// self
use crate::{_prelude::*, auth::ProviderId};

/// How the confidential client authenticates at the token endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
	#[default]
	/// HTTP Basic with `client_id`/`client_secret`.
	ClientSecretBasic,
	/// `client_id`/`client_secret` as form body parameters.
	ClientSecretPost,
}

/// Endpoints declared by a provider descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEndpoints {
	/// Authorization endpoint that interactive challenges are sent to.
	pub authorization: Url,
	/// Token endpoint used for every exchange.
	pub token: Url,
}

/// Immutable provider descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
	/// Descriptor identifier.
	pub id: ProviderId,
	/// Endpoint definitions.
	pub endpoints: ProviderEndpoints,
	/// Enabled grants.
	pub supported_grants: SupportedGrants,
	/// Preferred client authentication mechanism.
	pub preferred_client_auth_method: ClientAuthMethod,
	/// Provider-specific quirks.
	pub quirks: ProviderQuirks,
}
impl ProviderDescriptor {
	/// Creates a new builder for the provided identifier.
	pub fn builder(id: ProviderId) -> ProviderDescriptorBuilder {
		ProviderDescriptorBuilder::new(id)
	}

	/// Describes a tenant-scoped v2.0 authority such as `https://login.microsoftonline.com`.
	///
	/// Endpoints resolve to `{authority}/{tenant}/oauth2/v2.0/{authorize,token}`, every grant
	/// is enabled and `client_info` is requested so responses carry home-account metadata.
	pub fn from_authority(
		id: ProviderId,
		authority: &Url,
		tenant_id: &str,
	) -> Result<Self, ProviderDescriptorError> {
		let tenant_id = tenant_id.trim();

		if tenant_id.is_empty() || tenant_id.contains('/') {
			return Err(ProviderDescriptorError::InvalidAuthority { url: authority.to_string() });
		}

		let base = authority.as_str().trim_end_matches('/');
		let endpoint = |leaf: &str| {
			Url::parse(&format!("{base}/{tenant_id}/oauth2/v2.0/{leaf}")).map_err(|_| {
				ProviderDescriptorError::InvalidAuthority { url: authority.to_string() }
			})
		};

		Self::builder(id)
			.authorization_endpoint(endpoint("authorize")?)
			.token_endpoint(endpoint("token")?)
			.support_grants([
				GrantType::AuthorizationCode,
				GrantType::RefreshToken,
				GrantType::ClientCredentials,
			])
			.preferred_client_auth_method(ClientAuthMethod::ClientSecretPost)
			.quirks(ProviderQuirks { request_client_info: true, ..Default::default() })
			.build()
	}

	/// Checks whether the descriptor enables `grant`.
	pub fn supports(&self, grant: GrantType) -> bool {
		self.supported_grants.supports(grant)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn authority_descriptors_are_tenant_scoped() {
		let id = ProviderId::new("aad").expect("Provider id should be valid.");
		let authority =
			Url::parse("https://login.example.com/").expect("Authority fixture should parse.");
		let descriptor = ProviderDescriptor::from_authority(id.clone(), &authority, "contoso")
			.expect("Authority descriptor should build.");

		assert_eq!(
			descriptor.endpoints.authorization.as_str(),
			"https://login.example.com/contoso/oauth2/v2.0/authorize"
		);
		assert_eq!(
			descriptor.endpoints.token.as_str(),
			"https://login.example.com/contoso/oauth2/v2.0/token"
		);
		assert!(descriptor.supports(GrantType::ClientCredentials));
		assert!(descriptor.quirks.request_client_info);
		assert!(matches!(
			ProviderDescriptor::from_authority(id.clone(), &authority, " "),
			Err(ProviderDescriptorError::InvalidAuthority { .. })
		));

		let insecure = Url::parse("http://login.example.com").expect("Authority should parse.");

		assert!(matches!(
			ProviderDescriptor::from_authority(id, &insecure, "common"),
			Err(ProviderDescriptorError::InsecureEndpoint { endpoint: "authorization", .. })
		));
	}
}
