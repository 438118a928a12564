// self
use crate::_prelude::*;

/// OAuth 2.0 grants used by the token provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
	/// Authorization-code redemption after interactive sign-in.
	AuthorizationCode,
	/// Refresh-token redemption behind silent acquisition.
	RefreshToken,
	/// App-only client-credentials tokens.
	ClientCredentials,
}
impl GrantType {
	/// RFC 6749 identifier of the grant.
	pub fn as_str(self) -> &'static str {
		match self {
			GrantType::AuthorizationCode => "authorization_code",
			GrantType::RefreshToken => "refresh_token",
			GrantType::ClientCredentials => "client_credentials",
		}
	}
}
impl Display for GrantType {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Grant flags of a descriptor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportedGrants {
	/// Authorization-code grant enabled.
	pub authorization_code: bool,
	/// Refresh-token grant enabled.
	pub refresh_token: bool,
	/// Client-credentials grant enabled.
	pub client_credentials: bool,
}
impl SupportedGrants {
	/// Returns true if `grant` is enabled.
	pub fn supports(self, grant: GrantType) -> bool {
		match grant {
			GrantType::AuthorizationCode => self.authorization_code,
			GrantType::RefreshToken => self.refresh_token,
			GrantType::ClientCredentials => self.client_credentials,
		}
	}

	/// Enables `grant`.
	pub fn enable(mut self, grant: GrantType) -> Self {
		match grant {
			GrantType::AuthorizationCode => self.authorization_code = true,
			GrantType::RefreshToken => self.refresh_token = true,
			GrantType::ClientCredentials => self.client_credentials = true,
		}

		self
	}

	/// Returns true when nothing is enabled.
	pub fn is_empty(self) -> bool {
		!(self.authorization_code || self.refresh_token || self.client_credentials)
	}
}
