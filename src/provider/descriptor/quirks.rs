// self
use crate::_prelude::*;

/// Provider-specific toggles that change how requests are built.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderQuirks {
	/// Character used to join scopes in `scope` parameters.
	pub scope_delimiter: char,
	/// Sends `client_info=1` so responses carry the `uid.utid` home-account identifier.
	pub request_client_info: bool,
}
impl Default for ProviderQuirks {
	fn default() -> Self {
		Self { scope_delimiter: ' ', request_client_info: false }
	}
}
