//! Strongly typed identifiers validated once at the crate boundary.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

macro_rules! def_id {
	($name:ident, $doc:literal, $kind:literal, $validate:path) => {
		#[doc = $doc]
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Creates a new identifier after validation.
			pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
				let view = value.as_ref();

				$validate($kind, view)?;

				Ok(Self(view.to_owned()))
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &Self::Target {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				$validate($kind, &value)?;

				Ok(Self(value))
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, concat!($kind, "({})"), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
	};
}

const IDENTIFIER_MAX_LEN: usize = 256;

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("{kind} identifier cannot be empty.")]
	Empty {
		/// Kind of identifier (identity, provider).
		kind: &'static str,
	},
	/// The identifier contains whitespace characters.
	#[error("{kind} identifier contains whitespace.")]
	ContainsWhitespace {
		/// Kind of identifier (identity, provider).
		kind: &'static str,
	},
	/// A dot-separated identity key has an empty object or tenant segment.
	#[error("{kind} identifier has an empty segment around its tenant separator.")]
	EmptySegment {
		/// Kind of identifier (identity, provider).
		kind: &'static str,
	},
	/// More than one tenant separator was found.
	#[error("{kind} identifier contains more than one tenant separator.")]
	TooManySegments {
		/// Kind of identifier (identity, provider).
		kind: &'static str,
	},
	/// The identifier exceeded the allowed character count.
	#[error("{kind} identifier exceeds {max} characters.")]
	TooLong {
		/// Kind of identifier (identity, provider).
		kind: &'static str,
		/// Maximum permitted character count.
		max: usize,
	},
}

def_id! {
	IdentityKey,
	"Stable home-account identifier keying a signed-in identity's token cache entry.\n\n\
	 Keys take the `object.tenant` shape (`uid.utid` from `client_info`) or a bare object id \
	 when the provider reports no tenant.",
	"Identity",
	validate_identity_key
}
impl IdentityKey {
	/// Joins an object id and an optional home tenant into a key.
	pub fn from_parts(object_id: &str, tenant_id: Option<&str>) -> Result<Self, IdentifierError> {
		match tenant_id {
			Some(tenant) => {
				if [object_id, tenant].iter().any(|part| part.contains(IDENTITY_TENANT_SEPARATOR)) {
					return Err(IdentifierError::TooManySegments { kind: "Identity" });
				}

				Self::new(format!("{object_id}{IDENTITY_TENANT_SEPARATOR}{tenant}"))
			},
			None => Self::new(object_id),
		}
	}

	/// Object id segment (`uid`).
	pub fn object_id(&self) -> &str {
		self.0.split_once(IDENTITY_TENANT_SEPARATOR).map_or(self.0.as_str(), |(object, _)| object)
	}

	/// Home tenant segment (`utid`), if the key carries one.
	pub fn tenant_id(&self) -> Option<&str> {
		self.0.split_once(IDENTITY_TENANT_SEPARATOR).map(|(_, tenant)| tenant)
	}
}

def_id! {
	ProviderId,
	"Identifier for an identity provider descriptor.",
	"Provider",
	validate_view
}

const IDENTITY_TENANT_SEPARATOR: char = '.';

fn validate_identity_key(kind: &'static str, view: &str) -> Result<(), IdentifierError> {
	validate_view(kind, view)?;

	let Some((object, tenant)) = view.split_once(IDENTITY_TENANT_SEPARATOR) else {
		return Ok(());
	};

	if object.is_empty() || tenant.is_empty() {
		return Err(IdentifierError::EmptySegment { kind });
	}
	if tenant.contains(IDENTITY_TENANT_SEPARATOR) {
		return Err(IdentifierError::TooManySegments { kind });
	}

	Ok(())
}

fn validate_view(kind: &'static str, view: &str) -> Result<(), IdentifierError> {
	if view.is_empty() {
		return Err(IdentifierError::Empty { kind });
	}
	if view.chars().any(char::is_whitespace) {
		return Err(IdentifierError::ContainsWhitespace { kind });
	}
	if view.len() > IDENTIFIER_MAX_LEN {
		return Err(IdentifierError::TooLong { kind, max: IDENTIFIER_MAX_LEN });
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn identity_keys_validate() {
		assert!(IdentityKey::new(" uid.utid").is_err(), "Leading whitespace must be rejected.");
		assert!(IdentityKey::new("uid.utid ").is_err(), "Trailing whitespace must be rejected.");

		let key = IdentityKey::new("uid-1.tid-1").expect("Identity fixture should be valid.");

		assert_eq!(key.as_ref(), "uid-1.tid-1");
		assert_eq!(format!("{key:?}"), "Identity(uid-1.tid-1)");
		assert!(IdentityKey::new("").is_err());
		assert!(ProviderId::new("with space").is_err());
	}

	#[test]
	fn identity_keys_split_into_object_and_tenant() {
		let key = IdentityKey::new("user-oid.contoso-tenant").expect("Dotted key should be valid.");

		assert_eq!(key.object_id(), "user-oid");
		assert_eq!(key.tenant_id(), Some("contoso-tenant"));

		let bare = IdentityKey::new("user-oid").expect("Tenantless key should be valid.");

		assert_eq!(bare.object_id(), "user-oid");
		assert_eq!(bare.tenant_id(), None);
		assert_eq!(
			IdentityKey::from_parts("u-1", Some("t-1")).expect("Parts should join."),
			IdentityKey::new("u-1.t-1").expect("Joined fixture should be valid.")
		);
		assert_eq!(
			IdentityKey::from_parts("u-1", None).expect("Object id alone should suffice."),
			bare_key("u-1")
		);
	}

	#[test]
	fn identity_keys_reject_malformed_segments() {
		for value in [".utid", "uid.", "."] {
			assert_eq!(
				IdentityKey::new(value),
				Err(IdentifierError::EmptySegment { kind: "Identity" }),
				"{value:?} should be rejected."
			);
		}

		assert_eq!(
			IdentityKey::new("uid.utid.extra"),
			Err(IdentifierError::TooManySegments { kind: "Identity" })
		);
		assert_eq!(
			IdentityKey::from_parts("u.1", Some("t-1")),
			Err(IdentifierError::TooManySegments { kind: "Identity" })
		);
		assert_eq!(
			IdentityKey::from_parts("u-1", Some("")),
			Err(IdentifierError::EmptySegment { kind: "Identity" })
		);
		assert!(
			ProviderId::new("login.example.com").is_ok(),
			"Segment rules only apply to identity keys."
		);
		assert!(serde_json::from_str::<IdentityKey>("\"uid.\"").is_err());
	}

	fn bare_key(value: &str) -> IdentityKey {
		IdentityKey::new(value).expect("Bare identity fixture should be valid.")
	}

	#[test]
	fn serde_round_trip_enforces_validation() {
		let key: IdentityKey =
			serde_json::from_str("\"uid.utid\"").expect("Identity key should deserialize.");

		assert_eq!(key.as_ref(), "uid.utid");
		assert!(serde_json::from_str::<IdentityKey>("\"with space\"").is_err());
	}

	#[test]
	fn length_limit_is_enforced() {
		let exact = "a".repeat(IDENTIFIER_MAX_LEN);

		IdentityKey::new(&exact).expect("Exact length should succeed.");

		assert!(IdentityKey::new("a".repeat(IDENTIFIER_MAX_LEN + 1)).is_err());
	}

	#[test]
	fn borrow_supports_fast_lookup() {
		let map: HashMap<IdentityKey, u8> = HashMap::from_iter([(
			IdentityKey::new("uid.utid").expect("Identity used for lookup should be valid."),
			7_u8,
		)]);

		assert_eq!(map.get("uid.utid"), Some(&7));
	}
}
