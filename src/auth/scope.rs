//! Ordered scope sequences and case-insensitive coverage checks.

// std
use std::slice::Iter;
// crates.io
use serde::{Deserializer, Serializer, de::Error as DeError, ser::SerializeSeq};
// self
use crate::_prelude::*;

/// OIDC scopes every user-delegated request carries.
pub const OIDC_RESERVED_SCOPES: [&str; 3] = ["openid", "profile", "offline_access"];

/// Errors emitted when validating scopes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ScopeValidationError {
	/// Empty scope entries are not allowed.
	#[error("Scope entries cannot be empty.")]
	Empty,
	/// Scopes cannot contain embedded whitespace characters.
	#[error("Scope contains whitespace: {scope}.")]
	ContainsWhitespace {
		/// The offending scope string.
		scope: String,
	},
}

/// Ordered sequence of OAuth scopes.
///
/// Entries keep their insertion order and duplicates are tolerated; only empty entries
/// and entries containing whitespace are rejected. Scope comparisons against a granted
/// set are case-insensitive, matching how identity providers echo scopes back.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct ScopeSet {
	scopes: Arc<[String]>,
}
impl ScopeSet {
	/// Creates a validated scope sequence from any iterator.
	pub fn new<I, S>(scopes: I) -> Result<Self, ScopeValidationError>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let mut validated = Vec::new();

		for scope in scopes {
			let owned: String = scope.into();

			if owned.is_empty() {
				return Err(ScopeValidationError::Empty);
			}
			if owned.chars().any(char::is_whitespace) {
				return Err(ScopeValidationError::ContainsWhitespace { scope: owned });
			}

			validated.push(owned);
		}

		Ok(Self { scopes: Arc::from(validated) })
	}

	/// Wraps entries the caller already knows to be non-empty and whitespace-free.
	pub(crate) fn from_validated(scopes: Vec<String>) -> Self {
		debug_assert!(
			scopes.iter().all(|scope| !scope.is_empty() && !scope.chars().any(char::is_whitespace))
		);

		Self { scopes: Arc::from(scopes) }
	}

	/// Number of entries (duplicates included).
	pub fn len(&self) -> usize {
		self.scopes.len()
	}

	/// Returns true if no scopes are defined.
	pub fn is_empty(&self) -> bool {
		self.scopes.is_empty()
	}

	/// Returns true if the sequence contains the scope (exact match).
	pub fn contains(&self, scope: &str) -> bool {
		self.scopes.iter().any(|candidate| candidate == scope)
	}

	/// Returns true if the sequence contains the scope, ignoring ASCII case.
	pub fn contains_ignore_case(&self, scope: &str) -> bool {
		self.scopes.iter().any(|candidate| candidate.eq_ignore_ascii_case(scope))
	}

	/// Entries of `self` that do not appear (case-insensitively) in `granted`, in order.
	pub fn missing_from(&self, granted: &ScopeSet) -> Vec<String> {
		self.scopes.iter().filter(|scope| !granted.contains_ignore_case(scope)).cloned().collect()
	}

	/// Returns true when every entry of `self` appears in `granted`.
	pub fn is_covered_by(&self, granted: &ScopeSet) -> bool {
		self.scopes.iter().all(|scope| granted.contains_ignore_case(scope))
	}

	/// Returns true when any entry of `self` also appears in `other`.
	pub fn overlaps(&self, other: &ScopeSet) -> bool {
		self.scopes.iter().any(|scope| other.contains_ignore_case(scope))
	}

	/// Appends `other` to `self`, skipping entries already present (ignoring case).
	pub fn union(&self, other: &ScopeSet) -> ScopeSet {
		let mut merged: Vec<String> = Vec::with_capacity(self.len() + other.len());

		for scope in self.scopes.iter().chain(other.scopes.iter()) {
			if !merged.iter().any(|existing| existing.eq_ignore_ascii_case(scope)) {
				merged.push(scope.clone());
			}
		}

		ScopeSet { scopes: Arc::from(merged) }
	}

	/// The reserved OIDC scopes followed by `self`, de-duplicated ignoring case.
	pub fn with_oidc_reserved(&self) -> ScopeSet {
		let reserved =
			ScopeSet { scopes: OIDC_RESERVED_SCOPES.iter().map(|s| s.to_string()).collect() };

		reserved.union(self)
	}

	/// Iterator over the scopes in order.
	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.scopes.iter().map(|s| s.as_str())
	}

	/// Space-delimited representation suitable for a `scope` parameter.
	pub fn normalized(&self) -> String {
		self.scopes.join(" ")
	}

	/// Returns the underlying slice of scope strings.
	pub fn as_slice(&self) -> &[String] {
		&self.scopes
	}
}
impl Debug for ScopeSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("ScopeSet").field(&self.scopes).finish()
	}
}
impl Display for ScopeSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.normalized())
	}
}

/// Iterator over scope strings.
pub struct ScopeIter<'a> {
	inner: Iter<'a, String>,
}
impl<'a> Iterator for ScopeIter<'a> {
	type Item = &'a str;

	fn next(&mut self) -> Option<Self::Item> {
		self.inner.next().map(|s| s.as_str())
	}
}
impl<'a> IntoIterator for &'a ScopeSet {
	type IntoIter = ScopeIter<'a>;
	type Item = &'a str;

	fn into_iter(self) -> Self::IntoIter {
		ScopeIter { inner: self.scopes.iter() }
	}
}
impl TryFrom<Vec<String>> for ScopeSet {
	type Error = ScopeValidationError;

	fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
		Self::new(value)
	}
}
impl TryFrom<&[&str]> for ScopeSet {
	type Error = ScopeValidationError;

	fn try_from(value: &[&str]) -> Result<Self, Self::Error> {
		Self::new(value.iter().copied())
	}
}
impl FromStr for ScopeSet {
	type Err = ScopeValidationError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		if s.is_empty() {
			return Ok(Self::default());
		}
		if s.chars().all(char::is_whitespace) {
			return Err(ScopeValidationError::Empty);
		}

		Self::new(s.split_whitespace())
	}
}
impl Serialize for ScopeSet {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		let mut seq = serializer.serialize_seq(Some(self.scopes.len()))?;

		for scope in self.scopes.iter() {
			seq.serialize_element(scope)?;
		}

		seq.end()
	}
}
impl<'de> Deserialize<'de> for ScopeSet {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let values = <Vec<String>>::deserialize(deserializer)?;

		ScopeSet::new(values).map_err(DeError::custom)
	}
}
