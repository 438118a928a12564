//! Placeholder expansion for configured scope strings.

// self
use crate::{_prelude::*, auth::ScopeSet, error::ConfigError};

/// One `placeholder -> value` substitution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeMapping {
	/// Literal text to search for, e.g. `{sql}`.
	pub placeholder: String,
	/// Replacement text, e.g. `https://database.windows.net/`.
	pub value: String,
}
impl ScopeMapping {
	/// Creates a mapping.
	pub fn new(placeholder: impl Into<String>, value: impl Into<String>) -> Self {
		Self { placeholder: placeholder.into(), value: value.into() }
	}

	fn check(&self) -> Result<(), &'static str> {
		if self.placeholder.is_empty() {
			return Err("empty placeholder");
		}
		if self.value.is_empty() {
			return Err("empty value");
		}
		if self.value.chars().any(char::is_whitespace) {
			return Err("value contains whitespace");
		}

		Ok(())
	}
}

/// Expands scope placeholders into fully-qualified scopes.
///
/// Mappings apply in table order as literal substring replacement. Placeholders without a
/// mapping pass through untouched. The table is validated on construction, so expanding a
/// valid [`ScopeSet`] always yields a valid one.
#[derive(Clone, Debug, Default)]
pub struct ScopeResolver {
	mappings: Arc<[ScopeMapping]>,
}
impl ScopeResolver {
	/// Builds a resolver over an ordered mapping table.
	pub fn new(mappings: impl Into<Vec<ScopeMapping>>) -> Result<Self, ConfigError> {
		let mappings = mappings.into();

		Self::validate_mappings(&mappings)?;

		Ok(Self { mappings: Arc::from(mappings) })
	}

	/// Rejects empty placeholders and values that are empty or contain whitespace.
	pub fn validate_mappings(mappings: &[ScopeMapping]) -> Result<(), ConfigError> {
		for (index, mapping) in mappings.iter().enumerate() {
			mapping.check().map_err(|reason| ConfigError::InvalidScopeMapping { index, reason })?;
		}

		Ok(())
	}

	/// Configured mappings in application order.
	pub fn mappings(&self) -> &[ScopeMapping] {
		&self.mappings
	}

	/// Expands every configured placeholder found in `scope`.
	pub fn resolve(&self, scope: &str) -> String {
		self.mappings
			.iter()
			.fold(scope.to_owned(), |acc, mapping| acc.replace(&mapping.placeholder, &mapping.value))
	}

	/// Expands each entry of `scopes`, keeping order.
	pub fn resolve_all(&self, scopes: &ScopeSet) -> ScopeSet {
		if self.mappings.is_empty() {
			return scopes.clone();
		}

		// Non-empty, whitespace-free values keep every entry a valid scope.
		ScopeSet::from_validated(scopes.iter().map(|scope| self.resolve(scope)).collect())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn resolver() -> ScopeResolver {
		ScopeResolver::new(vec![ScopeMapping::new("{api}", "https://db.example.net/")])
			.expect("Mapping fixture should be valid.")
	}

	#[test]
	fn placeholders_expand_literally() {
		assert_eq!(resolver().resolve("{api}/.default"), "https://db.example.net//.default");
		assert_eq!(resolver().resolve("{other}/read"), "{other}/read");
		assert_eq!(ScopeResolver::default().resolve("{api}/x"), "{api}/x");
	}

	#[test]
	fn resolution_is_idempotent_once_placeholders_are_covered() {
		let resolver = resolver();
		let once = resolver.resolve("{api}user_impersonation");

		assert_eq!(resolver.resolve(&once), once);
	}

	#[test]
	fn mappings_apply_in_table_order() {
		let resolver = ScopeResolver::new(vec![
			ScopeMapping::new("{a}", "{b}"),
			ScopeMapping::new("{b}", "final"),
		])
		.expect("Mapping fixtures should be valid.");

		assert_eq!(resolver.resolve("{a}"), "final");
		assert_eq!(resolver.resolve("{b}{a}"), "finalfinal");
	}

	#[test]
	fn resolve_all_keeps_order() {
		let scopes = ScopeSet::new(["openid", "{api}.default", "{api}read"])
			.expect("Scope fixture should be valid.");
		let resolved = resolver().resolve_all(&scopes);

		assert_eq!(
			resolved.normalized(),
			"openid https://db.example.net/.default https://db.example.net/read"
		);
	}

	#[test]
	fn malformed_tables_are_rejected_on_construction() {
		let ok = ScopeMapping::new("{api}", "https://db.example.net/");

		assert!(matches!(
			ScopeResolver::new(vec![ok.clone(), ScopeMapping::new("{db}", "https://db/ x")]),
			Err(ConfigError::InvalidScopeMapping { index: 1, reason: "value contains whitespace" })
		));
		assert!(matches!(
			ScopeResolver::new(vec![ScopeMapping::new("{api}", "")]),
			Err(ConfigError::InvalidScopeMapping { index: 0, reason: "empty value" })
		));
		assert!(matches!(
			ScopeResolver::new(vec![ok, ScopeMapping::new("", "x")]),
			Err(ConfigError::InvalidScopeMapping { index: 1, reason: "empty placeholder" })
		));
	}

	#[test]
	fn expanded_scopes_stay_valid() {
		let scopes = ScopeSet::new(["{api}", "{api}{api}read", "openid"])
			.expect("Scope fixture should be valid.");
		let resolved = resolver().resolve_all(&scopes);
		let revalidated = ScopeSet::new(resolved.iter()).expect("Resolved scopes should validate.");

		assert_eq!(resolved, revalidated);
	}
}
