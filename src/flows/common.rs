//! Grant validation shared by every flow.

// self
use crate::{_prelude::*, auth::ScopeSet};

/// Fails with [`Error::ScopeNotGranted`] unless every `requested` scope was granted.
///
/// Comparison ignores ASCII case; the reported scopes keep the requested spelling.
pub fn ensure_scopes_granted(requested: &ScopeSet, granted: &ScopeSet) -> Result<()> {
	let missing = requested.missing_from(granted);

	if missing.is_empty() { Ok(()) } else { Err(Error::ScopeNotGranted { missing }) }
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn partial_grants_report_missing_scopes() {
		let requested = ScopeSet::new(["openid", "profile", "Sql.Access"])
			.expect("Requested scopes should be valid.");
		let granted =
			ScopeSet::new(["openid", "profile"]).expect("Granted scopes should be valid.");
		let err = ensure_scopes_granted(&requested, &granted)
			.expect_err("Missing scopes must be reported.");

		assert!(matches!(&err, Error::ScopeNotGranted { missing } if missing == &["Sql.Access"]));
		assert_eq!(err.code(), Error::REQUESTED_SCOPE_MISSING);

		let granted = ScopeSet::new(["OPENID", "Profile", "sql.access"])
			.expect("Granted scopes should be valid.");

		assert!(ensure_scopes_granted(&requested, &granted).is_ok());
	}
}
