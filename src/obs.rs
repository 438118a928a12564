//! Optional observability hooks for acquisition flows and cache hooks.
//!
//! # Feature Flags
//!
//! - `tracing` wraps every flow in an `oidc_token_provider.flow` span carrying `flow` and
//!   `stage` fields, and emits debug events from the cache hooks (key kind and the
//!   state-changed flag only).
//! - `metrics` increments `oidc_token_provider_flow_total{flow,outcome}` per attempt,
//!   success and failure, plus `oidc_token_provider_reauthentication_total{reason}`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Acquisition operations observed by the provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Authorization-code redemption after sign-in.
	AuthorizationCode,
	/// Silent per-user acquisition (cache hit or refresh-token redemption).
	Silent,
	/// App-only client-credentials acquisition.
	ClientCredentials,
	/// Account removal at sign-out.
	RemoveAccount,
}
impl FlowKind {
	/// Stable label for span and metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::AuthorizationCode => "authorization_code",
			FlowKind::Silent => "silent",
			FlowKind::ClientCredentials => "client_credentials",
			FlowKind::RemoveAccount => "remove_account",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded per flow invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry into a flow.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure returned to the caller.
	Failure,
}
impl FlowOutcome {
	/// Stable label for span and metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Cache hook stages reported by [`record_cache_event`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CacheStage {
	/// Persisted bytes were loaded before the client touched its cache.
	BeforeAccess,
	/// The client is about to mutate its cache.
	BeforeWrite,
	/// The client finished; bytes were persisted if the state changed.
	AfterAccess,
	/// A user entry was deleted.
	Remove,
}
impl CacheStage {
	/// Stable label for event fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CacheStage::BeforeAccess => "before_access",
			CacheStage::BeforeWrite => "before_write",
			CacheStage::AfterAccess => "after_access",
			CacheStage::Remove => "remove",
		}
	}
}
