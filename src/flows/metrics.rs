//! Per-provider flow counters.

// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters shared by every flow of a provider.
#[derive(Debug, Default)]
pub struct FlowMetrics {
	attempts: AtomicU64,
	success: AtomicU64,
	failure: AtomicU64,
	reauthentications: AtomicU64,
}
impl FlowMetrics {
	/// Returns the total number of flow invocations.
	pub fn attempts(&self) -> u64 {
		self.attempts.load(Ordering::Relaxed)
	}

	/// Returns the number of flows that produced a token (cache hits included).
	pub fn successes(&self) -> u64 {
		self.success.load(Ordering::Relaxed)
	}

	/// Returns the number of flows that returned an error.
	pub fn failures(&self) -> u64 {
		self.failure.load(Ordering::Relaxed)
	}

	/// Returns how many failures were turned into interactive challenges.
	pub fn reauthentications(&self) -> u64 {
		self.reauthentications.load(Ordering::Relaxed)
	}

	pub(crate) fn record_attempt(&self) {
		self.attempts.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_success(&self) {
		self.success.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failure.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_reauthentication(&self) {
		self.reauthentications.fetch_add(1, Ordering::Relaxed);
	}
}
