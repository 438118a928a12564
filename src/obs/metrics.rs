// self
use crate::obs::{FlowKind, FlowOutcome};

/// Records a flow outcome on the global metrics recorder (when enabled).
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"oidc_token_provider_flow_total",
			"flow" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}
	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Records an interactive-reauthentication decision labeled by reason (when enabled).
pub fn record_reauthentication(reason: &'static str) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("oidc_token_provider_reauthentication_total", "reason" => reason)
			.increment(1);
	}
	#[cfg(not(feature = "metrics"))]
	{
		let _ = reason;
	}
}
