// self
use crate::{
	_prelude::*,
	obs::{CacheStage, FlowKind},
};

/// Instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFlow<F> = F;

/// Span wrapping one provider flow.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FlowSpan {
	/// Creates a span tagged with the flow kind and call-site stage.
	pub fn new(kind: FlowKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("oidc_token_provider.flow", flow = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedFlow<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Emits a debug event for a cache hook. Never records identities or token material.
pub fn record_cache_event(stage: CacheStage, key_kind: &'static str, state_changed: bool) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(stage = stage.as_str(), key = key_kind, state_changed, "token cache hook");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (stage, key_kind, state_changed);
	}
}

/// Emits an info event when a failure is turned into an interactive challenge.
pub fn record_reauthentication_event(reason: &'static str, scope_count: usize) {
	#[cfg(feature = "tracing")]
	{
		tracing::info!(reason, scope_count, "interactive reauthentication required");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (reason, scope_count);
	}
}
