// self
use crate::{_prelude::*, auth::GrantType, obs::OpKind};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedOp<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedOp<F> = F;

/// A span builder used by agent operations.
#[derive(Clone, Debug)]
pub struct OpSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl OpSpan {
	/// Creates a new span tagged with the provided operation kind + stage.
	pub fn new(kind: OpKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("oauth2_rpc_agent.op", op = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedOp<Fut>
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

/// Emits an event for a retry under `grant` after a rejection with `http_code`.
pub fn trace_escalation(method: &str, grant: GrantType, http_code: u16) {
	#[cfg(feature = "tracing")]
	{
		tracing::info!(method, grant = grant.as_str(), http_code, "escalating token grant");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (method, grant, http_code);
	}
}

/// Emits a warning when a cache entry could not be dropped after exhausting every grant.
pub fn trace_invalidation_failure(error: &Error) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(kind = %error.kind(), "failed to invalidate cached token: {error}");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = error;
	}
}
