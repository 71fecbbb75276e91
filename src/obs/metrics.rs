// self
use crate::{
	auth::GrantType,
	obs::{OpKind, OpOutcome},
};

/// Records an operation outcome via the global metrics recorder (when enabled).
pub fn record_op_outcome(kind: OpKind, outcome: OpOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"oauth2_rpc_agent_op_total",
			"op" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Counts a retry under a stronger grant (when metrics are enabled).
pub fn record_escalation_metric(grant: GrantType) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("oauth2_rpc_agent_escalation_total", "grant" => grant.as_str())
			.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = grant;
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn recorders_noop_without_metrics() {
		record_op_outcome(OpKind::Invocation, OpOutcome::Failure);
		record_escalation_metric(GrantType::Password);
	}
}
