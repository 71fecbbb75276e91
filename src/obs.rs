//! Optional observability helpers for agent operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `oauth2_rpc_agent.op` with the `op` and
//!   `stage` fields, plus an event for every grant escalation step.
//! - Enable `metrics` to increment the `oauth2_rpc_agent_op_total` counter (labeled by `op` and
//!   `outcome`) and the `oauth2_rpc_agent_escalation_total` counter (labeled by `grant`).

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

macro_rules! label_enum {
	(
		$(#[$meta:meta])*
		$name:ident { $($(#[$vmeta:meta])* $variant:ident => $label:literal),+ $(,)? }
	) => {
		$(#[$meta])*
		#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
		pub enum $name {
			$($(#[$vmeta])* $variant),+
		}
		impl $name {
			/// Label used in span fields and metric labels.
			pub const fn as_str(self) -> &'static str {
				match self {
					$(Self::$variant => $label),+
				}
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(self.as_str())
			}
		}
	};
}

label_enum! {
	/// Operations observed by the agent.
	OpKind {
		/// Token cache lookup or endpoint exchange.
		TokenAcquisition => "token_acquisition",
		/// RPC call issued through a proxy.
		Invocation => "invocation",
	}
}

label_enum! {
	/// Outcome labels recorded for each operation.
	OpOutcome {
		/// Entry to an agent operation.
		Attempt => "attempt",
		/// Successful completion.
		Success => "success",
		/// Failure propagated back to the caller.
		Failure => "failure",
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn labels_match_display() {
		assert_eq!(OpKind::TokenAcquisition.to_string(), "token_acquisition");
		assert_eq!(OpKind::Invocation.as_str(), "invocation");
		assert_eq!(OpOutcome::Failure.to_string(), OpOutcome::Failure.as_str());
	}
}
