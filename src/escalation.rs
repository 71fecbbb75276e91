//! Grant Escalation Policy: the ordered grants tried after a call is rejected as unauthorized.

// std
use std::collections::VecDeque;
// self
use crate::{_prelude::*, auth::GrantType};

/// Immutable, ordered list of fallback grants.
///
/// The list is shared by every call; each call draws from its own [`EscalationQueue`] copy, so
/// one call's retries never consume another call's options.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GrantEscalation(Vec<GrantType>);
impl GrantEscalation {
	/// Builds a policy from `grants`, tried in order.
	pub fn new<I>(grants: I) -> Self
	where
		I: IntoIterator<Item = GrantType>,
	{
		Self(grants.into_iter().collect())
	}

	/// Grants in escalation order.
	pub fn grants(&self) -> &[GrantType] {
		&self.0
	}

	/// Number of retries a single call may perform.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns `true` when a rejected call is never retried.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Fresh per-call queue holding a copy of every grant.
	pub fn queue(&self) -> EscalationQueue {
		EscalationQueue(self.0.iter().copied().collect())
	}
}
impl Default for GrantEscalation {
	fn default() -> Self {
		Self::new([GrantType::RefreshToken, GrantType::Password, GrantType::AuthorizationCode])
	}
}

/// Per-call escalation state; each pop consumes one retry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EscalationQueue(VecDeque<GrantType>);
impl EscalationQueue {
	/// Removes and returns the next grant to try.
	pub fn next_grant(&mut self) -> Option<GrantType> {
		self.0.pop_front()
	}

	/// Grants still available to this call.
	pub fn remaining(&self) -> usize {
		self.0.len()
	}
}
