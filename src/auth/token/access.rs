//! Access tokens issued by the authorization endpoint.

// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, token::secret::TokenSecret},
};

/// Immutable result of a successful grant.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
	/// Opaque bearer credential.
	pub access_token: TokenSecret,
	/// Refresh token, if the server issued one.
	pub refresh_token: Option<TokenSecret>,
	/// Token type reported by the server (usually `bearer`).
	pub token_type: Option<String>,
	/// Scope granted by the server, when reported.
	pub scope: Option<ScopeSet>,
	/// Instant the agent received the token.
	pub issued_at: OffsetDateTime,
	/// Expiry derived from `expires_in`; `None` means no local expiry.
	pub expires_at: Option<OffsetDateTime>,
}
impl AccessToken {
	/// Creates a token issued now without expiry information.
	pub fn new(access_token: impl Into<TokenSecret>) -> Self {
		Self {
			access_token: access_token.into(),
			refresh_token: None,
			token_type: None,
			scope: None,
			issued_at: OffsetDateTime::now_utc(),
			expires_at: None,
		}
	}

	/// Sets the refresh token.
	pub fn with_refresh_token(mut self, refresh_token: impl Into<TokenSecret>) -> Self {
		self.refresh_token = Some(refresh_token.into());

		self
	}

	/// Sets the token type.
	pub fn with_token_type(mut self, token_type: impl Into<String>) -> Self {
		self.token_type = Some(token_type.into());

		self
	}

	/// Sets the granted scope.
	pub fn with_scope(mut self, scope: ScopeSet) -> Self {
		self.scope = Some(scope);

		self
	}

	/// Overrides the issued-at instant.
	pub fn issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = instant;

		self
	}

	/// Sets the expiry relative to `issued_at`; a lifetime past the representable range leaves
	/// the token without expiry.
	pub fn expires_in(mut self, lifetime: Duration) -> Self {
		self.expires_at = self.issued_at.checked_add(lifetime);

		self
	}

	/// Returns `true` when the token carries a non-empty credential.
	pub fn is_usable(&self) -> bool {
		!self.access_token.is_empty()
	}

	/// Returns `true` if the token has an expiry at or before `instant`.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		self.expires_at.is_some_and(|expires_at| instant >= expires_at)
	}

	/// Value for the `Authorization` header.
	pub fn bearer(&self) -> String {
		format!("Bearer {}", self.access_token.expose())
	}
}
impl Debug for AccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AccessToken")
			.field("access_token", &"<redacted>")
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("token_type", &self.token_type)
			.field("scope", &self.scope)
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}
