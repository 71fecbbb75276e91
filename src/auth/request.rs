//! Per-call token requests and grant derivation.

// self
use crate::{
	_prelude::*,
	auth::{ClientDetails, ClientId, GrantType, ScopeSet, TokenSecret},
};

/// Semantic description of the token a call needs.
///
/// Only `refresh_token`, `client_id`, `redirect_uri`, and `scope` identify the token in the
/// cache. The grant type and the credentials are inputs used to obtain it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenRequest {
	/// Explicit grant type; derived from the credentials when absent.
	pub grant_type: Option<GrantType>,
	/// Authorization code obtained out of band.
	pub code: Option<TokenSecret>,
	/// Refresh token.
	pub refresh_token: Option<TokenSecret>,
	/// Resource owner username (or client name for client credentials).
	pub username: Option<String>,
	/// Resource owner password.
	pub password: Option<TokenSecret>,
	/// Requested scope patterns.
	pub scope: ScopeSet,
	/// Client identifier; filled from [`ClientDetails`] when absent.
	pub client_id: Option<ClientId>,
	/// Redirect URI; filled from [`ClientDetails`] when absent.
	pub redirect_uri: Option<Url>,
}
impl TokenRequest {
	/// Creates an empty request.
	pub fn new() -> Self {
		Self::default()
	}

	/// Request for the resource owner password grant.
	pub fn password(username: impl Into<String>, password: impl Into<TokenSecret>) -> Self {
		Self::new().with_username(username).with_password(password)
	}

	/// Request for the refresh token grant.
	pub fn refresh(refresh_token: impl Into<TokenSecret>) -> Self {
		Self::new().with_refresh_token(refresh_token)
	}

	/// Returns a copy with the grant type replaced.
	pub fn with_grant_type(mut self, grant_type: GrantType) -> Self {
		self.grant_type = Some(grant_type);

		self
	}

	/// Sets the authorization code.
	pub fn with_code(mut self, code: impl Into<TokenSecret>) -> Self {
		self.code = Some(code.into());

		self
	}

	/// Sets the refresh token.
	pub fn with_refresh_token(mut self, refresh_token: impl Into<TokenSecret>) -> Self {
		self.refresh_token = Some(refresh_token.into());

		self
	}

	/// Sets the username.
	pub fn with_username(mut self, username: impl Into<String>) -> Self {
		self.username = Some(username.into());

		self
	}

	/// Sets the password.
	pub fn with_password(mut self, password: impl Into<TokenSecret>) -> Self {
		self.password = Some(password.into());

		self
	}

	/// Sets the requested scope.
	pub fn with_scope(mut self, scope: ScopeSet) -> Self {
		self.scope = scope;

		self
	}

	/// Sets the client identifier.
	pub fn with_client_id(mut self, client_id: ClientId) -> Self {
		self.client_id = Some(client_id);

		self
	}

	/// Sets the redirect URI.
	pub fn with_redirect_uri(mut self, redirect_uri: Url) -> Self {
		self.redirect_uri = Some(redirect_uri);

		self
	}

	/// Fills `client_id` and `redirect_uri` from the client registration when missing.
	pub fn with_client_defaults(mut self, client: &ClientDetails) -> Self {
		if self.client_id.is_none() {
			self.client_id = Some(client.client_id.clone());
		}
		if self.redirect_uri.is_none() {
			self.redirect_uri = client.redirect_uri.clone();
		}

		self
	}

	/// Resolves the grant type to submit.
	///
	/// An explicit grant wins. Otherwise: a refresh token selects `refresh_token`, a username
	/// with a password selects `password`, and a bare username selects `client_credentials`.
	pub fn effective_grant_type(&self) -> Result<GrantType> {
		if let Some(grant_type) = self.grant_type {
			return Ok(grant_type);
		}
		if self.refresh_token.is_some() {
			return Ok(GrantType::RefreshToken);
		}

		match (&self.username, &self.password) {
			(Some(_), Some(_)) => Ok(GrantType::Password),
			(Some(_), None) => Ok(GrantType::ClientCredentials),
			_ => Err(Error::invalid_grant_type()),
		}
	}
}
