//! Client registration details sent with every grant exchange.

// self
use crate::{
	_prelude::*,
	auth::{ClientId, TokenSecret},
};

/// Client registration presented on every grant; fixed for the agent's lifetime.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientDetails {
	/// OAuth 2.0 client identifier.
	pub client_id: ClientId,
	/// Client secret for confidential clients.
	pub client_secret: Option<TokenSecret>,
	/// Redirect URI registered for the client.
	pub redirect_uri: Option<Url>,
}
impl ClientDetails {
	/// Creates public client details.
	pub fn new(client_id: ClientId) -> Self {
		Self { client_id, client_secret: None, redirect_uri: None }
	}

	/// Sets the client secret.
	pub fn with_client_secret(mut self, secret: impl Into<TokenSecret>) -> Self {
		self.client_secret = Some(secret.into());

		self
	}

	/// Sets the redirect URI.
	pub fn with_redirect_uri(mut self, redirect_uri: Url) -> Self {
		self.redirect_uri = Some(redirect_uri);

		self
	}
}
