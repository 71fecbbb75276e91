//! Agent façade tying the token acquirer, the escalation policy, and the error normalizer
//! together.
//!
//! An [`OAuthAgent`] is built once per server/client registration with [`AgentBuilder`] (or
//! from a deserialized [`AgentConfig`]) and hands out [`RpcProxy`] values bound to a transport
//! and a shared header map. Clones share the cache, the singleflight guards, and the HTTP
//! client.

pub mod builder;

pub use builder::*;

// self
use crate::{
	_prelude::*,
	acquirer::TokenAcquirer,
	auth::{AccessToken, ClientDetails, TokenRequest},
	error::{ErrorNormalizer, RawError},
	escalation::GrantEscalation,
	http::{TokenHttpClient, TransportErrorMapper},
	rpc::{RpcProxy, RpcTransport, SharedHeaders},
	store::TokenCache,
};
#[cfg(feature = "reqwest")]
use crate::http::{ReqwestHttpClient, ReqwestTransportErrorMapper};

#[cfg(feature = "reqwest")]
/// Agent specialized for the crate's default reqwest transport stack.
pub type ReqwestAgent = OAuthAgent<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// OAuth client agent for one authorization server and client registration.
pub struct OAuthAgent<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	acquirer: Arc<TokenAcquirer<C, M>>,
	escalation: GrantEscalation,
	normalizer: ErrorNormalizer,
}
impl<C, M> OAuthAgent<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	pub(crate) fn from_parts(
		acquirer: Arc<TokenAcquirer<C, M>>,
		escalation: GrantEscalation,
		normalizer: ErrorNormalizer,
	) -> Self {
		Self { acquirer, escalation, normalizer }
	}

	/// Returns a usable token for `request`; see [`TokenAcquirer::ensure_token`].
	pub async fn ensure_token(&self, request: &TokenRequest, force_new: bool) -> Result<AccessToken> {
		self.acquirer.ensure_token(request, force_new).await
	}

	/// Drops the cached token for `request`.
	pub async fn invalidate(&self, request: &TokenRequest) -> Result<()> {
		self.acquirer.invalidate(request).await
	}

	/// Creates a proxy that sends calls through `transport` and writes the bearer credential
	/// into `headers`.
	pub fn create_rpc_proxy(
		&self,
		transport: Arc<dyn RpcTransport>,
		headers: SharedHeaders,
	) -> RpcProxy<C, M> {
		RpcProxy::new(
			self.acquirer.clone(),
			self.escalation.clone(),
			self.normalizer.clone(),
			transport,
			headers,
		)
	}

	/// Normalizes `raw` with the agent's registry.
	pub fn normalize(&self, raw: impl Into<RawError>, fallback_http_code: Option<u16>) -> Error {
		self.normalizer.normalize(raw, fallback_http_code)
	}

	/// Normalizer shared by every component of the agent.
	pub fn normalizer(&self) -> &ErrorNormalizer {
		&self.normalizer
	}

	/// Grants tried, in order, after an unauthorized rejection.
	pub fn escalation(&self) -> &GrantEscalation {
		&self.escalation
	}

	/// Token cache used by the agent.
	pub fn cache(&self) -> &TokenCache {
		self.acquirer.cache()
	}

	/// Client registration sent with every grant.
	pub fn client(&self) -> &ClientDetails {
		self.acquirer.client()
	}

	/// Token endpoint derived from the server URI.
	pub fn token_endpoint(&self) -> &Url {
		self.acquirer.token_endpoint()
	}
}
#[cfg(feature = "reqwest")]
impl OAuthAgent<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Starts a new [`AgentBuilder`]; finish with [`AgentBuilder::build`].
	pub fn builder() -> AgentBuilder {
		AgentBuilder::new()
	}
}
impl<C, M> Clone for OAuthAgent<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn clone(&self) -> Self {
		Self {
			acquirer: self.acquirer.clone(),
			escalation: self.escalation.clone(),
			normalizer: self.normalizer.clone(),
		}
	}
}
impl<C, M> Debug for OAuthAgent<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OAuthAgent")
			.field("acquirer", &self.acquirer)
			.field("escalation", &self.escalation)
			.field("normalizer", &self.normalizer)
			.finish()
	}
}
