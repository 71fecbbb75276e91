//! RPC Invocation Orchestrator.
//!
//! [`RpcProxy::invoke`] sends a named method with positional arguments through a pluggable
//! [`RpcTransport`]. Calls that carry a [`TokenRequest`] are authenticated with a bearer token
//! from the [`TokenAcquirer`]; calls rejected as unauthorized (HTTP-equivalent 401 or 400) are
//! retried under the next grant of a per-call
//! [`EscalationQueue`](crate::escalation::EscalationQueue) until the queue runs dry, at
//! which point the cached token is dropped and the error is returned.
//!
//! # Shared headers
//!
//! A proxy writes the `Authorization` header into the [`SharedHeaders`] map it was created with
//! and sends a snapshot of that map with each call. Concurrent calls through proxies sharing one
//! map race on the header value (last writer wins); every call re-ensures its own token before
//! it sends, so a snapshot always carries a token that was valid when it was taken. Calls
//! without a token request send the snapshot with `Authorization` removed.

// crates.io
use oauth2::http::{HeaderMap, HeaderValue, header::AUTHORIZATION};
// self
use crate::{
	_prelude::*,
	acquirer::TokenAcquirer,
	auth::{AccessToken, TokenRequest},
	error::{ErrorNormalizer, RawError},
	escalation::GrantEscalation,
	http::{TokenHttpClient, TransportErrorMapper},
	obs::{self, OpKind, OpOutcome, OpSpan},
};

/// Outgoing header map shared between a caller and its proxies.
pub type SharedHeaders = Arc<RwLock<HeaderMap>>;

/// Boxed future returned by [`RpcTransport::invoke`].
pub type RpcFuture<'a> = Pin<Box<dyn Future<Output = Result<Value, RawError>> + 'a + Send>>;

/// Wire-agnostic capability that delivers a named remote call.
///
/// Failures are reported as [`RawError`]; the proxy normalizes them before deciding whether to
/// retry.
pub trait RpcTransport
where
	Self: Send + Sync,
{
	/// Sends `call` and resolves with the remote result.
	fn invoke(&self, call: RpcCall) -> RpcFuture<'_>;
}

/// Single remote invocation handed to an [`RpcTransport`].
#[derive(Clone, Debug)]
pub struct RpcCall {
	/// Remote method name.
	pub method: String,
	/// Positional arguments.
	pub params: Vec<Value>,
	/// Snapshot of the outgoing headers taken when the call was issued.
	pub headers: HeaderMap,
}
impl RpcCall {
	/// Creates a call without headers.
	pub fn new(method: impl Into<String>, params: Vec<Value>) -> Self {
		Self { method: method.into(), params, headers: HeaderMap::new() }
	}

	/// Replaces the header snapshot.
	pub fn with_headers(mut self, headers: HeaderMap) -> Self {
		self.headers = headers;

		self
	}

	/// Bearer credential carried by the call, if any.
	pub fn authorization(&self) -> Option<&str> {
		self.headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok())
	}
}

/// Generic `invoke(method, args)` client bound to one transport and one header map.
pub struct RpcProxy<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	acquirer: Arc<TokenAcquirer<C, M>>,
	escalation: GrantEscalation,
	normalizer: ErrorNormalizer,
	transport: Arc<dyn RpcTransport>,
	headers: SharedHeaders,
}
impl<C, M> RpcProxy<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Binds a proxy to `transport` and `headers`.
	pub fn new(
		acquirer: Arc<TokenAcquirer<C, M>>,
		escalation: GrantEscalation,
		normalizer: ErrorNormalizer,
		transport: Arc<dyn RpcTransport>,
		headers: SharedHeaders,
	) -> Self {
		Self { acquirer, escalation, normalizer, transport, headers }
	}

	/// Header map this proxy writes the bearer credential into.
	pub fn headers(&self) -> &SharedHeaders {
		&self.headers
	}

	/// Invokes `method` with `params`.
	///
	/// Without a `request` the transport is called once as-is. With one, the call is
	/// authenticated and escalated as described in the module docs; at most
	/// `escalation.len() + 1` attempts are made.
	pub async fn invoke(
		&self,
		method: impl Into<String>,
		params: Vec<Value>,
		request: Option<TokenRequest>,
	) -> Result<Value> {
		const KIND: OpKind = OpKind::Invocation;

		let method = method.into();
		let span = OpSpan::new(KIND, "invoke");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span
			.instrument(async {
				match request {
					Some(request) => self.invoke_authenticated(&method, params, request).await,
					None => self.invoke_unauthenticated(&method, params).await,
				}
			})
			.await;

		match &result {
			Ok(_) => obs::record_op_outcome(KIND, OpOutcome::Success),
			Err(_) => obs::record_op_outcome(KIND, OpOutcome::Failure),
		}

		result
	}

	async fn invoke_unauthenticated(&self, method: &str, params: Vec<Value>) -> Result<Value> {
		let mut headers = self.headers.read().clone();

		// A bearer left behind by an earlier authenticated call must not leak into public calls.
		headers.remove(AUTHORIZATION);

		self.send(RpcCall::new(method, params).with_headers(headers)).await
	}

	async fn invoke_authenticated(
		&self,
		method: &str,
		params: Vec<Value>,
		mut request: TokenRequest,
	) -> Result<Value> {
		let mut queue = self.escalation.queue();
		let mut force_new = false;

		loop {
			let error = match self.attempt(method, &params, &request, force_new).await {
				Ok(value) => return Ok(value),
				Err(e) => e,
			};

			if !error.requires_reauthentication() {
				return Err(error);
			}

			let Some(grant) = queue.next_grant() else {
				// The cached token is assumed permanently invalid once every grant failed.
				if let Err(e) = self.acquirer.invalidate(&request).await {
					obs::trace_invalidation_failure(&e);
				}

				return Err(error);
			};

			obs::trace_escalation(method, grant, error.http_code());
			obs::record_escalation_metric(grant);

			request = request.with_grant_type(grant);
			// The cache key ignores the grant type, so a cached lookup would return the rejected
			// token again.
			force_new = true;
		}
	}

	async fn attempt(
		&self,
		method: &str,
		params: &[Value],
		request: &TokenRequest,
		force_new: bool,
	) -> Result<Value> {
		let token = self.acquirer.ensure_token(request, force_new).await?;
		let headers = self.authorize(&token)?;

		self.send(RpcCall::new(method, params.to_vec()).with_headers(headers)).await
	}

	fn authorize(&self, token: &AccessToken) -> Result<HeaderMap> {
		let value = HeaderValue::from_str(&token.bearer()).map_err(|e| {
			self.normalizer.normalize(
				Error::protocol_violation("Access token cannot be sent as a header value.")
					.with_source(e),
				None,
			)
		})?;
		let mut headers = self.headers.write();

		headers.insert(AUTHORIZATION, value);

		Ok(headers.clone())
	}

	async fn send(&self, call: RpcCall) -> Result<Value> {
		self.transport.invoke(call).await.map_err(|e| self.normalizer.normalize(e, None))
	}
}
impl<C, M> Debug for RpcProxy<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RpcProxy")
			.field("acquirer", &self.acquirer)
			.field("escalation", &self.escalation)
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn call_exposes_its_bearer_header() {
		let mut headers = HeaderMap::new();

		headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer tok1"));

		let call = RpcCall::new("orders.list", vec![Value::from(1)]).with_headers(headers);

		assert_eq!(call.authorization(), Some("Bearer tok1"));
		assert_eq!(RpcCall::new("ping", Vec::new()).authorization(), None);
	}
}
