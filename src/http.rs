//! Transport primitives for the authorization endpoint exchange.
//!
//! [`TokenHttpClient`] is the agent's only dependency on an HTTP stack. Requests and responses
//! use the `oauth2` crate's [`HttpRequest`]/[`HttpResponse`] aliases (plain `http` types with
//! byte bodies) so custom clients plug in without extra conversions. Failures are reported as
//! [`HttpClientError`] and turned into [`RawError`] values by a [`TransportErrorMapper`].

pub use oauth2::{HttpClientError, HttpRequest, HttpResponse};

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// self
use crate::{_prelude::*, error::RawError};

/// Boxed future returned by [`TokenHttpClient::execute`].
pub type HttpFuture<'a, E> =
	Pin<Box<dyn Future<Output = Result<HttpResponse, HttpClientError<E>>> + 'a + Send>>;

/// Abstraction over HTTP transports capable of executing token grant exchanges.
///
/// Implementations must be `Send + Sync + 'static` so a single client can back many agents,
/// and the futures they return must be `Send`. Redirects should not be followed: the token
/// endpoint answers directly.
pub trait TokenHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport.
	type TransportError: 'static + Send + Sync + StdError;

	/// Sends `request` and resolves with the full response, whatever its status.
	fn execute(&self, request: HttpRequest) -> HttpFuture<'_, Self::TransportError>;
}

/// Maps HTTP client failures into raw errors for normalization.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport.
	fn map_transport_error(&self, error: HttpClientError<E>) -> RawError;
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl TokenHttpClient for ReqwestHttpClient {
	type TransportError = ReqwestError;

	fn execute(&self, request: HttpRequest) -> HttpFuture<'_, Self::TransportError> {
		let client = self.0.clone();

		Box::pin(async move {
			let response = client.execute(request.try_into().map_err(Box::new)?).await.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let mut response_new = HttpResponse::new(response.bytes().await.map_err(Box::new)?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}

/// Default mapper for reqwest-backed transports.
///
/// Timeouts report 504 and connection failures 503 so they stay out of the reauthentication
/// range; anything else keeps the status reqwest saw, if any.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(&self, error: HttpClientError<ReqwestError>) -> RawError {
		match error {
			HttpClientError::Reqwest(inner) => {
				let status = if inner.is_timeout() {
					Some(504)
				} else if inner.is_connect() {
					Some(503)
				} else {
					inner.status().map(|code| code.as_u16())
				};

				RawError::transport(*inner, status)
			},
			HttpClientError::Http(inner) =>
				Error::config(format!("Token request could not be built: {inner}.")).with_source(inner).into(),
			HttpClientError::Io(inner) => RawError::transport(inner, None),
			HttpClientError::Other(message) =>
				RawError::fields().message(format!("HTTP client error: {message}.")).into(),
			_ => RawError::fields().message("HTTP client error.").into(),
		}
	}
}
