//! Normalized error taxonomy shared by the cache, the token acquirer, and the RPC orchestrator.
//!
//! Every failure that leaves the agent is an [`Error`]: a structured value carrying an
//! HTTP-equivalent status code, a message, an optional JSON payload, and the `ensured` marker
//! set by [`ErrorNormalizer`]. Raw failures coming from HTTP clients, token endpoint bodies, or
//! RPC transports are described by [`RawError`] and converted exactly once.

mod normalize;
mod raw;
mod registry;

pub use normalize::*;
pub use raw::*;
pub use registry::*;

// self
use crate::_prelude::*;

/// Agent-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

pub(crate) type SharedSource = Arc<dyn StdError + Send + Sync>;

/// Classification attached to every normalized error.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
	/// No grant type could be derived from the token request.
	InvalidGrantType,
	/// Network or transport failure below the HTTP/RPC layer.
	Transport,
	/// Well-formed response that violates the expected token or RPC payload shape.
	ProtocolViolation,
	/// Registered application error reconstructed from its code.
	Application {
		/// Application error code reported by the remote side.
		code: i64,
		/// Registered name for the code.
		name: String,
	},
	/// Rejected credentials (HTTP-equivalent 401 or 400).
	Unauthorized,
	/// Any other remote failure that carries an HTTP-equivalent code.
	Remote,
	/// Token cache backend failure.
	Storage,
	/// Local configuration problem.
	Config,
}
impl ErrorKind {
	/// Picks the generic kind for a remote failure with the provided HTTP-equivalent code.
	pub fn for_http_code(http_code: u16) -> Self {
		if matches!(http_code, 400 | 401) { Self::Unauthorized } else { Self::Remote }
	}

	/// Returns a stable label suitable for span or metric fields.
	pub fn as_str(&self) -> &str {
		match self {
			Self::InvalidGrantType => "invalid_grant_type",
			Self::Transport => "transport",
			Self::ProtocolViolation => "protocol_violation",
			Self::Application { name, .. } => name,
			Self::Unauthorized => "unauthorized",
			Self::Remote => "remote",
			Self::Storage => "storage",
			Self::Config => "config",
		}
	}
}
impl Display for ErrorKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Canonical normalized error exposed by public APIs.
#[derive(Clone, Debug)]
pub struct Error {
	kind: ErrorKind,
	http_code: u16,
	message: String,
	data: Option<Value>,
	ensured: bool,
	source: Option<SharedSource>,
}
impl Error {
	const DEFAULT_HTTP_CODE: u16 = 500;

	/// Creates an error that has not passed through the normalizer yet.
	pub fn new(kind: ErrorKind, http_code: u16, message: impl Into<String>) -> Self {
		Self { kind, http_code, message: message.into(), data: None, ensured: false, source: None }
	}

	/// No grant type can be derived from the request.
	pub fn invalid_grant_type() -> Self {
		Self::new(
			ErrorKind::InvalidGrantType,
			400,
			"Invalid grant type: the token request carries no refresh token or username.",
		)
	}

	/// Response shape violates the token or RPC contract.
	pub fn protocol_violation(message: impl Into<String>) -> Self {
		Self::new(ErrorKind::ProtocolViolation, Self::DEFAULT_HTTP_CODE, message)
	}

	/// Local configuration problem.
	pub fn config(message: impl Into<String>) -> Self {
		Self::new(ErrorKind::Config, Self::DEFAULT_HTTP_CODE, message)
	}

	/// Generic remote failure; 400/401 map to [`ErrorKind::Unauthorized`].
	pub fn remote(http_code: u16, message: impl Into<String>) -> Self {
		Self::new(ErrorKind::for_http_code(http_code), http_code, message)
	}

	/// Registered application failure.
	pub fn application(
		code: i64,
		name: impl Into<String>,
		http_code: u16,
		message: impl Into<String>,
	) -> Self {
		Self::new(ErrorKind::Application { code, name: name.into() }, http_code, message)
	}

	/// Attaches a structured payload.
	pub fn with_data(mut self, data: Value) -> Self {
		self.data = Some(data);

		self
	}

	/// Attaches the underlying cause.
	pub fn with_source(mut self, source: impl 'static + Send + Sync + StdError) -> Self {
		self.source = Some(Arc::new(source));

		self
	}

	pub(crate) fn with_shared_source(mut self, source: Option<SharedSource>) -> Self {
		self.source = source;

		self
	}

	pub(crate) fn ensure(mut self) -> Self {
		self.ensured = true;

		self
	}

	/// Classification of the failure.
	pub fn kind(&self) -> &ErrorKind {
		&self.kind
	}

	/// HTTP-equivalent status code.
	pub fn http_code(&self) -> u16 {
		self.http_code
	}

	/// Human-readable message.
	pub fn message(&self) -> &str {
		&self.message
	}

	/// Structured payload reported alongside the failure, if any.
	pub fn data(&self) -> Option<&Value> {
		self.data.as_ref()
	}

	/// Returns `true` once the error has passed through [`ErrorNormalizer`].
	pub fn is_ensured(&self) -> bool {
		self.ensured
	}

	/// Application error code, when the error was reconstructed from the registry.
	pub fn app_code(&self) -> Option<i64> {
		match &self.kind {
			ErrorKind::Application { code, .. } => Some(*code),
			_ => None,
		}
	}

	/// Returns `true` when the failure asks the caller to authenticate again (401 or 400).
	///
	/// A request that cannot produce any grant type is rejected locally and never qualifies.
	pub fn requires_reauthentication(&self) -> bool {
		matches!(self.http_code, 400 | 401) && self.kind != ErrorKind::InvalidGrantType
	}
}
impl PartialEq for Error {
	fn eq(&self, other: &Self) -> bool {
		self.kind == other.kind
			&& self.http_code == other.http_code
			&& self.message == other.message
			&& self.data == other.data
			&& self.ensured == other.ensured
	}
}
impl Display for Error {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.message)
	}
}
impl StdError for Error {
	fn source(&self) -> Option<&(dyn StdError + 'static)> {
		self.source.as_deref().map(|source| source as &(dyn StdError + 'static))
	}
}
impl From<crate::store::StoreError> for Error {
	fn from(e: crate::store::StoreError) -> Self {
		Self::new(ErrorKind::Storage, Self::DEFAULT_HTTP_CODE, e.to_string()).with_source(e)
	}
}
impl From<crate::agent::AgentConfigError> for Error {
	fn from(e: crate::agent::AgentConfigError) -> Self {
		Self::config(e.to_string()).with_source(e)
	}
}
