//! Priority-ordered conversion from [`RawError`] into the normalized [`Error`].

// self
use crate::{
	_prelude::*,
	error::{ErrorFields, ErrorKind, ErrorRegistry, RawError},
};

const DEFAULT_HTTP_CODE: u16 = 500;
const UNKNOWN_MESSAGE: &str = "Unknown error.";

/// Converts raw failures into normalized errors using a shared code registry.
///
/// Rules apply in order and the first match wins:
///
/// 1. errors already marked `ensured` are returned unchanged;
/// 2. wrapper envelopes are unwrapped one level;
/// 3. registered application codes rebuild their typed error;
/// 4. envelopes carrying an HTTP-equivalent code become generic errors with that code;
/// 5. envelopes carrying only a code default to 500 (or the caller's fallback);
/// 6. anything else is synthesized from the fields that are present.
#[derive(Clone, Debug, Default)]
pub struct ErrorNormalizer {
	registry: Arc<ErrorRegistry>,
}
impl ErrorNormalizer {
	/// Creates a normalizer backed by `registry`.
	pub fn new(registry: impl Into<Arc<ErrorRegistry>>) -> Self {
		Self { registry: registry.into() }
	}

	/// Registry consulted for application codes.
	pub fn registry(&self) -> &ErrorRegistry {
		&self.registry
	}

	/// Normalizes `raw`; `fallback_http_code` replaces the 500 default when the raw error
	/// carries no HTTP-equivalent code.
	pub fn normalize(&self, raw: impl Into<RawError>, fallback_http_code: Option<u16>) -> Error {
		let fallback = fallback_http_code.unwrap_or(DEFAULT_HTTP_CODE);

		match raw.into() {
			RawError::Typed(error) if error.is_ensured() => error,
			RawError::Typed(error) => error.ensure(),
			RawError::Wrapped(inner) => self.normalize(*inner, fallback_http_code),
			RawError::Fields(fields) => self.normalize_fields(fields, fallback),
			RawError::Transport { source, status } => {
				let message = source.to_string();

				Error::new(ErrorKind::Transport, status.unwrap_or(fallback), message)
					.with_shared_source(Some(source))
					.ensure()
			},
		}
	}

	fn normalize_fields(&self, fields: ErrorFields, fallback: u16) -> Error {
		if let Some(error) = self.registry.construct(&fields) {
			return error.ensure();
		}

		let ErrorFields { code, http_code, message, data } = fields;
		let message = message.unwrap_or_else(|| match code {
			Some(code) => format!("Remote error {code}."),
			None => UNKNOWN_MESSAGE.to_owned(),
		});
		let error = match (http_code, code) {
			(Some(http_code), _) => Error::remote(http_code, message),
			(None, Some(_)) => Error::new(ErrorKind::Remote, fallback, message),
			(None, None) => Error::new(ErrorKind::for_http_code(fallback), fallback, message),
		};
		let error = match data {
			Some(data) => error.with_data(data),
			None => error,
		};

		error.ensure()
	}
}

/// Normalizes with the default (empty) registry.
pub fn normalize(raw: impl Into<RawError>, fallback_http_code: Option<u16>) -> Error {
	ErrorNormalizer::default().normalize(raw, fallback_http_code)
}
