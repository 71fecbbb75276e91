//! Raw error shapes collected before normalization.

// self
use crate::{_prelude::*, error::SharedSource};

const BODY_PREVIEW_LIMIT: usize = 256;

/// Heterogeneous failure as reported by an HTTP client, a token endpoint, or an RPC transport.
#[derive(Clone, Debug)]
pub enum RawError {
	/// Structured error produced by this crate (normalized or not yet).
	Typed(Error),
	/// Envelope wrapping an inner `error` object.
	Wrapped(Box<RawError>),
	/// Protocol-layer error envelope described by loose fields.
	Fields(ErrorFields),
	/// Network-level failure below the HTTP/RPC layer.
	Transport {
		/// Underlying client failure.
		source: SharedSource,
		/// HTTP-equivalent status, when the client could determine one.
		status: Option<u16>,
	},
}
impl RawError {
	/// Starts an empty [`ErrorFields`] envelope.
	pub fn fields() -> ErrorFields {
		ErrorFields::default()
	}

	/// Wraps a transport failure.
	pub fn transport(source: impl 'static + Send + Sync + StdError, status: Option<u16>) -> Self {
		Self::Transport { source: Arc::new(source), status }
	}

	/// Parses a JSON error envelope.
	///
	/// An object with an `error` object is treated as a wrapper. OAuth-style bodies where
	/// `error` is a string use `error_description` (or the error string) as the message.
	/// Everything else is read field by field.
	pub fn from_json(value: Value) -> Self {
		if let Some(inner) = value.get("error").filter(|inner| inner.is_object()) {
			return Self::Wrapped(Box::new(Self::from_json(inner.clone())));
		}
		if let Some(error) = value.get("error").and_then(Value::as_str).map(ToOwned::to_owned) {
			let message = value
				.get("error_description")
				.and_then(Value::as_str)
				.map(ToOwned::to_owned)
				.unwrap_or(error);
			let mut fields = ErrorFields::default().message(message);

			fields.http_code = read_http_code(&value);
			fields.data = Some(value);

			return Self::Fields(fields);
		}

		let mut fields = ErrorFields::default();

		fields.code = value.get("code").and_then(Value::as_i64);
		fields.http_code = read_http_code(&value);
		fields.message = value.get("message").and_then(Value::as_str).map(ToOwned::to_owned);
		fields.data = value.get("data").filter(|data| !data.is_null()).cloned();

		if fields.is_empty() {
			fields.message = Some(value.to_string());
		}

		Self::Fields(fields)
	}

	/// Describes an HTTP-layer failure.
	///
	/// JSON bodies are parsed with [`RawError::from_json`]; anything else becomes a message built
	/// from a truncated body preview. The status fills in for envelopes that carry none.
	pub fn from_http(status: u16, body: &[u8]) -> Self {
		match serde_json::from_slice::<Value>(body) {
			Ok(value @ Value::Object(_)) => Self::from_json(value).with_default_http_code(status),
			_ => {
				let preview = String::from_utf8_lossy(body);
				let message = if preview.trim().is_empty() {
					format!("Request failed with HTTP status {status}.")
				} else {
					truncate_preview(preview.trim())
				};

				Self::Fields(ErrorFields::default().message(message).http_code(status))
			},
		}
	}

	fn with_default_http_code(self, status: u16) -> Self {
		match self {
			Self::Wrapped(inner) => Self::Wrapped(Box::new(inner.with_default_http_code(status))),
			Self::Fields(mut fields) => {
				fields.http_code.get_or_insert(status);

				Self::Fields(fields)
			},
			other => other,
		}
	}
}
impl From<Error> for RawError {
	fn from(e: Error) -> Self {
		Self::Typed(e)
	}
}
impl From<ErrorFields> for RawError {
	fn from(fields: ErrorFields) -> Self {
		Self::Fields(fields)
	}
}

/// Loose error envelope fields.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorFields {
	/// Application or protocol error code.
	pub code: Option<i64>,
	/// HTTP-equivalent status carried by the envelope.
	pub http_code: Option<u16>,
	/// Human-readable message.
	pub message: Option<String>,
	/// Structured payload; `data.code` may carry the application code.
	pub data: Option<Value>,
}
impl ErrorFields {
	/// Sets the error code.
	pub fn code(mut self, code: i64) -> Self {
		self.code = Some(code);

		self
	}

	/// Sets the HTTP-equivalent status.
	pub fn http_code(mut self, http_code: u16) -> Self {
		self.http_code = Some(http_code);

		self
	}

	/// Sets the message.
	pub fn message(mut self, message: impl Into<String>) -> Self {
		self.message = Some(message.into());

		self
	}

	/// Sets the structured payload.
	pub fn data(mut self, data: Value) -> Self {
		self.data = Some(data);

		self
	}

	/// Candidate application codes in lookup order: `data.code`, then `code`.
	pub fn app_code_candidates(&self) -> impl Iterator<Item = i64> {
		let nested = self.data.as_ref().and_then(|data| data.get("code")).and_then(Value::as_i64);

		nested.into_iter().chain(self.code)
	}

	fn is_empty(&self) -> bool {
		self.code.is_none()
			&& self.http_code.is_none()
			&& self.message.is_none()
			&& self.data.is_none()
	}
}

fn read_http_code(value: &Value) -> Option<u16> {
	["httpCode", "http_code", "statusCode", "status"]
		.iter()
		.filter_map(|key| value.get(*key).and_then(Value::as_u64))
		.find_map(|code| u16::try_from(code).ok())
}

fn truncate_preview(body: &str) -> String {
	if body.chars().count() <= BODY_PREVIEW_LIMIT {
		return body.to_owned();
	}

	let mut buf = body.chars().take(BODY_PREVIEW_LIMIT).collect::<String>();

	buf.push('…');

	buf
}
