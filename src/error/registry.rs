//! Application error code registry used to rebuild typed errors.

// self
use crate::{_prelude::*, error::ErrorFields};

/// Constructor invoked for a registered application code.
pub type ErrorConstructor = Arc<dyn Fn(i64, &ErrorFields) -> Error + Send + Sync>;

/// Maps integer application codes to error constructors.
#[derive(Clone, Default)]
pub struct ErrorRegistry(HashMap<i64, ErrorConstructor>);
impl ErrorRegistry {
	/// Registers a custom constructor for `code`, replacing any previous entry.
	pub fn register<F>(mut self, code: i64, constructor: F) -> Self
	where
		F: 'static + Send + Sync + Fn(i64, &ErrorFields) -> Error,
	{
		self.0.insert(code, Arc::new(constructor));

		self
	}

	/// Registers a named application error that reports `http_code`.
	///
	/// The remote message is kept when present; otherwise the name doubles as the message.
	pub fn register_kind(self, code: i64, name: &'static str, http_code: u16) -> Self {
		self.register(code, move |code, fields| {
			let message = fields.message.clone().unwrap_or_else(|| name.to_owned());
			let error = Error::application(code, name, http_code, message);

			match fields.data.clone() {
				Some(data) => error.with_data(data),
				None => error,
			}
		})
	}

	/// Returns `true` if `code` has a constructor.
	pub fn contains(&self, code: i64) -> bool {
		self.0.contains_key(&code)
	}

	/// Rebuilds the typed error for the first registered candidate code.
	pub fn construct(&self, fields: &ErrorFields) -> Option<Error> {
		fields
			.app_code_candidates()
			.find_map(|code| self.0.get(&code).map(|constructor| constructor(code, fields)))
	}
}
impl Debug for ErrorRegistry {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let mut codes = self.0.keys().copied().collect::<Vec<_>>();

		codes.sort_unstable();

		f.debug_tuple("ErrorRegistry").field(&codes).finish()
	}
}
