//! Agent construction from builder calls or deserialized configuration.

// std
use std::path::PathBuf;
// self
use crate::{
	_prelude::*,
	acquirer::TokenAcquirer,
	agent::OAuthAgent,
	auth::{ClientDetails, ClientId, GrantType, IdentifierError, TokenSecret},
	error::{ErrorNormalizer, ErrorRegistry},
	escalation::GrantEscalation,
	http::{TokenHttpClient, TransportErrorMapper},
	store::{CacheStore, FileStore, MemoryStore, StoreError, TokenCache},
};
#[cfg(feature = "reqwest")]
use crate::http::{ReqwestHttpClient, ReqwestTransportErrorMapper};

const TOKEN_PATH: &str = "auth/token";

/// Errors raised while validating agent configuration.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum AgentConfigError {
	/// The server URI is mandatory.
	#[error("Missing server URI.")]
	MissingServerUri,
	/// The client identifier is mandatory.
	#[error("Missing client identifier.")]
	MissingClientId,
	/// The server URI cannot carry the token endpoint path.
	#[error("Server URI cannot be a base URL: {url}.")]
	ServerUriCannotBeABase {
		/// Server URI that failed validation.
		url: String,
	},
	/// The client identifier failed validation.
	#[error("Invalid client identifier: {0}")]
	InvalidClientId(#[from] IdentifierError),
	/// A grant appears more than once in the escalation list.
	#[error("Grant `{grant}` appears more than once in the escalation list.")]
	DuplicateGrant {
		/// Repeated grant.
		grant: GrantType,
	},
	/// The token endpoint could not be derived from the server URI.
	#[error("Token endpoint cannot be derived from the server URI: {0}.")]
	TokenEndpoint(#[from] url::ParseError),
	/// The configured cache backend could not be opened.
	#[error("Cache store cannot be opened: {0}")]
	Store(#[from] StoreError),
}

/// Builder for [`OAuthAgent`] values.
pub struct AgentBuilder {
	server_uri: Option<Url>,
	client_id: Option<String>,
	client_secret: Option<TokenSecret>,
	redirect_uri: Option<Url>,
	allowed_grants: GrantEscalation,
	store: Option<Arc<dyn CacheStore>>,
	registry: ErrorRegistry,
}
impl AgentBuilder {
	/// Creates an empty builder; the server URI and client identifier must be set before
	/// building.
	pub fn new() -> Self {
		Self {
			server_uri: None,
			client_id: None,
			client_secret: None,
			redirect_uri: None,
			allowed_grants: GrantEscalation::default(),
			store: None,
			registry: ErrorRegistry::default(),
		}
	}

	/// Sets the server URI; the token endpoint is `{server_uri}/auth/token`.
	pub fn server_uri(mut self, url: Url) -> Self {
		self.server_uri = Some(url);

		self
	}

	/// Sets the OAuth client identifier (validated at build time).
	pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
		self.client_id = Some(client_id.into());

		self
	}

	/// Sets the client secret sent with every grant.
	pub fn client_secret(mut self, secret: impl Into<TokenSecret>) -> Self {
		self.client_secret = Some(secret.into());

		self
	}

	/// Sets the redirect URI registered for the client.
	pub fn redirect_uri(mut self, url: Url) -> Self {
		self.redirect_uri = Some(url);

		self
	}

	/// Replaces the escalation grant list.
	pub fn allowed_grants<I>(mut self, grants: I) -> Self
	where
		I: IntoIterator<Item = GrantType>,
	{
		self.allowed_grants = GrantEscalation::new(grants);

		self
	}

	/// Overrides the cache backend (defaults to [`MemoryStore`]).
	pub fn store(mut self, store: Arc<dyn CacheStore>) -> Self {
		self.store = Some(store);

		self
	}

	/// Overrides the application error registry.
	pub fn registry(mut self, registry: ErrorRegistry) -> Self {
		self.registry = registry;

		self
	}

	/// Validates the configuration and builds an agent over the provided transport + mapper.
	pub fn build_with_http_client<C, M>(
		self,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Result<OAuthAgent<C, M>, AgentConfigError>
	where
		C: TokenHttpClient,
		M: TransportErrorMapper<C::TransportError>,
	{
		let server_uri = self.server_uri.ok_or(AgentConfigError::MissingServerUri)?;
		let token_endpoint = token_endpoint(&server_uri)?;
		let client_id = ClientId::new(self.client_id.ok_or(AgentConfigError::MissingClientId)?)?;

		validate_grants(&self.allowed_grants)?;

		let mut client = ClientDetails::new(client_id);

		client.client_secret = self.client_secret;
		client.redirect_uri = self.redirect_uri;

		let store: Arc<dyn CacheStore> = match self.store {
			Some(store) => store,
			None => Arc::new(MemoryStore::default()),
		};
		let normalizer = ErrorNormalizer::new(self.registry);
		let acquirer = TokenAcquirer::new(
			http_client,
			mapper,
			TokenCache::new(store),
			normalizer.clone(),
			client,
			token_endpoint,
		);

		Ok(OAuthAgent::from_parts(Arc::new(acquirer), self.allowed_grants, normalizer))
	}

	/// Validates the configuration and builds an agent over the default reqwest transport.
	#[cfg(feature = "reqwest")]
	pub fn build(
		self,
	) -> Result<OAuthAgent<ReqwestHttpClient, ReqwestTransportErrorMapper>, AgentConfigError> {
		self.build_with_http_client(ReqwestHttpClient::default(), ReqwestTransportErrorMapper)
	}
}
impl Default for AgentBuilder {
	fn default() -> Self {
		Self::new()
	}
}
impl Debug for AgentBuilder {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AgentBuilder")
			.field("server_uri", &self.server_uri.as_ref().map(Url::as_str))
			.field("client_id", &self.client_id)
			.field("client_secret_set", &self.client_secret.is_some())
			.field("redirect_uri", &self.redirect_uri.as_ref().map(Url::as_str))
			.field("allowed_grants", &self.allowed_grants)
			.field("store_set", &self.store.is_some())
			.field("registry", &self.registry)
			.finish()
	}
}

/// Serializable agent settings, convertible into an [`AgentBuilder`].
///
/// ```json
/// {
///   "server_uri": "https://api.example.com/",
///   "client_id": "web",
///   "client_secret": "s3cret",
///   "allowed_grants": ["refresh_token", "password"],
///   "cache_path": "/var/lib/app/tokens.json"
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentConfig {
	/// Base URI of the RPC server; the token endpoint is derived from it.
	pub server_uri: Url,
	/// OAuth client identifier.
	pub client_id: String,
	/// Optional client secret.
	#[serde(default)]
	pub client_secret: Option<TokenSecret>,
	/// Optional redirect URI.
	#[serde(default)]
	pub redirect_uri: Option<Url>,
	/// Escalation grant list; the default order applies when omitted.
	#[serde(default)]
	pub allowed_grants: Option<Vec<GrantType>>,
	/// Snapshot path for a [`FileStore`]; tokens stay in memory when omitted.
	#[serde(default)]
	pub cache_path: Option<PathBuf>,
}
impl AgentConfig {
	/// Converts the settings into a builder, opening the file cache when configured.
	pub fn into_builder(self) -> Result<AgentBuilder, AgentConfigError> {
		let mut builder = AgentBuilder::new().server_uri(self.server_uri).client_id(self.client_id);

		if let Some(secret) = self.client_secret {
			builder = builder.client_secret(secret);
		}
		if let Some(redirect_uri) = self.redirect_uri {
			builder = builder.redirect_uri(redirect_uri);
		}
		if let Some(grants) = self.allowed_grants {
			builder = builder.allowed_grants(grants);
		}
		if let Some(path) = self.cache_path {
			builder = builder.store(Arc::new(FileStore::open(path)?));
		}

		Ok(builder)
	}
}

fn token_endpoint(server_uri: &Url) -> Result<Url, AgentConfigError> {
	if server_uri.cannot_be_a_base() {
		return Err(AgentConfigError::ServerUriCannotBeABase { url: server_uri.to_string() });
	}

	let mut base = server_uri.clone();

	base.set_query(None);
	base.set_fragment(None);

	if !base.path().ends_with('/') {
		let path = format!("{}/", base.path());

		base.set_path(&path);
	}

	Ok(base.join(TOKEN_PATH)?)
}

fn validate_grants(grants: &GrantEscalation) -> Result<(), AgentConfigError> {
	let mut seen = Vec::with_capacity(grants.len());

	for grant in grants.grants() {
		if seen.contains(grant) {
			return Err(AgentConfigError::DuplicateGrant { grant: *grant });
		}

		seen.push(*grant);
	}

	Ok(())
}
