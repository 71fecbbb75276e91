//! Token Acquirer: cache-first token retrieval with singleflight guards.
//!
//! [`TokenAcquirer::ensure_token`] fills client defaults into the request, serves usable cached
//! tokens without touching the network, and otherwise derives a grant type and performs one
//! JSON exchange against `{server}/auth/token`. Concurrent callers with the same cache key share
//! a per-key guard so a cold cache triggers a single exchange. Every failure leaves through the
//! [`ErrorNormalizer`].

// crates.io
use oauth2::http::{
	Method, Request,
	header::{ACCEPT, CONTENT_TYPE},
};
use serde_json::Map;
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ClientDetails, GrantType, ScopeSet, TokenRequest},
	error::{ErrorNormalizer, RawError},
	http::{HttpResponse, TokenHttpClient, TransportErrorMapper},
	obs::{self, OpKind, OpOutcome, OpSpan},
	store::{CacheKey, TokenCache},
};

const JSON_MEDIA_TYPE: &str = "application/json";

type FlowGuards = Arc<Mutex<HashMap<CacheKey, Arc<AsyncMutex<()>>>>>;

/// Obtains bearer tokens for [`TokenRequest`]s, consulting the [`TokenCache`] first.
pub struct TokenAcquirer<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	http_client: Arc<C>,
	transport_mapper: Arc<M>,
	cache: TokenCache,
	normalizer: ErrorNormalizer,
	client: ClientDetails,
	token_endpoint: Url,
	flow_guards: FlowGuards,
}
impl<C, M> TokenAcquirer<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates an acquirer that exchanges grants at `token_endpoint`.
	pub fn new(
		http_client: impl Into<Arc<C>>,
		transport_mapper: impl Into<Arc<M>>,
		cache: TokenCache,
		normalizer: ErrorNormalizer,
		client: ClientDetails,
		token_endpoint: Url,
	) -> Self {
		Self {
			http_client: http_client.into(),
			transport_mapper: transport_mapper.into(),
			cache,
			normalizer,
			client,
			token_endpoint,
			flow_guards: Default::default(),
		}
	}

	/// Token endpoint receiving grant exchanges.
	pub fn token_endpoint(&self) -> &Url {
		&self.token_endpoint
	}

	/// Client registration applied to every request.
	pub fn client(&self) -> &ClientDetails {
		&self.client
	}

	/// Cache shared with the orchestrator.
	pub fn cache(&self) -> &TokenCache {
		&self.cache
	}

	/// Returns a usable token for `request`.
	///
	/// Unless `force_new` is set, a cached token with a non-empty credential that has not
	/// expired is returned without any network call. Otherwise the grant type is derived from
	/// the request, exchanged at the token endpoint, and the result replaces the cache entry.
	pub async fn ensure_token(&self, request: &TokenRequest, force_new: bool) -> Result<AccessToken> {
		const KIND: OpKind = OpKind::TokenAcquisition;

		let span = OpSpan::new(KIND, "ensure_token");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span
			.instrument(self.acquire(request, force_new))
			.await
			.map_err(|e| self.normalizer.normalize(e, None));

		match &result {
			Ok(_) => obs::record_op_outcome(KIND, OpOutcome::Success),
			Err(_) => obs::record_op_outcome(KIND, OpOutcome::Failure),
		}

		result
	}

	/// Drops the cached token for `request` (after client defaults are applied).
	pub async fn invalidate(&self, request: &TokenRequest) -> Result<()> {
		let request = request.clone().with_client_defaults(&self.client);

		self.cache.delete(&request).await.map_err(|e| self.normalizer.normalize(Error::from(e), None))
	}

	async fn acquire(&self, request: &TokenRequest, force_new: bool) -> Result<AccessToken> {
		let request = request.clone().with_client_defaults(&self.client);

		if !force_new {
			let cached = self.cached(&request).await?;

			if let Some(token) = cached {
				return Ok(token);
			}
		}

		let Some(key) = TokenCache::compute_key(&request) else {
			return self.exchange_and_cache(&request).await;
		};
		let guard = self.flow_guard(key);
		let result = {
			let _singleflight = guard.lock().await;

			self.refill(&request, force_new).await
		};

		self.release_flow_guard(key, &guard);

		result
	}

	async fn refill(&self, request: &TokenRequest, force_new: bool) -> Result<AccessToken> {
		// Another caller may have filled the entry while this one waited on the guard.
		if !force_new {
			let cached = self.cached(request).await?;

			if let Some(token) = cached {
				return Ok(token);
			}
		}

		self.exchange_and_cache(request).await
	}

	async fn exchange_and_cache(&self, request: &TokenRequest) -> Result<AccessToken> {
		let grant = request.effective_grant_type()?;
		let token = self.exchange(grant, request).await?;

		self.cache.put(request, &token).await?;

		Ok(token)
	}

	async fn cached(&self, request: &TokenRequest) -> Result<Option<AccessToken>> {
		let now = OffsetDateTime::now_utc();
		let cached = self.cache.get(request).await?;

		Ok(cached.filter(|token| token.is_usable() && !token.is_expired_at(now)))
	}

	fn flow_guard(&self, key: CacheKey) -> Arc<AsyncMutex<()>> {
		let mut guards = self.flow_guards.lock();

		guards.entry(key).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
	}

	fn release_flow_guard(&self, key: CacheKey, guard: &Arc<AsyncMutex<()>>) {
		let mut guards = self.flow_guards.lock();

		// Only the map and this caller hold the guard, so nobody is queued behind it.
		if Arc::strong_count(guard) == 2 {
			guards.remove(&key);
		}
	}

	#[cfg(test)]
	fn flow_guard_count(&self) -> usize {
		self.flow_guards.lock().len()
	}

	async fn exchange(&self, grant: GrantType, request: &TokenRequest) -> Result<AccessToken> {
		let body = grant_body(grant, request, &self.client);
		let payload = serde_json::to_vec(&Value::Object(body)).map_err(|e| {
			Error::config(format!("Token request body cannot be encoded: {e}.")).with_source(e)
		})?;
		let http_request = Request::builder()
			.method(Method::POST)
			.uri(self.token_endpoint.as_str())
			.header(CONTENT_TYPE, JSON_MEDIA_TYPE)
			.header(ACCEPT, JSON_MEDIA_TYPE)
			.body(payload)
			.map_err(|e| {
				Error::config(format!("Token request cannot be built: {e}.")).with_source(e)
			})?;
		let response = self.http_client.execute(http_request).await.map_err(|e| {
			self.normalizer.normalize(self.transport_mapper.map_transport_error(e), None)
		})?;

		self.parse_token_response(response)
	}

	fn parse_token_response(&self, response: HttpResponse) -> Result<AccessToken> {
		let status = response.status();
		let body = response.body();

		if !status.is_success() {
			let status = status.as_u16();

			return Err(self.normalizer.normalize(RawError::from_http(status, body), Some(status)));
		}
		if !has_json_content_type(&response) {
			return Err(Error::protocol_violation(format!(
				"Token endpoint answered HTTP {} with a non-JSON content type.",
				status.as_u16()
			)));
		}

		let value = serde_json::from_slice::<Value>(body).map_err(|e| {
			Error::protocol_violation(format!("Token response is not valid JSON: {e}.")).with_source(e)
		})?;

		if value.get("error").is_some_and(|error| !error.is_null()) {
			return Err(self.normalizer.normalize(RawError::from_json(value), None));
		}

		let payload = serde_path_to_error::deserialize::<_, TokenResponse>(value).map_err(|e| {
			Error::protocol_violation(format!("Token response has an unexpected shape: {e}."))
				.with_source(e)
		})?;

		payload.into_access_token()
	}
}
impl<C, M> Debug for TokenAcquirer<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenAcquirer")
			.field("token_endpoint", &self.token_endpoint.as_str())
			.field("client_id", &self.client.client_id)
			.field("client_secret_set", &self.client.client_secret.is_some())
			.finish()
	}
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
	#[serde(default)]
	access_token: Option<String>,
	#[serde(default)]
	refresh_token: Option<String>,
	#[serde(default)]
	token_type: Option<String>,
	#[serde(default)]
	expires_in: Option<i64>,
	#[serde(default)]
	scope: Option<String>,
}
impl TokenResponse {
	fn into_access_token(self) -> Result<AccessToken> {
		let access_token = self
			.access_token
			.filter(|token| !token.is_empty())
			.ok_or_else(|| Error::protocol_violation("Token response is missing `access_token`."))?;
		let mut token = AccessToken::new(access_token);

		if let Some(refresh_token) = self.refresh_token.filter(|token| !token.is_empty()) {
			token = token.with_refresh_token(refresh_token);
		}
		if let Some(token_type) = self.token_type {
			token = token.with_token_type(token_type);
		}
		// Providers that report a non-positive lifetime get no local expiry.
		if let Some(seconds) = self.expires_in.filter(|seconds| *seconds > 0) {
			let expires_at = token.issued_at.checked_add(Duration::seconds(seconds)).ok_or_else(|| {
				Error::protocol_violation(format!(
					"Token response `expires_in` of {seconds} seconds is out of range."
				))
			})?;

			token.expires_at = Some(expires_at);
		}
		if let Some(scope) = self.scope.and_then(|scope| scope.parse::<ScopeSet>().ok()) {
			token = token.with_scope(scope);
		}

		Ok(token)
	}
}

fn grant_body(grant: GrantType, request: &TokenRequest, client: &ClientDetails) -> Map<String, Value> {
	let mut body = Map::new();

	body.insert("grant_type".into(), grant.as_str().into());

	if let Some(client_id) = &request.client_id {
		body.insert("client_id".into(), client_id.to_string().into());
	}
	if let Some(secret) = &client.client_secret {
		body.insert("client_secret".into(), secret.expose().into());
	}
	if let Some(redirect_uri) = &request.redirect_uri {
		body.insert("redirect_uri".into(), redirect_uri.as_str().into());
	}
	if !request.scope.is_empty() {
		body.insert("scope".into(), request.scope.normalized().into());
	}
	if let Some(refresh_token) = &request.refresh_token {
		body.insert("refresh_token".into(), refresh_token.expose().into());
	}
	if let Some(username) = &request.username {
		body.insert("username".into(), username.as_str().into());
	}
	if let Some(password) = &request.password {
		body.insert("password".into(), password.expose().into());
	}
	if let Some(code) = &request.code {
		body.insert("code".into(), code.expose().into());
	}

	body
}

fn has_json_content_type(response: &HttpResponse) -> bool {
	response
		.headers()
		.get(CONTENT_TYPE)
		.and_then(|value| value.to_str().ok())
		.and_then(|value| value.split(';').next())
		.is_some_and(|media_type| {
			let media_type = media_type.trim().to_ascii_lowercase();

			media_type == JSON_MEDIA_TYPE || media_type.ends_with("+json")
		})
}
