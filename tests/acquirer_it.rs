// crates.io
use httpmock::prelude::*;
// self
use oauth2_rpc_agent::{
	_preludet::*,
	agent::AgentBuilder,
	auth::{AccessToken, ScopeSet, TokenRequest},
	error::{ErrorKind, ErrorRegistry},
	http::ReqwestTransportErrorMapper,
	store::{CacheStore, MemoryStore},
};

const CLIENT_ID: &str = "acquirer-web";
const CLIENT_SECRET: &str = "acquirer-secret";

async fn mock_success(server: &MockServer) -> httpmock::Mock<'_> {
	server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/auth/token")
				.header("content-type", "application/json")
				.header("accept", "application/json");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"tok1\",\"refresh_token\":\"r2\",\"token_type\":\"bearer\",\"expires_in\":900,\"scope\":\"orders:read\"}",
			);
		})
		.await
}

#[tokio::test]
async fn cached_tokens_are_served_without_network_calls() {
	let server = MockServer::start_async().await;
	let mock = mock_success(&server).await;
	let (agent, store) = build_reqwest_test_agent(&server.base_url(), CLIENT_ID, CLIENT_SECRET);
	let request = TokenRequest::password("alice", "pw");
	let first = agent.ensure_token(&request, false).await.expect("First acquisition should succeed.");
	let second = agent.ensure_token(&request, false).await.expect("Cached acquisition should succeed.");

	assert_eq!(first.access_token.expose(), "tok1");
	assert_eq!(first.refresh_token.as_ref().map(|secret| secret.expose()), Some("r2"));
	assert_eq!(first.token_type.as_deref(), Some("bearer"));
	assert!(first.expires_at.is_some());
	assert_eq!(second, first);
	assert_eq!(store.len(), 1);

	mock.assert_calls_async(1).await;

	agent.ensure_token(&request, true).await.expect("Forced acquisition should succeed.");

	mock.assert_calls_async(2).await;
}

#[tokio::test]
async fn concurrent_cold_requests_share_one_exchange() {
	let server = MockServer::start_async().await;
	let mock = mock_success(&server).await;
	let (agent, _store) = build_reqwest_test_agent(&server.base_url(), CLIENT_ID, CLIENT_SECRET);
	let request = TokenRequest::password("alice", "pw");
	let (first, second) =
		tokio::join!(agent.ensure_token(&request, false), agent.ensure_token(&request, false));

	assert_eq!(first.expect("First concurrent call should succeed.").access_token.expose(), "tok1");
	assert_eq!(second.expect("Second concurrent call should succeed.").access_token.expose(), "tok1");

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn request_body_carries_client_details_and_grant_fields() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/auth/token")
				.body_includes("\"grant_type\":\"refresh_token\"")
				.body_includes("\"refresh_token\":\"r1\"")
				.body_includes(format!("\"client_id\":\"{CLIENT_ID}\""))
				.body_includes(format!("\"client_secret\":\"{CLIENT_SECRET}\""))
				.body_includes("\"scope\":\"orders:read profile\"");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"tok-refresh\"}");
		})
		.await;
	let (agent, _store) = build_reqwest_test_agent(&server.base_url(), CLIENT_ID, CLIENT_SECRET);
	let scope = ScopeSet::new(["profile", "orders:read"]).expect("Fixture scope should be valid.");
	let token = agent
		.ensure_token(&TokenRequest::refresh("r1").with_scope(scope), false)
		.await
		.expect("Refresh acquisition should succeed.");

	assert_eq!(token.access_token.expose(), "tok-refresh");
	assert_eq!(token.expires_at, None);

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn expired_cache_entries_trigger_a_new_exchange() {
	let server = MockServer::start_async().await;
	let mock = mock_success(&server).await;
	let (agent, _store) = build_reqwest_test_agent(&server.base_url(), CLIENT_ID, CLIENT_SECRET);
	let request = TokenRequest::password("alice", "pw");
	let stale = AccessToken::new("stale")
		.issued_at(OffsetDateTime::now_utc() - Duration::hours(2))
		.expires_in(Duration::hours(1));

	agent
		.cache()
		.put(&request.clone().with_client_defaults(agent.client()), &stale)
		.await
		.expect("Seeding the cache should succeed.");

	let token = agent.ensure_token(&request, false).await.expect("Acquisition should succeed.");

	assert_eq!(token.access_token.expose(), "tok1");

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn underivable_grant_fails_before_any_exchange() {
	let server = MockServer::start_async().await;
	let mock = mock_success(&server).await;
	let (agent, _store) = build_reqwest_test_agent(&server.base_url(), CLIENT_ID, CLIENT_SECRET);
	let err = agent
		.ensure_token(&TokenRequest::new(), false)
		.await
		.expect_err("A bare request should not derive a grant.");

	assert_eq!(err.kind(), &ErrorKind::InvalidGrantType);
	assert!(err.is_ensured());
	assert!(!err.requires_reauthentication());

	mock.assert_calls_async(0).await;
}

#[tokio::test]
async fn non_json_success_is_a_protocol_violation() {
	let server = MockServer::start_async().await;
	let _mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/token");
			then.status(200).header("content-type", "text/html").body("<html>login</html>");
		})
		.await;
	let (agent, store) = build_reqwest_test_agent(&server.base_url(), CLIENT_ID, CLIENT_SECRET);
	let err = agent
		.ensure_token(&TokenRequest::password("alice", "pw"), false)
		.await
		.expect_err("HTML success body should be rejected.");

	assert_eq!(err.kind(), &ErrorKind::ProtocolViolation);
	assert_eq!(err.http_code(), 500);
	assert!(store.is_empty());
}

#[tokio::test]
async fn missing_access_token_is_a_protocol_violation() {
	let server = MockServer::start_async().await;
	let _mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"token_type\":\"bearer\"}");
		})
		.await;
	let (agent, _store) = build_reqwest_test_agent(&server.base_url(), CLIENT_ID, CLIENT_SECRET);
	let err = agent
		.ensure_token(&TokenRequest::password("alice", "pw"), false)
		.await
		.expect_err("Success body without access_token should be rejected.");

	assert_eq!(err.kind(), &ErrorKind::ProtocolViolation);
	assert!(err.message().contains("access_token"));
}

#[tokio::test]
async fn error_envelope_in_success_body_uses_the_registry() {
	let server = MockServer::start_async().await;
	let _mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"error\":{\"code\":-32000,\"message\":\"Account locked.\",\"data\":{\"code\":17}}}",
			);
		})
		.await;
	let store: Arc<dyn CacheStore> = Arc::new(MemoryStore::default());
	let agent = AgentBuilder::new()
		.server_uri(Url::parse(&server.base_url()).expect("Mock server URI should parse."))
		.client_id(CLIENT_ID)
		.store(store)
		.registry(ErrorRegistry::default().register_kind(17, "AccountLocked", 403))
		.build_with_http_client(test_reqwest_http_client(), ReqwestTransportErrorMapper)
		.expect("Agent with registry should build.");
	let err = agent
		.ensure_token(&TokenRequest::password("alice", "pw"), false)
		.await
		.expect_err("Error envelope should be raised.");

	assert_eq!(err.app_code(), Some(17));
	assert_eq!(err.http_code(), 403);
	assert_eq!(err.message(), "Account locked.");
}

#[tokio::test]
async fn non_success_statuses_are_normalized() {
	let server = MockServer::start_async().await;
	let _mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/token");
			then.status(503).header("content-type", "text/plain").body("upstream unavailable");
		})
		.await;
	let (agent, _store) = build_reqwest_test_agent(&server.base_url(), CLIENT_ID, CLIENT_SECRET);
	let err = agent
		.ensure_token(&TokenRequest::password("alice", "pw"), false)
		.await
		.expect_err("A 503 should be raised.");

	assert_eq!(err.kind(), &ErrorKind::Remote);
	assert_eq!(err.http_code(), 503);
	assert_eq!(err.message(), "upstream unavailable");
}

#[tokio::test]
async fn invalidate_removes_the_cached_token() {
	let server = MockServer::start_async().await;
	let mock = mock_success(&server).await;
	let (agent, store) = build_reqwest_test_agent(&server.base_url(), CLIENT_ID, CLIENT_SECRET);
	let request = TokenRequest::password("alice", "pw");

	agent.ensure_token(&request, false).await.expect("Acquisition should succeed.");
	agent.invalidate(&request).await.expect("Invalidation should succeed.");

	assert!(store.is_empty());

	agent.ensure_token(&request, false).await.expect("Re-acquisition should succeed.");

	mock.assert_calls_async(2).await;
}
