// crates.io
use httpmock::prelude::*;
use serde_json::json;
// self
use oauth2_rpc_agent::{
	_preludet::*,
	agent::AgentBuilder,
	auth::{GrantType, TokenRequest},
	error::{ErrorKind, ErrorRegistry, RawError},
	http::ReqwestTransportErrorMapper,
	rpc::SharedHeaders,
	store::{CacheStore, MemoryStore},
};

const CLIENT_ID: &str = "rpc-web";
const CLIENT_SECRET: &str = "rpc-secret";

async fn mock_token_endpoint<'a>(server: &'a MockServer, access_token: &str) -> httpmock::Mock<'a> {
	let body = json!({ "access_token": access_token, "token_type": "bearer", "expires_in": 600 });

	server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/token");
			then.status(200).header("content-type", "application/json").body(body.to_string());
		})
		.await
}

fn unauthorized() -> RawError {
	RawError::fields().code(-32001).http_code(401).message("Token rejected.").into()
}

fn build_agent_with_grants(server: &MockServer, grants: &[GrantType]) -> ReqwestTestAgent {
	let store: Arc<dyn CacheStore> = Arc::new(MemoryStore::default());

	AgentBuilder::new()
		.server_uri(Url::parse(&server.base_url()).expect("Mock server URI should parse."))
		.client_id(CLIENT_ID)
		.client_secret(CLIENT_SECRET)
		.allowed_grants(grants.iter().copied())
		.store(store)
		.build_with_http_client(test_reqwest_http_client(), ReqwestTransportErrorMapper)
		.expect("Agent with custom grants should build.")
}

#[tokio::test]
async fn password_grant_token_is_attached_and_reused() {
	let server = MockServer::start_async().await;
	let mock = mock_token_endpoint(&server, "tok1").await;
	let (agent, _store) = build_reqwest_test_agent(&server.base_url(), CLIENT_ID, CLIENT_SECRET);
	let transport = Arc::new(ScriptedTransport::default());
	let headers = SharedHeaders::default();

	transport.otherwise(Ok(json!({ "orders": [1, 2] })));

	let proxy = agent.create_rpc_proxy(transport.clone(), headers.clone());
	let request = TokenRequest::password("alice", "pw");
	let first = proxy
		.invoke("orders.list", vec![json!("open")], Some(request.clone()))
		.await
		.expect("First authenticated call should succeed.");
	let second = proxy
		.invoke("orders.list", vec![json!("open")], Some(request))
		.await
		.expect("Second authenticated call should succeed.");

	assert_eq!(first, json!({ "orders": [1, 2] }));
	assert_eq!(second, first);

	mock.assert_calls_async(1).await;

	let calls = transport.calls();

	assert_eq!(calls.len(), 2);
	assert_eq!(calls[0].method, "orders.list");
	assert_eq!(calls[0].params, vec![json!("open")]);
	assert_eq!(calls[0].authorization(), Some("Bearer tok1"));
	assert_eq!(calls[1].authorization(), Some("Bearer tok1"));
	assert_eq!(
		headers.read().get("authorization").and_then(|value| value.to_str().ok()),
		Some("Bearer tok1")
	);
}

#[tokio::test]
async fn unauthorized_call_recovers_under_password_grant() {
	let server = MockServer::start_async().await;
	let password_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/token").body_includes("\"grant_type\":\"password\"");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"tok1\",\"token_type\":\"bearer\"}");
		})
		.await;
	let agent = build_agent_with_grants(&server, &[GrantType::Password]);
	let transport = Arc::new(ScriptedTransport::default());

	transport.push(Err(unauthorized())).push(Ok(json!("done")));

	let proxy = agent.create_rpc_proxy(transport.clone(), SharedHeaders::default());
	let result = proxy
		.invoke("orders.cancel", vec![json!(7)], Some(TokenRequest::password("alice", "pw")))
		.await
		.expect("Call should succeed after escalating once.");

	assert_eq!(result, json!("done"));
	assert_eq!(transport.calls().len(), 2);

	// One acquisition for the first attempt plus one forced acquisition for the retry.
	password_mock.assert_calls_async(2).await;
}

#[tokio::test]
async fn exhausted_escalation_returns_401_and_drops_the_cached_token() {
	let server = MockServer::start_async().await;
	let mock = mock_token_endpoint(&server, "tok1").await;
	let (agent, store) = build_reqwest_test_agent(&server.base_url(), CLIENT_ID, CLIENT_SECRET);
	let transport = Arc::new(ScriptedTransport::default());

	transport.otherwise(Err(unauthorized()));

	let proxy = agent.create_rpc_proxy(transport.clone(), SharedHeaders::default());
	let request = TokenRequest::password("alice", "pw");
	let err = proxy
		.invoke("orders.list", Vec::new(), Some(request.clone()))
		.await
		.expect_err("Call should fail once every grant was tried.");
	let attempts = agent.escalation().len() + 1;

	assert_eq!(err.kind(), &ErrorKind::Unauthorized);
	assert_eq!(err.http_code(), 401);
	assert_eq!(err.message(), "Token rejected.");
	assert!(err.is_ensured());
	assert_eq!(transport.calls().len(), attempts);

	mock.assert_calls_async(attempts).await;

	let cached = agent
		.cache()
		.get(&request.with_client_defaults(agent.client()))
		.await
		.expect("Cache lookup should succeed.");

	assert!(cached.is_none());
	assert!(store.is_empty());
}

#[tokio::test]
async fn rejected_token_acquisition_escalates_without_calling_the_transport() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/token");
			then.status(401)
				.header("content-type", "application/json")
				.body("{\"error\":\"invalid_grant\",\"error_description\":\"Bad credentials.\"}");
		})
		.await;
	let agent = build_agent_with_grants(&server, &[GrantType::RefreshToken, GrantType::Password]);
	let transport = Arc::new(ScriptedTransport::default());
	let proxy = agent.create_rpc_proxy(transport.clone(), SharedHeaders::default());
	let err = proxy
		.invoke("orders.list", Vec::new(), Some(TokenRequest::password("alice", "wrong")))
		.await
		.expect_err("Call should fail when the endpoint rejects every grant.");

	assert_eq!(err.kind(), &ErrorKind::Unauthorized);
	assert_eq!(err.http_code(), 401);
	assert_eq!(err.message(), "Bad credentials.");
	assert!(transport.calls().is_empty());

	mock.assert_calls_async(3).await;
}

#[tokio::test]
async fn application_errors_are_not_retried() {
	let server = MockServer::start_async().await;
	let mock = mock_token_endpoint(&server, "tok1").await;
	let store: Arc<dyn CacheStore> = Arc::new(MemoryStore::default());
	let agent = AgentBuilder::new()
		.server_uri(Url::parse(&server.base_url()).expect("Mock server URI should parse."))
		.client_id(CLIENT_ID)
		.store(store)
		.registry(ErrorRegistry::default().register_kind(42, "QuotaExceeded", 429))
		.build_with_http_client(test_reqwest_http_client(), ReqwestTransportErrorMapper)
		.expect("Agent with registry should build.");
	let transport = Arc::new(ScriptedTransport::default());

	transport.push(Err(RawError::from_json(json!({
		"error": { "code": -32000, "httpCode": 400, "message": "Quota used up.", "data": { "code": 42 } }
	}))));

	let proxy = agent.create_rpc_proxy(transport.clone(), SharedHeaders::default());
	let err = proxy
		.invoke("orders.export", Vec::new(), Some(TokenRequest::password("alice", "pw")))
		.await
		.expect_err("Registered application error should surface.");

	assert_eq!(err.kind(), &ErrorKind::Application { code: 42, name: "QuotaExceeded".into() });
	assert_eq!(err.app_code(), Some(42));
	assert_eq!(err.http_code(), 429);
	assert_eq!(err.message(), "Quota used up.");
	assert_eq!(transport.calls().len(), 1);

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn unauthenticated_calls_skip_tokens_and_retries() {
	let server = MockServer::start_async().await;
	let mock = mock_token_endpoint(&server, "tok1").await;
	let (agent, _store) = build_reqwest_test_agent(&server.base_url(), CLIENT_ID, CLIENT_SECRET);
	let transport = Arc::new(ScriptedTransport::default());

	transport.push(Ok(json!("pong"))).push(Err(unauthorized()));

	let proxy = agent.create_rpc_proxy(transport.clone(), SharedHeaders::default());
	let pong = proxy.invoke("ping", Vec::new(), None).await.expect("Public call should succeed.");
	let err = proxy
		.invoke("ping", Vec::new(), None)
		.await
		.expect_err("Rejected public call should fail without escalation.");

	assert_eq!(pong, json!("pong"));
	assert_eq!(err.http_code(), 401);
	assert!(err.is_ensured());

	let calls = transport.calls();

	assert_eq!(calls.len(), 2);
	assert!(calls.iter().all(|call| call.authorization().is_none()));

	mock.assert_calls_async(0).await;
}

#[tokio::test]
async fn unauthenticated_calls_drop_a_previously_attached_bearer() {
	let server = MockServer::start_async().await;
	let _mock = mock_token_endpoint(&server, "tok1").await;
	let (agent, _store) = build_reqwest_test_agent(&server.base_url(), CLIENT_ID, CLIENT_SECRET);
	let transport = Arc::new(ScriptedTransport::default());
	let headers = SharedHeaders::default();

	transport.otherwise(Ok(json!("ok")));

	let proxy = agent.create_rpc_proxy(transport.clone(), headers.clone());

	proxy
		.invoke("orders.list", Vec::new(), Some(TokenRequest::password("alice", "pw")))
		.await
		.expect("Authenticated call should succeed.");
	proxy.invoke("ping", Vec::new(), None).await.expect("Public call should succeed.");

	let calls = transport.calls();

	assert_eq!(calls[0].authorization(), Some("Bearer tok1"));
	assert_eq!(calls[1].authorization(), None);
	assert!(headers.read().contains_key("authorization"));
}

#[tokio::test]
async fn transport_failures_without_status_default_to_500() {
	let server = MockServer::start_async().await;
	let _mock = mock_token_endpoint(&server, "tok1").await;
	let (agent, _store) = build_reqwest_test_agent(&server.base_url(), CLIENT_ID, CLIENT_SECRET);
	let transport = Arc::new(ScriptedTransport::default());

	transport.push(Err(RawError::transport(
		std::io::Error::new(std::io::ErrorKind::BrokenPipe, "socket closed"),
		None,
	)));

	let proxy = agent.create_rpc_proxy(transport.clone(), SharedHeaders::default());
	let err = proxy
		.invoke("orders.list", Vec::new(), Some(TokenRequest::password("alice", "pw")))
		.await
		.expect_err("Transport failure should surface.");

	assert_eq!(err.kind(), &ErrorKind::Transport);
	assert_eq!(err.http_code(), 500);
	assert_eq!(transport.calls().len(), 1);
}
