//! OAuth 2.0 client agent for RPC services.
//!
//! The agent caches bearer tokens per token request, retries calls rejected as unauthorized under
//! an ordered list of stronger grants, and reports every failure through one normalized error
//! taxonomy.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod acquirer;
pub mod agent;
pub mod auth;
pub mod error;
pub mod escalation;
pub mod http;
pub mod obs;
pub mod rpc;
pub mod store;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// std
	use std::collections::VecDeque;
	// self
	use crate::{
		agent::{AgentBuilder, ReqwestAgent},
		error::RawError,
		http::{ReqwestHttpClient, ReqwestTransportErrorMapper},
		rpc::{RpcCall, RpcFuture, RpcTransport},
		store::{CacheStore, MemoryStore},
	};

	/// Agent type alias used by reqwest-backed integration tests.
	pub type ReqwestTestAgent = ReqwestAgent;

	/// Builds a reqwest HTTP client that trusts the self-signed certificates served by
	/// `httpmock`.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.redirect(reqwest::redirect::Policy::none())
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Constructs an [`OAuthAgent`](crate::agent::OAuthAgent) backed by an in-memory cache and the reqwest transport used
	/// across integration tests.
	pub fn build_reqwest_test_agent(
		server_uri: &str,
		client_id: &str,
		client_secret: &str,
	) -> (ReqwestTestAgent, Arc<MemoryStore>) {
		let store_backend = Arc::new(MemoryStore::default());
		let store: Arc<dyn CacheStore> = store_backend.clone();
		let server_uri = Url::parse(server_uri).expect("Mock server URI should parse.");
		let agent = AgentBuilder::new()
			.server_uri(server_uri)
			.client_id(client_id)
			.client_secret(client_secret)
			.store(store)
			.build_with_http_client(test_reqwest_http_client(), ReqwestTransportErrorMapper)
			.expect("Test agent should build.");

		(agent, store_backend)
	}

	/// RPC transport double that replays scripted outcomes and records every call.
	#[derive(Debug, Default)]
	pub struct ScriptedTransport {
		script: Mutex<VecDeque<Result<serde_json::Value, RawError>>>,
		fallback: Mutex<Option<Result<serde_json::Value, RawError>>>,
		calls: Mutex<Vec<RpcCall>>,
	}
	impl ScriptedTransport {
		/// Queues an outcome returned by the next unscripted call.
		pub fn push(&self, outcome: Result<serde_json::Value, RawError>) -> &Self {
			self.script.lock().push_back(outcome);

			self
		}

		/// Outcome returned once the script is exhausted.
		pub fn otherwise(&self, outcome: Result<serde_json::Value, RawError>) -> &Self {
			*self.fallback.lock() = Some(outcome);

			self
		}

		/// Returns a snapshot of every recorded call.
		pub fn calls(&self) -> Vec<RpcCall> {
			self.calls.lock().clone()
		}
	}
	impl RpcTransport for ScriptedTransport {
		fn invoke(&self, call: RpcCall) -> RpcFuture<'_> {
			self.calls.lock().push(call);

			let outcome = self.script.lock().pop_front().or_else(|| self.fallback.lock().clone());

			Box::pin(async move {
				outcome.unwrap_or_else(|| {
					Err(RawError::fields().message("No scripted outcome left.").http_code(500).into())
				})
			})
		}
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::Value;
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _};
