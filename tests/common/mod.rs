//! Shared fixtures for integration tests.

#![allow(dead_code)]

// std
use std::sync::{
	Arc,
	atomic::{AtomicUsize, Ordering},
};
// crates.io
use httpmock::prelude::*;
use time::{Duration, OffsetDateTime};
use url::Url;
// self
use credential_token_cache::{
	auth::{ApiName, ClientCredentials, ClientId, Secret, TokenRecord},
	cache::ReqwestTokenCache,
	http::ReqwestHttpClient,
	oauth::ReqwestTransportErrorMapper,
	provider::{ClientAuthMethod, ProviderDescriptor},
	reqwest::{Client, redirect::Policy},
	store::{MemoryStore, StoreFuture, TokenStore},
};

pub const CLIENT_ID: &str = "igdb-client";
pub const CLIENT_SECRET: &str = "igdb-secret";
pub const FORM_BODY: &str =
	"client_id=igdb-client&client_secret=igdb-secret&grant_type=client_credentials";

pub fn api_name() -> ApiName {
	ApiName::new("IGDB").expect("API name fixture should be valid.")
}

pub fn credentials() -> ClientCredentials {
	ClientCredentials::new(
		ClientId::new(CLIENT_ID).expect("Client identifier fixture should be valid."),
		CLIENT_SECRET,
	)
}

pub fn descriptor(server: &MockServer, method: ClientAuthMethod) -> ProviderDescriptor {
	ProviderDescriptor::builder(api_name())
		.token_endpoint(
			Url::parse(&server.url("/oauth2/token"))
				.expect("Mock token endpoint should parse successfully."),
		)
		.client_auth_method(method)
		.build()
		.expect("Provider descriptor should build successfully.")
}

pub fn record(token: &str, expires_in: Duration) -> TokenRecord {
	TokenRecord {
		api_name: api_name(),
		token: Secret::new(token),
		expires_at: OffsetDateTime::now_utc() + expires_in,
	}
}

/// Request timeout used by integration caches unless a test picks its own.
pub const TEST_TIMEOUT: Duration = Duration::seconds(10);

/// Reqwest transport that accepts the self-signed certificates `httpmock` serves, keeping the
/// production client's timeout and no-redirect policy.
pub fn test_reqwest_http_client(timeout: Duration) -> ReqwestHttpClient {
	let timeout = std::time::Duration::try_from(timeout).expect("Test timeout should be positive.");
	let client = Client::builder()
		.danger_accept_invalid_certs(true)
		.danger_accept_invalid_hostnames(true)
		.timeout(timeout)
		.redirect(Policy::none())
		.build()
		.expect("Failed to build insecure Reqwest client for tests.");

	ReqwestHttpClient::with_client(client)
}

/// Cache over `store` that talks to `server` with the given client authentication method.
pub fn build_cache_for(
	server: &MockServer,
	store: Arc<dyn TokenStore>,
	method: ClientAuthMethod,
	timeout: Duration,
) -> ReqwestTokenCache {
	ReqwestTokenCache::with_http_client(
		store,
		descriptor(server, method),
		credentials(),
		test_reqwest_http_client(timeout),
		ReqwestTransportErrorMapper,
	)
}

/// Cache over `store` that talks to `server` with form-posted credentials.
pub fn build_cache(server: &MockServer, store: Arc<dyn TokenStore>) -> ReqwestTokenCache {
	build_cache_for(server, store, ClientAuthMethod::ClientSecretPost, TEST_TIMEOUT)
}

/// Same as [`build_cache`] but with a caller-chosen request timeout.
pub fn build_cache_with_timeout(
	server: &MockServer,
	store: Arc<dyn TokenStore>,
	timeout: Duration,
) -> ReqwestTokenCache {
	build_cache_for(server, store, ClientAuthMethod::ClientSecretPost, timeout)
}

/// [`MemoryStore`] wrapper that counts calls so tests can assert on store traffic.
#[derive(Default)]
pub struct CountingStore {
	pub inner: MemoryStore,
	fetches: AtomicUsize,
	upserts: AtomicUsize,
}
impl CountingStore {
	pub fn with_records(records: impl IntoIterator<Item = TokenRecord>) -> Self {
		Self { inner: MemoryStore::with_records(records), ..Default::default() }
	}

	pub fn fetches(&self) -> usize {
		self.fetches.load(Ordering::SeqCst)
	}

	pub fn upserts(&self) -> usize {
		self.upserts.load(Ordering::SeqCst)
	}
}
impl TokenStore for CountingStore {
	fn fetch<'a>(&'a self, api_name: &'a ApiName) -> StoreFuture<'a, Option<TokenRecord>> {
		self.fetches.fetch_add(1, Ordering::SeqCst);

		self.inner.fetch(api_name)
	}

	fn upsert(&self, record: TokenRecord) -> StoreFuture<'_, ()> {
		self.upserts.fetch_add(1, Ordering::SeqCst);

		self.inner.upsert(record)
	}
}
