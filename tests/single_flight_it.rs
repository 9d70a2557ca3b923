mod common;

// std
use std::{sync::Arc, time::Duration as StdDuration};
// crates.io
use httpmock::prelude::*;
use time::Duration;
// self
use common::*;
use credential_token_cache::{
	auth::Secret,
	cache::RefreshState,
	error::{Error, Result, TokenAcquisitionError},
	store::TokenStore,
};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_cold_start_calls_upstream_once() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/oauth2/token")
				.header("content-type", "application/x-www-form-urlencoded")
				.body(FORM_BODY);
			then.status(200)
				.header("content-type", "application/json")
				.delay(StdDuration::from_millis(200))
				.body("{\"access_token\":\"tok-1\",\"expires_in\":3600}");
		})
		.await;
	let store = Arc::new(CountingStore::default());
	let cache = build_cache(&server, store.clone());
	let handles = (0..5)
		.map(|_| {
			let cache = cache.clone();

			tokio::spawn(async move { cache.get_token().await })
		})
		.collect::<Vec<_>>();

	for handle in handles {
		let token = handle
			.await
			.expect("Caller task should not panic.")
			.expect("Every concurrent caller should receive the token.");

		assert_eq!(token.expose(), "tok-1");
	}

	mock.assert_calls_async(1).await;

	assert_eq!(store.upserts(), 1);
	assert_eq!(cache.refresh_state(), RefreshState::Idle);
}

#[tokio::test]
async fn concurrent_calls_replace_expired_token_once() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/token");
			then.status(200)
				.header("content-type", "application/json")
				.delay(StdDuration::from_millis(100))
				.body("{\"access_token\":\"tok-2\",\"expires_in\":3600}");
		})
		.await;
	let store = Arc::new(CountingStore::with_records([record("old", Duration::minutes(-5))]));
	let cache = build_cache(&server, store.clone());
	let (a, b, c): (Result<Secret>, Result<Secret>, Result<Secret>) =
		tokio::join!(cache.get_token(), cache.get_token(), cache.get_token());

	for token in [a, b, c] {
		assert_eq!(token.expect("Refresh should succeed for every caller.").expose(), "tok-2");
	}

	mock.assert_calls_async(1).await;

	assert_eq!(store.upserts(), 1);

	let stored = store
		.fetch(&api_name())
		.await
		.expect("Store fetch should succeed.")
		.expect("Refreshed record should be stored.");

	assert_eq!(stored.token.expose(), "tok-2");
}

#[tokio::test]
async fn later_calls_read_the_refreshed_record() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"tok-3\",\"expires_in\":3600}");
		})
		.await;
	let store = Arc::new(CountingStore::default());
	let cache = build_cache(&server, store.clone());

	for _ in 0..3 {
		let token = cache.get_token().await.expect("Lookup should succeed.");

		assert_eq!(token.expose(), "tok-3");
	}

	mock.assert_calls_async(1).await;

	assert_eq!(store.upserts(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn failed_refresh_reaches_all_waiters_then_clears() {
	let server = MockServer::start_async().await;
	let mut failing = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/token");
			then.status(500)
				.delay(StdDuration::from_millis(150))
				.body("upstream exploded");
		})
		.await;
	let store = Arc::new(CountingStore::default());
	let cache = build_cache(&server, store.clone());
	let handles = (0..4)
		.map(|_| {
			let cache = cache.clone();

			tokio::spawn(async move { cache.get_token().await })
		})
		.collect::<Vec<_>>();

	for handle in handles {
		let err = handle
			.await
			.expect("Caller task should not panic.")
			.expect_err("Upstream failure should reach every waiter.");

		assert!(matches!(
			err,
			Error::TokenAcquisition(TokenAcquisitionError::Status { status: 500, .. })
		));
	}

	failing.assert_calls_async(1).await;
	failing.delete_async().await;

	assert_eq!(store.upserts(), 0);
	assert_eq!(cache.refresh_state(), RefreshState::Idle);

	let healthy = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"tok-4\",\"expires_in\":3600}");
		})
		.await;
	let token = cache.get_token().await.expect("Retry after failure should succeed.");

	assert_eq!(token.expose(), "tok-4");

	healthy.assert_calls_async(1).await;

	assert_eq!(store.upserts(), 1);
}
