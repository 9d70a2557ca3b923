mod common;

// std
use std::{env, fs, path::PathBuf, process, sync::Arc};
// crates.io
use httpmock::prelude::*;
use time::{Duration, OffsetDateTime};
// self
use common::*;
use credential_token_cache::store::{FileStore, MemoryStore, TokenStore};

fn temp_path(label: &str) -> PathBuf {
	env::temp_dir().join(format!(
		"credential_token_cache_{label}_{}_{}.json",
		process::id(),
		OffsetDateTime::now_utc().unix_timestamp_nanos(),
	))
}

#[tokio::test]
async fn memory_store_upsert_replaces_in_place() {
	let store = MemoryStore::default();

	store.upsert(record("first", Duration::hours(1))).await.expect("First upsert should succeed.");
	store.upsert(record("second", Duration::hours(2))).await.expect("Second upsert should succeed.");

	let fetched = store
		.fetch(&api_name())
		.await
		.expect("Memory store fetch should succeed.")
		.expect("Record should remain present.");

	assert_eq!(fetched.token.expose(), "second");
	assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn memory_store_returns_expired_records_as_is() {
	let store = MemoryStore::with_records([record("stale", Duration::minutes(-1))]);
	let fetched = store
		.fetch(&api_name())
		.await
		.expect("Memory store fetch should succeed.")
		.expect("Expired record should still be returned.");

	assert!(!fetched.is_valid());
}

#[tokio::test]
async fn caches_sharing_a_file_reuse_each_others_tokens() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"shared-file\",\"expires_in\":3600}");
		})
		.await;
	let path = temp_path("shared");
	let first = build_cache(
		&server,
		Arc::new(FileStore::open(&path).expect("First file store handle should open.")),
	);
	let second = build_cache(
		&server,
		Arc::new(FileStore::open(&path).expect("Second file store handle should open.")),
	);

	assert_eq!(
		first.get_token().await.expect("First cache should refresh.").expose(),
		"shared-file"
	);
	assert_eq!(
		second.get_token().await.expect("Second cache should read the file.").expose(),
		"shared-file"
	);

	mock.assert_calls_async(1).await;

	fs::remove_file(&path).unwrap_or_else(|e| {
		panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
	});
}
