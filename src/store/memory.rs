//! Thread-safe in-memory [`TokenStore`] for single-process deployments and tests.

// self
use crate::{
	_prelude::*,
	auth::{ApiName, TokenRecord},
	store::{StoreError, StoreFuture, TokenStore},
};

type StoreMap = Arc<RwLock<HashMap<ApiName, TokenRecord>>>;

/// Storage backend that keeps records in-process. Clones share the same map.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	/// Creates a store pre-populated with `records`.
	pub fn with_records(records: impl IntoIterator<Item = TokenRecord>) -> Self {
		let map = records.into_iter().map(|record| (record.api_name.clone(), record)).collect();

		Self(Arc::new(RwLock::new(map)))
	}

	/// Number of stored records.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when no record is stored.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}

	fn upsert_now(map: StoreMap, record: TokenRecord) -> Result<(), StoreError> {
		map.write().insert(record.api_name.clone(), record);

		Ok(())
	}

	fn fetch_now(map: StoreMap, api_name: ApiName) -> Option<TokenRecord> {
		map.read().get(&api_name).cloned()
	}
}
impl TokenStore for MemoryStore {
	fn fetch<'a>(&'a self, api_name: &'a ApiName) -> StoreFuture<'a, Option<TokenRecord>> {
		let map = self.0.clone();
		let api_name = api_name.to_owned();

		Box::pin(async move { Ok(Self::fetch_now(map, api_name)) })
	}

	fn upsert(&self, record: TokenRecord) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move { Self::upsert_now(map, record) })
	}
}
