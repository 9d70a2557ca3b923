//! Storage contract and built-in durable stores for cached token records.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{ApiName, TokenRecord},
};

/// Boxed future returned by [`TokenStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Durable key-value store holding at most one [`TokenRecord`] per [`ApiName`].
///
/// Stores may be shared across processes. Writes are plain upserts, so concurrent writers
/// race benignly: the last write wins.
pub trait TokenStore
where
	Self: Send + Sync,
{
	/// Fetches the record for `api_name`, if present. Expired records are returned as-is;
	/// freshness is the caller's decision.
	fn fetch<'a>(&'a self, api_name: &'a ApiName) -> StoreFuture<'a, Option<TokenRecord>>;

	/// Creates or replaces the record keyed by `record.api_name`.
	fn upsert(&self, record: TokenRecord) -> StoreFuture<'_, ()>;
}

/// Error type produced by [`TokenStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::error::Error;

	#[test]
	fn store_error_converts_into_cache_error_with_source() {
		let store_error = StoreError::Backend { message: "database unreachable".into() };
		let cache_error: Error = store_error.clone().into();

		assert!(matches!(cache_error, Error::Storage(_)));
		assert!(cache_error.to_string().contains("database unreachable"));

		let source = StdError::source(&cache_error)
			.expect("Cache error should expose the original store error as its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}
}
