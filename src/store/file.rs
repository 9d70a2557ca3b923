//! JSON file-backed [`TokenStore`] for deployments without a database.
//!
//! The file is re-read on every fetch so that tokens written by other processes sharing the
//! path are picked up. Writes reload, merge, and atomically replace the file through a
//! temporary file unique to each write; concurrent writers from different processes resolve as
//! last-write-wins.

// std
use std::{
	fs::{self, File},
	io::{ErrorKind, Write},
	path::{Path, PathBuf},
	process,
	sync::atomic::{AtomicU64, Ordering},
};
// self
use crate::{
	_prelude::*,
	auth::{ApiName, TokenRecord},
	store::{StoreError, StoreFuture, TokenStore},
};

type Snapshot = HashMap<ApiName, TokenRecord>;

static TEMP_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Persists token records to a JSON file after each upsert.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	write_lock: Arc<Mutex<()>>,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path, validating any existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;
		Self::load_snapshot(&path)?;

		Ok(Self { path, write_lock: Default::default() })
	}

	/// Location of the backing file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn load_snapshot(path: &Path) -> Result<Snapshot, StoreError> {
		let bytes = match fs::read(path) {
			Ok(bytes) => bytes,
			Err(e) if e.kind() == ErrorKind::NotFound => return Ok(HashMap::new()),
			Err(e) =>
				return Err(StoreError::Backend {
					message: format!("Failed to read {}: {e}", path.display()),
				}),
		};

		if bytes.is_empty() {
			return Ok(HashMap::new());
		}

		let records: Vec<TokenRecord> =
			serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
				message: format!("Failed to parse {}: {e}", path.display()),
			})?;

		Ok(records.into_iter().map(|record| (record.api_name.clone(), record)).collect())
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	/// Temporary sibling of the backing file, distinct for every write in this process.
	fn temp_path(&self) -> PathBuf {
		let sequence = TEMP_SEQUENCE.fetch_add(1, Ordering::Relaxed);

		self.path.with_extension(format!("{}.{sequence}.tmp", process::id()))
	}

	fn persist_locked(&self, contents: &Snapshot) -> Result<(), StoreError> {
		Self::ensure_parent_exists(&self.path)?;

		let mut records: Vec<_> = contents.values().collect();

		records.sort_by(|a, b| a.api_name.cmp(&b.api_name));

		let serialized =
			serde_json::to_vec_pretty(&records).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize store snapshot: {e}"),
			})?;
		let tmp_path = self.temp_path();

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}
}
impl TokenStore for FileStore {
	fn fetch<'a>(&'a self, api_name: &'a ApiName) -> StoreFuture<'a, Option<TokenRecord>> {
		Box::pin(async move { Ok(Self::load_snapshot(&self.path)?.remove(api_name)) })
	}

	fn upsert(&self, record: TokenRecord) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			let _guard = self.write_lock.lock();
			let mut snapshot = Self::load_snapshot(&self.path)?;

			snapshot.insert(record.api_name.clone(), record);
			self.persist_locked(&snapshot)?;

			Ok(())
		})
	}
}
