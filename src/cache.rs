//! Single-flight token cache backed by a durable store.
//!
//! [`CredentialTokenCache::get_token`] first consults the [`TokenStore`]. A record that is
//! still valid is returned without touching any shared state. Otherwise the caller either
//! attaches to the refresh already in flight or, under the same lock acquisition, installs a
//! new one. The refresh re-reads the store (another process may have just written a token),
//! calls the token endpoint once, upserts the record, and resolves every attached caller with
//! the same outcome. The slot is cleared as soon as the refresh settles, whether it succeeded
//! or not, so the next caller that needs a token starts a fresh attempt.
//!
//! Only callers within one process (sharing one cache instance or its clones) are collapsed
//! into a single upstream call. Separate processes sharing a store may refresh concurrently;
//! their upserts are last-write-wins.

mod flight;

pub use flight::RefreshState;

// crates.io
use futures::FutureExt;
// self
use crate::{
	_prelude::*,
	auth::{ClientCredentials, Secret, TokenRecord, expiry_from},
	error::TokenAcquisitionError,
	ext::{ClientIdBearerSigner, RequestSignerExt},
	http::TokenHttpClient,
	oauth::{ClientCredentialsExchange, TransportErrorMapper},
	obs::{self, CacheSpan, LookupOutcome},
	provider::ProviderDescriptor,
	store::TokenStore,
};
#[cfg(feature = "reqwest")]
use crate::{http::ReqwestHttpClient, oauth::ReqwestTransportErrorMapper};
use flight::{FlightSlot, SharedRefresh};

#[cfg(feature = "reqwest")]
/// Cache specialized for the crate's default reqwest transport stack.
pub type ReqwestTokenCache = CredentialTokenCache<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Process-wide cache for one upstream API's bearer token.
///
/// Construct one instance per API at startup and share it (clones share the same in-flight
/// refresh). At most one upstream refresh is in flight per instance at any time.
pub struct CredentialTokenCache<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	core: Arc<RefreshCore<C, M>>,
	flight: Arc<Mutex<FlightSlot>>,
}
impl<C, M> CredentialTokenCache<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a cache that reuses the caller-provided transport + mapper pair.
	pub fn with_http_client(
		store: Arc<dyn TokenStore>,
		descriptor: ProviderDescriptor,
		credentials: ClientCredentials,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		let core = RefreshCore {
			store,
			descriptor,
			credentials,
			http_client: http_client.into(),
			transport_mapper: mapper.into(),
		};

		Self { core: Arc::new(core), flight: Default::default() }
	}

	/// Returns a valid bearer token, refreshing it from upstream when needed.
	///
	/// Concurrent callers that find no valid token share one refresh and all receive its
	/// outcome. Store failures propagate as [`Error::Storage`]; upstream failures as
	/// [`Error::TokenAcquisition`]. An expired token is never returned.
	pub async fn get_token(&self) -> Result<Secret> {
		let api_name = &self.core.descriptor.api_name;
		let span = CacheSpan::new(api_name, "get_token");

		span.instrument(async move {
			let now = OffsetDateTime::now_utc();

			if let Some(record) =
				self.core.store.fetch(api_name).await?.filter(|record| record.is_valid_at(now))
			{
				obs::record_lookup_outcome(api_name, LookupOutcome::Hit);

				return Ok(record.token);
			}

			self.join_or_start_refresh().await
		})
		.await
	}

	/// Fetches a token and attaches it to `request` using the configured client identifier.
	pub async fn sign<R>(&self, request: R) -> Result<R>
	where
		ClientIdBearerSigner: RequestSignerExt<R>,
	{
		let token = self.get_token().await?;

		self.signer().attach_token(request, &token)
	}

	/// Signer that adds `Client-ID` and `Authorization: Bearer` headers.
	pub fn signer(&self) -> ClientIdBearerSigner {
		ClientIdBearerSigner::new(self.core.credentials.client_id.clone())
	}

	/// Whether a refresh is currently in flight.
	pub fn refresh_state(&self) -> RefreshState {
		self.flight.lock().state()
	}

	/// Descriptor this cache refreshes against.
	pub fn descriptor(&self) -> &ProviderDescriptor {
		&self.core.descriptor
	}

	/// Durable store backing this cache.
	pub fn store(&self) -> &Arc<dyn TokenStore> {
		&self.core.store
	}

	// The decision to attach or start happens under one lock acquisition with no suspension
	// point, so two callers can never both observe an idle slot.
	fn join_or_start_refresh(&self) -> SharedRefresh {
		let api_name = &self.core.descriptor.api_name;
		let mut slot = self.flight.lock();

		if let Some(refresh) = slot.current() {
			obs::record_lookup_outcome(api_name, LookupOutcome::Joined);

			return refresh;
		}

		let (generation, refresh) = slot.start(|generation| {
			run_refresh(self.core.clone(), Arc::downgrade(&self.flight), generation)
				.boxed()
				.shared()
		});

		drop(slot);
		obs::record_lookup_outcome(api_name, LookupOutcome::Refresh);
		obs::refresh_started(api_name, generation);

		refresh
	}
}
#[cfg(feature = "reqwest")]
impl CredentialTokenCache<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a cache that provisions its own reqwest transport with the default timeout.
	pub fn new(
		store: Arc<dyn TokenStore>,
		descriptor: ProviderDescriptor,
		credentials: ClientCredentials,
	) -> Result<Self> {
		Ok(Self::with_http_client(
			store,
			descriptor,
			credentials,
			ReqwestHttpClient::new()?,
			ReqwestTransportErrorMapper,
		))
	}

	/// IGDB cache configured from `IGDB_CLIENT_ID` / `IGDB_SECRET`.
	pub fn igdb_from_env(store: Arc<dyn TokenStore>) -> Result<Self> {
		Self::new(store, ProviderDescriptor::igdb()?, ClientCredentials::igdb_from_env()?)
	}
}
impl<C, M> Clone for CredentialTokenCache<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn clone(&self) -> Self {
		Self { core: self.core.clone(), flight: self.flight.clone() }
	}
}
impl<C, M> Debug for CredentialTokenCache<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CredentialTokenCache")
			.field("descriptor", &self.core.descriptor)
			.field("client_id", &self.core.credentials.client_id)
			.field("refresh_state", &self.refresh_state())
			.finish()
	}
}

struct RefreshCore<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	store: Arc<dyn TokenStore>,
	descriptor: ProviderDescriptor,
	credentials: ClientCredentials,
	http_client: Arc<C>,
	transport_mapper: Arc<M>,
}
impl<C, M> RefreshCore<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	async fn refresh(&self) -> Result<(Secret, LookupOutcome)> {
		let api_name = &self.descriptor.api_name;

		if let Some(record) = self
			.store
			.fetch(api_name)
			.await?
			.filter(|record| record.is_valid_at(OffsetDateTime::now_utc()))
		{
			return Ok((record.token, LookupOutcome::Reused));
		}

		let exchange = ClientCredentialsExchange {
			descriptor: &self.descriptor,
			credentials: &self.credentials,
			http_client: self.http_client.as_ref(),
			error_mapper: self.transport_mapper.as_ref(),
		};
		let grant = exchange.request_token().await?;
		let expires_at = expiry_from(grant.received_at, grant.lifetime)
			.map_err(|_| TokenAcquisitionError::LifetimeOutOfRange)?;
		let record = TokenRecord { api_name: api_name.clone(), token: grant.access_token, expires_at };

		self.store.upsert(record.clone()).await?;

		Ok((record.token, LookupOutcome::Success))
	}
}

async fn run_refresh<C, M>(
	core: Arc<RefreshCore<C, M>>,
	flight: Weak<Mutex<FlightSlot>>,
	generation: u64,
) -> Result<Secret>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	let api_name = &core.descriptor.api_name;
	let settle = SettleOnDrop { flight, generation };
	let result = CacheSpan::new(api_name, "refresh").instrument(core.refresh()).await;

	drop(settle);

	match result {
		Ok((token, outcome)) => {
			obs::record_lookup_outcome(api_name, outcome);

			Ok(token)
		},
		Err(e) => {
			obs::record_lookup_outcome(api_name, LookupOutcome::Failure);
			obs::refresh_failed(api_name, generation, &e);

			Err(e)
		},
	}
}

// Clears the slot when the refresh settles, including when it unwinds from a panic, so a
// poisoned shared future is never handed to later callers.
struct SettleOnDrop {
	flight: Weak<Mutex<FlightSlot>>,
	generation: u64,
}
impl Drop for SettleOnDrop {
	fn drop(&mut self) {
		if let Some(flight) = self.flight.upgrade() {
			flight.lock().settle(self.generation);
		}
	}
}
