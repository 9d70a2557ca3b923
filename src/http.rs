//! HTTP seam between the refresh routine and the token endpoint.
//!
//! A refresh asks its [`TokenHttpClient`] for a handle bound to a fresh
//! [`ResponseMetadataSlot`]. The handle performs exactly one request; whatever it learned about
//! the response (status, `Retry-After`) stays in the slot so the [`TransportErrorMapper`]
//! can classify failures that happen after the headers arrived.
//!
//! [`TransportErrorMapper`]: crate::oauth::TransportErrorMapper

// crates.io
use oauth2::{AsyncHttpClient, HttpClientError};
#[cfg(feature = "reqwest")] use oauth2::{HttpRequest, HttpResponse};
#[cfg(feature = "reqwest")]
use reqwest::{
	header::{HeaderMap, RETRY_AFTER},
	redirect::Policy,
};
#[cfg(feature = "reqwest")] use time::format_description::well_known::Rfc2822;
// self
use crate::_prelude::*;
#[cfg(feature = "reqwest")] use crate::error::ConfigError;

/// Request timeout applied by [`ReqwestHttpClient::new`].
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::seconds(30);

/// Transport able to call a token endpoint on behalf of the cache.
///
/// The refresh future that drives a handle is shared by every caller waiting on it and may be
/// polled from any of their tasks, hence the `Send + Sync + 'static` requirements.
pub trait TokenHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Error raised by the underlying transport.
	type TransportError: 'static + Send + Sync + StdError;

	/// One-request handle that reports into a [`ResponseMetadataSlot`].
	type Handle: for<'c> AsyncHttpClient<
			'c,
			Error = HttpClientError<Self::TransportError>,
			Future: 'c + Send,
		>
		+ 'static
		+ Send
		+ Sync;

	/// Binds a handle to `slot`.
	///
	/// Handles clear the slot before sending and fill it as soon as the status line and headers
	/// are known, so a failure while reading the body still carries the HTTP status.
	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle;
}

/// What the transport observed about a token endpoint response.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResponseMetadata {
	/// HTTP status, once the endpoint answered.
	pub status: Option<u16>,
	/// `Retry-After` converted to a relative delay.
	pub retry_after: Option<Duration>,
}

/// Single-request mailbox for [`ResponseMetadata`]. Clones share the same mailbox.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadataSlot(Arc<Mutex<Option<ResponseMetadata>>>);
impl ResponseMetadataSlot {
	/// Replaces the slot contents.
	pub fn store(&self, meta: ResponseMetadata) {
		*self.0.lock() = Some(meta);
	}

	/// Empties the slot, returning what it held.
	pub fn take(&self) -> Option<ResponseMetadata> {
		self.0.lock().take()
	}
}

/// reqwest transport for token endpoints: bounded request time, redirects never followed.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Builds a client with [`DEFAULT_REQUEST_TIMEOUT`].
	pub fn new() -> Result<Self, ConfigError> {
		Self::with_timeout(DEFAULT_REQUEST_TIMEOUT)
	}

	/// Builds a client whose requests fail with a timeout once `timeout` elapses.
	pub fn with_timeout(timeout: Duration) -> Result<Self, ConfigError> {
		let timeout = std::time::Duration::try_from(timeout).map_err(ConfigError::http_client_build)?;

		Ok(Self(ReqwestClient::builder().timeout(timeout).redirect(Policy::none()).build()?))
	}

	/// Uses `client` as-is. Its timeout and redirect policy are the caller's responsibility.
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl TokenHttpClient for ReqwestHttpClient {
	type Handle = ReqwestHandle;
	type TransportError = ReqwestError;

	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle {
		ReqwestHandle { client: self.0.clone(), slot }
	}
}

/// [`ReqwestHttpClient`] handle bound to one metadata slot.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestHandle {
	client: ReqwestClient,
	slot: ResponseMetadataSlot,
}
#[cfg(feature = "reqwest")]
impl ReqwestHandle {
	async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpClientError<ReqwestError>> {
		self.slot.take();

		let request = reqwest::Request::try_from(request).map_err(Box::new)?;
		let response = self.client.execute(request).await.map_err(Box::new)?;
		let status = response.status();
		let headers = response.headers().clone();

		self.slot.store(ResponseMetadata {
			status: Some(status.as_u16()),
			retry_after: parse_retry_after(&headers),
		});

		let body = response.bytes().await.map_err(Box::new)?;
		let mut converted = HttpResponse::new(body.to_vec());

		*converted.status_mut() = status;
		*converted.headers_mut() = headers;

		Ok(converted)
	}
}
#[cfg(feature = "reqwest")]
impl<'c> AsyncHttpClient<'c> for ReqwestHandle {
	type Error = HttpClientError<ReqwestError>;
	type Future = Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		Box::pin(self.send(request))
	}
}

// Accepts delta-seconds or an HTTP date; dates already in the past yield nothing.
#[cfg(feature = "reqwest")]
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	let raw = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();

	match raw.parse::<u64>() {
		Ok(secs) => i64::try_from(secs).ok().map(Duration::seconds),
		Err(_) => OffsetDateTime::parse(raw, &Rfc2822)
			.ok()
			.map(|at| at - OffsetDateTime::now_utc())
			.filter(|delta| delta.is_positive()),
	}
}
