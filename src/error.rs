//! Cache-level error types shared across the store, transport, and refresh layers.
//!
//! Every error is [`Clone`] because a single refresh outcome is handed to every caller
//! attached to that refresh. Foreign sources are kept behind [`Arc`] for that reason.

// self
use crate::_prelude::*;

/// Cache-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type SharedError = Arc<dyn StdError + Send + Sync>;

/// Canonical cache error exposed by public APIs.
#[derive(Clone, Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure, propagated unchanged from the backend.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// The upstream identity provider did not hand out a usable token.
	#[error(transparent)]
	TokenAcquisition(#[from] TokenAcquisitionError),
}
impl Error {
	/// HTTP status a request handler should answer with when this error escapes.
	///
	/// Upstream failures map to `502 Bad Gateway`; everything else is a local `500`.
	pub const fn http_status(&self) -> u16 {
		match self {
			Self::TokenAcquisition(_) => 502,
			Self::Storage(_) | Self::Config(_) => 500,
		}
	}
}

/// Configuration and validation failures raised while wiring up a cache.
#[derive(Clone, Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: SharedError,
	},
	/// HTTP request construction failed.
	#[error("Token request could not be constructed.")]
	HttpRequest {
		/// Underlying `http` crate failure.
		#[source]
		source: Arc<oauth2::http::Error>,
	},
	/// Provider descriptor failed validation.
	#[error(transparent)]
	Descriptor(#[from] crate::provider::ProviderDescriptorError),
	/// An identifier failed validation.
	#[error(transparent)]
	Identifier(#[from] crate::auth::IdentifierError),
	/// A required environment variable is absent or not valid unicode.
	#[error("Environment variable `{name}` is not set.")]
	MissingEnv {
		/// Variable name.
		name: String,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::HttpClientBuild { source: Arc::new(src) }
	}
}
impl From<oauth2::http::Error> for ConfigError {
	fn from(e: oauth2::http::Error) -> Self {
		Self::HttpRequest { source: Arc::new(e) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Failures to obtain a token from the upstream identity provider.
///
/// The cache never retries these on its own; the next independent call starts a new refresh.
#[derive(Clone, Debug, ThisError)]
pub enum TokenAcquisitionError {
	/// Token endpoint answered with a non-success HTTP status.
	#[error("Token endpoint responded with HTTP {status}: {message}.")]
	Status {
		/// HTTP status code.
		status: u16,
		/// Preview of the response body.
		message: String,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Token endpoint responded successfully but without an `access_token`.
	#[error("Token endpoint response is missing access_token.")]
	MissingAccessToken {
		/// HTTP status code of the response.
		status: u16,
	},
	/// Token endpoint responded with malformed JSON that could not be parsed.
	#[error("Token endpoint returned malformed JSON.")]
	MalformedResponse {
		/// Structured parsing failure.
		#[source]
		source: Arc<serde_path_to_error::Error<serde_json::Error>>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Reported lifetime cannot be represented as an expiry instant.
	#[error("The expires_in value exceeds the supported range.")]
	LifetimeOutOfRange,
	/// Request did not complete within the transport timeout.
	#[error("Request timed out while calling the token endpoint.")]
	Timeout,
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the token endpoint.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: SharedError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the token endpoint.")]
	Io {
		/// Shared IO error.
		#[source]
		source: Arc<std::io::Error>,
	},
	/// Transport failed in a way it could only describe with a message.
	#[error("HTTP client error occurred while calling the token endpoint: {message}.")]
	Transport {
		/// Transport-supplied message.
		message: String,
	},
}
impl TokenAcquisitionError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Network { source: Arc::new(src) }
	}

	/// HTTP status attached to the failure, if the endpoint answered at all.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Status { status, .. } | Self::MissingAccessToken { status } => Some(*status),
			Self::MalformedResponse { status, .. } => *status,
			_ => None,
		}
	}
}
impl From<std::io::Error> for TokenAcquisitionError {
	fn from(e: std::io::Error) -> Self {
		Self::Io { source: Arc::new(e) }
	}
}
