//! Client-credentials exchange against the upstream token endpoint.
//!
//! The exchange builds the request by hand instead of going through `oauth2`'s typed
//! clients: identity providers such as Twitch answer without `token_type`, and a missing
//! `expires_in` must fall back to [`DEFAULT_LIFETIME`] instead of failing the call.

pub use oauth2;

// crates.io
use base64::{Engine, engine::general_purpose::STANDARD};
use oauth2::{
	AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse,
	http::{
		Method, Request,
		header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
	},
};
use url::form_urlencoded::Serializer;
// self
use crate::{
	_prelude::*,
	auth::{ClientCredentials, DEFAULT_LIFETIME, Secret},
	error::{ConfigError, TokenAcquisitionError},
	http::{ResponseMetadata, ResponseMetadataSlot, TokenHttpClient},
	provider::{ClientAuthMethod, ProviderDescriptor},
};

const BODY_PREVIEW_LIMIT: usize = 256;
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

type ExchangeFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Maps HTTP transport failures into cache [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport into a cache error.
	fn map_transport_error(
		&self,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<E>,
	) -> Error;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		meta: Option<&ResponseMetadata>,
		err: HttpClientError<ReqwestError>,
	) -> Error {
		match err {
			HttpClientError::Reqwest(inner) => map_reqwest_error(*inner),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => TokenAcquisitionError::from(inner).into(),
			HttpClientError::Other(message) => map_generic_transport_error(meta, message),
			_ => map_generic_transport_error(meta, "unknown transport failure"),
		}
	}
}

/// Token granted by the upstream endpoint, before the safety margin is applied.
#[derive(Clone, Debug)]
pub struct TokenGrant {
	/// Issued bearer token.
	pub access_token: Secret,
	/// Reported lifetime, or [`DEFAULT_LIFETIME`] when the endpoint omitted it.
	pub lifetime: Duration,
	/// Instant the response was received; the lifetime is measured from here.
	pub received_at: OffsetDateTime,
}

#[derive(Deserialize)]
struct TokenEndpointResponse {
	access_token: Option<String>,
	expires_in: Option<u64>,
}

/// Performs `client_credentials` grants for one provider descriptor.
pub(crate) struct ClientCredentialsExchange<'a, C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	pub(crate) descriptor: &'a ProviderDescriptor,
	pub(crate) credentials: &'a ClientCredentials,
	pub(crate) http_client: &'a C,
	pub(crate) error_mapper: &'a M,
}
impl<'a, C, M> ClientCredentialsExchange<'a, C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Requests a fresh token. Exactly one HTTP request is issued; nothing is retried.
	pub(crate) fn request_token(&self) -> ExchangeFuture<'a, TokenGrant> {
		let descriptor = self.descriptor;
		let credentials = self.credentials;
		let http_client = self.http_client;
		let error_mapper = self.error_mapper;

		Box::pin(async move {
			let meta = ResponseMetadataSlot::default();
			let handle = http_client.with_metadata(meta.clone());
			let request = build_token_request(descriptor, credentials)?;
			let response = handle
				.call(request)
				.await
				.map_err(|err| error_mapper.map_transport_error(meta.take().as_ref(), err))?;

			parse_token_response(response, meta.take().as_ref())
		})
	}
}

pub(crate) fn build_token_request(
	descriptor: &ProviderDescriptor,
	credentials: &ClientCredentials,
) -> Result<HttpRequest> {
	let mut endpoint = descriptor.token_endpoint.clone();
	let mut form = BTreeMap::new();

	form.insert("grant_type", "client_credentials");

	let builder = Request::builder().method(Method::POST).header(ACCEPT, "application/json");
	let (builder, body) = match descriptor.client_auth_method {
		ClientAuthMethod::ClientSecretPost => {
			form.insert("client_id", credentials.client_id.as_ref());
			form.insert("client_secret", credentials.client_secret.expose());

			(builder.header(CONTENT_TYPE, FORM_CONTENT_TYPE), encode_form(&form).into_bytes())
		},
		ClientAuthMethod::ClientSecretBasic => {
			let pair = format!(
				"{}:{}",
				form_component(credentials.client_id.as_ref()),
				form_component(credentials.client_secret.expose()),
			);
			let basic = format!("Basic {}", STANDARD.encode(pair));

			(
				builder.header(AUTHORIZATION, basic).header(CONTENT_TYPE, FORM_CONTENT_TYPE),
				encode_form(&form).into_bytes(),
			)
		},
		ClientAuthMethod::QueryString => {
			form.insert("client_id", credentials.client_id.as_ref());
			form.insert("client_secret", credentials.client_secret.expose());
			endpoint.query_pairs_mut().extend_pairs(form.iter());

			(builder, Vec::new())
		},
	};
	let request = builder.uri(endpoint.as_str()).body(body).map_err(ConfigError::from)?;

	Ok(request)
}

pub(crate) fn parse_token_response(
	response: HttpResponse,
	meta: Option<&ResponseMetadata>,
) -> Result<TokenGrant> {
	let status = response.status().as_u16();

	if !response.status().is_success() {
		return Err(TokenAcquisitionError::Status {
			status,
			message: body_preview(response.body()),
			retry_after: meta.and_then(|value| value.retry_after),
		}
		.into());
	}

	let mut deserializer = serde_json::Deserializer::from_slice(response.body());
	let parsed: TokenEndpointResponse = serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|e| TokenAcquisitionError::MalformedResponse {
			source: Arc::new(e),
			status: Some(status),
		})?;
	let access_token = parsed
		.access_token
		.filter(|token| !token.is_empty())
		.ok_or(TokenAcquisitionError::MissingAccessToken { status })?;
	let lifetime = match parsed.expires_in {
		None | Some(0) => DEFAULT_LIFETIME,
		Some(secs) => Duration::seconds(
			i64::try_from(secs).map_err(|_| TokenAcquisitionError::LifetimeOutOfRange)?,
		),
	};

	Ok(TokenGrant {
		access_token: Secret::new(access_token),
		lifetime,
		received_at: OffsetDateTime::now_utc(),
	})
}

fn encode_form(form: &BTreeMap<&str, &str>) -> String {
	Serializer::new(String::new()).extend_pairs(form.iter()).finish()
}

// RFC 6749 section 2.3.1: credentials are form-encoded before Basic encoding.
fn form_component(value: &str) -> String {
	url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

fn body_preview(body: &[u8]) -> String {
	let text = String::from_utf8_lossy(body);
	let trimmed = text.trim();

	if trimmed.is_empty() {
		return "empty response body".into();
	}

	trimmed.chars().take(BODY_PREVIEW_LIMIT).collect()
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(err: ReqwestError) -> Error {
	if err.is_builder() {
		return ConfigError::from(err).into();
	}
	if err.is_timeout() {
		return TokenAcquisitionError::Timeout.into();
	}

	TokenAcquisitionError::network(err).into()
}

#[cfg(feature = "reqwest")]
fn map_generic_transport_error(meta: Option<&ResponseMetadata>, message: impl Display) -> Error {
	match meta.and_then(|value| value.status) {
		Some(status) => TokenAcquisitionError::Status {
			status,
			message: message.to_string(),
			retry_after: meta.and_then(|value| value.retry_after),
		},
		None => TokenAcquisitionError::Transport { message: message.to_string() },
	}
	.into()
}
