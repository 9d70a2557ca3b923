//! Request signing contracts that attach cached bearer tokens to outbound requests.
//!
//! Twitch-hosted APIs such as IGDB expect two headers on every call: `Client-ID` carrying the
//! OAuth client identifier and `Authorization: Bearer <token>`. [`ClientIdBearerSigner`]
//! writes both for `http::Request` values and, with the `reqwest` feature, for
//! [`reqwest::RequestBuilder`].

// crates.io
use oauth2::http::{
	self, Request,
	header::{AUTHORIZATION, HeaderName, HeaderValue},
};
// self
use crate::{
	_prelude::*,
	auth::{ClientId, Secret},
	error::ConfigError,
};

/// Header carrying the OAuth client identifier on Twitch-hosted APIs.
pub const CLIENT_ID_HEADER: &str = "client-id";

/// Describes how to attach a bearer token to an outbound request without constraining the
/// HTTP client type.
pub trait RequestSignerExt<Request>
where
	Self: Send + Sync,
{
	/// Consumes the provided request and injects authorization state derived from `token`.
	fn attach_token(&self, request: Request, token: &Secret) -> Result<Request>;
}

/// Signer that adds `Client-ID` and `Authorization: Bearer` headers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientIdBearerSigner {
	client_id: ClientId,
}
impl ClientIdBearerSigner {
	/// Creates a signer for `client_id`.
	pub fn new(client_id: ClientId) -> Self {
		Self { client_id }
	}

	/// Client identifier written into the `Client-ID` header.
	pub fn client_id(&self) -> &ClientId {
		&self.client_id
	}
}
impl<B> RequestSignerExt<Request<B>> for ClientIdBearerSigner {
	fn attach_token(&self, mut request: Request<B>, token: &Secret) -> Result<Request<B>> {
		let client_id = header_value(self.client_id.as_ref())?;
		let mut bearer = header_value(&token.bearer())?;

		bearer.set_sensitive(true);

		let headers = request.headers_mut();

		headers.insert(HeaderName::from_static(CLIENT_ID_HEADER), client_id);
		headers.insert(AUTHORIZATION, bearer);

		Ok(request)
	}
}
#[cfg(feature = "reqwest")]
impl RequestSignerExt<reqwest::RequestBuilder> for ClientIdBearerSigner {
	fn attach_token(
		&self,
		request: reqwest::RequestBuilder,
		token: &Secret,
	) -> Result<reqwest::RequestBuilder> {
		let client_id: &str = self.client_id.as_ref();

		Ok(request.header(CLIENT_ID_HEADER, client_id).bearer_auth(token.expose()))
	}
}

fn header_value(raw: &str) -> Result<HeaderValue> {
	HeaderValue::from_str(raw).map_err(|e| ConfigError::from(http::Error::from(e)).into())
}
