//! Provider descriptor data structures shared by the cache and the token exchange.

/// Builder API for assembling provider descriptors.
pub mod builder;

pub use builder::*;

// self
use crate::{_prelude::*, auth::ApiName, error::ConfigError};

/// Token endpoint used by Twitch, which issues IGDB app access tokens.
pub const TWITCH_TOKEN_ENDPOINT: &str = "https://id.twitch.tv/oauth2/token";
/// Store key for IGDB tokens.
pub const IGDB_API_NAME: &str = "IGDB";

/// How client credentials travel to the token endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
	#[default]
	/// Form POST body parameters for `client_id`/`client_secret`.
	ClientSecretPost,
	/// HTTP Basic with `client_id`/`client_secret`.
	ClientSecretBasic,
	/// URL query parameters on an empty POST, as older Twitch integrations send them.
	QueryString,
}

/// Immutable provider descriptor consumed by the cache.
///
/// Deserialization goes through [`ProviderDescriptorBuilder`], so descriptors loaded from
/// configuration files obey the same endpoint rules as hand-built ones.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawProviderDescriptor")]
pub struct ProviderDescriptor {
	/// Store key for tokens minted by this provider.
	pub api_name: ApiName,
	/// Client-credentials token endpoint.
	pub token_endpoint: Url,
	/// Client authentication mechanism.
	pub client_auth_method: ClientAuthMethod,
}
impl ProviderDescriptor {
	/// Creates a new builder for the provided API name.
	pub fn builder(api_name: ApiName) -> ProviderDescriptorBuilder {
		ProviderDescriptorBuilder::new(api_name)
	}

	/// Descriptor for IGDB tokens issued by the Twitch identity service.
	pub fn igdb() -> Result<Self, ConfigError> {
		let api_name = ApiName::new(IGDB_API_NAME)?;
		let token_endpoint = Url::parse(TWITCH_TOKEN_ENDPOINT)
			.map_err(|e| ProviderDescriptorError::InvalidEndpoint { message: e.to_string() })?;

		Ok(Self::builder(api_name).token_endpoint(token_endpoint).build()?)
	}
}

impl TryFrom<RawProviderDescriptor> for ProviderDescriptor {
	type Error = ProviderDescriptorError;

	fn try_from(raw: RawProviderDescriptor) -> Result<Self, Self::Error> {
		Self::builder(raw.api_name)
			.token_endpoint(raw.token_endpoint)
			.client_auth_method(raw.client_auth_method)
			.build()
	}
}

#[derive(Deserialize)]
struct RawProviderDescriptor {
	api_name: ApiName,
	token_endpoint: Url,
	#[serde(default)]
	client_auth_method: ClientAuthMethod,
}
