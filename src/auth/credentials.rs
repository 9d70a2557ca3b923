//! Client credentials presented to the token endpoint.

// std
use std::env;
// self
use crate::{
	_prelude::*,
	auth::{ClientId, Secret},
	error::ConfigError,
};

/// Environment variable holding the IGDB (Twitch) client identifier.
pub const IGDB_CLIENT_ID_ENV: &str = "IGDB_CLIENT_ID";
/// Environment variable holding the IGDB (Twitch) client secret.
pub const IGDB_SECRET_ENV: &str = "IGDB_SECRET";

/// Confidential client identity used for the `client_credentials` grant.
#[derive(Clone, Serialize, Deserialize)]
pub struct ClientCredentials {
	/// OAuth client identifier.
	pub client_id: ClientId,
	/// OAuth client secret.
	pub client_secret: Secret,
}
impl ClientCredentials {
	/// Pairs a client identifier with its secret.
	pub fn new(client_id: ClientId, client_secret: impl Into<String>) -> Self {
		Self { client_id, client_secret: Secret::new(client_secret) }
	}

	/// Reads credentials from the named environment variables.
	pub fn from_env(id_var: &str, secret_var: &str) -> Result<Self, ConfigError> {
		let client_id = ClientId::new(read_env(id_var)?)?;
		let client_secret = read_env(secret_var)?;

		Ok(Self::new(client_id, client_secret))
	}

	/// Reads credentials from `IGDB_CLIENT_ID` and `IGDB_SECRET`.
	pub fn igdb_from_env() -> Result<Self, ConfigError> {
		Self::from_env(IGDB_CLIENT_ID_ENV, IGDB_SECRET_ENV)
	}
}
impl Debug for ClientCredentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientCredentials")
			.field("client_id", &self.client_id)
			.field("client_secret", &"<redacted>")
			.finish()
	}
}

fn read_env(name: &str) -> Result<String, ConfigError> {
	env::var(name)
		.ok()
		.filter(|value| !value.is_empty())
		.ok_or_else(|| ConfigError::MissingEnv { name: name.to_owned() })
}
