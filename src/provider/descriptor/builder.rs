// std
use std::net::IpAddr;
// self
use crate::{
	_prelude::*,
	auth::ApiName,
	provider::{ClientAuthMethod, ProviderDescriptor},
};

/// Errors raised while constructing or validating descriptors.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ProviderDescriptorError {
	/// Token endpoint is mandatory.
	#[error("Missing token endpoint.")]
	MissingTokenEndpoint,
	/// Token endpoint could not be parsed.
	#[error("Token endpoint is not a valid URL: {message}.")]
	InvalidEndpoint {
		/// Parser message.
		message: String,
	},
	/// Endpoints must use HTTPS unless they point at a loopback host.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
}

/// Builder for [`ProviderDescriptor`] values.
#[derive(Debug)]
pub struct ProviderDescriptorBuilder {
	/// Store key for the descriptor being constructed.
	pub api_name: ApiName,
	/// Client-credentials token endpoint.
	pub token_endpoint: Option<Url>,
	/// Client authentication method for the token endpoint.
	pub client_auth_method: ClientAuthMethod,
}
impl ProviderDescriptorBuilder {
	/// Creates a new builder seeded with the provided API name.
	pub fn new(api_name: ApiName) -> Self {
		Self { api_name, token_endpoint: None, client_auth_method: ClientAuthMethod::default() }
	}

	/// Sets the token endpoint.
	pub fn token_endpoint(mut self, url: Url) -> Self {
		self.token_endpoint = Some(url);

		self
	}

	/// Overrides the client authentication method.
	pub fn client_auth_method(mut self, method: ClientAuthMethod) -> Self {
		self.client_auth_method = method;

		self
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<ProviderDescriptor, ProviderDescriptorError> {
		let token_endpoint =
			self.token_endpoint.ok_or(ProviderDescriptorError::MissingTokenEndpoint)?;

		validate_endpoint("token", &token_endpoint)?;

		Ok(ProviderDescriptor {
			api_name: self.api_name,
			token_endpoint,
			client_auth_method: self.client_auth_method,
		})
	}
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), ProviderDescriptorError> {
	match url.scheme() {
		"https" => Ok(()),
		"http" if is_loopback(url) => Ok(()),
		_ => Err(ProviderDescriptorError::InsecureEndpoint { endpoint: name, url: url.to_string() }),
	}
}

fn is_loopback(url: &Url) -> bool {
	match url.host_str() {
		Some("localhost") => true,
		Some(host) => host
			.trim_start_matches('[')
			.trim_end_matches(']')
			.parse::<IpAddr>()
			.is_ok_and(|ip| ip.is_loopback()),
		None => false,
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn api() -> ApiName {
		ApiName::new("IGDB").expect("API name fixture should be valid.")
	}

	fn url(value: &str) -> Url {
		Url::parse(value).expect("Endpoint fixture should parse.")
	}

	#[test]
	fn rejects_missing_and_insecure_endpoints() {
		assert_eq!(
			ProviderDescriptor::builder(api()).build().unwrap_err(),
			ProviderDescriptorError::MissingTokenEndpoint
		);

		let err = ProviderDescriptor::builder(api())
			.token_endpoint(url("http://id.example.com/oauth2/token"))
			.build()
			.expect_err("Plain HTTP to a remote host must be rejected.");

		assert!(matches!(err, ProviderDescriptorError::InsecureEndpoint { endpoint: "token", .. }));
	}

	#[test]
	fn accepts_loopback_http_for_local_servers() {
		for endpoint in
			["http://127.0.0.1:8080/token", "http://localhost/token", "http://[::1]:9000/token"]
		{
			ProviderDescriptor::builder(api())
				.token_endpoint(url(endpoint))
				.client_auth_method(ClientAuthMethod::QueryString)
				.build()
				.unwrap_or_else(|e| panic!("Loopback endpoint {endpoint} should be accepted: {e}"));
		}
	}
}
