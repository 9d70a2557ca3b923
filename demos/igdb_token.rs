//! Demonstrates sharing one token cache between concurrent tasks against a mocked Twitch
//! token endpoint, then signing an IGDB request with the cached token.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use url::Url;
// self
use credential_token_cache::{
	auth::{ApiName, ClientCredentials, ClientId},
	cache::ReqwestTokenCache,
	http::ReqwestHttpClient,
	oauth::ReqwestTransportErrorMapper,
	provider::{ClientAuthMethod, ProviderDescriptor},
	reqwest::{Client, redirect::Policy},
	store::{MemoryStore, TokenStore},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/token").query_param("grant_type", "client_credentials");
			then.status(200)
				.header("content-type", "application/json")
				.delay(std::time::Duration::from_millis(100))
				.body("{\"access_token\":\"demo-access\",\"expires_in\":5184000,\"token_type\":\"bearer\"}");
		})
		.await;
	let games_mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/v4/games")
				.header("client-id", "demo-client")
				.header("authorization", "Bearer demo-access");
			then.status(200).header("content-type", "application/json").body("[{\"id\":1942}]");
		})
		.await;
	let store: Arc<dyn TokenStore> = Arc::new(MemoryStore::default());
	let descriptor = ProviderDescriptor::builder(ApiName::new("IGDB")?)
		.token_endpoint(Url::parse(&server.url("/oauth2/token"))?)
		.client_auth_method(ClientAuthMethod::QueryString)
		.build()?;
	let credentials = ClientCredentials::new(ClientId::new("demo-client")?, "demo-secret");
	// The mock server presents a self-signed certificate.
	let client = Client::builder()
		.danger_accept_invalid_certs(true)
		.danger_accept_invalid_hostnames(true)
		.redirect(Policy::none())
		.build()?;
	let cache = ReqwestTokenCache::with_http_client(
		store,
		descriptor,
		credentials,
		ReqwestHttpClient::with_client(client.clone()),
		ReqwestTransportErrorMapper,
	);
	let tasks = (0..4)
		.map(|_| {
			let cache = cache.clone();

			tokio::spawn(async move { cache.get_token().await })
		})
		.collect::<Vec<_>>();

	for task in tasks {
		task.await??;
	}

	token_mock.assert_calls_async(1).await;

	let response = cache
		.sign(client.post(server.url("/v4/games")).body("fields name; where id = 1942;"))
		.await?
		.send()
		.await?;

	println!("IGDB answered {} with {}.", response.status(), response.text().await?);

	games_mock.assert_async().await;

	Ok(())
}
