// self
use crate::{_prelude::*, auth::ApiName};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFlow<F> = F;

/// Span wrapper used around token lookups and refreshes.
#[derive(Clone, Debug)]
pub struct CacheSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl CacheSpan {
	/// Creates a new span tagged with the API name and stage.
	pub fn new(api_name: &ApiName, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span =
				tracing::info_span!("credential_cache.token", api = api_name.as_ref(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (api_name, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedFlow<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Emits a debug event when a refresh generation starts.
pub fn refresh_started(api_name: &ApiName, generation: u64) {
	#[cfg(feature = "tracing")]
	tracing::debug!(api = api_name.as_ref(), generation, "starting token refresh");
	#[cfg(not(feature = "tracing"))]
	let _ = (api_name, generation);
}

/// Emits a warning when a refresh generation fails.
pub fn refresh_failed(api_name: &ApiName, generation: u64, error: &Error) {
	#[cfg(feature = "tracing")]
	tracing::warn!(api = api_name.as_ref(), generation, %error, "token refresh failed");
	#[cfg(not(feature = "tracing"))]
	let _ = (api_name, generation, error);
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn events_without_subscriber_are_noops() {
		let api = ApiName::new("IGDB").expect("API name fixture should be valid.");
		let error: Error = crate::error::TokenAcquisitionError::Timeout.into();

		refresh_started(&api, 1);
		refresh_failed(&api, 1, &error);
	}

	#[tokio::test]
	async fn instrument_wraps_future() {
		let api = ApiName::new("IGDB").expect("API name fixture should be valid.");
		let span = CacheSpan::new(&api, "instrument_wraps_future");
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
	}
}
