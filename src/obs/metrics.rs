// self
use crate::{auth::ApiName, obs::LookupOutcome};

/// Records a lookup outcome via the global metrics recorder (when enabled).
pub fn record_lookup_outcome(api_name: &ApiName, outcome: LookupOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"credential_cache_token_total",
			"api" => api_name.to_string(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (api_name, outcome);
	}
}
