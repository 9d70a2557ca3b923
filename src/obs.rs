//! Optional observability helpers for token lookups and refreshes.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit spans named `credential_cache.token` with the `api` and `stage`
//!   fields, plus `debug`/`warn` events when refreshes start or fail.
//! - Enable `metrics` to increment the `credential_cache_token_total` counter for every
//!   lookup outcome, labeled by `api` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Outcome labels recorded for each token lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LookupOutcome {
	/// Durable store held a valid token.
	Hit,
	/// Caller attached to a refresh already in flight.
	Joined,
	/// Caller started a new refresh.
	Refresh,
	/// Refresh found a valid token on its re-read and skipped the upstream call.
	Reused,
	/// Refresh obtained and persisted a new token.
	Success,
	/// Refresh failed; every attached caller receives the error.
	Failure,
}
impl LookupOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			LookupOutcome::Hit => "hit",
			LookupOutcome::Joined => "joined",
			LookupOutcome::Refresh => "refresh",
			LookupOutcome::Reused => "reused",
			LookupOutcome::Success => "success",
			LookupOutcome::Failure => "failure",
		}
	}
}
impl Display for LookupOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
