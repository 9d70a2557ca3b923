//! In-process refresh coordination: the slot holding the single in-flight refresh.

// crates.io
use futures::future::{BoxFuture, Shared};
// self
use crate::{_prelude::*, auth::Secret};

/// Shared handle every caller of one refresh generation awaits.
pub(crate) type SharedRefresh = Shared<BoxFuture<'static, Result<Secret>>>;

/// Observable refresh state of a cache instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RefreshState {
	/// No refresh in flight.
	Idle,
	/// A refresh is in flight; callers needing a token attach to it.
	Refreshing {
		/// Monotonic refresh counter, starting at 1 for the first refresh.
		generation: u64,
	},
}

struct InFlight {
	generation: u64,
	refresh: SharedRefresh,
}

/// Check-and-set slot for the in-flight refresh.
///
/// Every method is synchronous; callers hold the surrounding mutex only for the duration of
/// one call and never across an `.await`.
#[derive(Default)]
pub(crate) struct FlightSlot {
	last_generation: u64,
	in_flight: Option<InFlight>,
}
impl FlightSlot {
	/// Handle of the refresh in flight, if any.
	pub(crate) fn current(&self) -> Option<SharedRefresh> {
		self.in_flight.as_ref().map(|flight| flight.refresh.clone())
	}

	/// Installs a new refresh built for the next generation and returns that generation.
	///
	/// Must only be called while [`FlightSlot::current`] is `None`.
	pub(crate) fn start(&mut self, build: impl FnOnce(u64) -> SharedRefresh) -> (u64, SharedRefresh) {
		debug_assert!(self.in_flight.is_none(), "A refresh is already in flight.");

		self.last_generation += 1;

		let generation = self.last_generation;
		let refresh = build(generation);

		self.in_flight = Some(InFlight { generation, refresh: refresh.clone() });

		(generation, refresh)
	}

	/// Clears the slot if it still holds `generation`. Returns whether it did.
	pub(crate) fn settle(&mut self, generation: u64) -> bool {
		if self.in_flight.as_ref().is_some_and(|flight| flight.generation == generation) {
			self.in_flight = None;

			true
		} else {
			false
		}
	}

	pub(crate) fn state(&self) -> RefreshState {
		match &self.in_flight {
			Some(flight) => RefreshState::Refreshing { generation: flight.generation },
			None => RefreshState::Idle,
		}
	}
}
