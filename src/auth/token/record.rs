//! Cached token record, its validity window, and the builder that applies the safety margin.

// self
use crate::{
	_prelude::*,
	auth::{ApiName, token::secret::Secret},
};

/// Margin subtracted from every upstream-reported lifetime so tokens are replaced before the
/// provider starts rejecting them.
pub const SAFETY_MARGIN: Duration = Duration::minutes(5);
/// Lifetime assumed when the token endpoint does not report `expires_in`.
pub const DEFAULT_LIFETIME: Duration = Duration::days(60);

/// Validity of a record at a given instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenStatus {
	/// Token may be handed out.
	Active,
	/// Token reached its expiry instant and must be treated as absent.
	Expired,
}

/// Errors produced by [`TokenRecordBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum TokenRecordBuilderError {
	/// Issued when no token value was provided.
	#[error("Access token is required.")]
	MissingToken,
	/// Issued when no expiry (absolute or lifetime) was configured.
	#[error("Expiry must be supplied via expires_at or lifetime.")]
	MissingExpiry,
	/// The lifetime pushes the expiry past the representable range.
	#[error("Token lifetime exceeds the supported range.")]
	LifetimeOutOfRange,
}

/// One cached credential for one upstream API.
///
/// At most one record exists per [`ApiName`]; a refresh replaces it in place.
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenRecord {
	/// Upstream API this token authenticates against.
	pub api_name: ApiName,
	/// Bearer credential; callers must avoid logging it.
	pub token: Secret,
	/// Instant from which the token must no longer be used.
	pub expires_at: OffsetDateTime,
}
impl TokenRecord {
	/// Returns a builder for a record belonging to `api_name`.
	pub fn builder(api_name: ApiName) -> TokenRecordBuilder {
		TokenRecordBuilder::new(api_name)
	}

	/// Computes the status at a given instant. A record is active strictly before
	/// `expires_at`.
	pub fn status_at(&self, instant: OffsetDateTime) -> TokenStatus {
		if instant >= self.expires_at { TokenStatus::Expired } else { TokenStatus::Active }
	}

	/// Returns `true` if the token may be handed out at `instant`.
	pub fn is_valid_at(&self, instant: OffsetDateTime) -> bool {
		matches!(self.status_at(instant), TokenStatus::Active)
	}

	/// Returns `true` if the token may be handed out now.
	pub fn is_valid(&self) -> bool {
		self.is_valid_at(OffsetDateTime::now_utc())
	}

	/// Time left before expiry at `instant`, or `None` once expired.
	pub fn remaining_at(&self, instant: OffsetDateTime) -> Option<Duration> {
		self.is_valid_at(instant).then(|| self.expires_at - instant)
	}
}
impl Debug for TokenRecord {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenRecord")
			.field("api_name", &self.api_name)
			.field("token", &"<redacted>")
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Builder for [`TokenRecord`].
#[derive(Clone, Debug)]
pub struct TokenRecordBuilder {
	api_name: ApiName,
	token: Option<Secret>,
	issued_at: Option<OffsetDateTime>,
	expires_at: Option<OffsetDateTime>,
	lifetime: Option<Duration>,
}
impl TokenRecordBuilder {
	fn new(api_name: ApiName) -> Self {
		Self { api_name, token: None, issued_at: None, expires_at: None, lifetime: None }
	}

	/// Provides the token value.
	pub fn token(mut self, token: impl Into<String>) -> Self {
		self.token = Some(Secret::new(token));

		self
	}

	/// Sets the instant the upstream lifetime is measured from (defaults to now).
	pub fn issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = Some(instant);

		self
	}

	/// Sets an absolute expiry instant, used verbatim.
	pub fn expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Sets the upstream-reported lifetime; [`SAFETY_MARGIN`] is subtracted on build.
	pub fn lifetime(mut self, lifetime: Duration) -> Self {
		self.lifetime = Some(lifetime);

		self
	}

	/// Consumes the builder and produces a [`TokenRecord`].
	pub fn build(self) -> Result<TokenRecord, TokenRecordBuilderError> {
		let token = self.token.ok_or(TokenRecordBuilderError::MissingToken)?;
		let expires_at = match (self.expires_at, self.lifetime) {
			(Some(instant), _) => instant,
			(None, Some(lifetime)) => expiry_from(
				self.issued_at.unwrap_or_else(OffsetDateTime::now_utc),
				lifetime,
			)?,
			(None, None) => return Err(TokenRecordBuilderError::MissingExpiry),
		};

		Ok(TokenRecord { api_name: self.api_name, token, expires_at })
	}
}

/// Expiry instant for a token issued at `issued_at` with the upstream-reported `lifetime`.
///
/// Lifetimes shorter than [`SAFETY_MARGIN`] yield an instant at or before `issued_at`.
pub fn expiry_from(
	issued_at: OffsetDateTime,
	lifetime: Duration,
) -> Result<OffsetDateTime, TokenRecordBuilderError> {
	lifetime
		.checked_sub(SAFETY_MARGIN)
		.and_then(|usable| issued_at.checked_add(usable))
		.ok_or(TokenRecordBuilderError::LifetimeOutOfRange)
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	fn api() -> ApiName {
		ApiName::new("IGDB").expect("API name fixture should be valid.")
	}

	#[test]
	fn record_is_valid_strictly_before_expiry() {
		let record = TokenRecord::builder(api())
			.token("tok")
			.expires_at(macros::datetime!(2025-01-01 01:00 UTC))
			.build()
			.expect("Record with absolute expiry should build.");

		assert_eq!(record.status_at(macros::datetime!(2025-01-01 00:59 UTC)), TokenStatus::Active);
		assert_eq!(record.status_at(macros::datetime!(2025-01-01 01:00 UTC)), TokenStatus::Expired);
		assert_eq!(record.status_at(macros::datetime!(2025-01-01 02:00 UTC)), TokenStatus::Expired);
		assert_eq!(
			record.remaining_at(macros::datetime!(2025-01-01 00:30 UTC)),
			Some(Duration::minutes(30))
		);
		assert_eq!(record.remaining_at(macros::datetime!(2025-01-01 01:00 UTC)), None);
	}

	#[test]
	fn lifetime_has_safety_margin_subtracted() {
		let record = TokenRecord::builder(api())
			.token("tok")
			.issued_at(macros::datetime!(2025-01-01 00:00 UTC))
			.lifetime(Duration::seconds(3600))
			.build()
			.expect("Record with relative lifetime should build.");

		assert_eq!(record.expires_at, macros::datetime!(2025-01-01 00:55 UTC));
	}

	#[test]
	fn default_lifetime_is_sixty_days_minus_margin() {
		let issued = macros::datetime!(2025-01-01 00:00 UTC);
		let expires = expiry_from(issued, DEFAULT_LIFETIME).expect("Default lifetime should fit.");

		assert_eq!(expires, macros::datetime!(2025-03-01 23:55 UTC));
	}

	#[test]
	fn short_lifetime_is_already_expired() {
		let issued = macros::datetime!(2025-01-01 00:00 UTC);
		let record = TokenRecord::builder(api())
			.token("tok")
			.issued_at(issued)
			.lifetime(Duration::seconds(120))
			.build()
			.expect("Short lifetimes are not special-cased.");

		assert!(record.expires_at <= issued);
		assert!(!record.is_valid_at(issued));
	}

	#[test]
	fn builder_requires_token_and_expiry() {
		assert_eq!(
			TokenRecord::builder(api()).lifetime(Duration::HOUR).build().unwrap_err(),
			TokenRecordBuilderError::MissingToken
		);
		assert_eq!(
			TokenRecord::builder(api()).token("tok").build().unwrap_err(),
			TokenRecordBuilderError::MissingExpiry
		);
		assert_eq!(
			TokenRecord::builder(api())
				.token("tok")
				.issued_at(OffsetDateTime::now_utc())
				.lifetime(Duration::MAX)
				.build()
				.unwrap_err(),
			TokenRecordBuilderError::LifetimeOutOfRange
		);
	}

	#[test]
	fn debug_redacts_token() {
		let record = TokenRecord::builder(api())
			.token("very-secret")
			.lifetime(Duration::HOUR)
			.build()
			.expect("Record fixture should build.");

		assert!(!format!("{record:?}").contains("very-secret"));
	}
}
