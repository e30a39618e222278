//! Token records and expiry policy.

// self
use crate::{_prelude::*, auth::secret::Secret};

/// Safety skew subtracted from the expiry instant to absorb clock drift and
/// in-flight request latency.
pub const EXPIRY_SKEW: Duration = Duration::minutes(5);

/// Errors produced when constructing a [`TokenRecord`].
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum TokenRecordError {
	/// The access token value was empty.
	#[error("Access token must not be empty.")]
	EmptyAccessToken,
}

/// Issued OAuth tokens together with their expiry instant.
///
/// A record always carries a non-empty access token. The store owns the
/// persisted record; callers hold at most a transient copy of the access
/// token string.
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenRecord {
	/// Access token secret; callers must avoid logging it.
	pub access_token: Secret,
	/// Refresh token secret, if the provider issued one.
	pub refresh_token: Option<Secret>,
	/// Expiry instant; `None` means the token never expires.
	pub expires_at: Option<OffsetDateTime>,
}
impl TokenRecord {
	/// Creates a record holding a bare access token.
	pub fn new(access_token: impl Into<String>) -> Result<Self, TokenRecordError> {
		let access_token = access_token.into();

		if access_token.is_empty() {
			return Err(TokenRecordError::EmptyAccessToken);
		}

		Ok(Self {
			access_token: Secret::new(access_token),
			refresh_token: None,
			expires_at: None,
		})
	}

	/// Attaches the refresh token.
	pub fn with_refresh_token(mut self, token: impl Into<String>) -> Self {
		self.refresh_token = Some(Secret::new(token));

		self
	}

	/// Sets an absolute expiry instant.
	pub fn with_expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Sets the expiry relative to the provided issuance instant.
	pub fn with_expires_in(self, issued_at: OffsetDateTime, expires_in: Duration) -> Self {
		self.with_expires_at(issued_at + expires_in)
	}

	/// Returns `true` when the record counts as expired at `instant`,
	/// applying the five-minute skew window. Records without an expiry never
	/// expire.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		match self.expires_at {
			Some(expires_at) => instant + EXPIRY_SKEW >= expires_at,
			None => false,
		}
	}

	/// Convenience helper checking expiry against the current clock.
	pub fn is_expired(&self) -> bool {
		self.is_expired_at(OffsetDateTime::now_utc())
	}

	/// Returns `true` when a refresh token is available.
	pub fn can_refresh(&self) -> bool {
		self.refresh_token.is_some()
	}
}
impl Debug for TokenRecord {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenRecord")
			.field("access_token", &"<redacted>")
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn empty_access_token_is_rejected() {
		let err = TokenRecord::new("").expect_err("Empty access token should be rejected.");

		assert_eq!(err, TokenRecordError::EmptyAccessToken);
	}

	#[test]
	fn skew_window_matches_the_expiry_policy() {
		let issued = macros::datetime!(2026-01-01 00:00 UTC);
		let record = TokenRecord::new("access")
			.expect("Record fixture should build.")
			.with_expires_in(issued, Duration::seconds(3600));

		assert!(!record.is_expired_at(issued + Duration::seconds(3000)));
		assert!(record.is_expired_at(issued + Duration::seconds(3595)));
		assert!(record.is_expired_at(issued + Duration::seconds(3600)));
	}

	#[test]
	fn records_without_expiry_never_expire() {
		let record = TokenRecord::new("access").expect("Record fixture should build.");

		assert!(!record.is_expired_at(macros::datetime!(2099-01-01 00:00 UTC)));
	}

	#[test]
	fn refresh_capability_follows_the_refresh_token() {
		let bare = TokenRecord::new("access").expect("Record fixture should build.");

		assert!(!bare.can_refresh());
		assert!(bare.with_refresh_token("refresh").can_refresh());
	}

	#[test]
	fn debug_redacts_both_secrets() {
		let record = TokenRecord::new("tok-access-xyz")
			.expect("Record fixture should build.")
			.with_refresh_token("tok-refresh-xyz");
		let rendered = format!("{record:?}");

		assert!(!rendered.contains("tok-access-xyz"));
		assert!(!rendered.contains("tok-refresh-xyz"));
	}
}
