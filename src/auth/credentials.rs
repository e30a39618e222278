//! Immutable OAuth client credentials.

// self
use crate::{_prelude::*, auth::secret::Secret};

/// OAuth client credentials shared read-only across the negotiator and client.
///
/// A missing client secret marks the public-client (PKCE-only) mode; the
/// negotiator then refuses a code exchange without a PKCE verifier.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Credentials {
	/// OAuth 2.0 client identifier.
	pub client_id: String,
	/// Optional secret for confidential clients.
	pub client_secret: Option<Secret>,
}
impl Credentials {
	/// Creates public-client (PKCE-only) credentials.
	pub fn new(client_id: impl Into<String>) -> Self {
		Self { client_id: client_id.into(), client_secret: None }
	}

	/// Attaches a confidential client secret.
	pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
		self.client_secret = Some(Secret::new(secret));

		self
	}

	/// Returns `true` when only the PKCE flow can authenticate this client.
	pub fn is_public(&self) -> bool {
		self.client_secret.is_none()
	}
}
