//! Authorization Code + PKCE (RFC 7636) challenge material.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::Rng;
use sha2::{Digest, Sha256};
// self
use crate::_prelude::*;

const VERIFIER_BYTES: usize = 32;

/// Single-use PKCE verifier/challenge pair bound to one authorization attempt.
///
/// The pair must never be reused across attempts; generate a fresh one per
/// authorization and discard it after the code exchange, successful or not.
#[derive(Clone)]
pub struct PkceChallenge {
	verifier: String,
	challenge: String,
}
impl PkceChallenge {
	/// Generates a fresh pair from 32 CSPRNG bytes.
	///
	/// The verifier is the URL-safe unpadded base64 of the raw bytes (43
	/// characters); the challenge is the same encoding of the verifier's
	/// SHA-256 digest (`S256`).
	pub fn generate() -> Self {
		let mut bytes = [0_u8; VERIFIER_BYTES];

		rand::rng().fill(&mut bytes);

		let verifier = URL_SAFE_NO_PAD.encode(bytes);
		let challenge = compute_challenge(&verifier);

		Self { verifier, challenge }
	}

	/// Secret verifier submitted during the code exchange.
	pub fn verifier(&self) -> &str {
		&self.verifier
	}

	/// Public challenge embedded in the authorization URL.
	pub fn challenge(&self) -> &str {
		&self.challenge
	}

	/// RFC 7636 identifier of the challenge method.
	pub const fn method(&self) -> &'static str {
		"S256"
	}
}
impl Debug for PkceChallenge {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("PkceChallenge")
			.field("verifier", &"<redacted>")
			.field("challenge", &self.challenge)
			.finish()
	}
}

/// Computes `base64url_nopad(sha256(verifier))`.
fn compute_challenge(verifier: &str) -> String {
	let digest = Sha256::digest(verifier.as_bytes());

	URL_SAFE_NO_PAD.encode(digest)
}
