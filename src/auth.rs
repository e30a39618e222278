//! Credential material: client credentials, PKCE pairs, and token records.

pub mod credentials;
pub mod pkce;
pub mod secret;
pub mod token;

pub use credentials::Credentials;
pub use pkce::PkceChallenge;
pub use secret::Secret;
pub use token::{TokenRecord, TokenRecordError};
