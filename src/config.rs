//! Client configuration with explicit construction and environment loading.
//!
//! Nothing in this crate reads configuration ambiently; a [`Config`] is built
//! once and threaded through the executor, negotiator, client, and monitors.

// std
use std::{env, path::PathBuf};
// self
use crate::{_prelude::*, auth::Credentials, error::ConfigError};

/// Default REST base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.restream.io/v2";
/// Default streaming-event WebSocket endpoint.
pub const DEFAULT_STREAMING_WS_URL: &str = "wss://streaming.api.restream.io/ws";
/// Default chat-event WebSocket endpoint.
pub const DEFAULT_CHAT_WS_URL: &str = "wss://chat.api.restream.io/ws";

/// Environment variable naming the OAuth client id.
pub const ENV_CLIENT_ID: &str = "RESTREAM_CLIENT_ID";
/// Environment variable naming the optional OAuth client secret.
pub const ENV_CLIENT_SECRET: &str = "RESTREAM_CLIENT_SECRET";
/// Environment variable overriding the config directory.
pub const ENV_CONFIG_PATH: &str = "RESTREAM_CONFIG_PATH";

const DEFAULT_REQUEST_TIMEOUT: StdDuration = StdDuration::from_secs(30);
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_RETRY_BACKOFF_FACTOR: f64 = 0.5;

/// Complete configuration for the client runtime.
#[derive(Clone, Debug)]
pub struct Config {
	/// REST base URL.
	pub base_url: Url,
	/// OAuth client credentials.
	pub credentials: Credentials,
	/// Per-request timeout applied by the executor.
	pub request_timeout: StdDuration,
	/// Additional attempts allowed after the first failure.
	pub max_retries: u32,
	/// Base backoff factor in seconds; the retry delay doubles per attempt.
	pub retry_backoff_factor: f64,
	/// Streaming monitor endpoint.
	pub streaming_ws_url: Url,
	/// Chat monitor endpoint.
	pub chat_ws_url: Url,
}
impl Config {
	/// Creates a configuration with crate defaults for the given client id.
	pub fn new(client_id: impl Into<String>) -> Self {
		Self {
			base_url: default_url(DEFAULT_BASE_URL),
			credentials: Credentials::new(client_id),
			request_timeout: DEFAULT_REQUEST_TIMEOUT,
			max_retries: DEFAULT_MAX_RETRIES,
			retry_backoff_factor: DEFAULT_RETRY_BACKOFF_FACTOR,
			streaming_ws_url: default_url(DEFAULT_STREAMING_WS_URL),
			chat_ws_url: default_url(DEFAULT_CHAT_WS_URL),
		}
	}

	/// Loads the client id and optional client secret from the environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		let client_id =
			env::var(ENV_CLIENT_ID).map_err(|_| ConfigError::MissingEnv { name: ENV_CLIENT_ID })?;
		let mut config = Self::new(client_id);

		if let Ok(secret) = env::var(ENV_CLIENT_SECRET) {
			config.credentials = config.credentials.with_client_secret(secret);
		}

		Ok(config)
	}

	/// Overrides the REST base URL.
	pub fn with_base_url(mut self, base_url: Url) -> Self {
		self.base_url = base_url;

		self
	}

	/// Attaches a confidential client secret.
	pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
		self.credentials = self.credentials.with_client_secret(secret);

		self
	}

	/// Overrides the per-request timeout.
	pub fn with_request_timeout(mut self, timeout: StdDuration) -> Self {
		self.request_timeout = timeout;

		self
	}

	/// Overrides the retry budget.
	pub fn with_max_retries(mut self, max_retries: u32) -> Self {
		self.max_retries = max_retries;

		self
	}

	/// Overrides the backoff factor (seconds before the first retry).
	pub fn with_retry_backoff_factor(mut self, factor: f64) -> Self {
		self.retry_backoff_factor = factor;

		self
	}

	/// Overrides the streaming monitor endpoint.
	pub fn with_streaming_ws_url(mut self, url: Url) -> Self {
		self.streaming_ws_url = url;

		self
	}

	/// Overrides the chat monitor endpoint.
	pub fn with_chat_ws_url(mut self, url: Url) -> Self {
		self.chat_ws_url = url;

		self
	}

	/// OAuth authorization endpoint, resolved against the base URL origin.
	pub fn authorization_endpoint(&self) -> Result<Url, ConfigError> {
		self.base_url
			.join("/oauth/authorize")
			.map_err(|source| ConfigError::InvalidUrl { source })
	}

	/// OAuth token endpoint, resolved against the base URL origin.
	pub fn token_endpoint(&self) -> Result<Url, ConfigError> {
		self.base_url.join("/oauth/token").map_err(|source| ConfigError::InvalidUrl { source })
	}
}

/// Resolves the config directory: `$RESTREAM_CONFIG_PATH` override, else
/// `~/.config/restream.io`.
pub fn default_config_dir() -> Option<PathBuf> {
	if let Some(path) = env::var_os(ENV_CONFIG_PATH) {
		return Some(PathBuf::from(path));
	}

	home_dir().map(|home| home.join(".config").join("restream.io"))
}

fn home_dir() -> Option<PathBuf> {
	env::var_os("HOME").or_else(|| env::var_os("USERPROFILE")).map(PathBuf::from)
}

fn default_url(value: &'static str) -> Url {
	// The compiled-in defaults are covered by unit tests below.
	Url::parse(value).expect("Default endpoint URL should parse.")
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn defaults_match_the_platform_endpoints() {
		let config = Config::new("client-1");

		assert_eq!(config.base_url.as_str(), "https://api.restream.io/v2");
		assert_eq!(config.streaming_ws_url.as_str(), "wss://streaming.api.restream.io/ws");
		assert_eq!(config.chat_ws_url.as_str(), "wss://chat.api.restream.io/ws");
		assert_eq!(config.max_retries, 3);
		assert_eq!(config.request_timeout, StdDuration::from_secs(30));
		assert!((config.retry_backoff_factor - 0.5).abs() < f64::EPSILON);
	}

	#[test]
	fn oauth_endpoints_resolve_against_the_origin() {
		let config = Config::new("client-1");

		assert_eq!(
			config
				.token_endpoint()
				.expect("Token endpoint should resolve from the default base URL.")
				.as_str(),
			"https://api.restream.io/oauth/token",
		);
		assert_eq!(
			config
				.authorization_endpoint()
				.expect("Authorization endpoint should resolve from the default base URL.")
				.as_str(),
			"https://api.restream.io/oauth/authorize",
		);
	}

	#[test]
	fn builder_setters_override_defaults() {
		let base = Url::parse("http://127.0.0.1:8080/v2").expect("Base fixture should parse.");
		let config = Config::new("client-1")
			.with_base_url(base.clone())
			.with_client_secret("s3cret")
			.with_max_retries(1)
			.with_retry_backoff_factor(0.01);

		assert_eq!(config.base_url, base);
		assert!(!config.credentials.is_public());
		assert_eq!(config.max_retries, 1);
	}
}
