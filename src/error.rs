//! Client-level error taxonomy shared across the negotiator, executor, stores,
//! and monitors.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure while persisting a session.
	#[error("{0}")]
	Store(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Monitor misuse or lifecycle violation.
	#[error(transparent)]
	Connection(#[from] crate::monitor::ConnectionError),

	/// Credential, token-endpoint, or session failure; the caller should
	/// prompt for a fresh login.
	#[error("Authentication failed: {reason}.")]
	Authentication {
		/// Human-readable failure summary.
		reason: String,
		/// Underlying classified error, kept inspectable for diagnostics.
		#[source]
		source: Option<BoxError>,
	},
	/// Non-2xx REST response.
	#[error("API request failed with status {status}.")]
	Api {
		/// HTTP status code returned by the endpoint.
		status: u16,
		/// Raw response body.
		body: String,
		/// Whether the failure is safe to retry.
		transient: bool,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Transport failure not tied to an HTTP status (DNS, TCP, TLS, timeout).
	#[error("Network error occurred while calling the API.")]
	Network {
		/// Transport-specific failure.
		#[source]
		source: BoxError,
	},
	/// A 2xx response body that could not be decoded as the expected shape.
	#[error("Response body could not be decoded.")]
	Decode {
		/// Structured parsing failure carrying the offending path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}
impl Error {
	/// Returns `true` when retrying the operation may succeed.
	pub fn is_transient(&self) -> bool {
		match self {
			Self::Api { transient, .. } => *transient,
			Self::Network { .. } => true,
			_ => false,
		}
	}

	/// Wraps a transport-specific failure.
	pub(crate) fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Builds an authentication failure with no underlying cause.
	pub(crate) fn authentication(reason: impl Into<String>) -> Self {
		Self::Authentication { reason: reason.into(), source: None }
	}

	/// Converts this error into the cause of an authentication failure.
	pub(crate) fn into_authentication(self, reason: impl Into<String>) -> Self {
		Self::Authentication { reason: reason.into(), source: Some(Box::new(self)) }
	}

	/// Returns `true` when this failure, or the failure chained beneath an
	/// authentication wrapper, is transient.
	///
	/// Distinguishes a token-endpoint rejection (unrecoverable, the session
	/// is dead) from a transient outage on the same endpoint (the session is
	/// still worth keeping).
	pub fn caused_by_transient(&self) -> bool {
		match self {
			Self::Authentication { source: Some(source), .. } =>
				source.downcast_ref::<Error>().is_some_and(Error::is_transient),
			_ => self.is_transient(),
		}
	}
}

/// Configuration and validation failures raised before any network call.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// No OAuth client id is configured.
	#[error("No OAuth client id is configured.")]
	MissingClientId,
	/// A request or endpoint URL cannot be composed.
	#[error("Request URL is invalid.")]
	InvalidUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Required environment variable is missing.
	#[error("Environment variable `{name}` is not set.")]
	MissingEnv {
		/// Name of the missing variable.
		name: &'static str,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
impl From<reqwest::Error> for ConfigError {
	fn from(e: reqwest::Error) -> Self {
		Self::http_client_build(e)
	}
}
