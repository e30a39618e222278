//! OAuth 2.0 negotiation: authorization URLs, code exchange, token refresh.
//!
//! The negotiator implements the Authorization Code + PKCE grant and the
//! refresh grant against the platform's fixed `/oauth/authorize` and
//! `/oauth/token` endpoints. Token POSTs ride the shared [`RequestExecutor`]
//! so a flaky network during login gets the same transient-retry treatment as
//! any other call; endpoint rejections surface as authentication failures
//! with the classified error kept chained for diagnostics.

// self
use crate::{
	_prelude::*,
	auth::{Credentials, PkceChallenge, TokenRecord},
	config::Config,
	error::ConfigError,
	http::RequestExecutor,
	obs::{self, Operation, Outcome},
};

/// Wire shape of a token-endpoint success response.
#[derive(Debug, Deserialize)]
struct TokenEndpointResponse {
	access_token: String,
	#[serde(default)]
	refresh_token: Option<String>,
	#[serde(default)]
	expires_in: Option<u64>,
}

/// Negotiates OAuth grants for one configured client.
pub struct OAuthNegotiator {
	credentials: Credentials,
	authorization_endpoint: Url,
	token_endpoint: Url,
	executor: Arc<RequestExecutor>,
}
impl OAuthNegotiator {
	/// Creates a negotiator from the configuration and a shared executor.
	pub fn new(config: &Config, executor: Arc<RequestExecutor>) -> Result<Self> {
		Ok(Self {
			credentials: config.credentials.clone(),
			authorization_endpoint: config.authorization_endpoint()?,
			token_endpoint: config.token_endpoint()?,
			executor,
		})
	}

	/// Generates a fresh single-use PKCE pair for one authorization attempt.
	pub fn generate_pkce(&self) -> PkceChallenge {
		PkceChallenge::generate()
	}

	/// Builds the authorization redirect URL. Pure; no network call.
	///
	/// The scope list is space-joined before encoding. With `pkce` supplied
	/// the URL carries `code_challenge` and `code_challenge_method=S256`.
	pub fn build_authorization_url(
		&self,
		redirect_uri: &Url,
		scopes: &[&str],
		state: Option<&str>,
		pkce: Option<&PkceChallenge>,
	) -> Result<Url> {
		if self.credentials.client_id.is_empty() {
			return Err(ConfigError::MissingClientId.into());
		}

		let mut url = self.authorization_endpoint.clone();

		{
			let mut pairs = url.query_pairs_mut();

			pairs.append_pair("response_type", "code");
			pairs.append_pair("client_id", &self.credentials.client_id);
			pairs.append_pair("redirect_uri", redirect_uri.as_str());
			pairs.append_pair("scope", &scopes.join(" "));

			if let Some(state) = state {
				pairs.append_pair("state", state);
			}
			if let Some(pkce) = pkce {
				pairs.append_pair("code_challenge", pkce.challenge());
				pairs.append_pair("code_challenge_method", pkce.method());
			}
		}

		Ok(url)
	}

	/// Exchanges an authorization code for a token record.
	///
	/// Prefers the PKCE verifier; falls back to the client secret for
	/// confidential clients. With neither available the exchange fails before
	/// any network call.
	pub async fn exchange_code(
		&self,
		code: &str,
		redirect_uri: &Url,
		verifier: Option<&str>,
	) -> Result<TokenRecord> {
		let mut form = vec![
			("grant_type", "authorization_code"),
			("client_id", self.credentials.client_id.as_str()),
			("code", code),
			("redirect_uri", redirect_uri.as_str()),
		];

		match (verifier, self.credentials.client_secret.as_ref()) {
			(Some(verifier), _) => form.push(("code_verifier", verifier)),
			(None, Some(secret)) => form.push(("client_secret", secret.expose())),
			(None, None) =>
				return Err(Error::authentication(
					"Neither a PKCE verifier nor a client secret is available for the code \
					 exchange",
				)),
		}

		self.request_tokens(&form, Operation::CodeExchange, "code exchange").await
	}

	/// Refreshes an access token with the `refresh_token` grant.
	pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenRecord> {
		let mut form = vec![
			("grant_type", "refresh_token"),
			("client_id", self.credentials.client_id.as_str()),
			("refresh_token", refresh_token),
		];

		if let Some(secret) = self.credentials.client_secret.as_ref() {
			form.push(("client_secret", secret.expose()));
		}

		self.request_tokens(&form, Operation::TokenRefresh, "token refresh").await
	}

	async fn request_tokens(
		&self,
		form: &[(&str, &str)],
		operation: Operation,
		label: &'static str,
	) -> Result<TokenRecord> {
		let issued_at = OffsetDateTime::now_utc();
		let value = match self.executor.execute_form(&self.token_endpoint, form).await {
			Ok(value) => value,
			Err(err) => {
				obs::record_operation(operation, Outcome::Failure);
				tracing::debug!(operation = label, err = %err, "token endpoint call failed");

				return Err(wrap_token_failure(err, label));
			},
		};
		let response: TokenEndpointResponse = crate::http::decode(value).map_err(|err| {
			obs::record_operation(operation, Outcome::Failure);

			err.into_authentication(format!(
				"Token endpoint returned an unexpected body during the {label}",
			))
		})?;

		obs::record_operation(operation, Outcome::Success);

		into_record(response, issued_at)
	}
}
impl Debug for OAuthNegotiator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OAuthNegotiator")
			.field("client_id", &self.credentials.client_id)
			.field("client_secret_set", &self.credentials.client_secret.is_some())
			.field("token_endpoint", &self.token_endpoint)
			.finish()
	}
}

/// Converts a classified executor error into an authentication failure whose
/// message prefers `error_description`, then `error`, then the raw body.
fn wrap_token_failure(err: Error, label: &str) -> Error {
	let reason = match &err {
		Error::Api { status, body, .. } => {
			let detail = oauth_error_detail(body).unwrap_or_else(|| body.clone());

			format!("Token endpoint rejected the {label} ({status}): {detail}")
		},
		Error::Network { .. } => format!("Network failure during the {label}"),
		other => format!("Unexpected failure during the {label}: {other}"),
	};

	err.into_authentication(reason)
}

fn oauth_error_detail(body: &str) -> Option<String> {
	let value: Value = serde_json::from_str(body).ok()?;

	value
		.get("error_description")
		.and_then(Value::as_str)
		.or_else(|| value.get("error").and_then(Value::as_str))
		.map(str::to_owned)
}

fn into_record(response: TokenEndpointResponse, issued_at: OffsetDateTime) -> Result<TokenRecord> {
	let mut record = TokenRecord::new(response.access_token)
		.map_err(|_| Error::authentication("Token endpoint returned an empty access token"))?;

	if let Some(refresh) = response.refresh_token {
		record = record.with_refresh_token(refresh);
	}
	if let Some(expires_in) = response.expires_in {
		record = record.with_expires_in(issued_at, Duration::seconds(expires_in as i64));
	}

	Ok(record)
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	fn negotiator(config: &Config) -> OAuthNegotiator {
		let executor = Arc::new(
			RequestExecutor::new(config).expect("Executor should build from the configuration."),
		);

		OAuthNegotiator::new(config, executor)
			.expect("Negotiator should build from the configuration.")
	}

	#[test]
	fn authorization_url_carries_the_full_query_contract() {
		let config = Config::new("abc");
		let negotiator = negotiator(&config);
		let redirect =
			Url::parse("http://localhost:8080/cb").expect("Redirect fixture should parse.");
		let pkce = PkceChallenge::generate();
		let url = negotiator
			.build_authorization_url(
				&redirect,
				&["profile.read", "stream.read"],
				Some("state-1"),
				Some(&pkce),
			)
			.expect("Authorization URL should build with a configured client id.");
		let query = url.query().expect("Authorization URL should carry a query string.");

		assert!(url.as_str().starts_with("https://api.restream.io/oauth/authorize?"));
		assert!(query.contains("response_type=code"));
		assert!(query.contains("client_id=abc"));
		assert!(query.contains("redirect_uri=http%3A%2F%2Flocalhost%3A8080%2Fcb"));
		assert!(query.contains("scope=profile.read+stream.read"));
		assert!(query.contains("state=state-1"));
		assert!(query.contains(&format!("code_challenge={}", pkce.challenge())));
		assert!(query.contains("code_challenge_method=S256"));
	}

	#[test]
	fn authorization_url_omits_optional_parameters() {
		let config = Config::new("abc");
		let negotiator = negotiator(&config);
		let redirect =
			Url::parse("http://localhost:8080/cb").expect("Redirect fixture should parse.");
		let url = negotiator
			.build_authorization_url(&redirect, &["profile.read"], None, None)
			.expect("Authorization URL should build without state or PKCE.");
		let query = url.query().expect("Authorization URL should carry a query string.");

		assert!(!query.contains("state="));
		assert!(!query.contains("code_challenge"));
	}

	#[test]
	fn authorization_url_requires_a_client_id() {
		let config = Config::new("");
		let negotiator = negotiator(&config);
		let redirect =
			Url::parse("http://localhost:8080/cb").expect("Redirect fixture should parse.");
		let err = negotiator
			.build_authorization_url(&redirect, &[], None, None)
			.expect_err("An empty client id should be rejected.");

		assert!(matches!(err, Error::Config(ConfigError::MissingClientId)));
	}

	#[test]
	fn token_failure_message_prefers_error_description() {
		let api = Error::Api {
			status: 400,
			body: "{\"error\":\"invalid_grant\",\"error_description\":\"Code expired.\"}".into(),
			transient: false,
			retry_after: None,
		};
		let wrapped = wrap_token_failure(api, "code exchange");

		assert!(wrapped.to_string().contains("Code expired."));

		let api = Error::Api {
			status: 400,
			body: "{\"error\":\"invalid_grant\"}".into(),
			transient: false,
			retry_after: None,
		};

		assert!(wrap_token_failure(api, "code exchange").to_string().contains("invalid_grant"));

		let api = Error::Api {
			status: 502,
			body: "upstream exploded".into(),
			transient: true,
			retry_after: None,
		};

		assert!(
			wrap_token_failure(api, "token refresh").to_string().contains("upstream exploded"),
		);
	}

	#[test]
	fn token_response_maps_expiry_from_issuance() {
		let issued = macros::datetime!(2026-02-01 00:00 UTC);
		let record = into_record(
			TokenEndpointResponse {
				access_token: "tok-1".into(),
				refresh_token: Some("refresh-1".into()),
				expires_in: Some(3600),
			},
			issued,
		)
		.expect("Token response fixture should map to a record.");

		assert_eq!(record.expires_at, Some(issued + Duration::seconds(3600)));
		assert!(record.can_refresh());

		let no_expiry = into_record(
			TokenEndpointResponse {
				access_token: "tok-2".into(),
				refresh_token: None,
				expires_in: None,
			},
			issued,
		)
		.expect("Token response without expiry should map to a record.");

		assert_eq!(no_expiry.expires_at, None);
		assert!(!no_expiry.is_expired());
	}
}
