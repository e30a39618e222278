//! Resilient HTTP execution: retry, backoff, and error classification.
//!
//! Every REST and token-endpoint call flows through [`RequestExecutor`] so
//! transient failures (429/408/5xx and transport-level errors) share one
//! retry and backoff policy regardless of which resource they target. After
//! the final retry the last classified error is surfaced unchanged.

// crates.io
use reqwest::{
	Method, Response, StatusCode,
	header::{HeaderMap, RETRY_AFTER},
};
use serde::de::DeserializeOwned;
use time::format_description::well_known::Rfc2822;
// self
use crate::{_prelude::*, config::Config, error::ConfigError};

/// Upper bound on the exponential shift so the delay arithmetic cannot wrap.
const MAX_BACKOFF_SHIFT: u32 = 16;

/// One HTTP call described independently of transport details.
#[derive(Debug)]
pub struct ApiRequest<'a> {
	/// HTTP method.
	pub method: Method,
	/// Path relative to the configured base URL.
	pub path: &'a str,
	/// Query pairs appended to the request URL.
	pub query: Vec<(&'a str, String)>,
	/// Optional JSON body.
	pub body: Option<Value>,
	/// Whether the endpoint requires authentication.
	pub requires_auth: bool,
	/// Bearer token attached when authentication is required.
	pub bearer: Option<&'a str>,
}
impl<'a> ApiRequest<'a> {
	/// Creates a bodyless, unauthenticated request.
	pub fn new(method: Method, path: &'a str) -> Self {
		Self { method, path, query: Vec::new(), body: None, requires_auth: false, bearer: None }
	}

	/// Appends a query pair.
	pub fn with_query(mut self, key: &'a str, value: impl Into<String>) -> Self {
		self.query.push((key, value.into()));

		self
	}

	/// Attaches a JSON body.
	pub fn with_body(mut self, body: Value) -> Self {
		self.body = Some(body);

		self
	}

	/// Marks the request as authenticated with the provided bearer token.
	///
	/// Passing `None` records that authentication is required but no token is
	/// available; the executor then fails before any network call.
	pub fn authenticated(mut self, bearer: Option<&'a str>) -> Self {
		self.requires_auth = true;
		self.bearer = bearer;

		self
	}
}

/// Executes HTTP calls with uniform retry, backoff, and error classification.
pub struct RequestExecutor {
	http: ReqwestClient,
	base_url: Url,
	max_retries: u32,
	backoff_factor: f64,
}
impl RequestExecutor {
	/// Builds an executor from the configuration.
	pub fn new(config: &Config) -> Result<Self> {
		let http = ReqwestClient::builder()
			.timeout(config.request_timeout)
			.build()
			.map_err(ConfigError::from)?;

		Ok(Self {
			http,
			base_url: config.base_url.clone(),
			max_retries: config.max_retries,
			backoff_factor: config.retry_backoff_factor,
		})
	}

	/// Executes a REST request.
	///
	/// Status 204 and empty 2xx bodies decode to an empty JSON object; a JSON
	/// parse failure on a 2xx body is reported as [`Error::Decode`] and never
	/// retried.
	pub async fn execute(&self, request: &ApiRequest<'_>) -> Result<Value> {
		if request.requires_auth && request.bearer.is_none() {
			return Err(Error::authentication(
				"No access token is available for an authenticated request",
			));
		}

		let url = self.endpoint(request.path, &request.query)?;

		self.run(|| self.dispatch(request, url.clone())).await
	}

	/// POSTs a URL-encoded form (the token-endpoint shape), sharing the same
	/// retry policy as resource calls.
	pub async fn execute_form(&self, url: &Url, form: &[(&str, &str)]) -> Result<Value> {
		self.run(|| async {
			let response =
				self.http.post(url.clone()).form(form).send().await.map_err(map_send_error)?;

			read_json_response(response).await
		})
		.await
	}

	async fn run<F, Fut>(&self, send: F) -> Result<Value>
	where
		F: Fn() -> Fut,
		Fut: Future<Output = Result<Value>>,
	{
		let mut attempt: u32 = 0;

		loop {
			match send().await {
				Ok(value) => return Ok(value),
				Err(err) if err.is_transient() && attempt < self.max_retries => {
					let delay = backoff_delay(self.backoff_factor, attempt);

					tracing::debug!(
						attempt,
						delay_ms = delay.as_millis() as u64,
						err = %err,
						"transient failure, retrying",
					);
					tokio::time::sleep(delay).await;

					attempt += 1;
				},
				Err(err) => return Err(err),
			}
		}
	}

	async fn dispatch(&self, request: &ApiRequest<'_>, url: Url) -> Result<Value> {
		let mut builder = self.http.request(request.method.clone(), url);

		if let Some(token) = request.bearer {
			builder = builder.bearer_auth(token);
		}
		if let Some(body) = &request.body {
			builder = builder.json(body);
		}

		read_json_response(builder.send().await.map_err(map_send_error)?).await
	}

	fn endpoint(&self, path: &str, query: &[(&str, String)]) -> Result<Url> {
		let joined = format!(
			"{}/{}",
			self.base_url.as_str().trim_end_matches('/'),
			path.trim_start_matches('/'),
		);
		let mut url =
			Url::parse(&joined).map_err(|source| ConfigError::InvalidUrl { source })?;

		if !query.is_empty() {
			let mut pairs = url.query_pairs_mut();

			for (key, value) in query {
				pairs.append_pair(key, value);
			}
		}

		Ok(url)
	}
}

/// Decodes an executor payload into a typed model, reporting the failing path.
pub fn decode<T>(value: Value) -> Result<T>
where
	T: DeserializeOwned,
{
	serde_path_to_error::deserialize(value).map_err(|source| Error::Decode { source })
}

async fn read_json_response(response: Response) -> Result<Value> {
	let status = response.status();
	let headers = response.headers().to_owned();
	let bytes = response.bytes().await.map_err(map_send_error)?;

	if !status.is_success() {
		return Err(Error::Api {
			status: status.as_u16(),
			body: String::from_utf8_lossy(&bytes).into_owned(),
			transient: is_transient_status(status),
			retry_after: parse_retry_after(&headers),
		});
	}
	if status == StatusCode::NO_CONTENT || bytes.is_empty() {
		return Ok(Value::Object(serde_json::Map::new()));
	}

	let mut deserializer = serde_json::Deserializer::from_slice(&bytes);

	serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| Error::Decode { source })
}

/// Statuses worth retrying: rate limiting, request timeout, server errors.
fn is_transient_status(status: StatusCode) -> bool {
	matches!(status.as_u16(), 408 | 429) || status.is_server_error()
}

fn map_send_error(err: reqwest::Error) -> Error {
	if err.is_builder() {
		return ConfigError::from(err).into();
	}

	Error::network(err)
}

/// Delay before retry `n` (0-indexed): `factor × 1000 ms × 2^n`.
fn backoff_delay(factor: f64, retry: u32) -> StdDuration {
	let base_ms = (factor * 1_000.0).max(0.0);
	let multiplier = 1_u64 << retry.min(MAX_BACKOFF_SHIFT);

	StdDuration::from_millis((base_ms * multiplier as f64) as u64)
}

fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	let value = headers.get(RETRY_AFTER)?;
	let raw = value.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<u64>() {
		return Some(Duration::seconds(secs as i64));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}
