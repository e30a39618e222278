//! High-level API client orchestrating the store, negotiator, and executor.

// crates.io
use reqwest::Method;
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	auth::{PkceChallenge, TokenRecord},
	config::Config,
	http::{self, ApiRequest, RequestExecutor},
	models::{
		Channel, ChannelMeta, ChannelSummary, EventsHistory, Platform, Profile, Server,
		StreamEvent, StreamKey,
	},
	monitor::{MonitorConfig, chat::ChatMonitor, streaming::StreamingMonitor},
	oauth::OAuthNegotiator,
	obs::{self, Operation, Outcome},
	store::TokenStore,
};

/// Stable call surface over the Restream API.
///
/// Construction is explicit: the store, negotiator, and executor are built
/// once and threaded through call sites, never held in ambient singletons.
/// The client holds only transient copies of the access token string; the
/// record itself is owned by the store.
pub struct ApiClient {
	config: Config,
	executor: Arc<RequestExecutor>,
	negotiator: OAuthNegotiator,
	store: Arc<dyn TokenStore>,
	refresh_guard: AsyncMutex<()>,
}
impl ApiClient {
	/// Creates a client over the provided token store.
	pub fn new(config: Config, store: Arc<dyn TokenStore>) -> Result<Self> {
		let executor = Arc::new(RequestExecutor::new(&config)?);
		let negotiator = OAuthNegotiator::new(&config, executor.clone())?;

		Ok(Self { config, executor, negotiator, store, refresh_guard: AsyncMutex::new(()) })
	}

	/// Negotiator handle for driving a login flow manually.
	pub fn negotiator(&self) -> &OAuthNegotiator {
		&self.negotiator
	}

	/// Builds the authorization redirect URL for a login attempt.
	pub fn authorization_url(
		&self,
		redirect_uri: &Url,
		scopes: &[&str],
		state: Option<&str>,
		pkce: Option<&PkceChallenge>,
	) -> Result<Url> {
		self.negotiator.build_authorization_url(redirect_uri, scopes, state, pkce)
	}

	/// Completes a login: exchanges the authorization code and persists the
	/// resulting session.
	pub async fn complete_login(
		&self,
		code: &str,
		redirect_uri: &Url,
		pkce: Option<&PkceChallenge>,
	) -> Result<TokenRecord> {
		let record = self
			.negotiator
			.exchange_code(code, redirect_uri, pkce.map(PkceChallenge::verifier))
			.await?;

		self.store.save(record.clone()).await?;

		Ok(record)
	}

	/// Ends the session and destroys persisted tokens.
	pub async fn logout(&self) -> Result<()> {
		self.store.clear().await?;

		Ok(())
	}

	/// Resolves a usable bearer token, refreshing through the single-flight
	/// guard when the cached record is expired.
	///
	/// An expired record without a refresh token fails without attempting a
	/// refresh call; the caller should prompt for a fresh login.
	pub async fn bearer_token(&self) -> Result<String> {
		let record = self.load_session().await?;

		if !record.is_expired() {
			return Ok(record.access_token.expose().to_owned());
		}
		if !record.can_refresh() {
			return Err(Error::authentication(
				"Access token is expired and no refresh token is available",
			));
		}

		self.refresh_session().await.map(|record| record.access_token.expose().to_owned())
	}

	async fn load_session(&self) -> Result<TokenRecord> {
		self.store
			.load()
			.await?
			.ok_or_else(|| Error::authentication("No stored session; authorization is required"))
	}

	/// Serialized refresh: concurrent callers share one in-flight refresh and
	/// re-read the store instead of issuing duplicates, so a rotated refresh
	/// token is never replayed.
	async fn refresh_session(&self) -> Result<TokenRecord> {
		let _singleflight = self.refresh_guard.lock().await;
		// A concurrent caller may have refreshed while we waited on the guard.
		let current = self.load_session().await?;

		if !current.is_expired() {
			return Ok(current);
		}

		let refresh_token = current
			.refresh_token
			.as_ref()
			.ok_or_else(|| {
				Error::authentication(
					"Access token is expired and no refresh token is available",
				)
			})?
			.expose()
			.to_owned();

		match self.negotiator.refresh_token(&refresh_token).await {
			Ok(mut record) => {
				// Providers may omit the refresh token on rotation; keep the
				// old one so the session stays refreshable.
				if record.refresh_token.is_none() {
					record = record.with_refresh_token(refresh_token);
				}

				self.store.save(record.clone()).await?;

				Ok(record)
			},
			Err(err) => {
				if matches!(err, Error::Authentication { .. }) && !err.caused_by_transient() {
					// An endpoint rejection is unrecoverable; force a fresh
					// login instead of replaying a dead refresh token. A
					// transient outage keeps the session.
					if let Err(clear_err) = self.store.clear().await {
						tracing::warn!(
							err = %clear_err,
							"failed to clear session after refresh rejection",
						);
					}
				}

				Err(err)
			},
		}
	}

	async fn request(&self, request: &ApiRequest<'_>) -> Result<Value> {
		let result = self.executor.execute(request).await;

		match &result {
			Ok(_) => obs::record_operation(Operation::ApiRequest, Outcome::Success),
			Err(_) => obs::record_operation(Operation::ApiRequest, Outcome::Failure),
		}

		result
	}

	async fn get_authed<T>(&self, path: &str, query: Vec<(&str, String)>) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let token = self.bearer_token().await?;
		let mut request = ApiRequest::new(Method::GET, path).authenticated(Some(&token));

		request.query = query;

		http::decode(self.request(&request).await?)
	}

	async fn get_public<T>(&self, path: &str) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let request = ApiRequest::new(Method::GET, path);

		http::decode(self.request(&request).await?)
	}

	async fn patch_authed(&self, path: &str, body: Value) -> Result<()> {
		let token = self.bearer_token().await?;
		let request =
			ApiRequest::new(Method::PATCH, path).with_body(body).authenticated(Some(&token));

		self.request(&request).await?;

		Ok(())
	}

	/// `GET /user/profile`.
	pub async fn get_profile(&self) -> Result<Profile> {
		self.get_authed("/user/profile", Vec::new()).await
	}

	/// `GET /platform/all` (no auth).
	pub async fn list_platforms(&self) -> Result<Vec<Platform>> {
		self.get_public("/platform/all").await
	}

	/// `GET /server/all` (no auth).
	pub async fn list_servers(&self) -> Result<Vec<Server>> {
		self.get_public("/server/all").await
	}

	/// `GET /user/channel/all`.
	pub async fn list_channels(&self) -> Result<Vec<ChannelSummary>> {
		self.get_authed("/user/channel/all", Vec::new()).await
	}

	/// `GET /user/channel/{id}`.
	pub async fn get_channel(&self, channel_id: u64) -> Result<Channel> {
		self.get_authed(&format!("/user/channel/{channel_id}"), Vec::new()).await
	}

	/// `PATCH /user/channel/{id}` toggling the active flag.
	pub async fn set_channel_active(&self, channel_id: u64, active: bool) -> Result<()> {
		self.patch_authed(
			&format!("/user/channel/{channel_id}"),
			serde_json::json!({ "active": active }),
		)
		.await
	}

	/// `GET /user/channel-meta/{id}`.
	pub async fn get_channel_meta(&self, channel_id: u64) -> Result<ChannelMeta> {
		self.get_authed(&format!("/user/channel-meta/{channel_id}"), Vec::new()).await
	}

	/// `PATCH /user/channel-meta/{id}` updating title and description.
	pub async fn update_channel_meta(&self, channel_id: u64, meta: &ChannelMeta) -> Result<()> {
		self.patch_authed(
			&format!("/user/channel-meta/{channel_id}"),
			serde_json::json!({ "title": meta.title, "description": meta.description }),
		)
		.await
	}

	/// `GET /user/events/{id}`.
	pub async fn get_event(&self, event_id: &str) -> Result<StreamEvent> {
		self.get_authed(&format!("/user/events/{event_id}"), Vec::new()).await
	}

	/// `GET /user/events/upcoming`.
	pub async fn upcoming_events(&self) -> Result<Vec<StreamEvent>> {
		self.get_authed("/user/events/upcoming", Vec::new()).await
	}

	/// `GET /user/events/in-progress`.
	pub async fn in_progress_events(&self) -> Result<Vec<StreamEvent>> {
		self.get_authed("/user/events/in-progress", Vec::new()).await
	}

	/// `GET /user/events/history?page=&limit=`.
	pub async fn events_history(&self, page: u32, limit: u32) -> Result<EventsHistory> {
		self.get_authed(
			"/user/events/history",
			vec![("page", page.to_string()), ("limit", limit.to_string())],
		)
		.await
	}

	/// `GET /user/streamKey`.
	pub async fn stream_key(&self) -> Result<StreamKey> {
		self.get_authed("/user/streamKey", Vec::new()).await
	}

	/// `GET /user/events/{id}/streamKey`.
	pub async fn event_stream_key(&self, event_id: &str) -> Result<StreamKey> {
		self.get_authed(&format!("/user/events/{event_id}/streamKey"), Vec::new()).await
	}

	/// Builds and starts a streaming-event monitor authenticated with the
	/// current session.
	pub async fn start_streaming_monitor(&self) -> Result<StreamingMonitor> {
		let token = self.bearer_token().await?;
		let monitor = StreamingMonitor::new(MonitorConfig::new(self.config.streaming_ws_url.clone()));

		monitor.start(&token)?;

		Ok(monitor)
	}

	/// Builds and starts a chat-event monitor authenticated with the current
	/// session.
	pub async fn start_chat_monitor(&self) -> Result<ChatMonitor> {
		let token = self.bearer_token().await?;
		let monitor = ChatMonitor::new(MonitorConfig::new(self.config.chat_ws_url.clone()));

		monitor.start(&token)?;

		Ok(monitor)
	}
}
impl Debug for ApiClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiClient")
			.field("base_url", &self.config.base_url.as_str())
			.field("client_id", &self.config.credentials.client_id)
			.finish()
	}
}
