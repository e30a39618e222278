//! Long-lived WebSocket subscription monitors.
//!
//! One generic monitor owns a socket and a read loop; event domains
//! specialize it with a label and a classification function, so the state
//! machine and timer logic exist once instead of per endpoint. Frames are
//! JSON; parse failures are published on a dedicated errors channel and never
//! tear the connection down. An unexpected close re-dials with capped
//! exponential backoff before the monitor gives up and stops.

pub mod chat;
pub mod streaming;

// std
use std::sync::atomic::{AtomicBool, Ordering};
// crates.io
use futures_util::StreamExt;
use serde_json::Map;
use tokio::{net::TcpStream, sync::broadcast, task::JoinHandle, time};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, tungstenite::Message};
use tokio_util::sync::CancellationToken;
// self
use crate::{
	_prelude::*,
	obs::{self, Operation, Outcome},
};

/// Capacity of the event and error broadcast channels.
pub(crate) const CHANNEL_CAPACITY: usize = 256;

/// Classification hook specializing the generic monitor for one event domain.
pub trait EventDomain
where
	Self: 'static + Send + Sync,
{
	/// Classified event kind; the domain must provide an unknown-style
	/// variant so classification stays total.
	type Kind: 'static + Clone + Debug + PartialEq + Send;

	/// Domain label used in logs.
	const NAME: &'static str;

	/// Maps an `action` value onto the domain's kind set.
	///
	/// Matching is case-insensitive and never fails; unmapped actions yield
	/// the domain's unknown variant rather than an error.
	fn classify(action: &str) -> Self::Kind;
}

/// Lifecycle states of a monitor instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MonitorState {
	/// Created, never started.
	Idle,
	/// Dialing (or re-dialing) the endpoint.
	Connecting,
	/// Socket open, frames flowing.
	Connected,
	/// Stopped by request, duration expiry, or reconnect exhaustion.
	Stopped,
}

/// Monitor misuse errors.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ConnectionError {
	/// `start` was called while a session is already running.
	#[error("Monitor is already started (state: {state:?}).")]
	AlreadyStarted {
		/// State observed at the failed `start` call.
		state: MonitorState,
	},
}

/// Classified push event published on the events channel.
#[derive(Clone, Debug)]
pub struct SubscriptionEvent<K> {
	/// Domain-specific kind classified from `action`.
	pub kind: K,
	/// Raw action string from the frame (`"unknown"` when absent).
	pub action: String,
	/// Frame payload object (empty when absent).
	pub payload: Map<String, Value>,
	/// Capture instant.
	pub timestamp: OffsetDateTime,
}

/// Faults published on the errors channel; the connection survives them.
#[derive(Clone, Debug)]
pub enum MonitorFault {
	/// A frame was not valid JSON.
	Parse {
		/// Parser failure description.
		detail: String,
	},
	/// The transport reported an error or closed unexpectedly.
	Transport {
		/// Transport failure description.
		detail: String,
	},
}

/// Reconnect policy applied after an unexpected close.
#[derive(Clone, Copy, Debug)]
pub struct ReconnectPolicy {
	/// Consecutive failed attempts tolerated before the monitor stops.
	pub max_attempts: u32,
	/// First backoff delay.
	pub initial_backoff: StdDuration,
	/// Upper bound for the doubling backoff.
	pub max_backoff: StdDuration,
}
impl Default for ReconnectPolicy {
	fn default() -> Self {
		Self {
			max_attempts: 5,
			initial_backoff: StdDuration::from_secs(1),
			max_backoff: StdDuration::from_secs(30),
		}
	}
}

/// Construction parameters for one monitor instance.
#[derive(Clone, Debug)]
pub struct MonitorConfig {
	/// WebSocket endpoint; the access token is appended as `?accessToken=`.
	pub endpoint: Url,
	/// Optional overall lifetime; the monitor stops itself when it elapses.
	pub max_duration: Option<StdDuration>,
	/// Reconnect policy for unexpected closes.
	pub reconnect: ReconnectPolicy,
}
impl MonitorConfig {
	/// Creates a config for the endpoint with the default reconnect policy.
	pub fn new(endpoint: Url) -> Self {
		Self { endpoint, max_duration: None, reconnect: ReconnectPolicy::default() }
	}

	/// Limits the monitor lifetime; the deadline behaves like `stop()`.
	pub fn with_max_duration(mut self, duration: StdDuration) -> Self {
		self.max_duration = Some(duration);

		self
	}

	/// Overrides the reconnect policy.
	pub fn with_reconnect(mut self, policy: ReconnectPolicy) -> Self {
		self.reconnect = policy;

		self
	}
}

/// Generic reconnect-capable subscription monitor.
///
/// `start` spawns the read loop on the ambient tokio runtime; `stop` is
/// idempotent and safe to call before `start`, repeatedly, or concurrently
/// with an in-flight frame dispatch. Restarting after `stop` re-enters
/// `Connecting` with the existing subscriber channels kept.
pub struct SubscriptionMonitor<D>
where
	D: EventDomain,
{
	config: MonitorConfig,
	state: Arc<Mutex<MonitorState>>,
	connected: Arc<AtomicBool>,
	events_tx: broadcast::Sender<SubscriptionEvent<D::Kind>>,
	errors_tx: broadcast::Sender<MonitorFault>,
	cancel: Mutex<CancellationToken>,
	task: Mutex<Option<JoinHandle<()>>>,
}
impl<D> SubscriptionMonitor<D>
where
	D: EventDomain,
{
	/// Creates an idle monitor.
	pub fn new(config: MonitorConfig) -> Self {
		let (events_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
		let (errors_tx, _) = broadcast::channel(CHANNEL_CAPACITY);

		Self {
			config,
			state: Arc::new(Mutex::new(MonitorState::Idle)),
			connected: Arc::new(AtomicBool::new(false)),
			events_tx,
			errors_tx,
			cancel: Mutex::new(CancellationToken::new()),
			task: Mutex::new(None),
		}
	}

	/// Current lifecycle state.
	pub fn state(&self) -> MonitorState {
		*self.state.lock()
	}

	/// Whether the socket is currently open.
	pub fn is_connected(&self) -> bool {
		self.connected.load(Ordering::SeqCst)
	}

	/// Subscribes to classified events; every subscriber receives each event
	/// in arrival order.
	pub fn subscribe(&self) -> broadcast::Receiver<SubscriptionEvent<D::Kind>> {
		self.events_tx.subscribe()
	}

	/// Subscribes to parse and transport faults.
	pub fn subscribe_errors(&self) -> broadcast::Receiver<MonitorFault> {
		self.errors_tx.subscribe()
	}

	/// Starts the monitor with the provided access token.
	///
	/// Fails without side effects when a session is already running.
	pub fn start(&self, access_token: &str) -> Result<()> {
		{
			let mut state = self.state.lock();

			match *state {
				MonitorState::Connecting | MonitorState::Connected =>
					return Err(ConnectionError::AlreadyStarted { state: *state }.into()),
				MonitorState::Idle | MonitorState::Stopped => *state = MonitorState::Connecting,
			}
		}

		let cancel = CancellationToken::new();

		*self.cancel.lock() = cancel.clone();

		let session = MonitorSession::<D> {
			url: authenticated_endpoint(&self.config.endpoint, access_token),
			reconnect: self.config.reconnect,
			max_duration: self.config.max_duration,
			state: self.state.clone(),
			connected: self.connected.clone(),
			events_tx: self.events_tx.clone(),
			errors_tx: self.errors_tx.clone(),
			cancel,
		};
		let handle = tokio::spawn(session.run());

		*self.task.lock() = Some(handle);

		Ok(())
	}

	/// Stops the monitor: cancels the duration timer and any pending
	/// reconnect, closes the socket, and transitions to `Stopped`.
	pub fn stop(&self) {
		self.cancel.lock().cancel();
		self.connected.store(false, Ordering::SeqCst);
		*self.state.lock() = MonitorState::Stopped;

		// The read loop observes the cancellation cooperatively; dropping the
		// handle detaches the task while it winds down.
		drop(self.task.lock().take());
	}
}
impl<D> Debug for SubscriptionMonitor<D>
where
	D: EventDomain,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SubscriptionMonitor")
			.field("domain", &D::NAME)
			.field("endpoint", &self.config.endpoint.as_str())
			.field("state", &self.state())
			.finish()
	}
}

/// State shared between the monitor handle and its spawned read loop.
struct MonitorSession<D>
where
	D: EventDomain,
{
	url: Url,
	reconnect: ReconnectPolicy,
	max_duration: Option<StdDuration>,
	state: Arc<Mutex<MonitorState>>,
	connected: Arc<AtomicBool>,
	events_tx: broadcast::Sender<SubscriptionEvent<D::Kind>>,
	errors_tx: broadcast::Sender<MonitorFault>,
	cancel: CancellationToken,
}
impl<D> MonitorSession<D>
where
	D: EventDomain,
{
	async fn run(self) {
		let lifetime = async {
			match self.max_duration {
				Some(duration) => time::sleep(duration).await,
				None => std::future::pending().await,
			}
		};

		tokio::select! {
			() = lifetime => {
				tracing::debug!(domain = D::NAME, "monitor lifetime elapsed");
			},
			() = self.cancel.cancelled() => {},
			() = self.connect_loop() => {},
		}

		// Skip the final writes when stop() already performed them; a
		// restarted session may own the state by now.
		if !self.cancel.is_cancelled() {
			self.connected.store(false, Ordering::SeqCst);
			*self.state.lock() = MonitorState::Stopped;
		}
	}

	async fn connect_loop(&self) {
		let mut failures: u32 = 0;
		let mut backoff = self.reconnect.initial_backoff;

		loop {
			match tokio_tungstenite::connect_async(self.url.as_str()).await {
				Ok((stream, _)) => {
					obs::record_operation(Operation::MonitorConnect, Outcome::Success);
					tracing::debug!(domain = D::NAME, "monitor connected");

					failures = 0;
					backoff = self.reconnect.initial_backoff;

					self.set_connected(true);
					self.set_state(MonitorState::Connected);
					self.read_frames(stream).await;
					self.set_connected(false);
					self.set_state(MonitorState::Connecting);
				},
				Err(e) => {
					obs::record_operation(Operation::MonitorConnect, Outcome::Failure);
					self.publish_fault(MonitorFault::Transport { detail: e.to_string() });
				},
			}

			failures += 1;

			if failures > self.reconnect.max_attempts {
				tracing::warn!(
					domain = D::NAME,
					failures,
					"monitor reconnect attempts exhausted",
				);

				return;
			}

			tokio::select! {
				() = self.cancel.cancelled() => return,
				() = time::sleep(backoff) => {},
			}

			backoff = (backoff * 2).min(self.reconnect.max_backoff);
		}
	}

	async fn read_frames(&self, stream: WebSocketStream<MaybeTlsStream<TcpStream>>) {
		let (_write, mut read) = stream.split();

		while let Some(message) = read.next().await {
			match message {
				Ok(Message::Text(text)) => self.dispatch_frame(text.as_str()),
				Ok(Message::Close(_)) => {
					self.publish_fault(MonitorFault::Transport {
						detail: "connection closed by peer".into(),
					});

					return;
				},
				// Binary, ping, pong.
				Ok(_) => {},
				Err(e) => {
					self.publish_fault(MonitorFault::Transport { detail: e.to_string() });

					return;
				},
			}
		}

		// Stream ended without a close frame.
		self.publish_fault(MonitorFault::Transport { detail: "connection ended".into() });
	}

	/// Parses and classifies one frame; a malformed frame is reported and
	/// skipped, never fatal.
	fn dispatch_frame(&self, text: &str) {
		// Stop must not race a dispatch into a stopped monitor.
		if self.cancel.is_cancelled() {
			return;
		}

		let value: Value = match serde_json::from_str(text) {
			Ok(value) => value,
			Err(e) => {
				self.publish_fault(MonitorFault::Parse { detail: e.to_string() });

				return;
			},
		};
		let action =
			value.get("action").and_then(Value::as_str).unwrap_or("unknown").to_owned();
		let payload =
			value.get("payload").and_then(Value::as_object).cloned().unwrap_or_default();
		let event = SubscriptionEvent {
			kind: D::classify(&action),
			action,
			payload,
			timestamp: OffsetDateTime::now_utc(),
		};

		// Absent or lagging subscribers are not errors.
		let _ = self.events_tx.send(event);
	}

	fn publish_fault(&self, fault: MonitorFault) {
		tracing::debug!(domain = D::NAME, fault = ?fault, "monitor fault");

		let _ = self.errors_tx.send(fault);
	}

	fn set_connected(&self, connected: bool) {
		if self.cancel.is_cancelled() {
			return;
		}

		self.connected.store(connected, Ordering::SeqCst);
	}

	fn set_state(&self, next: MonitorState) {
		if self.cancel.is_cancelled() {
			return;
		}

		*self.state.lock() = next;
	}
}

fn authenticated_endpoint(endpoint: &Url, access_token: &str) -> Url {
	let mut url = endpoint.clone();

	url.query_pairs_mut().append_pair("accessToken", access_token);

	url
}
