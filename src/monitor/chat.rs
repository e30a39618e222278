//! Chat-event monitor specialization and message projection.

// crates.io
use serde_json::Map;
use time::format_description::well_known::Rfc3339;
use tokio::sync::broadcast;
// self
use crate::{
	_prelude::*,
	monitor::{CHANNEL_CAPACITY, EventDomain, SubscriptionEvent, SubscriptionMonitor},
};

/// Millisecond-precision epoch values start around here; smaller numbers are
/// treated as whole seconds.
const EPOCH_MILLIS_THRESHOLD: i64 = 100_000_000_000;

/// Event kinds published by the chat endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatEventKind {
	/// A chat message arrived.
	Message,
	/// A viewer joined the chat.
	Join,
	/// A viewer left the chat.
	Leave,
	/// Action outside the known set; the raw payload stays on the event.
	Unknown,
}

/// Chat event domain marker.
#[derive(Clone, Copy, Debug, Default)]
pub struct ChatDomain;
impl EventDomain for ChatDomain {
	type Kind = ChatEventKind;

	const NAME: &'static str = "chat";

	fn classify(action: &str) -> Self::Kind {
		match action.to_ascii_lowercase().as_str() {
			"message" | "chat_message" => ChatEventKind::Message,
			"join" => ChatEventKind::Join,
			"leave" | "part" => ChatEventKind::Leave,
			_ => ChatEventKind::Unknown,
		}
	}
}

/// Monitor for the chat WebSocket endpoint.
pub type ChatMonitor = SubscriptionMonitor<ChatDomain>;

/// Structured chat message projected from a `Message` event payload.
#[derive(Clone, Debug)]
pub struct ChatMessage {
	/// Message identifier (empty when the payload lacks one).
	pub id: String,
	/// Author username.
	pub username: String,
	/// Message text.
	pub message: String,
	/// Origin platform label.
	pub platform: String,
	/// Message instant; falls back to the capture time when unreadable.
	pub timestamp: OffsetDateTime,
}
impl ChatMessage {
	/// Projects an event payload into a message record.
	///
	/// Field lookups tolerate both the flat and the nested wire shapes
	/// (`username` vs `user.username`, `message` as a string vs
	/// `message.text`); the timestamp accepts epoch seconds, epoch
	/// milliseconds, or an RFC 3339 string and defaults to the event capture
	/// time otherwise.
	pub fn from_event(event: &SubscriptionEvent<ChatEventKind>) -> Self {
		let payload = &event.payload;

		Self {
			id: string_field(payload, "id"),
			username: username_field(payload),
			message: message_field(payload),
			platform: string_field(payload, "platform"),
			timestamp: parse_timestamp(payload.get("timestamp"), event.timestamp),
		}
	}
}

/// Derives the narrowed messages channel from a chat monitor.
///
/// A background task filters the events channel down to
/// [`ChatEventKind::Message`] events and re-broadcasts their projections; it
/// ends when the monitor is dropped.
pub fn message_stream(monitor: &ChatMonitor) -> broadcast::Receiver<ChatMessage> {
	let mut events = monitor.subscribe();
	let (tx, rx) = broadcast::channel(CHANNEL_CAPACITY);

	tokio::spawn(async move {
		loop {
			match events.recv().await {
				Ok(event) if event.kind == ChatEventKind::Message => {
					let _ = tx.send(ChatMessage::from_event(&event));
				},
				Ok(_) => {},
				Err(broadcast::error::RecvError::Lagged(skipped)) => {
					tracing::debug!(skipped, "chat message projection lagged");
				},
				Err(broadcast::error::RecvError::Closed) => break,
			}
		}
	});

	rx
}

fn string_field(payload: &Map<String, Value>, key: &str) -> String {
	payload.get(key).and_then(Value::as_str).unwrap_or_default().to_owned()
}

fn username_field(payload: &Map<String, Value>) -> String {
	if let Some(username) = payload.get("username").and_then(Value::as_str) {
		return username.to_owned();
	}

	payload
		.get("user")
		.and_then(Value::as_object)
		.and_then(|user| user.get("username"))
		.and_then(Value::as_str)
		.unwrap_or_default()
		.to_owned()
}

fn message_field(payload: &Map<String, Value>) -> String {
	match payload.get("message") {
		Some(Value::String(text)) => text.clone(),
		Some(Value::Object(message)) =>
			message.get("text").and_then(Value::as_str).unwrap_or_default().to_owned(),
		_ => payload.get("text").and_then(Value::as_str).unwrap_or_default().to_owned(),
	}
}

fn parse_timestamp(value: Option<&Value>, fallback: OffsetDateTime) -> OffsetDateTime {
	let parsed = match value {
		Some(Value::Number(number)) => number.as_i64().and_then(|raw| {
			if raw >= EPOCH_MILLIS_THRESHOLD {
				OffsetDateTime::from_unix_timestamp_nanos(i128::from(raw) * 1_000_000).ok()
			} else {
				OffsetDateTime::from_unix_timestamp(raw).ok()
			}
		}),
		Some(Value::String(text)) => OffsetDateTime::parse(text, &Rfc3339).ok(),
		_ => None,
	};

	parsed.unwrap_or(fallback)
}
