//! Streaming-event monitor specialization.

// self
use crate::monitor::{EventDomain, SubscriptionMonitor};

/// Event kinds published by the streaming endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamingEventKind {
	/// An outgoing stream went live.
	StreamStarted,
	/// An outgoing stream ended.
	StreamStopped,
	/// Ingest metrics update (bitrate, fps, dropped frames).
	MetricsUpdated,
	/// A destination channel changed status.
	ChannelUpdated,
	/// Action outside the known set; the raw payload stays on the event.
	Unknown,
}

/// Streaming event domain marker.
#[derive(Clone, Copy, Debug, Default)]
pub struct StreamingDomain;
impl EventDomain for StreamingDomain {
	type Kind = StreamingEventKind;

	const NAME: &'static str = "streaming";

	fn classify(action: &str) -> Self::Kind {
		match action.to_ascii_lowercase().as_str() {
			"stream_start" | "stream_started" => StreamingEventKind::StreamStarted,
			"stream_stop" | "stream_stopped" => StreamingEventKind::StreamStopped,
			"metrics" | "metrics_update" => StreamingEventKind::MetricsUpdated,
			"channel_update" | "channel_status" => StreamingEventKind::ChannelUpdated,
			_ => StreamingEventKind::Unknown,
		}
	}
}

/// Monitor for the streaming WebSocket endpoint.
pub type StreamingMonitor = SubscriptionMonitor<StreamingDomain>;
