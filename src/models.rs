//! Thin serde mappings of the platform's REST payload shapes.
//!
//! These structs mirror the wire fields one-for-one and carry no behavior;
//! unknown fields are ignored so additive server changes stay compatible.

// self
use crate::_prelude::*;

/// User profile from `GET /user/profile`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Profile {
	/// Numeric account id.
	pub id: u64,
	/// Account username.
	pub username: String,
	/// Account email address.
	pub email: String,
}

/// Channel summary from `GET /user/channel/all`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSummary {
	/// Channel id.
	pub id: u64,
	/// Destination platform id.
	pub streaming_platform_id: u64,
	/// Embeddable player URL.
	pub embed_url: String,
	/// Public channel URL.
	pub url: String,
	/// Platform-side channel identifier.
	pub identifier: String,
	/// Display name shown in the dashboard.
	pub display_name: String,
	/// Whether restreaming to this channel is enabled.
	pub enabled: bool,
}

/// Detailed channel from `GET /user/channel/{id}`.
///
/// The detail endpoint uses snake_case fields, unlike the list endpoint.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Channel {
	/// Channel id.
	pub id: u64,
	/// Owning account id.
	pub user_id: u64,
	/// Destination service id.
	pub service_id: u64,
	/// Platform-side channel identifier.
	pub channel_identifier: String,
	/// Public channel URL.
	pub channel_url: String,
	/// Platform-side event identifier, when an event is scheduled.
	pub event_identifier: Option<String>,
	/// Platform-side event URL, when an event is scheduled.
	pub event_url: Option<String>,
	/// Embeddable player URL.
	pub embed: String,
	/// Whether restreaming to this channel is active.
	pub active: bool,
	/// Display name shown in the dashboard.
	pub display_name: String,
}

/// Channel metadata from `GET /user/channel-meta/{id}`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChannelMeta {
	/// Stream title pushed to the destination.
	pub title: String,
	/// Stream description pushed to the destination.
	#[serde(default)]
	pub description: String,
}

/// Destination entry on a stream event.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDestination {
	/// Target channel id.
	pub channel_id: u64,
	/// External event URL, when the platform exposes one.
	pub external_url: Option<String>,
	/// Destination platform id.
	pub streaming_platform_id: u64,
}

/// Stream event from the `/user/events` endpoints.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamEvent {
	/// Event id.
	pub id: String,
	/// Show id grouping recurring events, when present.
	pub show_id: Option<String>,
	/// Lifecycle status (`upcoming`, `live`, `finished`, ...).
	pub status: String,
	/// Event title.
	pub title: String,
	/// Event description.
	pub description: String,
	/// Whether the event was started ad hoc rather than scheduled.
	pub is_instant: bool,
	/// Whether the event records without restreaming.
	pub is_record_only: bool,
	/// Cover image URL, when set.
	pub cover_url: Option<String>,
	/// Scheduled start as epoch seconds, when scheduled.
	pub scheduled_for: Option<i64>,
	/// Actual start as epoch seconds, when started.
	pub started_at: Option<i64>,
	/// Finish instant as epoch seconds, when finished.
	pub finished_at: Option<i64>,
	/// Destinations the event restreams to.
	pub destinations: Vec<EventDestination>,
}

/// Pagination block on the events history response.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventsPagination {
	/// Total number of pages.
	pub pages_total: u32,
	/// Current page (1-based).
	pub page: u32,
	/// Page size.
	pub limit: u32,
}

/// One page of historical events from `GET /user/events/history`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventsHistory {
	/// Events on this page.
	pub items: Vec<StreamEvent>,
	/// Pagination cursor data.
	pub pagination: EventsPagination,
}

/// Streaming platform from `GET /platform/all`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Platform {
	/// Platform id.
	pub id: u64,
	/// Platform display name.
	pub name: String,
	/// Platform website URL.
	pub url: String,
}

/// Ingest server from `GET /server/all`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Server {
	/// Server id.
	pub id: u64,
	/// Server display name.
	pub name: String,
	/// Server hostname.
	pub url: String,
	/// RTMP ingest URL.
	pub rtmp_url: String,
}

/// Stream key payload from `GET /user/streamKey` and
/// `GET /user/events/{id}/streamKey`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamKey {
	/// Ingest stream key; treat as a secret.
	pub stream_key: String,
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn stream_event_decodes_the_wire_shape() {
		let payload = serde_json::json!({
			"id": "evt-1",
			"showId": null,
			"status": "live",
			"title": "Morning show",
			"description": "",
			"isInstant": true,
			"isRecordOnly": false,
			"coverUrl": null,
			"scheduledFor": null,
			"startedAt": 1_760_000_000,
			"finishedAt": null,
			"destinations": [
				{ "channelId": 7, "externalUrl": null, "streamingPlatformId": 5 }
			]
		});
		let event: StreamEvent = serde_json::from_value(payload)
			.expect("Stream event fixture should decode.");

		assert_eq!(event.id, "evt-1");
		assert_eq!(event.started_at, Some(1_760_000_000));
		assert_eq!(event.destinations.len(), 1);
		assert_eq!(event.destinations[0].channel_id, 7);
	}

	#[test]
	fn channel_meta_defaults_a_missing_description() {
		let meta: ChannelMeta = serde_json::from_value(serde_json::json!({ "title": "T" }))
			.expect("Channel meta fixture should decode.");

		assert_eq!(meta.title, "T");
		assert!(meta.description.is_empty());
	}
}
