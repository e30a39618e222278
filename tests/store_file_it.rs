// std
use std::{env, fs, path::PathBuf, process};
// crates.io
use time::{Duration, OffsetDateTime};
// self
use restream_client::{
	auth::TokenRecord,
	store::{FileStore, TokenStore},
};

fn temp_path(tag: &str) -> PathBuf {
	let unique = format!(
		"restream_client_{tag}_{}_{}.json",
		process::id(),
		OffsetDateTime::now_utc().unix_timestamp_nanos(),
	);

	env::temp_dir().join(unique)
}

#[tokio::test]
async fn corrupt_file_reads_as_absent_and_save_overwrites() {
	let path = temp_path("corrupt");

	fs::write(&path, b"{\"access_token\": truncated").expect("Failed to seed corrupt file.");

	let store = FileStore::open(&path);

	assert!(
		store
			.load()
			.await
			.expect("Corruption should degrade to an absent session, not an error.")
			.is_none(),
	);

	let record = TokenRecord::new("tok-healed")
		.expect("Record fixture should build.")
		.with_refresh_token("refresh-healed");

	store.save(record).await.expect("Save should succeed over the corrupt state.");

	let healed = store
		.load()
		.await
		.expect("Load should succeed after the overwrite.")
		.expect("The overwritten session should be present.");

	assert_eq!(healed.access_token.expose(), "tok-healed");

	fs::remove_file(&path).expect("Failed to remove temporary token file.");
}

#[tokio::test]
async fn expiry_is_persisted_as_remaining_seconds() {
	let path = temp_path("expiry");
	let store = FileStore::open(&path);
	let record = TokenRecord::new("tok-expiring")
		.expect("Record fixture should build.")
		.with_expires_in(OffsetDateTime::now_utc(), Duration::seconds(3600));

	store.save(record).await.expect("Save should succeed.");

	let raw = fs::read_to_string(&path).expect("Token file should be readable.");
	let value: serde_json::Value =
		serde_json::from_str(&raw).expect("Token file should hold valid JSON.");
	let expires_in = value
		.get("expires_in")
		.and_then(serde_json::Value::as_u64)
		.expect("Persisted session should carry a relative expires_in.");

	// Relative seconds, never an absolute instant.
	assert!((3590..=3600).contains(&expires_in), "unexpected expires_in: {expires_in}");

	let loaded = store
		.load()
		.await
		.expect("Load should succeed on the persisted session.")
		.expect("The persisted session should be present.");

	assert!(!loaded.is_expired());

	fs::remove_file(&path).expect("Failed to remove temporary token file.");
}

#[tokio::test]
async fn records_without_expiry_round_trip_without_one() {
	let path = temp_path("no_expiry");
	let store = FileStore::open(&path);
	let record = TokenRecord::new("tok-eternal").expect("Record fixture should build.");

	store.save(record).await.expect("Save should succeed.");

	let raw = fs::read_to_string(&path).expect("Token file should be readable.");

	assert!(!raw.contains("expires_in"));

	let loaded = store
		.load()
		.await
		.expect("Load should succeed on the persisted session.")
		.expect("The persisted session should be present.");

	assert_eq!(loaded.expires_at, None);

	fs::remove_file(&path).expect("Failed to remove temporary token file.");
}

#[cfg(unix)]
#[tokio::test]
async fn token_file_is_owner_only() {
	// std
	use std::os::unix::fs::PermissionsExt;

	let path = temp_path("perms");
	let store = FileStore::open(&path);
	let record = TokenRecord::new("tok-private").expect("Record fixture should build.");

	store.save(record).await.expect("Save should succeed.");

	let mode = fs::metadata(&path)
		.expect("Token file metadata should be readable.")
		.permissions()
		.mode();

	assert_eq!(mode & 0o777, 0o600, "token file should be owner-only");

	fs::remove_file(&path).expect("Failed to remove temporary token file.");
}

#[tokio::test]
async fn missing_file_reads_as_absent() {
	let store = FileStore::open(temp_path("missing"));

	assert!(
		store
			.load()
			.await
			.expect("A missing file should degrade to an absent session.")
			.is_none(),
	);
	store.clear().await.expect("Clearing a missing file should succeed.");
}
