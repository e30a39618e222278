//! File-backed [`TokenStore`] persisting one session to a JSON file.

// std
use std::{
	fs, io,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::TokenRecord,
	store::{StoreError, StoreFuture, TokenStore},
};

/// Token file name inside the config directory.
const TOKEN_FILE: &str = "tokens.json";

/// Persisted session shape.
///
/// `expires_in` holds the remaining lifetime in seconds and is recomputed
/// against the clock at load time, so the file never carries an absolute
/// instant.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedSession {
	access_token: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	refresh_token: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	expires_in: Option<u64>,
}

/// Durable store writing the session to a JSON file with owner-only
/// permissions.
///
/// Corruption is treated as "no session": an unparsable file is removed and
/// `load` reports `None`, so a subsequent `save` self-heals the state.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
}
impl FileStore {
	/// Opens a store rooted at the provided token file path.
	pub fn open(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	/// Opens a store at the default config location (`$RESTREAM_CONFIG_PATH`
	/// override, else `~/.config/restream.io`), file `tokens.json`.
	pub fn open_default() -> Result<Self, StoreError> {
		let dir = crate::config::default_config_dir().ok_or_else(|| StoreError::Backend {
			message: "No config directory could be resolved.".into(),
		})?;

		Ok(Self::open(dir.join(TOKEN_FILE)))
	}

	/// Path of the persisted token file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn read_session(&self) -> Option<PersistedSession> {
		let bytes = fs::read(&self.path).ok()?;

		match serde_json::from_slice(&bytes) {
			Ok(session) => Some(session),
			Err(e) => {
				tracing::warn!(
					path = %self.path.display(),
					err = %e,
					"removing unparsable token file",
				);

				let _ = fs::remove_file(&self.path);

				None
			},
		}
	}

	fn write_session(&self, session: &PersistedSession) -> Result<(), StoreError> {
		ensure_parent_exists(&self.path)?;

		let serialized =
			serde_json::to_vec_pretty(session).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize session: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		fs::write(&tmp_path, &serialized).map_err(|e| StoreError::Backend {
			message: format!("Failed to write {}: {e}", tmp_path.display()),
		})?;
		restrict_permissions(&tmp_path).map_err(|e| StoreError::Backend {
			message: format!("Failed to restrict {}: {e}", tmp_path.display()),
		})?;
		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}
}
impl TokenStore for FileStore {
	fn save(&self, record: TokenRecord) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			let now = OffsetDateTime::now_utc();
			let expires_in =
				record.expires_at.map(|at| (at - now).whole_seconds().max(0) as u64);
			let session = PersistedSession {
				access_token: record.access_token.expose().to_owned(),
				refresh_token: record
					.refresh_token
					.as_ref()
					.map(|secret| secret.expose().to_owned()),
				expires_in,
			};

			self.write_session(&session)
		})
	}

	fn load(&self) -> StoreFuture<'_, Option<TokenRecord>> {
		Box::pin(async move {
			let Some(session) = self.read_session() else {
				return Ok(None);
			};
			// An empty access token is corruption, not a session.
			let Ok(mut record) = TokenRecord::new(session.access_token) else {
				return Ok(None);
			};

			if let Some(refresh) = session.refresh_token {
				record = record.with_refresh_token(refresh);
			}
			if let Some(secs) = session.expires_in {
				record = record.with_expires_at(
					OffsetDateTime::now_utc() + Duration::seconds(secs as i64),
				);
			}

			Ok(Some(record))
		})
	}

	fn clear(&self) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			match fs::remove_file(&self.path) {
				Ok(()) => Ok(()),
				Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
				Err(e) => Err(StoreError::Backend {
					message: format!("Failed to remove {}: {e}", self.path.display()),
				}),
			}
		})
	}
}

fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
	let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
		return Ok(());
	};

	fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
		message: format!("Failed to create store directory {}: {e}", parent.display()),
	})?;
	restrict_dir_permissions(parent).map_err(|e| StoreError::Backend {
		message: format!("Failed to restrict {}: {e}", parent.display()),
	})
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> io::Result<()> {
	use std::os::unix::fs::PermissionsExt;

	fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}
#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> io::Result<()> {
	Ok(())
}

#[cfg(unix)]
fn restrict_dir_permissions(path: &Path) -> io::Result<()> {
	use std::os::unix::fs::PermissionsExt;

	fs::set_permissions(path, fs::Permissions::from_mode(0o700))
}
#[cfg(not(unix))]
fn restrict_dir_permissions(_path: &Path) -> io::Result<()> {
	Ok(())
}

#[cfg(test)]
mod tests {
	// std
	use std::{env, process};
	// self
	use super::*;

	fn temp_path() -> PathBuf {
		let unique = format!(
			"restream_client_file_store_{}_{}.json",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		);

		env::temp_dir().join(unique)
	}

	#[tokio::test]
	async fn save_and_reload_round_trip() {
		let path = temp_path();
		let store = FileStore::open(&path);
		let record = TokenRecord::new("tok-file")
			.expect("Record fixture should build.")
			.with_refresh_token("refresh-file")
			.with_expires_in(OffsetDateTime::now_utc(), Duration::seconds(3600));

		store.save(record).await.expect("Failed to save fixture record to file store.");

		let reopened = FileStore::open(&path);
		let loaded = reopened
			.load()
			.await
			.expect("Load should not fail on a valid token file.")
			.expect("File store lost record after reopen.");

		assert_eq!(loaded.access_token.expose(), "tok-file");
		assert_eq!(
			loaded.refresh_token.as_ref().map(|secret| secret.expose()),
			Some("refresh-file"),
		);
		assert!(!loaded.is_expired());

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary token file {}: {e}", path.display())
		});
	}

	#[tokio::test]
	async fn corrupt_file_degrades_to_absent() {
		let path = temp_path();

		fs::write(&path, b"{not json").expect("Failed to seed corrupt token file.");

		let store = FileStore::open(&path);

		assert!(
			store
				.load()
				.await
				.expect("Load should degrade corruption to an absent session.")
				.is_none(),
		);
		// The corrupt file is removed so the next save starts clean.
		assert!(!path.exists());
	}

	#[tokio::test]
	async fn clear_is_idempotent() {
		let path = temp_path();
		let store = FileStore::open(&path);

		store.clear().await.expect("Clearing a missing file should succeed.");
		store.clear().await.expect("Clearing twice should succeed.");
	}
}
