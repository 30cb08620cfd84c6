use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::cell::{Cell, RefCell};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use crate::error::Result;

/// Delegated token as persisted in `token.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    #[serde(default = "bearer")]
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "zero_time_as_none"
    )]
    pub expiry: Option<DateTime<Utc>>,
}

fn bearer() -> String {
    "Bearer".to_string()
}

/// `0001-01-01T00:00:00Z` is how some token writers spell "no expiry".
fn zero_time_as_none<'de, D>(d: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let exp = Option::<DateTime<Utc>>::deserialize(d)?;
    Ok(exp.filter(|e| e.year() > 1))
}

impl StoredToken {
    /// Tokens without an expiry never expire locally.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        // refresh slightly early so the token doesn't lapse mid-request
        self.expiry
            .is_some_and(|exp| exp <= now + chrono::Duration::seconds(10))
    }
}

pub trait TokenStore {
    /// `None` when no usable token is stored.
    fn load(&self) -> Option<StoredToken>;
    fn save(&self, token: &StoredToken) -> Result<()>;
}

pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Option<StoredToken> {
        let s = match fs::read_to_string(&self.path) {
            Ok(s) => s,
            Err(e) => {
                log::debug!("no token at {}: {e}", self.path.display());
                return None;
            }
        };
        match serde_json::from_str(&s) {
            Ok(t) => Some(t),
            Err(e) => {
                log::warn!("ignoring malformed token file {}: {e}", self.path.display());
                None
            }
        }
    }

    fn save(&self, token: &StoredToken) -> Result<()> {
        log::info!("Saving credential file to: {}", self.path.display());
        let mut opts = OpenOptions::new();
        opts.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            opts.mode(0o600);
        }
        let mut f = opts.open(&self.path)?;
        // mode() only applies on creation
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            f.set_permissions(fs::Permissions::from_mode(0o600))?;
        }
        serde_json::to_writer(&mut f, token)?;
        f.write_all(b"\n")?;
        Ok(())
    }
}

/// Keeps the token in memory only; for tests.
#[derive(Default)]
pub struct MemoryTokenStore {
    token: RefCell<Option<StoredToken>>,
    saves: Cell<usize>,
}

impl MemoryTokenStore {
    pub fn new(token: Option<StoredToken>) -> Self {
        Self {
            token: RefCell::new(token),
            saves: Cell::new(0),
        }
    }

    pub fn current(&self) -> Option<StoredToken> {
        self.token.borrow().clone()
    }

    pub fn save_count(&self) -> usize {
        self.saves.get()
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Option<StoredToken> {
        self.current()
    }

    fn save(&self, token: &StoredToken) -> Result<()> {
        *self.token.borrow_mut() = Some(token.clone());
        self.saves.set(self.saves.get() + 1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> StoredToken {
        StoredToken {
            access_token: "ya29.a".into(),
            token_type: "Bearer".into(),
            refresh_token: Some("1//r".into()),
            expiry: Some("2030-01-01T00:00:00Z".parse().unwrap()),
        }
    }

    #[test]
    fn file_store_persists_token() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("token.json"));
        assert!(store.load().is_none());

        store.save(&sample()).unwrap();
        assert_eq!(store.load(), Some(sample()));
    }

    #[test]
    fn malformed_token_is_treated_as_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        fs::write(&path, "{not json").unwrap();
        assert!(FileTokenStore::new(path).load().is_none());
    }

    #[test]
    fn reads_token_without_optional_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        fs::write(&path, r#"{"access_token":"x","expiry":"2030-01-01T00:00:00.5+01:00"}"#).unwrap();
        let t = FileTokenStore::new(path).load().unwrap();
        assert_eq!(t.token_type, "Bearer");
        assert_eq!(t.refresh_token, None);
        assert!(t.expiry.is_some());
    }

    #[test]
    fn zero_time_expiry_means_no_expiry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        fs::write(
            &path,
            r#"{"access_token":"x","token_type":"Bearer","expiry":"0001-01-01T00:00:00Z"}"#,
        )
        .unwrap();

        let t = FileTokenStore::new(path).load().unwrap();
        assert_eq!(t.expiry, None);
        assert!(!t.is_expired(Utc::now()));
    }

    #[cfg(unix)]
    #[test]
    fn token_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        fs::write(&path, "old").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        FileTokenStore::new(&path).save(&sample()).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn expiry_check() {
        let now: DateTime<Utc> = "2026-01-01T00:00:00Z".parse().unwrap();
        let mut t = sample();
        assert!(!t.is_expired(now));
        t.expiry = Some(now + chrono::Duration::seconds(5));
        assert!(t.is_expired(now));
        t.expiry = None;
        assert!(!t.is_expired(now));
    }
}
