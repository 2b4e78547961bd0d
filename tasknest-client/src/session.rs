use std::{
    collections::BTreeMap,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use parking_lot::Mutex;

use crate::{model::UserId, Result};

/// Fixed key the signed-in user's id is persisted under.
pub const SESSION_KEY: &str = "user_id";

/// Durable storage for the signed-in user. An empty store means guest mode on start.
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<Option<UserId>>;
    fn save(&self, user_id: UserId) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// Key-value JSON file, e.g. `{"user_id":"7"}`. Values are kept as opaque strings.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<BTreeMap<String, String>> {
        match fs::read_to_string(&self.path) {
            Ok(text) if text.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(error) => Err(error.into()),
        }
    }

    fn write(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_vec(entries)?)?;
        Ok(())
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<UserId>> {
        let entries = self.read()?;
        let Some(value) = entries.get(SESSION_KEY) else {
            return Ok(None);
        };

        match value.trim().parse() {
            Ok(user_id) => Ok(Some(user_id)),
            Err(_) => {
                tracing::warn!(path = %self.path.display(), "ignoring unreadable session value {value:?}");
                Ok(None)
            }
        }
    }

    fn save(&self, user_id: UserId) -> Result<()> {
        let mut entries = self.read()?;
        entries.insert(SESSION_KEY.into(), user_id.to_string());
        self.write(&entries)
    }

    fn clear(&self) -> Result<()> {
        let mut entries = self.read()?;
        if entries.remove(SESSION_KEY).is_some() {
            self.write(&entries)?;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemorySessionStore(Mutex<Option<UserId>>);

impl MemorySessionStore {
    pub fn signed_in(user_id: UserId) -> Self {
        Self(Mutex::new(Some(user_id)))
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<UserId>> {
        Ok(*self.0.lock())
    }

    fn save(&self, user_id: UserId) -> Result<()> {
        *self.0.lock() = Some(user_id);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.0.lock() = None;
        Ok(())
    }
}
