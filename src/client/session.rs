//! Client session
//!
//! The persisted token is a single string stored under the key [`TOKEN_KEY`].
//! Its presence is the only authorization signal the client checks; expiry is
//! left to the server, which answers 401 and makes the client clear it.

use serde_json::{Map, Value};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use super::error::ClientResult;

/// Storage key of the persisted token
pub const TOKEN_KEY: &str = "token";

/// Persistent key-value storage for the session token
pub trait TokenStore: Send + Sync {
    fn load(&self) -> ClientResult<Option<String>>;
    fn save(&self, token: &str) -> ClientResult<()>;
    fn clear(&self) -> ClientResult<()>;
}

/// Token kept in process memory only
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: &str) -> Self {
        Self {
            token: Mutex::new(Some(token.to_string())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> ClientResult<Option<String>> {
        Ok(self.token.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn save(&self, token: &str) -> ClientResult<()> {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> ClientResult<()> {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

/// Token persisted as `{"token": "..."}` in a JSON file
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> ClientResult<Map<String, Value>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => Ok(map),
            _ => {
                tracing::warn!(path = %self.path.display(), "Ignoring unreadable session file");
                Ok(Map::new())
            }
        }
    }

    fn write_map(&self, map: &Map<String, Value>) -> ClientResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(map).map_err(std::io::Error::from)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> ClientResult<Option<String>> {
        let map = self.read_map()?;
        Ok(map
            .get(TOKEN_KEY)
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .map(str::to_string))
    }

    fn save(&self, token: &str) -> ClientResult<()> {
        let mut map = self.read_map()?;
        map.insert(TOKEN_KEY.to_string(), Value::String(token.to_string()));
        self.write_map(&map)
    }

    fn clear(&self) -> ClientResult<()> {
        let mut map = self.read_map()?;
        if map.remove(TOKEN_KEY).is_some() {
            self.write_map(&map)?;
        }
        Ok(())
    }
}

/// Current user plus the persisted token.
///
/// Created on login, updated on register, cleared on logout or when the
/// server rejects the token.
pub struct Session<U> {
    store: Arc<dyn TokenStore>,
    user: RwLock<Option<U>>,
}

impl<U: Clone> Session<U> {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self {
            store,
            user: RwLock::new(None),
        }
    }

    /// Token as currently persisted; storage failures read as no token
    pub fn token(&self) -> Option<String> {
        match self.store.load() {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read session token");
                None
            }
        }
    }

    pub fn has_token(&self) -> bool {
        self.token().is_some()
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    /// Start a session after login. `token` is `None` for flows without one.
    pub fn establish(&self, user: U, token: Option<&str>) -> ClientResult<()> {
        if let Some(token) = token {
            self.store.save(token)?;
        }
        *self.user.write().unwrap_or_else(PoisonError::into_inner) = Some(user);
        Ok(())
    }

    /// Replace the in-memory user, keeping the token
    pub fn update_user(&self, user: U) {
        *self.user.write().unwrap_or_else(PoisonError::into_inner) = Some(user);
    }

    pub fn current_user(&self) -> Option<U> {
        self.user.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Forget the user and remove the persisted token
    pub fn clear(&self) -> ClientResult<()> {
        *self.user.write().unwrap_or_else(PoisonError::into_inner) = None;
        self.store.clear()
    }
}

impl<U> std::fmt::Debug for Session<U> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("nested").join("session.json"));

        assert_eq!(store.load().unwrap(), None);
        store.save("abc").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("abc"));

        let raw = std::fs::read_to_string(store.path()).unwrap();
        let value: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value[TOKEN_KEY], "abc");

        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_file_store_ignores_garbage() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "not json").unwrap();

        let store = FileTokenStore::new(&path);
        assert_eq!(store.load().unwrap(), None);
        store.save("t").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("t"));
    }

    #[test]
    fn test_session_lifecycle() {
        let store: Arc<dyn TokenStore> = Arc::new(MemoryTokenStore::new());
        let session: Session<String> = Session::new(Arc::clone(&store));
        assert!(!session.has_token());
        assert_eq!(session.current_user(), None);

        session.establish("alice".to_string(), Some("tok")).unwrap();
        assert_eq!(session.token().as_deref(), Some("tok"));
        assert_eq!(store.load().unwrap().as_deref(), Some("tok"));

        session.update_user("alice2".to_string());
        assert_eq!(session.current_user().as_deref(), Some("alice2"));
        assert!(session.has_token());

        session.clear().unwrap();
        assert!(!session.has_token());
        assert_eq!(session.current_user(), None);
    }

    #[test]
    fn test_establish_without_token_keeps_store() {
        let session: Session<u32> = Session::new(Arc::new(MemoryTokenStore::new()));
        session.establish(7, None).unwrap();
        assert_eq!(session.current_user(), Some(7));
        assert!(!session.has_token());
    }
}
