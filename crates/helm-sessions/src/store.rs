//! File-backed session store.
//!
//! Each session lives in `<dir>/<id>.json`. Writes go to a temp file in the
//! same directory followed by an atomic rename, so readers always see either
//! the previous complete transcript or the new one, never a partial write.

use std::path::{Path, PathBuf};

use dashmap::DashMap;
use tracing::{debug, instrument};

use crate::errors::StoreError;
use crate::session::Session;

/// Maximum accepted session ID length.
const MAX_ID_LEN: usize = 128;

/// Durable, keyed session storage with an in-memory cache.
pub struct SessionStore {
    dir: PathBuf,
    cache: DashMap<String, Session>,
}

impl SessionStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            cache: DashMap::new(),
        })
    }

    /// Directory sessions are persisted under.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    fn validate_id(id: &str) -> Result<(), StoreError> {
        let ok = !id.is_empty()
            && id.len() <= MAX_ID_LEN
            && id != "."
            && id != ".."
            && !id.contains(['/', '\\', '\0']);
        if ok {
            Ok(())
        } else {
            Err(StoreError::InvalidId(id.to_owned()))
        }
    }

    /// Return the session for `id`, loading or creating it as needed.
    ///
    /// Idempotent: repeated calls for the same id never re-run the
    /// create-and-persist side effect once the session exists.
    #[instrument(skip(self))]
    pub fn get_or_create(&self, id: &str) -> Result<Session, StoreError> {
        Self::validate_id(id)?;

        if let Some(cached) = self.cache.get(id) {
            return Ok(cached.clone());
        }

        let path = self.path_for(id);
        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let session: Session =
                serde_json::from_str(&content).map_err(|source| StoreError::Corrupt {
                    id: id.to_owned(),
                    source,
                })?;
            let _ = self.cache.insert(id.to_owned(), session.clone());
            return Ok(session);
        }

        debug!(session_id = id, "creating session");
        let mut session = Session::new(id);
        self.save(&mut session)?;
        Ok(session)
    }

    /// Persist a session: bump `updated_at`, write atomically, refresh cache.
    #[instrument(skip_all, fields(session_id = session.id))]
    pub fn save(&self, session: &mut Session) -> Result<(), StoreError> {
        Self::validate_id(&session.id)?;
        session.updated_at = chrono::Utc::now().to_rfc3339();

        let json = serde_json::to_vec_pretty(&session)?;
        // Temp file in the target directory keeps the rename on one filesystem.
        let tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        std::fs::write(tmp.path(), &json)?;
        let _ = tmp
            .persist(self.path_for(&session.id))
            .map_err(|e| StoreError::Io(e.error))?;

        let _ = self.cache.insert(session.id.clone(), session.clone());
        Ok(())
    }

    /// Delete a session from cache and disk. Unknown ids are a no-op.
    pub fn delete(&self, id: &str) -> Result<(), StoreError> {
        Self::validate_id(id)?;
        let _ = self.cache.remove(id);
        match std::fs::remove_file(self.path_for(id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// All persisted sessions, ordered by `updated_at` descending.
    ///
    /// Files that fail to parse are skipped rather than failing the listing.
    pub fn list(&self) -> Result<Vec<Session>, StoreError> {
        let mut sessions = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if let Some(cached) = self.cache.get(id) {
                sessions.push(cached.clone());
                continue;
            }
            match std::fs::read_to_string(&path)
                .map_err(StoreError::from)
                .and_then(|c| {
                    serde_json::from_str::<Session>(&c).map_err(|source| StoreError::Corrupt {
                        id: id.to_owned(),
                        source,
                    })
                }) {
                Ok(session) => sessions.push(session),
                Err(e) => debug!(session_id = id, error = %e, "skipping unreadable session"),
            }
        }
        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(sessions)
    }

    /// Number of persisted sessions.
    pub fn session_count(&self) -> Result<usize, StoreError> {
        Ok(self.list()?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use helm_core::messages::Message;

    fn make_store() -> (SessionStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::open(dir.path()).unwrap();
        (store, dir)
    }

    #[test]
    fn get_or_create_creates_and_persists() {
        let (store, dir) = make_store();
        let session = store.get_or_create("main").unwrap();
        assert!(session.is_empty());
        assert!(dir.path().join("main.json").exists());
    }

    #[test]
    fn get_or_create_is_idempotent() {
        let (store, _dir) = make_store();
        let mut session = store.get_or_create("main").unwrap();
        session.append(Message::user("hello"));
        store.save(&mut session).unwrap();

        // A second get_or_create must not recreate an empty session
        let again = store.get_or_create("main").unwrap();
        assert_eq!(again.len(), 1);
    }

    #[test]
    fn save_then_load_roundtrips_exactly() {
        let (store, dir) = make_store();
        let mut session = store.get_or_create("rt").unwrap();
        session.append(Message::user("list files"));
        session.append(Message::assistant("ok", vec![]));
        store.save(&mut session).unwrap();

        // Fresh store (cold cache) observes exactly what was saved
        let cold = SessionStore::open(dir.path()).unwrap();
        let loaded = cold.get_or_create("rt").unwrap();
        assert_eq!(loaded.messages, session.messages);
        assert_eq!(loaded.updated_at, session.updated_at);
    }

    #[test]
    fn save_updates_timestamp() {
        let (store, _dir) = make_store();
        let mut session = store.get_or_create("ts").unwrap();
        let created = session.updated_at.clone();
        std::thread::sleep(std::time::Duration::from_millis(5));
        session.append(Message::user("x"));
        store.save(&mut session).unwrap();
        assert!(session.updated_at > created);
    }

    #[test]
    fn delete_removes_file_and_cache() {
        let (store, dir) = make_store();
        let _ = store.get_or_create("gone").unwrap();
        store.delete("gone").unwrap();
        assert!(!dir.path().join("gone.json").exists());
        // Recreate yields a fresh empty session
        let again = store.get_or_create("gone").unwrap();
        assert!(again.is_empty());
    }

    #[test]
    fn delete_unknown_is_noop() {
        let (store, _dir) = make_store();
        store.delete("never_existed").unwrap();
    }

    #[test]
    fn list_orders_by_update_descending() {
        let (store, _dir) = make_store();
        let mut a = store.get_or_create("a").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let _b = store.get_or_create("b").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        a.append(Message::user("bump"));
        store.save(&mut a).unwrap();

        let listed = store.list().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, "a");
        assert_eq!(listed[1].id, "b");
    }

    #[test]
    fn session_count_tracks_files() {
        let (store, _dir) = make_store();
        assert_eq!(store.session_count().unwrap(), 0);
        let _ = store.get_or_create("one").unwrap();
        let _ = store.get_or_create("two").unwrap();
        assert_eq!(store.session_count().unwrap(), 2);
    }

    #[test]
    fn invalid_ids_rejected() {
        let (store, _dir) = make_store();
        assert!(matches!(store.get_or_create(""), Err(StoreError::InvalidId(_))));
        assert!(matches!(store.get_or_create("a/b"), Err(StoreError::InvalidId(_))));
        assert!(matches!(store.get_or_create(".."), Err(StoreError::InvalidId(_))));
        let long = "x".repeat(200);
        assert!(matches!(store.get_or_create(&long), Err(StoreError::InvalidId(_))));
    }

    #[test]
    fn corrupt_file_reports_session_id() {
        let (store, dir) = make_store();
        std::fs::write(dir.path().join("bad.json"), "{nope").unwrap();
        match store.get_or_create("bad") {
            Err(StoreError::Corrupt { id, .. }) => assert_eq!(id, "bad"),
            other => panic!("expected corrupt error, got {other:?}"),
        }
    }

    #[test]
    fn list_skips_corrupt_files() {
        let (store, dir) = make_store();
        let _ = store.get_or_create("good").unwrap();
        std::fs::write(dir.path().join("bad.json"), "{nope").unwrap();
        let listed = store.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, "good");
    }

    #[test]
    fn concurrent_saves_to_different_sessions_do_not_corrupt() {
        let (store, dir) = make_store();
        let store = std::sync::Arc::new(store);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    let id = format!("s{i}");
                    let mut session = store.get_or_create(&id).unwrap();
                    for turn in 0..20 {
                        session.append(Message::user(format!("{id} turn {turn}")));
                        store.save(&mut session).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        // Every transcript parses and contains exactly its own writes
        let cold = SessionStore::open(dir.path()).unwrap();
        for i in 0..8 {
            let id = format!("s{i}");
            let session = cold.get_or_create(&id).unwrap();
            assert_eq!(session.len(), 20);
            for msg in &session.messages {
                assert!(msg.content().unwrap().starts_with(&id));
            }
        }
    }
}
