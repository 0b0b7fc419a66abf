//! Save and restore a [`PresentationState`] under a per-table key.

use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};

use crate::domain::TableError;
use crate::state::PresentationState;

/// A string-keyed slot store. Implementations decide where the slots live.
pub trait StateBackend: Send {
    fn read(&self, key: &str) -> Result<Option<String>, TableError>;
    fn write(&mut self, key: &str, value: &str) -> Result<(), TableError>;
    fn remove(&mut self, key: &str) -> Result<(), TableError>;
}

/// In-process backend. Clones share the same slots, so two models on one backend see each other's
/// writes.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    slots: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<String, String>> {
        // A panic while holding the lock cannot leave a map half-written.
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.slots().get(key).cloned()
    }

    pub fn insert(&self, key: &str, value: &str) {
        self.slots().insert(key.to_string(), value.to_string());
    }
}

impl StateBackend for MemoryBackend {
    fn read(&self, key: &str) -> Result<Option<String>, TableError> {
        Ok(self.get(key))
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), TableError> {
        self.insert(key, value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), TableError> {
        self.slots().remove(key);
        Ok(())
    }
}

/// One json file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileBackend { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{name}.json"))
    }
}

impl StateBackend for FileBackend {
    fn read(&self, key: &str) -> Result<Option<String>, TableError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), TableError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(value.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), TableError> {
        match fs::remove_file(self.path_for(key)) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

/// Json encoding of [`PresentationState`] on top of a [`StateBackend`].
pub struct Persistence {
    backend: Box<dyn StateBackend>,
}

impl Persistence {
    pub fn new(backend: impl StateBackend + 'static) -> Self {
        Persistence {
            backend: Box::new(backend),
        }
    }

    pub fn memory() -> Self {
        Self::new(MemoryBackend::new())
    }

    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self::new(FileBackend::new(dir))
    }

    /// The persisted state of `table_id`, if there is a readable one. Unreadable blobs are logged
    /// and treated as absent.
    pub fn load(&self, table_id: &str) -> Option<PresentationState> {
        let blob = match self.backend.read(table_id) {
            Ok(Some(blob)) => blob,
            Ok(None) => {
                debug!("No persisted state for table {table_id}");
                return None;
            }
            Err(e) => {
                warn!("Failed to read persisted state for table {table_id}: {e}");
                return None;
            }
        };
        match serde_json::from_str::<PresentationState>(&blob) {
            Ok(state) => {
                info!("Restored presentation state for table {table_id}");
                Some(state)
            }
            Err(e) => {
                warn!("Ignoring corrupt persisted state for table {table_id}: {e}");
                None
            }
        }
    }

    pub fn save(&mut self, table_id: &str, state: &PresentationState) -> Result<(), TableError> {
        let blob = serde_json::to_string(state)?;
        self.backend.write(table_id, &blob)
    }

    pub fn clear(&mut self, table_id: &str) -> Result<(), TableError> {
        self.backend.remove(table_id)
    }
}

impl std::fmt::Debug for Persistence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Persistence").finish_non_exhaustive()
    }
}
