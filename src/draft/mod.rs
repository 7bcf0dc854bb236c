use crate::environment::{VariableEntry, VariableList};
use crate::persistence::{read_optional_file, StoreError};
use crate::shared::fs_atomic::atomic_write_file;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Uncommitted edits for one environment, mirrored out of the in-memory list
/// so they survive navigation away and process crashes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    pub environment_uid: String,
    pub variables: Vec<VariableEntry>,
    pub updated_at: DateTime<Utc>,
}

/// Single-slot draft storage with explicit keying: at most one draft is held
/// at a time, `set` replaces whatever is there, and `get`/`clear` only
/// observe or remove a draft recorded for the given environment.
pub trait DraftStore {
    fn get(&self, environment_uid: &str) -> Result<Option<Draft>, StoreError>;
    fn set(&mut self, draft: Draft) -> Result<(), StoreError>;
    fn clear(&mut self, environment_uid: &str) -> Result<(), StoreError>;
}

/// Compare the list's committable rows to the last committed state and mirror
/// the difference into the draft store. Returns the modified flag.
///
/// Idempotent and order-independent: running it twice with the same inputs
/// leaves the store unchanged the second time, and it never writes a draft
/// identical to the one already held (which would otherwise re-trigger
/// whatever scheduled it).
pub fn sync_out(
    list: &VariableList,
    persisted: &[VariableEntry],
    environment_uid: &str,
    store: &mut dyn DraftStore,
) -> Result<bool, StoreError> {
    let committable = list.committable();
    let modified = committable != persisted;
    if modified {
        let already_held = store
            .get(environment_uid)?
            .is_some_and(|draft| draft.variables == committable);
        if !already_held {
            store.set(Draft {
                environment_uid: environment_uid.to_string(),
                variables: committable,
                updated_at: Utc::now(),
            })?;
        }
    } else if store.get(environment_uid)?.is_some() {
        store.clear(environment_uid)?;
    }
    Ok(modified)
}

/// Rebuild a list from the stored draft for this environment, if one exists.
/// Callers gate this on environment activation; running it twice for the same
/// draft produces equivalent lists (only the fresh sentinel uid differs).
pub fn restore_from_draft(
    environment_uid: &str,
    store: &dyn DraftStore,
) -> Result<Option<VariableList>, StoreError> {
    Ok(store
        .get(environment_uid)?
        .map(|draft| VariableList::initialize(draft.variables)))
}

/// The draft slot as one JSON file under the state root.
#[derive(Debug, Clone)]
pub struct JsonDraftStore {
    path: PathBuf,
}

impl JsonDraftStore {
    pub fn new(state_root: &Path) -> Self {
        Self {
            path: state_root.join("draft.json"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A slot that fails to parse reads as no draft, so a corrupt file never
    /// blocks mirroring; the next `set` replaces it wholesale.
    fn read_slot(&self) -> Result<Option<Draft>, StoreError> {
        let Some(body) = read_optional_file(&self.path)? else {
            return Ok(None);
        };
        Ok(serde_json::from_str(&body).ok())
    }
}

impl DraftStore for JsonDraftStore {
    fn get(&self, environment_uid: &str) -> Result<Option<Draft>, StoreError> {
        Ok(self
            .read_slot()?
            .filter(|draft| draft.environment_uid == environment_uid))
    }

    fn set(&mut self, draft: Draft) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
                path: parent.display().to_string(),
                source,
            })?;
        }
        let body =
            serde_json::to_vec_pretty(&draft).map_err(|source| StoreError::EncodeJson {
                path: self.path.display().to_string(),
                source,
            })?;
        atomic_write_file(&self.path, &body).map_err(|source| StoreError::Write {
            path: self.path.display().to_string(),
            source,
        })
    }

    fn clear(&mut self, environment_uid: &str) -> Result<(), StoreError> {
        let holds_draft = self
            .read_slot()?
            .is_some_and(|draft| draft.environment_uid == environment_uid);
        if !holds_draft {
            return Ok(());
        }
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Write {
                path: self.path.display().to_string(),
                source,
            }),
        }
    }
}

/// In-memory slot for tests, with a write counter so redundant-write
/// suppression is observable.
#[derive(Debug, Default)]
pub struct MemoryDraftStore {
    slot: Option<Draft>,
    writes: usize,
}

impl MemoryDraftStore {
    pub fn slot(&self) -> Option<&Draft> {
        self.slot.as_ref()
    }

    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl DraftStore for MemoryDraftStore {
    fn get(&self, environment_uid: &str) -> Result<Option<Draft>, StoreError> {
        Ok(self
            .slot
            .clone()
            .filter(|draft| draft.environment_uid == environment_uid))
    }

    fn set(&mut self, draft: Draft) -> Result<(), StoreError> {
        self.writes += 1;
        self.slot = Some(draft);
        Ok(())
    }

    fn clear(&mut self, environment_uid: &str) -> Result<(), StoreError> {
        if self
            .slot
            .as_ref()
            .is_some_and(|draft| draft.environment_uid == environment_uid)
        {
            self.slot = None;
        }
        Ok(())
    }
}
