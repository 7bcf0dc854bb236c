use crate::config::VaultSettings;
use crate::draft::{self, DraftStore};
use crate::environment::validate::{validate_name, validation_errors};
use crate::environment::{FieldEdit, VariableEntry, VariableList};
use crate::persistence::{EnvironmentStore, StoreError};
use crate::shared::ids::VariableUid;
use crate::shared::logging::append_editor_log_line;
use crate::vault::{MergeError, MergePhase, SecretFetcher, VaultMergeEngine};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CommitError {
    #[error("no changes to save")]
    NoChanges,
    #[error("row {row} is invalid: {message}")]
    Validation { row: usize, message: String },
    #[error("failed to persist environment: {reason}")]
    Persistence { reason: String },
}

/// Edits one environment's variable list: tracks the modified flag against
/// the last committed state, mirrors uncommitted edits into the draft store,
/// and commits or resets wholesale. Collaborators (persistence store, draft
/// store, secret fetcher) are passed into the operations that need them.
#[derive(Debug)]
pub struct EnvironmentEditor {
    environment_uid: String,
    variables: VariableList,
    persisted: Vec<VariableEntry>,
    modified: bool,
    touched: BTreeSet<usize>,
    vault: VaultMergeEngine,
    log_root: Option<PathBuf>,
}

impl EnvironmentEditor {
    /// Open an environment: load the committed list, append a sentinel, and
    /// restore a matching draft if one survived a previous session.
    pub fn open(
        environment_uid: &str,
        store: &dyn EnvironmentStore,
        draft_store: &mut dyn DraftStore,
    ) -> Result<Self, StoreError> {
        let persisted = store.load(environment_uid)?;
        let mut editor = Self {
            environment_uid: environment_uid.to_string(),
            variables: VariableList::initialize(persisted.clone()),
            persisted,
            modified: false,
            touched: BTreeSet::new(),
            vault: VaultMergeEngine::default(),
            log_root: None,
        };
        editor.restore_draft(draft_store);
        editor.sync_draft(draft_store);
        Ok(editor)
    }

    pub fn with_log_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.log_root = Some(root.into());
        self
    }

    pub fn environment_uid(&self) -> &str {
        &self.environment_uid
    }

    pub fn variables(&self) -> &VariableList {
        &self.variables
    }

    pub fn modified(&self) -> bool {
        self.modified
    }

    pub fn vault_phase(&self) -> MergePhase {
        self.vault.phase()
    }

    /// Switch to another environment. Re-activating the current environment
    /// is a no-op, so draft restoration fires exactly once per switch and the
    /// restored list is in place before any later sync-out for the same
    /// activation.
    pub fn activate(
        &mut self,
        environment_uid: &str,
        store: &dyn EnvironmentStore,
        draft_store: &mut dyn DraftStore,
    ) -> Result<(), StoreError> {
        if environment_uid == self.environment_uid {
            return Ok(());
        }
        let persisted = store.load(environment_uid)?;
        self.environment_uid = environment_uid.to_string();
        self.variables = VariableList::initialize(persisted.clone());
        self.persisted = persisted;
        self.touched.clear();
        self.restore_draft(draft_store);
        self.sync_draft(draft_store);
        Ok(())
    }

    pub fn edit_field(
        &mut self,
        uid: &VariableUid,
        edit: FieldEdit,
        draft_store: &mut dyn DraftStore,
    ) -> Result<(), String> {
        self.variables.edit(uid, edit)?;
        self.sync_draft(draft_store);
        Ok(())
    }

    pub fn rename(
        &mut self,
        uid: &VariableUid,
        new_name: &str,
        draft_store: &mut dyn DraftStore,
    ) -> Result<(), String> {
        self.variables.rename(uid, new_name)?;
        self.sync_draft(draft_store);
        Ok(())
    }

    pub fn remove_row(&mut self, uid: &VariableUid, draft_store: &mut dyn DraftStore) {
        self.variables.remove(uid);
        self.sync_draft(draft_store);
    }

    /// Mark a row's name as touched (blur or commit key); only touched rows
    /// surface their errors through [`visible_errors`](Self::visible_errors).
    pub fn touch(&mut self, index: usize) {
        self.touched.insert(index);
    }

    pub fn validation_errors(&self) -> BTreeMap<usize, String> {
        validation_errors(self.variables.rows())
    }

    pub fn visible_errors(&self) -> BTreeMap<usize, String> {
        self.validation_errors()
            .into_iter()
            .filter(|(index, _)| self.touched.contains(index))
            .collect()
    }

    /// Validate and persist the committable rows, then rebuild local state
    /// from the saved list. Touched-state is ignored here: every row headed
    /// for the store is validated. On persistence failure the in-memory list
    /// is left untouched so nothing the user typed is lost.
    pub fn commit(
        &mut self,
        store: &mut dyn EnvironmentStore,
        draft_store: &mut dyn DraftStore,
    ) -> Result<(), CommitError> {
        let to_save = self.variables.committable();
        if to_save == self.persisted {
            return Err(CommitError::NoChanges);
        }
        for (row, entry) in to_save.iter().enumerate() {
            if let Err(message) = validate_name(&entry.name) {
                return Err(CommitError::Validation { row, message });
            }
        }
        store
            .save(&self.environment_uid, &to_save)
            .map_err(|err| CommitError::Persistence {
                reason: err.to_string(),
            })?;

        self.log(&format!(
            "committed {} variables for environment {}",
            to_save.len(),
            self.environment_uid
        ));
        self.persisted = to_save.clone();
        self.variables = VariableList::initialize(to_save);
        self.modified = false;
        self.touched.clear();
        if let Err(err) = draft_store.clear(&self.environment_uid) {
            self.log(&format!(
                "failed to clear draft for {}: {err}",
                self.environment_uid
            ));
        }
        Ok(())
    }

    /// Discard uncommitted edits and rebuild from the last committed list.
    pub fn reset(&mut self, draft_store: &mut dyn DraftStore) {
        self.variables = VariableList::initialize(self.persisted.clone());
        self.modified = false;
        self.touched.clear();
        if let Err(err) = draft_store.clear(&self.environment_uid) {
            self.log(&format!(
                "failed to clear draft for {}: {err}",
                self.environment_uid
            ));
        }
    }

    /// Fetch credentials for this environment's `CLUSTER`/`TENANT_NAME` pair
    /// and upsert them into the list as one atomic merge.
    pub fn merge_from_vault(
        &mut self,
        settings: &VaultSettings,
        fetcher: &dyn SecretFetcher,
        draft_store: &mut dyn DraftStore,
    ) -> Result<(), MergeError> {
        if !settings.enabled {
            return Err(MergeError::Disabled);
        }
        let request = self.vault.begin(&self.variables, &self.environment_uid)?;
        let outcome = fetcher.fetch(request.cluster(), request.tenant_name());
        let merged = match self
            .vault
            .complete(&request, outcome, &self.variables, &self.environment_uid)
        {
            Ok(merged) => merged,
            Err(err) => {
                self.log(&format!(
                    "vault merge failed for environment {}: {err}",
                    self.environment_uid
                ));
                return Err(err);
            }
        };
        self.variables = merged;
        self.sync_draft(draft_store);
        self.log(&format!(
            "applied vault credentials for environment {}",
            self.environment_uid
        ));
        Ok(())
    }

    fn restore_draft(&mut self, draft_store: &mut dyn DraftStore) {
        match draft::restore_from_draft(&self.environment_uid, draft_store) {
            Ok(Some(list)) => {
                self.variables = list;
                self.log(&format!(
                    "restored draft for environment {}",
                    self.environment_uid
                ));
            }
            Ok(None) => {}
            Err(err) => self.log(&format!(
                "failed to read draft for {}: {err}",
                self.environment_uid
            )),
        }
    }

    /// Draft mirroring is a recovery aid; a store failure is logged and must
    /// never block editing, so the modified flag is recomputed locally when
    /// the store is unreachable.
    fn sync_draft(&mut self, draft_store: &mut dyn DraftStore) {
        match draft::sync_out(
            &self.variables,
            &self.persisted,
            &self.environment_uid,
            draft_store,
        ) {
            Ok(modified) => self.modified = modified,
            Err(err) => {
                self.modified = self.variables.committable() != self.persisted;
                self.log(&format!(
                    "draft sync failed for {}: {err}",
                    self.environment_uid
                ));
            }
        }
    }

    fn log(&self, line: &str) {
        if let Some(root) = &self.log_root {
            append_editor_log_line(root, line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::MemoryDraftStore;
    use crate::environment::VariableValue;
    use crate::persistence::MemoryEnvironmentStore;

    fn named(name: &str, value: &str) -> VariableEntry {
        VariableEntry::new(name, VariableValue::text(value))
    }

    #[test]
    fn open_starts_unmodified_with_sentinel() {
        let store = MemoryEnvironmentStore::default()
            .with_environment("env-1", vec![named("A", "1")]);
        let mut drafts = MemoryDraftStore::default();
        let editor = EnvironmentEditor::open("env-1", &store, &mut drafts).expect("open");
        assert!(!editor.modified());
        assert_eq!(editor.variables().len(), 2);
        assert!(editor.variables().sentinel_uid().is_some());
    }

    #[test]
    fn edits_flip_modified_and_reset_clears_it() {
        let store = MemoryEnvironmentStore::default()
            .with_environment("env-1", vec![named("A", "1")]);
        let mut drafts = MemoryDraftStore::default();
        let mut editor = EnvironmentEditor::open("env-1", &store, &mut drafts).expect("open");

        let uid = editor.variables().rows()[0].uid.clone();
        editor
            .edit_field(
                &uid,
                FieldEdit::Value(VariableValue::text("2")),
                &mut drafts,
            )
            .expect("edit");
        assert!(editor.modified());
        assert!(drafts.slot().is_some());

        editor.reset(&mut drafts);
        assert!(!editor.modified());
        assert!(drafts.slot().is_none());
        assert_eq!(
            editor.variables().rows()[0].value,
            VariableValue::text("1")
        );
    }

    #[test]
    fn visible_errors_follow_touched_state() {
        let store = MemoryEnvironmentStore::default();
        let mut drafts = MemoryDraftStore::default();
        let mut editor = EnvironmentEditor::open("env-1", &store, &mut drafts).expect("open");

        let sentinel = editor.variables().sentinel_uid().expect("sentinel").clone();
        editor
            .rename(&sentinel, "1bad", &mut drafts)
            .expect("rename");
        assert_eq!(editor.validation_errors().len(), 1);
        assert!(editor.visible_errors().is_empty());

        editor.touch(0);
        assert_eq!(editor.visible_errors().len(), 1);
    }

    #[test]
    fn reactivating_the_same_environment_is_a_no_op() {
        let store = MemoryEnvironmentStore::default()
            .with_environment("env-1", vec![named("A", "1")]);
        let mut drafts = MemoryDraftStore::default();
        let mut editor = EnvironmentEditor::open("env-1", &store, &mut drafts).expect("open");

        let uid = editor.variables().rows()[0].uid.clone();
        editor
            .edit_field(
                &uid,
                FieldEdit::Value(VariableValue::text("2")),
                &mut drafts,
            )
            .expect("edit");
        let before = editor.variables().clone();

        editor
            .activate("env-1", &store, &mut drafts)
            .expect("activate");
        assert_eq!(*editor.variables(), before);
        assert!(editor.modified());
    }
}
