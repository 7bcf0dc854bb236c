pub mod validate;

use crate::shared::ids::VariableUid;
use serde::{Deserialize, Serialize};

/// A variable value is either user-editable text or an arbitrary JSON value
/// assigned by a script. Script-assigned values are read-only through the
/// editor and can only be replaced by another script run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariableValue {
    Text(String),
    Script(serde_json::Value),
}

impl VariableValue {
    pub fn text(raw: impl Into<String>) -> Self {
        Self::Text(raw.into())
    }

    pub fn is_script_assigned(&self) -> bool {
        matches!(self, Self::Script(_))
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(raw) => Some(raw),
            Self::Script(_) => None,
        }
    }
}

impl Default for VariableValue {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

/// Informational row type; not interpreted by the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableKind {
    #[default]
    Text,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableEntry {
    pub uid: VariableUid,
    pub name: String,
    #[serde(default)]
    pub value: VariableValue,
    #[serde(default, rename = "type")]
    pub kind: VariableKind,
    #[serde(default)]
    pub secret: bool,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl VariableEntry {
    pub fn new(name: impl Into<String>, value: VariableValue) -> Self {
        Self {
            uid: VariableUid::generate(),
            name: name.into(),
            value,
            kind: VariableKind::Text,
            secret: false,
            enabled: true,
        }
    }

    /// The trailing empty row new variables are typed into.
    pub fn sentinel() -> Self {
        Self::new("", VariableValue::default())
    }

    pub fn has_name(&self) -> bool {
        !self.name.trim().is_empty()
    }
}

/// One field of one row. Name edits go through [`VariableList::rename`]
/// because they can change the list structure.
#[derive(Debug, Clone)]
pub enum FieldEdit {
    Value(VariableValue),
    Secret(bool),
    Enabled(bool),
}

/// Ordered variable rows with the sentinel invariant: the last row always has
/// an empty name, and structural operations never leave a state where that
/// does not hold.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableList(Vec<VariableEntry>);

impl VariableList {
    /// Persisted rows plus a fresh sentinel to type the next variable into.
    pub fn initialize(persisted: Vec<VariableEntry>) -> Self {
        let mut list = Self(persisted);
        list.normalize();
        list
    }

    pub fn rows(&self) -> &[VariableEntry] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        // A normalized list always holds at least the sentinel.
        self.0.is_empty()
    }

    pub fn position(&self, uid: &VariableUid) -> Option<usize> {
        self.0.iter().position(|entry| entry.uid == *uid)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&VariableEntry> {
        self.0.iter().find(|entry| entry.name == name)
    }

    /// Uid of the trailing empty row, if the last row is one.
    pub fn sentinel_uid(&self) -> Option<&VariableUid> {
        self.0
            .last()
            .filter(|entry| !entry.has_name())
            .map(|entry| &entry.uid)
    }

    /// Rows that take part in drafts and commits: everything with a
    /// non-empty, non-whitespace name.
    pub fn committable(&self) -> Vec<VariableEntry> {
        self.0
            .iter()
            .filter(|entry| entry.has_name())
            .cloned()
            .collect()
    }

    /// Restore the sentinel invariant after a structural change. Idempotent:
    /// appends a fresh sentinel only when the last row carries a name.
    pub fn normalize(&mut self) {
        let needs_sentinel = self.0.last().map_or(true, VariableEntry::has_name);
        if needs_sentinel {
            self.0.push(VariableEntry::sentinel());
        }
    }

    /// Update one field of one row. Never changes list length or order.
    pub fn edit(&mut self, uid: &VariableUid, edit: FieldEdit) -> Result<(), String> {
        let entry = self
            .entry_mut(uid)
            .ok_or_else(|| format!("no variable with uid `{uid}`"))?;
        match edit {
            FieldEdit::Value(value) => {
                if entry.value.is_script_assigned() {
                    return Err(
                        "script-assigned values are read-only and can only be updated through scripts"
                            .to_string(),
                    );
                }
                entry.value = value;
            }
            FieldEdit::Secret(secret) => entry.secret = secret,
            FieldEdit::Enabled(enabled) => entry.enabled = enabled,
        }
        self.normalize();
        Ok(())
    }

    /// Set a row's name. Renaming the sentinel to a non-empty name graduates
    /// it into a real row and appends a new sentinel in the same call, so no
    /// caller ever observes a list with zero or two trailing empty rows.
    pub fn rename(&mut self, uid: &VariableUid, new_name: &str) -> Result<(), String> {
        let entry = self
            .entry_mut(uid)
            .ok_or_else(|| format!("no variable with uid `{uid}`"))?;
        entry.name = new_name.to_string();
        self.normalize();
        Ok(())
    }

    /// Remove a row. Removing the sentinel is a no-op.
    pub fn remove(&mut self, uid: &VariableUid) {
        if self.sentinel_uid() == Some(uid) {
            return;
        }
        self.0.retain(|entry| entry.uid != *uid);
        self.normalize();
    }

    /// Update the named row's value in place (keeping uid and position), or
    /// insert a new row immediately before the sentinel. `mark_secret` forces
    /// the secret flag on for rows holding secret material; it never clears
    /// an existing flag.
    pub fn upsert_before_sentinel(
        &mut self,
        name: &str,
        value: VariableValue,
        mark_secret: bool,
    ) {
        if let Some(entry) = self.0.iter_mut().find(|entry| entry.name == name) {
            entry.value = value;
            if mark_secret {
                entry.secret = true;
            }
            return;
        }
        let mut entry = VariableEntry::new(name, value);
        entry.secret = mark_secret;
        let position = if self.sentinel_uid().is_some() {
            self.0.len() - 1
        } else {
            self.0.len()
        };
        self.0.insert(position, entry);
    }

    fn entry_mut(&mut self, uid: &VariableUid) -> Option<&mut VariableEntry> {
        self.0.iter_mut().find(|entry| entry.uid == *uid)
    }
}
