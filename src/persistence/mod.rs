use crate::environment::VariableEntry;
use crate::shared::fs_atomic::atomic_write_file;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode yaml for {path}: {source}")]
    EncodeYaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid yaml in {path}: {source}")]
    ParseYaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("failed to encode json for {path}: {source}")]
    EncodeJson {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("environment store rejected the save: {0}")]
    Backend(String),
}

/// Committed variable lists, keyed by environment uid. The editor only reads
/// and writes whole lists; it never mutates stored state in place.
pub trait EnvironmentStore {
    fn load(&self, environment_uid: &str) -> Result<Vec<VariableEntry>, StoreError>;
    fn save(
        &mut self,
        environment_uid: &str,
        variables: &[VariableEntry],
    ) -> Result<(), StoreError>;
}

/// One YAML file per environment under `{root}/environments/`.
#[derive(Debug, Clone)]
pub struct YamlEnvironmentStore {
    root: PathBuf,
}

impl YamlEnvironmentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn environment_path(&self, environment_uid: &str) -> PathBuf {
        self.root
            .join("environments")
            .join(format!("{environment_uid}.yaml"))
    }
}

impl EnvironmentStore for YamlEnvironmentStore {
    fn load(&self, environment_uid: &str) -> Result<Vec<VariableEntry>, StoreError> {
        let path = self.environment_path(environment_uid);
        let body = match fs::read_to_string(&path) {
            Ok(body) => body,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::Read {
                    path: path.display().to_string(),
                    source,
                })
            }
        };
        serde_yaml::from_str(&body).map_err(|source| StoreError::ParseYaml {
            path: path.display().to_string(),
            source,
        })
    }

    fn save(
        &mut self,
        environment_uid: &str,
        variables: &[VariableEntry],
    ) -> Result<(), StoreError> {
        let path = self.environment_path(environment_uid);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
                path: parent.display().to_string(),
                source,
            })?;
        }
        let body = serde_yaml::to_string(variables).map_err(|source| StoreError::EncodeYaml {
            path: path.display().to_string(),
            source,
        })?;
        atomic_write_file(&path, body.as_bytes()).map_err(|source| StoreError::Write {
            path: path.display().to_string(),
            source,
        })
    }
}

/// In-memory store for tests, with save-failure injection and a call counter
/// so tests can assert the store was never reached.
#[derive(Debug, Default)]
pub struct MemoryEnvironmentStore {
    environments: BTreeMap<String, Vec<VariableEntry>>,
    fail_next_save: Option<String>,
    save_calls: usize,
}

impl MemoryEnvironmentStore {
    pub fn with_environment(
        mut self,
        environment_uid: &str,
        variables: Vec<VariableEntry>,
    ) -> Self {
        self.environments
            .insert(environment_uid.to_string(), variables);
        self
    }

    pub fn fail_next_save(&mut self, reason: &str) {
        self.fail_next_save = Some(reason.to_string());
    }

    pub fn saved(&self, environment_uid: &str) -> Option<&[VariableEntry]> {
        self.environments
            .get(environment_uid)
            .map(Vec::as_slice)
    }

    pub fn save_calls(&self) -> usize {
        self.save_calls
    }
}

impl EnvironmentStore for MemoryEnvironmentStore {
    fn load(&self, environment_uid: &str) -> Result<Vec<VariableEntry>, StoreError> {
        Ok(self
            .environments
            .get(environment_uid)
            .cloned()
            .unwrap_or_default())
    }

    fn save(
        &mut self,
        environment_uid: &str,
        variables: &[VariableEntry],
    ) -> Result<(), StoreError> {
        self.save_calls += 1;
        if let Some(reason) = self.fail_next_save.take() {
            return Err(StoreError::Backend(reason));
        }
        self.environments
            .insert(environment_uid.to_string(), variables.to_vec());
        Ok(())
    }
}

pub(crate) fn read_optional_file(path: &Path) -> Result<Option<String>, StoreError> {
    match fs::read_to_string(path) {
        Ok(body) => Ok(Some(body)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(StoreError::Read {
            path: path.display().to_string(),
            source,
        }),
    }
}
