pub mod client;

use crate::environment::{VariableList, VariableValue};
use serde::Deserialize;

pub const CLUSTER_VARIABLE: &str = "CLUSTER";
pub const TENANT_VARIABLE: &str = "TENANT_NAME";

pub const CLIENT_ID_VARIABLE: &str = "KeycloakClientId";
pub const CLIENT_SECRET_VARIABLE: &str = "KeycloakClientSecret";
pub const ACCESS_TOKEN_URL_VARIABLE: &str = "KeycloakAccessTokenUrl";
pub const PROTOCOL_VARIABLE: &str = "Protocol";
pub const URL_SUFFIX_VARIABLE: &str = "UrlSuffix";

const PROTOCOL_VALUE: &str = "https";
const URL_SUFFIX_DOMAIN: &str = "rightcrowd.dev";

#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error("vault integration is not enabled; check your preferences")]
    Disabled,
    #[error("a vault fetch is already in progress")]
    Busy,
    #[error(
        "variables `{CLUSTER_VARIABLE}` and `{TENANT_VARIABLE}` must be set with non-empty values before fetching from the vault"
    )]
    MissingPrerequisite,
    #[error("vault fetch failed: {reason}")]
    Fetch { reason: String },
    #[error(
        "discarded vault result fetched for environment `{fetched_for}`; active environment is now `{active}`"
    )]
    StaleEnvironment { fetched_for: String, active: String },
}

/// Credential fields read out of the vault secret document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VaultCredentials {
    pub realm_url: String,
    pub client_id: String,
    pub client_secret: String,
}

/// The external secret collaborator. Failures come back as the collaborator's
/// own reason text, surfaced verbatim to the user.
pub trait SecretFetcher {
    fn fetch(&self, cluster: &str, tenant_name: &str) -> Result<VaultCredentials, String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergePhase {
    #[default]
    Idle,
    Fetching,
    Applied,
    Failed,
}

/// An in-flight fetch, tagged with the environment it was dispatched for so a
/// late result can be discarded instead of landing in the wrong environment.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    environment_uid: String,
    cluster: String,
    tenant_name: String,
}

impl FetchRequest {
    pub fn environment_uid(&self) -> &str {
        &self.environment_uid
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    pub fn tenant_name(&self) -> &str {
        &self.tenant_name
    }
}

/// Upserts vault credentials into a variable list as one wholesale merge:
/// either every target name is resolved and applied together, or the list is
/// left untouched.
#[derive(Debug, Default)]
pub struct VaultMergeEngine {
    phase: MergePhase,
}

impl VaultMergeEngine {
    pub fn phase(&self) -> MergePhase {
        self.phase
    }

    /// Validate preconditions and dispatch a fetch. Rejects re-entrant calls
    /// while a fetch is outstanding; never invokes the collaborator when the
    /// trigger variables are missing.
    pub fn begin(
        &mut self,
        list: &VariableList,
        environment_uid: &str,
    ) -> Result<FetchRequest, MergeError> {
        if self.phase == MergePhase::Fetching {
            return Err(MergeError::Busy);
        }
        let cluster = trigger_value(list, CLUSTER_VARIABLE);
        let tenant_name = trigger_value(list, TENANT_VARIABLE);
        let (Some(cluster), Some(tenant_name)) = (cluster, tenant_name) else {
            return Err(MergeError::MissingPrerequisite);
        };
        self.phase = MergePhase::Fetching;
        Ok(FetchRequest {
            environment_uid: environment_uid.to_string(),
            cluster,
            tenant_name,
        })
    }

    /// Apply a fetch outcome. A result tagged for an environment that is no
    /// longer active is discarded without touching the list; on collaborator
    /// failure the list is likewise unchanged and the reason is passed through.
    pub fn complete(
        &mut self,
        request: &FetchRequest,
        outcome: Result<VaultCredentials, String>,
        list: &VariableList,
        active_environment_uid: &str,
    ) -> Result<VariableList, MergeError> {
        if request.environment_uid != active_environment_uid {
            self.phase = MergePhase::Failed;
            return Err(MergeError::StaleEnvironment {
                fetched_for: request.environment_uid.clone(),
                active: active_environment_uid.to_string(),
            });
        }
        let credentials = match outcome {
            Ok(credentials) => credentials,
            Err(reason) => {
                self.phase = MergePhase::Failed;
                return Err(MergeError::Fetch { reason });
            }
        };

        let url_suffix = format!(
            "{}.{}.{URL_SUFFIX_DOMAIN}",
            request.tenant_name, request.cluster
        );
        let mut merged = list.clone();
        merged.upsert_before_sentinel(
            CLIENT_ID_VARIABLE,
            VariableValue::text(credentials.client_id),
            false,
        );
        merged.upsert_before_sentinel(
            CLIENT_SECRET_VARIABLE,
            VariableValue::text(credentials.client_secret),
            true,
        );
        merged.upsert_before_sentinel(
            ACCESS_TOKEN_URL_VARIABLE,
            VariableValue::text(credentials.realm_url),
            false,
        );
        merged.upsert_before_sentinel(PROTOCOL_VARIABLE, VariableValue::text(PROTOCOL_VALUE), false);
        merged.upsert_before_sentinel(URL_SUFFIX_VARIABLE, VariableValue::text(url_suffix), false);

        self.phase = MergePhase::Applied;
        Ok(merged)
    }
}

fn trigger_value(list: &VariableList, name: &str) -> Option<String> {
    list.find_by_name(name)
        .and_then(|entry| entry.value.as_text())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
