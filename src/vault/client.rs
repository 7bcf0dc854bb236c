use super::{SecretFetcher, VaultCredentials};
use crate::config::VaultSettings;
use serde_json::Value;

const DEFAULT_AUTHORITY_BASE: &str = "https://login.microsoftonline.com";
const VAULT_SCOPE: &str = "https://vault.azure.net/.default";
const VAULT_API_VERSION: &str = "7.4";

const REALM_URL_FIELD: &str = "KEYCLOAK_REALM_URL";
const CLIENT_ID_FIELD: &str = "KEYCLOAK_CLIENT_ID";
const CLIENT_SECRET_FIELD: &str = "KEYCLOAK_CLIENT_SECRET";

#[derive(Debug, thiserror::Error)]
pub enum VaultClientError {
    #[error(
        "vault configuration is incomplete; tenant_id, client_id, client_secret and vault_url are all required"
    )]
    IncompleteConfig,
    #[error("vault token request failed: {0}")]
    TokenRequest(String),
    #[error("vault request failed: {0}")]
    SecretRequest(String),
    #[error("secret `{name}` is not valid JSON: {reason}")]
    SecretNotJson { name: String, reason: String },
    #[error("secret `{name}` is missing required fields: {fields}")]
    MissingFields { name: String, fields: String },
}

/// Azure Key Vault client: client-credentials token grant, then secret reads
/// over the vault REST surface.
#[derive(Debug, Clone)]
pub struct AzureVaultClient {
    authority_base: String,
    tenant_id: String,
    client_id: String,
    client_secret: String,
    vault_url: String,
}

impl AzureVaultClient {
    pub fn from_settings(settings: &VaultSettings) -> Result<Self, VaultClientError> {
        if !settings.is_complete() {
            return Err(VaultClientError::IncompleteConfig);
        }
        let authority_base = std::env::var("ENVAULT_VAULT_AUTHORITY_BASE")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_AUTHORITY_BASE.to_string());
        Ok(Self {
            authority_base,
            tenant_id: settings.tenant_id.clone(),
            client_id: settings.client_id.clone(),
            client_secret: settings.client_secret.clone(),
            vault_url: settings.vault_url.clone(),
        })
    }

    /// Secrets are stored per cluster and tenant under `CLUSTER--TENANT_NAME`.
    pub fn secret_name(cluster: &str, tenant_name: &str) -> String {
        format!("{cluster}--{tenant_name}")
    }

    fn access_token(&self) -> Result<String, VaultClientError> {
        let url = format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority_base.trim_end_matches('/'),
            self.tenant_id
        );
        let response = ureq::post(&url)
            .send_form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("scope", VAULT_SCOPE),
            ])
            .map_err(|e| VaultClientError::TokenRequest(e.to_string()))?;
        let body: Value = response
            .into_json()
            .map_err(|e| VaultClientError::TokenRequest(e.to_string()))?;
        body.get("access_token")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                VaultClientError::TokenRequest(
                    "token response did not include an access_token".to_string(),
                )
            })
    }

    fn vault_endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.vault_url.trim_end_matches('/'), path)
    }

    fn fetch_secret_document(&self, name: &str) -> Result<Value, VaultClientError> {
        let token = self.access_token()?;
        let url = format!(
            "{}?api-version={VAULT_API_VERSION}",
            self.vault_endpoint(&format!("secrets/{}", urlencoding::encode(name)))
        );
        let response = ureq::get(&url)
            .set("Authorization", &format!("Bearer {token}"))
            .call()
            .map_err(|e| VaultClientError::SecretRequest(e.to_string()))?;
        let body: Value = response
            .into_json()
            .map_err(|e| VaultClientError::SecretRequest(e.to_string()))?;
        let raw = body
            .get("value")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                VaultClientError::SecretRequest(format!("secret `{name}` has no value"))
            })?;
        serde_json::from_str(raw).map_err(|e| VaultClientError::SecretNotJson {
            name: name.to_string(),
            reason: e.to_string(),
        })
    }

    pub fn fetch_keycloak_credentials(
        &self,
        cluster: &str,
        tenant_name: &str,
    ) -> Result<VaultCredentials, VaultClientError> {
        let name = Self::secret_name(cluster, tenant_name);
        let document = self.fetch_secret_document(&name)?;

        let mut missing = Vec::new();
        let realm_url = string_field(&document, REALM_URL_FIELD, &mut missing);
        let client_id = string_field(&document, CLIENT_ID_FIELD, &mut missing);
        let client_secret = string_field(&document, CLIENT_SECRET_FIELD, &mut missing);
        if !missing.is_empty() {
            return Err(VaultClientError::MissingFields {
                name,
                fields: missing.join(", "),
            });
        }

        Ok(VaultCredentials {
            realm_url: realm_url.unwrap_or_default(),
            client_id: client_id.unwrap_or_default(),
            client_secret: client_secret.unwrap_or_default(),
        })
    }

    /// Verify credentials and vault reachability by listing a single secret.
    pub fn test_connection(&self) -> Result<(), VaultClientError> {
        let token = self.access_token()?;
        let url = format!(
            "{}?api-version={VAULT_API_VERSION}&maxresults=1",
            self.vault_endpoint("secrets")
        );
        ureq::get(&url)
            .set("Authorization", &format!("Bearer {token}"))
            .call()
            .map_err(|e| VaultClientError::SecretRequest(e.to_string()))?;
        Ok(())
    }
}

impl SecretFetcher for AzureVaultClient {
    fn fetch(&self, cluster: &str, tenant_name: &str) -> Result<VaultCredentials, String> {
        self.fetch_keycloak_credentials(cluster, tenant_name)
            .map_err(|err| err.to_string())
    }
}

fn string_field(
    document: &Value,
    field: &'static str,
    missing: &mut Vec<&'static str>,
) -> Option<String> {
    let value = document
        .get(field)
        .and_then(Value::as_str)
        .filter(|v| !v.is_empty())
        .map(str::to_string);
    if value.is_none() {
        missing.push(field);
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_name_joins_cluster_and_tenant() {
        assert_eq!(AzureVaultClient::secret_name("eu1", "acme"), "eu1--acme");
    }

    #[test]
    fn incomplete_settings_are_rejected_before_any_request() {
        let settings = VaultSettings {
            enabled: true,
            tenant_id: "tenant".to_string(),
            client_id: String::new(),
            client_secret: "secret".to_string(),
            vault_url: "https://vault.example".to_string(),
        };
        assert!(matches!(
            AzureVaultClient::from_settings(&settings),
            Err(VaultClientError::IncompleteConfig)
        ));
    }

    #[test]
    fn missing_document_fields_are_reported_by_name() {
        let document = serde_json::json!({ CLIENT_ID_FIELD: "client-1" });
        let mut missing = Vec::new();
        assert!(string_field(&document, REALM_URL_FIELD, &mut missing).is_none());
        assert!(string_field(&document, CLIENT_ID_FIELD, &mut missing).is_some());
        assert!(string_field(&document, CLIENT_SECRET_FIELD, &mut missing).is_none());
        assert_eq!(missing, vec![REALM_URL_FIELD, CLIENT_SECRET_FIELD]);
    }
}
