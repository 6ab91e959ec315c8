use super::{AwsCli, AwsCliError};
use crate::credentials::{ControlPlaneError, CredentialControlPlane, ProviderKind, SecretMaterial};
use serde_json::{json, Value};
use std::sync::Arc;

const SERVICE: &str = "bedrock-agentcore-control";
const OAUTH_VENDOR: &str = "CustomOauth2";

/// Bedrock AgentCore token vault, driven through `aws bedrock-agentcore-control`
pub struct AgentCoreControlPlane {
    cli: Arc<AwsCli>,
}

impl AgentCoreControlPlane {
    pub fn new(cli: Arc<AwsCli>) -> Self {
        Self { cli }
    }

    fn operation(verb: &str, kind: ProviderKind) -> String {
        match kind {
            ProviderKind::ApiKey => format!("{}-api-key-credential-provider", verb),
            ProviderKind::OAuth => format!("{}-oauth2-credential-provider", verb),
        }
    }

    fn list_operation(kind: ProviderKind) -> &'static str {
        match kind {
            ProviderKind::ApiKey => "list-api-key-credential-providers",
            ProviderKind::OAuth => "list-oauth2-credential-providers",
        }
    }

    /// Provider reference from a response or list item
    fn reference_of(value: &Value) -> Option<String> {
        value
            .get("credentialProviderArn")
            .or_else(|| value.get("arn"))
            .and_then(Value::as_str)
            .filter(|arn| !arn.is_empty())
            .map(str::to_string)
    }

    /// `--oauth2-provider-config-input` document for an OAuth provider
    fn oauth_config(material: &SecretMaterial) -> Option<String> {
        let SecretMaterial::OAuth {
            client_id,
            client_secret,
            server,
        } = material
        else {
            return None;
        };

        let config = json!({
            "customOauth2ProviderConfig": {
                "oauthDiscovery": {
                    "authorizationServerMetadata": {
                        "issuer": server.issuer,
                        "authorizationEndpoint": server.authorization_endpoint,
                        "tokenEndpoint": server.token_endpoint,
                        "responseTypes": ["code"],
                    }
                },
                "clientId": client_id,
                "clientSecret": client_secret.expose(),
                "oauthScopes": server.scopes,
            }
        });

        Some(config.to_string())
    }

    fn write(&self, verb: &str, name: &str, material: &SecretMaterial) -> Result<Value, ControlPlaneError> {
        let operation = Self::operation(verb, material.kind());

        let result = match material {
            SecretMaterial::ApiKey { api_key, .. } => self.cli.call(
                SERVICE,
                &operation,
                &["--name", name, "--api-key", api_key.expose()],
            ),
            SecretMaterial::OAuth { .. } => {
                let config = Self::oauth_config(material).unwrap_or_default();
                self.cli.call(
                    SERVICE,
                    &operation,
                    &[
                        "--name",
                        name,
                        "--credential-provider-vendor",
                        OAUTH_VENDOR,
                        "--oauth2-provider-config-input",
                        &config,
                    ],
                )
            }
        };

        result.map_err(classify)
    }
}

fn classify(err: AwsCliError) -> ControlPlaneError {
    if err.is("ConflictException") || err.message.contains("already exists") {
        ControlPlaneError::Conflict(err.to_string())
    } else {
        ControlPlaneError::Rejected(err.to_string())
    }
}

impl CredentialControlPlane for AgentCoreControlPlane {
    fn find_provider(
        &self,
        kind: ProviderKind,
        name: &str,
    ) -> Result<Option<String>, ControlPlaneError> {
        let response = self
            .cli
            .call(SERVICE, Self::list_operation(kind), &[])
            .map_err(|err| ControlPlaneError::Rejected(err.to_string()))?;

        let items = response
            .get("credentialProviders")
            .or_else(|| response.get("items"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let found = items
            .iter()
            .find(|item| item.get("name").and_then(Value::as_str) == Some(name));

        match found {
            Some(item) => Self::reference_of(item).map(Some).ok_or_else(|| {
                ControlPlaneError::Rejected(format!("provider '{}' is listed without an ARN", name))
            }),
            None => Ok(None),
        }
    }

    fn create_provider(
        &self,
        name: &str,
        material: &SecretMaterial,
    ) -> Result<String, ControlPlaneError> {
        let response = self.write("create", name, material)?;
        Self::reference_of(&response).ok_or_else(|| {
            ControlPlaneError::Rejected(format!("create returned no ARN for provider '{}'", name))
        })
    }

    fn update_provider(
        &self,
        name: &str,
        material: &SecretMaterial,
    ) -> Result<(), ControlPlaneError> {
        self.write("update", name, material)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{MockCommandExecutor, MockCommandResult};
    use base64::{engine::general_purpose::STANDARD, Engine};

    const ARN: &str = "arn:aws:bedrock-agentcore:us-east-1:123456789012:token-vault/default/apikeycredentialprovider/confluence-apikey-provider";

    fn plane(outputs: Vec<MockCommandResult>) -> (Arc<MockCommandExecutor>, AgentCoreControlPlane) {
        let executor = Arc::new(MockCommandExecutor::with_outputs(outputs));
        let cli = Arc::new(AwsCli::new(executor.clone(), "us-east-1"));
        (executor, AgentCoreControlPlane::new(cli))
    }

    fn api_key() -> SecretMaterial {
        SecretMaterial::api_key_from_encoded(&STANDARD.encode("me@example.com:tok")).unwrap()
    }

    #[test]
    fn test_find_provider_matches_by_name() {
        let (_, plane) = plane(vec![MockCommandResult::ok(
            "aws bedrock-agentcore-control list-api-key-credential-providers",
            &format!(
                r#"{{"credentialProviders": [{{"name": "other", "credentialProviderArn": "arn:other"}}, {{"name": "confluence-apikey-provider", "credentialProviderArn": "{}"}}]}}"#,
                ARN
            ),
        )]);

        let found = plane
            .find_provider(ProviderKind::ApiKey, "confluence-apikey-provider")
            .unwrap();
        assert_eq!(found.as_deref(), Some(ARN));
    }

    #[test]
    fn test_find_provider_absent_is_none() {
        let (_, plane) = plane(vec![MockCommandResult::ok(
            "aws bedrock-agentcore-control list-oauth2-credential-providers",
            r#"{"credentialProviders": []}"#,
        )]);

        assert_eq!(
            plane
                .find_provider(ProviderKind::OAuth, "confluence-oauth-provider")
                .unwrap(),
            None
        );
    }

    #[test]
    fn test_create_api_key_provider_returns_arn() {
        let (executor, plane) = plane(vec![MockCommandResult::ok(
            "aws bedrock-agentcore-control create-api-key-credential-provider",
            &format!(r#"{{"credentialProviderArn": "{}", "name": "confluence-apikey-provider"}}"#, ARN),
        )]);

        let arn = plane
            .create_provider("confluence-apikey-provider", &api_key())
            .unwrap();

        assert_eq!(arn, ARN);
        let args = &executor.invocations()[0].args;
        assert!(args.contains(&"--api-key".to_string()));
    }

    #[test]
    fn test_create_conflict_is_classified() {
        let (_, plane) = plane(vec![MockCommandResult::failed(
            "aws bedrock-agentcore-control create-api-key-credential-provider",
            254,
            "An error occurred (ConflictException) when calling the CreateApiKeyCredentialProvider operation: Credential provider already exists",
        )]);

        let err = plane
            .create_provider("confluence-apikey-provider", &api_key())
            .unwrap_err();
        assert!(matches!(err, ControlPlaneError::Conflict(_)));
    }

    #[test]
    fn test_validation_failure_is_rejected() {
        let (_, plane) = plane(vec![MockCommandResult::failed(
            "aws bedrock-agentcore-control update-api-key-credential-provider",
            254,
            "An error occurred (ValidationException) when calling the UpdateApiKeyCredentialProvider operation: apiKey too long",
        )]);

        let err = plane
            .update_provider("confluence-apikey-provider", &api_key())
            .unwrap_err();
        assert_eq!(
            err,
            ControlPlaneError::Rejected("ValidationException: apiKey too long".to_string())
        );
    }

    #[test]
    fn test_oauth_provider_sends_authorization_server_metadata() {
        let (executor, plane) = plane(vec![MockCommandResult::ok(
            "aws bedrock-agentcore-control create-oauth2-credential-provider",
            r#"{"credentialProviderArn": "arn:oauth"}"#,
        )]);
        let material = SecretMaterial::oauth("client-id", "client-secret").unwrap();

        plane.create_provider("confluence-oauth-provider", &material).unwrap();

        let invocation = &executor.invocations()[0];
        let position = invocation
            .args
            .iter()
            .position(|a| a == "--oauth2-provider-config-input")
            .unwrap();
        let config: Value = serde_json::from_str(&invocation.args[position + 1]).unwrap();
        let custom = &config["customOauth2ProviderConfig"];
        assert_eq!(custom["clientId"], "client-id");
        assert_eq!(
            custom["oauthDiscovery"]["authorizationServerMetadata"]["tokenEndpoint"],
            "https://auth.atlassian.com/oauth/token"
        );
        assert_eq!(custom["oauthScopes"][1], "offline_access");
        assert!(invocation.command_line().contains("--credential-provider-vendor CustomOauth2"));
    }
}
