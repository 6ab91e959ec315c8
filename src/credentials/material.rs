use crate::config_store::{ParamKey, MASKED_VALUE};
use crate::error::{DeployError, DeployResult};
use base64::{engine::general_purpose::STANDARD, Engine};
use std::fmt;

/// A secret string whose Debug output never shows the value
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the raw value; only adapters sending it to the control plane should call this
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret({})", MASKED_VALUE)
    }
}

/// Credential provider variants known to the control plane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    ApiKey,
    OAuth,
}

impl ProviderKind {
    /// Config store entry holding the provider reference for this kind
    pub fn param_key(&self) -> ParamKey {
        match self {
            ProviderKind::ApiKey => ParamKey::CredentialProviderArn,
            ProviderKind::OAuth => ParamKey::OAuthCredentialProviderArn,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::ApiKey => write!(f, "API key"),
            ProviderKind::OAuth => write!(f, "OAuth 2.0"),
        }
    }
}

/// OAuth 2.0 authorization server metadata registered with an OAuth provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationServer {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub scopes: Vec<String>,
}

impl AuthorizationServer {
    /// Atlassian Cloud, with read access to Confluence content
    pub fn atlassian() -> Self {
        Self {
            issuer: "https://auth.atlassian.com".to_string(),
            authorization_endpoint: "https://auth.atlassian.com/authorize".to_string(),
            token_endpoint: "https://auth.atlassian.com/oauth/token".to_string(),
            scopes: vec![
                "read:confluence-content.all".to_string(),
                "offline_access".to_string(),
            ],
        }
    }
}

/// Desired secret material of a provider; the variant determines the provider kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretMaterial {
    ApiKey {
        /// The base64 `email:token` pair exactly as the control plane expects it
        api_key: Secret,
        /// Account email decoded from the pair, safe to display
        email: String,
    },
    OAuth {
        client_id: String,
        client_secret: Secret,
        server: AuthorizationServer,
    },
}

impl SecretMaterial {
    pub fn kind(&self) -> ProviderKind {
        match self {
            SecretMaterial::ApiKey { .. } => ProviderKind::ApiKey,
            SecretMaterial::OAuth { .. } => ProviderKind::OAuth,
        }
    }

    /// Validate a base64-encoded `email:api_token` pair
    pub fn api_key_from_encoded(encoded: &str) -> DeployResult<Self> {
        let encoded = encoded.trim();
        let invalid = |reason: &str| {
            DeployError::InvalidRunInput(format!(
                "CONFLUENCE_API_KEY {}; expected base64('your_email@example.com:your_api_token')",
                reason
            ))
        };

        let decoded = STANDARD
            .decode(encoded)
            .map_err(|_| invalid("is not valid base64"))?;
        let decoded = String::from_utf8(decoded).map_err(|_| invalid("does not decode to text"))?;

        let (email, token) = decoded
            .split_once(':')
            .ok_or_else(|| invalid("does not contain an 'email:token' pair"))?;

        if email.trim().is_empty() || !email.contains('@') {
            return Err(invalid("does not start with an email address"));
        }

        if token.trim().is_empty() {
            return Err(invalid("has an empty API token"));
        }

        Ok(SecretMaterial::ApiKey {
            api_key: Secret::new(encoded),
            email: email.trim().to_string(),
        })
    }

    /// OAuth client credentials against the Atlassian authorization server
    pub fn oauth(client_id: &str, client_secret: &str) -> DeployResult<Self> {
        if client_id.trim().is_empty() || client_secret.trim().is_empty() {
            return Err(DeployError::InvalidRunInput(
                "OAUTH_CLIENT_ID and OAUTH_CLIENT_SECRET must both be non-empty".to_string(),
            ));
        }

        Ok(SecretMaterial::OAuth {
            client_id: client_id.trim().to_string(),
            client_secret: Secret::new(client_secret.trim()),
            server: AuthorizationServer::atlassian(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(pair: &str) -> String {
        STANDARD.encode(pair)
    }

    #[test]
    fn test_api_key_from_valid_pair() {
        let encoded = encode("me@example.com:tok-123");
        let material = SecretMaterial::api_key_from_encoded(&encoded).unwrap();

        assert_eq!(material.kind(), ProviderKind::ApiKey);
        match material {
            SecretMaterial::ApiKey { api_key, email } => {
                assert_eq!(email, "me@example.com");
                assert_eq!(api_key.expose(), encoded);
            }
            other => panic!("unexpected material: {:?}", other),
        }
    }

    #[test]
    fn test_api_key_rejects_bad_input() {
        for input in [
            "not base64!!".to_string(),
            encode("no-separator"),
            encode("me@example.com:"),
            encode("not-an-email:tok"),
        ] {
            let err = SecretMaterial::api_key_from_encoded(&input).unwrap_err();
            assert_eq!(err.kind(), "InvalidRunInput", "input {:?}", input);
        }
    }

    #[test]
    fn test_debug_never_shows_secrets() {
        let material = SecretMaterial::api_key_from_encoded(&encode("me@example.com:tok-123"))
            .unwrap();
        let oauth = SecretMaterial::oauth("client", "hunter2").unwrap();

        let rendered = format!("{:?} {:?}", material, oauth);
        assert!(!rendered.contains(&encode("me@example.com:tok-123")));
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("client"));
    }

    #[test]
    fn test_oauth_requires_both_values() {
        assert!(SecretMaterial::oauth("client", " ").is_err());
        assert_eq!(
            SecretMaterial::oauth("client", "secret").unwrap().kind(),
            ProviderKind::OAuth
        );
    }

    #[test]
    fn test_kind_maps_to_param_key() {
        assert_eq!(ProviderKind::ApiKey.param_key(), ParamKey::CredentialProviderArn);
        assert_eq!(
            ProviderKind::OAuth.param_key(),
            ParamKey::OAuthCredentialProviderArn
        );
    }
}
