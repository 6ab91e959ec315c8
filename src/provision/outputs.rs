use crate::error::{DeployError, DeployResult};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Value the stack reports for the credential provider until one is reconciled
pub const NOT_SET_YET: &str = "NOT_SET_YET";

/// Well-known stack outputs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKey {
    /// Primary identifier; persisted to the config store as `gateway-id`
    GatewayId,
    GatewayUrl,
    CredentialProviderArn,
}

impl OutputKey {
    /// Output name as declared by the stack
    pub fn output_name(&self) -> &'static str {
        match self {
            OutputKey::GatewayId => "GatewayID",
            OutputKey::GatewayUrl => "GatewayURL",
            OutputKey::CredentialProviderArn => "CredentialProviderArn",
        }
    }
}

/// Outputs of one apply
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StackOutput {
    pub stack_id: String,
    /// Output name as written by the provisioner, to value
    pub values: BTreeMap<String, String>,
}

impl StackOutput {
    /// Look up an output by name, ignoring case and punctuation
    pub fn get(&self, name: &str) -> Option<&str> {
        let wanted = normalize(name);
        self.values
            .iter()
            .find(|(key, _)| normalize(key) == wanted)
            .map(|(_, value)| value.as_str())
            .filter(|value| !value.trim().is_empty())
    }

    pub fn value(&self, key: OutputKey) -> Option<&str> {
        self.get(key.output_name())
    }

    pub fn gateway_id(&self) -> Option<&str> {
        self.value(OutputKey::GatewayId)
    }

    pub fn gateway_url(&self) -> Option<&str> {
        self.value(OutputKey::GatewayUrl)
    }

    pub fn credential_provider_ref(&self) -> Option<&str> {
        self.value(OutputKey::CredentialProviderArn)
    }

    /// The stack was deployed before any credential provider existed
    pub fn credential_provider_pending(&self) -> bool {
        self.credential_provider_ref() == Some(NOT_SET_YET)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn normalize(key: &str) -> String {
    key.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Parses the provisioner's output document
///
/// Accepts a flat `{name: value}` object or the CDK `--outputs-file` shape
/// `{stack: {name: value}}`. Missing outputs are not an error here; callers
/// decide what an absent key means.
pub struct OutputExtractor {
    stack_name: String,
}

impl OutputExtractor {
    pub fn new(stack_name: &str) -> Self {
        Self {
            stack_name: stack_name.to_string(),
        }
    }

    pub fn extract(&self, raw: &str) -> DeployResult<StackOutput> {
        if raw.trim().is_empty() {
            return Ok(StackOutput {
                stack_id: self.stack_name.clone(),
                values: BTreeMap::new(),
            });
        }

        let document: Value = serde_json::from_str(raw)
            .map_err(|err| DeployError::OutputParsing(format!("invalid JSON: {}", err)))?;

        let top = match document {
            Value::Object(top) => top,
            other => {
                return Err(DeployError::OutputParsing(format!(
                    "expected a JSON object, found {}",
                    json_type(&other)
                )));
            }
        };

        let (stack_id, outputs) = self.select_stack(&top)?;

        let mut values = BTreeMap::new();
        for (name, value) in outputs {
            let value = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Null => continue,
                other => {
                    return Err(DeployError::OutputParsing(format!(
                        "output '{}' is {}, expected a scalar",
                        name,
                        json_type(other)
                    )));
                }
            };
            values.insert(name.clone(), value);
        }

        tracing::debug!(stack = %stack_id, outputs = values.len(), "stack outputs extracted");
        Ok(StackOutput { stack_id, values })
    }

    /// Pick the per-stack object out of a nested document, or treat the document as flat
    fn select_stack<'a>(
        &self,
        top: &'a Map<String, Value>,
    ) -> DeployResult<(String, &'a Map<String, Value>)> {
        if let Some(value) = top.get(&self.stack_name) {
            return match value {
                Value::Object(outputs) => Ok((self.stack_name.clone(), outputs)),
                other => Err(DeployError::OutputParsing(format!(
                    "outputs of stack '{}' are {}, expected an object",
                    self.stack_name,
                    json_type(other)
                ))),
            };
        }

        let nested: Vec<_> = top
            .iter()
            .filter_map(|(name, value)| value.as_object().map(|outputs| (name, outputs)))
            .collect();

        match nested.as_slice() {
            [] => Ok((self.stack_name.clone(), top)),
            [(name, outputs)] if nested.len() == top.len() => Ok(((*name).clone(), *outputs)),
            _ => Err(DeployError::OutputParsing(format!(
                "document holds no outputs for stack '{}'",
                self.stack_name
            ))),
        }
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> OutputExtractor {
        OutputExtractor::new("ConfluenceGatewayStack-Dev")
    }

    #[test]
    fn test_unparsable_document_is_hard_failure() {
        let err = extractor().extract("{not json").unwrap_err();
        assert_eq!(err.kind(), "OutputParsingError");
    }

    #[test]
    fn test_empty_object_has_no_gateway_id() {
        let output = extractor().extract("{}").unwrap();
        assert!(output.is_empty());
        assert_eq!(output.gateway_id(), None);
    }

    #[test]
    fn test_flat_document_yields_gateway_id() {
        let output = extractor().extract(r#"{"gatewayId": "gw-123"}"#).unwrap();
        assert_eq!(output.gateway_id(), Some("gw-123"));
        assert_eq!(output.stack_id, "ConfluenceGatewayStack-Dev");
    }

    #[test]
    fn test_cdk_outputs_file_shape() {
        let raw = r#"{
            "ConfluenceGatewayStack-Dev": {
                "GatewayID": "gw-abc",
                "GatewayURL": "https://gw-abc.gateway.bedrock-agentcore.us-east-1.amazonaws.com/mcp",
                "GatewayRoleArn": "arn:aws:iam::123456789012:role/gateway",
                "CredentialProviderArn": "NOT_SET_YET"
            }
        }"#;

        let output = extractor().extract(raw).unwrap();

        assert_eq!(output.gateway_id(), Some("gw-abc"));
        assert_eq!(
            output.gateway_url(),
            Some("https://gw-abc.gateway.bedrock-agentcore.us-east-1.amazonaws.com/mcp")
        );
        assert_eq!(
            output.get("GatewayRoleArn"),
            Some("arn:aws:iam::123456789012:role/gateway")
        );
        assert!(output.credential_provider_pending());
    }

    #[test]
    fn test_single_nested_stack_under_other_name() {
        let output = extractor()
            .extract(r#"{"ConfluenceGatewayStack-Prod": {"GatewayID": "gw-9"}}"#)
            .unwrap();
        assert_eq!(output.stack_id, "ConfluenceGatewayStack-Prod");
        assert_eq!(output.gateway_id(), Some("gw-9"));
    }

    #[test]
    fn test_non_object_document_is_malformed() {
        let err = extractor().extract(r#"["gw-123"]"#).unwrap_err();
        assert!(err.to_string().contains("expected a JSON object, found an array"));
    }

    #[test]
    fn test_blank_document_means_no_outputs() {
        let output = extractor().extract("  \n").unwrap();
        assert!(output.is_empty());
    }

    #[test]
    fn test_empty_value_counts_as_absent() {
        let output = extractor().extract(r#"{"GatewayID": "", "GatewayURL": null}"#).unwrap();
        assert_eq!(output.gateway_id(), None);
        assert_eq!(output.gateway_url(), None);
    }

    #[test]
    fn test_key_matching_ignores_case_and_punctuation() {
        let output = extractor().extract(r#"{"gateway-id": "gw-1"}"#).unwrap();
        assert_eq!(output.get("GatewayID"), Some("gw-1"));
        assert_eq!(output.get("gateway_id"), Some("gw-1"));
    }
}
