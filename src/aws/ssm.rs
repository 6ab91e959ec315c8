use super::AwsCli;
use crate::config_store::{ParamKind, ParameterBackend};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::sync::Arc;

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetParameterResponse {
    parameter: ParameterValue,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ParameterValue {
    value: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ParametersByPathResponse {
    #[serde(default)]
    parameters: Vec<ParameterName>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ParameterName {
    name: String,
}

/// SSM Parameter Store; secrets are `SecureString`, plain entries `String`
pub struct SsmParameterBackend {
    cli: Arc<AwsCli>,
}

impl SsmParameterBackend {
    pub fn new(cli: Arc<AwsCli>) -> Self {
        Self { cli }
    }

    fn parameter_type(kind: ParamKind) -> &'static str {
        match kind {
            ParamKind::Plain => "String",
            ParamKind::Secret => "SecureString",
        }
    }
}

impl ParameterBackend for SsmParameterBackend {
    fn get_parameter(&self, path: &str) -> Result<Option<String>> {
        let response = match self
            .cli
            .call("ssm", "get-parameter", &["--name", path, "--with-decryption"])
        {
            Ok(response) => response,
            Err(err) if err.is("ParameterNotFound") => return Ok(None),
            Err(err) => return Err(err).context("aws ssm get-parameter failed"),
        };

        let response: GetParameterResponse =
            serde_json::from_value(response).context("unexpected get-parameter response")?;
        Ok(Some(response.parameter.value))
    }

    fn put_parameter(
        &self,
        path: &str,
        value: &str,
        kind: ParamKind,
        description: Option<&str>,
    ) -> Result<()> {
        let mut args = vec![
            "--name",
            path,
            "--value",
            value,
            "--type",
            Self::parameter_type(kind),
            "--overwrite",
        ];

        if let Some(description) = description {
            args.extend_from_slice(&["--description", description]);
        }

        self.cli
            .call("ssm", "put-parameter", &args)
            .context("aws ssm put-parameter failed")?;
        Ok(())
    }

    fn list_parameters(&self, prefix: &str) -> Result<BTreeSet<String>> {
        let response = self
            .cli
            .call(
                "ssm",
                "get-parameters-by-path",
                &["--path", prefix, "--recursive"],
            )
            .context("aws ssm get-parameters-by-path failed")?;

        let response: ParametersByPathResponse = serde_json::from_value(response)
            .context("unexpected get-parameters-by-path response")?;

        Ok(response.parameters.into_iter().map(|p| p.name).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{MockCommandExecutor, MockCommandResult};

    fn backend(outputs: Vec<MockCommandResult>) -> (Arc<MockCommandExecutor>, SsmParameterBackend) {
        let executor = Arc::new(MockCommandExecutor::with_outputs(outputs));
        let cli = Arc::new(AwsCli::new(executor.clone(), "us-east-1"));
        (executor, SsmParameterBackend::new(cli))
    }

    #[test]
    fn test_get_parameter_reads_value() {
        let (executor, ssm) = backend(vec![MockCommandResult::ok(
            "aws ssm get-parameter --name /confluence/gateway/aws-region",
            r#"{"Parameter": {"Name": "/confluence/gateway/aws-region", "Type": "String", "Value": "eu-west-1", "Version": 3}}"#,
        )]);

        let value = ssm.get_parameter("/confluence/gateway/aws-region").unwrap();

        assert_eq!(value.as_deref(), Some("eu-west-1"));
        assert!(executor.invocations()[0]
            .args
            .contains(&"--with-decryption".to_string()));
    }

    #[test]
    fn test_get_parameter_not_found_is_none() {
        let (_, ssm) = backend(vec![MockCommandResult::failed(
            "aws ssm get-parameter",
            254,
            "An error occurred (ParameterNotFound) when calling the GetParameter operation: ",
        )]);

        assert_eq!(ssm.get_parameter("/confluence/gateway/gateway-id").unwrap(), None);
    }

    #[test]
    fn test_get_parameter_access_denied_is_error() {
        let (_, ssm) = backend(vec![MockCommandResult::failed(
            "aws ssm get-parameter",
            254,
            "An error occurred (AccessDeniedException) when calling the GetParameter operation: not authorized",
        )]);

        let err = ssm.get_parameter("/confluence/gateway/gateway-id").unwrap_err();
        assert!(format!("{:#}", err).contains("AccessDeniedException"));
    }

    #[test]
    fn test_put_secret_uses_secure_string() {
        let (executor, ssm) = backend(vec![]);

        ssm.put_parameter(
            "/confluence/gateway/confluence-api-token",
            "tok",
            ParamKind::Secret,
            Some("Atlassian API token"),
        )
        .unwrap();

        let line = executor.invocations()[0].command_line();
        assert!(line.starts_with("aws ssm put-parameter --name /confluence/gateway/confluence-api-token"));
        assert!(line.contains("--type SecureString --overwrite"));
    }

    #[test]
    fn test_put_plain_uses_string() {
        let (executor, ssm) = backend(vec![]);

        ssm.put_parameter("/confluence/gateway/gateway-id", "gw-1", ParamKind::Plain, None)
            .unwrap();

        let line = executor.invocations()[0].command_line();
        assert!(line.contains("--type String --overwrite"));
        assert!(!line.contains("--description"));
    }

    #[test]
    fn test_list_parameters_collects_names() {
        let (_, ssm) = backend(vec![MockCommandResult::ok(
            "aws ssm get-parameters-by-path --path /confluence/gateway",
            r#"{"Parameters": [{"Name": "/confluence/gateway/gateway-id"}, {"Name": "/confluence/gateway/aws-region"}]}"#,
        )]);

        let names = ssm.list_parameters("/confluence/gateway").unwrap();
        assert_eq!(names.len(), 2);
        assert!(names.contains("/confluence/gateway/gateway-id"));
    }
}
