use crate::aws::{AgentCoreControlPlane, AwsCli, IdentityVerifier, SsmParameterBackend, StsIdentityVerifier};
use crate::config_store::{ConfigStore, ParamKey};
use crate::credentials::CredentialControlPlane;
use crate::provision::{CdkProvisioner, Provisioner};
use crate::settings::DeploySettings;
use crate::traits::{CommandExecutor, FileSystem, Output, RealCommandExecutor, RealFileSystem, TerminalOutput};
use crate::verify::{CommandVerifier, Verifier};
use anyhow::Result;
use std::sync::Arc;

/// Application context that holds all dependencies for dependency injection
pub struct Context {
    pub output: Arc<dyn Output>,
    /// Region every AWS call and CDK command runs against
    pub region: String,
    pub identity: Arc<dyn IdentityVerifier>,
    pub store: ConfigStore,
    pub control_plane: Arc<dyn CredentialControlPlane>,
    pub provisioner: Arc<dyn Provisioner>,
    pub verifier: Arc<dyn Verifier>,
}

impl Context {
    /// Create a new context with real implementations (for production use)
    pub fn new(settings: &DeploySettings, region: &str) -> Result<Self> {
        Self::with_adapters(
            settings,
            region,
            Arc::new(RealCommandExecutor::new()),
            Arc::new(RealFileSystem),
        )
    }

    /// Wire the AWS and CDK adapters over `command`
    ///
    /// The `aws-region` entry of the config store in `region` picks the region
    /// the rest of the run works in, so the provider, its stored ARN and the
    /// stack all land where the CDK app reads its parameters.
    fn with_adapters(
        settings: &DeploySettings,
        region: &str,
        command: Arc<dyn CommandExecutor>,
        fs: Arc<dyn FileSystem>,
    ) -> Result<Self> {
        let region = Self::resolve_region(settings, region, command.clone())?;
        let cli = Arc::new(AwsCli::new(command.clone(), &region));

        let store = ConfigStore::new(Arc::new(SsmParameterBackend::new(cli.clone())), &settings.namespace)?;

        let provisioner = CdkProvisioner::new(command.clone(), fs)
            .with_app(&settings.cdk_app)
            .with_working_dir(settings.working_dir.clone())
            .with_outputs_file(settings.outputs_file.clone());

        let verifier = CommandVerifier::new(command, &settings.test_command, settings.working_dir.clone());

        Ok(Self {
            output: Arc::new(TerminalOutput),
            region: cli.region().to_string(),
            identity: Arc::new(StsIdentityVerifier::new(cli.clone())),
            store,
            control_plane: Arc::new(AgentCoreControlPlane::new(cli)),
            provisioner: Arc::new(provisioner),
            verifier: Arc::new(verifier),
        })
    }

    /// Stored `aws-region`, read from the store in `fallback`; unreadable or unset keeps `fallback`
    fn resolve_region(
        settings: &DeploySettings,
        fallback: &str,
        command: Arc<dyn CommandExecutor>,
    ) -> Result<String> {
        let cli = Arc::new(AwsCli::new(command, fallback));
        let store = ConfigStore::new(Arc::new(SsmParameterBackend::new(cli)), &settings.namespace)?;

        match store.get_optional(ParamKey::AwsRegion) {
            Ok(Some(region)) if !region.trim().is_empty() => {
                let region = region.trim().to_string();
                if region != fallback {
                    tracing::info!(from = fallback, to = %region, "using the region recorded in the config store");
                }
                Ok(region)
            }
            Ok(_) => Ok(fallback.to_string()),
            Err(err) => {
                tracing::warn!(region = fallback, error = %err, "could not read the stored region");
                Ok(fallback.to_string())
            }
        }
    }

    /// Create a test context with specific fake implementations
    #[cfg(test)]
    pub fn test_with(
        output: Arc<dyn Output>,
        region: &str,
        identity: Arc<dyn IdentityVerifier>,
        store: ConfigStore,
        control_plane: Arc<dyn CredentialControlPlane>,
        provisioner: Arc<dyn Provisioner>,
        verifier: Arc<dyn Verifier>,
    ) -> Self {
        Self {
            output,
            region: region.to_string(),
            identity,
            store,
            control_plane,
            provisioner,
            verifier,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::Secret;
    use crate::pipeline::{CredentialInputs, PipelineOrchestrator, RunContext, RunMode};
    use crate::traits::{MockCommandExecutor, MockCommandResult, MockFileSystem, MockOutput};
    use base64::{engine::general_purpose::STANDARD, Engine};
    use uuid::Uuid;

    const REGION_PARAM: &str = "aws ssm get-parameter --name /confluence/gateway/aws-region";

    fn stored(value: &str) -> String {
        format!(r#"{{"Parameter": {{"Name": "p", "Type": "String", "Value": "{}"}}}}"#, value)
    }

    fn context(executor: &Arc<MockCommandExecutor>, region: &str) -> Context {
        let mut ctx = Context::with_adapters(
            &DeploySettings::default(),
            region,
            executor.clone(),
            Arc::new(MockFileSystem::new()),
        )
        .unwrap();
        ctx.output = Arc::new(MockOutput::new());
        ctx
    }

    #[test]
    fn test_stored_region_wins_over_run_region() {
        let executor = Arc::new(MockCommandExecutor::with_outputs(vec![MockCommandResult::ok(
            REGION_PARAM,
            &stored("eu-west-1"),
        )]));

        let ctx = context(&executor, "us-east-1");

        assert_eq!(ctx.region, "eu-west-1");
        let lookup = &executor.invocations()[0];
        assert!(lookup.command_line().ends_with("--region us-east-1 --output json"));
    }

    #[test]
    fn test_unreadable_region_keeps_run_region() {
        let executor = Arc::new(MockCommandExecutor::with_outputs(vec![MockCommandResult::failed(
            REGION_PARAM,
            255,
            "An error occurred (ParameterNotFound) when calling the GetParameter operation: ",
        )]));

        let ctx = context(&executor, "us-west-2");

        assert_eq!(ctx.region, "us-west-2");
    }

    #[test]
    fn test_run_with_stored_region_keeps_every_call_in_that_region() {
        let executor = Arc::new(MockCommandExecutor::with_outputs(vec![
            MockCommandResult::ok(REGION_PARAM, &stored("eu-west-1")),
            MockCommandResult::ok(
                "aws sts get-caller-identity",
                r#"{"UserId": "AIDA", "Account": "123456789012", "Arn": "arn:aws:iam::123456789012:user/ci"}"#,
            ),
            MockCommandResult::ok(
                "aws bedrock-agentcore-control list-api-key-credential-providers",
                r#"{"credentialProviders": []}"#,
            ),
            MockCommandResult::ok(
                "aws bedrock-agentcore-control create-api-key-credential-provider",
                r#"{"credentialProviderArn": "arn:aws:bedrock-agentcore:eu-west-1:123456789012:token-vault/default/apikeycredentialprovider/confluence-apikey-provider"}"#,
            ),
            MockCommandResult::ok(
                "aws ssm get-parameter --name /confluence/gateway/aws-account-id",
                &stored("123456789012"),
            ),
            MockCommandResult::ok(REGION_PARAM, &stored("eu-west-1")),
        ]));
        let ctx = context(&executor, "us-east-1");
        let run = RunContext {
            run_id: Uuid::new_v4(),
            mode: RunMode {
                dry_run: true,
                run_tests: false,
            },
            region: ctx.region.clone(),
            stack_name: "ConfluenceGatewayStack-Dev".to_string(),
            environment: "Dev".to_string(),
            api_key_provider_name: "confluence-apikey-provider".to_string(),
            oauth_provider_name: "confluence-oauth-provider".to_string(),
            inputs: CredentialInputs {
                api_key: Some(Secret::new(STANDARD.encode("me@example.com:tok"))),
                ..Default::default()
            },
        };

        let pipeline = PipelineOrchestrator::new(&ctx, &run).execute();

        assert!(pipeline.succeeded());
        let calls = executor.invocations();
        for call in calls.iter().skip(1).filter(|c| c.program == "aws") {
            assert!(
                call.command_line().contains("--region eu-west-1"),
                "{}",
                call.command_line()
            );
        }
        assert!(executor.was_invoked("aws bedrock-agentcore-control create-api-key-credential-provider"));
        assert!(executor.was_invoked("aws ssm put-parameter --name /confluence/gateway/credential-provider-arn"));
        for call in calls.iter().filter(|c| c.program == "cdk" && !c.args.contains(&"--version".to_string())) {
            assert_eq!(call.env_value("AWS_REGION"), Some("eu-west-1"));
        }
        assert!(executor.was_invoked("cdk bootstrap aws://123456789012/eu-west-1"));
    }
}
