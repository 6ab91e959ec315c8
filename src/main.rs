mod aws;
mod commands;
mod config_store;
mod context;
mod credentials;
mod error;
mod output;
mod pipeline;
mod provision;
mod settings;
mod test_helpers;
mod traits;
mod verify;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use commands::{DeployCommand, ParamsCommand, ProviderCommand, VerifyCommand};
use context::Context;
use credentials::{ProviderKind, Secret};
use pipeline::{CredentialInputs, RunContext, RunMode};
use settings::{DeploySettings, DEFAULT_CONFIG_FILE};
use std::path::PathBuf;
use std::process::ExitCode;
use traits::RealFileSystem;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "gateway-deploy")]
#[command(about = "Deploy the Confluence AgentCore gateway: credential provider, CDK stack and verification", long_about = None)]
#[command(version)]
struct Cli {
    /// Deploy configuration file (a DeployConfig resource); defaults apply when it does not exist
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Region whose config store is read first; a stored aws-region there selects the region for the run
    #[arg(long, global = true, env = "AWS_REGION", default_value = "us-east-1")]
    region: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full deployment pipeline
    Deploy {
        /// Run the verification suite after deploying
        #[arg(long)]
        run_tests: bool,

        /// Stop after templates are synthesized and validated
        #[arg(long)]
        dry_run: bool,

        #[command(flatten)]
        credentials: CredentialArgs,
    },

    /// Create or update a credential provider and store its ARN
    Provider {
        /// Provider variant to reconcile
        #[arg(long, value_enum, default_value_t = ProviderKindArg::ApiKey)]
        kind: ProviderKindArg,

        #[command(flatten)]
        credentials: CredentialArgs,
    },

    /// Show which config store parameters are set (values are never printed)
    Params {
        /// Only list paths under this prefix (absolute, or relative to the namespace)
        #[arg(long)]
        prefix: Option<String>,
    },

    /// Run the verification suite against the deployed gateway
    Verify,
}

/// Secret material; read from the environment so it stays out of shell history
#[derive(Args)]
struct CredentialArgs {
    /// base64('your_email@example.com:your_api_token')
    #[arg(long, env = "CONFLUENCE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[arg(long, env = "OAUTH_CLIENT_ID", hide_env_values = true)]
    oauth_client_id: Option<String>,

    #[arg(long, env = "OAUTH_CLIENT_SECRET", hide_env_values = true)]
    oauth_client_secret: Option<String>,
}

impl CredentialArgs {
    fn into_inputs(self) -> CredentialInputs {
        let present = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

        CredentialInputs {
            api_key: present(self.api_key).map(Secret::new),
            oauth_client_id: present(self.oauth_client_id),
            oauth_client_secret: present(self.oauth_client_secret).map(Secret::new),
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ProviderKindArg {
    ApiKey,
    Oauth,
}

impl From<ProviderKindArg> for ProviderKind {
    fn from(kind: ProviderKindArg) -> Self {
        match kind {
            ProviderKindArg::ApiKey => ProviderKind::ApiKey,
            ProviderKindArg::Oauth => ProviderKind::OAuth,
        }
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .init();
}

fn run_context(settings: &DeploySettings, region: &str, mode: RunMode, inputs: CredentialInputs) -> RunContext {
    RunContext {
        run_id: Uuid::new_v4(),
        mode,
        region: region.to_string(),
        stack_name: settings.stack_name(),
        environment: settings.environment.clone(),
        api_key_provider_name: settings.api_key_provider_name.clone(),
        oauth_provider_name: settings.oauth_provider_name.clone(),
        inputs,
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let settings = DeploySettings::load(&RealFileSystem, &cli.config)?;
    let ctx = Context::new(&settings, &cli.region)?;

    match cli.command {
        Commands::Deploy {
            run_tests,
            dry_run,
            credentials,
        } => {
            let mode = RunMode { dry_run, run_tests };
            let run = run_context(&settings, &ctx.region, mode, credentials.into_inputs());
            let pipeline = DeployCommand::execute(&ctx, &run);
            return Ok(ExitCode::from(pipeline.exit_code() as u8));
        }
        Commands::Provider { kind, credentials } => {
            let run = run_context(&settings, &ctx.region, RunMode::default(), credentials.into_inputs());
            ProviderCommand::execute(&ctx, &run, kind.into())?;
        }
        Commands::Params { prefix } => {
            ParamsCommand::execute(&ctx, prefix.as_deref())?;
        }
        Commands::Verify => {
            VerifyCommand::execute(&ctx, &ctx.region)?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            output::error(&format!("{:#}", err));
            ExitCode::FAILURE
        }
    }
}
