use crate::context::Context;
use crate::credentials::{CredentialProviderReconciler, ProviderKind, SecretMaterial};
use crate::pipeline::RunContext;
use anyhow::Result;

/// Handles the 'provider' command - one-time credential provider setup
pub struct ProviderCommand;

impl ProviderCommand {
    pub fn execute(ctx: &Context, run: &RunContext, kind: ProviderKind) -> Result<()> {
        ctx.output.section("Credential Provider");

        let (name, material) = Self::material(run, kind)?;
        ctx.output.key_value("Provider", name);
        ctx.output.key_value("Kind", &kind.to_string());
        if let SecretMaterial::ApiKey { email, .. } = &material {
            ctx.output.key_value("Account email", email);
        }

        let result = CredentialProviderReconciler::new(&*ctx.control_plane, &ctx.store)
            .reconcile(name, &material)?;

        ctx.output.success(&format!("Provider '{}' {}", result.name, result.action));
        ctx.output.key_value("ARN", &result.provider_ref);
        ctx.output.dimmed(&format!(
            "Stored in {}; the stack reads it on the next deploy",
            ctx.store.path_for(kind.param_key())
        ));

        if kind == ProviderKind::OAuth {
            ctx.output
                .info("Next: complete the OAuth authorization in the AgentCore console");
        }

        Ok(())
    }

    fn material(run: &RunContext, kind: ProviderKind) -> Result<(&str, SecretMaterial)> {
        let inputs = &run.inputs;

        match kind {
            ProviderKind::ApiKey => {
                let Some(api_key) = &inputs.api_key else {
                    anyhow::bail!(
                        "CONFLUENCE_API_KEY is not set; export base64('your_email@example.com:your_api_token')"
                    );
                };
                Ok((
                    run.api_key_provider_name.as_str(),
                    SecretMaterial::api_key_from_encoded(api_key.expose())?,
                ))
            }
            ProviderKind::OAuth => {
                let missing: Vec<&str> = [
                    ("OAUTH_CLIENT_ID", inputs.oauth_client_id.is_none()),
                    ("OAUTH_CLIENT_SECRET", inputs.oauth_client_secret.is_none()),
                ]
                .into_iter()
                .filter_map(|(name, missing)| missing.then_some(name))
                .collect();

                match (&inputs.oauth_client_id, &inputs.oauth_client_secret) {
                    (Some(client_id), Some(client_secret)) => Ok((
                        run.oauth_provider_name.as_str(),
                        SecretMaterial::oauth(client_id, client_secret.expose())?,
                    )),
                    _ => anyhow::bail!("Missing environment variables: {}", missing.join(", ")),
                }
            }
        }
    }
}
