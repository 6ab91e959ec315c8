use crate::config_store::ParamKey;
use crate::context::Context;
use crate::verify::{run_verification, TestStatus};
use anyhow::Result;

/// Handles the 'verify' command - runs the verification suite against the stored gateway
pub struct VerifyCommand;

impl VerifyCommand {
    pub fn execute(ctx: &Context, region: &str) -> Result<()> {
        ctx.output.section("Verify Gateway");

        let region = ctx
            .store
            .get_optional(ParamKey::AwsRegion)?
            .unwrap_or_else(|| region.to_string());
        ctx.output.key_value("Region", &region);

        let report = run_verification(&*ctx.verifier, &ctx.store, &region)?;

        for test in &report.tests {
            ctx.output.status_check(
                &test.name,
                test.status != TestStatus::Failed,
                test.message.as_deref().unwrap_or(""),
            );
        }

        ctx.output.blank();
        ctx.output.success(&format!(
            "{} passed, {} skipped in {}ms",
            report.count(TestStatus::Passed),
            report.count(TestStatus::Skipped),
            report.duration_ms
        ));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DeployError;
    use crate::test_helpers::TestHarness;

    #[test]
    fn test_verify_uses_stored_gateway() {
        let harness = TestHarness::seeded();
        harness.seed("gateway-id", "gw-777");
        let ctx = harness.context();

        VerifyCommand::execute(&ctx, "eu-west-1").unwrap();

        assert_eq!(harness.verifier.runs(), vec!["gw-777".to_string()]);
        assert!(harness.output.to_text().contains("Region: us-east-1"));
    }

    #[test]
    fn test_verify_without_gateway_id_fails() {
        let harness = TestHarness::seeded();
        let ctx = harness.context();

        let err = VerifyCommand::execute(&ctx, "us-east-1").unwrap_err();

        assert_eq!(
            err.downcast_ref::<DeployError>().map(DeployError::kind),
            Some("MissingConfigParameter")
        );
        assert!(harness.verifier.runs().is_empty());
    }
}
