use crate::context::Context;
use crate::pipeline::{PipelineOrchestrator, PipelineRun, RunContext, StageResult};

/// Handles the 'deploy' command - runs the full pipeline and prints the run summary
pub struct DeployCommand;

impl DeployCommand {
    pub fn execute(ctx: &Context, run: &RunContext) -> PipelineRun {
        ctx.output.environment_badge(&run.environment);
        ctx.output.section("Deploy Confluence Gateway");
        ctx.output.key_value("Stack", &run.stack_name);
        ctx.output.key_value("Region", &run.region);
        ctx.output.key_value("Namespace", ctx.store.namespace());
        ctx.output.key_value("Run", &run.run_id.to_string());
        ctx.output.key_value("Mode", Self::mode_label(run));
        ctx.output.blank();

        let pipeline = PipelineOrchestrator::new(ctx, run).execute();

        Self::print_summary(ctx, &pipeline);
        pipeline
    }

    fn mode_label(run: &RunContext) -> &'static str {
        match (run.mode.dry_run, run.mode.run_tests) {
            (true, _) => "dry run (stop after synth)",
            (false, true) => "deploy and verify",
            (false, false) => "deploy",
        }
    }

    fn print_summary(ctx: &Context, pipeline: &PipelineRun) {
        ctx.output.blank();
        ctx.output.section("Run Summary");

        for record in &pipeline.records {
            let detail = match &record.result {
                StageResult::Success => format!("{}ms", record.duration_ms),
                other => format!("{} ({}ms)", other, record.duration_ms),
            };
            ctx.output
                .status_check(record.stage.label(), !record.result.is_failed(), &detail);
        }

        ctx.output.blank();
        ctx.output.dimmed(&format!(
            "Started {} (run {}), {}ms in stages",
            pipeline.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
            pipeline.run_id,
            pipeline.total_duration_ms()
        ));

        match pipeline.failure() {
            Some((stage, err)) => ctx.output.error(&format!(
                "Deployment failed at {}: {}",
                stage.label(),
                err
            )),
            None if pipeline.mode.dry_run => ctx.output.success("Dry run completed successfully"),
            None => ctx.output.success("Deployment completed successfully"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{CredentialInputs, RunMode};
    use crate::test_helpers::TestHarness;
    use crate::traits::OutputMessage;

    #[test]
    fn test_summary_lists_every_recorded_stage() {
        let harness = TestHarness::seeded();
        harness.provisioner.set_outputs(r#"{"GatewayID": "gw-123"}"#);
        let ctx = harness.context();
        let run = harness.run_context(RunMode::default(), CredentialInputs::default());

        let pipeline = DeployCommand::execute(&ctx, &run);

        assert_eq!(pipeline.exit_code(), 0);
        let checks = harness
            .output
            .get_messages()
            .into_iter()
            .filter(|m| matches!(m, OutputMessage::StatusCheck(..)))
            .count();
        assert_eq!(checks, pipeline.records.len());
        assert!(harness
            .output
            .get_messages()
            .contains(&OutputMessage::Success("Deployment completed successfully".to_string())));
    }

    #[test]
    fn test_failed_run_reports_stage() {
        let harness = TestHarness::seeded();
        harness.identity.fail("Unable to locate credentials");
        let ctx = harness.context();
        let run = harness.run_context(RunMode::default(), CredentialInputs::default());

        let pipeline = DeployCommand::execute(&ctx, &run);

        assert_eq!(pipeline.exit_code(), 1);
        let errors = harness.output.get_errors();
        assert!(errors
            .iter()
            .any(|e| e.starts_with("Deployment failed at Verify caller identity")));
    }
}
