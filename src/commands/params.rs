use crate::config_store::ParamKey;
use crate::context::Context;
use anyhow::Result;

/// Handles the 'params' command - reports which config store paths are set
///
/// Only paths are printed, never values.
pub struct ParamsCommand;

impl ParamsCommand {
    pub fn execute(ctx: &Context, prefix: Option<&str>) -> Result<()> {
        ctx.output.section("Config Store");
        ctx.output.key_value("Namespace", ctx.store.namespace());
        ctx.output.blank();

        let stored = ctx.store.list_by_prefix(prefix.unwrap_or(""))?;

        if prefix.is_none() {
            let mut missing = 0;
            for key in ParamKey::ALL {
                let path = ctx.store.path_for(key);
                let present = stored.contains(&path);
                if !present && key != ParamKey::TestPageId {
                    missing += 1;
                }
                ctx.output
                    .status_check(&path, present, &format!("written by {}", key.writer()));
            }

            ctx.output.blank();
            if missing > 0 {
                ctx.output
                    .warning(&format!("{} well-known parameter(s) are not set", missing));
            } else {
                ctx.output.success("All well-known parameters are set");
            }
        }

        let others: Vec<&String> = stored
            .iter()
            .filter(|path| !ParamKey::ALL.iter().any(|key| ctx.store.path_for(*key) == **path))
            .collect();

        if !others.is_empty() {
            ctx.output.blank();
            ctx.output.info("Other parameters:");
            for path in others {
                ctx.output.dimmed(&format!("  {}", path));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config_store::ParamKind;
    use crate::test_helpers::TestHarness;
    use crate::traits::OutputMessage;

    #[test]
    fn test_reports_present_and_missing_without_values() {
        let harness = TestHarness::seeded();
        harness.backend.seed(
            "/confluence/gateway/confluence-api-token",
            "super-secret-token",
            ParamKind::Secret,
        );
        let ctx = harness.context();

        ParamsCommand::execute(&ctx, None).unwrap();

        let messages = harness.output.get_messages();
        assert!(messages.contains(&OutputMessage::StatusCheck(
            "/confluence/gateway/aws-region".to_string(),
            true,
            "written by setup".to_string()
        )));
        assert!(messages.contains(&OutputMessage::StatusCheck(
            "/confluence/gateway/gateway-id".to_string(),
            false,
            "written by deploy (persist outputs)".to_string()
        )));
        assert!(!harness.output.to_text().contains("super-secret-token"));
        assert!(!harness.output.to_text().contains("acme"));
    }

    #[test]
    fn test_prefix_lists_only_matching_paths() {
        let harness = TestHarness::seeded();
        harness.seed("targets/confluence", "tgt-1");
        let ctx = harness.context();

        ParamsCommand::execute(&ctx, Some("targets")).unwrap();

        let messages = harness.output.get_messages();
        assert!(messages.contains(&OutputMessage::Dimmed(
            "  /confluence/gateway/targets/confluence".to_string()
        )));
        assert!(!messages
            .iter()
            .any(|m| matches!(m, OutputMessage::StatusCheck(..))));
    }
}
