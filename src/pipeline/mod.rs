//! The deployment pipeline: a fixed sequence of externally-effectful stages.
//!
//! Stages run strictly in order. A `Failed` stage ends the run and makes the
//! process fail; a `Skipped` stage does not. Nothing is rolled back; every
//! stage is idempotent, so running the pipeline again resumes where it broke.

pub mod context;
pub mod orchestrator;

pub use context::{CredentialInputs, RunContext};
pub use orchestrator::PipelineOrchestrator;

use crate::error::DeployError;
use chrono::{DateTime, Utc};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    VerifyIdentity,
    EnsureCredentialProvider,
    Bootstrap,
    Synth,
    DryRunExit,
    Apply,
    ExtractOutputs,
    PersistOutputs,
    VerificationTests,
}

impl Stage {
    /// Human readable step title
    pub fn label(&self) -> &'static str {
        match self {
            Stage::VerifyIdentity => "Verify caller identity",
            Stage::EnsureCredentialProvider => "Ensure credential provider",
            Stage::Bootstrap => "Bootstrap target environment",
            Stage::Synth => "Synthesize and validate templates",
            Stage::DryRunExit => "Dry run stop",
            Stage::Apply => "Deploy stack",
            Stage::ExtractOutputs => "Extract stack outputs",
            Stage::PersistOutputs => "Persist gateway id",
            Stage::VerificationTests => "Run verification tests",
        }
    }

    /// Stages a run in `mode` walks through when nothing fails
    pub fn planned(mode: RunMode) -> Vec<Stage> {
        let mut stages = vec![
            Stage::VerifyIdentity,
            Stage::EnsureCredentialProvider,
            Stage::Bootstrap,
            Stage::Synth,
        ];

        if mode.dry_run {
            stages.push(Stage::DryRunExit);
            return stages;
        }

        stages.extend([Stage::Apply, Stage::ExtractOutputs, Stage::PersistOutputs]);
        if mode.run_tests {
            stages.push(Stage::VerificationTests);
        }
        stages
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::VerifyIdentity => "VerifyIdentity",
            Stage::EnsureCredentialProvider => "EnsureCredentialProvider",
            Stage::Bootstrap => "Bootstrap",
            Stage::Synth => "Synth",
            Stage::DryRunExit => "DryRunExit",
            Stage::Apply => "Apply",
            Stage::ExtractOutputs => "ExtractOutputs",
            Stage::PersistOutputs => "PersistOutputs",
            Stage::VerificationTests => "VerificationTests",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageResult {
    Success,
    Skipped(String),
    Failed(DeployError),
}

impl StageResult {
    pub fn is_failed(&self) -> bool {
        matches!(self, StageResult::Failed(_))
    }
}

impl fmt::Display for StageResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageResult::Success => write!(f, "success"),
            StageResult::Skipped(reason) => write!(f, "skipped: {}", reason),
            StageResult::Failed(err) => write!(f, "failed ({}): {}", err.kind(), err),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageRecord {
    pub stage: Stage,
    pub result: StageResult,
    pub started_at: DateTime<Utc>,
    pub duration_ms: i64,
}

/// Run flags; neither set means provision only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunMode {
    pub dry_run: bool,
    pub run_tests: bool,
}

/// Record of one pipeline run; lives until the process exits
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub run_id: Uuid,
    pub mode: RunMode,
    pub started_at: DateTime<Utc>,
    pub records: Vec<StageRecord>,
}

impl PipelineRun {
    pub fn new(run_id: Uuid, mode: RunMode) -> Self {
        Self {
            run_id,
            mode,
            started_at: Utc::now(),
            records: Vec::new(),
        }
    }

    pub fn record(&mut self, stage: Stage, result: StageResult, started_at: DateTime<Utc>) {
        let duration_ms = (Utc::now() - started_at).num_milliseconds();
        self.records.push(StageRecord {
            stage,
            result,
            started_at,
            duration_ms,
        });
    }

    pub fn result_of(&self, stage: Stage) -> Option<&StageResult> {
        self.records
            .iter()
            .find(|r| r.stage == stage)
            .map(|r| &r.result)
    }

    /// The stage that ended the run, if one failed
    pub fn failure(&self) -> Option<(Stage, &DeployError)> {
        self.records.iter().find_map(|r| match &r.result {
            StageResult::Failed(err) => Some((r.stage, err)),
            _ => None,
        })
    }

    pub fn succeeded(&self) -> bool {
        self.failure().is_none()
    }

    /// Process exit status for this run
    pub fn exit_code(&self) -> i32 {
        if self.succeeded() { 0 } else { 1 }
    }

    pub fn total_duration_ms(&self) -> i64 {
        self.records.iter().map(|r| r.duration_ms).sum()
    }
}
