use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::models::{Toolchain, TrainingJob};
use crate::runner::{self, CommandOutcome, CommandSpec, ConsoleSink, FileSink, OutputSink};

/// What a failed step does to the rest of the run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Record the failure and keep going. Later steps may then run against
    /// stale or missing artifacts and fail in turn; every outcome still gets
    /// its own record.
    #[default]
    Lenient,
    /// Halt at the first failed step that is marked fatal.
    Strict,
}

/// How one step ended.
///
/// `Failed` captures an expected kind of failure (an external program exiting
/// non-zero, unusable input files) that the failure policy gets to decide on.
/// Infrastructure trouble is not a status, it is an `Err` from the step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    Completed,
    Failed {
        exit_code: Option<i32>,
        detail: String,
    },
}

impl StepStatus {
    /// Status for a finished external command.
    pub fn from_outcome(outcome: CommandOutcome) -> Self {
        if outcome.success() {
            StepStatus::Completed
        } else {
            StepStatus::Failed {
                exit_code: outcome.exit_code(),
                detail: String::new(),
            }
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, StepStatus::Failed { .. })
    }

    /// `ok`, or `failed (exit code N): detail`.
    pub fn describe(&self) -> String {
        match self {
            StepStatus::Completed => String::from("ok"),
            StepStatus::Failed { exit_code, detail } => {
                let mut out = String::from("failed");
                if let Some(code) = exit_code {
                    out.push_str(&format!(" (exit code {code})"));
                }
                if !detail.is_empty() {
                    out.push_str(&format!(": {detail}"));
                }
                out
            }
        }
    }
}

/// Record of one executed step, written to the job log and returned in the
/// run report.
#[derive(Debug, Clone)]
pub struct StepRecord {
    /// 1-based position in the run.
    pub index: usize,
    pub total: usize,
    pub name: String,
    pub status: StepStatus,
    pub fatal: bool,
    pub log_path: PathBuf,
}

impl StepRecord {
    /// `step 3/8 generate box files: ok`, without the timestamp prefix.
    pub fn summary(&self) -> String {
        format!(
            "step {}/{} {}: {}",
            self.index,
            self.total,
            self.name,
            self.status.describe()
        )
    }
}

/// One named unit of work in a training run.
pub trait TrainStep {
    /// Display name used in step records.
    fn name(&self) -> &str;

    /// Whether a failure here poisons everything after it. Only consulted
    /// under [`FailurePolicy::Strict`].
    fn fatal(&self) -> bool {
        true
    }

    /// Do the work. `Ok(StepStatus::Failed { .. })` reports a recordable
    /// failure for the policy to decide on; `Err` always aborts the run.
    fn run(&self, job: &TrainingJob, ctx: &mut RunContext) -> anyhow::Result<StepStatus>;
}

/// Facilities shared by every step: the output fan-out (console plus job
/// log) and the toolchain external programs resolve against.
pub struct RunContext {
    console: ConsoleSink,
    log: FileSink,
    pub toolchain: Toolchain,
}

impl RunContext {
    /// Open the job log for appending, creating its directory if needed, and
    /// attach the console.
    pub fn open(log_path: impl Into<PathBuf>, toolchain: Toolchain) -> anyhow::Result<Self> {
        Ok(Self {
            console: ConsoleSink,
            log: FileSink::append(log_path)?,
            toolchain,
        })
    }

    pub fn log_path(&self) -> &Path {
        self.log.path()
    }

    /// Run one external command with its output streamed live to console and
    /// job log. The rendered command line goes into the log first, so the
    /// log reads as a transcript of each invocation and its output.
    pub fn run_command(&mut self, spec: &CommandSpec) -> anyhow::Result<CommandOutcome> {
        self.log.write_line(&format!("$ {}", spec.display()))?;
        let mut sinks: [&mut dyn OutputSink; 2] = [&mut self.console, &mut self.log];
        runner::run_streamed(spec, &mut sinks)
    }

    /// Append one line to both the console and the job log.
    pub fn emit(&mut self, line: &str) -> anyhow::Result<()> {
        self.console.write_line(line)?;
        self.log.write_line(line)
    }

    /// Append one line to the job log only.
    pub fn log_line(&mut self, line: &str) -> anyhow::Result<()> {
        self.log.write_line(line)
    }
}

/// Everything a finished (or halted) run produced.
#[derive(Debug)]
pub struct PipelineReport {
    pub records: Vec<StepRecord>,
    pub log_path: PathBuf,
    /// True when a strict-policy run stopped early at a fatal failure.
    pub halted: bool,
}

impl PipelineReport {
    pub fn failed_steps(&self) -> impl Iterator<Item = &StepRecord> {
        self.records.iter().filter(|r| r.status.is_failure())
    }

    /// Every step ran and none failed.
    pub fn success(&self) -> bool {
        !self.halted && self.failed_steps().count() == 0
    }
}

/// Runs steps strictly in the order they were added. The only state passed
/// between steps is the filesystem; nothing is re-ordered or retried.
pub struct Pipeline {
    steps: Vec<Box<dyn TrainStep>>,
    policy: FailurePolicy,
}

impl Pipeline {
    pub fn new(policy: FailurePolicy) -> Self {
        Self {
            steps: Vec::new(),
            policy,
        }
    }

    pub fn add_step(mut self, step: Box<dyn TrainStep>) -> Self {
        self.steps.push(step);
        self
    }

    /// Execute every step in order, appending a timestamped record per step
    /// to the job log as it completes.
    pub fn run(&self, job: &TrainingJob, ctx: &mut RunContext) -> anyhow::Result<PipelineReport> {
        let total = self.steps.len();
        let mut records = Vec::with_capacity(total);
        let mut halted = false;

        for (idx, step) in self.steps.iter().enumerate() {
            let index = idx + 1;
            tracing::info!("step {index}/{total}: {}", step.name());

            let status = step.run(job, ctx)?;
            let record = StepRecord {
                index,
                total,
                name: step.name().to_string(),
                status,
                fatal: step.fatal(),
                log_path: ctx.log_path().to_path_buf(),
            };

            let timestamp = OffsetDateTime::now_utc()
                .format(&Rfc3339)
                .context("Failed to format step timestamp")?;
            ctx.emit(&format!("[{timestamp}] {}", record.summary()))?;

            let failed = record.status.is_failure();
            if failed {
                tracing::error!("{}", record.summary());
            }
            let halt = failed && record.fatal && self.policy == FailurePolicy::Strict;
            records.push(record);
            if halt {
                tracing::error!("halting after fatal step failure");
                halted = true;
                break;
            }
        }

        Ok(PipelineReport {
            records,
            log_path: ctx.log_path().to_path_buf(),
            halted,
        })
    }
}
