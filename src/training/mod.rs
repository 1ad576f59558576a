pub mod boxfile;
pub mod commands;
pub mod steps;

use crate::models::{Toolchain, TrainingJob, TrainingOptions};
use crate::pipeline::{Pipeline, PipelineReport, RunContext};
use steps::{
    ConvertCheckpoint, EvaluateModel, ExtractBaseLstm, ExtractUnicharset, FineTune,
    GenerateBoxFiles, GenerateLstmfFiles, PrepareOutputDir,
};

/// Assembles and runs the eight training steps in contract order.
pub struct TrainingPipeline {
    job: TrainingJob,
    options: TrainingOptions,
    toolchain: Toolchain,
}

impl TrainingPipeline {
    pub fn new(job: TrainingJob, options: TrainingOptions) -> Self {
        Self {
            job,
            options,
            toolchain: Toolchain::default(),
        }
    }

    pub fn with_toolchain(mut self, toolchain: Toolchain) -> Self {
        self.toolchain = toolchain;
        self
    }

    /// Run the whole workflow. The step sequence is fixed; each step assumes
    /// the artifacts of the one before it.
    pub fn run(&self) -> anyhow::Result<PipelineReport> {
        let mut ctx = RunContext::open(self.job.log_path(), self.toolchain.clone())?;
        let report = Pipeline::new(self.options.failure_policy)
            .add_step(Box::new(ExtractBaseLstm))
            .add_step(Box::new(PrepareOutputDir))
            .add_step(Box::new(GenerateBoxFiles))
            .add_step(Box::new(GenerateLstmfFiles))
            .add_step(Box::new(ExtractUnicharset))
            .add_step(Box::new(FineTune {
                iterations: self.options.iterations,
                purge_output: self.options.purge_output,
            }))
            .add_step(Box::new(ConvertCheckpoint))
            .add_step(Box::new(EvaluateModel))
            .run(&self.job, &mut ctx)?;

        if report.success() {
            tracing::info!("training finished for model {}", self.job.model_name);
        } else {
            tracing::error!(
                "training finished with {} failed step(s) for model {}",
                report.failed_steps().count(),
                self.job.model_name
            );
        }
        Ok(report)
    }
}
