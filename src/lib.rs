pub mod models;
pub mod pipeline;
pub mod runner;
pub mod store;
pub mod training;

pub use models::{Toolchain, TrainingJob, TrainingOptions};
pub use pipeline::{
    FailurePolicy, Pipeline, PipelineReport, RunContext, StepRecord, StepStatus, TrainStep,
};
pub use runner::{CommandOutcome, CommandSpec, ConsoleSink, FileSink, OutputSink};
pub use store::{DirPairStore, GroundTruthPair, PairCursor, PairRepository};
pub use training::TrainingPipeline;
