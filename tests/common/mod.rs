#![allow(dead_code)]
#![allow(unused_imports)]

mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from tesslab for tests
pub use tesslab::store::{DirPairStore, PairRepository};
pub use tesslab::{
    FailurePolicy, PairCursor, Toolchain, TrainingJob, TrainingOptions, TrainingPipeline,
};
