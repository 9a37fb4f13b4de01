pub mod classifier;
pub mod orchestrator;
pub mod pipeline;
pub mod scheduler;

pub use classifier::{ClassifierConfig, FractionalClassifier};
pub use orchestrator::{partition, RunOutcome};
pub use pipeline::{Pipeline, RunSummary};
pub use scheduler::RunScheduler;

#[cfg(test)]
mod classifier_tests;
