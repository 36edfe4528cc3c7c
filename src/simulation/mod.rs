//! Synthetic engine test telemetry
//! Location: src/simulation/mod.rs

pub mod types;
pub mod signal_model;
pub mod fault_model;
pub mod corpus;

pub use types::{Channel, Label, Run, CHANNEL_COUNT};
pub use signal_model::{NoiseLevels, SignalModel};
pub use fault_model::{apply_fault, FaultKind, FaultModel};
pub use corpus::{Corpus, CorpusRow, RunCorpusBuilder};
