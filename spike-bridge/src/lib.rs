//! spike-bridge: file-based exchange between an image dataset and an external SNN simulator
//!
//! Per batch, the [`Pipeline`]:
//! - rate-encodes the images into a T x B x F spike tensor (spike-core)
//! - writes the spike and targets artifacts ([`codec`])
//! - runs the simulator once and waits for it ([`invoker`])
//! - reads the result artifact and scores it against the labels
//!
//! Everything runs sequentially on the calling thread; artifacts live at fixed
//! paths in the working directory, so one pipeline instance per directory.

pub mod error;
pub mod config;
pub mod codec;
pub mod invoker;
pub mod dataset;
pub mod pipeline;
pub mod logging;

// Re-exports
pub use error::{BridgeError, BridgeResult, ConfigError, DatasetError};
pub use config::{ArtifactPaths, BridgeConfig, EncoderConfig, ScoringConfig, SimulatorConfig, SliceAxis};
pub use invoker::SimulationInvoker;
pub use dataset::{BatchLoader, IdxDataset, ImageDataset, ImageSample, InMemoryDataset};
pub use pipeline::{Pipeline, RunSummary};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
