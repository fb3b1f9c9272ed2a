//! spike-core: rate-coding spike encoder and result scoring for an out-of-process SNN simulator

pub mod error;
pub mod tensor;
pub mod encoder;
pub mod scorer;

// Re-exports
pub use error::{CoreError, CoreResult};
pub use tensor::{ImageBatch, Label, SpikeEvent, SpikeTensor};
pub use encoder::RateEncoder;
pub use scorer::{argmax, score, AccuracyScore, DecodeRule, ResultMatrix};
