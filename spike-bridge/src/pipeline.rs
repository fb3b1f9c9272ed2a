//! Sequences encode -> write -> invoke -> read -> score, one batch at a time.

use std::fs;
use std::io;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use spike_core::{score, AccuracyScore, ImageBatch, Label, RateEncoder};
use tracing::{debug, info, warn};

use crate::codec;
use crate::config::BridgeConfig;
use crate::dataset::BatchLoader;
use crate::error::{BridgeError, BridgeResult};
use crate::invoker::SimulationInvoker;

/// Outcome of a multi-batch run.
#[derive(Clone, Debug, PartialEq)]
pub struct RunSummary {
    pub batches: Vec<AccuracyScore>,
}

impl RunSummary {
    /// Unweighted mean of the per-batch accuracies (batches share one size).
    pub fn mean_accuracy(&self) -> Option<f64> {
        if self.batches.is_empty() {
            return None;
        }
        Some(self.batches.iter().map(|a| a.value()).sum::<f64>() / self.batches.len() as f64)
    }
}

pub struct Pipeline {
    config: BridgeConfig,
    encoder: RateEncoder,
    invoker: SimulationInvoker,
    rng: ChaCha8Rng,
}

impl Pipeline {
    pub fn new(config: BridgeConfig) -> BridgeResult<Self> {
        config.validate()?;
        let encoder = RateEncoder::new(config.encoder.num_steps, config.encoder.gain)?;
        let invoker = SimulationInvoker::from_config(&config.simulator, &config.artifacts.work_dir);
        let rng = ChaCha8Rng::seed_from_u64(config.encoder.seed);
        Ok(Self { config, encoder, invoker, rng })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Encode `images` and write the spike and targets artifacts.
    pub fn write_artifacts(&mut self, images: &ImageBatch, labels: &[Label]) -> BridgeResult<()> {
        if images.samples() != self.config.batch_size {
            return Err(spike_core::CoreError::ShapeMismatch {
                what: "samples per batch",
                expected: self.config.batch_size,
                actual: images.samples(),
            }
            .into());
        }
        if labels.len() != images.samples() {
            return Err(spike_core::CoreError::ShapeMismatch {
                what: "labels",
                expected: images.samples(),
                actual: labels.len(),
            }
            .into());
        }

        let spikes = self.encoder.encode(images, &mut self.rng)?;
        debug!(shape = ?spikes.shape(), spikes = spikes.total_spikes(), "encoded batch");

        let paths = &self.config.artifacts;
        codec::save_spikes(&paths.input(), &spikes, self.config.encoder.slice_axis)?;
        codec::save_labels(&paths.targets(), labels)?;
        Ok(())
    }

    /// Run one batch end to end and return its accuracy.
    pub fn run_batch(&mut self, images: &ImageBatch, labels: &[Label]) -> BridgeResult<AccuracyScore> {
        self.write_artifacts(images, labels)?;

        let output = self.config.artifacts.output();
        match fs::remove_file(&output) {
            Ok(()) => debug!(path = %output.display(), "removed stale result artifact"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(BridgeError::io(&output, e)),
        }

        // any invoker error returns here, before the result artifact is touched
        self.invoker.run()?;

        let results = codec::load_result_matrix(&output)?;
        let accuracy = score(&results, labels, self.config.scoring.decode)?;
        Ok(accuracy)
    }

    /// Run every full batch from `loader`, up to `max_batches` when non-zero.
    /// The first failing batch aborts the run.
    pub fn run(&mut self, loader: &BatchLoader<'_>) -> BridgeResult<RunSummary> {
        let limit = match self.config.max_batches {
            0 => loader.num_batches(),
            n => n.min(loader.num_batches()),
        };
        if limit < loader.num_batches() {
            warn!(limit, available = loader.num_batches(), "running a subset of the batches");
        }

        let mut batches = Vec::with_capacity(limit);
        for (index, batch) in loader.iter().take(limit).enumerate() {
            let (images, labels) = batch?;
            let accuracy = self.run_batch(&images, &labels)?;
            info!(batch = index, %accuracy, "batch scored");
            batches.push(accuracy);
        }
        Ok(RunSummary { batches })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_in(dir: &std::path::Path, batch_size: usize) -> BridgeConfig {
        let mut config = BridgeConfig::default();
        config.batch_size = batch_size;
        config.encoder.num_steps = 3;
        config.artifacts.work_dir = dir.to_path_buf();
        config.simulator.executable = "/definitely/not/a/simulator".into();
        config
    }

    #[test]
    fn write_artifacts_produces_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut pipeline = Pipeline::new(config_in(dir.path(), 2)).unwrap();
        let images = ImageBatch::from_rows(&[vec![1.0, 0.0], vec![0.0, 1.0]]).unwrap();

        pipeline.write_artifacts(&images, &[4, 2]).unwrap();

        let spikes = fs::read_to_string(dir.path().join("inputSpikes.txt")).unwrap();
        let lines: Vec<&str> = spikes.lines().collect();
        assert_eq!(lines.len(), 1 + 3 * 2 + 3);
        assert_eq!(lines[0], "# Array shape: (3, 2, 2)");
        assert_eq!(lines[1], "1 0");
        assert_eq!(lines[2], "0 1");
        assert_eq!(codec::load_labels(&dir.path().join("targets.txt")).unwrap(), vec![4, 2]);
    }

    #[test]
    fn batch_size_and_label_count_are_checked() {
        let dir = tempfile::tempdir().unwrap();
        let mut pipeline = Pipeline::new(config_in(dir.path(), 3)).unwrap();
        let images = ImageBatch::from_rows(&[vec![1.0], vec![0.0]]).unwrap();
        assert!(matches!(pipeline.write_artifacts(&images, &[0, 1]), Err(BridgeError::Core(_))));

        let mut pipeline = Pipeline::new(config_in(dir.path(), 2)).unwrap();
        assert!(matches!(pipeline.write_artifacts(&images, &[0]), Err(BridgeError::Core(_))));
    }

    #[test]
    fn launch_failure_skips_result_read() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("output.txt");
        // a malformed stale artifact would surface as a format error if it were read
        fs::write(&output, "not,a,number\n").unwrap();

        let mut pipeline = Pipeline::new(config_in(dir.path(), 2)).unwrap();
        let images = ImageBatch::from_rows(&[vec![0.5], vec![0.5]]).unwrap();
        let err = pipeline.run_batch(&images, &[0, 1]).unwrap_err();
        assert!(matches!(err, BridgeError::Launch { .. }), "got {:?}", err);
        assert!(!output.exists());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = BridgeConfig::default();
        config.encoder.num_steps = 0;
        assert!(matches!(Pipeline::new(config), Err(BridgeError::Config(_))));
    }

    #[test]
    fn mean_accuracy_over_batches() {
        let summary = RunSummary {
            batches: vec![
                AccuracyScore { correct: 1, total: 2 },
                AccuracyScore { correct: 2, total: 2 },
            ],
        };
        assert_eq!(summary.mean_accuracy(), Some(0.75));
        assert_eq!(RunSummary { batches: vec![] }.mean_accuracy(), None);
    }
}
