//! Batch containers: normalized image batches in, binary spike tensors out.

use crate::error::{CoreError, CoreResult};

/// Integer class label, index-aligned with the samples of an [`ImageBatch`].
pub type Label = u32;

/// A single spike of one input neuron (feature) at one timestep.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpikeEvent {
    pub neuron_id: u32,
    pub time: u64,
}

/// B samples of F flattened pixel intensities, row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageBatch {
    samples: usize,
    features: usize,
    pixels: Vec<f32>,
}

impl ImageBatch {
    pub fn new(samples: usize, features: usize, pixels: Vec<f32>) -> CoreResult<Self> {
        if samples == 0 || features == 0 {
            return Err(CoreError::invalid_shape(format!(
                "image batch must be non-empty, got {} samples x {} features",
                samples, features
            )));
        }
        if pixels.len() != samples * features {
            return Err(CoreError::invalid_shape(format!(
                "image batch of {} x {} needs {} pixels, got {}",
                samples,
                features,
                samples * features,
                pixels.len()
            )));
        }
        if let Some(idx) = pixels.iter().position(|p| !p.is_finite()) {
            return Err(CoreError::invalid_shape(format!(
                "pixel {} of sample {} is not finite",
                idx % features,
                idx / features
            )));
        }
        Ok(Self { samples, features, pixels })
    }

    /// Build from one vector per sample; all rows must have the same length.
    pub fn from_rows(rows: &[Vec<f32>]) -> CoreResult<Self> {
        let features = rows.first().map(|r| r.len()).unwrap_or(0);
        if let Some((idx, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != features) {
            return Err(CoreError::invalid_shape(format!(
                "sample {} has {} features, expected {}",
                idx,
                row.len(),
                features
            )));
        }
        let pixels = rows.iter().flat_map(|r| r.iter().copied()).collect();
        Self::new(rows.len(), features, pixels)
    }

    pub fn samples(&self) -> usize {
        self.samples
    }

    pub fn features(&self) -> usize {
        self.features
    }

    pub fn sample(&self, b: usize) -> &[f32] {
        &self.pixels[b * self.features..(b + 1) * self.features]
    }
}

/// Binary spike tensor indexed (timestep, sample, feature).
///
/// Cells are stored time-major, so one timestep's B x F slice is contiguous.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpikeTensor {
    steps: usize,
    samples: usize,
    features: usize,
    cells: Vec<u8>,
}

impl SpikeTensor {
    /// Wrap raw time-major cells. Every cell must be 0 or 1.
    pub fn from_cells(steps: usize, samples: usize, features: usize, cells: Vec<u8>) -> CoreResult<Self> {
        if steps == 0 || samples == 0 || features == 0 {
            return Err(CoreError::invalid_shape(format!(
                "spike tensor must be non-empty, got ({}, {}, {})",
                steps, samples, features
            )));
        }
        let expected = steps
            .checked_mul(samples)
            .and_then(|n| n.checked_mul(features))
            .ok_or_else(|| {
                CoreError::invalid_shape(format!("spike tensor ({}, {}, {}) overflows", steps, samples, features))
            })?;
        if cells.len() != expected {
            return Err(CoreError::ShapeMismatch {
                what: "spike cells",
                expected,
                actual: cells.len(),
            });
        }
        if let Some(bad) = cells.iter().find(|&&c| c > 1) {
            return Err(CoreError::invalid_shape(format!("spike cell value {} is not 0 or 1", bad)));
        }
        Ok(Self { steps, samples, features, cells })
    }

    /// (T, B, F)
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.steps, self.samples, self.features)
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn samples(&self) -> usize {
        self.samples
    }

    pub fn features(&self) -> usize {
        self.features
    }

    #[inline]
    fn offset(&self, t: usize, b: usize, f: usize) -> usize {
        (t * self.samples + b) * self.features + f
    }

    #[inline]
    pub fn get(&self, t: usize, b: usize, f: usize) -> u8 {
        self.cells[self.offset(t, b, f)]
    }

    /// The F spike values of sample `b` at timestep `t`.
    pub fn row(&self, t: usize, b: usize) -> &[u8] {
        let start = self.offset(t, b, 0);
        &self.cells[start..start + self.features]
    }

    /// Number of timesteps on which feature `f` of sample `b` fired.
    pub fn spike_count(&self, b: usize, f: usize) -> usize {
        (0..self.steps).filter(|&t| self.get(t, b, f) == 1).count()
    }

    pub fn total_spikes(&self) -> usize {
        self.cells.iter().map(|&c| c as usize).sum()
    }

    /// Spikes of sample `b` at timestep `t`, one event per firing feature.
    pub fn events_at(&self, t: usize, b: usize) -> Vec<SpikeEvent> {
        self.row(t, b)
            .iter()
            .enumerate()
            .filter(|&(_, &c)| c == 1)
            .map(|(f, _)| SpikeEvent { neuron_id: f as u32, time: t as u64 })
            .collect()
    }
}
