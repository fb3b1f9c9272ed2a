//! Rate coding: each pixel fires on every timestep with probability
//! `clamp(intensity * gain, 0, 1)`, independently of all other trials.

use rand::Rng;

use crate::error::{CoreError, CoreResult};
use crate::tensor::{ImageBatch, SpikeTensor};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RateEncoder {
    num_steps: usize,
    gain: f32,
}

impl RateEncoder {
    pub fn new(num_steps: usize, gain: f32) -> CoreResult<Self> {
        if num_steps == 0 {
            return Err(CoreError::invalid_shape("num_steps must be at least 1"));
        }
        if !gain.is_finite() || gain < 0.0 {
            return Err(CoreError::invalid_parameter(format!(
                "gain must be finite and non-negative, got {}",
                gain
            )));
        }
        Ok(Self { num_steps, gain })
    }

    pub fn num_steps(&self) -> usize {
        self.num_steps
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    #[inline]
    pub fn firing_probability(&self, intensity: f32) -> f32 {
        (intensity * self.gain).clamp(0.0, 1.0)
    }

    /// Encode a B x F batch into a T x B x F spike tensor.
    ///
    /// Trials are drawn in (t, b, f) order, so a given seed always yields the
    /// same tensor for the same batch.
    pub fn encode<R: Rng + ?Sized>(&self, batch: &ImageBatch, rng: &mut R) -> CoreResult<SpikeTensor> {
        let (samples, features) = (batch.samples(), batch.features());

        let probs: Vec<f32> = (0..samples)
            .flat_map(|b| batch.sample(b).iter().map(|&x| self.firing_probability(x)))
            .collect();

        let total = self.num_steps.checked_mul(probs.len()).ok_or_else(|| {
            CoreError::invalid_shape(format!(
                "{} steps x {} samples x {} features overflows",
                self.num_steps, samples, features
            ))
        })?;
        let mut cells = Vec::with_capacity(total);
        for _ in 0..self.num_steps {
            // gen::<f32>() is in [0, 1): p == 0 never fires, p == 1 always does
            cells.extend(probs.iter().map(|&p| (rng.gen::<f32>() < p) as u8));
        }

        SpikeTensor::from_cells(self.num_steps, samples, features, cells)
    }
}
