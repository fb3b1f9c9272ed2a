// Spike sources for the TUI; the raster only needs "spikes at the next tick".

use spike_core::{SpikeEvent, SpikeTensor};

/// Common interface for anything that can feed the raster.
pub trait SpikeSource {
    /// Advance by one tick and return all spikes emitted during that tick.
    fn step(&mut self) -> Vec<SpikeEvent>;
    /// Number of input neurons (rows in the raster).
    fn neurons(&self) -> usize;
    /// Timestep the next call to `step` will replay.
    fn position(&self) -> usize;

    /// Switch to another sample of the batch; default no-op for single-stream sources.
    fn select_sample(&mut self, _sample: usize) {}

    fn sample(&self) -> usize { 0 }

    fn samples(&self) -> usize { 1 }
}

/// Replays one sample of an encoded batch, wrapping around after the last timestep.
pub struct TensorSource {
    tensor: SpikeTensor,
    sample: usize,
    t: usize,
}

impl TensorSource {
    pub fn new(tensor: SpikeTensor, sample: usize) -> Self {
        let sample = sample.min(tensor.samples() - 1);
        Self { tensor, sample, t: 0 }
    }
}

impl SpikeSource for TensorSource {
    fn step(&mut self) -> Vec<SpikeEvent> {
        let spikes = self.tensor.events_at(self.t, self.sample);
        self.t = (self.t + 1) % self.tensor.steps();
        spikes
    }

    fn neurons(&self) -> usize {
        self.tensor.features()
    }

    fn position(&self) -> usize {
        self.t
    }

    fn select_sample(&mut self, sample: usize) {
        if sample < self.tensor.samples() {
            self.sample = sample;
            self.t = 0;
        }
    }

    fn sample(&self) -> usize {
        self.sample
    }

    fn samples(&self) -> usize {
        self.tensor.samples()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> TensorSource {
        // (T=2, B=2, F=2)
        let tensor = SpikeTensor::from_cells(2, 2, 2, vec![1, 0, 0, 1, 1, 1, 0, 0]).unwrap();
        TensorSource::new(tensor, 0)
    }

    #[test]
    fn replays_timesteps_and_wraps() {
        let mut src = source();
        assert_eq!(src.step().len(), 1);
        assert_eq!(src.step().len(), 2);
        assert_eq!(src.position(), 0);
        assert_eq!(src.step()[0].neuron_id, 0);
    }

    #[test]
    fn selecting_a_sample_rewinds() {
        let mut src = source();
        src.step();
        src.select_sample(1);
        assert_eq!((src.sample(), src.position()), (1, 0));
        let spikes = src.step();
        assert_eq!(spikes.len(), 1);
        assert_eq!(spikes[0].neuron_id, 1);

        src.select_sample(5);
        assert_eq!(src.sample(), 1);
    }
}
