// Application state for the TUI, including a circular 2D spike raster.

use spike_core::SpikeEvent;
use crate::backend::SpikeSource;

pub struct App<S: SpikeSource> {
    pub source: S,
    pub tick: u64,
    pub width: usize,             // number of columns (time window)
    pub raster: Vec<Vec<char>>,   // [neuron][col]
    pub running: bool,
}

impl<S: SpikeSource> App<S> {
    pub fn new(source: S, width: usize) -> Self {
        let n = source.neurons();
        Self {
            source,
            tick: 0,
            width,
            raster: vec![vec![' '; width]; n],
            running: false,
        }
    }

    pub fn toggle_running(&mut self) {
        self.running = !self.running;
    }

    /// Advance the replay by one tick and update the raster for the current column.
    pub fn step(&mut self) {
        let spikes: Vec<SpikeEvent> = self.source.step();

        self.tick = self.tick.saturating_add(1);

        // Circular buffer column
        let col = (self.tick as usize) % self.width;

        for row in 0..self.raster.len() {
            self.raster[row][col] = ' ';
        }

        for sp in spikes {
            let row = sp.neuron_id as usize;
            if row < self.raster.len() {
                self.raster[row][col] = '•';
            }
        }
    }

    fn clear(&mut self) {
        for row in self.raster.iter_mut() {
            row.fill(' ');
        }
        self.tick = 0;
    }

    pub fn next_sample(&mut self) {
        let next = (self.source.sample() + 1) % self.source.samples();
        self.source.select_sample(next);
        self.clear();
    }

    pub fn prev_sample(&mut self) {
        let n = self.source.samples();
        let prev = (self.source.sample() + n - 1) % n;
        self.source.select_sample(prev);
        self.clear();
    }
}
