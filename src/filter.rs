//! Moving average over the most recent samples.

use crate::types::MeasurementSample;

/// Number of samples the window keeps
pub const WINDOW_LEN: usize = 3;

/// Ring buffer of the last [`WINDOW_LEN`] accepted samples
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Debug, Default)]
pub struct SlidingWindow {
    samples: [MeasurementSample; WINDOW_LEN],
    next: usize,
    count: usize,
}

impl SlidingWindow {
    /// Empty window
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a sample, evicting the oldest once full
    pub fn push(&mut self, sample: MeasurementSample) {
        self.samples[self.next] = sample;
        self.next = (self.next + 1) % WINDOW_LEN;
        if self.count < WINDOW_LEN {
            self.count += 1;
        }
    }

    /// Number of populated slots
    pub fn len(&self) -> usize {
        self.count
    }

    /// No sample pushed yet
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Mean of the populated slots, `None` before the first push
    pub fn average(&self) -> Option<MeasurementSample> {
        if self.count == 0 {
            return None;
        }
        // slots are filled from 0 upward, so the first `count` are the populated ones
        let (temperature, humidity) = self.samples[..self.count]
            .iter()
            .fold((0.0f32, 0.0f32), |(t, h), s| (t + s.temperature, h + s.humidity));
        let n = self.count as f32;
        Some(MeasurementSample {
            temperature: temperature / n,
            humidity: humidity / n,
        })
    }
}
