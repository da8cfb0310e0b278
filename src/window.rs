//! Bounded FIFO sample windows.
//!
//! Each tracked feature owns two of these: a reference window holding the
//! baseline samples and a live window holding the most recent traffic. Once
//! a window is at capacity, every push evicts the oldest sample.

use crate::histogram;
use std::collections::VecDeque;

/// Fixed-capacity buffer of recent `f64` observations, oldest evicted first.
///
/// Values are validated as finite at the monitor boundary before they reach
/// the window, so `push` itself cannot fail.
#[derive(Debug, Clone)]
pub struct SampleWindow {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl SampleWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append `value`, evicting from the front until length is back within
    /// capacity.
    pub fn push(&mut self, value: f64) {
        self.samples.push_back(value);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    /// Current contents in insertion order, oldest first.
    pub fn snapshot(&self) -> Vec<f64> {
        self.samples.iter().copied().collect()
    }

    /// Discard current contents and install `values`, keeping only the most
    /// recent `capacity` elements when `values` is longer.
    pub fn replace(&mut self, values: &[f64]) {
        self.samples.clear();
        let skip = values.len().saturating_sub(self.capacity);
        self.samples.extend(values[skip..].iter().copied());
    }

    /// Normalized histogram of the current contents. See
    /// [`histogram::probability_mass`] for the degenerate-input policy.
    pub fn histogram(&self, bin_count: usize) -> Vec<f64> {
        let snap = self.snapshot();
        histogram::probability_mass(&snap, bin_count)
    }

    /// Mean of the current contents, 0.0 when empty.
    pub fn mean(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }

    pub fn len(&self) -> usize { self.samples.len() }
    pub fn is_empty(&self) -> bool { self.samples.is_empty() }
    pub fn capacity(&self) -> usize { self.capacity }
}
