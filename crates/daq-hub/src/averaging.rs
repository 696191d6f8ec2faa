//! Fixed-capacity running average

use std::collections::VecDeque;

/// Circular sample buffer reporting the mean of its current contents
#[derive(Debug, Clone)]
pub struct AveragingBuffer {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl AveragingBuffer {
    /// Create an empty buffer holding at most `capacity` samples
    ///
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Push a sample, evicting the oldest when full, and return the new mean
    pub fn push(&mut self, sample: f64) -> f64 {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
        self.mean()
    }

    /// Mean of the current contents, 0.0 when empty
    pub fn mean(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Change the capacity; contents are discarded
    pub fn reset(&mut self, capacity: usize) {
        *self = Self::new(capacity);
    }
}
