use std::time::Duration;

pub const DEFAULT_TIMING_WINDOW: usize = 1000;

/// Summary of the recorded pass durations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTimeStats {
    pub total: Duration,
    pub min: Duration,
    pub max: Duration,
    pub avg: Duration,
    pub last: Duration,
}

/// Ring buffer of the most recent pass durations.
#[derive(Debug, Clone)]
pub struct FrameTimings {
    samples: Vec<Duration>,
    capacity: usize,
    next: usize,
    last: Option<Duration>,
}

impl Default for FrameTimings {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_TIMING_WINDOW)
    }
}

impl FrameTimings {
    /// A window of `capacity` samples; a capacity of 0 is treated as 1.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: Vec::with_capacity(capacity),
            capacity,
            next: 0,
            last: None,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn record(&mut self, duration: Duration) {
        if self.samples.len() < self.capacity {
            self.samples.push(duration);
        } else {
            self.samples[self.next] = duration;
        }
        self.next = (self.next + 1) % self.capacity;
        self.last = Some(duration);
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.next = 0;
        self.last = None;
    }

    /// `None` until the first sample is recorded.
    pub fn stats(&self) -> Option<FrameTimeStats> {
        let last = self.last?;
        let mut total = Duration::ZERO;
        let mut min = Duration::MAX;
        let mut max = Duration::ZERO;
        for &sample in &self.samples {
            total += sample;
            min = min.min(sample);
            max = max.max(sample);
        }
        let count = u32::try_from(self.samples.len()).unwrap_or(u32::MAX);
        Some(FrameTimeStats {
            total,
            min,
            max,
            avg: total / count,
            last,
        })
    }
}

#[cfg(test)]
#[path = "tests/timing_tests.rs"]
mod tests;
