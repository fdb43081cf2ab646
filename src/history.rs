use std::collections::VecDeque;

/// Fixed-capacity FIFO of recent samples on one axis; the oldest is evicted when full.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    values: VecDeque<f32>,
    capacity: usize,
}

impl HistoryBuffer {
    /// `capacity` must be non-zero; settings validation guarantees it.
    pub fn new(capacity: usize) -> Self {
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, value: f32) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    /// Most recent sample.
    pub fn last(&self) -> Option<f32> {
        self.values.back().copied()
    }

    pub fn mean(&self) -> Option<f32> {
        if self.values.is_empty() {
            return None;
        }
        Some(self.values.iter().sum::<f32>() / self.values.len() as f32)
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
