//! Bounded FIFO buffers.
//!
//! Every history in the pipeline (the green-channel window, heart-rate
//! history, RR interval series, voice envelopes) is a fixed-capacity FIFO:
//! `len <= capacity` always holds and the oldest element is evicted first.

use std::collections::VecDeque;

/// Fixed-capacity FIFO ring buffer.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    buf: VecDeque<T>,
    capacity: usize,
}

/// Scalar channel window (green channel at the camera frame rate).
pub type SignalWindow = RingBuffer<f32>;

impl<T> RingBuffer<T> {
    /// Create an empty buffer. A capacity of zero is promoted to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buf: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a value, evicting and returning the oldest one on overflow.
    pub fn push(&mut self, value: T) -> Option<T> {
        let evicted = if self.buf.len() == self.capacity {
            self.buf.pop_front()
        } else {
            None
        };
        self.buf.push_back(value);
        evicted
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.buf.len() == self.capacity
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Oldest-first iterator.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.buf.iter()
    }

    pub fn front(&self) -> Option<&T> {
        self.buf.front()
    }

    pub fn back(&self) -> Option<&T> {
        self.buf.back()
    }

    /// Most recent `n` elements, oldest first. Fewer if the buffer is shorter.
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &T> {
        let skip = self.buf.len().saturating_sub(n);
        self.buf.iter().skip(skip)
    }
}

impl<T: Clone> RingBuffer<T> {
    /// Copy of the contents, oldest first.
    pub fn snapshot(&self) -> Vec<T> {
        self.buf.iter().cloned().collect()
    }

    /// Copy of the most recent `n` elements, or `None` when fewer are buffered.
    pub fn latest(&self, n: usize) -> Option<Vec<T>> {
        if self.buf.len() < n {
            return None;
        }
        Some(self.recent(n).cloned().collect())
    }
}
