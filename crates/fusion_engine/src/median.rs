//! Sliding-window median over recent raw distances.
//!
//! The window lives in a fixed-capacity `HeapRb`: once full, the oldest value
//! is dropped before the new one is pushed.

use std::fmt;

use ringbuf::{traits::*, HeapRb};

/// Bounded FIFO of raw distances (meters)
pub struct DistanceFilter {
    window: HeapRb<f32>,
    window_size: usize,
    /// Scratch buffer reused for sorting
    scratch: Vec<f32>,
}

impl fmt::Debug for DistanceFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DistanceFilter")
            .field("len", &self.window.occupied_len())
            .field("window_size", &self.window_size)
            .finish()
    }
}

impl DistanceFilter {
    /// Create a filter keeping the last `max(1, window_size)` values
    pub fn new(window_size: usize) -> Self {
        let window_size = window_size.max(1);
        Self {
            window: HeapRb::new(window_size),
            window_size,
            scratch: Vec::with_capacity(window_size),
        }
    }

    /// Append `raw` and return the median of the window
    pub fn filter(&mut self, raw: f32) -> f32 {
        if self.window.is_full() {
            let _ = self.window.try_pop();
        }
        let _ = self.window.try_push(raw);
        self.median()
    }

    /// Median of the current window, `None` when empty
    pub fn current(&self) -> Option<f32> {
        if self.window.is_empty() {
            return None;
        }
        let mut values: Vec<f32> = self.window.iter().copied().collect();
        Some(median_of(&mut values))
    }

    fn median(&mut self) -> f32 {
        self.scratch.clear();
        self.scratch.extend(self.window.iter().copied());
        median_of(&mut self.scratch)
    }

    /// Window contents, oldest first
    pub fn values(&self) -> Vec<f32> {
        self.window.iter().copied().collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.window.occupied_len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    #[inline]
    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn clear(&mut self) {
        self.window.clear();
    }
}

/// Odd length → middle value, even → mean of the two central values.
///
/// Caller guarantees `values` is non-empty.
fn median_of(values: &mut [f32]) -> f32 {
    // stable + total order, NaN sorts last
    values.sort_by(|a, b| a.total_cmp(b));
    let n = values.len();
    let mid = n / 2;
    if n % 2 == 1 {
        values[mid]
    } else {
        (values[mid - 1] + values[mid]) * 0.5
    }
}
