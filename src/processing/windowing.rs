// src/processing/windowing.rs
//! Trailing rolling-window statistics

use std::collections::VecDeque;

/// Fixed-size trailing window over one channel
///
/// Once `size` values have been pushed, every push evicts the oldest value.
/// Statistics are only defined while the window is full.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    size: usize,
    buffer: VecDeque<f64>,
}

/// Mean and sample standard deviation of a full window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStats {
    pub mean: f64,
    pub std: f64,
}

impl RollingWindow {
    /// `size` must be at least 2 for the sample standard deviation to exist
    pub fn new(size: usize) -> Self {
        Self {
            size,
            buffer: VecDeque::with_capacity(size),
        }
    }

    pub fn push(&mut self, value: f64) {
        if self.buffer.len() == self.size {
            self.buffer.pop_front();
        }
        self.buffer.push_back(value);
    }

    pub fn is_full(&self) -> bool {
        self.buffer.len() == self.size
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Mean and standard deviation (ddof = 1), `None` until the window is full
    pub fn stats(&self) -> Option<WindowStats> {
        if !self.is_full() || self.size < 2 {
            return None;
        }

        let n = self.size as f64;
        let mean = self.buffer.iter().sum::<f64>() / n;
        let sum_squares = self.buffer.iter().map(|&x| (x - mean).powi(2)).sum::<f64>();

        Some(WindowStats {
            mean,
            std: (sum_squares / (n - 1.0)).sqrt(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undefined_until_full() {
        let mut window = RollingWindow::new(3);
        window.push(1.0);
        window.push(2.0);
        assert!(window.stats().is_none());
        window.push(3.0);
        assert!(window.is_full());

        let stats = window.stats().unwrap();
        assert_eq!(stats.mean, 2.0);
        assert!((stats.std - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_window_slides() {
        let mut window = RollingWindow::new(4);
        for value in [1.0, 2.0, 3.0, 4.0, 5.0, 6.0] {
            window.push(value);
        }
        assert_eq!(window.len(), 4);

        let stats = window.stats().unwrap();
        assert_eq!(stats.mean, 4.5);
        // var of 3,4,5,6 with ddof 1 = 5/3
        assert!((stats.std - (5.0f64 / 3.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_constant_window_has_zero_std() {
        let mut window = RollingWindow::new(5);
        for _ in 0..5 {
            window.push(0.3);
        }
        assert!(window.stats().unwrap().std.abs() < 1e-12);
    }

    #[test]
    fn test_reset_empties_window() {
        let mut window = RollingWindow::new(2);
        window.push(1.0);
        window.push(2.0);
        window.reset();
        assert!(window.is_empty());
        assert!(window.stats().is_none());
    }
}
