use itertools::Itertools;
use itertools::MinMaxResult;
use std::collections::VecDeque;
use std::f64::consts::PI;

/// Fixed-capacity rolling window of scalar samples.
/// Pushing past capacity evicts the oldest sample first.
#[derive(Debug)]
pub struct SampleWindow {
    samples: VecDeque<f64>,
    max_size: usize,
}

impl SampleWindow {
    pub fn new(max_size: usize) -> Self {
        Self { samples: VecDeque::with_capacity(max_size), max_size }
    }

    pub fn push(&mut self, sample: f64) {
        self.samples.push_back(sample);
        if self.samples.len() > self.max_size {
            self.samples.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() == self.max_size
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Max minus min over the window; 0 with fewer than two samples.
    pub fn spread(&self) -> f64 {
        match self.samples.iter().minmax() {
            MinMaxResult::MinMax(min, max) => max - min,
            _ => 0.0,
        }
    }

    /// Spread of angular samples in radians, folded onto `[0, pi]` so a
    /// heading jitter across the 0/2pi seam does not read as a full turn.
    pub fn circular_spread(&self) -> f64 {
        let spread = self.spread() % (2.0 * PI);
        if spread > PI { 2.0 * PI - spread } else { spread }
    }
}

#[cfg(test)]
mod tests {
    use super::SampleWindow;
    use std::f64::consts::PI;

    #[test]
    fn evicts_oldest_past_capacity() {
        let mut window = SampleWindow::new(3);
        for s in [1.0, 9.0, 2.0, 3.0] {
            window.push(s);
        }
        assert_eq!(window.len(), 3);
        // The 9.0 outlier is still inside; pushing twice more evicts it.
        assert!((window.spread() - 7.0).abs() < f64::EPSILON);
        window.push(4.0);
        window.push(5.0);
        assert!((window.spread() - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn spread_of_sparse_window_is_zero() {
        let mut window = SampleWindow::new(5);
        assert_eq!(window.spread(), 0.0);
        window.push(42.0);
        assert_eq!(window.spread(), 0.0);
        assert!(!window.is_full());
    }

    #[test]
    fn circular_spread_folds_the_seam() {
        let mut window = SampleWindow::new(4);
        window.push(0.05);
        window.push(2.0 * PI - 0.05);
        assert!((window.circular_spread() - 0.1).abs() < 1e-9);
    }
}
