use std::collections::VecDeque;

/// Fixed-capacity buffer of the last N unsmoothed rate ceilings, oldest
/// evicted first. The minimum over the window is the smoothed output: one
/// cautious cycle suppresses the ceiling for the full buffer length, which
/// is the hysteresis that keeps the live rate from oscillating.
#[derive(Debug)]
pub struct RateCeilingHistory {
    ceilings: VecDeque<u32>,
    max_size: usize,
}

impl RateCeilingHistory {
    /// Window length used by the discriminator.
    pub const WINDOW: usize = 10;

    pub fn new(max_size: usize) -> Self {
        Self { ceilings: VecDeque::with_capacity(max_size), max_size }
    }

    /// Pushes this cycle's raw verdict, evicting the oldest past capacity.
    pub fn push(&mut self, ceiling: u32) {
        self.ceilings.push_back(ceiling);
        if self.ceilings.len() > self.max_size {
            self.ceilings.pop_front();
        }
    }

    /// Minimum over the retained window.
    pub fn floor(&self) -> Option<u32> {
        self.ceilings.iter().copied().min()
    }

    pub fn len(&self) -> usize {
        self.ceilings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ceilings.is_empty()
    }

    pub fn clear(&mut self) {
        self.ceilings.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::RateCeilingHistory;

    #[test]
    fn holds_exactly_the_last_n_verdicts() {
        let mut history = RateCeilingHistory::new(3);
        for rate in [16, 1, 16, 16] {
            history.push(rate);
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.floor(), Some(1));
        history.push(16);
        history.push(16);
        // The spike from four pushes ago has been evicted.
        assert_eq!(history.floor(), Some(16));
    }

    #[test]
    fn empty_history_has_no_floor() {
        assert_eq!(RateCeilingHistory::new(3).floor(), None);
    }

    #[test]
    fn spike_suppresses_for_window_minus_one_cycles_after_clearing() {
        let mut history = RateCeilingHistory::new(RateCeilingHistory::WINDOW);
        for _ in 0..RateCeilingHistory::WINDOW {
            history.push(16);
        }
        history.push(1);
        // Nine clean cycles still see the spike, the tenth does not.
        for _ in 0..9 {
            history.push(16);
            assert_eq!(history.floor(), Some(1));
        }
        history.push(16);
        assert_eq!(history.floor(), Some(16));
    }
}
