use std::collections::VecDeque;

/// Fixed-capacity FIFO of recent background intensities with an O(1) mean.
///
/// The running sum always equals the sum of the stored values. A window with
/// capacity zero never stores anything and its mean is always zero.
#[derive(Debug, Clone, Default)]
pub struct RunningWindow {
    values: VecDeque<i32>,
    capacity: usize,
    sum: i64,
}

impl RunningWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
            sum: 0,
        }
    }

    pub fn push(&mut self, value: i32) {
        if self.capacity == 0 {
            return;
        }

        if self.values.len() >= self.capacity {
            let oldest = self.values.pop_front().unwrap_or_default();
            self.sum -= i64::from(oldest);
        }

        self.values.push_back(value);
        self.sum += i64::from(value);
    }

    /// Integer mean of the stored values, truncated; zero when empty.
    pub fn mean(&self) -> i32 {
        if self.values.is_empty() {
            return 0;
        }
        (self.sum / self.values.len() as i64) as i32
    }

    pub fn clear(&mut self) {
        self.values.clear();
        self.sum = 0;
    }

    /// Changes the capacity and empties the window.
    pub fn resize(&mut self, capacity: usize) {
        self.capacity = capacity;
        self.clear();
        self.values.reserve(capacity);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn sum(&self) -> i64 {
        self.sum
    }
}

#[cfg(test)]
mod tests {
    use super::RunningWindow;

    #[test]
    fn evicts_oldest_when_full() {
        let mut w = RunningWindow::new(3);
        for v in [10, 20, 30] {
            w.push(v);
        }
        assert_eq!(w.mean(), 20);
        assert_eq!(w.sum(), 60);

        w.push(60);
        assert_eq!(w.len(), 3);
        assert_eq!(w.sum(), 110);
        assert_eq!(w.mean(), 36);
    }

    #[test]
    fn empty_mean_is_zero() {
        let w = RunningWindow::new(5);
        assert!(w.is_empty());
        assert_eq!(w.mean(), 0);
    }

    #[test]
    fn zero_capacity_stores_nothing() {
        let mut w = RunningWindow::new(0);
        w.push(500);
        w.push(7);
        assert!(w.is_empty());
        assert_eq!(w.sum(), 0);
        assert_eq!(w.mean(), 0);
    }

    #[test]
    fn clear_and_resize_reset_contents() {
        let mut w = RunningWindow::new(2);
        w.push(4);
        w.push(8);
        w.clear();
        assert_eq!(w.mean(), 0);
        assert_eq!(w.capacity(), 2);

        w.push(9);
        w.resize(4);
        assert!(w.is_empty());
        assert_eq!(w.capacity(), 4);
        for v in [1, 2, 3, 4, 5] {
            w.push(v);
        }
        assert_eq!(w.sum(), 14);
    }

    #[test]
    fn sum_tracks_contents_over_many_pushes() {
        let mut w = RunningWindow::new(4);
        let values: Vec<i32> = (0..50).map(|i| (i * 37) % 101).collect();
        for (i, &v) in values.iter().enumerate() {
            w.push(v);
            let start = (i + 1).saturating_sub(4);
            let expected: i64 = values[start..=i].iter().map(|&x| i64::from(x)).sum();
            assert_eq!(w.sum(), expected);
        }
    }
}
