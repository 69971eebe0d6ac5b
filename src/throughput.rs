use std::fmt::{self, Debug, Display};
use std::time::Duration;

use crate::net::MomentInTime;

/// Counts events per fixed time window, used by the load tester to report messages per second.
///
/// Every call to [`tick`](ThroughputMonitoring::tick) counts one event. Once a window has
/// elapsed, its count is closed and kept in the history.
pub struct ThroughputMonitoring<T: MomentInTime> {
    window: Duration,
    window_start: T,
    elapsed: Duration,
    open_window: u32,
    closed_windows: Vec<u32>,
}

impl<T: MomentInTime> ThroughputMonitoring<T> {
    /// Creates a monitor whose first window starts at `time`.
    pub fn new(window: Duration, time: T) -> ThroughputMonitoring<T> {
        ThroughputMonitoring {
            window,
            window_start: time,
            elapsed: Duration::ZERO,
            open_window: 0,
            closed_windows: Vec::new(),
        }
    }

    /// Counts one event at `time`. Returns true when this call closed a window, in which case
    /// the event opens the next one uncounted.
    pub fn tick(&mut self, time: T) -> bool {
        self.elapsed = time.duration_since(self.window_start);
        if self.elapsed < self.window {
            self.open_window += 1;
            return false;
        }

        self.closed_windows.push(self.open_window);
        self.open_window = 0;
        self.window_start = time;
        true
    }

    /// Mean count over the closed windows.
    pub fn average(&self) -> u32 {
        match self.closed_windows.len() {
            0 => 0,
            windows => self.closed_windows.iter().sum::<u32>() / windows as u32,
        }
    }

    /// Forgets every counted event.
    pub fn reset(&mut self) {
        self.open_window = 0;
        self.closed_windows.clear();
    }

    /// Count of the most recently closed window.
    pub fn last_throughput(&self) -> u32 {
        self.closed_windows.last().copied().unwrap_or(0)
    }

    /// Every event counted so far, including the open window.
    pub fn total_measured_ticks(&self) -> u32 {
        self.closed_windows.iter().sum::<u32>() + self.open_window
    }
}

impl<T: MomentInTime> Debug for ThroughputMonitoring<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

impl<T: MomentInTime> Display for ThroughputMonitoring<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} msg/window (average {}) after {:?}",
            self.last_throughput(),
            self.average(),
            self.elapsed
        )
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::ThroughputMonitoring;

    #[test]
    fn ticks_are_grouped_per_duration() {
        let start = Instant::now();
        let mut monitor = ThroughputMonitoring::new(Duration::from_secs(1), start);

        for _ in 0..10 {
            assert!(!monitor.tick(start));
        }
        assert!(monitor.tick(start + Duration::from_secs(1)));
        for _ in 0..20 {
            monitor.tick(start + Duration::from_millis(1500));
        }
        assert!(monitor.tick(start + Duration::from_secs(2)));

        assert_eq!(monitor.last_throughput(), 20);
        assert_eq!(monitor.average(), 15);
        assert_eq!(monitor.total_measured_ticks(), 30);

        monitor.reset();
        assert_eq!(monitor.total_measured_ticks(), 0);
    }
}
