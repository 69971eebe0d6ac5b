use std::time::Duration;

use crate::config::Config;
use crate::net::MomentInTime;

const VARIANCE_WEIGHT: f32 = 0.25;

/// Smoothed round-trip time estimation from acknowledged packets.
#[derive(Debug, Clone)]
pub struct RttEstimator {
    smoothing_factor: f32,
    smoothed: Option<Duration>,
    variance: Duration,
}

impl RttEstimator {
    /// Creates an estimator that weighs new samples with `smoothing_factor`.
    pub fn new(smoothing_factor: f32) -> RttEstimator {
        RttEstimator {
            smoothing_factor: smoothing_factor.clamp(0.0, 1.0),
            smoothed: None,
            variance: Duration::ZERO,
        }
    }

    /// Feeds a round-trip sample.
    pub fn update(&mut self, sample: Duration) {
        match self.smoothed {
            None => {
                self.smoothed = Some(sample);
                self.variance = sample / 2;
            }
            Some(smoothed) => {
                let deviation = if sample > smoothed {
                    sample - smoothed
                } else {
                    smoothed - sample
                };
                self.variance = self
                    .variance
                    .mul_f32(1.0 - VARIANCE_WEIGHT)
                    .saturating_add(deviation.mul_f32(VARIANCE_WEIGHT));
                self.smoothed = Some(
                    smoothed
                        .mul_f32(1.0 - self.smoothing_factor)
                        .saturating_add(sample.mul_f32(self.smoothing_factor)),
                );
            }
        }
    }

    /// Returns the smoothed round-trip time, if any sample arrived.
    pub fn smoothed(&self) -> Option<Duration> {
        self.smoothed
    }

    /// Returns the retransmission timeout the samples suggest, zero without samples.
    pub fn retransmission_timeout(&self) -> Duration {
        match self.smoothed {
            Some(smoothed) => smoothed.saturating_add(self.variance * 4),
            None => Duration::ZERO,
        }
    }

    /// Forgets all samples.
    pub fn reset(&mut self) {
        self.smoothed = None;
        self.variance = Duration::ZERO;
    }
}

/// Limits the number of reliable packets in flight.
///
/// The window shrinks by one on every loss and remembers the size at that moment as its lossy
/// ceiling. Below the ceiling it grows freely; at or above it, at most once per interval.
#[derive(Debug, Clone)]
pub struct CongestionWindow<T: MomentInTime> {
    size: usize,
    // `None` while no loss happened
    lossy_size: Option<usize>,
    last_increase: Option<T>,
    min_size: usize,
    max_size: usize,
    increase_interval: Duration,
    slack: usize,
}

impl<T: MomentInTime> CongestionWindow<T> {
    /// Creates a window with the congestion settings from the config.
    pub fn new(config: &Config) -> CongestionWindow<T> {
        let min_size = config.min_window_size.max(1);
        CongestionWindow {
            size: min_size,
            lossy_size: None,
            last_increase: None,
            min_size,
            max_size: config.max_window_size.max(min_size),
            increase_interval: config.window_increase_interval,
            slack: config.lossy_window_slack,
        }
    }

    /// Returns the number of packets allowed in flight.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Returns the lossy ceiling, `None` while it is unbounded.
    pub fn lossy_size(&self) -> Option<usize> {
        self.lossy_size
    }

    /// Returns true when no new reliable packets should be sent.
    pub fn is_throttled(&self, in_flight: usize) -> bool {
        in_flight >= self.size
    }

    /// Shrinks the window after a resend.
    pub fn on_loss(&mut self, now: T) {
        self.size = self.size.saturating_sub(1).max(self.min_size);
        self.lossy_size = Some(self.size);
        self.last_increase = Some(now);
    }

    /// Grows the window after a batch of acknowledgements arrived while data was waiting.
    ///
    /// Returns true when the window grew.
    pub fn on_acks(&mut self, now: T) -> bool {
        let interval_elapsed = self
            .last_increase
            .map_or(true, |last| now.duration_since(last) > self.increase_interval);
        let below_ceiling = self.lossy_size.map_or(true, |lossy| self.size < lossy);

        let before = self.size;
        if below_ceiling || interval_elapsed {
            self.size += 1;
            if interval_elapsed {
                self.last_increase = Some(now);
            }
        }
        self.size = self.size.min(self.max_size);

        if let Some(lossy) = self.lossy_size {
            if self.size == self.max_size || self.size > lossy + self.slack {
                self.lossy_size = Some(lossy + 1);
            }
        }
        self.size > before
    }

    /// Changes how often the window may grow once it reached the lossy ceiling.
    pub fn set_increase_interval(&mut self, interval: Duration) {
        self.increase_interval = interval;
    }

    /// Returns to the initial state.
    pub fn reset(&mut self) {
        self.size = self.min_size;
        self.lossy_size = None;
        self.last_increase = None;
    }
}
