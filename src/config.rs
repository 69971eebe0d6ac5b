use std::{default::Default, time::Duration};

use crate::net::constants::{
    DEFAULT_CONNECTION_TIMEOUT, DEFAULT_MAX_RESEND_DELAY, DEFAULT_MAX_SPLIT_COUNT,
    DEFAULT_MTU_SIZE, DEFAULT_RECEIVE_HOLE_TIMEOUT, DEFAULT_RESEND_AFTER,
    DEFAULT_SPLIT_PACKET_TIMEOUT, MAXIMUM_MTU_SIZE, MAXIMUM_WINDOW_SIZE, MINIMUM_RESEND_DELAY,
    MINIMUM_WINDOW_SIZE,
};

#[derive(Clone, Debug)]
/// Contains the configuration options to configure strand for special use-cases.
pub struct Config {
    /// Make the underlying UDP socket block when true, otherwise non-blocking.
    pub blocking_mode: bool,
    /// Value which can specify the amount of time that can pass without hearing from a client before considering them disconnected.
    pub idle_connection_timeout: Duration,
    /// Value which specifies at which interval (if at all) a heartbeat should be sent, if no other packet was sent in the meantime.
    /// If None, no heartbeats will be sent (the default).
    pub heartbeat_interval: Option<Duration>,
    /// Value that specifies the size of the buffer the UDP data will be read into. Defaults to `MAXIMUM_MTU_SIZE` bytes.
    pub receive_buffer_max_size: usize,
    /// Value which can specify how long we should block polling for socket events.
    pub socket_polling_timeout: Option<Duration>,
    /// The maximum number of unestablished connections that strand will track internally. This is
    /// used to prevent malicious packet flooding from consuming an unbounded amount of memory.
    pub max_unestablished_connections: usize,
    /// The maximum number of frames a connection sends during one update.
    pub max_frames_per_update: usize,

    /// Maximum transmission unit including the UDP header allowance.
    ///
    /// Values above `MAXIMUM_MTU_SIZE` are clamped by `Config::mtu()`.
    pub mtu: usize,
    /// Reliable packets are resent after this amount of time if no acknowledgement has been received.
    ///
    /// This seeds the doubling backoff; values below `MINIMUM_RESEND_DELAY` are raised to it.
    pub resend_after: Duration,
    /// The ceiling of the doubling resend backoff.
    pub max_resend_delay: Duration,
    /// The number of times a reliable packet is resent before the connection is declared dead.
    pub max_retries: u32,
    /// How long reliable data may stay unacknowledged before the connection is declared dead.
    pub connection_timeout: Duration,
    /// How long an acknowledgement may wait for data to piggyback on.
    pub ack_delay: Duration,
    /// A missing reliable sequence number stops counting as a possible duplicate after this amount of time.
    ///
    /// The sender gives up on a packet well before this with the default resend settings.
    pub receive_hole_timeout: Duration,
    /// Incomplete unreliable split packets are discarded after this amount of time.
    pub split_packet_timeout: Duration,
    /// The maximum number of fragments a message may be split into.
    pub max_split_count: u32,
    /// Weight of a new round-trip sample in the smoothed round-trip time, between 0 and 1.
    pub rtt_smoothing_factor: f32,

    /// The congestion window never shrinks below this many packets in flight.
    pub min_window_size: usize,
    /// The congestion window never grows beyond this many packets in flight.
    pub max_window_size: usize,
    /// Once the window reached its lossy ceiling it grows at most once per this interval.
    pub window_increase_interval: Duration,
    /// How far the window may exceed the lossy ceiling before the ceiling is raised.
    pub lossy_window_slack: usize,
}

impl Config {
    /// Returns the configured maximum transmission unit, clamped to `MAXIMUM_MTU_SIZE`.
    pub fn mtu(&self) -> usize {
        self.mtu.min(MAXIMUM_MTU_SIZE)
    }

    /// Returns the configured resend delay, raised to `MINIMUM_RESEND_DELAY`.
    pub fn resend_after(&self) -> Duration {
        self.resend_after.max(MINIMUM_RESEND_DELAY)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            blocking_mode: false,
            idle_connection_timeout: Duration::from_secs(5),
            heartbeat_interval: None,
            receive_buffer_max_size: MAXIMUM_MTU_SIZE,
            socket_polling_timeout: Some(Duration::from_millis(1)),
            max_unestablished_connections: 50,
            max_frames_per_update: 32,
            mtu: DEFAULT_MTU_SIZE,
            resend_after: DEFAULT_RESEND_AFTER,
            max_resend_delay: DEFAULT_MAX_RESEND_DELAY,
            max_retries: 10,
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
            ack_delay: DEFAULT_RESEND_AFTER / 4,
            receive_hole_timeout: DEFAULT_RECEIVE_HOLE_TIMEOUT,
            split_packet_timeout: DEFAULT_SPLIT_PACKET_TIMEOUT,
            max_split_count: DEFAULT_MAX_SPLIT_COUNT,
            rtt_smoothing_factor: 0.125,
            min_window_size: MINIMUM_WINDOW_SIZE,
            max_window_size: MAXIMUM_WINDOW_SIZE,
            window_increase_interval: DEFAULT_RESEND_AFTER * 2,
            lossy_window_slack: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::Config;
    use crate::net::constants::{MAXIMUM_MTU_SIZE, MINIMUM_RESEND_DELAY};

    #[test]
    fn mtu_is_clamped() {
        let config = Config {
            mtu: 65000,
            ..Default::default()
        };
        assert_eq!(config.mtu(), MAXIMUM_MTU_SIZE);
        assert_eq!(Config::default().mtu(), 576);
    }

    #[test]
    fn resend_delay_has_a_floor() {
        let config = Config {
            resend_after: Duration::from_millis(10),
            ..Default::default()
        };
        assert_eq!(config.resend_after(), MINIMUM_RESEND_DELAY);
    }

    #[test]
    fn derived_defaults() {
        let config = Config::default();
        assert_eq!(config.ack_delay, config.resend_after / 4);
        assert_eq!(config.window_increase_interval, config.resend_after * 2);
        assert_eq!(config.max_window_size, (8000 - 28) * 8 / 17);
    }

    #[test]
    fn holes_outlive_the_default_resend_schedule() {
        let config = Config::default();
        let resending_for: Duration = (0..=config.max_retries)
            .map(|retries| {
                (config.resend_after() * 2u32.pow(retries.min(16))).min(config.max_resend_delay)
            })
            .sum();
        assert!(resending_for < config.receive_hole_timeout);
    }
}
