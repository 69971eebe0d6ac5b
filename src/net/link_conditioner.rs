//! This module provides means to simulate various network conditions for development. The primary focus is
//! for testing applications under adverse conditions such as high packet loss networks.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg as Random;

/// Network simulator. Used to simulate network conditions as dropped packets.
#[derive(Clone, Debug)]
pub struct LinkConditioner {
    // Value between 0 and 1, representing the % change a packet will be dropped on sending
    packet_loss: f64,
    random: Random,
}

impl LinkConditioner {
    /// Creates and returns a LinkConditioner
    #[allow(clippy::new_without_default)]
    pub fn new() -> LinkConditioner {
        LinkConditioner::with_seed(rand::random())
    }

    /// Creates a LinkConditioner whose drops are reproducible for the given seed.
    pub fn with_seed(seed: u64) -> LinkConditioner {
        LinkConditioner {
            packet_loss: 0.0,
            random: Random::seed_from_u64(seed),
        }
    }

    /// Sets the packet loss rate of Link Conditioner, clamped between 0 and 1.
    pub fn set_packet_loss(&mut self, rate: f64) {
        self.packet_loss = rate.clamp(0.0, 1.0);
    }

    /// Returns the conditioner with the given packet loss rate.
    pub fn with_packet_loss(mut self, rate: f64) -> LinkConditioner {
        self.set_packet_loss(rate);
        self
    }

    /// Function that checks to see if a packet should be dropped or not
    pub fn should_send(&mut self) -> bool {
        self.random.gen_range(0.0..1.0) >= self.packet_loss
    }
}

#[cfg(test)]
mod tests {
    use super::LinkConditioner;

    #[test]
    fn lossless_link_sends_everything() {
        let mut link = LinkConditioner::new();
        assert!((0..1000).all(|_| link.should_send()));
    }

    #[test]
    fn fully_lossy_link_sends_nothing() {
        let mut link = LinkConditioner::new().with_packet_loss(1.0);
        assert!((0..1000).all(|_| !link.should_send()));
    }

    #[test]
    fn loss_rate_is_roughly_respected() {
        let mut link = LinkConditioner::with_seed(7).with_packet_loss(0.5);
        let sent = (0..10_000).filter(|_| link.should_send()).count();
        assert!(sent > 4_000 && sent < 6_000, "sent {}", sent);
    }

    #[test]
    fn same_seed_drops_the_same_packets() {
        let mut a = LinkConditioner::with_seed(42).with_packet_loss(0.3);
        let mut b = LinkConditioner::with_seed(42).with_packet_loss(0.3);
        for _ in 0..100 {
            assert_eq!(a.should_send(), b.should_send());
        }
    }
}
