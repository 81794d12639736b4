//! Network link seam.
//!
//! The platform owns the radio; the controller only needs to bring the link
//! up once and know whether it is still up.

use embedded_hal::delay::DelayNs;

pub trait NetworkLink {
    type Error: core::fmt::Debug;

    /// Start (or restart) association. May return before the link is up.
    fn connect(&mut self) -> Result<(), Self::Error>;

    fn is_connected(&mut self) -> bool;

    /// Called after every check that found the link down, both while
    /// associating at startup and from the poll loop. Platforms without
    /// driver-level auto-reconnect kick a new association here.
    fn maintain(&mut self) {}
}

/// Block until the link reports connected, checking every `retry_ms` and
/// nudging the link after each failed check.
///
/// There is no timeout: a device that never associates never reaches the
/// poll loop. Returns the number of checks that found the link down.
pub fn wait_for_association<N, D>(link: &mut N, delay: &mut D, retry_ms: u32) -> u32
where
    N: NetworkLink,
    D: DelayNs,
{
    log::info!("Connecting to Wi-Fi...");
    if let Err(e) = link.connect() {
        log::warn!("Wi-Fi connect request failed: {:?}", e);
    }

    let mut attempts = 0u32;
    while !link.is_connected() {
        attempts = attempts.saturating_add(1);
        delay.delay_ms(retry_ms);
        log::info!("Connecting to Wi-Fi...");
        link.maintain();
    }
    log::info!("Connected to Wi-Fi after {} checks", attempts);
    attempts
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SlowLink {
        connects: u32,
        nudges: u32,
        down_for: u32,
    }

    impl NetworkLink for SlowLink {
        type Error = ();

        fn connect(&mut self) -> Result<(), ()> {
            self.connects += 1;
            Err(())
        }

        fn is_connected(&mut self) -> bool {
            if self.down_for == 0 {
                true
            } else {
                self.down_for -= 1;
                false
            }
        }

        fn maintain(&mut self) {
            self.nudges += 1;
        }
    }

    #[derive(Default)]
    struct CountingDelay {
        total_ms: u64,
    }

    impl DelayNs for CountingDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.total_ms += u64::from(ns) / 1_000_000;
        }

        fn delay_ms(&mut self, ms: u32) {
            self.total_ms += u64::from(ms);
        }
    }

    #[test]
    fn waits_with_fixed_interval_until_up() {
        let mut link = SlowLink {
            connects: 0,
            nudges: 0,
            down_for: 3,
        };
        let mut delay = CountingDelay::default();
        let attempts = wait_for_association(&mut link, &mut delay, 1000);
        assert_eq!(attempts, 3);
        assert_eq!(delay.total_ms, 3000);
        // A failed connect request still falls through to polling
        assert_eq!(link.connects, 1);
        assert_eq!(link.nudges, 3);
    }

    #[test]
    fn already_connected_returns_immediately() {
        let mut link = SlowLink {
            connects: 0,
            nudges: 0,
            down_for: 0,
        };
        let mut delay = CountingDelay::default();
        assert_eq!(wait_for_association(&mut link, &mut delay, 1000), 0);
        assert_eq!(delay.total_ms, 0);
    }
}
