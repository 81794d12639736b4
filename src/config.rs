//! Runtime configuration for the poll loop.
//!
//! Defaults reproduce the field units: volume 25, track 1, a 5 s alert
//! dwell and a 1 s poll cadence.

/// Highest volume step the DFPlayer accepts.
pub const MAX_VOLUME: u8 = 30;

/// What the controller does with the actuators when a remote read fails.
///
/// Neither policy ever raises the alarm on a failed read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadFailurePolicy {
    /// Leave audio and alarm output exactly as they were.
    Hold,
    /// Stop audio and lower the alarm output, as if `detected` read `false`.
    FailSafe,
}

#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Playback volume, 0..=30
    pub volume: u8,
    /// Deterrent track index on the SD card
    pub track: u16,
    /// How long an alert stays up before the flag is cleared (ms)
    pub dwell_ms: u32,
    /// Sleep between poll iterations (ms)
    pub poll_interval_ms: u32,
    /// Interval between Wi-Fi association checks at startup (ms)
    pub connect_retry_ms: u32,
    pub read_failure: ReadFailurePolicy,
    /// Extra clear attempts after a failed write. Zero means no retry.
    pub clear_retries: u8,
    /// Play the deterrent track once at startup to prove the speaker works
    pub self_test: bool,
    pub self_test_ms: u32,
    /// Iterations between status log lines (0 disables)
    pub status_every: u32,
}

impl Config {
    pub const fn new() -> Self {
        Self {
            volume: 25,
            track: 1,
            dwell_ms: 5000,
            poll_interval_ms: 1000,
            connect_retry_ms: 1000,
            read_failure: ReadFailurePolicy::Hold,
            clear_retries: 0,
            self_test: true,
            self_test_ms: 3000,
            status_every: 60,
        }
    }

    /// Volume clamped to the range the audio module accepts.
    pub fn effective_volume(&self) -> u8 {
        self.volume.min(MAX_VOLUME)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

/// Network and database secrets.
///
/// Firmware fills these from build-time environment variables; nothing here
/// is persisted on the device.
#[derive(Debug, Clone, Copy)]
pub struct Credentials {
    pub wifi_ssid: &'static str,
    pub wifi_password: &'static str,
    /// Realtime Database base URL, e.g. `https://<project>.firebaseio.com`
    pub db_url: &'static str,
    /// Legacy database secret, sent as the `auth` query parameter
    pub db_secret: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_field_units() {
        let config = Config::default();
        assert_eq!(config.volume, 25);
        assert_eq!(config.track, 1);
        assert_eq!(config.dwell_ms, 5000);
        assert_eq!(config.poll_interval_ms, 1000);
        assert_eq!(config.read_failure, ReadFailurePolicy::Hold);
        assert_eq!(config.clear_retries, 0);
    }

    #[test]
    fn volume_is_clamped() {
        let config = Config {
            volume: 99,
            ..Config::new()
        };
        assert_eq!(config.effective_volume(), MAX_VOLUME);
    }
}
