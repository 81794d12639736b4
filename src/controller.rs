//! The poll loop.
//!
//! Owns the network link, flag store, audio module and alarm output, and
//! runs the only decision logic on the device:
//!
//! - flag `true`  → loop the deterrent track, raise the alarm, hold for the
//!   dwell time, then clear the flag remotely
//! - flag `false` → stop audio, lower the alarm
//! - read failed  → per [`ReadFailurePolicy`]; never raises the alarm
//!
//! Alarm state is not tracked separately; it is re-derived from every read.
//! Everything blocks on the single calling thread.

use embedded_hal::delay::DelayNs;

use crate::alarm::{AlarmError, AlarmOutput};
use crate::audio::{AudioActuator, AudioError};
use crate::config::{Config, ReadFailurePolicy};
use crate::network::{self, NetworkLink};
use crate::store::FlagStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StartupError {
    #[error("audio init failed: {0}")]
    Audio(AudioError),
    #[error(transparent)]
    Alarm(#[from] AlarmError),
}

/// What a single poll iteration did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Link or store session not usable; nothing was read
    Skipped,
    /// The read failed; actuators handled per policy
    ReadFailed,
    /// Flag was `false`; audio stopped and alarm lowered
    Idle,
    /// Flag was `true`; alert played and a clear was attempted
    Alerted { cleared: bool },
}

/// Running counters, logged periodically.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub iterations: u32,
    pub alerts: u32,
    pub skipped: u32,
    pub read_failures: u32,
    pub clear_failures: u32,
}

pub struct Controller<N, S, A, P> {
    link: N,
    store: S,
    audio: A,
    alarm: P,
    config: Config,
    stats: Stats,
}

impl<N, S, A, P> Controller<N, S, A, P>
where
    N: NetworkLink,
    S: FlagStore,
    A: AudioActuator,
    P: AlarmOutput,
{
    pub fn new(link: N, store: S, audio: A, alarm: P, config: Config) -> Self {
        Self {
            link,
            store,
            audio,
            alarm,
            config,
            stats: Stats::default(),
        }
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn alarm(&self) -> &P {
        &self.alarm
    }

    /// Startup phase: audio first, then the network.
    ///
    /// An audio failure returns immediately; the network is never touched
    /// and the caller is expected to halt. Blocks indefinitely if Wi-Fi
    /// never associates.
    pub fn start<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), StartupError> {
        log::info!("Initializing DFPlayer Mini...");
        if let Err(e) = self.audio.init() {
            log::error!(
                "Unable to initialize DFPlayer Mini ({}). Check connections and SD card.",
                e
            );
            return Err(StartupError::Audio(e));
        }
        log::info!("DFPlayer Mini initialized.");

        if self.config.self_test {
            self.self_test(delay);
        }

        network::wait_for_association(&mut self.link, delay, self.config.connect_retry_ms);

        self.alarm.set_low()?;
        log::info!("Controller ready, polling every {} ms", self.config.poll_interval_ms);
        Ok(())
    }

    /// Short chime at boot so an installer can hear the speaker works.
    fn self_test<D: DelayNs>(&mut self, delay: &mut D) {
        let result = self
            .audio
            .set_volume(self.config.effective_volume())
            .and_then(|_| self.audio.play(self.config.track));
        if let Err(e) = result {
            log::warn!("Self-test playback failed: {}", e);
            return;
        }
        delay.delay_ms(self.config.self_test_ms);
        if let Err(e) = self.audio.stop() {
            log::warn!("Self-test stop failed: {}", e);
        }
    }

    /// One poll iteration, without the trailing sleep.
    pub fn poll_once<D: DelayNs>(&mut self, delay: &mut D) -> Outcome {
        self.stats.iterations = self.stats.iterations.wrapping_add(1);

        if !self.link.is_connected() {
            self.link.maintain();
            self.stats.skipped += 1;
            return Outcome::Skipped;
        }
        if !self.store.is_ready() {
            self.stats.skipped += 1;
            return Outcome::Skipped;
        }

        match self.store.read_detection_flag() {
            Ok(true) => {
                let cleared = self.alert(delay);
                Outcome::Alerted { cleared }
            }
            Ok(false) => {
                log::info!("No elephant detected. Stopping sound...");
                self.stand_down();
                Outcome::Idle
            }
            Err(e) => {
                log::warn!("Failed to get detection flag: {}", e);
                self.stats.read_failures += 1;
                if self.config.read_failure == ReadFailurePolicy::FailSafe {
                    self.stand_down();
                }
                Outcome::ReadFailed
            }
        }
    }

    /// Poll, then sleep the fixed interval.
    pub fn tick<D: DelayNs>(&mut self, delay: &mut D) -> Outcome {
        let outcome = self.poll_once(delay);

        let every = self.config.status_every;
        if every != 0 && self.stats.iterations % every == 0 {
            let s = self.stats;
            log::info!(
                "Status: {} polls, {} alerts, {} skipped, {} read failures, {} clear failures",
                s.iterations,
                s.alerts,
                s.skipped,
                s.read_failures,
                s.clear_failures
            );
        }

        delay.delay_ms(self.config.poll_interval_ms);
        outcome
    }

    /// Poll forever.
    pub fn run<D: DelayNs>(&mut self, delay: &mut D) -> ! {
        loop {
            self.tick(delay);
        }
    }

    fn alert<D: DelayNs>(&mut self, delay: &mut D) -> bool {
        log::info!("Elephant detected! Playing deterrent sound...");
        self.stats.alerts += 1;

        let volume = self.config.effective_volume();
        let track = self.config.track;
        if let Err(e) = self
            .audio
            .set_volume(volume)
            .and_then(|_| self.audio.play_looping(track))
        {
            log::warn!("Deterrent playback failed: {}", e);
        }
        if let Err(e) = self.alarm.set_high() {
            log::warn!("Failed to raise alarm output: {}", e);
        }

        delay.delay_ms(self.config.dwell_ms);

        let attempts = 1 + u32::from(self.config.clear_retries);
        for attempt in 1..=attempts {
            match self.store.clear_detection_flag() {
                Ok(()) => {
                    log::info!("Successfully updated detection status to false");
                    return true;
                }
                Err(e) => {
                    log::warn!(
                        "Failed to update detection status (attempt {}/{}): {}",
                        attempt,
                        attempts,
                        e
                    );
                }
            }
        }

        // The flag stays set upstream, so the next read re-triggers the alert.
        self.stats.clear_failures += 1;
        false
    }

    fn stand_down(&mut self) {
        if let Err(e) = self.audio.stop() {
            log::warn!("Failed to stop audio: {}", e);
        }
        if let Err(e) = self.alarm.set_low() {
            log::warn!("Failed to lower alarm output: {}", e);
        }
    }
}
