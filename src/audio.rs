//! Audio playback seam.
//!
//! The controller only needs volume, play, loop and stop. [`crate::dfplayer`]
//! provides the serial implementation for the DFPlayer Mini module.

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AudioError {
    /// The module never answered the reset (not wired, not powered)
    #[error("audio module did not respond")]
    NoResponse,
    /// The module answered but reports no storage medium
    #[error("audio module has no storage medium")]
    NoMedium,
    /// The module reported an error code
    #[error("audio module error {0:#06x}")]
    Module(u16),
    #[error("track index {0} out of range")]
    InvalidTrack(u16),
    #[error("serial port error")]
    Serial,
}

/// Blocking audio actuator. Every call completes before returning.
pub trait AudioActuator {
    /// Probe and reset the module. Failure is fatal for the device.
    fn init(&mut self) -> Result<(), AudioError>;
    fn set_volume(&mut self, level: u8) -> Result<(), AudioError>;
    /// Play a track once.
    fn play(&mut self, track: u16) -> Result<(), AudioError>;
    /// Play a track on repeat until [`stop`](Self::stop).
    fn play_looping(&mut self, track: u16) -> Result<(), AudioError>;
    fn stop(&mut self) -> Result<(), AudioError>;
}
