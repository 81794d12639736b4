//! Alarm output (buzzer or LED on a single GPIO).

use embedded_hal::digital::OutputPin;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("alarm output pin error")]
pub struct AlarmError;

pub trait AlarmOutput {
    fn set_high(&mut self) -> Result<(), AlarmError>;
    fn set_low(&mut self) -> Result<(), AlarmError>;
    fn is_high(&self) -> bool;
}

/// [`AlarmOutput`] over any `embedded-hal` output pin.
///
/// Tracks the commanded level so callers can query it without reading the
/// pin back. Starts LOW.
pub struct Alarm<P> {
    pin: P,
    high: bool,
}

impl<P: OutputPin> Alarm<P> {
    /// Take the pin and drive it LOW.
    pub fn new(mut pin: P) -> Result<Self, AlarmError> {
        pin.set_low().map_err(|_| AlarmError)?;
        Ok(Self { pin, high: false })
    }
}

impl<P: OutputPin> AlarmOutput for Alarm<P> {
    fn set_high(&mut self) -> Result<(), AlarmError> {
        self.pin.set_high().map_err(|_| AlarmError)?;
        self.high = true;
        Ok(())
    }

    fn set_low(&mut self) -> Result<(), AlarmError> {
        self.pin.set_low().map_err(|_| AlarmError)?;
        self.high = false;
        Ok(())
    }

    fn is_high(&self) -> bool {
        self.high
    }
}
