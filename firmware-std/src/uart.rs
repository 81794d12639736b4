//! UART adapter for the DFPlayer driver.
//!
//! The library driver treats `read` returning 0 as "nothing arrived in
//! time", so reads here are bounded by a fixed timeout instead of blocking
//! forever on a missing module.

use embedded_io::{ErrorKind, ErrorType, Read, Write};
use esp_idf_svc::hal::delay::TickType;
use esp_idf_svc::hal::uart::UartDriver;
use esp_idf_svc::sys::TickType_t;

pub struct TimedUart<'d> {
    uart: UartDriver<'d>,
    timeout: TickType_t,
}

impl<'d> TimedUart<'d> {
    pub fn new(uart: UartDriver<'d>, timeout_ms: u64) -> Self {
        Self {
            uart,
            timeout: TickType::new_millis(timeout_ms).ticks(),
        }
    }
}

impl ErrorType for TimedUart<'_> {
    type Error = ErrorKind;
}

impl Read for TimedUart<'_> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.uart.read(buf, self.timeout).map_err(|e| {
            log::warn!("Audio UART read failed: {:?}", e);
            ErrorKind::Other
        })
    }
}

impl Write for TimedUart<'_> {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.uart.write(buf).map_err(|e| {
            log::warn!("Audio UART write failed: {:?}", e);
            ErrorKind::Other
        })
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.uart
            .wait_tx_done(self.timeout)
            .map_err(|_| ErrorKind::TimedOut)
    }
}
