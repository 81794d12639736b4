//! Hardware abstraction for supported boards.
//!
//! Each board module defines pin assignments selected at compile time via
//! feature flags. The firmware crate maps these numbers onto its own
//! peripheral handles.

#[cfg(feature = "board-devkit")]
mod hw {
    // ESP32 DevKitC, wired as in the field units
    pub const AUDIO_RX_PIN: u8 = 16;
    pub const AUDIO_TX_PIN: u8 = 17;
    pub const ALARM_PIN: u8 = 4;
    pub const BOARD_NAME: &str = "esp32_devkitc";
}

#[cfg(all(feature = "board-xiao", not(feature = "board-devkit")))]
mod hw {
    pub const AUDIO_RX_PIN: u8 = 44; // D7
    pub const AUDIO_TX_PIN: u8 = 43; // D6
    pub const ALARM_PIN: u8 = 3; // D2
    pub const BOARD_NAME: &str = "xiao_esp32s3";
}

#[cfg(not(any(feature = "board-devkit", feature = "board-xiao")))]
mod hw {
    pub const BOARD_NAME: &str = "unknown";
}

pub use hw::*;

/// DFPlayer Mini serial baud rate (fixed by the module).
pub const AUDIO_BAUD: u32 = 9600;
