//! EleSafe library — portable elephant deterrent controller.
//!
//! A remote camera node flags elephant sightings in a Firebase Realtime
//! Database document. This crate polls that flag and, while it is set, loops
//! a deterrent track on a DFPlayer Mini and raises an alarm output, then
//! clears the flag.
//!
//! Everything here is `no_std`, allocation-free and testable on any host with
//! `cargo test`. Platform binaries (the ESP-IDF firmware in `firmware-std`)
//! are thin consumers that supply the Wi-Fi link, HTTPS transport, UART,
//! GPIO and delay through the traits below:
//!
//! - [`network::NetworkLink`] — bring the link up, report whether it is up
//! - [`store::HttpTransport`] — blocking GET/PUT, wrapped by
//!   [`store::FirebaseStore`] into a [`store::FlagStore`]
//! - `embedded_io::{Read, Write}` — serial port for [`dfplayer::DfPlayer`]
//! - `embedded_hal::digital::OutputPin` — wrapped by [`alarm::Alarm`]
//! - `embedded_hal::delay::DelayNs` — every wait in the poll loop

#![cfg_attr(not(test), no_std)]

pub mod alarm;
pub mod audio;
pub mod board;
pub mod config;
pub mod controller;
pub mod dfplayer;
pub mod network;
pub mod protocol;
pub mod store;

/// Firmware version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
