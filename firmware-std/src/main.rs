//! EleSafe — ESP-IDF std firmware
//!
//! Wires the portable controller to ESP-IDF services: Wi-Fi station via
//! esp-idf-svc, Firebase over the ESP-IDF HTTPS client, the DFPlayer Mini on
//! UART1 and the alarm output on a plain GPIO. The whole device runs on a
//! single poll thread.

mod https;
mod uart;
mod wifi;

use std::thread;

use anyhow::anyhow;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::gpio::{AnyIOPin, AnyInputPin, AnyOutputPin, PinDriver, Pins};
use esp_idf_svc::hal::modem::Modem;
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::hal::uart::{config::Config as UartConfig, UartDriver, UART1};
use esp_idf_svc::hal::units::Hertz;
use esp_idf_svc::nvs::EspDefaultNvsPartition;

use elesafe::alarm::Alarm;
use elesafe::config::{Config, Credentials};
use elesafe::controller::Controller;
use elesafe::dfplayer::DfPlayer;
use elesafe::store::FirebaseStore;
use elesafe::{board, VERSION};

use https::HttpsTransport;
use uart::TimedUart;
use wifi::WifiLink;

/// Build-time secrets. Set the environment variables when building; the
/// placeholders will never associate or authenticate.
const CREDENTIALS: Credentials = Credentials {
    wifi_ssid: env_or(option_env!("ELESAFE_WIFI_SSID"), "YOUR_WIFI_SSID"),
    wifi_password: env_or(option_env!("ELESAFE_WIFI_PASS"), "YOUR_WIFI_PASSWORD"),
    db_url: env_or(option_env!("ELESAFE_DB_URL"), "https://YOUR-PROJECT.firebaseio.com"),
    db_secret: env_or(option_env!("ELESAFE_DB_SECRET"), ""),
};

const fn env_or(value: Option<&'static str>, fallback: &'static str) -> &'static str {
    match value {
        Some(v) => v,
        None => fallback,
    }
}

/// How long to wait for the DFPlayer to answer a reset
const AUDIO_REPLY_TIMEOUT_MS: u64 = 3000;

/// TLS handshakes need far more than the default main-task stack
const POLL_STACK_SIZE: usize = 16 * 1024;

/// Peripherals handed to the poll thread.
struct Parts {
    modem: Modem,
    uart: UART1,
    audio_tx: AnyOutputPin,
    audio_rx: AnyInputPin,
    alarm: AnyOutputPin,
    sys_loop: EspSystemEventLoop,
    nvs: EspDefaultNvsPartition,
}

#[cfg(feature = "board-devkit")]
fn board_pins(pins: Pins) -> (AnyOutputPin, AnyInputPin, AnyOutputPin) {
    (pins.gpio17.into(), pins.gpio16.into(), pins.gpio4.into())
}

#[cfg(all(feature = "board-xiao", not(feature = "board-devkit")))]
fn board_pins(pins: Pins) -> (AnyOutputPin, AnyInputPin, AnyOutputPin) {
    (pins.gpio43.into(), pins.gpio44.into(), pins.gpio3.into())
}

fn main() -> anyhow::Result<()> {
    // Bind the ESP-IDF logger to the `log` facade
    esp_idf_svc::log::EspLogger::initialize_default();

    log::info!("EleSafe v{} starting on {} (std)", VERSION, board::BOARD_NAME);
    log::info!(
        "Audio UART TX GPIO{} / RX GPIO{} at {} baud, alarm on GPIO{}",
        board::AUDIO_TX_PIN,
        board::AUDIO_RX_PIN,
        board::AUDIO_BAUD,
        board::ALARM_PIN,
    );

    let peripherals = Peripherals::take()?;
    let (audio_tx, audio_rx, alarm) = board_pins(peripherals.pins);
    let parts = Parts {
        modem: peripherals.modem,
        uart: peripherals.uart1,
        audio_tx,
        audio_rx,
        alarm,
        sys_loop: EspSystemEventLoop::take()?,
        nvs: EspDefaultNvsPartition::take()?,
    };

    let poll = thread::Builder::new()
        .name("poll".into())
        .stack_size(POLL_STACK_SIZE)
        .spawn(move || poll_thread(parts))?;

    // Only returns on a fatal startup error
    poll.join().map_err(|_| anyhow!("poll thread panicked"))?
}

fn poll_thread(parts: Parts) -> anyhow::Result<()> {
    let uart = UartDriver::new(
        parts.uart,
        parts.audio_tx,
        parts.audio_rx,
        Option::<AnyIOPin>::None,
        Option::<AnyIOPin>::None,
        &UartConfig::new().baudrate(Hertz(board::AUDIO_BAUD)),
    )?;
    let audio = DfPlayer::new(TimedUart::new(uart, AUDIO_REPLY_TIMEOUT_MS));

    let alarm = Alarm::new(PinDriver::output(parts.alarm)?)?;

    let link = WifiLink::new(parts.modem, parts.sys_loop, parts.nvs, &CREDENTIALS)?;
    let store = FirebaseStore::new(HttpsTransport::new(), &CREDENTIALS);

    let mut controller = Controller::new(link, store, audio, alarm, Config::new());
    let mut delay = FreeRtos;

    let config = controller.config();
    log::info!(
        "Deterrent track {} at volume {}, dwell {} ms, poll every {} ms",
        config.track,
        config.effective_volume(),
        config.dwell_ms,
        config.poll_interval_ms,
    );

    if let Err(e) = controller.start(&mut delay) {
        log::error!("Startup failed, halting: {}", e);
        return Err(e.into());
    }
    log::info!("Firebase client ready for {}", CREDENTIALS.db_url);

    controller.run(&mut delay)
}
