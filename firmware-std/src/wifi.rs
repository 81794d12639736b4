//! Wi-Fi station link on ESP-IDF.

use anyhow::anyhow;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::modem::Modem;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::sys::EspError;
use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};

use elesafe::config::Credentials;
use elesafe::network::NetworkLink;

/// Failed checks between reconnect attempts while the link is down.
/// Re-issuing connect every second would abort an association in progress.
const RECONNECT_EVERY: u32 = 10;

pub struct WifiLink {
    wifi: BlockingWifi<EspWifi<'static>>,
    down_checks: u32,
}

impl WifiLink {
    /// Build the driver and load the station configuration. The radio is
    /// not started until [`NetworkLink::connect`].
    pub fn new(
        modem: Modem,
        sys_loop: EspSystemEventLoop,
        nvs: EspDefaultNvsPartition,
        credentials: &Credentials,
    ) -> anyhow::Result<Self> {
        let mut wifi = BlockingWifi::wrap(
            EspWifi::new(modem, sys_loop.clone(), Some(nvs))?,
            sys_loop,
        )?;

        let auth_method = if credentials.wifi_password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        wifi.set_configuration(&Configuration::Client(ClientConfiguration {
            ssid: credentials
                .wifi_ssid
                .try_into()
                .map_err(|_| anyhow!("Wi-Fi SSID longer than 32 bytes"))?,
            password: credentials
                .wifi_password
                .try_into()
                .map_err(|_| anyhow!("Wi-Fi password longer than 64 bytes"))?,
            auth_method,
            ..Default::default()
        }))?;

        Ok(Self {
            wifi,
            down_checks: 0,
        })
    }
}

impl NetworkLink for WifiLink {
    type Error = EspError;

    fn connect(&mut self) -> Result<(), EspError> {
        if !self.wifi.is_started()? {
            self.wifi.start()?;
        }
        // Non-blocking: association completes in the driver task
        self.wifi.wifi_mut().connect()
    }

    fn is_connected(&mut self) -> bool {
        let up = self.wifi.is_up().unwrap_or(false);
        if up {
            self.down_checks = 0;
        }
        up
    }

    fn maintain(&mut self) {
        self.down_checks += 1;
        if self.down_checks % RECONNECT_EVERY == 0 {
            log::warn!("Wi-Fi still down, re-issuing connect");
            if let Err(e) = self.connect() {
                log::debug!("Wi-Fi connect: {:?}", e);
            }
        }
    }
}
