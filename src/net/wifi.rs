use std::thread;
use std::time::{Duration, Instant};

use esp_idf_svc::wifi::*;
use log::{info, warn};

use crate::config::WIFI_CONNECT_TIMEOUT_MS;
use crate::error::{MonitorError, Result};

const CONNECT_POLL: Duration = Duration::from_millis(500);

pub struct WifiManager {
    wifi: BlockingWifi<EspWifi<'static>>,
}

impl WifiManager {
    pub fn new(wifi: BlockingWifi<EspWifi<'static>>) -> Self {
        Self { wifi }
    }

    /// Configure station mode and start the driver.  Does not associate.
    pub fn configure(&mut self, ssid: &str, password: &str) -> Result<()> {
        let auth_method = if password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };

        let wifi_configuration: Configuration = Configuration::Client(ClientConfiguration {
            ssid: ssid
                .try_into()
                .map_err(|_| MonitorError::WifiConnection("Invalid SSID".to_string()))?,
            bssid: None,
            auth_method,
            password: password
                .try_into()
                .map_err(|_| MonitorError::WifiConnection("Invalid password".to_string()))?,
            channel: None,
            ..Default::default()
        });

        self.wifi.set_configuration(&wifi_configuration)?;

        self.wifi.start()?;
        info!("WiFi started");
        Ok(())
    }

    /// Associate, waiting at most `WIFI_CONNECT_TIMEOUT_MS`.
    pub fn connect(&mut self) -> Result<()> {
        self.wifi.wifi_mut().connect()?;

        let start = Instant::now();
        let timeout = Duration::from_millis(WIFI_CONNECT_TIMEOUT_MS);
        while !self.is_connected() {
            if start.elapsed() > timeout {
                let _ = self.wifi.wifi_mut().disconnect();
                return Err(MonitorError::WifiConnection(format!(
                    "no association after {} ms",
                    WIFI_CONNECT_TIMEOUT_MS
                )));
            }
            thread::sleep(CONNECT_POLL);
        }
        info!("WiFi connected");

        self.wifi.wait_netif_up()?;
        let ip_info = self.wifi.wifi().sta_netif().get_ip_info()?;
        info!("WiFi DHCP info: {:?}", ip_info);

        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.wifi.is_connected().unwrap_or(false)
    }

    pub fn reconnect(&mut self) {
        let _ = self.wifi.wifi_mut().disconnect();
        if let Err(e) = self.connect() {
            warn!("WiFi reconnect failed: {}", e);
        }
    }
}
