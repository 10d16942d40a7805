//! WiFi station for ESP32.
//!
//! Provides synchronous station-mode association using esp-idf-svc. The
//! station advertises the application identifier as its DHCP hostname and
//! reassociates on its own after the access point drops it.
//!
//! # Example
//!
//! ```ignore
//! use sensor_node::hal::esp32::Esp32Wifi;
//! use sensor_node::config::WifiConfig;
//!
//! let config = WifiConfig::default()
//!     .with_ssid("resin-hotspot")
//!     .with_password("resin-hotspot");
//!
//! let mut wifi = Esp32Wifi::new(modem, sysloop, nvs, &config, "336141")?;
//! wifi.associate()?;
//! log::info!("IP: {:?}", wifi.ip_addr());
//! ```

use std::net::Ipv4Addr;

use anyhow::{anyhow, Context};
use esp_idf_hal::modem::Modem;
use esp_idf_svc::eventloop::{EspSubscription, EspSystemEventLoop, System};
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{
    AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi, WifiEvent,
};
use log::{info, warn};

use crate::config::WifiConfig;
use crate::traits::NetworkLink;

/// WiFi station owned by the control loop.
///
/// After the first [`Esp32Wifi::associate`] the loop only observes the
/// link through [`NetworkLink`]; reassociation is event driven.
pub struct Esp32Wifi<'a> {
    wifi: BlockingWifi<EspWifi<'a>>,
    _auto_reconnect: EspSubscription<'static, System>,
}

impl<'a> Esp32Wifi<'a> {
    /// Configure and start the station without associating yet.
    ///
    /// This will:
    /// 1. Initialize the WiFi driver
    /// 2. Set the station hostname to `hostname`
    /// 3. Configure station mode with the provided credentials
    /// 4. Start the radio and arm automatic reassociation
    ///
    /// # Errors
    ///
    /// Returns an error if initialization fails or the credentials do not
    /// fit the driver's buffers.
    pub fn new(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: Option<EspDefaultNvsPartition>,
        config: &WifiConfig,
        hostname: &str,
    ) -> anyhow::Result<Self> {
        let mut esp_wifi = EspWifi::new(modem, sysloop.clone(), nvs)?;
        esp_wifi
            .sta_netif_mut()
            .set_hostname(hostname)
            .context("failed to set station hostname")?;

        let mut wifi = BlockingWifi::wrap(esp_wifi, sysloop.clone())?;

        let auth_method = if config.password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPAWPA2Personal
        };

        wifi.set_configuration(&Configuration::Client(ClientConfiguration {
            ssid: config
                .ssid
                .as_str()
                .try_into()
                .map_err(|_| anyhow!("wifi ssid too long"))?,
            password: config
                .password
                .as_str()
                .try_into()
                .map_err(|_| anyhow!("wifi password too long"))?,
            auth_method,
            ..Default::default()
        }))?;

        wifi.start()?;
        info!("wifi started as `{}`", hostname);

        let auto_reconnect = sysloop.subscribe::<WifiEvent, _>(|event| {
            if matches!(event, WifiEvent::StaDisconnected { .. }) {
                warn!("wifi association lost, reassociating");
                // Safe: non-blocking request to the already started driver
                unsafe { esp_idf_svc::sys::esp_wifi_connect() };
            }
        })?;

        Ok(Self {
            wifi,
            _auto_reconnect: auto_reconnect,
        })
    }

    /// Connect and wait for an address.
    ///
    /// # Errors
    ///
    /// Returns an error if the access point cannot be joined or DHCP times
    /// out. The station keeps retrying in the background either way.
    pub fn associate(&mut self) -> anyhow::Result<()> {
        info!("connecting to access point");
        self.wifi.connect()?;
        self.wifi.wait_netif_up()?;
        if let Some(ip) = self.ip_addr() {
            info!("wifi connected, IP {}", ip);
        }
        Ok(())
    }

    /// Get the current IP address, if connected.
    pub fn ip_addr(&self) -> Option<Ipv4Addr> {
        self.wifi
            .wifi()
            .sta_netif()
            .get_ip_info()
            .ok()
            .map(|info| info.ip)
    }
}

impl NetworkLink for Esp32Wifi<'_> {
    fn is_associated(&self) -> bool {
        self.wifi.is_connected().unwrap_or(false)
    }
}
