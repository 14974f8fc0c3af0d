//! Device configuration loading
//!
//! device.toml is compiled into the image (and checked by build.rs). It is
//! parsed once at boot.

use defmt::*;

use barback_core::config::{parse_config, BoardLimits, DeviceConfig};

/// Embedded configuration
/// Edit device.toml and rebuild to customize
const EMBEDDED_CONFIG: &str = include_str!("../../device.toml");

/// Parse and validate the embedded configuration
///
/// Falls back to the reference relay layout if the file does not parse or
/// does not fit the board. Network credentials are kept from the file when
/// it parses.
pub fn load() -> DeviceConfig {
    let config = match parse_config(EMBEDDED_CONFIG) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to parse embedded config: {:?}", e);
            error!("Using reference pump layout with default settings");
            return DeviceConfig::reference();
        }
    };

    match config.validate(&BoardLimits::PICO_W) {
        Ok(()) => {
            info!("Configuration loaded: {} pumps", config.pumps.len());
            config
        }
        Err(e) => {
            error!("Embedded config rejected: {:?}", e);
            error!("Using reference pump layout");
            let mut fallback = DeviceConfig::reference();
            fallback.mqtt = config.mqtt;
            fallback.wifi = config.wifi;
            fallback
        }
    }
}
