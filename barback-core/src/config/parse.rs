//! Minimal TOML parser for device configuration
//!
//! Handles only the subset the device file uses. It does NOT support the full
//! TOML grammar.
//!
//! Supported:
//! - `key = value` pairs (string, integer, boolean)
//! - `[device]`, `[mqtt]`, `[wifi]` and `[pump.N]` headers
//! - Comments (`# ...`), including after a value
//!
//! ```toml
//! [pump.1]
//! pin = "!gpio3"
//! name = "vodka"
//!
//! [mqtt]
//! host = "172.20.53.121"
//! ```

use heapless::String;

use super::types::{ConfigError, DeviceConfig, PinConfig, PumpConfig};

/// Current parsing context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Root,
    Device,
    Mqtt,
    Wifi,
    /// Index into `DeviceConfig::pumps`
    Pump(usize),
}

/// Parse a device configuration file
///
/// Pumps are sorted by number. The result is not validated against a board;
/// call [`DeviceConfig::validate`] for that.
pub fn parse_config(input: &str) -> Result<DeviceConfig, ConfigError> {
    let mut config = DeviceConfig::new();
    let mut section = Section::Root;

    for line in input.lines() {
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if line.starts_with('[') {
            let header = line
                .strip_suffix(']')
                .ok_or(ConfigError::InvalidSection)?;
            section = open_section(&header[1..], &mut config)?;
            continue;
        }

        let (key, value) = parse_key_value(line).ok_or(ConfigError::InvalidValue)?;
        apply_value(section, key, value, &mut config)?;
    }

    config.pumps.sort_unstable_by_key(|p| p.number);
    Ok(config)
}

fn open_section(header: &str, config: &mut DeviceConfig) -> Result<Section, ConfigError> {
    let header = header.trim();

    if let Some(number) = header.strip_prefix("pump.") {
        let number: u8 = number.parse().map_err(|_| ConfigError::InvalidSection)?;
        if number == 0 {
            return Err(ConfigError::InvalidSection);
        }
        if config.pumps.iter().any(|p| p.number == number) {
            return Err(ConfigError::DuplicatePump);
        }
        config
            .pumps
            .push(PumpConfig {
                number,
                pin: PinConfig::default(),
                name: String::new(),
            })
            .map_err(|_| ConfigError::TooManyPumps)?;
        return Ok(Section::Pump(config.pumps.len() - 1));
    }

    match header {
        "device" => Ok(Section::Device),
        "mqtt" => Ok(Section::Mqtt),
        "wifi" => Ok(Section::Wifi),
        _ => Err(ConfigError::InvalidSection),
    }
}

fn apply_value(
    section: Section,
    key: &str,
    value: &str,
    config: &mut DeviceConfig,
) -> Result<(), ConfigError> {
    match section {
        Section::Root => Err(ConfigError::UnknownKey),
        Section::Pump(index) => {
            let pump = config
                .pumps
                .get_mut(index)
                .ok_or(ConfigError::InvalidSection)?;
            match key {
                "pin" => pump.pin = parse_pin(value)?,
                "name" => pump.name = parse_fixed(value)?,
                _ => return Err(ConfigError::UnknownKey),
            }
            Ok(())
        }
        Section::Device => {
            let device = &mut config.device;
            match key {
                "id_prefix" => device.id_prefix = parse_fixed(value)?,
                "tick_interval_ms" => device.tick_interval_ms = parse_int(value)?,
                "heartbeat_interval_ms" => device.heartbeat_interval_ms = parse_int(value)?,
                "max_run_ms" => device.max_run_ms = parse_int(value)?,
                _ => return Err(ConfigError::UnknownKey),
            }
            Ok(())
        }
        Section::Mqtt => {
            let mqtt = &mut config.mqtt;
            match key {
                "host" => mqtt.host = parse_fixed(value)?,
                "port" => mqtt.port = parse_int(value)?,
                "user" => mqtt.user = parse_fixed(value)?,
                "password" => mqtt.password = parse_fixed(value)?,
                "base_topic" => mqtt.base_topic = parse_fixed(value)?,
                "group" => mqtt.group = parse_fixed(value)?,
                "keep_alive_s" => mqtt.keep_alive_s = parse_int(value)?,
                _ => return Err(ConfigError::UnknownKey),
            }
            Ok(())
        }
        Section::Wifi => {
            let wifi = &mut config.wifi;
            match key {
                "ssid" => wifi.ssid = parse_fixed(value)?,
                "password" => wifi.password = parse_fixed(value)?,
                _ => return Err(ConfigError::UnknownKey),
            }
            Ok(())
        }
    }
}

/// Parse "key = value", dropping a trailing comment
fn parse_key_value(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    let mut value = value.trim();

    if let Some(hash_pos) = value.find('#') {
        // Only a comment if the # is outside a string
        if value[..hash_pos].matches('"').count() % 2 == 0 {
            value = value[..hash_pos].trim();
        }
    }

    if key.is_empty() || value.is_empty() {
        return None;
    }

    Some((key, value))
}

/// Parse a quoted string (unquoted bare words are accepted)
fn parse_string(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

/// Parse a string into a bounded field
fn parse_fixed<const N: usize>(value: &str) -> Result<String<N>, ConfigError> {
    String::try_from(parse_string(value)).map_err(|_| ConfigError::ValueTooLong)
}

/// Parse an integer value
fn parse_int<T: core::str::FromStr>(value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue)
}

/// Parse a pin string like "gpio3" or "!gpio3"
fn parse_pin(value: &str) -> Result<PinConfig, ConfigError> {
    let value = parse_string(value);
    let (inverted, rest) = match value.strip_prefix('!') {
        Some(rest) => (true, rest),
        None => (false, value),
    };

    let pin: u8 = rest
        .strip_prefix("gpio")
        .ok_or(ConfigError::InvalidPin)?
        .parse()
        .map_err(|_| ConfigError::InvalidPin)?;

    Ok(PinConfig { pin, inverted })
}
