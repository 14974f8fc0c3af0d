//! Device configuration types

use heapless::{String, Vec};

use barback_protocol::DEFAULT_ID_PREFIX;

use crate::gateway::DEFAULT_HEARTBEAT_INTERVAL_MS;
use crate::pump::{DEFAULT_MAX_RUN_MS, MAX_PUMPS};

/// Maximum length of pump names and short identifiers
pub const MAX_NAME_LEN: usize = 16;

/// Maximum length of hosts, users and topic prefixes
pub const MAX_FIELD_LEN: usize = 32;

/// Maximum length of passwords
pub const MAX_SECRET_LEN: usize = 64;

/// Maximum length of the device id prefix
pub const MAX_ID_PREFIX_LEN: usize = 8;

/// Default tick period of the dispense controller
pub const DEFAULT_TICK_INTERVAL_MS: u32 = 10;

/// Default broker port
pub const DEFAULT_MQTT_PORT: u16 = 1883;

/// Default MQTT keep-alive
pub const DEFAULT_KEEP_ALIVE_S: u16 = 60;

/// Configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Unknown or malformed section header
    InvalidSection,
    /// Value has the wrong type or is out of range
    InvalidValue,
    /// Key not valid in its section
    UnknownKey,
    /// Pin string is not `gpioN` / `!gpioN`
    InvalidPin,
    /// String does not fit its field
    ValueTooLong,
    /// No pumps configured
    NoPumps,
    /// More pumps than [`MAX_PUMPS`]
    TooManyPumps,
    /// Same pump number configured twice
    DuplicatePump,
    /// Pump numbers are not `1..=n`
    PumpNumbering,
    /// Two pumps share a pin
    DuplicatePin,
    /// Pin is used by the board itself
    ReservedPin,
    /// Broker host is not an IPv4 address
    InvalidHost,
}

/// Output pin with optional inversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinConfig {
    /// GPIO number
    pub pin: u8,
    /// Pin is active-low
    pub inverted: bool,
}

impl PinConfig {
    /// Active-high pin
    pub const fn new(pin: u8) -> Self {
        Self {
            pin,
            inverted: false,
        }
    }

    /// Active-low pin
    pub const fn inverted(pin: u8) -> Self {
        Self {
            pin,
            inverted: true,
        }
    }
}

/// One pump channel
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PumpConfig {
    /// 1-based pump number used on the wire
    pub number: u8,
    /// Relay control pin
    pub pin: PinConfig,
    /// Label for logs (e.g. "vodka")
    pub name: String<MAX_NAME_LEN>,
}

/// `[device]` section
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceSettings {
    /// Prefix of the MAC-derived device id
    pub id_prefix: String<MAX_ID_PREFIX_LEN>,
    pub tick_interval_ms: u32,
    pub heartbeat_interval_ms: u32,
    /// Single-run safety cap
    pub max_run_ms: u32,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            id_prefix: String::try_from(DEFAULT_ID_PREFIX).unwrap_or_default(),
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            heartbeat_interval_ms: DEFAULT_HEARTBEAT_INTERVAL_MS,
            max_run_ms: DEFAULT_MAX_RUN_MS,
        }
    }
}

/// `[mqtt]` section
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MqttConfig {
    /// Broker IPv4 address
    pub host: String<MAX_FIELD_LEN>,
    pub port: u16,
    pub user: String<MAX_FIELD_LEN>,
    pub password: String<MAX_SECRET_LEN>,
    /// Command topic prefix, e.g. `Group5/ReactNative`
    pub base_topic: String<MAX_FIELD_LEN>,
    /// Device topic prefix, e.g. `Group5`
    pub group: String<MAX_NAME_LEN>,
    pub keep_alive_s: u16,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_MQTT_PORT,
            user: String::new(),
            password: String::new(),
            base_topic: String::try_from("Group5/ReactNative").unwrap_or_default(),
            group: String::try_from("Group5").unwrap_or_default(),
            keep_alive_s: DEFAULT_KEEP_ALIVE_S,
        }
    }
}

impl MqttConfig {
    /// Broker address as octets
    pub fn host_octets(&self) -> Result<[u8; 4], ConfigError> {
        parse_ipv4(&self.host)
    }
}

/// `[wifi]` section
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WifiConfig {
    pub ssid: String<MAX_FIELD_LEN>,
    pub password: String<MAX_SECRET_LEN>,
}

/// Pin constraints of a board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BoardLimits {
    /// Pins are `0..gpio_count`
    pub gpio_count: u8,
    /// Pins the board wires to on-board peripherals
    pub reserved: &'static [u8],
}

impl BoardLimits {
    /// Raspberry Pi Pico W (GPIO23/24/25/29 belong to the radio)
    pub const PICO_W: Self = Self {
        gpio_count: 30,
        reserved: &[23, 24, 25, 29],
    };

    /// Check that a pin can drive a relay
    pub fn check_pin(&self, pin: u8) -> Result<(), ConfigError> {
        if pin >= self.gpio_count {
            return Err(ConfigError::InvalidPin);
        }
        if self.reserved.contains(&pin) {
            return Err(ConfigError::ReservedPin);
        }
        Ok(())
    }
}

/// Complete device configuration
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceConfig {
    /// Pump channels, sorted by number
    pub pumps: Vec<PumpConfig, MAX_PUMPS>,
    pub device: DeviceSettings,
    pub mqtt: MqttConfig,
    pub wifi: WifiConfig,
}

impl DeviceConfig {
    /// Empty configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Four active-low relays on GPIO3..6
    ///
    /// No broker host is set, so this does not validate on its own.
    pub fn reference() -> Self {
        let mut config = Self::new();
        for (number, name) in (1u8..=4).zip(["pump1", "pump2", "pump3", "pump4"]) {
            let _ = config.pumps.push(PumpConfig {
                number,
                pin: PinConfig::inverted(number + 2),
                name: String::try_from(name).unwrap_or_default(),
            });
        }
        config
    }

    /// Check the pump table and settings against a board
    pub fn validate(&self, board: &BoardLimits) -> Result<(), ConfigError> {
        if self.pumps.is_empty() {
            return Err(ConfigError::NoPumps);
        }

        for (i, pump) in self.pumps.iter().enumerate() {
            if usize::from(pump.number) != i + 1 {
                return Err(ConfigError::PumpNumbering);
            }
            board.check_pin(pump.pin.pin)?;
            if self.pumps[..i].iter().any(|p| p.pin.pin == pump.pin.pin) {
                return Err(ConfigError::DuplicatePin);
            }
        }

        let device = &self.device;
        if device.tick_interval_ms == 0
            || device.heartbeat_interval_ms == 0
            || device.max_run_ms == 0
        {
            return Err(ConfigError::InvalidValue);
        }

        // The broker is only reachable by address
        self.mqtt.host_octets()?;

        Ok(())
    }
}

/// Parse a dotted-quad IPv4 address
fn parse_ipv4(s: &str) -> Result<[u8; 4], ConfigError> {
    let mut octets = [0u8; 4];
    let mut parts = s.split('.');
    for octet in octets.iter_mut() {
        let part = parts.next().ok_or(ConfigError::InvalidHost)?;
        if part.is_empty() || part.len() > 3 || !part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ConfigError::InvalidHost);
        }
        *octet = part.parse().map_err(|_| ConfigError::InvalidHost)?;
    }
    if parts.next().is_some() {
        return Err(ConfigError::InvalidHost);
    }
    Ok(octets)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reference pumps with a reachable broker
    fn reference_with_broker() -> DeviceConfig {
        let mut config = DeviceConfig::reference();
        config.mqtt.host = String::try_from("172.20.53.121").unwrap();
        config
    }

    #[test]
    fn test_reference_config_is_valid() {
        let config = reference_with_broker();
        assert_eq!(config.pumps.len(), 4);
        assert_eq!(config.pumps[0].pin, PinConfig::inverted(3));
        assert_eq!(config.pumps[3].pin, PinConfig::inverted(6));
        assert_eq!(config.validate(&BoardLimits::PICO_W), Ok(()));
    }

    #[test]
    fn test_validate_requires_broker_host() {
        let config = DeviceConfig::reference();
        assert_eq!(
            config.validate(&BoardLimits::PICO_W),
            Err(ConfigError::InvalidHost)
        );
    }

    #[test]
    fn test_validate_rejects_zero_intervals() {
        let mut config = reference_with_broker();
        config.device.max_run_ms = 0;
        assert_eq!(
            config.validate(&BoardLimits::PICO_W),
            Err(ConfigError::InvalidValue)
        );

        let mut config = reference_with_broker();
        config.device.tick_interval_ms = 0;
        assert_eq!(
            config.validate(&BoardLimits::PICO_W),
            Err(ConfigError::InvalidValue)
        );
    }

    #[test]
    fn test_defaults() {
        let config = DeviceConfig::new();
        assert_eq!(config.device.id_prefix, "bar_");
        assert_eq!(config.device.tick_interval_ms, 10);
        assert_eq!(config.device.heartbeat_interval_ms, 30_000);
        assert_eq!(config.device.max_run_ms, 300_000);
        assert_eq!(config.mqtt.port, 1883);
        assert_eq!(config.mqtt.base_topic, "Group5/ReactNative");
    }

    #[test]
    fn test_validate_rejects_empty() {
        assert_eq!(
            DeviceConfig::new().validate(&BoardLimits::PICO_W),
            Err(ConfigError::NoPumps)
        );
    }

    #[test]
    fn test_validate_rejects_duplicate_pin() {
        let mut config = reference_with_broker();
        config.pumps[2].pin = PinConfig::new(3);
        assert_eq!(
            config.validate(&BoardLimits::PICO_W),
            Err(ConfigError::DuplicatePin)
        );
    }

    #[test]
    fn test_validate_rejects_board_pins() {
        let mut config = reference_with_broker();
        config.pumps[0].pin = PinConfig::inverted(25);
        assert_eq!(
            config.validate(&BoardLimits::PICO_W),
            Err(ConfigError::ReservedPin)
        );

        config.pumps[0].pin = PinConfig::inverted(30);
        assert_eq!(
            config.validate(&BoardLimits::PICO_W),
            Err(ConfigError::InvalidPin)
        );
    }

    #[test]
    fn test_validate_rejects_gaps_in_numbering() {
        let mut config = reference_with_broker();
        config.pumps[1].number = 5;
        assert_eq!(
            config.validate(&BoardLimits::PICO_W),
            Err(ConfigError::PumpNumbering)
        );
    }

    #[test]
    fn test_host_octets() {
        let mut mqtt = MqttConfig::default();
        mqtt.host = String::try_from("172.20.53.121").unwrap();
        assert_eq!(mqtt.host_octets(), Ok([172, 20, 53, 121]));

        for bad in ["", "1.2.3", "1.2.3.4.5", "256.1.1.1", "broker.local", "1..2.3"] {
            mqtt.host = String::try_from(bad).unwrap();
            assert_eq!(mqtt.host_octets(), Err(ConfigError::InvalidHost), "{}", bad);
        }
    }
}
