//! Build script for barback-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates device.toml at compile time

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

/// Pumps the firmware can drive
const MAX_PUMPS: i64 = 8;

/// RP2040 GPIO count
const GPIO_COUNT: u8 = 30;

/// Pins wired to the CYW43 radio on the Pico W
const RADIO_PINS: [u8; 4] = [23, 24, 25, 29];

fn main() {
    setup_linker();
    validate_config();
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    println!("cargo:rustc-link-search={}", out_dir.display());

    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Validate device.toml at compile time
fn validate_config() {
    println!("cargo:rerun-if-changed=device.toml");

    let config_path = Path::new("device.toml");

    if !config_path.exists() {
        fail(
            "device.toml not found",
            &["The firmware embeds device.toml from the barback-firmware directory.".into()],
        );
    }

    let content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => fail("Failed to read device.toml", &[e.to_string()]),
    };

    let config: toml::Value = match toml::from_str(&content) {
        Ok(value) => value,
        Err(e) => fail(
            "Invalid TOML syntax in device.toml",
            &e.to_string().lines().map(str::to_string).collect::<Vec<_>>(),
        ),
    };

    let mut errors = Vec::new();
    validate_pumps(&config, &mut errors);
    validate_device(&config, &mut errors);
    validate_mqtt(&config, &mut errors);
    validate_wifi(&config, &mut errors);

    if !errors.is_empty() {
        fail("Invalid configuration in device.toml", &errors);
    }

    println!("cargo:warning=device.toml validated successfully");
}

/// Abort the build with a framed error report
fn fail(title: &str, lines: &[String]) -> ! {
    let body = lines
        .iter()
        .map(|line| {
            let line = if line.len() > 62 {
                format!("{}...", &line[..59])
            } else {
                line.clone()
            };
            format!("║  • {:<62} ║", line)
        })
        .collect::<Vec<_>>()
        .join("\n");

    panic!(
        "\n\
        ╔══════════════════════════════════════════════════════════════════╗\n\
        ║  ERROR: {:<56} ║\n\
        ╠══════════════════════════════════════════════════════════════════╣\n\
        {}\n\
        ╚══════════════════════════════════════════════════════════════════╝\n",
        title, body
    );
}

/// Parse "gpioN" / "!gpioN"
fn parse_pin(value: &str) -> Option<u8> {
    value
        .strip_prefix('!')
        .unwrap_or(value)
        .strip_prefix("gpio")?
        .parse()
        .ok()
}

fn validate_pumps(config: &toml::Value, errors: &mut Vec<String>) {
    let pumps = match config.get("pump") {
        Some(toml::Value::Table(t)) if !t.is_empty() => t,
        _ => {
            errors.push("Missing [pump.N] sections, at least one pump is required".into());
            return;
        }
    };

    let mut numbers = Vec::new();
    let mut pins = Vec::new();

    for (key, pump) in pumps {
        match key.parse::<i64>() {
            Ok(n) if (1..=MAX_PUMPS).contains(&n) => numbers.push(n),
            _ => errors.push(format!("[pump.{}] number must be 1-{}", key, MAX_PUMPS)),
        }

        let pump = match pump {
            toml::Value::Table(t) => t,
            _ => {
                errors.push(format!("[pump.{}] must be a table", key));
                continue;
            }
        };

        match pump.get("pin") {
            Some(toml::Value::String(s)) => match parse_pin(s) {
                Some(pin) if pin >= GPIO_COUNT => {
                    errors.push(format!("[pump.{}] gpio{} does not exist", key, pin));
                }
                Some(pin) if RADIO_PINS.contains(&pin) => {
                    errors.push(format!("[pump.{}] gpio{} belongs to the radio", key, pin));
                }
                Some(pin) if pins.contains(&pin) => {
                    errors.push(format!("[pump.{}] gpio{} is already used", key, pin));
                }
                Some(pin) => pins.push(pin),
                None => errors.push(format!("[pump.{}] pin must look like \"!gpio3\"", key)),
            },
            _ => errors.push(format!("[pump.{}] missing 'pin'", key)),
        }

        if let Some(toml::Value::String(name)) = pump.get("name") {
            if name.len() > 16 {
                errors.push(format!("[pump.{}] name longer than 16 characters", key));
            }
        }
    }

    numbers.sort_unstable();
    if numbers.iter().zip(1..).any(|(n, expected)| *n != expected) {
        errors.push("Pump numbers must run 1, 2, 3... without gaps".into());
    }
}

fn validate_device(config: &toml::Value, errors: &mut Vec<String>) {
    let device = match config.get("device") {
        Some(toml::Value::Table(t)) => t,
        _ => return,
    };

    for key in ["tick_interval_ms", "heartbeat_interval_ms", "max_run_ms"] {
        if let Some(value) = device.get(key) {
            match value.as_integer() {
                Some(v) if v > 0 && v <= i64::from(u32::MAX) => {}
                _ => errors.push(format!("[device] {} must be a positive integer", key)),
            }
        }
    }
}

fn validate_mqtt(config: &toml::Value, errors: &mut Vec<String>) {
    let mqtt = match config.get("mqtt") {
        Some(toml::Value::Table(t)) => t,
        _ => {
            errors.push("Missing [mqtt] section".into());
            return;
        }
    };

    match mqtt.get("host") {
        Some(toml::Value::String(host)) => {
            if host.parse::<Ipv4Addr>().is_err() {
                errors.push(format!("[mqtt] host '{}' must be an IPv4 address", host));
            }
        }
        _ => errors.push("[mqtt] missing 'host'".into()),
    }

    if let Some(port) = mqtt.get("port") {
        match port.as_integer() {
            Some(p) if (1..=65535).contains(&p) => {}
            _ => errors.push("[mqtt] port must be 1-65535".into()),
        }
    }
}

fn validate_wifi(config: &toml::Value, errors: &mut Vec<String>) {
    match config.get("wifi").and_then(|w| w.get("ssid")) {
        Some(toml::Value::String(ssid)) if !ssid.is_empty() => {}
        _ => errors.push("[wifi] missing 'ssid'".into()),
    }
}
