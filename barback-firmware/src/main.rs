//! Barback - Cocktail Rig Firmware
//!
//! Firmware for a Raspberry Pi Pico W driving a bank of relay-switched
//! peristaltic pumps. Dispense batches and emergency stops arrive over MQTT;
//! completion and stop confirmations go back out the same way.
//!
//! The CYW43439 firmware and CLM blobs are not linked into the image. Flash
//! them once to the addresses below:
//!
//! ```text
//! probe-rs download 43439A0.bin --binary-format bin --chip RP2040 --base-address 0x10100000
//! probe-rs download 43439A0_clm.bin --binary-format bin --chip RP2040 --base-address 0x10140000
//! ```

#![no_std]
#![no_main]

use cyw43::JoinOptions;
use cyw43_pio::{PioSpi, DEFAULT_CLOCK_DIVIDER};
use defmt::*;
use embassy_executor::Spawner;
use embassy_net::{Config as NetConfig, StackResources};
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Level, Output};
use embassy_rp::peripherals::PIO0;
use embassy_rp::pio::{InterruptHandler as PioInterruptHandler, Pio};
use embassy_time::{Instant, Timer};
use heapless::Vec;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use barback_core::config::DeviceConfig;
use barback_core::gateway::Gateway;
use barback_core::pump::{PumpScheduler, MAX_PUMPS};
use barback_core::session::DispenseController;
use barback_protocol::{device_id_from_mac, DeviceId, Topics};

use crate::pins::Relay;

mod channels;
mod config;
mod pins;
mod tasks;

bind_interrupts!(struct Irqs {
    PIO0_IRQ_0 => PioInterruptHandler<PIO0>;
});

/// Radio firmware blob location and size
const WIFI_FW_ADDR: usize = 0x1010_0000;
const WIFI_FW_LEN: usize = 230_321;

/// Radio CLM blob location and size
const WIFI_CLM_ADDR: usize = 0x1014_0000;
const WIFI_CLM_LEN: usize = 4_752;

/// Delay between Wi-Fi join attempts
const JOIN_RETRY_MS: u64 = 2_000;

// Static cells for everything tasks borrow for the program lifetime
static DEVICE_CONFIG: StaticCell<DeviceConfig> = StaticCell::new();
static DEVICE_ID: StaticCell<DeviceId> = StaticCell::new();
static TOPICS: StaticCell<Topics> = StaticCell::new();
static CYW43_STATE: StaticCell<cyw43::State> = StaticCell::new();
static NET_RESOURCES: StaticCell<StackResources<3>> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Barback firmware starting...");

    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    let config: &'static DeviceConfig = DEVICE_CONFIG.init(config::load());

    // Relays are claimed and driven off before the radio comes up
    let mut bank = pin_bank!(p);
    let mut relays: Vec<Relay, MAX_PUMPS> = Vec::new();
    for pump in config.pumps.iter() {
        match bank.relay(pump.pin) {
            Ok(relay) => {
                info!(
                    "Pump {} ({}) on GPIO{}{}",
                    pump.number,
                    pump.name.as_str(),
                    pump.pin.pin,
                    if pump.pin.inverted { " (active-low)" } else { "" }
                );
                // Capacity matches MAX_PUMPS, enforced by validation
                let _ = relays.push(relay);
            }
            Err(e) => {
                error!("Pump {}: GPIO{} unusable: {:?}", pump.number, pump.pin.pin, e);
                halt().await;
            }
        }
    }

    let scheduler = match PumpScheduler::new(relays) {
        Ok(scheduler) => scheduler.with_max_run(config.device.max_run_ms),
        Err(e) => {
            error!("Pump scheduler init failed: {:?}", e);
            halt().await
        }
    };
    let controller = DispenseController::new(scheduler);
    info!("{} pumps initialized, all off", controller.scheduler().pump_count());

    // Radio blobs flashed separately, see crate docs
    let (fw, clm) = unsafe {
        (
            core::slice::from_raw_parts(WIFI_FW_ADDR as *const u8, WIFI_FW_LEN),
            core::slice::from_raw_parts(WIFI_CLM_ADDR as *const u8, WIFI_CLM_LEN),
        )
    };

    // Setup CYW43 over PIO SPI
    // Pin assignments are fixed by the Pico W: PWR=GPIO23, DIO=GPIO24, CS=GPIO25, CLK=GPIO29
    let pwr = Output::new(p.PIN_23, Level::Low);
    let cs = Output::new(p.PIN_25, Level::High);
    let mut pio = Pio::new(p.PIO0, Irqs);
    let spi = PioSpi::new(
        &mut pio.common,
        pio.sm0,
        DEFAULT_CLOCK_DIVIDER,
        pio.irq0,
        cs,
        p.PIN_24,
        p.PIN_29,
        p.DMA_CH0,
    );

    let state = CYW43_STATE.init(cyw43::State::new());
    let (net_device, mut control, runner) = cyw43::new(state, pwr, spi, fw).await;
    spawner.spawn(tasks::wifi_task(runner)).unwrap();

    control.init(clm).await;
    control
        .set_power_management(cyw43::PowerManagementMode::PowerSave)
        .await;
    info!("Radio initialized");

    let mac = control.address().await;
    let device_id: &'static DeviceId =
        DEVICE_ID.init(device_id_from_mac(&config.device.id_prefix, &mac));
    info!("Device id {}", device_id.as_str());

    let topics: &'static Topics = match Topics::new(
        &config.mqtt.base_topic,
        &config.mqtt.group,
        device_id,
    ) {
        Ok(topics) => TOPICS.init(topics),
        Err(e) => {
            error!("Topic layout too long: {:?}", e);
            halt().await
        }
    };

    // Network stack (DHCP)
    let seed = u64::from_le_bytes([mac[0], mac[1], mac[2], mac[3], mac[4], mac[5], 0, 0])
        ^ Instant::now().as_ticks();
    let (stack, net_runner) = embassy_net::new(
        net_device,
        NetConfig::dhcpv4(Default::default()),
        NET_RESOURCES.init(StackResources::new()),
        seed,
    );
    spawner.spawn(tasks::net_task(net_runner)).unwrap();

    // Pumps can be stopped from here on, so start the controller before joining
    spawner.spawn(tasks::tick_task(config.device.tick_interval_ms)).unwrap();
    spawner
        .spawn(tasks::controller_task(controller, topics))
        .unwrap();

    loop {
        match control
            .join(&config.wifi.ssid, JoinOptions::new(config.wifi.password.as_bytes()))
            .await
        {
            Ok(()) => break,
            Err(e) => {
                warn!("Wi-Fi join failed (status {}), retrying", e.status);
                Timer::after_millis(JOIN_RETRY_MS).await;
            }
        }
    }
    info!("Joined {}", config.wifi.ssid.as_str());

    let gateway = Gateway::new(topics.clone(), config.device.heartbeat_interval_ms);
    spawner
        .spawn(tasks::mqtt_task(
            stack,
            &config.mqtt,
            device_id.as_str(),
            gateway,
        ))
        .unwrap();

    info!("All tasks spawned, firmware running");

    loop {
        Timer::after_secs(60).await;
        trace!("Main loop heartbeat");
    }
}

/// Park forever after an unrecoverable boot error
///
/// Relays already claimed stay in their off state.
async fn halt() -> ! {
    loop {
        Timer::after_secs(60).await;
    }
}
