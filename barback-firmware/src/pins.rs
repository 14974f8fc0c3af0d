//! Relay pin bank
//!
//! Pumps are wired to pins named in device.toml, so relay outputs are taken
//! by number at runtime. The radio pins (GPIO23/24/25/29) never enter the
//! bank.

use embassy_rp::gpio::{AnyPin, Level, Output};
use embassy_rp::Peri;

use barback_core::config::PinConfig;
use barback_drivers::pump::RelayPump;
use barback_hal::EhOutput;

/// Number of RP2040 GPIOs
pub const GPIO_COUNT: usize = 30;

/// Pump relay on an embassy GPIO output
pub type Relay = RelayPump<EhOutput<Output<'static>>>;

/// Error when requesting a pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinError {
    /// Pin number out of range or owned by the radio
    Unavailable,
    /// Pin already taken
    AlreadyTaken,
}

/// GPIO pins available for relays
pub struct PinBank {
    pins: [Option<Peri<'static, AnyPin>>; GPIO_COUNT],
}

impl PinBank {
    /// Create from the pins moved out of the peripherals
    pub fn new(pins: [Option<Peri<'static, AnyPin>>; GPIO_COUNT]) -> Self {
        Self { pins }
    }

    /// Take a pin by number
    pub fn take(&mut self, pin: u8) -> Result<Peri<'static, AnyPin>, PinError> {
        let slot = self
            .pins
            .get_mut(usize::from(pin))
            .ok_or(PinError::Unavailable)?;
        slot.take().ok_or(PinError::AlreadyTaken)
    }

    /// Take a pin and drive it as a relay output, switched off
    pub fn relay(&mut self, config: PinConfig) -> Result<Relay, PinError> {
        let pin = self.take(config.pin)?;
        // Off level: high for active-low relays
        let off = if config.inverted {
            Level::High
        } else {
            Level::Low
        };
        let output = EhOutput::new(Output::new(pin, off));
        Ok(RelayPump::new(output, config.inverted))
    }
}

/// Move every non-radio GPIO out of the peripherals into a [`PinBank`]
///
/// ```ignore
/// let mut bank = pin_bank!(p);
/// ```
#[macro_export]
macro_rules! pin_bank {
    ($p:ident) => {
        $crate::pins::PinBank::new([
            Some($p.PIN_0.into()),
            Some($p.PIN_1.into()),
            Some($p.PIN_2.into()),
            Some($p.PIN_3.into()),
            Some($p.PIN_4.into()),
            Some($p.PIN_5.into()),
            Some($p.PIN_6.into()),
            Some($p.PIN_7.into()),
            Some($p.PIN_8.into()),
            Some($p.PIN_9.into()),
            Some($p.PIN_10.into()),
            Some($p.PIN_11.into()),
            Some($p.PIN_12.into()),
            Some($p.PIN_13.into()),
            Some($p.PIN_14.into()),
            Some($p.PIN_15.into()),
            Some($p.PIN_16.into()),
            Some($p.PIN_17.into()),
            Some($p.PIN_18.into()),
            Some($p.PIN_19.into()),
            Some($p.PIN_20.into()),
            Some($p.PIN_21.into()),
            Some($p.PIN_22.into()),
            None, // GPIO23: radio power
            None, // GPIO24: radio data
            None, // GPIO25: radio chip select
            Some($p.PIN_26.into()),
            Some($p.PIN_27.into()),
            Some($p.PIN_28.into()),
            None, // GPIO29: radio clock
        ])
    };
}
