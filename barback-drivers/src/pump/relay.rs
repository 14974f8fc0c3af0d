//! Relay pump output
//!
//! A pump switched by a relay module on a GPIO pin. Most hobby relay boards
//! are active-low: the relay closes when the input is pulled low.

use barback_core::traits::PumpActuator;
use barback_hal::OutputPin;

/// Pump driven through a relay
pub struct RelayPump<P> {
    pin: P,
    /// If true, pump ON = pin LOW
    inverted: bool,
    on: bool,
}

impl<P: OutputPin> RelayPump<P> {
    /// Create a relay pump, switched off
    ///
    /// # Arguments
    /// - `pin`: relay input pin
    /// - `inverted`: pump is ON when the pin is LOW (active-low relay board)
    pub fn new(pin: P, inverted: bool) -> Self {
        let mut pump = Self {
            pin,
            inverted,
            on: false,
        };
        pump.drive(false);
        pump
    }

    /// Create a pump on an active-high relay
    pub fn new_active_high(pin: P) -> Self {
        Self::new(pin, false)
    }

    /// Create a pump on an active-low relay
    pub fn new_active_low(pin: P) -> Self {
        Self::new(pin, true)
    }

    /// Check if the relay input is active-low
    pub fn is_inverted(&self) -> bool {
        self.inverted
    }

    /// Give back the pin
    pub fn release(mut self) -> P {
        self.drive(false);
        self.pin
    }

    fn drive(&mut self, on: bool) {
        self.on = on;
        // on XOR inverted
        if on != self.inverted {
            self.pin.set_high();
        } else {
            self.pin.set_low();
        }
    }
}

impl<P: OutputPin> PumpActuator for RelayPump<P> {
    fn energize(&mut self) {
        self.drive(true);
    }

    fn deenergize(&mut self) {
        self.drive(false);
    }

    fn is_energized(&self) -> bool {
        self.on
    }
}
