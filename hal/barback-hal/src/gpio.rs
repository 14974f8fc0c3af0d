//! GPIO output abstraction
//!
//! Relay boards are driven by plain digital outputs. Writes are infallible
//! and take effect immediately on the supported chips.

use core::convert::Infallible;

use embedded_hal::digital::{OutputPin as EhOutputPin, StatefulOutputPin};

/// Logic level of a digital pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Level {
    Low,
    High,
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high {
            Level::High
        } else {
            Level::Low
        }
    }
}

/// Digital output pin
pub trait OutputPin {
    /// Set the pin high (logic 1)
    fn set_high(&mut self);

    /// Set the pin low (logic 0)
    fn set_low(&mut self);

    /// Drive the pin to a specific level
    fn set_level(&mut self, level: Level) {
        match level {
            Level::High => self.set_high(),
            Level::Low => self.set_low(),
        }
    }

    /// Check if the pin is currently driven high
    fn is_set_high(&self) -> bool;

    /// Check if the pin is currently driven low
    fn is_set_low(&self) -> bool {
        !self.is_set_high()
    }
}

/// Adapter from an `embedded-hal` 1.0 stateful output to [`OutputPin`]
///
/// Only pins whose error type is [`Infallible`] are accepted, which covers the
/// embassy GPIO outputs.
pub struct EhOutput<P> {
    pin: P,
    high: bool,
}

impl<P> EhOutput<P>
where
    P: EhOutputPin<Error = Infallible> + StatefulOutputPin,
{
    /// Wrap a pin, sampling its current output latch
    pub fn new(mut pin: P) -> Self {
        let high = match pin.is_set_high() {
            Ok(high) => high,
            Err(never) => match never {},
        };
        Self { pin, high }
    }

    /// Give back the wrapped pin
    pub fn into_inner(self) -> P {
        self.pin
    }
}

impl<P> OutputPin for EhOutput<P>
where
    P: EhOutputPin<Error = Infallible> + StatefulOutputPin,
{
    fn set_high(&mut self) {
        match self.pin.set_high() {
            Ok(()) => self.high = true,
            Err(never) => match never {},
        }
    }

    fn set_low(&mut self) {
        match self.pin.set_low() {
            Ok(()) => self.high = false,
            Err(never) => match never {},
        }
    }

    fn is_set_high(&self) -> bool {
        self.high
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::digital::ErrorType;

    /// Stand-in for an embassy `Output`
    struct LatchPin {
        high: bool,
        writes: u32,
    }

    impl ErrorType for LatchPin {
        type Error = Infallible;
    }

    impl EhOutputPin for LatchPin {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.high = false;
            self.writes += 1;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.high = true;
            self.writes += 1;
            Ok(())
        }
    }

    impl StatefulOutputPin for LatchPin {
        fn is_set_high(&mut self) -> Result<bool, Self::Error> {
            Ok(self.high)
        }

        fn is_set_low(&mut self) -> Result<bool, Self::Error> {
            Ok(!self.high)
        }
    }

    #[test]
    fn test_adapter_samples_initial_latch() {
        let pin = EhOutput::new(LatchPin {
            high: true,
            writes: 0,
        });
        assert!(pin.is_set_high());
        assert_eq!(pin.into_inner().writes, 0);
    }

    #[test]
    fn test_adapter_tracks_writes() {
        let mut pin = EhOutput::new(LatchPin {
            high: false,
            writes: 0,
        });

        pin.set_level(Level::High);
        assert!(pin.is_set_high());

        pin.set_low();
        assert!(pin.is_set_low());

        let inner = pin.into_inner();
        assert!(!inner.high);
        assert_eq!(inner.writes, 2);
    }

    #[test]
    fn test_level_from_bool() {
        assert_eq!(Level::from(true), Level::High);
        assert_eq!(Level::from(false), Level::Low);
    }
}
