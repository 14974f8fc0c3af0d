//! Pump actuator trait

/// On/off control of one pump channel
///
/// Writes are synchronous and assumed to always succeed. Implementations hold
/// no state beyond whether the pump is currently energized.
pub trait PumpActuator {
    /// Switch the pump on
    fn energize(&mut self);

    /// Switch the pump off
    fn deenergize(&mut self);

    /// Check if the pump is currently on
    fn is_energized(&self) -> bool;
}

impl<T: PumpActuator + ?Sized> PumpActuator for &mut T {
    fn energize(&mut self) {
        (**self).energize();
    }

    fn deenergize(&mut self) {
        (**self).deenergize();
    }

    fn is_energized(&self) -> bool {
        (**self).is_energized()
    }
}
