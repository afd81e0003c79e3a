//! Door sensor level
//!
//! The sensor is a reed switch pulling the input to ground, with the internal
//! pull-up enabled: `High` means the switch is open.

use embedded_hal::digital::InputPin;

/// Point-in-time level of the sensor input. Never cached between cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorLevel {
    Low,
    High,
}

impl SensorLevel {
    /// Sample the pin now.
    pub fn read<P: InputPin>(pin: &mut P) -> Result<Self, P::Error> {
        pin.is_high().map(Self::from)
    }

    /// Wire representation used in the `state` form field
    pub const fn as_digit(self) -> char {
        match self {
            Self::Low => '0',
            Self::High => '1',
        }
    }
}

impl From<bool> for SensorLevel {
    fn from(high: bool) -> Self {
        if high { Self::High } else { Self::Low }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockPin;

    #[test]
    fn test_read_follows_pin() {
        let mut pin = MockPin::new(false);
        assert_eq!(SensorLevel::read(&mut pin).unwrap(), SensorLevel::Low);

        pin.set_high(true);
        assert_eq!(SensorLevel::read(&mut pin).unwrap(), SensorLevel::High);
    }

    #[test]
    fn test_digits() {
        assert_eq!(SensorLevel::Low.as_digit(), '0');
        assert_eq!(SensorLevel::High.as_digit(), '1');
    }
}
