//! Door sensor input pin and its edge interrupt
//!
//! The pin is owned by a critical-section mutex so the interrupt handler can
//! acknowledge the interrupt while the reporting task samples the level.

use core::cell::RefCell;

use critical_section::Mutex;
use door_core::edge::EdgeNotifier;
use embedded_hal::digital::{Error, ErrorKind, ErrorType, InputPin};
use esp_hal::gpio::{Event, Input, InputConfig, Io, Pull};
use esp_hal::{handler, ram};

/// Edge wakeups for the reporting loop
pub static EDGES: EdgeNotifier = EdgeNotifier::new();

static SENSOR: Mutex<RefCell<Option<Input<'static>>>> = Mutex::new(RefCell::new(None));

/// Configure the sensor pin with pull-up and interrupt on both edges.
///
/// Call only after the reporting task has been spawned.
pub fn arm(io: &mut Io<'_>, pin: esp_hal::peripherals::GPIO4<'static>) {
    io.set_interrupt_handler(sensor_edge_handler);

    let mut input = Input::new(pin, InputConfig::default().with_pull(Pull::Up));
    critical_section::with(|cs| {
        input.listen(Event::AnyEdge);
        SENSOR.borrow_ref_mut(cs).replace(input);
    });
}

#[handler]
#[ram]
fn sensor_edge_handler() {
    critical_section::with(|cs| {
        if let Some(pin) = SENSOR.borrow_ref_mut(cs).as_mut() {
            if pin.is_interrupt_set() {
                pin.clear_interrupt();
            }
        }
    });
    EDGES.trigger().fire();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorPinError {
    /// Sampled before [`arm`] handed the pin over
    NotConfigured,
}

impl Error for SensorPinError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// Reads the pin owned by the interrupt mutex.
pub struct SharedSensorPin;

impl ErrorType for SharedSensorPin {
    type Error = SensorPinError;
}

impl InputPin for SharedSensorPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        critical_section::with(|cs| {
            SENSOR
                .borrow_ref(cs)
                .as_ref()
                .map(|pin| pin.is_high())
                .ok_or(SensorPinError::NotConfigured)
        })
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|high| !high)
    }
}
