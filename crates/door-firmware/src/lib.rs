//! ESP32-S3 firmware-specific modules for the door sensor
//!
//! This crate contains the hardware glue that cannot compile on desktop
//! targets: the GPIO edge interrupt, the WPA2-Enterprise station, the
//! embassy-net stack, the TLS connector and build-time secrets. The
//! reporting logic itself lives in `door_core`.

#![no_std]

pub mod console;
pub mod net;
pub mod secrets;
pub mod sensor_pin;
pub mod tls;
