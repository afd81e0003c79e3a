//! Hardware-independent core library for the door-sensor device
//!
//! This crate contains the event-driven reporting loop and everything it
//! coordinates: the connectivity gate, the coalescing edge notifier, the
//! report request format and the one-shot secure request exchange.
//!
//! It is `#![no_std]` so it compiles on both the embedded target (ESP32-S3)
//! and desktop hosts (for the simulator and tests). Hardware and network
//! specifics are reached only through traits (`embedded_hal` input pins,
//! [`transport::TlsConnector`], `embedded_io` sinks).

#![no_std]

pub mod config;
pub mod connectivity;
pub mod edge;
pub mod reporter;
pub mod request;
pub mod sensor;
pub mod transport;

#[cfg(test)]
mod testing;
