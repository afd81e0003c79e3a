//! Device configuration
//!
//! All values are provisioned outside the core (build-time environment on the
//! firmware, command line on the simulator) and consumed here as already
//! validated strings and flags.

use embassy_time::Duration;
use serde::{Deserialize, Serialize};

/// Port the reporting API listens on unless configured otherwise.
pub const DEFAULT_API_PORT: u16 = 443;

/// Pause after every exchange before waiting for the next trigger.
pub const SETTLE_DELAY: Duration = Duration::from_secs(2);

#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy)]
#[serde(bound(deserialize = "'de: 'a"))]
pub struct Config<'a> {
    pub network: NetworkConfig<'a>,
    pub api: ApiConfig<'a>,
    pub reporting: ReportingConfig,
}

/// WPA2-Enterprise station settings
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy)]
pub struct NetworkConfig<'a> {
    pub ssid: &'a str,
    /// Outer EAP identity
    pub identity: &'a str,
    pub username: &'a str,
    pub password: &'a str,
    /// PEM bundle used to validate the authentication server, if any
    #[serde(borrow)]
    pub ca_cert: Option<&'a str>,
}

/// Where and how reports are posted
#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
pub struct ApiConfig<'a> {
    pub host: &'a str,
    pub path: &'a str,
    pub key: &'a str,
    pub port: u16,
}

impl Default for ApiConfig<'_> {
    fn default() -> Self {
        Self {
            host: "",
            path: "/",
            key: "",
            port: DEFAULT_API_PORT,
        }
    }
}

/// Periodic fallback reporting
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReportingConfig {
    pub periodic: bool,
    pub periodic_minutes: u32,
}

impl ReportingConfig {
    /// Upper bound on the wait between two reports.
    ///
    /// `None` means the loop only wakes on edges. A zero-minute interval is
    /// treated as disabled rather than as a busy loop.
    pub fn periodic_interval(&self) -> Option<Duration> {
        if self.periodic && self.periodic_minutes > 0 {
            Some(Duration::from_secs(u64::from(self.periodic_minutes) * 60))
        } else {
            None
        }
    }
}
