//! Build-time provisioned configuration
//!
//! Every value is exported by `build.rs` from `.env`; the build fails if a
//! required one is missing, and numeric values are checked there.

use door_core::config::{ApiConfig, Config, DEFAULT_API_PORT, NetworkConfig, ReportingConfig};

pub const WIFI_SSID: &str = env!("DOOR_WIFI_SSID");
pub const WIFI_IDENTITY: &str = env!("DOOR_WIFI_IDENTITY");
pub const WIFI_USERNAME: &str = env!("DOOR_WIFI_USERNAME");
pub const WIFI_PASSWORD: &str = env!("DOOR_WIFI_PASSWORD");

pub const API_SERVER: &str = env!("DOOR_API_SERVER");
pub const API_PATH: &str = env!("DOOR_API_PATH");
pub const API_KEY: &str = env!("DOOR_API_KEY");

const API_PORT: &str = env!("DOOR_API_PORT");
const API_PERIODIC: &str = env!("DOOR_API_PERIODIC");
const API_PERIODIC_MINUTES: &str = env!("DOOR_API_PERIODIC_MINUTES");

/// Unix time the firmware was built; lower bound for certificate validity checks
pub const BUILD_EPOCH: &str = env!("DOOR_BUILD_EPOCH");

/// DER root the API server's chain must lead to
#[cfg(not(feature = "insecure-api-tls"))]
pub const API_CA_CERT: &[u8] =
    include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/certs/api_ca.der"));

#[cfg(feature = "validate-eap-cert")]
const WIFI_CA_CERT: Option<&str> = Some(include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/certs/wpa2_ca.pem"
)));
#[cfg(not(feature = "validate-eap-cert"))]
const WIFI_CA_CERT: Option<&str> = None;

pub fn config() -> Config<'static> {
    Config {
        network: NetworkConfig {
            ssid: WIFI_SSID,
            identity: WIFI_IDENTITY,
            username: WIFI_USERNAME,
            password: WIFI_PASSWORD,
            ca_cert: WIFI_CA_CERT,
        },
        api: ApiConfig {
            host: API_SERVER,
            path: API_PATH,
            key: API_KEY,
            port: API_PORT.parse().unwrap_or(DEFAULT_API_PORT),
        },
        reporting: ReportingConfig {
            periodic: API_PERIODIC == "true",
            periodic_minutes: API_PERIODIC_MINUTES.parse().unwrap_or(5),
        },
    }
}
