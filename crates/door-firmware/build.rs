//! Loads device secrets from `.env` and exposes them to the firmware through
//! `env!`. Values already present in the environment take precedence.

use std::env;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

const REQUIRED: &[&str] = &[
    "DOOR_WIFI_SSID",
    "DOOR_WIFI_USERNAME",
    "DOOR_WIFI_PASSWORD",
    "DOOR_API_SERVER",
    "DOOR_API_PATH",
    "DOOR_API_KEY",
];

fn main() {
    println!("cargo:rerun-if-changed=.env");
    println!("cargo:rustc-link-arg=-Tlinkall.x");

    // A missing .env is fine as long as the variables are exported.
    let _ = dotenvy::dotenv();

    for key in REQUIRED {
        let value = required(key);
        emit(key, &value);
    }

    let identity = optional("DOOR_WIFI_IDENTITY").unwrap_or_else(|| required("DOOR_WIFI_USERNAME"));
    emit("DOOR_WIFI_IDENTITY", &identity);

    let port = optional("DOOR_API_PORT").unwrap_or_else(|| "443".into());
    if port.parse::<u16>().is_err() {
        panic!("DOOR_API_PORT must be a port number, got {port:?}");
    }
    emit("DOOR_API_PORT", &port);

    let periodic = optional("DOOR_API_PERIODIC").unwrap_or_else(|| "n".into());
    let periodic = match periodic.to_ascii_lowercase().as_str() {
        "y" | "yes" | "1" | "true" => "true",
        "n" | "no" | "0" | "false" => "false",
        other => panic!("DOOR_API_PERIODIC must be y or n, got {other:?}"),
    };
    emit("DOOR_API_PERIODIC", periodic);

    let minutes = optional("DOOR_API_PERIODIC_MINUTES").unwrap_or_else(|| "5".into());
    if minutes.parse::<u32>().is_err() {
        panic!("DOOR_API_PERIODIC_MINUTES must be a whole number, got {minutes:?}");
    }
    emit("DOOR_API_PERIODIC_MINUTES", &minutes);

    if env::var_os("CARGO_FEATURE_VALIDATE_EAP_CERT").is_some() {
        println!("cargo:rerun-if-changed=certs/wpa2_ca.pem");
    }

    if env::var_os("CARGO_FEATURE_INSECURE_API_TLS").is_none() {
        println!("cargo:rerun-if-changed=certs/api_ca.der");
        if !Path::new("certs/api_ca.der").is_file() {
            panic!(
                "certs/api_ca.der is missing: add the DER root CA of {}, \
                 or build with --features insecure-api-tls",
                required("DOOR_API_SERVER")
            );
        }
    }

    emit("DOOR_BUILD_EPOCH", &build_epoch().to_string());
}

/// Honours SOURCE_DATE_EPOCH so reproducible builds get a fixed value.
fn build_epoch() -> u64 {
    if let Some(epoch) = optional("SOURCE_DATE_EPOCH") {
        return epoch
            .parse()
            .unwrap_or_else(|_| panic!("SOURCE_DATE_EPOCH must be a Unix time, got {epoch:?}"));
    }
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}

fn required(key: &str) -> String {
    optional(key).unwrap_or_else(|| panic!("{key} must be set in .env or the environment"))
}

fn optional(key: &str) -> Option<String> {
    println!("cargo:rerun-if-env-changed={key}");
    env::var(key).ok().filter(|value| !value.is_empty())
}

fn emit(key: &str, value: &str) {
    println!("cargo:rustc-env={key}={value}");
}
