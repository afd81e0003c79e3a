//! Wi-Fi station and network stack tasks
//!
//! Translates esp-radio station state and embassy-net DHCP state into
//! [`NetworkEvent`]s for the shared [`Connectivity`] flag, and performs the
//! connect attempts it asks for.

use door_core::config::NetworkConfig;
use door_core::connectivity::{
    Connectivity, NetworkAction, NetworkEvent, StationLink, wait_for_link_loss,
};
use embassy_net::{Runner, Stack};
use embassy_time::{Duration, Timer};
use esp_radio::wifi::{EapClientConfig, ModeConfig, WifiController, WifiDevice, WifiEvent};
use log::{error, info, warn};

/// Connectivity gate for the reporting loop
pub static CONNECTIVITY: Connectivity = Connectivity::new();

/// Pause before retrying after the driver rejects a connect or start.
const RETRY_DELAY: Duration = Duration::from_secs(5);

/// How often the association state is re-checked while waiting for a disconnect.
const LINK_POLL_INTERVAL: Duration = Duration::from_secs(10);

fn station_config(network: &'static NetworkConfig<'static>) -> ModeConfig {
    let mut eap = EapClientConfig::default()
        .with_ssid(network.ssid.into())
        .with_identity(network.identity.into())
        .with_username(network.username.into())
        .with_password(network.password.into());
    if let Some(ca_cert) = network.ca_cert {
        eap = eap.with_ca_cert(Some(ca_cert.as_bytes()));
    }
    ModeConfig::EapClient(eap)
}

#[embassy_executor::task]
pub async fn connection_task(
    mut controller: WifiController<'static>,
    network: &'static NetworkConfig<'static>,
) -> ! {
    info!("Setting Wi-Fi configuration...");
    let mode = station_config(network);
    while let Err(e) = controller.set_config(&mode) {
        error!("Wi-Fi configuration rejected: {:?}", e);
        Timer::after(RETRY_DELAY).await;
    }
    while let Err(e) = controller.start_async().await {
        error!("Wi-Fi start failed: {:?}", e);
        Timer::after(RETRY_DELAY).await;
    }

    let mut event = NetworkEvent::StationStarted;
    loop {
        if let Some(NetworkAction::Connect) = CONNECTIVITY.handle_event(event) {
            info!("Joining {}", network.ssid);
            match controller.connect_async().await {
                Ok(()) => {
                    info!("Wi-Fi associated");
                    wait_for_link_loss(&mut Station(&mut controller), LINK_POLL_INTERVAL).await;
                    warn!("Wi-Fi disconnected");
                }
                Err(e) => {
                    warn!("Wi-Fi connect failed: {:?}", e);
                    Timer::after(RETRY_DELAY).await;
                }
            }
        }
        event = NetworkEvent::StationDisconnected;
    }
}

struct Station<'a>(&'a mut WifiController<'static>);

impl StationLink for Station<'_> {
    fn is_associated(&self) -> bool {
        matches!(self.0.is_connected(), Ok(true))
    }

    async fn disconnected(&mut self) {
        self.0.wait_for_event(WifiEvent::StaDisconnected).await;
    }
}

/// Reports DHCP leases as [`NetworkEvent::AddressAcquired`].
#[embassy_executor::task]
pub async fn address_task(stack: Stack<'static>) -> ! {
    loop {
        stack.wait_config_up().await;
        if let Some(config) = stack.config_v4() {
            info!("Got IP {}", config.address);
        }
        CONNECTIVITY.handle_event(NetworkEvent::AddressAcquired);
        stack.wait_config_down().await;
    }
}

#[embassy_executor::task]
pub async fn net_task(mut runner: Runner<'static, WifiDevice<'static>>) -> ! {
    runner.run().await
}
