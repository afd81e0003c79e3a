//! Reporting loop
//!
//! A single task that, forever:
//!
//! 1. waits until the network has an address,
//! 2. drops any edge that is already pending (the level read below covers it),
//! 3. samples the sensor,
//! 4. formats the report,
//! 5. runs one secure exchange (success and failure are treated alike),
//! 6. pauses for the settle delay,
//! 7. waits for the next edge or, if periodic reporting is on, the timeout.
//!
//! Every wakeup sends a report; there is no "skip if unchanged".

use embassy_time::{Duration, Timer};
use embedded_hal::digital::{self, Error as _, InputPin};
use embedded_io::Write;
use log::{error, info, warn};
use thiserror_no_std::Error;

use crate::config::{ApiConfig, Config, SETTLE_DELAY};
use crate::connectivity::Connectivity;
use crate::edge::{EdgeNotifier, Wakeup};
use crate::request::{ReportRequest, RequestError};
use crate::sensor::SensorLevel;
use crate::transport::{self, Endpoint, ExchangeSummary, TlsConnector, TransportError};

/// Runtime parameters of the loop
#[derive(Debug, Clone, Copy)]
pub struct ReporterSettings<'a> {
    pub api: ApiConfig<'a>,
    pub settle_delay: Duration,
    /// `None` waits for edges only
    pub periodic_interval: Option<Duration>,
}

impl<'a> ReporterSettings<'a> {
    pub fn from_config(config: &Config<'a>) -> Self {
        Self {
            api: config.api,
            settle_delay: SETTLE_DELAY,
            periodic_interval: config.reporting.periodic_interval(),
        }
    }

    pub fn endpoint(&self) -> Endpoint<'a> {
        Endpoint {
            host: self.api.host,
            port: self.api.port,
        }
    }
}

/// Why a cycle ended without a clean exchange
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleError {
    #[error("sensor read failed: {0:?}")]
    Sensor(digital::ErrorKind),
    #[error("{0}")]
    Request(RequestError),
    #[error("{0}")]
    Transport(TransportError),
}

pub struct Reporter<'a, C, P, W> {
    connectivity: &'a Connectivity,
    edges: &'a EdgeNotifier,
    connector: C,
    pin: P,
    sink: W,
    settings: ReporterSettings<'a>,
}

impl<'a, C, P, W> Reporter<'a, C, P, W>
where
    C: TlsConnector,
    P: InputPin,
    W: Write,
{
    pub fn new(
        connectivity: &'a Connectivity,
        edges: &'a EdgeNotifier,
        connector: C,
        pin: P,
        sink: W,
        settings: ReporterSettings<'a>,
    ) -> Self {
        Self {
            connectivity,
            edges,
            connector,
            pin,
            sink,
            settings,
        }
    }

    /// Run the loop forever. No cycle outcome ever stops it.
    pub async fn run(&mut self) -> ! {
        loop {
            self.step().await;
        }
    }

    /// One full iteration: report, settle, then wait for the next trigger.
    pub async fn step(&mut self) -> Wakeup {
        match self.run_cycle().await {
            Ok(summary) => info!(
                "Request completed ({} bytes sent, {} bytes received)",
                summary.written, summary.received
            ),
            Err(e) => warn!("Request abandoned: {}", e),
        }

        Timer::after(self.settings.settle_delay).await;
        self.wait_for_trigger().await
    }

    /// Steps 1-5: wait for the network, sample, and send one report.
    pub async fn run_cycle(&mut self) -> Result<ExchangeSummary, CycleError> {
        info!("Waiting for network");
        self.connectivity.wait_connected().await;

        self.edges.clear();

        let level = SensorLevel::read(&mut self.pin).map_err(|e| {
            error!("Failed to read sensor pin: {:?}", e.kind());
            CycleError::Sensor(e.kind())
        })?;
        info!("Read sensor level {}", level.as_digit());

        let request = ReportRequest::new(&self.settings.api, level).map_err(|e| {
            error!("Failed to build report: {}", e);
            CycleError::Request(e)
        })?;

        let result = transport::exchange(
            &mut self.connector,
            self.settings.endpoint(),
            request.as_bytes(),
            &mut self.sink,
        )
        .await;

        // Separate successive responses on the console.
        let _ = self.sink.write_all(b"\n");

        result.map_err(CycleError::Transport)
    }

    /// Step 7: block until an edge arrives or the periodic interval elapses.
    pub async fn wait_for_trigger(&self) -> Wakeup {
        let wakeup = self.edges.wait(self.settings.periodic_interval).await;
        match wakeup {
            Wakeup::Edge => info!("Received edge notification"),
            Wakeup::Timeout => info!("Timed out waiting for notification, sending periodic update"),
        }
        wakeup
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub fn connector_mut(&mut self) -> &mut C {
        &mut self.connector
    }

    pub fn sink(&self) -> &W {
        &self.sink
    }
}
