//! Desktop simulator for the door-sensor reporting loop.
//!
//! Runs the real `door_core` reporter on the host. The network "joins" a
//! moment after start-up, and the API server is an in-process loopback that
//! answers every report with a canned HTTP/1.0 response. The door is driven
//! from stdin.
//!
//! # Commands
//!
//! | Input | Action                                   |
//! |-------|------------------------------------------|
//! | o     | Open the door (level high) and fire edge |
//! | c     | Close the door (level low) and fire edge |
//! | b     | Bounce: five edges without a change      |
//! | d     | Drop the Wi-Fi link (rejoins by itself)  |
//! | q     | Quit                                     |
//!
//! Set `DOOR_API_KEY` to change the key sent in reports.

use std::io::{BufRead, Write as _};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread;

use door_core::config::{ApiConfig, Config, ReportingConfig};
use door_core::connectivity::{Connectivity, NetworkAction, NetworkEvent};
use door_core::edge::EdgeNotifier;
use door_core::reporter::{Reporter, ReporterSettings};
use door_core::transport::{ChannelError, ConnectError, Endpoint, TlsConnector, TlsSession};
use embassy_time::Duration;
use log::{info, warn};

// ---------------------------------------------------------------------------
// Simulation constants
// ---------------------------------------------------------------------------

/// Time the simulated station takes to get an address.
const JOIN_DELAY: std::time::Duration = std::time::Duration::from_millis(800);

/// Periodic fallback, shortened so it can be observed.
const PERIODIC_INTERVAL: Duration = Duration::from_secs(30);

const RESPONSE: &[u8] = b"HTTP/1.0 200 OK\r\nContent-Type: text/plain\r\n\r\nstate recorded";

static CONNECTIVITY: Connectivity = Connectivity::new();
static EDGES: EdgeNotifier = EdgeNotifier::new();
static DOOR_OPEN: AtomicBool = AtomicBool::new(false);

// ---------------------------------------------------------------------------
// Simulated hardware
// ---------------------------------------------------------------------------

/// Door input backed by [`DOOR_OPEN`].
struct SimulatedPin;

impl embedded_hal::digital::ErrorType for SimulatedPin {
    type Error = core::convert::Infallible;
}

impl embedded_hal::digital::InputPin for SimulatedPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(DOOR_OPEN.load(Ordering::Acquire))
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!DOOR_OPEN.load(Ordering::Acquire))
    }
}

/// Response sink printing to stdout.
struct Stdout;

impl embedded_io::ErrorType for Stdout {
    type Error = core::convert::Infallible;
}

impl embedded_io::Write for Stdout {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        let mut out = std::io::stdout().lock();
        let _ = out.write_all(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        let _ = std::io::stdout().flush();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Loopback API server
// ---------------------------------------------------------------------------

/// Accepts every connection while the simulated link is up.
struct LoopbackConnector;

impl TlsConnector for LoopbackConnector {
    type Session<'s> = LoopbackSession;

    async fn connect<'s>(&'s mut self, endpoint: Endpoint<'_>) -> Result<LoopbackSession, ConnectError> {
        if !CONNECTIVITY.is_connected() {
            return Err(ConnectError::Tcp);
        }
        info!("[server] accepted connection for {}:{}", endpoint.host, endpoint.port);
        Ok(LoopbackSession {
            request: Vec::new(),
            reads: 0,
        })
    }
}

struct LoopbackSession {
    request: Vec<u8>,
    reads: usize,
}

impl TlsSession for LoopbackSession {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, ChannelError> {
        self.request.extend_from_slice(buf);
        Ok(buf.len())
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, ChannelError> {
        self.reads += 1;
        match self.reads {
            // Mimic a record layer that needs another round trip first.
            1 => Err(ChannelError::WantRead),
            2 => {
                let n = RESPONSE.len().min(buf.len());
                buf[..n].copy_from_slice(&RESPONSE[..n]);
                Ok(n)
            }
            _ => Ok(0),
        }
    }

    async fn close(self) {
        let request = String::from_utf8_lossy(&self.request);
        let body = request.rsplit("\r\n\r\n").next().unwrap_or_default();
        info!("[server] received report: {}", body);
    }
}

// ---------------------------------------------------------------------------
// Network and input threads
// ---------------------------------------------------------------------------

fn spawn_network(events: mpsc::Receiver<NetworkEvent>) {
    thread::spawn(move || {
        for event in events {
            if let Some(NetworkAction::Connect) = CONNECTIVITY.handle_event(event) {
                info!("[wifi] joining...");
                thread::sleep(JOIN_DELAY);
                CONNECTIVITY.handle_event(NetworkEvent::AddressAcquired);
            }
        }
    });
}

fn spawn_input(network: mpsc::Sender<NetworkEvent>) {
    thread::spawn(move || {
        let edge = EDGES.trigger();
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            match line.trim() {
                "o" => {
                    DOOR_OPEN.store(true, Ordering::Release);
                    edge.fire();
                }
                "c" => {
                    DOOR_OPEN.store(false, Ordering::Release);
                    edge.fire();
                }
                "b" => (0..5).for_each(|_| edge.fire()),
                "d" => {
                    if network.send(NetworkEvent::StationDisconnected).is_err() {
                        break;
                    }
                }
                "q" => std::process::exit(0),
                "" => {}
                other => warn!("unknown command {:?} (o, c, b, d, q)", other),
            }
        }
    });
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let key = std::env::var("DOOR_API_KEY").unwrap_or_else(|_| "ABCD".into());
    let config = Config {
        api: ApiConfig {
            host: "api.example.org",
            path: "/door",
            key: Box::leak(key.into_boxed_str()),
            ..ApiConfig::default()
        },
        reporting: ReportingConfig {
            periodic: true,
            periodic_minutes: 5,
        },
        ..Config::default()
    };

    let mut settings = ReporterSettings::from_config(&config);
    settings.periodic_interval = Some(PERIODIC_INTERVAL);

    let (network_tx, network_rx) = mpsc::channel();
    spawn_network(network_rx);
    spawn_input(network_tx.clone());

    let mut reporter = Reporter::new(
        &CONNECTIVITY,
        &EDGES,
        LoopbackConnector,
        SimulatedPin,
        Stdout,
        settings,
    );

    info!("door simulator running: o=open c=close b=bounce d=drop link q=quit");
    let _ = network_tx.send(NetworkEvent::StationStarted);

    futures::executor::block_on(reporter.run())
}
