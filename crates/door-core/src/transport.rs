//! Secure request transport
//!
//! Runs one exchange per report: connect, write the whole request, forward
//! the response to a sink until the peer closes, then release the
//! connection. Each cycle opens a fresh connection; nothing is reused.
//!
//! ```text
//! Init -> Connected -> Writing -> Reading -> Closed
//!   \________________________________________/^
//!          (any failure goes straight to Closed)
//! ```
//!
//! A session is only closed if [`TlsConnector::connect`] actually produced
//! one; a failed init leaves nothing to release.

use embassy_futures::yield_now;
use embedded_io::{ErrorKind, Write};
use log::{debug, error, info, warn};
use thiserror_no_std::Error;

/// Size of the chunk buffer used while draining the response.
pub const RESPONSE_CHUNK_SIZE: usize = 512;

/// Remote end of the exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint<'a> {
    pub host: &'a str,
    pub port: u16,
}

/// Outcome of a single read or write call on a secure channel
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelError {
    /// The record layer needs more input before this call can progress.
    #[error("channel wants read")]
    WantRead,
    /// The record layer needs to flush output before this call can progress.
    #[error("channel wants write")]
    WantWrite,
    #[error("channel failed: {0:?}")]
    Fatal(ErrorKind),
}

impl ChannelError {
    /// The two "not ready" conditions are retried in place, not failures.
    pub const fn is_transient(self) -> bool {
        matches!(self, Self::WantRead | Self::WantWrite)
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectError {
    #[error("TLS initialisation failed")]
    Init,
    #[error("host lookup failed")]
    Resolve,
    #[error("TCP connect failed")]
    Tcp,
    #[error("TLS handshake failed")]
    Handshake,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(ConnectError),
    #[error("write failed after {written} bytes: {kind:?}")]
    Write { written: usize, kind: ErrorKind },
    #[error("read failed after {received} bytes: {kind:?}")]
    Read { received: usize, kind: ErrorKind },
}

/// An established secure session.
///
/// `read` returning `Ok(0)` means the peer closed the connection.
pub trait TlsSession {
    fn write(&mut self, buf: &[u8]) -> impl Future<Output = Result<usize, ChannelError>>;

    fn read(&mut self, buf: &mut [u8]) -> impl Future<Output = Result<usize, ChannelError>>;

    /// Release the session. Consumes it, so it runs at most once.
    fn close(self) -> impl Future<Output = ()>;
}

/// Opens secure sessions to a remote endpoint.
pub trait TlsConnector {
    type Session<'s>: TlsSession
    where
        Self: 's;

    fn connect<'s>(
        &'s mut self,
        endpoint: Endpoint<'_>,
    ) -> impl Future<Output = Result<Self::Session<'s>, ConnectError>>;
}

/// Byte counts of a completed exchange
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExchangeSummary {
    pub written: usize,
    pub received: usize,
    /// Number of "not ready" results absorbed on either path
    pub retries: u32,
}

impl ExchangeSummary {
    /// Count one "not ready" result. The peer decides how many arrive.
    fn note_retry(&mut self) {
        self.retries = self.retries.saturating_add(1);
    }
}

/// Run one request/response exchange and always release the session.
pub async fn exchange<C, W>(
    connector: &mut C,
    endpoint: Endpoint<'_>,
    request: &[u8],
    sink: &mut W,
) -> Result<ExchangeSummary, TransportError>
where
    C: TlsConnector,
    W: Write,
{
    let mut session = match connector.connect(endpoint).await {
        Ok(session) => session,
        Err(e) => {
            error!("Connection to {}:{} failed: {}", endpoint.host, endpoint.port, e);
            return Err(TransportError::Connect(e));
        }
    };
    info!("Connection established to {}:{}", endpoint.host, endpoint.port);

    let mut summary = ExchangeSummary::default();
    let result = match write_request(&mut session, request, &mut summary).await {
        Ok(()) => drain_response(&mut session, sink, &mut summary).await,
        Err(e) => Err(e),
    };

    session.close().await;
    result.map(|()| summary)
}

async fn write_request<S: TlsSession>(
    session: &mut S,
    request: &[u8],
    summary: &mut ExchangeSummary,
) -> Result<(), TransportError> {
    while summary.written < request.len() {
        match session.write(&request[summary.written..]).await {
            Ok(0) => yield_now().await,
            Ok(n) => {
                debug!("{} bytes written", n);
                summary.written += n;
            }
            Err(e) if e.is_transient() => {
                summary.note_retry();
                yield_now().await;
            }
            Err(e) => {
                error!("Write failed after {} bytes: {}", summary.written, e);
                return Err(TransportError::Write {
                    written: summary.written,
                    kind: fatal_kind(e),
                });
            }
        }
    }
    info!("Request sent ({} bytes)", summary.written);
    Ok(())
}

async fn drain_response<S: TlsSession, W: Write>(
    session: &mut S,
    sink: &mut W,
    summary: &mut ExchangeSummary,
) -> Result<(), TransportError> {
    info!("Reading HTTP response...");
    let mut buf = [0u8; RESPONSE_CHUNK_SIZE];

    loop {
        match session.read(&mut buf).await {
            Ok(0) => {
                info!("Connection closed");
                return Ok(());
            }
            Ok(n) => {
                summary.received += n;
                // Console output is a side channel; losing it does not fail the cycle.
                if sink.write_all(&buf[..n]).is_err() {
                    warn!("Response sink rejected {} bytes", n);
                }
            }
            Err(e) if e.is_transient() => {
                summary.note_retry();
                yield_now().await;
            }
            Err(e) => {
                error!("Read failed after {} bytes: {}", summary.received, e);
                return Err(TransportError::Read {
                    received: summary.received,
                    kind: fatal_kind(e),
                });
            }
        }
    }
}

fn fatal_kind(e: ChannelError) -> ErrorKind {
    match e {
        ChannelError::Fatal(kind) => kind,
        ChannelError::WantRead | ChannelError::WantWrite => ErrorKind::Other,
    }
}
