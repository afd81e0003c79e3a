//! TLS connector over the embassy-net TCP stack
//!
//! Each [`connect`](TlsConnector::connect) resolves the host, opens a TCP
//! socket and runs a TLS 1.3 handshake with embedded-tls. All buffers are
//! owned by a single static [`TlsBuffers`] lent to the session, so only one
//! session can exist at a time.
//!
//! The server's chain is verified against the embedded API CA
//! (`secrets::API_CA_CERT`) and its name against the
//! configured host. The `insecure-api-tls` feature skips both.

use door_core::transport::{ChannelError, ConnectError, Endpoint, TlsConnector, TlsSession};
use embassy_net::Stack;
use embassy_net::dns::DnsQueryType;
use embassy_net::tcp::TcpSocket;
use embedded_io::ErrorKind;
use embedded_tls::{Aes128GcmSha256, TlsConfig, TlsConnection, TlsContext, TlsError};
use esp_hal::rng::Rng;
use log::{debug, error, warn};

#[cfg(feature = "insecure-api-tls")]
use embedded_tls::UnsecureProvider;
#[cfg(not(feature = "insecure-api-tls"))]
use verify::VerifyingProvider;

const TCP_RX_SIZE: usize = 4096;
const TCP_TX_SIZE: usize = 4096;
/// Largest TLS record plus overhead
const TLS_READ_SIZE: usize = 16640;
const TLS_WRITE_SIZE: usize = 4096;

pub struct TlsBuffers {
    tcp_rx: [u8; TCP_RX_SIZE],
    tcp_tx: [u8; TCP_TX_SIZE],
    tls_read: [u8; TLS_READ_SIZE],
    tls_write: [u8; TLS_WRITE_SIZE],
}

impl TlsBuffers {
    pub const fn new() -> Self {
        Self {
            tcp_rx: [0; TCP_RX_SIZE],
            tcp_tx: [0; TCP_TX_SIZE],
            tls_read: [0; TLS_READ_SIZE],
            tls_write: [0; TLS_WRITE_SIZE],
        }
    }
}

impl Default for TlsBuffers {
    fn default() -> Self {
        Self::new()
    }
}

/// `rand_core` adapter for the hardware RNG.
///
/// Output is only true-random while the radio is running.
pub struct HardwareRng(Rng);

impl HardwareRng {
    pub fn new(rng: Rng) -> Self {
        Self(rng)
    }
}

impl rand_core::RngCore for HardwareRng {
    fn next_u32(&mut self) -> u32 {
        self.0.random()
    }

    fn next_u64(&mut self) -> u64 {
        (u64::from(self.0.random()) << 32) | u64::from(self.0.random())
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let word = self.0.random().to_le_bytes();
            chunk.copy_from_slice(&word[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl rand_core::CryptoRng for HardwareRng {}

pub struct EspTlsConnector {
    stack: Stack<'static>,
    rng: HardwareRng,
    buffers: &'static mut TlsBuffers,
}

impl EspTlsConnector {
    pub fn new(stack: Stack<'static>, rng: HardwareRng, buffers: &'static mut TlsBuffers) -> Self {
        Self {
            stack,
            rng,
            buffers,
        }
    }
}

impl TlsConnector for EspTlsConnector {
    type Session<'s> = EspTlsSession<'s>;

    async fn connect<'s>(
        &'s mut self,
        endpoint: Endpoint<'_>,
    ) -> Result<EspTlsSession<'s>, ConnectError> {
        let addresses = self
            .stack
            .dns_query(endpoint.host, DnsQueryType::A)
            .await
            .map_err(|e| {
                error!("DNS lookup for {} failed: {:?}", endpoint.host, e);
                ConnectError::Resolve
            })?;
        let address = *addresses.first().ok_or(ConnectError::Resolve)?;

        let TlsBuffers {
            tcp_rx,
            tcp_tx,
            tls_read,
            tls_write,
        } = &mut *self.buffers;

        let mut socket = TcpSocket::new(self.stack, tcp_rx, tcp_tx);
        if let Err(e) = socket.connect((address, endpoint.port)).await {
            error!("TCP connect to {} failed: {:?}", address, e);
            socket.abort();
            return Err(ConnectError::Tcp);
        }

        let config = TlsConfig::new().with_server_name(endpoint.host);
        let mut tls = TlsConnection::new(socket, tls_read, tls_write);

        #[cfg(not(feature = "insecure-api-tls"))]
        let provider = VerifyingProvider::new(&mut self.rng);
        #[cfg(feature = "insecure-api-tls")]
        let provider = {
            warn!("API certificate verification is disabled");
            UnsecureProvider::new::<Aes128GcmSha256>(&mut self.rng)
        };

        if let Err(e) = tls.open(TlsContext::new(&config, provider)).await {
            error!("TLS handshake with {} failed: {:?}", endpoint.host, e);
            return Err(ConnectError::Handshake);
        }

        Ok(EspTlsSession { tls })
    }
}

pub struct EspTlsSession<'s> {
    tls: TlsConnection<'s, TcpSocket<'s>, Aes128GcmSha256>,
}

impl TlsSession for EspTlsSession<'_> {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, ChannelError> {
        let written = self.tls.write(buf).await.map_err(channel_error)?;
        self.tls.flush().await.map_err(channel_error)?;
        Ok(written)
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, ChannelError> {
        match self.tls.read(buf).await {
            Ok(n) => Ok(n),
            // close_notify from the server ends the response like a FIN
            Err(TlsError::ConnectionClosed) => Ok(0),
            Err(e) => Err(channel_error(e)),
        }
    }

    async fn close(self) {
        let mut socket = match self.tls.close().await {
            Ok(socket) => socket,
            Err((socket, e)) => {
                debug!("TLS close_notify not sent: {:?}", e);
                socket
            }
        };
        socket.close();
        if let Err(e) = socket.flush().await {
            debug!("TCP flush on close failed: {:?}", e);
        }
    }
}

fn channel_error(e: TlsError) -> ChannelError {
    warn!("TLS channel error: {:?}", e);
    let kind = match e {
        TlsError::ConnectionClosed => ErrorKind::NotConnected,
        TlsError::Io(_) => ErrorKind::Other,
        _ => ErrorKind::InvalidData,
    };
    ChannelError::Fatal(kind)
}

#[cfg(not(feature = "insecure-api-tls"))]
mod verify {
    use embassy_time::Instant;
    use embedded_tls::webpki::CertVerifier;
    use embedded_tls::{
        Aes128GcmSha256, Certificate, CryptoProvider, TlsClock, TlsError, TlsVerifier,
    };
    use rand_core::CryptoRngCore;

    use super::HardwareRng;
    use crate::secrets;

    /// Largest server certificate the verifier will hold
    const MAX_CERT_SIZE: usize = 4096;

    /// Wall clock for certificate validity: firmware build time plus uptime.
    ///
    /// There is no RTC or time sync, so this trails real time by however long
    /// the image waited before it was flashed.
    pub struct UptimeClock;

    impl TlsClock for UptimeClock {
        fn now() -> Option<u64> {
            let built: u64 = secrets::BUILD_EPOCH.parse().ok()?;
            Some(built + Instant::now().as_secs())
        }
    }

    /// Crypto provider that checks the server chain against the API CA.
    pub struct VerifyingProvider<'a> {
        rng: &'a mut HardwareRng,
        verifier: CertVerifier<'static, Aes128GcmSha256, UptimeClock, MAX_CERT_SIZE>,
    }

    impl<'a> VerifyingProvider<'a> {
        pub fn new(rng: &'a mut HardwareRng) -> Self {
            Self {
                rng,
                verifier: CertVerifier::new(Certificate::X509(secrets::API_CA_CERT)),
            }
        }
    }

    impl CryptoProvider for VerifyingProvider<'_> {
        type CipherSuite = Aes128GcmSha256;
        type Signature = &'static [u8];

        fn rng(&mut self) -> impl CryptoRngCore {
            &mut *self.rng
        }

        fn verifier(
            &mut self,
        ) -> Result<&mut impl TlsVerifier<Self::CipherSuite>, TlsError> {
            Ok(&mut self.verifier)
        }
    }
}
