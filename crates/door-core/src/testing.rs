//! Test doubles for the transport, sensor pin and console sink

extern crate std;

use core::cell::Cell;
use core::convert::Infallible;
use std::boxed::Box;
use std::collections::VecDeque;
use std::rc::Rc;
use std::string::String;
use std::vec::Vec;

use embedded_io::ErrorKind;

use crate::transport::{ChannelError, ConnectError, Endpoint, TlsConnector, TlsSession};

/// One scripted result of a session read or write
#[derive(Debug, Clone, Copy)]
pub enum Step {
    /// Write accepts at most this many bytes
    Accept(usize),
    /// Read returns this chunk
    Data(&'static [u8]),
    /// Read reports a clean close
    Eof,
    WantRead,
    WantWrite,
    Fail(ErrorKind),
}

#[derive(Default)]
struct MockState {
    writes: VecDeque<Step>,
    reads: VecDeque<Step>,
    connect_failure: Option<ConnectError>,
    opened: usize,
    closed: usize,
    read_calls: usize,
    requests: Vec<Vec<u8>>,
    endpoint: Option<(String, u16)>,
    on_write: Option<Box<dyn FnMut()>>,
}

/// Scripted connector. Writes with no script left accept everything;
/// reads with no script left report end-of-stream.
#[derive(Default)]
pub struct MockConnector {
    state: MockState,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script_writes<const N: usize>(&mut self, steps: [Step; N]) {
        self.state.writes = steps.into_iter().collect();
    }

    pub fn script_reads<const N: usize>(&mut self, steps: [Step; N]) {
        self.state.reads = steps.into_iter().collect();
    }

    /// Make the next connect attempt fail.
    pub fn fail_connect(&mut self, error: ConnectError) {
        self.state.connect_failure = Some(error);
    }

    /// Run `hook` on every write call, before the write is applied.
    pub fn on_write(&mut self, hook: impl FnMut() + 'static) {
        self.state.on_write = Some(Box::new(hook));
    }

    /// (opened, closed) session counts
    pub fn counters(&self) -> (usize, usize) {
        (self.state.opened, self.state.closed)
    }

    pub fn open_sessions(&self) -> usize {
        self.state.opened - self.state.closed
    }

    pub fn reads(&self) -> usize {
        self.state.read_calls
    }

    /// Bytes written during the most recent session
    pub fn written(&self) -> &[u8] {
        self.state.requests.last().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Bytes written per session, oldest first
    pub fn requests(&self) -> &[Vec<u8>] {
        &self.state.requests
    }

    pub fn connected_to(&self) -> Option<(String, u16)> {
        self.state.endpoint.clone()
    }
}

impl TlsConnector for MockConnector {
    type Session<'s> = MockSession<'s>;

    async fn connect<'s>(&'s mut self, endpoint: Endpoint<'_>) -> Result<MockSession<'s>, ConnectError> {
        if let Some(error) = self.state.connect_failure.take() {
            return Err(error);
        }
        self.state.opened += 1;
        self.state.requests.push(Vec::new());
        self.state.endpoint = Some((endpoint.host.into(), endpoint.port));
        Ok(MockSession {
            state: &mut self.state,
        })
    }
}

pub struct MockSession<'s> {
    state: &'s mut MockState,
}

impl TlsSession for MockSession<'_> {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, ChannelError> {
        if let Some(hook) = self.state.on_write.as_mut() {
            hook();
        }
        let accepted = match self.state.writes.pop_front() {
            None => buf.len(),
            Some(Step::Accept(n)) => n.min(buf.len()),
            Some(Step::WantRead) => return Err(ChannelError::WantRead),
            Some(Step::WantWrite) => return Err(ChannelError::WantWrite),
            Some(Step::Fail(kind)) => return Err(ChannelError::Fatal(kind)),
            Some(other) => panic!("{other:?} is not a write step"),
        };
        if let Some(request) = self.state.requests.last_mut() {
            request.extend_from_slice(&buf[..accepted]);
        }
        Ok(accepted)
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, ChannelError> {
        self.state.read_calls += 1;
        match self.state.reads.pop_front() {
            None | Some(Step::Eof) => Ok(0),
            Some(Step::Data(chunk)) => {
                buf[..chunk.len()].copy_from_slice(chunk);
                Ok(chunk.len())
            }
            Some(Step::WantRead) => Err(ChannelError::WantRead),
            Some(Step::WantWrite) => Err(ChannelError::WantWrite),
            Some(Step::Fail(kind)) => Err(ChannelError::Fatal(kind)),
            Some(other) => panic!("{other:?} is not a read step"),
        }
    }

    async fn close(self) {
        self.state.closed += 1;
    }
}

/// Input pin whose level the test controls through a shared handle.
#[derive(Clone)]
pub struct MockPin {
    high: Rc<Cell<bool>>,
}

impl MockPin {
    pub fn new(high: bool) -> Self {
        Self {
            high: Rc::new(Cell::new(high)),
        }
    }

    pub fn set_high(&self, high: bool) {
        self.high.set(high);
    }
}

impl embedded_hal::digital::ErrorType for MockPin {
    type Error = Infallible;
}

impl embedded_hal::digital::InputPin for MockPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.high.get())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.high.get())
    }
}

/// Console stand-in that keeps everything written to it.
#[derive(Default)]
pub struct RecordingSink {
    bytes: Vec<u8>,
}

impl RecordingSink {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl embedded_io::ErrorType for RecordingSink {
    type Error = Infallible;
}

impl embedded_io::Write for RecordingSink {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.bytes.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
