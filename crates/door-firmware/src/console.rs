//! RTT console used as the response sink

use core::convert::Infallible;

use rtt_target::UpChannel;

/// Copies raw response bytes to a dedicated RTT up channel, unmodified.
pub struct RttConsole {
    channel: UpChannel,
}

impl RttConsole {
    pub fn new(channel: UpChannel) -> Self {
        Self { channel }
    }
}

impl embedded_io::ErrorType for RttConsole {
    type Error = Infallible;
}

impl embedded_io::Write for RttConsole {
    /// Returns how much the channel took; 0 when no host is draining it.
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        Ok(self.channel.write(buf))
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
