//! Serial/USB transport implementation.
//!
//! Stations enumerate as USB serial devices running at 500 000 baud, 8N1,
//! with RTS/CTS flow control.

use bytes::Bytes;
use futures::future::BoxFuture;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{DataBits, FlowControl, Parity, SerialPortBuilderExt, SerialStream, StopBits};

use crate::error::{Error, Result};
use crate::transport::Transport;

/// Default baud rate for stations.
pub const DEFAULT_BAUD_RATE: u32 = 500_000;

/// Size of the read buffer.
const READ_CHUNK: usize = 1024;

/// Configuration for serial transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Serial port path (e.g., "/dev/ttyACM0" or "COM3").
    pub port: String,
    /// Baud rate.
    pub baud_rate: u32,
    /// RTS/CTS hardware flow control.
    pub hardware_flow_control: bool,
}

impl SerialConfig {
    /// Creates a new serial configuration with default settings.
    #[must_use]
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            hardware_flow_control: true,
        }
    }

    /// Sets the baud rate.
    #[must_use]
    pub const fn baud_rate(mut self, rate: u32) -> Self {
        self.baud_rate = rate;
        self
    }

    /// Enables or disables hardware flow control.
    #[must_use]
    pub const fn hardware_flow_control(mut self, enabled: bool) -> Self {
        self.hardware_flow_control = enabled;
        self
    }
}

/// Serial transport for station communication.
pub struct SerialTransport {
    config: SerialConfig,
    stream: Option<SerialStream>,
    buf: Box<[u8; READ_CHUNK]>,
}

impl SerialTransport {
    /// Creates a new serial transport with the given configuration.
    #[must_use]
    pub fn new(config: SerialConfig) -> Self {
        Self {
            config,
            stream: None,
            buf: Box::new([0; READ_CHUNK]),
        }
    }

    /// Creates a new serial transport for the given port with default settings.
    #[must_use]
    pub fn with_port(port: impl Into<String>) -> Self {
        Self::new(SerialConfig::new(port))
    }

    /// The configuration this transport opens with.
    #[must_use]
    pub const fn config(&self) -> &SerialConfig {
        &self.config
    }
}

impl Transport for SerialTransport {
    fn connect(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            if self.stream.is_some() {
                return Ok(());
            }

            tracing::info!(
                port = %self.config.port,
                baud = self.config.baud_rate,
                "opening serial port"
            );

            let flow_control = if self.config.hardware_flow_control {
                FlowControl::Hardware
            } else {
                FlowControl::None
            };
            let stream = tokio_serial::new(&self.config.port, self.config.baud_rate)
                .data_bits(DataBits::Eight)
                .parity(Parity::None)
                .stop_bits(StopBits::One)
                .flow_control(flow_control)
                .open_native_async()
                .map_err(Error::Serial)?;

            self.stream = Some(stream);
            tracing::info!(port = %self.config.port, "serial port open");
            Ok(())
        })
    }

    fn disconnect(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            if self.stream.take().is_some() {
                tracing::info!(port = %self.config.port, "serial port closed");
            }
            Ok(())
        })
    }

    fn send(&mut self, data: Bytes) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;
            stream.write_all(&data).await?;
            stream.flush().await?;
            Ok(())
        })
    }

    fn recv(&mut self) -> BoxFuture<'_, Result<Option<Bytes>>> {
        Box::pin(async move {
            let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;
            let n = stream.read(&mut self.buf[..]).await?;
            if n == 0 {
                return Ok(None);
            }
            Ok(Some(Bytes::copy_from_slice(&self.buf[..n])))
        })
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_config_defaults() {
        let config = SerialConfig::new("/dev/ttyACM0");
        assert_eq!(config.port, "/dev/ttyACM0");
        assert_eq!(config.baud_rate, DEFAULT_BAUD_RATE);
        assert!(config.hardware_flow_control);
    }

    #[test]
    fn test_serial_config_builder() {
        let config = SerialConfig::new("/dev/ttyACM0")
            .baud_rate(115_200)
            .hardware_flow_control(false);
        assert_eq!(config.baud_rate, 115_200);
        assert!(!config.hardware_flow_control);
    }

    #[tokio::test]
    async fn test_send_requires_connection() {
        let mut transport = SerialTransport::with_port("/dev/null-station");
        assert!(!transport.is_connected());
        assert!(matches!(
            transport.send(Bytes::from_static(b"x")).await,
            Err(Error::NotConnected)
        ));
    }
}
