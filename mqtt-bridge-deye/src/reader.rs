//! Register reads from the inverter data logger.

use std::future::Future;
use std::net::SocketAddr;

use tokio_modbus::client::{Context, Reader};
use tokio_modbus::prelude::*;

use crate::config::{ConnectionConfig, LoggerConfig};
use crate::range::RegisterRange;
use crate::registers::RegisterMap;

/// Largest register count one Modbus read request may carry.
pub const MAX_READ_REGISTERS: u16 = 125;

/// Error type for register reads.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("Connection failed: {0}")]
    Connection(String),
    #[error("Read of {range} failed: {message}")]
    Read { range: RegisterRange, message: String },
    #[error("Read of {range} rejected by device: {message}")]
    Exception { range: RegisterRange, message: String },
}

/// Source of raw register values.
pub trait RegisterReader: Send {
    /// Read every register of `range`.
    ///
    /// On success the returned map holds exactly the addresses of `range`.
    fn read_registers(
        &mut self,
        range: RegisterRange,
    ) -> impl Future<Output = Result<RegisterMap, ReadError>> + Send;

    /// Forget the current connection so the next read reconnects.
    fn reset(&mut self) {}
}

/// [`RegisterReader`] speaking Modbus TCP or RTU to the data logger.
///
/// Connects lazily on the first read and keeps the connection until a read
/// fails.
pub struct ModbusReader {
    config: LoggerConfig,
    ctx: Option<Context>,
}

impl ModbusReader {
    pub fn new(config: LoggerConfig) -> Self {
        Self { config, ctx: None }
    }

    /// Whether a connection is currently held.
    pub fn is_connected(&self) -> bool {
        self.ctx.is_some()
    }

    async fn connect(config: &LoggerConfig) -> Result<Context, ReadError> {
        let timeout = config.timeout();
        let slave = Slave(config.unit_id);

        match &config.connection {
            ConnectionConfig::Tcp { host, port } => {
                let addr = resolve(host, *port).await?;

                let ctx = tokio::time::timeout(timeout, tcp::connect_slave(addr, slave))
                    .await
                    .map_err(|_| ReadError::Connection("Connection timeout".to_string()))?
                    .map_err(|e| ReadError::Connection(e.to_string()))?;

                tracing::info!(%addr, unit_id = config.unit_id, "Connected to data logger");
                Ok(ctx)
            }
            ConnectionConfig::Rtu {
                port,
                baud_rate,
                data_bits,
                parity,
                stop_bits,
            } => {
                let parity = match parity.to_lowercase().as_str() {
                    "even" => tokio_serial::Parity::Even,
                    "odd" => tokio_serial::Parity::Odd,
                    _ => tokio_serial::Parity::None,
                };

                let stop_bits = match stop_bits {
                    2 => tokio_serial::StopBits::Two,
                    _ => tokio_serial::StopBits::One,
                };

                let data_bits = match data_bits {
                    5 => tokio_serial::DataBits::Five,
                    6 => tokio_serial::DataBits::Six,
                    7 => tokio_serial::DataBits::Seven,
                    _ => tokio_serial::DataBits::Eight,
                };

                let builder = tokio_serial::new(port, *baud_rate)
                    .parity(parity)
                    .stop_bits(stop_bits)
                    .data_bits(data_bits)
                    .timeout(timeout);

                let serial = tokio_serial::SerialStream::open(&builder)
                    .map_err(|e| ReadError::Connection(format!("Serial open failed: {}", e)))?;

                tracing::info!(port = %port, unit_id = config.unit_id, "Opened serial data logger");
                Ok(rtu::attach_slave(serial, slave))
            }
        }
    }

    async fn read_chunks(&mut self, range: RegisterRange) -> Result<RegisterMap, ReadError> {
        if self.ctx.is_none() {
            self.ctx = Some(Self::connect(&self.config).await?);
        }
        let timeout = self.config.timeout();
        let ctx = self
            .ctx
            .as_mut()
            .ok_or_else(|| ReadError::Connection("not connected".to_string()))?;

        let mut registers = RegisterMap::new();
        for chunk in chunks(range) {
            let request = ctx.read_holding_registers(chunk.start(), chunk.count());
            let words = tokio::time::timeout(timeout, request)
                .await
                .map_err(|_| ReadError::Read {
                    range: chunk,
                    message: "timeout".to_string(),
                })?
                .map_err(|e| ReadError::Read {
                    range: chunk,
                    message: e.to_string(),
                })?
                .map_err(|e| ReadError::Exception {
                    range: chunk,
                    message: format!("{:?}", e),
                })?;

            if words.len() != usize::from(chunk.count()) {
                return Err(ReadError::Read {
                    range: chunk,
                    message: format!("expected {} registers, got {}", chunk.count(), words.len()),
                });
            }
            registers.merge(RegisterMap::from_words(chunk.start(), &words));
        }

        Ok(registers)
    }
}

impl RegisterReader for ModbusReader {
    async fn read_registers(&mut self, range: RegisterRange) -> Result<RegisterMap, ReadError> {
        let result = self.read_chunks(range).await;
        if result.is_err() {
            self.reset();
        }
        result
    }

    fn reset(&mut self) {
        self.ctx = None;
    }
}

async fn resolve(host: &str, port: u16) -> Result<SocketAddr, ReadError> {
    if let Ok(ip) = host.parse() {
        return Ok(SocketAddr::new(ip, port));
    }
    tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| ReadError::Connection(format!("Invalid address {}: {}", host, e)))?
        .next()
        .ok_or_else(|| ReadError::Connection(format!("No address for {}", host)))
}

/// Split `range` into requests of at most [`MAX_READ_REGISTERS`].
fn chunks(range: RegisterRange) -> impl Iterator<Item = RegisterRange> {
    let end = range.end();
    (u32::from(range.start())..end)
        .step_by(usize::from(MAX_READ_REGISTERS))
        .filter_map(move |start| {
            let chunk_end = end.min(start + u32::from(MAX_READ_REGISTERS));
            RegisterRange::new(start as u16, chunk_end)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_range_single_chunk() {
        let range = RegisterRange::inclusive(0x3b, 0x5f);
        assert_eq!(chunks(range).collect::<Vec<_>>(), vec![range]);
    }

    #[test]
    fn test_large_range_chunked() {
        let parts: Vec<_> = chunks(RegisterRange::inclusive(0, 299)).collect();

        assert_eq!(
            parts,
            vec![
                RegisterRange::inclusive(0, 124),
                RegisterRange::inclusive(125, 249),
                RegisterRange::inclusive(250, 299),
            ]
        );
    }

    #[test]
    fn test_chunk_at_top_of_address_space() {
        let parts: Vec<_> = chunks(RegisterRange::inclusive(0xff00, 0xffff)).collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts.last().map(|r| r.last()), Some(0xffff));
    }

    #[tokio::test]
    async fn test_unreachable_logger_drops_connection() {
        let mut config = LoggerConfig::tcp("127.0.0.1", 1);
        config.timeout_ms = 200;
        let mut reader = ModbusReader::new(config);

        let result = reader.read_registers(RegisterRange::inclusive(0x3c, 0x3c)).await;

        assert!(matches!(result, Err(ReadError::Connection(_))));
        assert!(!reader.is_connected());
    }
}
