use async_trait::async_trait;
use log::{debug, error, info};
use std::net::SocketAddr;
use std::time::Duration;
use tokio_modbus::prelude::*;
use tokio_modbus::slave::SlaveContext;

use crate::utils::error::DxmError;

/// Minimal transport capability the acquisition client needs.
///
/// The Modbus TCP wire protocol (framing, transaction IDs, exception
/// responses) lives entirely behind this seam; any conforming client
/// implementation satisfies it. Mock transports implement it in tests.
#[async_trait]
pub trait ModbusTransport: Send {
    async fn connect(&mut self) -> Result<(), DxmError>;

    async fn close(&mut self);

    /// Read `count` holding registers starting at `address` from `unit_id`.
    /// Both transport-level failures and Modbus exception responses surface
    /// as errors.
    async fn read_holding_registers(
        &mut self,
        address: u16,
        count: u16,
        unit_id: u8,
    ) -> Result<Vec<u16>, DxmError>;

    fn is_connected(&self) -> bool;
}

/// Modbus TCP transport backed by `tokio-modbus`.
pub struct TcpTransport {
    host: String,
    port: u16,
    timeout: Duration,
    ctx: Option<client::Context>,
}

impl TcpTransport {
    pub fn new(host: &str, port: u16, timeout: Duration) -> Self {
        Self {
            host: host.to_string(),
            port,
            timeout,
            ctx: None,
        }
    }

    async fn resolve(endpoint: String) -> Result<SocketAddr, DxmError> {
        let mut addrs = tokio::net::lookup_host(&endpoint)
            .await
            .map_err(|e| DxmError::Connection(format!("Failed to resolve {}: {}", endpoint, e)))?;
        addrs
            .next()
            .ok_or_else(|| DxmError::Connection(format!("No address found for {}", endpoint)))
    }
}

#[async_trait]
impl ModbusTransport for TcpTransport {
    async fn connect(&mut self) -> Result<(), DxmError> {
        let addr = Self::resolve(format!("{}:{}", self.host, self.port)).await?;
        info!("🔌 Opening Modbus TCP session to {}", addr);

        let ctx = tokio::time::timeout(self.timeout, tcp::connect(addr))
            .await
            .map_err(|_| {
                DxmError::Connection(format!(
                    "Connection to {} timed out after {:?}",
                    addr, self.timeout
                ))
            })?
            .map_err(|e| {
                error!("❌ Failed to establish TCP connection to {}: {}", addr, e);
                DxmError::Connection(format!("Failed to establish TCP connection: {}", e))
            })?;

        self.ctx = Some(ctx);
        Ok(())
    }

    async fn close(&mut self) {
        if let Some(mut ctx) = self.ctx.take() {
            // best effort; the peer may already be gone
            let _ = ctx.disconnect().await;
            debug!("Modbus TCP session closed");
        }
    }

    async fn read_holding_registers(
        &mut self,
        address: u16,
        count: u16,
        unit_id: u8,
    ) -> Result<Vec<u16>, DxmError> {
        let ctx = self
            .ctx
            .as_mut()
            .ok_or_else(|| DxmError::Connection("Transport is not connected".to_string()))?;

        ctx.set_slave(Slave(unit_id));

        let response = tokio::time::timeout(
            self.timeout,
            ctx.read_holding_registers(address, count),
        )
        .await
        .map_err(|_| {
            DxmError::Communication(format!(
                "Read from unit {} timed out after {:?}",
                unit_id, self.timeout
            ))
        })?;

        match response {
            Ok(Ok(registers)) => {
                debug!(
                    "Read {} registers from unit {} at address {}: {:?}",
                    count, unit_id, address, registers
                );
                Ok(registers)
            }
            Ok(Err(exception)) => Err(DxmError::Communication(format!(
                "Modbus exception from unit {}: {}",
                unit_id, exception
            ))),
            Err(e) => {
                // the session is unusable after a transport-level failure
                self.ctx = None;
                Err(DxmError::Communication(format!(
                    "Transport error reading unit {}: {}",
                    unit_id, e
                )))
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.ctx.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolve_loopback_endpoint() {
        let addr = TcpTransport::resolve("127.0.0.1:502".to_string())
            .await
            .unwrap();
        assert_eq!(addr, "127.0.0.1:502".parse::<SocketAddr>().unwrap());
    }

    #[tokio::test]
    async fn resolve_rejects_malformed_endpoint() {
        let err = TcpTransport::resolve("not an endpoint".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, DxmError::Connection(_)));
    }

    #[tokio::test]
    async fn connect_future_is_send() {
        fn assert_send<F: std::future::Future + Send>(future: F) -> F {
            future
        }

        // nothing listens on this port; connect must fail cleanly
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut transport = TcpTransport::new("127.0.0.1", port, Duration::from_millis(200));
        let result = assert_send(transport.connect()).await;
        assert!(matches!(result, Err(DxmError::Connection(_))));
        assert!(!transport.is_connected());
    }
}
