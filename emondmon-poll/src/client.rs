//! Modbus TCP session with the meter.

use std::net::SocketAddr;
use std::time::Duration;
use tokio_modbus::client::{Client, Context, Reader};
use tokio_modbus::prelude::{Slave, tcp};
use tracing::{debug, info, warn};

use crate::catalog::RegisterAddress;
use crate::config::DeviceConfig;
use crate::decode::RawRegisterPair;
use crate::error::PollerError;

/// Number of holding registers one measurement occupies.
pub const REGISTERS_PER_READ: u16 = 2;

/// A session with one meter.
///
/// `read_pair` returns `Ok(None)` when the device answered without data for
/// the address; any `Err` means the session itself is unusable.
#[allow(async_fn_in_trait)]
pub trait DeviceClient {
    /// Whether a session is currently established.
    fn is_open(&self) -> bool;

    /// Establish the session. Succeeds without reconnecting if already open.
    async fn open(&mut self) -> Result<(), PollerError>;

    /// Read the two holding registers starting at `address`.
    async fn read_pair(
        &mut self,
        address: RegisterAddress,
    ) -> Result<Option<RawRegisterPair>, PollerError>;

    /// Tear down the session. Closing a closed client does nothing.
    async fn close(&mut self);
}

/// [`DeviceClient`] backed by a `tokio-modbus` TCP context.
pub struct ModbusDevice {
    device: DeviceConfig,
    ctx: Option<Context>,
}

impl std::fmt::Debug for ModbusDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModbusDevice")
            .field("device", &self.device)
            .field("open", &self.ctx.is_some())
            .finish()
    }
}

impl ModbusDevice {
    /// Create an unconnected client for a device.
    pub fn new(device: DeviceConfig) -> Self {
        Self { device, ctx: None }
    }

    /// The device this client talks to.
    pub fn device(&self) -> &DeviceConfig {
        &self.device
    }

    fn timeout(&self) -> Duration {
        Duration::from_millis(self.device.timeout_ms)
    }

    /// Resolve the configured host, accepting both IP literals and names.
    async fn resolve(&self) -> Result<SocketAddr, PollerError> {
        let target = (self.device.host.as_str(), self.device.port);
        let mut addrs = tokio::time::timeout(self.timeout(), tokio::net::lookup_host(target))
            .await
            .map_err(|_| PollerError::connection("Address lookup timeout"))?
            .map_err(|e| PollerError::connection(format!("Invalid address: {}", e)))?;

        addrs.next().ok_or_else(|| {
            PollerError::connection(format!("No address found for '{}'", self.device.host))
        })
    }
}

impl DeviceClient for ModbusDevice {
    fn is_open(&self) -> bool {
        self.ctx.is_some()
    }

    async fn open(&mut self) -> Result<(), PollerError> {
        if self.ctx.is_some() {
            debug!("Device '{}': session already open", self.device.host);
            return Ok(());
        }

        let addr = self.resolve().await?;
        let slave = Slave(self.device.unit_id);

        let ctx = tokio::time::timeout(self.timeout(), tcp::connect_slave(addr, slave))
            .await
            .map_err(|_| PollerError::connection("Connection timeout"))?
            .map_err(|e| PollerError::connection(e.to_string()))?;

        info!(
            "Connected to '{}' ({}, unit {})",
            self.device.host, addr, self.device.unit_id
        );
        self.ctx = Some(ctx);
        Ok(())
    }

    async fn read_pair(
        &mut self,
        address: RegisterAddress,
    ) -> Result<Option<RawRegisterPair>, PollerError> {
        let timeout = self.timeout();
        let ctx = self
            .ctx
            .as_mut()
            .ok_or_else(|| PollerError::connection("Session is not open"))?;

        let response =
            tokio::time::timeout(timeout, ctx.read_holding_registers(address, REGISTERS_PER_READ))
                .await
                .map_err(|_| PollerError::connection(format!("Read @ {} timed out", address)))?
                .map_err(|e| PollerError::connection(format!("Read @ {} failed: {}", address, e)))?;

        match response {
            Ok(words) => match RawRegisterPair::from_words(&words) {
                Some(pair) => {
                    debug!("Read @ {}: {:04X} {:04X}", address, pair.high, pair.low);
                    Ok(Some(pair))
                }
                None => {
                    warn!(
                        "Did not find any data at address {} ({} word(s) returned)",
                        address,
                        words.len()
                    );
                    Ok(None)
                }
            },
            Err(exception) => {
                warn!(
                    "Did not find any data at address {} (exception: {:?})",
                    address, exception
                );
                Ok(None)
            }
        }
    }

    async fn close(&mut self) {
        if let Some(mut ctx) = self.ctx.take() {
            if let Err(e) = ctx.disconnect().await {
                debug!("Device '{}': disconnect error: {}", self.device.host, e);
            }
            info!("Closed connection to '{}'", self.device.host);
        }
    }
}
