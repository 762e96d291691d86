//! Meter polling.

use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

use crate::catalog;
use crate::client::{DeviceClient, ModbusDevice};
use crate::config::{PollConfig, Selection};
use crate::decode::decode;
use crate::error::PollerError;

/// Pause between consecutive reads within one poll.
///
/// The meter's Modbus stack drops requests that arrive in quick succession.
pub const READ_PACING: Duration = Duration::from_millis(500);

/// Waits between two reads.
#[allow(async_fn_in_trait)]
pub trait Pacer {
    async fn pause(&mut self);
}

/// Sleeps for [`READ_PACING`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DevicePacing;

impl Pacer for DevicePacing {
    async fn pause(&mut self) {
        tokio::time::sleep(READ_PACING).await;
    }
}

/// One measurement from a poll. `value` is `None` when the device had no
/// data for the register.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MeasurementReading {
    pub id: &'static str,
    pub value: Option<f32>,
}

impl MeasurementReading {
    pub fn is_absent(&self) -> bool {
        self.value.is_none()
    }
}

/// Result of one completed poll.
#[derive(Debug, Clone, Serialize)]
pub struct PollReport {
    /// Device host as given by the caller
    pub device: String,
    /// What was read
    pub selection: Selection,
    /// Completion time in Unix milliseconds
    pub timestamp: i64,
    /// One entry per requested measurement, in request order
    pub readings: Vec<MeasurementReading>,
}

/// Measurement ids a selection reads, in read order.
pub fn resolve(selection: Selection) -> Vec<&'static str> {
    match selection {
        Selection::All => catalog::all_ids().collect(),
        Selection::Graph(id) => catalog::ids_for(id).collect(),
    }
}

/// Reads a selection of measurements over one device session.
#[derive(Debug)]
pub struct Poller<C, P = DevicePacing> {
    client: C,
    pacer: P,
}

impl<C: DeviceClient> Poller<C> {
    /// Create a poller with the device's required read pacing.
    pub fn new(client: C) -> Self {
        Self::with_pacer(client, DevicePacing)
    }
}

impl<C: DeviceClient, P: Pacer> Poller<C, P> {
    pub fn with_pacer(client: C, pacer: P) -> Self {
        Self { client, pacer }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn into_parts(self) -> (C, P) {
        (self.client, self.pacer)
    }

    /// Perform a single poll.
    ///
    /// Opens the session, reads every measurement of `selection` in order and
    /// closes the session again. If the session cannot be opened nothing is
    /// read and nothing is closed. Once open, the session is closed on every
    /// path, including a transport failure halfway through.
    pub async fn poll(
        &mut self,
        selection: Selection,
    ) -> Result<Vec<MeasurementReading>, PollerError> {
        let ids = resolve(selection);

        self.client.open().await?;
        let outcome = self.read_all(&ids).await;
        self.client.close().await;

        if let Ok(readings) = &outcome {
            let absent = readings.iter().filter(|r| r.is_absent()).count();
            info!(
                "Poll of {} complete: {} reading(s), {} absent",
                selection,
                readings.len(),
                absent
            );
        }

        outcome
    }

    async fn read_all(
        &mut self,
        ids: &[&'static str],
    ) -> Result<Vec<MeasurementReading>, PollerError> {
        let mut readings = Vec::with_capacity(ids.len());

        for (index, &id) in ids.iter().enumerate() {
            if index > 0 {
                self.pacer.pause().await;
            }

            let address = catalog::address_of(id);
            let value = self.client.read_pair(address).await?.map(decode);
            debug!("{} @ {} = {:?}", id, address, value);

            readings.push(MeasurementReading { id, value });
        }

        Ok(readings)
    }
}

/// Poll a meter over Modbus TCP according to `config`.
pub async fn poll_device(config: PollConfig) -> Result<PollReport, PollerError> {
    let PollConfig { device, selection } = config;
    let host = device.host.clone();

    let mut poller = Poller::new(ModbusDevice::new(device));
    let readings = poller.poll(selection).await?;

    Ok(PollReport {
        device: host,
        selection,
        timestamp: chrono::Utc::now().timestamp_millis(),
        readings,
    })
}
