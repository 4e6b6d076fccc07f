pub mod ble;
pub mod measurement;

use chrono::{DateTime, Local};
use tokio::sync::mpsc::UnboundedReceiver;

use measurement::{Measurement, SensorContact};

pub use measurement::{parse_hrm, DecodeError};

#[derive(Debug, Clone, Default)]
pub struct HeartRateStatus {
    pub heart_rate_bpm: u16,
    /// Milliseconds, `None` if the monitor didn't include any in this packet
    pub rr_intervals: Option<Vec<u16>>,
    pub sensor_contact: SensorContact,
    pub energy_expended: Option<u16>,
    pub timestamp: DateTime<Local>,
}

impl HeartRateStatus {
    pub fn from_measurement(measurement: Measurement, timestamp: DateTime<Local>) -> Self {
        Self {
            heart_rate_bpm: measurement.bpm,
            rr_intervals: measurement.rr_intervals,
            sensor_contact: measurement.sensor_contact,
            energy_expended: measurement.energy_expended,
            timestamp,
        }
    }
}

/// Something a subscribed peer can tell us
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    Notification(Vec<u8>),
    Disconnected,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeerInfo {
    pub name: Option<String>,
    pub address: String,
}

/// Finds a peripheral advertising a given service.
#[allow(async_fn_in_trait)]
pub trait Discovery {
    type Peer: PeerLink;

    /// Resolves to `Ok(None)` if nothing matched within `timeout`.
    async fn discover(
        &mut self,
        service: uuid::Uuid,
        timeout: std::time::Duration,
    ) -> Result<Option<Self::Peer>, btleplug::Error>;
}

/// A single discovered peripheral and the GATT operations we need on it.
#[allow(async_fn_in_trait)]
pub trait PeerLink {
    fn info(&self) -> PeerInfo;

    /// Establishes the link and resolves its GATT services.
    /// Callers bound this with their own timeout.
    async fn connect(&mut self) -> Result<(), btleplug::Error>;

    /// Enables notifications on `characteristic`.
    ///
    /// Notifications and the eventual loss of the link are delivered in arrival
    /// order through the returned channel.
    async fn subscribe(
        &mut self,
        characteristic: uuid::Uuid,
    ) -> Result<UnboundedReceiver<LinkEvent>, btleplug::Error>;

    async fn unsubscribe(&mut self, characteristic: uuid::Uuid) -> Result<(), btleplug::Error>;

    async fn disconnect(&mut self) -> Result<(), btleplug::Error>;
}
