use super::{Discovery, LinkEvent, PeerInfo, PeerLink};

use btleplug::api::{
    BDAddr, Central, CentralEvent, Characteristic, Manager as _, Peripheral as _, ScanFilter,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::StreamExt;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

pub const HEART_RATE_SERVICE_UUID: Uuid = Uuid::from_u128(0x0000180d_0000_1000_8000_00805f9b34fb);
pub const HEART_RATE_MEASUREMENT_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0x00002a37_0000_1000_8000_00805f9b34fb);

/// Scans on the first Bluetooth adapter the platform reports.
#[derive(Default)]
pub struct BleDiscovery;

impl Discovery for BleDiscovery {
    type Peer = BlePeer;

    async fn discover(
        &mut self,
        service: Uuid,
        timeout: Duration,
    ) -> Result<Option<BlePeer>, btleplug::Error> {
        let manager = Manager::new().await?;
        let central = manager
            .adapters()
            .await?
            .into_iter()
            .next()
            .ok_or(btleplug::Error::DeviceNotFound)?;
        if let Ok(adapter_info) = central.adapter_info().await {
            debug!("Using adapter: {adapter_info}");
        }

        let mut events = central.events().await?;
        // Not every platform honors the service filter, so advertisements are checked again below
        central
            .start_scan(ScanFilter {
                services: vec![service],
            })
            .await?;
        debug!("Scanning started, waiting up to {:?}", timeout);

        let search = async {
            // Peripherals the adapter already knew about won't necessarily produce a new event
            for device in central.peripherals().await? {
                if advertises(&device, service).await {
                    return Ok(Some(device));
                }
            }
            while let Some(event) = events.next().await {
                match event {
                    CentralEvent::DeviceDiscovered(id)
                    | CentralEvent::DeviceUpdated(id)
                    | CentralEvent::ServicesAdvertisement { id, .. } => {
                        if let Ok(device) = central.peripheral(&id).await {
                            if advertises(&device, service).await {
                                return Ok(Some(device));
                            }
                        }
                    }
                    _ => {}
                }
            }
            Ok::<_, btleplug::Error>(None)
        };
        let result = tokio::time::timeout(timeout, search).await;

        if let Err(e) = central.stop_scan().await {
            warn!("Failed to stop scan: {}", e);
        }

        match result {
            Ok(Ok(Some(device))) => Ok(Some(BlePeer::new(central, device).await)),
            Ok(Ok(None)) => {
                warn!("Adapter event stream ended during scan");
                Ok(None)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => {
                debug!("Scan timed out");
                Ok(None)
            }
        }
    }
}

async fn advertises(device: &Peripheral, service: Uuid) -> bool {
    matches!(
        device.properties().await,
        Ok(Some(properties)) if properties.services.contains(&service)
    )
}

pub struct BlePeer {
    central: Adapter,
    device: Peripheral,
    info: PeerInfo,
    forwarder: Option<JoinHandle<()>>,
}

impl BlePeer {
    async fn new(central: Adapter, device: Peripheral) -> Self {
        let name = device
            .properties()
            .await
            .ok()
            .flatten()
            .and_then(|properties| properties.local_name);
        // CoreBluetooth hides real addresses, fall back to the platform ID there
        let address = if device.address() == BDAddr::default() {
            device.id().to_string()
        } else {
            device.address().to_string()
        };
        Self {
            central,
            device,
            info: PeerInfo { name, address },
            forwarder: None,
        }
    }

    fn characteristic(&self, uuid: Uuid) -> Result<Characteristic, btleplug::Error> {
        self.device
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == uuid)
            .ok_or(btleplug::Error::NoSuchCharacteristic)
    }

    fn stop_forwarding(&mut self) {
        if let Some(forwarder) = self.forwarder.take() {
            forwarder.abort();
        }
    }
}

impl PeerLink for BlePeer {
    fn info(&self) -> PeerInfo {
        self.info.clone()
    }

    async fn connect(&mut self) -> Result<(), btleplug::Error> {
        info!(
            "Connecting to Heart Rate Monitor! Name: {:?} | Address: {:?}",
            self.info.name, self.info.address
        );
        if !self.device.is_connected().await? {
            self.device.connect().await?;
        }
        self.device.discover_services().await?;
        debug!("Found {} characteristics", self.device.characteristics().len());
        Ok(())
    }

    async fn subscribe(
        &mut self,
        characteristic: Uuid,
    ) -> Result<UnboundedReceiver<LinkEvent>, btleplug::Error> {
        let target = self.characteristic(characteristic)?;
        // Both streams are opened before subscribing so no early packet or disconnect is missed
        let mut central_events = self.central.events().await?;
        let mut notification_stream = self.device.notifications().await?;
        self.device.subscribe(&target).await?;

        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.device.id();
        self.stop_forwarding();
        self.forwarder = Some(tokio::spawn(async move {
            loop {
                tokio::select! {
                    notification = notification_stream.next() => match notification {
                        Some(data) if data.uuid == characteristic => {
                            if tx.send(LinkEvent::Notification(data.value)).is_err() {
                                break;
                            }
                        }
                        Some(data) => trace!("Ignoring notification from {}", data.uuid),
                        None => {
                            info!("Notification stream closed!");
                            let _ = tx.send(LinkEvent::Disconnected);
                            break;
                        }
                    },
                    Some(event) = central_events.next() => {
                        if let CentralEvent::DeviceDisconnected(disconnected) = event {
                            if disconnected == id {
                                warn!("Device disconnected: {}", disconnected);
                                let _ = tx.send(LinkEvent::Disconnected);
                                break;
                            }
                        }
                    }
                }
            }
        }));
        Ok(rx)
    }

    async fn unsubscribe(&mut self, characteristic: Uuid) -> Result<(), btleplug::Error> {
        self.stop_forwarding();
        let target = self.characteristic(characteristic)?;
        self.device.unsubscribe(&target).await
    }

    async fn disconnect(&mut self) -> Result<(), btleplug::Error> {
        self.stop_forwarding();
        if self.device.is_connected().await.unwrap_or(false) {
            self.device.disconnect().await?;
        }
        Ok(())
    }
}

impl Drop for BlePeer {
    fn drop(&mut self) {
        self.stop_forwarding();
    }
}
