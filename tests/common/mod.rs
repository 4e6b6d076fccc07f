use hrm_console::heart_rate::{Discovery, LinkEvent, PeerInfo, PeerLink};
use hrm_console::session::SessionUpdate;

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use uuid::Uuid;

#[allow(dead_code)]
#[derive(Debug, Clone, Copy)]
pub enum Scan {
    Find,
    /// Waits out the whole scan timeout without a match
    Nothing,
    Fail,
    Hang,
}

#[allow(dead_code)]
#[derive(Debug, Clone, Copy)]
pub enum Connect {
    Succeed,
    Fail,
    Hang,
}

/// How many times each operation was called on the fake
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Calls {
    pub discover: usize,
    pub connect: usize,
    pub subscribe: usize,
    pub unsubscribe: usize,
    pub disconnect: usize,
}

pub struct FakeDiscovery {
    scan: Scan,
    peer: Option<FakePeer>,
    calls: Arc<Mutex<Calls>>,
}

pub struct FakePeer {
    connect: Connect,
    subscribe_ok: bool,
    unsubscribe_ok: bool,
    link_events: Option<UnboundedReceiver<LinkEvent>>,
    calls: Arc<Mutex<Calls>>,
}

/// A fake BLE stack plus the handles a test uses to drive and inspect it.
pub struct FakeBle {
    pub discovery: FakeDiscovery,
    /// Feeds the subscribed session, as if the monitor sent it
    pub link: UnboundedSender<LinkEvent>,
    pub calls: Arc<Mutex<Calls>>,
}

#[allow(dead_code)]
impl FakeBle {
    pub fn new(scan: Scan, connect: Connect) -> Self {
        let calls = Arc::new(Mutex::new(Calls::default()));
        let (link, link_events) = mpsc::unbounded_channel();
        let peer = FakePeer {
            connect,
            subscribe_ok: true,
            unsubscribe_ok: true,
            link_events: Some(link_events),
            calls: calls.clone(),
        };
        Self {
            discovery: FakeDiscovery {
                scan,
                peer: Some(peer),
                calls: calls.clone(),
            },
            link,
            calls,
        }
    }

    pub fn healthy() -> Self {
        Self::new(Scan::Find, Connect::Succeed)
    }

    pub fn failing_subscribe(mut self) -> Self {
        if let Some(peer) = self.discovery.peer.as_mut() {
            peer.subscribe_ok = false;
        }
        self
    }

    pub fn failing_unsubscribe(mut self) -> Self {
        if let Some(peer) = self.discovery.peer.as_mut() {
            peer.unsubscribe_ok = false;
        }
        self
    }

    pub fn notify_bpm(&self, bpm: u8) {
        self.link
            .send(LinkEvent::Notification(vec![0x00, bpm]))
            .unwrap();
    }
}

impl Discovery for FakeDiscovery {
    type Peer = FakePeer;

    async fn discover(
        &mut self,
        _service: Uuid,
        timeout: Duration,
    ) -> Result<Option<FakePeer>, btleplug::Error> {
        self.calls.lock().unwrap().discover += 1;
        match self.scan {
            Scan::Find => Ok(self.peer.take()),
            Scan::Nothing => {
                tokio::time::sleep(timeout).await;
                Ok(None)
            }
            Scan::Fail => Err(btleplug::Error::Other("adapter went away".into())),
            Scan::Hang => std::future::pending().await,
        }
    }
}

impl PeerLink for FakePeer {
    fn info(&self) -> PeerInfo {
        PeerInfo {
            name: Some("Fake HRM".into()),
            address: "11:22:33:44:55:66".into(),
        }
    }

    async fn connect(&mut self) -> Result<(), btleplug::Error> {
        self.calls.lock().unwrap().connect += 1;
        match self.connect {
            Connect::Succeed => Ok(()),
            Connect::Fail => Err(btleplug::Error::DeviceNotFound),
            Connect::Hang => std::future::pending().await,
        }
    }

    async fn subscribe(
        &mut self,
        _characteristic: Uuid,
    ) -> Result<UnboundedReceiver<LinkEvent>, btleplug::Error> {
        self.calls.lock().unwrap().subscribe += 1;
        if !self.subscribe_ok {
            return Err(btleplug::Error::NotSupported("notify".into()));
        }
        self.link_events
            .take()
            .ok_or(btleplug::Error::Other("subscribed twice".into()))
    }

    async fn unsubscribe(&mut self, _characteristic: Uuid) -> Result<(), btleplug::Error> {
        self.calls.lock().unwrap().unsubscribe += 1;
        if self.unsubscribe_ok {
            Ok(())
        } else {
            Err(btleplug::Error::NotConnected)
        }
    }

    async fn disconnect(&mut self) -> Result<(), btleplug::Error> {
        self.calls.lock().unwrap().disconnect += 1;
        Ok(())
    }
}

/// Everything already queued on the update channel
#[allow(dead_code)]
pub fn drain(updates: &mut UnboundedReceiver<SessionUpdate>) -> Vec<SessionUpdate> {
    let mut drained = Vec::new();
    while let Ok(update) = updates.try_recv() {
        drained.push(update);
    }
    drained
}

#[allow(dead_code)]
pub fn heart_rates(updates: &[SessionUpdate]) -> Vec<u16> {
    updates
        .iter()
        .filter_map(|update| match update {
            SessionUpdate::HeartRate(status) => Some(status.heart_rate_bpm),
            _ => None,
        })
        .collect()
}
