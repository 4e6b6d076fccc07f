use crate::heart_rate::ble::{HEART_RATE_MEASUREMENT_CHARACTERISTIC_UUID, HEART_RATE_SERVICE_UUID};
use crate::heart_rate::{
    parse_hrm, DecodeError, Discovery, HeartRateStatus, LinkEvent, PeerInfo, PeerLink,
};

use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub service_uuid: Uuid,
    pub characteristic_uuid: Uuid,
    pub scan_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            service_uuid: HEART_RATE_SERVICE_UUID,
            characteristic_uuid: HEART_RATE_MEASUREMENT_CHARACTERISTIC_UUID,
            scan_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(20),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Scanning,
    Connecting,
    ConnectedIdle,
    Subscribed,
    Disconnecting,
    Terminated,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Scanning => "Scanning",
            SessionState::Connecting => "Connecting",
            SessionState::ConnectedIdle => "Connected (idle)",
            SessionState::Subscribed => "Subscribed",
            SessionState::Disconnecting => "Disconnecting",
            SessionState::Terminated => "Terminated",
        };
        f.write_str(name)
    }
}

/// Everything the session wants the user to know about, in order.
#[derive(Debug, Clone)]
pub enum SessionUpdate {
    State(SessionState),
    Found(PeerInfo),
    HeartRate(HeartRateStatus),
    DecodeFailed { raw: Vec<u8>, error: DecodeError },
    Unsubscribed,
    UnsubscribeFailed(String),
}

/// How a session that got past scanning without a fault came to an end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    PeerDisconnected,
    Cancelled,
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Bluetooth scanning error: {0}")]
    Scan(#[source] btleplug::Error),
    #[error("No device advertising the Heart Rate Service found")]
    NoDeviceFound,
    #[error("Failed to connect: {0}")]
    Connect(#[source] btleplug::Error),
    #[error("Failed to connect: timed out after {0:?}")]
    ConnectTimeout(Duration),
    #[error("Failed to subscribe to Heart Rate Measurement notifications: {0}")]
    Subscribe(#[source] btleplug::Error),
}

/// Drives one scan → connect → subscribe → teardown cycle against a single peer.
///
/// Every await point also listens to `cancel_token`. Once a connection has been
/// established, every way out of the session passes through
/// [`SessionState::Disconnecting`] exactly once.
pub struct Session<D: Discovery> {
    discovery: D,
    config: SessionConfig,
    cancel_token: CancellationToken,
    updates: UnboundedSender<SessionUpdate>,
    state: SessionState,
}

impl<D: Discovery> Session<D> {
    pub fn new(
        discovery: D,
        config: SessionConfig,
        cancel_token: CancellationToken,
        updates: UnboundedSender<SessionUpdate>,
    ) -> Self {
        Self {
            discovery,
            config,
            cancel_token,
            updates,
            state: SessionState::Scanning,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub async fn run(&mut self) -> Result<SessionEnd, SessionError> {
        let result = self.run_inner().await;
        self.transition(SessionState::Terminated);
        match &result {
            Ok(end) => info!("Session ended: {:?}", end),
            Err(e) => error!("Session failed: {}", e),
        }
        result
    }

    async fn run_inner(&mut self) -> Result<SessionEnd, SessionError> {
        self.transition(SessionState::Scanning);
        let service = self.config.service_uuid;
        let scan_timeout = self.config.scan_timeout;
        let discovered = tokio::select! {
            result = self.discovery.discover(service, scan_timeout) => result,
            _ = self.cancel_token.cancelled() => {
                info!("Cancelled while scanning");
                return Ok(SessionEnd::Cancelled);
            }
        };
        let mut peer = match discovered {
            Ok(Some(peer)) => peer,
            Ok(None) => return Err(SessionError::NoDeviceFound),
            Err(e) => return Err(SessionError::Scan(e)),
        };
        let peer_info = peer.info();
        info!(
            "Found device: {:?} ({})",
            peer_info.name, peer_info.address
        );
        self.send(SessionUpdate::Found(peer_info));

        self.transition(SessionState::Connecting);
        let connect_timeout = self.config.connect_timeout;
        let connected = tokio::select! {
            result = tokio::time::timeout(connect_timeout, peer.connect()) => result,
            _ = self.cancel_token.cancelled() => {
                info!("Cancelled while connecting");
                self.disconnect_quietly(&mut peer).await;
                return Ok(SessionEnd::Cancelled);
            }
        };
        match connected {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!("BLE Connection error: {}", e);
                self.disconnect_quietly(&mut peer).await;
                return Err(SessionError::Connect(e));
            }
            Err(_) => {
                error!("Connection timed out");
                self.disconnect_quietly(&mut peer).await;
                return Err(SessionError::ConnectTimeout(connect_timeout));
            }
        }

        self.transition(SessionState::ConnectedIdle);
        let outcome = match peer.subscribe(self.config.characteristic_uuid).await {
            Ok(link_events) => {
                self.transition(SessionState::Subscribed);
                Ok(self.notification_loop(link_events).await)
            }
            Err(e) => {
                error!("Failed to subscribe to HR characteristic: {}", e);
                Err(SessionError::Subscribe(e))
            }
        };

        self.teardown(&mut peer).await;
        outcome
    }

    async fn notification_loop(
        &mut self,
        mut link_events: tokio::sync::mpsc::UnboundedReceiver<LinkEvent>,
    ) -> SessionEnd {
        loop {
            tokio::select! {
                // Checked first so a pending cancel isn't starved by a busy link
                biased;
                _ = self.cancel_token.cancelled() => {
                    info!("Shutting down HR notification loop!");
                    return SessionEnd::Cancelled;
                }
                event = link_events.recv() => match event {
                    Some(LinkEvent::Notification(raw)) => self.handle_notification(raw),
                    Some(LinkEvent::Disconnected) | None => {
                        warn!("Heart Rate Monitor disconnected");
                        return SessionEnd::PeerDisconnected;
                    }
                },
            }
        }
    }

    fn handle_notification(&mut self, raw: Vec<u8>) {
        match parse_hrm(&raw) {
            Ok(measurement) => {
                let status = HeartRateStatus::from_measurement(measurement, chrono::Local::now());
                debug!("{:?}", status);
                self.send(SessionUpdate::HeartRate(status));
            }
            Err(error) => {
                warn!("Malformed HR packet {:02x?}: {}", raw, error);
                self.send(SessionUpdate::DecodeFailed { raw, error });
            }
        }
    }

    async fn teardown(&mut self, peer: &mut D::Peer) {
        self.transition(SessionState::Disconnecting);
        match peer.unsubscribe(self.config.characteristic_uuid).await {
            Ok(()) => {
                info!("Notifications stopped");
                self.send(SessionUpdate::Unsubscribed);
            }
            Err(e) => {
                warn!("Error stopping notifications: {}", e);
                self.send(SessionUpdate::UnsubscribeFailed(e.to_string()));
            }
        }
        self.disconnect_quietly(peer).await;
    }

    async fn disconnect_quietly(&self, peer: &mut D::Peer) {
        if let Err(e) = peer.disconnect().await {
            warn!("Failed to disconnect from peer: {}", e);
        }
    }

    fn transition(&mut self, state: SessionState) {
        if self.state != state {
            debug!("Session state: {} -> {}", self.state, state);
        }
        self.state = state;
        self.send(SessionUpdate::State(state));
    }

    fn send(&self, update: SessionUpdate) {
        // The reporter going away must not tear the session down
        if self.updates.send(update).is_err() {
            debug!("No one is listening for session updates");
        }
    }
}
