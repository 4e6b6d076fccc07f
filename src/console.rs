use crate::heart_rate::ble::HEART_RATE_MEASUREMENT_CHARACTERISTIC_UUID;
use crate::session::{SessionEnd, SessionError, SessionState, SessionUpdate};

use tokio::sync::mpsc::UnboundedReceiver;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct ConsoleOptions {
    pub report_rr_intervals: bool,
    pub characteristic_uuid: Uuid,
}

impl Default for ConsoleOptions {
    fn default() -> Self {
        Self {
            report_rr_intervals: false,
            characteristic_uuid: HEART_RATE_MEASUREMENT_CHARACTERISTIC_UUID,
        }
    }
}

/// Prints every update until the session drops its sender.
pub async fn print_updates(mut updates: UnboundedReceiver<SessionUpdate>, options: ConsoleOptions) {
    while let Some(update) = updates.recv().await {
        for line in render(&update, &options) {
            println!("{line}");
        }
    }
}

/// Turns a session update into the lines shown to the user (possibly none).
pub fn render(update: &SessionUpdate, options: &ConsoleOptions) -> Vec<String> {
    match update {
        SessionUpdate::State(SessionState::Scanning) => {
            vec!["Scanning for devices advertising Heart Rate Service...".into()]
        }
        SessionUpdate::State(SessionState::Connecting) => vec!["Connecting...".into()],
        SessionUpdate::State(SessionState::ConnectedIdle) => vec![
            "Connected successfully!".into(),
            format!(
                "Subscribing to Heart Rate Measurement notifications ({})...",
                options.characteristic_uuid
            ),
        ],
        SessionUpdate::State(SessionState::Subscribed) => {
            vec!["Subscription successful. Waiting for data... (Press Ctrl+C to stop)".into()]
        }
        SessionUpdate::State(_) => Vec::new(),
        SessionUpdate::Found(peer) => vec![format!(
            "Found device: {} ({})",
            peer.name.as_deref().unwrap_or("Unknown"),
            peer.address
        )],
        SessionUpdate::HeartRate(status) => {
            let mut lines = vec![format!("Heart Rate: {} bpm", status.heart_rate_bpm)];
            if options.report_rr_intervals {
                if let Some(rr) = status.rr_intervals.as_ref().filter(|rr| !rr.is_empty()) {
                    lines.push(format!("  RR Intervals (ms): {:?}", rr));
                }
            }
            lines
        }
        SessionUpdate::DecodeFailed { raw, .. } => {
            vec![format!("Error: Received incomplete data: {}", to_hex(raw))]
        }
        SessionUpdate::Unsubscribed => vec!["Notifications stopped.".into()],
        SessionUpdate::UnsubscribeFailed(e) => vec![format!("Error stopping notifications: {e}")],
    }
}

/// Final lines for how the session ended.
pub fn render_outcome(outcome: &Result<SessionEnd, SessionError>) -> Vec<String> {
    match outcome {
        Ok(SessionEnd::Cancelled) => vec!["\nMonitoring stopped by user.".into()],
        Ok(SessionEnd::PeerDisconnected) => vec!["Device disconnected.".into()],
        Err(SessionError::NoDeviceFound) => vec![
            "No device advertising the Heart Rate Service found.".into(),
            "Ensure the device's HR broadcasting is enabled in its settings.".into(),
        ],
        Err(SessionError::Scan(e)) => vec![format!("Bluetooth scanning error: {e}")],
        Err(e @ (SessionError::Connect(_) | SessionError::ConnectTimeout(_))) => {
            vec![e.to_string()]
        }
        Err(SessionError::Subscribe(e)) => vec![format!("Bluetooth operation error: {e}")],
    }
}

pub fn to_hex(data: &[u8]) -> String {
    data.iter().map(|byte| format!("{byte:02x}")).collect()
}
