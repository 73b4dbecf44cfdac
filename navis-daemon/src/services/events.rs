//! In-process event fanout.
//!
//! Interested subsystems (the UI bridge, websocket sessions, audit logging)
//! subscribe to a broadcast channel; publishing never blocks and a publisher
//! does not care whether anyone is listening.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::models::{ApprovalRequest, Device};

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum DaemonEvent {
    #[serde(rename = "approval.requested")]
    ApprovalRequested(ApprovalRequest),
    #[serde(rename = "approval.resolved")]
    ApprovalResolved(ApprovalRequest),
    #[serde(rename = "device.paired")]
    DevicePaired(Device),
    #[serde(rename = "device.revoked")]
    DeviceRevoked(Device),
}

#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<DaemonEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DaemonEvent> {
        self.sender.subscribe()
    }

    /// Fire-and-forget. A send error only means there are currently no
    /// subscribers, which is not a failure.
    pub fn publish(&self, event: DaemonEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ApprovalType;

    #[tokio::test]
    async fn test_publish_reaches_subscriber() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        let request = ApprovalRequest::new(
            ApprovalType::TerminalCommand,
            serde_json::json!({"command": "ls"}),
            None,
            None,
        );
        bus.publish(DaemonEvent::ApprovalRequested(request.clone()));

        match rx.recv().await.unwrap() {
            DaemonEvent::ApprovalRequested(got) => assert_eq!(got.id, request.id),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_publish_without_subscribers_is_ok() {
        let bus = EventBus::new();
        let device = Device::new(
            "d1".to_string(),
            "Phone".to_string(),
            "secret".to_string(),
            "digest".to_string(),
        );
        bus.publish(DaemonEvent::DevicePaired(device));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_event_wire_format() {
        let device = Device::new(
            "d1".to_string(),
            "Phone".to_string(),
            "secret".to_string(),
            "digest".to_string(),
        );
        let json = serde_json::to_value(DaemonEvent::DeviceRevoked(device)).unwrap();
        assert_eq!(json["event"], "device.revoked");
        assert_eq!(json["data"]["id"], "d1");
    }
}
