use serde::Serialize;
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 256;

/// Change notifications fanned out to every live snapshot stream. Consumers
/// re-read the store on each event, so a lagged receiver can skip ahead
/// without missing state.
#[derive(Debug, Clone)]
pub enum ChangeEvent {
    FeedChanged,
    LocationsChanged,
    ProximityAlert(ProximityAlert),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProximityAlert {
    /// Recipient. Streams deliver the alert only to this user's connections.
    pub user_id: String,
    pub from_user_id: String,
    pub from_user_name: String,
    pub distance_meters: f64,
}

#[derive(Clone)]
pub struct EventHub {
    tx: broadcast::Sender<ChangeEvent>,
}

impl EventHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Delivery is best effort; a send with no live subscribers is fine.
    pub fn publish(&self, event: ChangeEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let hub = EventHub::new();
        let mut rx = hub.subscribe();
        hub.publish(ChangeEvent::FeedChanged);
        assert!(matches!(rx.recv().await, Ok(ChangeEvent::FeedChanged)));
    }

    #[tokio::test]
    async fn publishing_without_subscribers_is_harmless() {
        let hub = EventHub::new();
        hub.publish(ChangeEvent::LocationsChanged);
        let mut rx = hub.subscribe();
        hub.publish(ChangeEvent::ProximityAlert(ProximityAlert {
            user_id: "user-1".into(),
            from_user_id: "user-2".into(),
            from_user_name: "Ben".into(),
            distance_meters: 1250.0,
        }));
        match rx.recv().await {
            Ok(ChangeEvent::ProximityAlert(alert)) => {
                assert_eq!(alert.user_id, "user-1");
                assert_eq!(alert.from_user_name, "Ben");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
