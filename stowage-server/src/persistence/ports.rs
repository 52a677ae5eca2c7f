// Persist / acknowledged channel pair between the application and the bridge

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use stowage_utils::{AckEvent, PersistedValue};
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use super::error::BridgeResult;

/// Application-side ends of the two channels.
pub struct AppPorts {
    pub persist: PersistSender,
    pub acks: AckReceiver,
}

/// Bridge-side ends of the two channels, consumed by `PersistenceBridge::attach`.
pub struct BridgePorts {
    pub(crate) submissions: UnboundedReceiver<PersistedValue>,
    pub(crate) acks: UnboundedSender<AckEvent>,
}

/// Create a connected port pair.
///
/// Both channels are unbounded: submitting never waits on the bridge and
/// acknowledging never waits on the application.
pub fn channel() -> (AppPorts, BridgePorts) {
    let (persist_tx, persist_rx) = mpsc::unbounded_channel();
    let (ack_tx, ack_rx) = mpsc::unbounded_channel();
    (
        AppPorts {
            persist: PersistSender {
                tx: persist_tx,
                sent: Arc::new(AtomicU64::new(0)),
            },
            acks: AckReceiver { rx: ack_rx },
        },
        BridgePorts {
            submissions: persist_rx,
            acks: ack_tx,
        },
    )
}

/// Inbound "persist" channel handle.
///
/// Clones feed the same channel and share one count of accepted values.
#[derive(Clone)]
pub struct PersistSender {
    tx: UnboundedSender<PersistedValue>,
    sent: Arc<AtomicU64>,
}

impl PersistSender {
    /// Queue `value` for the bridge.
    pub fn send(&self, value: PersistedValue) -> BridgeResult<()> {
        self.tx.send(value)?;
        self.sent.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Values queued through this handle or any of its clones. Each one gets
    /// exactly one acknowledgment, so this is also the number of
    /// acknowledgments to expect.
    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    /// Serialize `value` now and queue it as a present value.
    ///
    /// Serialization happens on the caller's stack so a value with no JSON
    /// representation fails here, loudly, instead of inside the bridge.
    pub fn persist<T: Serialize + ?Sized>(&self, value: &T) -> BridgeResult<()> {
        self.send(PersistedValue::from_serializable(value)?)
    }

    /// Queue removal of the slot.
    pub fn clear(&self) -> BridgeResult<()> {
        self.send(PersistedValue::Absent)
    }
}

/// Outbound "acknowledged" channel handle.
pub struct AckReceiver {
    rx: UnboundedReceiver<AckEvent>,
}

impl AckReceiver {
    pub(crate) fn new(rx: UnboundedReceiver<AckEvent>) -> Self {
        Self { rx }
    }

    /// Wait for the next acknowledgment. `None` once the bridge is gone and
    /// every queued acknowledgment has been received.
    pub async fn recv(&mut self) -> Option<AckEvent> {
        self.rx.recv().await
    }

    /// Take an acknowledgment that is already queued, without waiting.
    ///
    /// `Empty` means more may still come; `Disconnected` means the bridge is
    /// gone and nothing is left to receive.
    pub fn try_recv(&mut self) -> Result<AckEvent, TryRecvError> {
        self.rx.try_recv()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::BridgeError;
    use serde_json::json;
    use stowage_utils::AckStatus;

    #[test]
    fn test_persist_serializes_on_caller() {
        let (app, mut bridge) = channel();

        app.persist.persist(&json!({"count": 1})).unwrap();
        app.persist.clear().unwrap();

        assert_eq!(
            bridge.submissions.try_recv().unwrap(),
            PersistedValue::present(json!({"count": 1}))
        );
        assert_eq!(bridge.submissions.try_recv().unwrap(), PersistedValue::Absent);
    }

    #[test]
    fn test_clones_share_sent_count() {
        let (app, _bridge) = channel();
        let other = app.persist.clone();

        app.persist.persist(&1).unwrap();
        other.clear().unwrap();
        assert_eq!(app.persist.sent(), 2);
        assert_eq!(other.sent(), 2);
    }

    #[test]
    fn test_persist_unserializable_fails_synchronously() {
        let (app, mut bridge) = channel();

        let mut bad = std::collections::BTreeMap::new();
        bad.insert((1, 2), "tuple keys");
        assert!(matches!(
            app.persist.persist(&bad),
            Err(BridgeError::Serialization(_))
        ));
        assert!(bridge.submissions.try_recv().is_err());
        assert_eq!(app.persist.sent(), 0);
    }

    #[test]
    fn test_try_recv_reports_disconnect() {
        let (app, bridge) = channel();
        let AppPorts { persist: _persist, mut acks } = app;

        assert_eq!(acks.try_recv(), Err(TryRecvError::Empty));

        bridge
            .acks
            .send(AckEvent {
                sequence: 1,
                value: PersistedValue::Absent,
                status: AckStatus::Removed,
            })
            .unwrap();
        drop(bridge);

        assert_eq!(acks.try_recv().unwrap().sequence, 1);
        assert_eq!(acks.try_recv(), Err(TryRecvError::Disconnected));
    }

    #[test]
    fn test_send_after_bridge_dropped() {
        let (app, bridge) = channel();
        drop(bridge);
        assert!(matches!(
            app.persist.send(PersistedValue::Absent),
            Err(BridgeError::Detached)
        ));
        assert_eq!(app.persist.sent(), 0);
    }
}
