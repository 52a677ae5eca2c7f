// Persistence Bridge with asynchronous acknowledgment
//
// Writes every submitted value to the single storage slot before anything
// else happens, then queues the acknowledgment for the application's next
// turn of its event loop.

use log::{debug, info, warn};
use serde::Serialize;
use stowage_utils::{AckEvent, AckStatus, LoadedValue, PersistedValue, STORAGE_KEY};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use super::error::BridgeResult;
use super::ports::{AckReceiver, BridgePorts};
use crate::store::DurableStore;

/// Mediates every read and write of the storage slot.
///
/// Holds no state between calls besides counters; the slot content lives in
/// the store. Only [`STORAGE_KEY`] is ever touched.
pub struct PersistenceBridge<S: DurableStore> {
    store: S,
    acks: UnboundedSender<AckEvent>,
    /// Sequence number of the last acknowledgment queued
    sequence: u64,
    degraded: u64,
}

impl<S: DurableStore> PersistenceBridge<S> {
    fn new(store: S, acks: UnboundedSender<AckEvent>) -> Self {
        Self {
            store,
            acks,
            sequence: 0,
            degraded: 0,
        }
    }

    /// Bridge driven by direct [`submit`](Self::submit) calls.
    ///
    /// Returns the receiver the acknowledgments are queued on.
    pub fn detached(store: S) -> (Self, AckReceiver) {
        let (ack_tx, ack_rx) = mpsc::unbounded_channel();
        (Self::new(store, ack_tx), AckReceiver::new(ack_rx))
    }

    /// Bridge attached to the application's port pair.
    ///
    /// Nothing is processed until [`AttachedBridge::run`] is polled; values
    /// sent before then are buffered in order.
    pub fn attach(store: S, ports: BridgePorts) -> AttachedBridge<S> {
        info!("Stowage: persistence bridge attached to {} store", store.name());
        AttachedBridge {
            bridge: Self::new(store, ports.acks),
            submissions: ports.submissions,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Read the slot as it is now.
    ///
    /// The stored text is passed through without parsing. An unavailable
    /// store reads as `Absent`.
    pub fn initialize(&self) -> LoadedValue {
        match self.store.get(STORAGE_KEY) {
            Ok(text) => text.into(),
            Err(e) => {
                warn!("Stowage: Failed to read slot '{}': {}", STORAGE_KEY, e);
                warn!("Stowage: Starting without persisted state");
                LoadedValue::Absent
            }
        }
    }

    /// Write `value` to the slot (or remove the slot), then queue its acknowledgment.
    ///
    /// Returns the sequence number carried by the acknowledgment. A store
    /// failure does not fail the call: it is logged, counted, and reported
    /// as [`AckStatus::Degraded`].
    pub fn submit(&mut self, value: PersistedValue) -> BridgeResult<u64> {
        let text = value.to_json_text()?;
        let status = self.apply(text.as_deref());
        if !status.is_durable() {
            self.degraded += 1;
        }

        self.sequence += 1;
        let ack = AckEvent {
            sequence: self.sequence,
            value,
            status,
        };
        debug!("Stowage: queued ack #{} ({})", ack.sequence, ack.status);
        if self.acks.send(ack).is_err() {
            debug!("Stowage: application detached, ack #{} dropped", self.sequence);
        }
        Ok(self.sequence)
    }

    /// Serialize and submit an arbitrary value; `None` removes the slot.
    ///
    /// A value with no JSON representation is rejected before the store is
    /// touched and no acknowledgment is queued for it.
    pub fn submit_serializable<T: Serialize + ?Sized>(
        &mut self,
        value: Option<&T>,
    ) -> BridgeResult<u64> {
        let value = match value {
            Some(value) => PersistedValue::from_serializable(value)?,
            None => PersistedValue::Absent,
        };
        self.submit(value)
    }

    /// Number of acknowledgments queued so far.
    pub fn submitted(&self) -> u64 {
        self.sequence
    }

    /// Number of submissions the store rejected.
    pub fn degraded(&self) -> u64 {
        self.degraded
    }

    fn apply(&self, text: Option<&str>) -> AckStatus {
        let (result, status) = match text {
            Some(text) => (self.store.set(STORAGE_KEY, text), AckStatus::Written),
            None => (self.store.remove(STORAGE_KEY), AckStatus::Removed),
        };
        match result {
            Ok(()) => {
                debug!("Stowage: slot '{}' {}", STORAGE_KEY, status);
                status
            }
            Err(e) => {
                warn!("Stowage: Failed to update slot '{}': {}", STORAGE_KEY, e);
                warn!("Stowage: Continuing without persistence for this value");
                AckStatus::Degraded(e.to_string())
            }
        }
    }
}

/// Totals reported when an attached bridge stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BridgeSummary {
    pub submitted: u64,
    pub degraded: u64,
}

/// A bridge bound to the inbound persist channel
pub struct AttachedBridge<S: DurableStore> {
    bridge: PersistenceBridge<S>,
    submissions: UnboundedReceiver<PersistedValue>,
}

impl<S: DurableStore> AttachedBridge<S> {
    pub fn bridge(&self) -> &PersistenceBridge<S> {
        &self.bridge
    }

    /// Process submissions in arrival order until every `PersistSender` is dropped.
    pub async fn run(mut self) -> BridgeSummary {
        info!("Stowage: persistence bridge started");

        while let Some(value) = self.submissions.recv().await {
            if let Err(e) = self.bridge.submit(value) {
                warn!("Stowage: Submission rejected: {}", e);
            }
        }

        info!(
            "Stowage: persistence bridge stopped after {} submissions",
            self.bridge.submitted()
        );
        BridgeSummary {
            submitted: self.bridge.submitted(),
            degraded: self.bridge.degraded(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::{channel, BridgeError, TryRecvError};
    use crate::store::{MemoryStore, StoreError};
    use serde_json::{json, Value};

    fn present(value: Value) -> PersistedValue {
        PersistedValue::present(value)
    }

    #[test]
    fn test_empty_store_then_first_write() {
        let store = MemoryStore::new("test");
        let (mut bridge, mut acks) = PersistenceBridge::detached(store.clone());

        assert_eq!(bridge.initialize(), LoadedValue::Absent);

        bridge.submit(present(json!({"count": 1}))).unwrap();
        assert_eq!(store.entry(STORAGE_KEY).as_deref(), Some(r#"{"count":1}"#));

        let ack = acks.try_recv().unwrap();
        assert_eq!(ack.value, present(json!({"count": 1})));
        assert_eq!(ack.status, AckStatus::Written);
        assert_eq!(ack.sequence, 1);
    }

    #[test]
    fn test_stored_value_then_removal() {
        let store = MemoryStore::new("test").with_entry(STORAGE_KEY, r#"{"name":"x"}"#);
        let (mut bridge, mut acks) = PersistenceBridge::detached(store.clone());

        let loaded = bridge.initialize();
        assert_eq!(loaded.raw_text(), Some(r#"{"name":"x"}"#));
        assert_eq!(loaded.decode().unwrap(), present(json!({"name": "x"})));

        bridge.submit(PersistedValue::Absent).unwrap();
        assert_eq!(store.entry(STORAGE_KEY), None);
        assert_eq!(bridge.initialize(), LoadedValue::Absent);

        let ack = acks.try_recv().unwrap();
        assert_eq!(ack.value, PersistedValue::Absent);
        assert_eq!(ack.status, AckStatus::Removed);
    }

    #[test]
    fn test_rapid_submissions_keep_order() {
        let store = MemoryStore::new("test");
        let (mut bridge, mut acks) = PersistenceBridge::detached(store.clone());

        for n in 1..=3 {
            bridge.submit(present(json!(n))).unwrap();
        }
        assert_eq!(store.entry(STORAGE_KEY).as_deref(), Some("3"));

        let delivered: Vec<_> = std::iter::from_fn(|| acks.try_recv().ok())
            .map(|ack| (ack.sequence, ack.value))
            .collect();
        assert_eq!(
            delivered,
            vec![(1, present(json!(1))), (2, present(json!(2))), (3, present(json!(3)))]
        );
    }

    #[test]
    fn test_initialize_passes_text_through_unparsed() {
        let store = MemoryStore::new("test").with_entry(STORAGE_KEY, "{not json");
        let (bridge, _acks) = PersistenceBridge::detached(store);

        let loaded = bridge.initialize();
        assert_eq!(loaded.raw_text(), Some("{not json"));
        assert!(loaded.decode().is_err());
    }

    #[test]
    fn test_unreadable_store_initializes_absent() {
        let store = MemoryStore::new("test").with_entry(STORAGE_KEY, "1");
        store.fail_reads(Some(StoreError::Unavailable("disabled".to_string())));
        let (bridge, _acks) = PersistenceBridge::detached(store);

        assert_eq!(bridge.initialize(), LoadedValue::Absent);
    }

    #[test]
    fn test_write_failure_still_acknowledges() {
        let store = MemoryStore::new("test").with_entry(STORAGE_KEY, "0");
        store.fail_writes(Some(StoreError::Unavailable("quota exceeded".to_string())));
        let (mut bridge, mut acks) = PersistenceBridge::detached(store.clone());

        bridge.submit(present(json!(1))).unwrap();
        bridge.submit(PersistedValue::Absent).unwrap();

        let first = acks.try_recv().unwrap();
        assert_eq!(first.value, present(json!(1)));
        assert!(matches!(first.status, AckStatus::Degraded(ref reason) if reason.contains("quota")));
        assert!(!acks.try_recv().unwrap().status.is_durable());

        assert_eq!(store.entry(STORAGE_KEY).as_deref(), Some("0"));
        assert_eq!(bridge.degraded(), 2);
        assert_eq!(bridge.submitted(), 2);
    }

    #[test]
    fn test_unserializable_value_is_rejected_before_write() {
        let store = MemoryStore::new("test");
        let (mut bridge, mut acks) = PersistenceBridge::detached(store.clone());

        let mut bad = std::collections::HashMap::new();
        bad.insert(vec![0u8], 1);
        let result = bridge.submit_serializable(Some(&bad));

        assert!(matches!(result, Err(BridgeError::Serialization(_))));
        assert_eq!(store.set_count(), 0);
        assert_eq!(acks.try_recv(), Err(TryRecvError::Empty));
        assert_eq!(bridge.submitted(), 0);
    }

    #[test]
    fn test_submit_serializable_none_removes() {
        let store = MemoryStore::new("test").with_entry(STORAGE_KEY, "1");
        let (mut bridge, _acks) = PersistenceBridge::detached(store.clone());

        bridge.submit_serializable::<u32>(None).unwrap();
        assert_eq!(store.entry(STORAGE_KEY), None);
        assert_eq!(store.remove_count(), 1);
    }

    #[test]
    fn test_ack_arrives_after_slot_is_visible() {
        let store = MemoryStore::new("test");
        let (mut bridge, mut acks) = PersistenceBridge::detached(store.clone());

        bridge.submit(present(json!(1))).unwrap();

        // The handler below resubmits from outside the first submit call:
        // submit has already returned by the time any ack is observed.
        let mut seen = Vec::new();
        while let Ok(ack) = acks.try_recv() {
            let n = ack.value.as_option().and_then(Value::as_u64).unwrap();
            assert_eq!(bridge.initialize().raw_text(), Some(n.to_string().as_str()));
            seen.push(n);

            if n < 3 {
                let before = store.set_count();
                bridge.submit(present(json!(n + 1))).unwrap();
                assert_eq!(store.set_count(), before + 1);
            }
        }
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[test]
    fn test_only_the_storage_key_is_touched() {
        let store = MemoryStore::new("test").with_entry("other", "untouched");
        let (mut bridge, _acks) = PersistenceBridge::detached(store.clone());

        bridge.submit(present(json!("a"))).unwrap();
        bridge.submit(PersistedValue::Absent).unwrap();
        bridge.submit(present(json!("b"))).unwrap();

        assert_eq!(store.keys(), vec!["other".to_string(), STORAGE_KEY.to_string()]);
        assert_eq!(store.entry("other").as_deref(), Some("untouched"));
    }

    #[test]
    fn test_submit_without_receiver() {
        let store = MemoryStore::new("test");
        let (mut bridge, acks) = PersistenceBridge::detached(store.clone());
        drop(acks);

        assert_eq!(bridge.submit(present(json!(true))).unwrap(), 1);
        assert_eq!(store.entry(STORAGE_KEY).as_deref(), Some("true"));
    }

    #[test]
    fn test_dropped_bridge_disconnects_acks() {
        let store = MemoryStore::new("test");
        let (mut bridge, mut acks) = PersistenceBridge::detached(store);

        bridge.submit(present(json!(1))).unwrap();
        drop(bridge);

        assert_eq!(acks.try_recv().unwrap().value, present(json!(1)));
        assert_eq!(acks.try_recv(), Err(TryRecvError::Disconnected));
    }

    #[tokio::test]
    async fn test_attached_bridge_processes_channel_in_order() {
        let store = MemoryStore::new("test");
        let (app, ports) = channel();
        let attached = PersistenceBridge::attach(store.clone(), ports);
        assert_eq!(attached.bridge().initialize(), LoadedValue::Absent);

        let mut acks = app.acks;
        for n in 1..=3 {
            app.persist.persist(&n).unwrap();
        }
        app.persist.clear().unwrap();
        drop(app.persist);

        let summary = tokio::spawn(attached.run()).await.unwrap();
        assert_eq!(
            summary,
            BridgeSummary {
                submitted: 4,
                degraded: 0
            }
        );

        let mut values = Vec::new();
        while let Some(ack) = acks.recv().await {
            values.push(ack.value);
        }
        assert_eq!(
            values,
            vec![
                present(json!(1)),
                present(json!(2)),
                present(json!(3)),
                PersistedValue::Absent
            ]
        );
        assert_eq!(store.entry(STORAGE_KEY), None);
    }
}
