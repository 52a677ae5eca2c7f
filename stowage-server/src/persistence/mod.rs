// Stowage Persistence Layer
//
// This module bridges the application runtime and the durable store: one
// inbound "persist" channel, one outbound "acknowledged" channel, one slot.
// Every submission is written synchronously and acknowledged asynchronously,
// in submission order.

mod bridge;
mod error;
mod ports;

pub use bridge::{AttachedBridge, BridgeSummary, PersistenceBridge};
pub use error::{BridgeError, BridgeResult};
pub use ports::{channel, AckReceiver, AppPorts, BridgePorts, PersistSender};
pub use tokio::sync::mpsc::error::TryRecvError;
