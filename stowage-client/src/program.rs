// Application runtime seam
//
// The bridge treats the application as a black box: it is started with
// `Flags`, emits values on the persist channel, and is told about every
// acknowledgment. Anything with that shape can be bootstrapped.

use std::ops::ControlFlow;

use stowage_server::persistence::{BridgeResult, PersistSender};
use stowage_utils::{AckEvent, Flags};

/// An interactive program driven by the bootstrap event loop.
///
/// Both hooks run on the event loop task, never inside the bridge's
/// `submit`. Sending on `persist` from `on_ack` is therefore safe: the
/// new value is written on the bridge's next turn and acknowledged after
/// this hook has returned.
///
/// Return `ControlFlow::Break(())` to stop the loop. Values already sent
/// are still written before the bootstrap returns. Returning `Continue`
/// with every sent value already acknowledged also stops the loop, since
/// no further acknowledgment can arrive.
pub trait Program {
    /// Start with the slot content read at startup.
    fn init(&mut self, flags: Flags, persist: &PersistSender) -> BridgeResult<ControlFlow<()>>;

    /// React to one acknowledgment. Acknowledgments arrive in submission order.
    fn on_ack(&mut self, ack: AckEvent, persist: &PersistSender)
        -> BridgeResult<ControlFlow<()>>;
}
