// Stowage bootstrap
//
// Reads the slot, starts the program with it, attaches the bridge to the
// program's channels, then runs the program's event loop until it stops.
// Everything runs on one thread; the bridge is a local task next to the loop.

use log::{debug, info};
use stowage_server::persistence::{
    self, AckReceiver, AppPorts, BridgeError, BridgeResult, BridgeSummary, PersistSender,
    PersistenceBridge,
};
use stowage_server::store::DurableStore;
use stowage_utils::Flags;
use thiserror::Error;
use tokio::task::{self, JoinError, LocalSet};

use crate::program::Program;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error("Persistence bridge task failed: {0}")]
    BridgeTask(#[from] JoinError),
}

pub type BootstrapResult<T> = Result<T, BootstrapError>;

/// A finished run: the program in its final state and the bridge totals.
#[derive(Debug)]
pub struct Session<P> {
    pub program: P,
    pub summary: BridgeSummary,
}

/// Bootstrap `program` against `store` and run it to completion.
///
/// Every value the program sent is written before this returns, even when
/// the program stopped without waiting for its acknowledgment.
pub async fn start<S, P>(store: S, program: P) -> BootstrapResult<Session<P>>
where
    S: DurableStore + 'static,
    P: Program,
{
    LocalSet::new().run_until(run_session(store, program)).await
}

async fn run_session<S, P>(store: S, mut program: P) -> BootstrapResult<Session<P>>
where
    S: DurableStore + 'static,
    P: Program,
{
    let (app, ports) = persistence::channel();
    let AppPorts { persist, mut acks } = app;

    let attached = PersistenceBridge::attach(store, ports);
    let flags = Flags {
        storage: attached.bridge().initialize(),
    };
    match flags.storage.raw_text() {
        Some(text) => debug!("Stowage: starting with {} bytes of stored state", text.len()),
        None => debug!("Stowage: starting without stored state"),
    }
    let bridge = task::spawn_local(attached.run());

    let outcome = drive(&mut program, flags, &persist, &mut acks).await;

    // Closing the persist channel lets the bridge drain and stop.
    drop(persist);
    let summary = bridge.await?;
    outcome?;

    info!(
        "Stowage: session finished ({} submitted, {} degraded)",
        summary.submitted, summary.degraded
    );
    Ok(Session { program, summary })
}

async fn drive<P: Program>(
    program: &mut P,
    flags: Flags,
    persist: &PersistSender,
    acks: &mut AckReceiver,
) -> BridgeResult<()> {
    let mut flow = program.init(flags, persist)?;
    let mut received = 0;
    while flow.is_continue() {
        // Every value sent has been acknowledged, so nothing can wake the loop.
        if received == persist.sent() {
            info!("Stowage: program is idle with no pending acknowledgments, stopping");
            break;
        }
        let ack = match acks.recv().await {
            Some(ack) => ack,
            None => break,
        };
        received += 1;
        flow = program.on_ack(ack, persist)?;
    }
    Ok(())
}
