// Counter demo program
//
// Loads `{"count": n}` from the slot, then bumps it `steps` times, waiting
// for each acknowledgment before sending the next value.

use std::ops::ControlFlow;

use log::warn;
use serde::{Deserialize, Serialize};
use stowage_client::Program;
use stowage_server::persistence::{BridgeResult, PersistSender};
use stowage_utils::{AckEvent, Flags};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterState {
    pub count: u64,
}

pub struct CounterProgram {
    steps: u64,
    state: CounterState,
    acked: u64,
    degraded: u64,
    echo: bool,
}

impl CounterProgram {
    pub fn new(steps: u64) -> Self {
        Self {
            steps,
            state: CounterState::default(),
            acked: 0,
            degraded: 0,
            echo: false,
        }
    }

    /// Print every acknowledgment to stdout as a JSON line.
    pub fn echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn state(&self) -> CounterState {
        self.state
    }

    /// Acknowledgments received so far.
    pub fn acked(&self) -> u64 {
        self.acked
    }

    /// Acknowledgments whose write the store rejected.
    pub fn degraded(&self) -> u64 {
        self.degraded
    }

    fn bump(&mut self, persist: &PersistSender) -> BridgeResult<ControlFlow<()>> {
        if self.acked >= self.steps {
            return Ok(ControlFlow::Break(()));
        }
        self.state.count += 1;
        persist.persist(&self.state)?;
        Ok(ControlFlow::Continue(()))
    }
}

impl Program for CounterProgram {
    fn init(&mut self, flags: Flags, persist: &PersistSender) -> BridgeResult<ControlFlow<()>> {
        self.state = match flags.storage.decode_as::<CounterState>() {
            Ok(state) => state.unwrap_or_default(),
            Err(e) => {
                warn!("Stowage: Ignoring unreadable counter state: {}", e);
                CounterState::default()
            }
        };
        self.bump(persist)
    }

    fn on_ack(&mut self, ack: AckEvent, persist: &PersistSender) -> BridgeResult<ControlFlow<()>> {
        if self.echo {
            println!("{}", serde_json::to_string(&ack)?);
        }
        self.acked += 1;
        if !ack.status.is_durable() {
            self.degraded += 1;
        }
        self.bump(persist)
    }
}
