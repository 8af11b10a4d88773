//! State bridge facade.
//!
//! `StateBridge` is the `ExternalState` a contract runtime receives for one
//! frame. Every operation follows the same order:
//! 1. fail with `Aborted` if the session is poisoned
//! 2. fail read-only violations before anything else
//! 3. charge the step cost (reads sized by their result charge afterwards)
//! 4. hand off to the owning component
//!
//! Fatal errors returned by a component poison the session on their way out.

use bytes::Bytes;
use statebridge_hostapi::{BridgeError, CompletionSink, ExternalState, StepMeter};
use statebridge_primitives::{
    Address, Amount, BlockHeight, CallResult, OptionFlags, StepCost, Timestamp, Value,
};

use crate::registry::CompletionRegistry;
use crate::session::{Frame, Session};
use crate::{dispatcher, events, ledger, object_store, storage};

/// Target of per-operation trace records.
pub const TRACE_TARGET: &str = "statebridge::trace";

/// Emit a trace record when the frame runs with the trace option.
macro_rules! trace_op {
    ($bridge:expr, $op:expr) => {
        if $bridge.options.trace {
            tracing::trace!(target: TRACE_TARGET, contract = %$bridge.contract, op = $op);
        }
    };
    ($bridge:expr, $op:expr, $($field:tt)+) => {
        if $bridge.options.trace {
            tracing::trace!(target: TRACE_TARGET, contract = %$bridge.contract, op = $op, $($field)+);
        }
    };
}

/// External state of one frame.
pub struct StateBridge<'s> {
    session: &'s mut Session,
    frame: usize,
    contract: Address,
    options: OptionFlags,
}

impl<'s> StateBridge<'s> {
    pub(crate) fn new(session: &'s mut Session, frame: usize) -> Self {
        let (contract, options) = session
            .frame(frame)
            .map(|f| (f.contract, f.options))
            .unwrap_or_default();
        Self {
            session,
            frame,
            contract,
            options,
        }
    }

    fn deny_if_read_only(&self, operation: &'static str) -> Result<(), BridgeError> {
        if self.options.read_only {
            tracing::debug!(contract = %self.contract, operation, "read-only violation");
            return Err(BridgeError::ReadOnly { operation });
        }
        Ok(())
    }

    fn meter(
        &mut self,
        charge: impl FnOnce(&mut StepMeter) -> Result<(), BridgeError>,
    ) -> Result<(), BridgeError> {
        let (_, frame) = self.session.split(self.frame)?;
        charge(&mut frame.meter)
    }

    /// Run a component operation on this frame, recording fatal errors.
    fn with_frame<T>(
        &mut self,
        op: impl FnOnce(&mut CompletionRegistry, &mut Frame) -> Result<T, BridgeError>,
    ) -> Result<T, BridgeError> {
        let result = self
            .session
            .split(self.frame)
            .and_then(|(registry, frame)| op(registry, frame));
        self.session.record(result)
    }
}

impl ExternalState for StateBridge<'_> {
    // ── Code and object graph ──

    fn get_code(&mut self) -> Result<Option<Bytes>, BridgeError> {
        self.session.ensure_live()?;
        trace_op!(self, "get_code");
        self.with_frame(|registry, frame| object_store::get_code(registry, frame))
    }

    fn get_transformed_code(&mut self) -> Result<Option<Bytes>, BridgeError> {
        self.session.ensure_live()?;
        trace_op!(self, "get_transformed_code");
        self.with_frame(object_store::get_transformed_code)
    }

    fn set_transformed_code(&mut self, code: &[u8]) -> Result<(), BridgeError> {
        self.session.ensure_live()?;
        trace_op!(self, "set_transformed_code", len = code.len());
        self.deny_if_read_only("set_transformed_code")?;
        self.with_frame(|registry, frame| {
            object_store::set_transformed_code(registry, frame, code)
        })
    }

    fn put_object_graph(&mut self, graph: &[u8]) -> Result<(), BridgeError> {
        self.session.ensure_live()?;
        trace_op!(self, "put_object_graph", len = graph.len());
        self.deny_if_read_only("put_object_graph")?;
        self.with_frame(|registry, frame| object_store::put_object_graph(registry, frame, graph))
    }

    fn get_object_graph(&mut self) -> Result<Option<Bytes>, BridgeError> {
        self.session.ensure_live()?;
        trace_op!(self, "get_object_graph");
        self.with_frame(object_store::get_object_graph)
    }

    // ── Storage ──

    fn put_storage(
        &mut self,
        key: &[u8],
        value: Option<&[u8]>,
        sink: CompletionSink,
    ) -> Result<(), BridgeError> {
        self.session.ensure_live()?;
        trace_op!(self, "put_storage", key = %hex::encode(key), len = ?value.map(<[u8]>::len));
        self.deny_if_read_only("put_storage")?;
        self.meter(|m| m.charge_storage_write(key.len(), value.map(<[u8]>::len)))?;
        self.with_frame(|registry, frame| storage::put(registry, frame, key, value, sink))
    }

    fn wait_for_callback(&mut self) -> Result<bool, BridgeError> {
        self.session.ensure_live()?;
        trace_op!(self, "wait_for_callback");
        self.with_frame(|registry, frame| registry.wait_one(frame.scope))
    }

    fn wait_for_callbacks(&mut self) -> Result<(), BridgeError> {
        self.session.ensure_live()?;
        trace_op!(self, "wait_for_callbacks");
        self.with_frame(|registry, frame| {
            registry.wait_all(frame.scope)?;
            frame.storage.prune(|t| registry.is_outstanding(t));
            Ok(())
        })
    }

    fn get_storage(&mut self, key: &[u8]) -> Result<Option<Bytes>, BridgeError> {
        self.session.ensure_live()?;
        trace_op!(self, "get_storage", key = %hex::encode(key));
        let value = self.with_frame(|registry, frame| storage::get(registry, frame, key))?;
        let value_len = value.as_ref().map_or(0, Bytes::len);
        self.meter(|m| m.charge_storage_read(key.len(), value_len))?;
        Ok(value)
    }

    // ── Ledger queries ──

    fn get_balance(&mut self, address: &Address) -> Result<Amount, BridgeError> {
        self.session.ensure_live()?;
        trace_op!(self, "get_balance", address = %address);
        self.meter(StepMeter::charge_api_call)?;
        self.with_frame(|registry, frame| ledger::get_balance(registry, frame, address))
    }

    fn get_block_height(&mut self) -> Result<BlockHeight, BridgeError> {
        self.session.ensure_live()?;
        trace_op!(self, "get_block_height");
        self.meter(StepMeter::charge_api_call)?;
        let result = self
            .session
            .block_parts(self.frame)
            .and_then(|(registry, frame, cache)| ledger::get_block_height(registry, frame, cache));
        self.session.record(result)
    }

    fn get_block_timestamp(&mut self) -> Result<Timestamp, BridgeError> {
        self.session.ensure_live()?;
        trace_op!(self, "get_block_timestamp");
        self.meter(StepMeter::charge_api_call)?;
        let result = self
            .session
            .block_parts(self.frame)
            .and_then(|(registry, frame, cache)| {
                ledger::get_block_timestamp(registry, frame, cache)
            });
        self.session.record(result)
    }

    fn get_owner(&mut self) -> Result<Address, BridgeError> {
        self.session.ensure_live()?;
        trace_op!(self, "get_owner");
        self.meter(StepMeter::charge_api_call)?;
        self.with_frame(|registry, frame| ledger::get_owner(registry, frame))
    }

    // ── Events ──

    fn log(&mut self, indexed: Vec<Bytes>, data: Vec<Bytes>) -> Result<(), BridgeError> {
        self.session.ensure_live()?;
        trace_op!(self, "log", indexed = indexed.len(), data = data.len());
        self.deny_if_read_only("log")?;
        let payload_len = events::payload_len(&indexed, &data);
        self.meter(|m| m.charge_event(payload_len))?;
        self.with_frame(|registry, frame| events::log(registry, frame, indexed, data))
    }

    // ── Calls ──

    fn call(
        &mut self,
        target: &Address,
        method: &str,
        params: Vec<Value>,
        value: Amount,
        step_limit: u64,
    ) -> Result<CallResult, BridgeError> {
        self.session.ensure_live()?;
        trace_op!(self, "call", target = %target, method, value = %value, step_limit);
        let result = dispatcher::call(
            self.session,
            self.frame,
            target,
            method,
            params,
            value,
            step_limit,
        );
        self.session.record(result)
    }

    // ── Context ──

    fn options(&self) -> OptionFlags {
        self.options
    }

    fn step_cost(&self) -> &StepCost {
        &self.session.config().step_cost
    }

    fn address(&self) -> Address {
        self.contract
    }

    fn charge_steps(&mut self, steps: u64) -> Result<(), BridgeError> {
        self.session.ensure_live()?;
        self.meter(|m| m.charge(steps))
    }

    fn steps_remaining(&self) -> u64 {
        self.session
            .frame(self.frame)
            .map_or(0, |frame| frame.meter.remaining())
    }
}
