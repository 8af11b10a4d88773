//! Traits at the three seams of the bridge.
//!
//! - `Transport`: bridge ↔ host connection.
//! - `ExternalState`: what a running contract sees of the ledger.
//! - `ContractRuntime`: the engine that runs a contract method.

use bytes::Bytes;
use statebridge_primitives::{
    Address, Amount, BlockHeight, CallResult, HostMessage, HostRequest, InvokeRequest,
    OptionFlags, StepCost, Ticket, Timestamp, Value,
};

use crate::error::{BridgeError, TransportError};
use crate::types::CompletionSink;

/// Connection to the host.
///
/// Contract every implementation upholds:
/// - The host processes requests in the order they were sent. Completions
///   may be delivered in any order.
/// - `recv` blocks until a message is available.
/// - Every request except `HostOp::InvokeResult` is answered by exactly one
///   `HostMessage::Completion` carrying the ticket `send` returned.
pub trait Transport {
    /// Send a request and return the ticket its completion will carry.
    fn send(&mut self, request: HostRequest) -> Result<Ticket, TransportError>;

    /// Receive the next message from the host.
    fn recv(&mut self) -> Result<HostMessage, TransportError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&mut self, request: HostRequest) -> Result<Ticket, TransportError> {
        (**self).send(request)
    }

    fn recv(&mut self) -> Result<HostMessage, TransportError> {
        (**self).recv()
    }
}

/// Ledger state as seen by one executing contract.
///
/// Every operation is scoped to [`address`](ExternalState::address). Steps
/// are charged from the context's [`StepCost`] before (or, for reads whose
/// size is only known afterwards, right after) the host is contacted.
/// Errors for which [`BridgeError::is_fatal`] holds abort the whole
/// top-level execution.
pub trait ExternalState {
    // ── Code and object graph ──

    /// Pre-transformed code of this contract, `None` if not deployed.
    fn get_code(&mut self) -> Result<Option<Bytes>, BridgeError>;

    /// Transformed code of this contract, `None` if never stored.
    fn get_transformed_code(&mut self) -> Result<Option<Bytes>, BridgeError>;

    /// Store transformed code. Asynchronous; drained before the context ends.
    fn set_transformed_code(&mut self, code: &[u8]) -> Result<(), BridgeError>;

    /// Store the serialized object graph. Asynchronous; later writes
    /// supersede earlier ones and the host commits them in issue order.
    fn put_object_graph(&mut self, graph: &[u8]) -> Result<(), BridgeError>;

    /// Newest object graph, including one not yet acknowledged.
    fn get_object_graph(&mut self) -> Result<Option<Bytes>, BridgeError>;

    // ── Storage ──

    /// Write `value` under `key`, or delete the key when `value` is `None`.
    ///
    /// Returns once the write is issued. `sink` receives the size of the
    /// replaced value when the host acknowledges. `Some(&[])` stores the
    /// empty value, which is distinct from absence.
    fn put_storage(
        &mut self,
        key: &[u8],
        value: Option<&[u8]>,
        sink: CompletionSink,
    ) -> Result<(), BridgeError>;

    /// Wait for the oldest outstanding write of this context.
    ///
    /// Returns `false` immediately when nothing is outstanding.
    fn wait_for_callback(&mut self) -> Result<bool, BridgeError>;

    /// Wait until no write of this context is outstanding.
    fn wait_for_callbacks(&mut self) -> Result<(), BridgeError>;

    /// Read `key`. Reflects every write this context issued, acknowledged
    /// or not.
    fn get_storage(&mut self, key: &[u8]) -> Result<Option<Bytes>, BridgeError>;

    // ── Ledger queries ──

    /// Balance of `address`; zero for an address with no state.
    fn get_balance(&mut self, address: &Address) -> Result<Amount, BridgeError>;

    fn get_block_height(&mut self) -> Result<BlockHeight, BridgeError>;

    fn get_block_timestamp(&mut self) -> Result<Timestamp, BridgeError>;

    /// Owner of this contract.
    fn get_owner(&mut self) -> Result<Address, BridgeError>;

    // ── Events ──

    /// Emit an event. Fire-and-forget.
    fn log(&mut self, indexed: Vec<Bytes>, data: Vec<Bytes>) -> Result<(), BridgeError>;

    // ── Calls ──

    /// Invoke `method` on `target`, moving `value` if the call succeeds.
    ///
    /// Every call outcome, failed ones included, is returned as a
    /// [`CallResult`]. `Err` means either a fatal error or that the caller
    /// could not pay the call's base cost (`StepLimitExceeded`).
    fn call(
        &mut self,
        target: &Address,
        method: &str,
        params: Vec<Value>,
        value: Amount,
        step_limit: u64,
    ) -> Result<CallResult, BridgeError>;

    // ── Context ──

    /// Option flags, fixed for the lifetime of the context.
    fn options(&self) -> OptionFlags;

    fn is_read_only(&self) -> bool {
        self.options().read_only
    }

    fn is_trace(&self) -> bool {
        self.options().trace
    }

    /// Cost schedule, fixed for the lifetime of the context.
    fn step_cost(&self) -> &StepCost;

    /// Contract this context executes.
    fn address(&self) -> Address;

    /// Charge engine-metered steps (e.g. executed instructions).
    fn charge_steps(&mut self, steps: u64) -> Result<(), BridgeError>;

    fn steps_remaining(&self) -> u64;
}

/// Contract execution engine.
///
/// Runs one method of one contract against the supplied state. Contract
/// failures are reported as domain errors (`Reverted`, `MethodNotFound`,
/// `Failure`, or any domain error bubbled up from `state`); fatal errors
/// from `state` must be propagated unchanged.
pub trait ContractRuntime {
    fn invoke(
        &self,
        state: &mut dyn ExternalState,
        request: &InvokeRequest,
    ) -> Result<Value, BridgeError>;
}
