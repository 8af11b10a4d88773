//! In-memory ledger host for testing.
//!
//! `MemHost` implements `Transport` on top of a deterministic in-memory
//! ledger. It behaves like a real host process would:
//!
//! - requests are applied in send order as they arrive
//! - a `Call` transfers value, opens a host-side call frame with a snapshot
//!   of the ledger and routes an `Invoke` back to the bridge
//! - the matching `InvokeResult` commits the frame, or restores the
//!   snapshot (balances, storage, code, events) when the callee failed
//!
//! The handle is cheap to clone; a test keeps one clone for setup and
//! inspection while the bridge owns another as its transport. Accounts are
//! kept in `BTreeMap`s so iteration order (and thus every run) is
//! deterministic.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use statebridge_primitives::{
    Address, Amount, BlockContext, CallRequest, CallResult, HostMessage, HostOp, HostRequest,
    HostResponse, InvokeRequest, OptionFlags, ResultKind, Ticket,
};

use crate::error::TransportError;
use crate::traits::Transport;

/// Default host-side limit on nested calls.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 64;

/// Order in which messages produced between two receives are handed to the
/// bridge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Delivery {
    #[default]
    InOrder,
    /// Newest completion first. Legal for writes to distinct keys; a
    /// protocol violation for writes sharing an ordering key.
    Reversed,
}

/// One ledger account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Account {
    pub balance: Amount,
    pub owner: Address,
    pub code: Option<Bytes>,
    pub transformed_code: Option<Bytes>,
    pub object_graph: Option<Bytes>,
    pub storage: BTreeMap<Bytes, Bytes>,
}

/// An event committed by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub contract: Address,
    pub indexed: Vec<Bytes>,
    pub data: Vec<Bytes>,
}

/// Host-side frame of an open call.
struct OpenCall {
    /// Ticket of the `Call` request; `None` for a top-level invocation.
    ticket: Option<Ticket>,
    accounts: BTreeMap<Address, Account>,
    events_len: usize,
}

struct HostState {
    accounts: BTreeMap<Address, Account>,
    block: BlockContext,
    events: Vec<Event>,
    next_ticket: u64,
    /// Messages produced since the bridge last received.
    held: Vec<HostMessage>,
    outbox: VecDeque<HostMessage>,
    /// Top-level invocations not yet started.
    invocations: VecDeque<InvokeRequest>,
    closing: bool,
    calls: Vec<OpenCall>,
    journal: Vec<HostRequest>,
    results: Vec<CallResult>,
    delivery: Delivery,
    fail_next: Option<String>,
    disconnected: bool,
    max_call_depth: usize,
}

impl Default for HostState {
    fn default() -> Self {
        Self {
            accounts: BTreeMap::new(),
            block: BlockContext::default(),
            events: Vec::new(),
            next_ticket: 0,
            held: Vec::new(),
            outbox: VecDeque::new(),
            invocations: VecDeque::new(),
            closing: false,
            calls: Vec::new(),
            journal: Vec::new(),
            results: Vec::new(),
            delivery: Delivery::InOrder,
            fail_next: None,
            disconnected: false,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

impl HostState {
    fn balance_of(&self, address: &Address) -> Amount {
        self.accounts.get(address).map_or(0, |a| a.balance)
    }

    fn has_code(&self, address: &Address) -> bool {
        self.accounts
            .get(address)
            .map_or(false, |a| a.code.is_some())
    }

    fn transfer(&mut self, from: Address, to: Address, value: Amount) {
        if value == 0 {
            return;
        }
        let source = self.accounts.entry(from).or_default();
        source.balance = source.balance.saturating_sub(value);
        let target = self.accounts.entry(to).or_default();
        target.balance = target.balance.saturating_add(value);
    }

    /// Snapshot the ledger and move `value`. Fails without side effects.
    fn open_call(
        &mut self,
        ticket: Option<Ticket>,
        caller: Address,
        target: Address,
        value: Amount,
    ) -> Result<(), ResultKind> {
        if self.calls.len() >= self.max_call_depth {
            return Err(ResultKind::StackOverflow);
        }
        if !self.has_code(&target) {
            return Err(ResultKind::NoCode);
        }
        if self.balance_of(&caller) < value {
            return Err(ResultKind::InsufficientBalance);
        }
        self.calls.push(OpenCall {
            ticket,
            accounts: self.accounts.clone(),
            events_len: self.events.len(),
        });
        self.transfer(caller, target, value);
        Ok(())
    }

    fn close_call(&mut self, result: CallResult) {
        let Some(open) = self.calls.pop() else {
            tracing::warn!("invoke result without an open call");
            return;
        };
        if !result.is_success() {
            self.accounts = open.accounts;
            self.events.truncate(open.events_len);
        }
        match open.ticket {
            Some(ticket) => self.held.push(HostMessage::Completion {
                ticket,
                response: HostResponse::Call(result),
            }),
            None => self.results.push(result),
        }
    }

    fn start_call(
        &mut self,
        ticket: Ticket,
        caller: Address,
        options: OptionFlags,
        call: CallRequest,
    ) -> HostMessage {
        match self.open_call(Some(ticket), caller, call.target, call.value) {
            Ok(()) => HostMessage::Invoke(InvokeRequest {
                contract: call.target,
                caller,
                method: call.method,
                params: call.params,
                value: call.value,
                step_limit: call.step_limit,
                options,
            }),
            Err(kind) => HostMessage::Completion {
                ticket,
                response: HostResponse::Call(CallResult::failure(kind, 0)),
            },
        }
    }

    fn apply(&mut self, ticket: Ticket, request: HostRequest) {
        let contract = request.contract;
        let read_only = request.options.read_only;
        tracing::trace!(ticket = %ticket, op = request.op.name(), contract = %contract, "host request");

        let op = match request.op {
            HostOp::InvokeResult(result) => {
                self.close_call(result);
                return;
            }
            op => op,
        };
        if let Some(reason) = self.fail_next.take() {
            self.held.push(HostMessage::Completion {
                ticket,
                response: HostResponse::Error(reason),
            });
            return;
        }
        if read_only && op.is_mutating() {
            self.held.push(HostMessage::Completion {
                ticket,
                response: HostResponse::Error(format!("{} from a read-only context", op.name())),
            });
            return;
        }

        let response = match op {
            HostOp::GetCode => {
                HostResponse::Value(self.accounts.get(&contract).and_then(|a| a.code.clone()))
            }
            HostOp::GetTransformedCode => HostResponse::Value(
                self.accounts
                    .get(&contract)
                    .and_then(|a| a.transformed_code.clone()),
            ),
            HostOp::SetTransformedCode(code) => {
                self.accounts.entry(contract).or_default().transformed_code = Some(code);
                HostResponse::Ack
            }
            HostOp::GetObjectGraph => HostResponse::Value(
                self.accounts
                    .get(&contract)
                    .and_then(|a| a.object_graph.clone()),
            ),
            HostOp::PutObjectGraph(graph) => {
                self.accounts.entry(contract).or_default().object_graph = Some(graph);
                HostResponse::Ack
            }
            HostOp::GetStorage(key) => HostResponse::Value(
                self.accounts
                    .get(&contract)
                    .and_then(|a| a.storage.get(&key).cloned()),
            ),
            HostOp::PutStorage { key, value } => {
                let storage = &mut self.accounts.entry(contract).or_default().storage;
                let previous = storage.get(&key).map(|v| size_field(v.len())).transpose();
                match previous {
                    Ok(previous_len) => {
                        match value {
                            Some(value) => storage.insert(key, value),
                            None => storage.remove(&key),
                        };
                        HostResponse::Stored { previous_len }
                    }
                    Err(reason) => HostResponse::Error(reason),
                }
            }
            HostOp::GetBalance(address) => HostResponse::Balance(self.balance_of(&address)),
            HostOp::GetBlockHeight => HostResponse::BlockHeight(self.block.height),
            HostOp::GetBlockTimestamp => HostResponse::BlockTimestamp(self.block.timestamp),
            HostOp::GetOwner => HostResponse::Owner(
                self.accounts
                    .get(&contract)
                    .map_or(Address::ZERO, |a| a.owner),
            ),
            HostOp::Log { indexed, data } => {
                self.events.push(Event {
                    contract,
                    indexed,
                    data,
                });
                HostResponse::Ack
            }
            HostOp::Call(call) => {
                let message = self.start_call(ticket, contract, request.options, call);
                self.held.push(message);
                return;
            }
            HostOp::InvokeResult(_) => return,
        };
        self.held.push(HostMessage::Completion { ticket, response });
    }

    /// Hand every held message to the bridge-facing queue.
    fn release(&mut self) {
        let mut batch = std::mem::take(&mut self.held);
        if self.delivery == Delivery::Reversed {
            batch.reverse();
        }
        self.outbox.extend(batch);
    }

    /// Next message for the bridge. Top-level invocations start one at a
    /// time, once every call frame is closed.
    fn next_message(&mut self) -> Option<HostMessage> {
        self.release();
        if let Some(message) = self.outbox.pop_front() {
            return Some(message);
        }
        if !self.calls.is_empty() {
            return None;
        }
        while let Some(request) = self.invocations.pop_front() {
            match self.open_call(None, request.caller, request.contract, request.value) {
                Ok(()) => return Some(HostMessage::Invoke(request)),
                Err(kind) => self.results.push(CallResult::failure(kind, 0)),
            }
        }
        if self.closing {
            return Some(HostMessage::Close);
        }
        None
    }
}

/// Cloneable handle to an in-memory ledger host.
#[derive(Clone, Default)]
pub struct MemHost {
    state: Arc<Mutex<HostState>>,
}

impl MemHost {
    /// Create an empty host.
    pub fn new() -> Self {
        Self::default()
    }

    // ── Setup ──

    /// Deploy `code` at `address`.
    pub fn deploy(&self, address: Address, code: impl Into<Bytes>) {
        self.state.lock().accounts.entry(address).or_default().code = Some(code.into());
    }

    /// Add `amount` to the balance of `address`.
    pub fn fund(&self, address: Address, amount: Amount) {
        let mut state = self.state.lock();
        let account = state.accounts.entry(address).or_default();
        account.balance = account.balance.saturating_add(amount);
    }

    pub fn set_owner(&self, address: Address, owner: Address) {
        self.state.lock().accounts.entry(address).or_default().owner = owner;
    }

    /// Preload a storage value.
    pub fn set_storage(&self, address: Address, key: &[u8], value: &[u8]) {
        self.state
            .lock()
            .accounts
            .entry(address)
            .or_default()
            .storage
            .insert(Bytes::copy_from_slice(key), Bytes::copy_from_slice(value));
    }

    pub fn set_block(&self, block: BlockContext) {
        self.state.lock().block = block;
    }

    pub fn set_delivery(&self, delivery: Delivery) {
        self.state.lock().delivery = delivery;
    }

    pub fn set_max_call_depth(&self, depth: usize) {
        self.state.lock().max_call_depth = depth;
    }

    // ── Fault injection ──

    /// Answer the next request (other than an invoke result) with an error.
    pub fn fail_next_request(&self, reason: impl Into<String>) {
        self.state.lock().fail_next = Some(reason.into());
    }

    /// Drop the connection; every later send or receive fails.
    pub fn disconnect(&self) {
        self.state.lock().disconnected = true;
    }

    /// Queue a raw message for the bridge, bypassing request processing.
    pub fn inject(&self, message: HostMessage) {
        let mut state = self.state.lock();
        state.release();
        state.outbox.push_back(message);
    }

    // ── Driving ──

    /// Queue a top-level invocation.
    ///
    /// When its turn comes the value moves from the caller first. If the
    /// target has no code or the caller cannot pay, the failure is recorded
    /// as a result and the invocation never reaches the bridge.
    pub fn invoke(&self, request: InvokeRequest) {
        self.state.lock().invocations.push_back(request);
    }

    /// Send `Close` once every queued invocation has finished.
    pub fn close(&self) {
        self.state.lock().closing = true;
    }

    // ── Inspection ──

    pub fn balance(&self, address: &Address) -> Amount {
        self.state.lock().balance_of(address)
    }

    pub fn storage(&self, address: &Address, key: &[u8]) -> Option<Bytes> {
        self.state
            .lock()
            .accounts
            .get(address)
            .and_then(|a| a.storage.get(key).cloned())
    }

    pub fn account(&self, address: &Address) -> Option<Account> {
        self.state.lock().accounts.get(address).cloned()
    }

    pub fn events(&self) -> Vec<Event> {
        self.state.lock().events.clone()
    }

    /// Every request received so far, in send order.
    pub fn requests(&self) -> Vec<HostRequest> {
        self.state.lock().journal.clone()
    }

    /// Operation names of every request received so far.
    pub fn op_names(&self) -> Vec<&'static str> {
        self.state
            .lock()
            .journal
            .iter()
            .map(|r| r.op.name())
            .collect()
    }

    pub fn clear_journal(&self) {
        self.state.lock().journal.clear();
    }

    /// Results of finished top-level invocations, oldest first.
    pub fn results(&self) -> Vec<CallResult> {
        self.state.lock().results.clone()
    }

    pub fn last_result(&self) -> Option<CallResult> {
        self.state.lock().results.last().cloned()
    }

    /// Number of host-side call frames still open.
    pub fn open_calls(&self) -> usize {
        self.state.lock().calls.len()
    }
}

impl Transport for MemHost {
    fn send(&mut self, request: HostRequest) -> Result<Ticket, TransportError> {
        let mut state = self.state.lock();
        if state.disconnected {
            return Err(TransportError::Disconnected);
        }
        state.next_ticket += 1;
        let ticket = Ticket(state.next_ticket);
        state.journal.push(request.clone());
        state.apply(ticket, request);
        Ok(ticket)
    }

    fn recv(&mut self) -> Result<HostMessage, TransportError> {
        let mut state = self.state.lock();
        if state.disconnected {
            return Err(TransportError::Disconnected);
        }
        state.next_message().ok_or(TransportError::Idle)
    }
}

/// Size of a stored value as reported on the wire.
fn size_field(len: usize) -> Result<u32, String> {
    u32::try_from(len).map_err(|_| format!("stored value of {} bytes is too large to report", len))
}
