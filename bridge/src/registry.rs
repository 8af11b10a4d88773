//! Completion registry.
//!
//! The registry is the single ordering authority between the bridge and the
//! host. It owns the transport, hands out tickets, and routes every
//! completion to the handler recorded when the request was issued.
//!
//! Outstanding tickets are tracked along two axes:
//! - **scope**: the execution context that issued the request. Waits are
//!   per scope, so a nested context never blocks on its caller's writes.
//! - **order key**: requests that must commit in issue order (writes to
//!   one storage key, to the transformed code, or to the object graph).
//!   A completion that overtakes an older ticket of the same key is a
//!   protocol violation.
//!
//! Synchronous reads are issued without a scope and awaited directly.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;

use bytes::Bytes;
use statebridge_hostapi::{BridgeError, Completion, CompletionSink, Transport, TransportError};
use statebridge_primitives::{
    Address, HostMessage, HostRequest, HostResponse, InvokeRequest, Ticket,
};

/// Identifier of one execution context's sub-registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScopeId(u64);

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scope-{}", self.0)
    }
}

/// Requests sharing an order key complete in issue order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum OrderKey {
    Storage(Address, Bytes),
    TransformedCode(Address),
    ObjectGraph(Address),
}

/// What to do with a ticket's completion.
#[derive(Debug)]
pub enum Sink {
    /// Expect an acknowledgement and drop it.
    Discard,
    /// Deliver a storage-write completion.
    Notify(CompletionSink),
    /// Keep the response for whoever awaits the ticket.
    Capture,
}

/// A message other than a completion.
#[derive(Debug)]
pub enum Incoming {
    Invoke(InvokeRequest),
    Close,
}

/// Result of waiting on a captured ticket.
#[derive(Debug)]
pub enum Awaited {
    Ready(HostResponse),
    /// The host routed an invocation back to the bridge first.
    Invoke(InvokeRequest),
}

#[derive(Debug)]
struct Pending {
    op: &'static str,
    scope: Option<ScopeId>,
    order_key: Option<OrderKey>,
    sink: Sink,
}

/// Tracks outstanding host requests of one top-level session.
pub struct CompletionRegistry {
    transport: Box<dyn Transport>,
    pending: BTreeMap<Ticket, Pending>,
    scopes: BTreeMap<ScopeId, VecDeque<Ticket>>,
    order: BTreeMap<OrderKey, VecDeque<Ticket>>,
    captured: BTreeMap<Ticket, HostResponse>,
    next_scope: u64,
}

impl CompletionRegistry {
    /// Create a registry that owns `transport`.
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self {
            transport,
            pending: BTreeMap::new(),
            scopes: BTreeMap::new(),
            order: BTreeMap::new(),
            captured: BTreeMap::new(),
            next_scope: 0,
        }
    }

    // ── Scopes ──

    /// Allocate a scope for a new execution context.
    pub fn open_scope(&mut self) -> ScopeId {
        self.next_scope += 1;
        let scope = ScopeId(self.next_scope);
        self.scopes.insert(scope, VecDeque::new());
        scope
    }

    /// Forget a scope. Its tickets must already be resolved.
    pub fn close_scope(&mut self, scope: ScopeId) {
        self.scopes.remove(&scope);
    }

    /// Number of unresolved tickets issued under `scope`.
    pub fn outstanding(&self, scope: ScopeId) -> usize {
        self.scopes.get(&scope).map_or(0, VecDeque::len)
    }

    /// Number of unresolved tickets across all scopes, reads included.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_outstanding(&self, ticket: Ticket) -> bool {
        self.pending.contains_key(&ticket)
    }

    // ── Issuing ──

    /// Send `request` and track its ticket.
    pub fn issue(
        &mut self,
        scope: Option<ScopeId>,
        request: HostRequest,
        order_key: Option<OrderKey>,
        sink: Sink,
    ) -> Result<Ticket, BridgeError> {
        let op = request.op.name();
        let ticket = self.transport.send(request)?;
        if self.pending.contains_key(&ticket) {
            return Err(BridgeError::protocol(format!(
                "transport reissued outstanding ticket {}",
                ticket
            )));
        }
        if let Some(scope) = scope {
            self.scopes.entry(scope).or_default().push_back(ticket);
        }
        if let Some(key) = &order_key {
            self.order.entry(key.clone()).or_default().push_back(ticket);
        }
        self.pending.insert(
            ticket,
            Pending {
                op,
                scope,
                order_key,
                sink,
            },
        );
        Ok(ticket)
    }

    /// Send a request that expects no completion.
    pub fn send_untracked(&mut self, request: HostRequest) -> Result<(), BridgeError> {
        self.transport.send(request)?;
        Ok(())
    }

    /// Issue a request and wait for its response.
    ///
    /// Completions of other tickets observed meanwhile are dispatched. An
    /// invocation arriving before the response is a protocol violation.
    pub fn request(&mut self, request: HostRequest) -> Result<HostResponse, BridgeError> {
        let op = request.op.name();
        let ticket = self.issue(None, request, None, Sink::Capture)?;
        match self.next_for(ticket)? {
            Awaited::Ready(response) => Ok(response),
            Awaited::Invoke(invoke) => Err(BridgeError::protocol(format!(
                "invocation of {} received while awaiting {}",
                invoke.contract, op
            ))),
        }
    }

    // ── Waiting ──

    /// Receive until `ticket` resolves or the host routes an invocation.
    ///
    /// A host-reported error for `ticket` is returned as a transport error.
    pub fn next_for(&mut self, ticket: Ticket) -> Result<Awaited, BridgeError> {
        loop {
            if let Some(response) = self.captured.remove(&ticket) {
                return match response {
                    HostResponse::Error(reason) => {
                        Err(TransportError::Host { ticket, reason }.into())
                    }
                    response => Ok(Awaited::Ready(response)),
                };
            }
            if !self.pending.contains_key(&ticket) {
                return Err(BridgeError::protocol(format!(
                    "ticket {} is not outstanding",
                    ticket
                )));
            }
            match self.pump()? {
                None => {}
                Some(Incoming::Invoke(invoke)) => return Ok(Awaited::Invoke(invoke)),
                Some(Incoming::Close) => {
                    return Err(BridgeError::protocol(format!(
                        "host closed with ticket {} outstanding",
                        ticket
                    )))
                }
            }
        }
    }

    /// Wait for the oldest outstanding ticket of `scope`.
    ///
    /// Returns `false` immediately if the scope has nothing outstanding.
    pub fn wait_one(&mut self, scope: ScopeId) -> Result<bool, BridgeError> {
        let oldest = match self.scopes.get(&scope).and_then(|q| q.front()) {
            Some(ticket) => *ticket,
            None => return Ok(false),
        };
        while self.pending.contains_key(&oldest) {
            if let Some(incoming) = self.pump()? {
                return Err(unexpected_incoming(incoming, scope));
            }
        }
        Ok(true)
    }

    /// Wait until `scope` has nothing outstanding. Idempotent.
    pub fn wait_all(&mut self, scope: ScopeId) -> Result<(), BridgeError> {
        while self.wait_one(scope)? {}
        Ok(())
    }

    /// Receive one message. Completions are dispatched and yield `None`.
    pub fn pump(&mut self) -> Result<Option<Incoming>, BridgeError> {
        match self.transport.recv()? {
            HostMessage::Completion { ticket, response } => {
                self.dispatch(ticket, response)?;
                Ok(None)
            }
            HostMessage::Invoke(invoke) => Ok(Some(Incoming::Invoke(invoke))),
            HostMessage::Close => Ok(Some(Incoming::Close)),
        }
    }

    /// Drop every outstanding ticket. Write sinks still waiting on the host
    /// are failed so each of them fires exactly once.
    pub fn abandon(&mut self) {
        for (_, pending) in std::mem::take(&mut self.pending) {
            if let Sink::Notify(sink) = pending.sink {
                sink.complete(Completion::Failed {
                    reason: "aborted".into(),
                });
            }
        }
        self.scopes.clear();
        self.order.clear();
        self.captured.clear();
    }

    // ── Dispatch ──

    fn dispatch(&mut self, ticket: Ticket, response: HostResponse) -> Result<(), BridgeError> {
        let pending = match self.pending.remove(&ticket) {
            Some(pending) => pending,
            None => {
                return Err(BridgeError::protocol(format!(
                    "completion for unknown ticket {}",
                    ticket
                )))
            }
        };

        if let Some(key) = &pending.order_key {
            let queue = self.order.get_mut(key);
            let in_order = queue.as_ref().and_then(|q| q.front()) == Some(&ticket);
            if !in_order {
                return Err(BridgeError::protocol(format!(
                    "{} completion {} arrived before an older write to the same key",
                    pending.op, ticket
                )));
            }
            if let Some(queue) = queue {
                queue.pop_front();
                if queue.is_empty() {
                    self.order.remove(key);
                }
            }
        }
        if let Some(scope) = pending.scope {
            if let Some(queue) = self.scopes.get_mut(&scope) {
                queue.retain(|t| *t != ticket);
            }
        }

        match pending.sink {
            Sink::Capture => {
                self.captured.insert(ticket, response);
                Ok(())
            }
            Sink::Discard => match response {
                HostResponse::Ack => Ok(()),
                HostResponse::Error(reason) => Err(TransportError::Host { ticket, reason }.into()),
                other => Err(unexpected_response(pending.op, &other)),
            },
            Sink::Notify(sink) => match response {
                HostResponse::Stored { previous_len } => {
                    sink.complete(Completion::Stored {
                        previous_len: previous_len.map(|len| len as usize),
                    });
                    Ok(())
                }
                HostResponse::Error(reason) => {
                    sink.complete(Completion::Failed {
                        reason: reason.clone(),
                    });
                    Err(TransportError::Host { ticket, reason }.into())
                }
                other => Err(unexpected_response(pending.op, &other)),
            },
        }
    }
}

impl fmt::Debug for CompletionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionRegistry")
            .field("pending", &self.pending.len())
            .field("scopes", &self.scopes.len())
            .field("captured", &self.captured.len())
            .finish()
    }
}

/// Protocol violation for a response of the wrong shape.
pub(crate) fn unexpected_response(op: &str, response: &HostResponse) -> BridgeError {
    BridgeError::protocol(format!("unexpected response to {}: {:?}", op, response))
}

fn unexpected_incoming(incoming: Incoming, scope: ScopeId) -> BridgeError {
    match incoming {
        Incoming::Invoke(invoke) => BridgeError::protocol(format!(
            "invocation of {} received while {} awaits completions",
            invoke.contract, scope
        )),
        Incoming::Close => BridgeError::protocol(format!(
            "host closed while {} awaits completions",
            scope
        )),
    }
}
