//! Object/code store.
//!
//! Code reads are synchronous. Transformed code and object graph writes are
//! asynchronous and share one order key per contract, so the host commits
//! them in issue order. A `PendingSlot` keeps the newest unacknowledged
//! blob so reads never observe an older (or partially written) one.

use bytes::Bytes;
use statebridge_hostapi::BridgeError;
use statebridge_primitives::{HostOp, HostResponse, Ticket};

use crate::registry::{unexpected_response, CompletionRegistry, OrderKey, Sink};
use crate::session::Frame;

/// Newest unacknowledged blob of one kind.
#[derive(Debug, Clone, Default)]
pub struct PendingSlot {
    entry: Option<(Bytes, Ticket)>,
}

impl PendingSlot {
    /// Record a blob written under `ticket`, superseding any older one.
    pub fn record(&mut self, blob: Bytes, ticket: Ticket) {
        self.entry = Some((blob, ticket));
    }

    /// The recorded blob while its ticket is outstanding.
    pub fn current(&mut self, is_outstanding: impl Fn(Ticket) -> bool) -> Option<Bytes> {
        let (blob, ticket) = self.entry.clone()?;
        if is_outstanding(ticket) {
            Some(blob)
        } else {
            self.entry = None;
            None
        }
    }
}

pub(crate) fn get_code(
    registry: &mut CompletionRegistry,
    frame: &Frame,
) -> Result<Option<Bytes>, BridgeError> {
    fetch(registry, frame, HostOp::GetCode)
}

pub(crate) fn get_transformed_code(
    registry: &mut CompletionRegistry,
    frame: &mut Frame,
) -> Result<Option<Bytes>, BridgeError> {
    if let Some(code) = frame.transformed_code.current(|t| registry.is_outstanding(t)) {
        return Ok(Some(code));
    }
    fetch(registry, frame, HostOp::GetTransformedCode)
}

pub(crate) fn set_transformed_code(
    registry: &mut CompletionRegistry,
    frame: &mut Frame,
    code: &[u8],
) -> Result<(), BridgeError> {
    let code = Bytes::copy_from_slice(code);
    let ticket = registry.issue(
        Some(frame.scope),
        frame.request(HostOp::SetTransformedCode(code.clone())),
        Some(OrderKey::TransformedCode(frame.contract)),
        Sink::Discard,
    )?;
    frame.transformed_code.record(code, ticket);
    Ok(())
}

pub(crate) fn get_object_graph(
    registry: &mut CompletionRegistry,
    frame: &mut Frame,
) -> Result<Option<Bytes>, BridgeError> {
    if let Some(graph) = frame.object_graph.current(|t| registry.is_outstanding(t)) {
        return Ok(Some(graph));
    }
    fetch(registry, frame, HostOp::GetObjectGraph)
}

pub(crate) fn put_object_graph(
    registry: &mut CompletionRegistry,
    frame: &mut Frame,
    graph: &[u8],
) -> Result<(), BridgeError> {
    let graph = Bytes::copy_from_slice(graph);
    let ticket = registry.issue(
        Some(frame.scope),
        frame.request(HostOp::PutObjectGraph(graph.clone())),
        Some(OrderKey::ObjectGraph(frame.contract)),
        Sink::Discard,
    )?;
    frame.object_graph.record(graph, ticket);
    Ok(())
}

fn fetch(
    registry: &mut CompletionRegistry,
    frame: &Frame,
    op: HostOp,
) -> Result<Option<Bytes>, BridgeError> {
    let name = op.name();
    match registry.request(frame.request(op))? {
        HostResponse::Value(blob) => Ok(blob),
        other => Err(unexpected_response(name, &other)),
    }
}
