//! Storage channel.
//!
//! Reads are synchronous, writes asynchronous. A per-context `WriteShadow`
//! remembers the newest write to every key together with its ticket; while
//! that ticket is outstanding, reads of the key are served from the shadow
//! without a host round trip. Once the host acknowledges the newest write,
//! it holds the same value and the entry is dropped.

use std::collections::BTreeMap;

use bytes::Bytes;
use statebridge_hostapi::{BridgeError, CompletionSink};
use statebridge_primitives::{HostOp, HostResponse, Ticket};

use crate::registry::{unexpected_response, CompletionRegistry, OrderKey, Sink};
use crate::session::Frame;

/// Result of a shadow lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShadowResult {
    /// The newest unacknowledged write stored this value.
    Found(Bytes),
    /// The newest unacknowledged write deleted the key.
    Deleted,
    /// No unacknowledged write; ask the host.
    NotInShadow,
}

#[derive(Debug, Clone)]
struct ShadowEntry {
    value: Option<Bytes>,
    ticket: Ticket,
}

/// Newest unacknowledged write per key of one execution context.
#[derive(Debug, Clone, Default)]
pub struct WriteShadow {
    entries: BTreeMap<Bytes, ShadowEntry>,
}

impl WriteShadow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a write issued under `ticket`. Supersedes older entries.
    pub fn record(&mut self, key: Bytes, value: Option<Bytes>, ticket: Ticket) {
        self.entries.insert(key, ShadowEntry { value, ticket });
    }

    /// Look up `key`. Entries whose ticket has resolved are pruned.
    pub fn lookup(
        &mut self,
        key: &[u8],
        is_outstanding: impl Fn(Ticket) -> bool,
    ) -> ShadowResult {
        let (ticket, value) = match self.entries.get(key) {
            Some(entry) => (entry.ticket, entry.value.clone()),
            None => return ShadowResult::NotInShadow,
        };
        if !is_outstanding(ticket) {
            self.entries.remove(key);
            return ShadowResult::NotInShadow;
        }
        match value {
            Some(value) => ShadowResult::Found(value),
            None => ShadowResult::Deleted,
        }
    }

    /// Drop every entry whose ticket has resolved.
    pub fn prune(&mut self, is_outstanding: impl Fn(Ticket) -> bool) {
        self.entries.retain(|_, entry| is_outstanding(entry.ticket));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Read `key` of the frame's contract.
pub(crate) fn get(
    registry: &mut CompletionRegistry,
    frame: &mut Frame,
    key: &[u8],
) -> Result<Option<Bytes>, BridgeError> {
    match frame.storage.lookup(key, |t| registry.is_outstanding(t)) {
        ShadowResult::Found(value) => return Ok(Some(value)),
        ShadowResult::Deleted => return Ok(None),
        ShadowResult::NotInShadow => {}
    }
    let request = frame.request(HostOp::GetStorage(Bytes::copy_from_slice(key)));
    match registry.request(request)? {
        HostResponse::Value(value) => Ok(value),
        other => Err(unexpected_response("get_storage", &other)),
    }
}

/// Issue a write (`Some`) or deletion (`None`) of `key`.
pub(crate) fn put(
    registry: &mut CompletionRegistry,
    frame: &mut Frame,
    key: &[u8],
    value: Option<&[u8]>,
    sink: CompletionSink,
) -> Result<(), BridgeError> {
    let key = Bytes::copy_from_slice(key);
    let value = value.map(Bytes::copy_from_slice);
    let request = frame.request(HostOp::PutStorage {
        key: key.clone(),
        value: value.clone(),
    });
    let ticket = registry.issue(
        Some(frame.scope),
        request,
        Some(OrderKey::Storage(frame.contract, key.clone())),
        Sink::Notify(sink),
    )?;
    frame.storage.record(key, value, ticket);
    Ok(())
}
