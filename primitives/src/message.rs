//! Host protocol: requests the bridge sends and messages the host returns.
//!
//! The protocol is transport-agnostic: every request carries the contract it
//! is scoped to and the option flags of the issuing context, so a host can
//! serve many contexts over one connection.

use bytes::Bytes;

use crate::execution::{CallRequest, CallResult, InvokeRequest, OptionFlags};
use crate::types::{Address, Amount, BlockHeight, Timestamp};

/// Handle of one in-flight host request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(pub u64);

impl core::fmt::Display for Ticket {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A request scoped to the contract of the issuing context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostRequest {
    pub contract: Address,
    pub options: OptionFlags,
    pub op: HostOp,
}

/// Host operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostOp {
    GetCode,
    GetTransformedCode,
    SetTransformedCode(Bytes),
    GetObjectGraph,
    PutObjectGraph(Bytes),
    GetStorage(Bytes),
    /// `value: None` deletes the key.
    PutStorage { key: Bytes, value: Option<Bytes> },
    GetBalance(Address),
    GetBlockHeight,
    GetBlockTimestamp,
    GetOwner,
    Log { indexed: Vec<Bytes>, data: Vec<Bytes> },
    Call(CallRequest),
    /// Reply to an [`HostMessage::Invoke`]. Expects no completion.
    InvokeResult(CallResult),
}

impl HostOp {
    /// Short operation name for logs and request journals.
    pub fn name(&self) -> &'static str {
        match self {
            Self::GetCode => "get_code",
            Self::GetTransformedCode => "get_transformed_code",
            Self::SetTransformedCode(_) => "set_transformed_code",
            Self::GetObjectGraph => "get_object_graph",
            Self::PutObjectGraph(_) => "put_object_graph",
            Self::GetStorage(_) => "get_storage",
            Self::PutStorage { .. } => "put_storage",
            Self::GetBalance(_) => "get_balance",
            Self::GetBlockHeight => "get_block_height",
            Self::GetBlockTimestamp => "get_block_timestamp",
            Self::GetOwner => "get_owner",
            Self::Log { .. } => "log",
            Self::Call(_) => "call",
            Self::InvokeResult(_) => "invoke_result",
        }
    }

    /// Returns true for operations that change host state.
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            Self::SetTransformedCode(_)
                | Self::PutObjectGraph(_)
                | Self::PutStorage { .. }
                | Self::Log { .. }
        )
    }
}

/// Host answer to one ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostResponse {
    /// Plain acknowledgement of a write or a log.
    Ack,
    /// Code, object graph or storage value; `None` when absent.
    Value(Option<Bytes>),
    /// Storage write acknowledged; carries the replaced value's size.
    Stored { previous_len: Option<u32> },
    Balance(Amount),
    BlockHeight(BlockHeight),
    BlockTimestamp(Timestamp),
    Owner(Address),
    Call(CallResult),
    /// The host could not serve the request.
    Error(String),
}

/// Anything the host can send to the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostMessage {
    Completion { ticket: Ticket, response: HostResponse },
    Invoke(InvokeRequest),
    /// No further invocations will arrive.
    Close,
}
