//! Execution boundary types: option flags, block context, call requests
//! and call results.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::ResultKind;
use crate::types::{Address, Amount, BlockHeight, Timestamp};

/// Execution mode of one context.
///
/// Fixed when the context is constructed and never mutated afterwards.
/// On the wire the flags travel as a bitmask (see [`OptionFlags::bits`]).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionFlags {
    /// Every mutating operation fails fast.
    pub read_only: bool,
    /// Host operations are recorded at trace level.
    pub trace: bool,
}

impl OptionFlags {
    /// Bit for `read_only`.
    pub const READ_ONLY: u32 = 1;
    /// Bit for `trace`.
    pub const TRACE: u32 = 2;

    /// Read-only flags with tracing off.
    pub fn read_only() -> Self {
        Self {
            read_only: true,
            trace: false,
        }
    }

    /// Encode as a bitmask.
    pub fn bits(self) -> u32 {
        let mut bits = 0;
        if self.read_only {
            bits |= Self::READ_ONLY;
        }
        if self.trace {
            bits |= Self::TRACE;
        }
        bits
    }

    /// Decode from a bitmask. Unknown bits are ignored.
    pub fn from_bits(bits: u32) -> Self {
        Self {
            read_only: bits & Self::READ_ONLY != 0,
            trace: bits & Self::TRACE != 0,
        }
    }

    /// Combine two flag sets; a flag set in either is set in the result.
    pub fn union(self, other: Self) -> Self {
        Self {
            read_only: self.read_only || other.read_only,
            trace: self.trace || other.trace,
        }
    }
}

/// Height and timestamp of the block being executed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockContext {
    pub height: BlockHeight,
    pub timestamp: Timestamp,
}

/// Call parameter or return value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i128),
    Str(String),
    Bytes(Bytes),
    Address(Address),
    List(Vec<Value>),
}

impl Value {
    /// Returns true for `Value::Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Integer payload, if this is an `Int`.
    pub fn as_int(&self) -> Option<i128> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<i128> for Value {
    fn from(v: i128) -> Self {
        Self::Int(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.to_owned())
    }
}

impl From<Address> for Value {
    fn from(v: Address) -> Self {
        Self::Address(v)
    }
}

/// A cross-contract invocation issued by the executing contract.
///
/// The caller is the contract the request is scoped to (see
/// [`HostRequest::contract`](crate::HostRequest)).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    pub target: Address,
    pub method: String,
    pub params: Vec<Value>,
    /// Native value moved from caller to target if, and only if, the call
    /// succeeds.
    pub value: Amount,
    /// Effective step budget of the callee.
    pub step_limit: u64,
}

/// Request from the host to run a contract method.
///
/// Sent for the top-level invocation of a transaction and for every nested
/// call the host routes back into this bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeRequest {
    /// Contract to run.
    pub contract: Address,
    /// Account or contract that initiated the invocation.
    pub caller: Address,
    pub method: String,
    pub params: Vec<Value>,
    /// Value transferred along with the invocation.
    pub value: Amount,
    pub step_limit: u64,
    pub options: OptionFlags,
}

/// Outcome of a call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallResult {
    pub kind: ResultKind,
    /// Return value; `Null` for every kind but `Success`.
    pub value: Value,
    /// Steps the callee consumed. Never above the call's step limit.
    pub steps_used: u64,
}

impl CallResult {
    /// A successful result.
    pub fn success(value: Value, steps_used: u64) -> Self {
        Self {
            kind: ResultKind::Success,
            value,
            steps_used,
        }
    }

    /// A failed result of the given kind.
    pub fn failure(kind: ResultKind, steps_used: u64) -> Self {
        Self {
            kind,
            value: Value::Null,
            steps_used,
        }
    }

    /// Returns true if the call succeeded.
    pub fn is_success(&self) -> bool {
        self.kind.is_success()
    }
}
