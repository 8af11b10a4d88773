//! `statebridge-primitives`: foundational types for the state bridge.
//!
//! This crate provides the vocabulary shared by the host-API contracts, the
//! bridge implementation and any host that talks to it:
//!
//! - [`Address`] and the small numeric aliases used by the ledger
//! - [`Value`], [`InvokeRequest`], [`CallRequest`], [`CallResult`]: call plumbing
//! - [`ResultKind`]: the numeric outcome table of a contract call
//! - [`OptionFlags`] and [`StepCost`]: per-context configuration
//! - [`message`]: the transport-agnostic host protocol
//! - [`codec`]: deterministic binary encoding of that protocol

pub mod types;
pub mod error;
pub mod step;
pub mod execution;
pub mod message;
pub mod codec;

// Re-export commonly used types at the crate root for convenience.
pub use types::{Address, Amount, BlockHeight, Timestamp, ADDRESS_LEN};
pub use error::{CodecError, ResultKind};
pub use step::StepCost;
pub use execution::{
    BlockContext, CallRequest, CallResult, InvokeRequest, OptionFlags, Value,
};
pub use message::{HostMessage, HostOp, HostRequest, HostResponse, Ticket};
