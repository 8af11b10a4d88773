//! `statebridge`: reentrant state bridge for sandboxed contract execution.
//!
//! The bridge sits between a contract engine and the host process that owns
//! the ledger. Contracts see simple synchronous reads and writes; the host
//! sees an asynchronous request stream whose completions it may batch and
//! reorder. Nested contract calls re-enter the bridge on an explicit frame
//! stack that shares one host connection.
//!
//! - **Completion registry:** tickets, per-key ordering, context scopes
//! - **Write shadow:** read-after-write without host round trips
//! - **Step metering:** per-context limits across the whole call tree
//! - **Read-only mode:** mutations fail before reaching the host
//! - **Fatal errors:** transport and protocol failures poison the session
//!
//! The entry point is [`Session::serve`].

pub mod config;
pub mod registry;
pub mod storage;
pub mod object_store;
pub mod ledger;
pub mod events;
pub mod dispatcher;
pub mod facade;
pub mod session;
pub mod stream;

pub use config::{BridgeConfig, ConfigError};
pub use registry::{CompletionRegistry, OrderKey, ScopeId};
pub use storage::WriteShadow;
pub use facade::StateBridge;
pub use session::Session;
pub use stream::StreamTransport;
