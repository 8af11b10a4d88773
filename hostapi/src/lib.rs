//! `statebridge-hostapi`: host API contracts for the state bridge.
//!
//! This crate defines the seams between the bridge, the contract engine and
//! the host that owns the ledger. It provides:
//!
//! - `Transport` trait: the two-verb connection to the host
//! - `ExternalState` trait: the operation set a running contract sees
//! - `ContractRuntime` trait: the engine that executes a contract method
//! - `StepMeter`: per-context step enforcement
//! - `CompletionSink` / `Completion`: single-shot storage write handlers
//! - `BridgeError` / `TransportError`: the error taxonomy
//! - `MemHost`: deterministic in-memory host for tests and demos

pub mod error;
pub mod types;
pub mod step_meter;
pub mod traits;
pub mod mem_host;

// Re-export commonly used types at the crate root.
pub use error::{BridgeError, TransportError};
pub use types::{Completion, CompletionSink};
pub use step_meter::StepMeter;
pub use traits::{ContractRuntime, ExternalState, Transport};
pub use mem_host::{Account, Delivery, Event, MemHost};
