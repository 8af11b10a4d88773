//! Step-cost descriptor.
//!
//! The bridge never decides what an operation costs. The host (or whoever
//! assembles the execution context) supplies a `StepCost`; the bridge only
//! combines its fields with operand sizes.

use serde::{Deserialize, Serialize};

/// Per-operation step costs. Immutable for the lifetime of a context.
///
/// The default schedule charges nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepCost {
    /// Base cost of a storage read.
    pub get_base: u64,
    /// Per-byte cost of a storage read (key + returned value).
    pub get_byte: u64,
    /// Base cost of a storage write.
    pub set_base: u64,
    /// Per-byte cost of a storage write (key + new value).
    pub set_byte: u64,
    /// Base cost of a storage deletion.
    pub delete_base: u64,
    /// Base cost of an event log.
    pub log_base: u64,
    /// Per-byte cost of an event log (all indexed and data fields).
    pub log_byte: u64,
    /// Cost of a ledger query (balance, block info, owner).
    pub api_call: u64,
    /// Base cost charged to the caller for every contract call.
    pub contract_call: u64,
}

impl StepCost {
    /// Cost of reading `key_len + value_len` bytes from storage.
    pub fn storage_get(&self, key_len: usize, value_len: usize) -> u64 {
        let bytes = (key_len as u64).saturating_add(value_len as u64);
        self.get_base
            .saturating_add(bytes.saturating_mul(self.get_byte))
    }

    /// Cost of writing `value_len` bytes under a `key_len` key.
    pub fn storage_set(&self, key_len: usize, value_len: usize) -> u64 {
        let bytes = (key_len as u64).saturating_add(value_len as u64);
        self.set_base
            .saturating_add(bytes.saturating_mul(self.set_byte))
    }

    /// Cost of deleting a key.
    pub fn storage_delete(&self) -> u64 {
        self.delete_base
    }

    /// Cost of an event log carrying `total_len` bytes.
    pub fn event_log(&self, total_len: usize) -> u64 {
        self.log_base
            .saturating_add((total_len as u64).saturating_mul(self.log_byte))
    }
}
