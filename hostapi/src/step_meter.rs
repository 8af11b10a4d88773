//! Per-context step meter.
//!
//! Every execution context owns one `StepMeter` together with the
//! `StepCost` schedule it was started under. The meter turns operand sizes
//! into charges; it never decides the costs itself. Charges are checked
//! before they are applied, so a rejected charge leaves the meter untouched.

use statebridge_primitives::StepCost;

use crate::error::BridgeError;

/// Step meter enforcing the limit of one execution context.
#[derive(Debug, Clone)]
pub struct StepMeter {
    limit: u64,
    consumed: u64,
    cost: StepCost,
}

impl StepMeter {
    /// Meter with a free schedule: only explicit charges consume steps.
    pub fn new(limit: u64) -> Self {
        Self::with_cost(limit, StepCost::default())
    }

    /// Meter charging operations according to `cost`.
    pub fn with_cost(limit: u64, cost: StepCost) -> Self {
        Self {
            limit,
            consumed: 0,
            cost,
        }
    }

    /// Charge steps. Returns `Err(StepLimitExceeded)` if the limit would be
    /// exceeded; the consumed count is then NOT modified.
    pub fn charge(&mut self, amount: u64) -> Result<(), BridgeError> {
        let new_consumed = match self.consumed.checked_add(amount) {
            Some(v) if v <= self.limit => v,
            _ => {
                return Err(BridgeError::StepLimitExceeded {
                    limit: self.limit,
                    requested: self.consumed.saturating_add(amount),
                })
            }
        };
        self.consumed = new_consumed;
        Ok(())
    }

    // ── Operation charges ──

    /// Charge a storage read of `value_len` bytes under a `key_len` key.
    pub fn charge_storage_read(&mut self, key_len: usize, value_len: usize) -> Result<(), BridgeError> {
        self.charge(self.cost.storage_get(key_len, value_len))
    }

    /// Charge a storage write. `None` is a deletion.
    pub fn charge_storage_write(
        &mut self,
        key_len: usize,
        value_len: Option<usize>,
    ) -> Result<(), BridgeError> {
        let steps = match value_len {
            Some(len) => self.cost.storage_set(key_len, len),
            None => self.cost.storage_delete(),
        };
        self.charge(steps)
    }

    /// Charge an event log whose fields total `payload_len` bytes.
    pub fn charge_event(&mut self, payload_len: usize) -> Result<(), BridgeError> {
        self.charge(self.cost.event_log(payload_len))
    }

    /// Charge one ledger query.
    pub fn charge_api_call(&mut self) -> Result<(), BridgeError> {
        self.charge(self.cost.api_call)
    }

    /// Charge the base cost of a contract call and return the limit the
    /// callee runs under: `requested`, capped by what is left afterwards.
    pub fn charge_call(&mut self, requested: u64) -> Result<u64, BridgeError> {
        self.charge(self.cost.contract_call)?;
        Ok(requested.min(self.remaining()))
    }

    // ── Accessors ──

    /// Returns the steps consumed so far.
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    /// Returns the steps left before the limit is reached.
    pub fn remaining(&self) -> u64 {
        self.limit.saturating_sub(self.consumed)
    }

    /// Returns the step limit.
    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Returns the schedule this meter charges by.
    pub fn cost(&self) -> &StepCost {
        &self.cost
    }
}
