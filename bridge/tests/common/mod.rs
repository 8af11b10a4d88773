//! Shared test helpers for integration tests.
//!
//! Provides stable addresses, a scripted contract runtime, request builders
//! and session factories used across all integration test files.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use bytes::Bytes;
use statebridge::{BridgeConfig, Session};
use statebridge_hostapi::{BridgeError, Completion, CompletionSink, ContractRuntime, ExternalState, MemHost};
use statebridge_primitives::{Address, Amount, CallResult, InvokeRequest, OptionFlags, StepCost, Value, ADDRESS_LEN};

/// Step limit of invocations built by [`invoke`].
pub const DEFAULT_STEP_LIMIT: u64 = 1_000_000;

// ── Addresses ──

/// Deterministic address filled with `n`.
pub fn addr(n: u8) -> Address {
    Address::new([n; ADDRESS_LEN])
}

/// Externally owned account that starts every invocation.
pub fn user() -> Address {
    addr(0xEE)
}

/// First test contract.
pub fn alpha() -> Address {
    addr(0xA1)
}

/// Second test contract.
pub fn beta() -> Address {
    addr(0xB2)
}

// ── Runtime ──

type Handler = Box<dyn Fn(&mut dyn ExternalState, &InvokeRequest) -> Result<Value, BridgeError>>;

/// Contract runtime driven by closures keyed by (contract, method).
///
/// Unknown methods fail with `MethodNotFound`.
#[derive(Default)]
pub struct ScriptedRuntime {
    handlers: HashMap<(Address, String), Handler>,
}

impl ScriptedRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `method` of `contract`.
    pub fn on(
        mut self,
        contract: Address,
        method: &str,
        handler: impl Fn(&mut dyn ExternalState, &InvokeRequest) -> Result<Value, BridgeError> + 'static,
    ) -> Self {
        self.handlers
            .insert((contract, method.to_owned()), Box::new(handler));
        self
    }
}

impl ContractRuntime for ScriptedRuntime {
    fn invoke(
        &self,
        state: &mut dyn ExternalState,
        request: &InvokeRequest,
    ) -> Result<Value, BridgeError> {
        match self.handlers.get(&(request.contract, request.method.clone())) {
            Some(handler) => handler(state, request),
            None => Err(BridgeError::MethodNotFound(request.method.clone())),
        }
    }
}

// ── Completion capture ──

/// Collects `previous_size` of every storage completion it hands out sinks for.
#[derive(Clone, Default)]
pub struct Sizes(Rc<RefCell<Vec<Option<i64>>>>);

impl Sizes {
    pub fn sink(&self) -> CompletionSink {
        let sizes = Rc::clone(&self.0);
        CompletionSink::new(move |completion: Completion| {
            sizes.borrow_mut().push(completion.previous_size())
        })
    }

    pub fn take(&self) -> Vec<Option<i64>> {
        std::mem::take(&mut *self.0.borrow_mut())
    }
}

// ── Request builders ──

pub fn invoke(contract: Address, method: &str, params: Vec<Value>) -> InvokeRequest {
    invoke_with(contract, method, params, 0, DEFAULT_STEP_LIMIT, OptionFlags::default())
}

pub fn invoke_with(
    contract: Address,
    method: &str,
    params: Vec<Value>,
    value: Amount,
    step_limit: u64,
    options: OptionFlags,
) -> InvokeRequest {
    InvokeRequest {
        contract,
        caller: user(),
        method: method.to_owned(),
        params,
        value,
        step_limit,
        options,
    }
}

pub fn bytes(v: &'static [u8]) -> Bytes {
    Bytes::from_static(v)
}

/// A schedule with distinct, easily summed costs.
pub fn schedule() -> StepCost {
    StepCost {
        get_base: 20,
        get_byte: 1,
        set_base: 100,
        set_byte: 2,
        delete_base: 15,
        log_base: 50,
        log_byte: 1,
        api_call: 5,
        contract_call: 10,
    }
}

// ── Host and session factories ──

/// Host with code deployed at every address in `contracts`.
pub fn host_with(contracts: &[Address]) -> MemHost {
    init_tracing();
    let host = MemHost::new();
    for contract in contracts {
        host.deploy(*contract, Bytes::from_static(b"\x00asm"));
    }
    host
}

pub fn session(host: &MemHost, runtime: ScriptedRuntime) -> Session {
    session_with_config(host, runtime, BridgeConfig::default())
}

pub fn session_with_config(host: &MemHost, runtime: ScriptedRuntime, config: BridgeConfig) -> Session {
    Session::new(host.clone(), Arc::new(runtime), config)
}

/// Queue `request`, serve it, and return its result.
pub fn run_one(session: &mut Session, host: &MemHost, request: InvokeRequest) -> CallResult {
    host.invoke(request);
    session
        .serve_one()
        .expect("invocation should not fail fatally")
        .expect("host should deliver the invocation")
}

/// Route bridge logs to the test harness; `RUST_LOG` selects the level.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
