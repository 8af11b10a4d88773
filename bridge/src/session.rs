//! Top-level session and the frame stack.
//!
//! A `Session` owns the host connection (through the registry) and runs
//! every invocation the host routes to it. Each invocation executes in a
//! `Frame` pushed on an explicit stack: its own registry scope, write
//! shadow, step meter and options. Nested calls push further frames from
//! inside the caller's `call`, so the native stack never carries more than
//! the engine's own recursion.
//!
//! Fatal errors poison the session. Every frame of the failed call tree is
//! torn down and every later operation fails with `Aborted` without
//! contacting the host.

use std::fmt;
use std::sync::Arc;

use statebridge_hostapi::{BridgeError, ContractRuntime, StepMeter, Transport};
use statebridge_primitives::{
    Address, CallResult, HostOp, HostRequest, InvokeRequest, OptionFlags, ResultKind,
};

use crate::config::BridgeConfig;
use crate::facade::StateBridge;
use crate::ledger::BlockCache;
use crate::object_store::PendingSlot;
use crate::registry::{CompletionRegistry, Incoming, ScopeId};
use crate::storage::WriteShadow;

/// One execution context on the frame stack.
#[derive(Debug)]
pub(crate) struct Frame {
    pub(crate) contract: Address,
    pub(crate) scope: ScopeId,
    pub(crate) options: OptionFlags,
    pub(crate) meter: StepMeter,
    pub(crate) storage: WriteShadow,
    pub(crate) transformed_code: PendingSlot,
    pub(crate) object_graph: PendingSlot,
}

impl Frame {
    pub(crate) fn new(
        contract: Address,
        scope: ScopeId,
        options: OptionFlags,
        meter: StepMeter,
    ) -> Self {
        Self {
            contract,
            scope,
            options,
            meter,
            storage: WriteShadow::new(),
            transformed_code: PendingSlot::default(),
            object_graph: PendingSlot::default(),
        }
    }

    /// A request scoped to this frame's contract and options.
    pub(crate) fn request(&self, op: HostOp) -> HostRequest {
        HostRequest {
            contract: self.contract,
            options: self.options,
            op,
        }
    }
}

/// What a nested invocation inherits from the frame that called out.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Inherited {
    pub(crate) read_only: bool,
    /// Effective step limit of the call.
    pub(crate) ceiling: u64,
}

/// Bridge session serving one host connection.
pub struct Session {
    registry: CompletionRegistry,
    runtime: Arc<dyn ContractRuntime>,
    config: BridgeConfig,
    frames: Vec<Frame>,
    block: BlockCache,
    fatal: Option<String>,
}

impl Session {
    /// Create a session over `transport`, running contracts with `runtime`.
    pub fn new(
        transport: impl Transport + 'static,
        runtime: Arc<dyn ContractRuntime>,
        config: BridgeConfig,
    ) -> Self {
        Self {
            registry: CompletionRegistry::new(Box::new(transport)),
            runtime,
            config,
            frames: Vec::new(),
            block: BlockCache::default(),
            fatal: None,
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Number of frames currently on the stack.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Returns true once a fatal error has been observed.
    pub fn is_poisoned(&self) -> bool {
        self.fatal.is_some()
    }

    /// Tickets still awaiting a completion.
    pub fn pending_requests(&self) -> usize {
        self.registry.pending_count()
    }

    /// Receive one invocation, run it, and reply with its result.
    ///
    /// Returns `Ok(None)` when the host closes the connection.
    pub fn serve_one(&mut self) -> Result<Option<CallResult>, BridgeError> {
        self.ensure_live()?;
        loop {
            let incoming = self.registry.pump();
            match self.record(incoming)? {
                Some(Incoming::Invoke(request)) => {
                    return self.run_invocation(request, None).map(Some)
                }
                Some(Incoming::Close) => return Ok(None),
                None => {}
            }
        }
    }

    /// Serve invocations until the host closes. Returns how many ran.
    pub fn serve(&mut self) -> Result<usize, BridgeError> {
        let mut served = 0;
        while self.serve_one()?.is_some() {
            served += 1;
        }
        tracing::debug!(served, "host closed session");
        Ok(served)
    }

    /// Run `request` in a new frame and send its result to the host.
    pub(crate) fn run_invocation(
        &mut self,
        request: InvokeRequest,
        inherited: Option<Inherited>,
    ) -> Result<CallResult, BridgeError> {
        self.ensure_live()?;
        if self.frames.is_empty() {
            self.block.clear();
        }

        let mut options = request.options.union(self.config.options);
        let mut limit = request.step_limit;
        if let Some(parent) = inherited {
            options.read_only |= parent.read_only;
            limit = limit.min(parent.ceiling);
        }
        let scope = self.registry.open_scope();
        let index = self.frames.len();
        let meter = StepMeter::with_cost(limit, self.config.step_cost.clone());
        self.frames
            .push(Frame::new(request.contract, scope, options, meter));
        tracing::debug!(
            contract = %request.contract,
            method = %request.method,
            depth = index + 1,
            limit,
            "frame pushed"
        );

        let runtime = Arc::clone(&self.runtime);
        let outcome = runtime.invoke(&mut StateBridge::new(self, index), &request);

        // A context drains its own writes before it ends.
        let drained = match &outcome {
            Err(err) if err.is_fatal() => Ok(()),
            _ if self.fatal.is_some() => Ok(()),
            _ => self.registry.wait_all(scope),
        };
        let outcome = match (outcome, drained) {
            (Err(err), _) if err.is_fatal() => Err(err),
            (_, Err(err)) => Err(err),
            (outcome, Ok(())) => match &self.fatal {
                Some(reason) => Err(BridgeError::Aborted(reason.clone())),
                None => Ok(outcome),
            },
        };
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(err) => {
                self.poison(&err);
                self.frames.truncate(index);
                return Err(err);
            }
        };

        let consumed = self.frames.get(index).map_or(0, |f| f.meter.consumed());
        self.frames.truncate(index);
        self.registry.close_scope(scope);

        let result = match outcome {
            Ok(value) => CallResult::success(value, consumed),
            Err(BridgeError::StepLimitExceeded { .. }) => {
                CallResult::failure(ResultKind::StepLimitExceeded, limit)
            }
            Err(err) => {
                tracing::debug!(contract = %request.contract, error = %err, "invocation failed");
                CallResult::failure(err.result_kind(), consumed)
            }
        };
        tracing::debug!(
            contract = %request.contract,
            kind = %result.kind,
            steps = result.steps_used,
            depth = index + 1,
            "frame popped"
        );

        let reply = HostRequest {
            contract: request.contract,
            options,
            op: HostOp::InvokeResult(result.clone()),
        };
        let sent = self.registry.send_untracked(reply);
        self.record(sent)?;
        Ok(result)
    }

    // ── Internal access for the facade and dispatcher ──

    /// Fail with `Aborted` once the session is poisoned.
    pub(crate) fn ensure_live(&self) -> Result<(), BridgeError> {
        match &self.fatal {
            Some(reason) => Err(BridgeError::Aborted(reason.clone())),
            None => Ok(()),
        }
    }

    /// Pass `result` through, poisoning the session on a fatal error.
    pub(crate) fn record<T>(&mut self, result: Result<T, BridgeError>) -> Result<T, BridgeError> {
        if let Err(err) = &result {
            if err.is_fatal() {
                self.poison(err);
            }
        }
        result
    }

    pub(crate) fn frame(&self, index: usize) -> Result<&Frame, BridgeError> {
        self.frames
            .get(index)
            .ok_or_else(|| BridgeError::Aborted(format!("frame {} is gone", index)))
    }

    /// Registry and frame, borrowed together.
    pub(crate) fn split(
        &mut self,
        index: usize,
    ) -> Result<(&mut CompletionRegistry, &mut Frame), BridgeError> {
        let frame = self
            .frames
            .get_mut(index)
            .ok_or_else(|| BridgeError::Aborted(format!("frame {} is gone", index)))?;
        Ok((&mut self.registry, frame))
    }

    pub(crate) fn block_parts(
        &mut self,
        index: usize,
    ) -> Result<(&mut CompletionRegistry, &Frame, &mut BlockCache), BridgeError> {
        let frame = self
            .frames
            .get(index)
            .ok_or_else(|| BridgeError::Aborted(format!("frame {} is gone", index)))?;
        Ok((&mut self.registry, frame, &mut self.block))
    }

    pub(crate) fn registry_mut(&mut self) -> &mut CompletionRegistry {
        &mut self.registry
    }

    fn poison(&mut self, err: &BridgeError) {
        if self.fatal.is_some() {
            return;
        }
        tracing::warn!(error = %err, depth = self.frames.len(), "fatal bridge error, aborting execution");
        self.fatal = Some(err.to_string());
        self.registry.abandon();
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .field("depth", &self.frames.len())
            .field("fatal", &self.fatal)
            .finish()
    }
}
