//! Call dispatcher.
//!
//! A call is synchronous for the caller. Internally the bridge:
//! 1. charges the caller the base call cost and fixes the effective limit
//!    at `min(step_limit, caller remaining)`
//! 2. drains every outstanding write of the caller
//! 3. sends the call and receives until its completion arrives, running
//!    each invocation the host routes back in a fresh frame
//! 4. charges the caller what the callee consumed
//!
//! Value moves and rollbacks happen at the host: it transfers before it
//! routes the invocation and restores the transfer when the callee fails.

use statebridge_hostapi::BridgeError;
use statebridge_primitives::{
    Address, Amount, CallRequest, CallResult, HostOp, HostResponse, ResultKind, Value,
};

use crate::registry::{unexpected_response, Awaited, Sink};
use crate::session::{Inherited, Session};

pub(crate) fn call(
    session: &mut Session,
    index: usize,
    target: &Address,
    method: &str,
    params: Vec<Value>,
    value: Amount,
    step_limit: u64,
) -> Result<CallResult, BridgeError> {
    let (registry, frame) = session.split(index)?;
    if frame.options.read_only && value > 0 {
        tracing::debug!(caller = %frame.contract, target = %target, "value transfer refused in read-only context");
        return Ok(CallResult::failure(ResultKind::ReadOnlyViolation, 0));
    }

    let limit = frame.meter.charge_call(step_limit)?;
    registry.wait_all(frame.scope)?;

    let request = frame.request(HostOp::Call(CallRequest {
        target: *target,
        method: method.to_owned(),
        params,
        value,
        step_limit: limit,
    }));
    let ticket = registry.issue(None, request, None, Sink::Capture)?;
    let inherited = Inherited {
        read_only: frame.options.read_only,
        ceiling: limit,
    };
    tracing::debug!(
        caller = %frame.contract,
        target = %target,
        method,
        value = %value,
        limit,
        ticket = %ticket,
        "call dispatched"
    );

    let result = loop {
        match session.registry_mut().next_for(ticket)? {
            Awaited::Ready(HostResponse::Call(result)) => break result,
            Awaited::Ready(other) => return Err(unexpected_response("call", &other)),
            Awaited::Invoke(nested) => {
                session.run_invocation(nested, Some(inherited))?;
            }
        }
    };

    if result.steps_used > limit {
        return Err(BridgeError::protocol(format!(
            "call to {} reported {} steps over a limit of {}",
            target, result.steps_used, limit
        )));
    }
    let (_, frame) = session.split(index)?;
    frame.meter.charge(result.steps_used)?;
    tracing::debug!(target = %target, kind = %result.kind, steps = result.steps_used, "call returned");
    Ok(result)
}
