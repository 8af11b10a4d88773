//! Storage channel integration tests.
//!
//! Verify read-after-write through the write shadow, completion delivery
//! and metering of storage operations against the in-memory host.

mod common;

use bytes::Bytes;
use proptest::collection::vec;
use proptest::prelude::*;
use statebridge::{BridgeConfig, Session};
use statebridge_hostapi::{BridgeError, CompletionSink, Delivery, MemHost};
use statebridge_primitives::{OptionFlags, ResultKind, Value};

use common::*;

fn opt(value: Option<Bytes>) -> Value {
    value.map_or(Value::Null, Value::Bytes)
}

fn metered(host: &MemHost, runtime: ScriptedRuntime) -> Session {
    let config = BridgeConfig {
        step_cost: schedule(),
        ..BridgeConfig::default()
    };
    session_with_config(host, runtime, config)
}

// ── Test: read-after-write never reaches the host ──

#[test]
fn test_read_after_write_served_from_shadow() {
    let host = host_with(&[alpha()]);
    let sizes = Sizes::default();
    let runtime = ScriptedRuntime::new().on(alpha(), "write", {
        let sizes = sizes.clone();
        move |state, _| {
            state.put_storage(b"a", Some(b"1"), sizes.sink())?;
            state.put_storage(b"a", Some(b"2"), sizes.sink())?;
            Ok(opt(state.get_storage(b"a")?))
        }
    });
    let mut session = session(&host, runtime);

    let result = run_one(&mut session, &host, invoke(alpha(), "write", vec![]));

    assert!(result.is_success());
    assert_eq!(result.value, Value::Bytes(bytes(b"2")));
    assert_eq!(host.op_names(), vec!["put_storage", "put_storage", "invoke_result"]);
    // First write replaced nothing, second replaced the one-byte "1".
    assert_eq!(sizes.take(), vec![Some(-1), Some(1)]);
    assert_eq!(host.storage(&alpha(), b"a"), Some(bytes(b"2")));
}

#[test]
fn test_unwritten_key_is_read_from_host() {
    let host = host_with(&[alpha()]);
    host.set_storage(alpha(), b"preloaded", b"value");
    let runtime = ScriptedRuntime::new().on(alpha(), "read", |state, _| {
        Ok(Value::List(vec![
            opt(state.get_storage(b"preloaded")?),
            opt(state.get_storage(b"missing")?),
        ]))
    });
    let mut session = session(&host, runtime);

    let result = run_one(&mut session, &host, invoke(alpha(), "read", vec![]));

    assert_eq!(
        result.value,
        Value::List(vec![Value::Bytes(bytes(b"value")), Value::Null])
    );
    assert_eq!(host.op_names(), vec!["get_storage", "get_storage", "invoke_result"]);
}

// ── Test: empty value versus absence ──

#[test]
fn test_empty_value_is_not_absence() {
    let host = host_with(&[alpha()]);
    let runtime = ScriptedRuntime::new()
        .on(alpha(), "store_empty", |state, _| {
            state.put_storage(b"k", Some(b""), CompletionSink::discard())?;
            Ok(opt(state.get_storage(b"k")?))
        })
        .on(alpha(), "read", |state, _| Ok(opt(state.get_storage(b"k")?)))
        .on(alpha(), "delete", |state, _| {
            state.put_storage(b"k", None, CompletionSink::discard())?;
            Ok(opt(state.get_storage(b"k")?))
        });
    let mut session = session(&host, runtime);

    let stored = run_one(&mut session, &host, invoke(alpha(), "store_empty", vec![]));
    assert_eq!(stored.value, Value::Bytes(Bytes::new()));
    assert_eq!(host.storage(&alpha(), b"k"), Some(Bytes::new()));

    // Fresh invocation, so the read goes to the host.
    let read = run_one(&mut session, &host, invoke(alpha(), "read", vec![]));
    assert_eq!(read.value, Value::Bytes(Bytes::new()));

    let deleted = run_one(&mut session, &host, invoke(alpha(), "delete", vec![]));
    assert_eq!(deleted.value, Value::Null);
    assert_eq!(host.storage(&alpha(), b"k"), None);
}

#[test]
fn test_delete_visible_before_ack() {
    let host = host_with(&[alpha()]);
    host.set_storage(alpha(), b"k", b"old");
    let sizes = Sizes::default();
    let runtime = ScriptedRuntime::new().on(alpha(), "delete", {
        let sizes = sizes.clone();
        move |state, _| {
            state.put_storage(b"k", None, sizes.sink())?;
            Ok(opt(state.get_storage(b"k")?))
        }
    });
    let mut session = session(&host, runtime);

    let result = run_one(&mut session, &host, invoke(alpha(), "delete", vec![]));

    assert_eq!(result.value, Value::Null);
    assert!(!host.op_names().contains(&"get_storage"));
    assert_eq!(sizes.take(), vec![Some(3)]);
}

// ── Test: callback waits ──

#[test]
fn test_wait_for_callback_one_at_a_time() {
    let host = host_with(&[alpha()]);
    let sizes = Sizes::default();
    let runtime = ScriptedRuntime::new().on(alpha(), "waits", {
        let sizes = sizes.clone();
        move |state, _| {
            let idle = state.wait_for_callback()?;
            state.put_storage(b"a", Some(b"x"), sizes.sink())?;
            state.put_storage(b"b", Some(b"y"), sizes.sink())?;
            let first = state.wait_for_callback()?;
            let after_first = sizes.take().len() as i128;
            let second = state.wait_for_callback()?;
            let third = state.wait_for_callback()?;
            Ok(Value::List(vec![
                Value::Bool(idle),
                Value::Bool(first),
                Value::Int(after_first),
                Value::Bool(second),
                Value::Bool(third),
            ]))
        }
    });
    let mut session = session(&host, runtime);

    let result = run_one(&mut session, &host, invoke(alpha(), "waits", vec![]));

    assert_eq!(
        result.value,
        Value::List(vec![
            Value::Bool(false),
            Value::Bool(true),
            Value::Int(1),
            Value::Bool(true),
            Value::Bool(false),
        ])
    );
    assert_eq!(sizes.take().len(), 1);
}

#[test]
fn test_wait_for_callbacks_is_idempotent() {
    let host = host_with(&[alpha()]);
    let sizes = Sizes::default();
    let runtime = ScriptedRuntime::new().on(alpha(), "drain", {
        let sizes = sizes.clone();
        move |state, _| {
            state.put_storage(b"a", Some(b"1"), sizes.sink())?;
            state.put_storage(b"b", Some(b"2"), sizes.sink())?;
            state.wait_for_callbacks()?;
            let delivered = sizes.take().len() as i128;
            state.wait_for_callbacks()?;
            Ok(Value::Int(delivered))
        }
    });
    let mut session = session(&host, runtime);

    let result = run_one(&mut session, &host, invoke(alpha(), "drain", vec![]));

    assert_eq!(result.value, Value::Int(2));
    assert!(sizes.take().is_empty());
    assert_eq!(host.op_names(), vec!["put_storage", "put_storage", "invoke_result"]);
}

#[test]
fn test_unwaited_writes_drained_before_result() {
    let host = host_with(&[alpha()]);
    let sizes = Sizes::default();
    let runtime = ScriptedRuntime::new().on(alpha(), "fire", {
        let sizes = sizes.clone();
        move |state, _| {
            state.put_storage(b"a", Some(b"1"), sizes.sink())?;
            Ok(Value::Null)
        }
    });
    let mut session = session(&host, runtime);

    run_one(&mut session, &host, invoke(alpha(), "fire", vec![]));

    assert_eq!(sizes.take(), vec![Some(-1)]);
    assert_eq!(session.pending_requests(), 0);
}

// ── Test: completion reordering ──

#[test]
fn test_reordered_completions_for_distinct_keys() {
    let host = host_with(&[alpha()]);
    host.set_delivery(Delivery::Reversed);
    let sizes = Sizes::default();
    let runtime = ScriptedRuntime::new().on(alpha(), "write", {
        let sizes = sizes.clone();
        move |state, _| {
            state.put_storage(b"a", Some(b"1"), sizes.sink())?;
            state.put_storage(b"b", Some(b"22"), sizes.sink())?;
            state.wait_for_callbacks()?;
            Ok(Value::Null)
        }
    });
    let mut session = session(&host, runtime);

    let result = run_one(&mut session, &host, invoke(alpha(), "write", vec![]));

    assert!(result.is_success());
    assert_eq!(sizes.take(), vec![Some(-1), Some(-1)]);
    assert_eq!(host.storage(&alpha(), b"b"), Some(bytes(b"22")));
}

#[test]
fn test_reordered_completions_for_same_key_abort() {
    let host = host_with(&[alpha()]);
    host.set_delivery(Delivery::Reversed);
    let runtime = ScriptedRuntime::new().on(alpha(), "write", |state, _| {
        state.put_storage(b"a", Some(b"1"), CompletionSink::discard())?;
        state.put_storage(b"a", Some(b"2"), CompletionSink::discard())?;
        state.wait_for_callbacks()?;
        Ok(Value::Null)
    });
    let mut session = session(&host, runtime);
    host.invoke(invoke(alpha(), "write", vec![]));

    assert!(matches!(session.serve_one(), Err(BridgeError::Protocol(_))));
    assert!(session.is_poisoned());
}

// ── Test: storage metering ──

#[test]
fn test_storage_steps_charged() {
    let host = host_with(&[alpha()]);
    let runtime = ScriptedRuntime::new().on(alpha(), "rw", |state, _| {
        state.put_storage(b"a", Some(b"1"), CompletionSink::discard())?;
        state.get_storage(b"a")?;
        state.put_storage(b"a", None, CompletionSink::discard())?;
        Ok(Value::Null)
    });
    let mut session = metered(&host, runtime);

    let result = run_one(&mut session, &host, invoke(alpha(), "rw", vec![]));

    // set: 100 + 2 * 2, get: 20 + 2 * 1, delete: 15
    assert_eq!(result.steps_used, 104 + 22 + 15);
}

#[test]
fn test_unaffordable_write_never_reaches_host() {
    let host = host_with(&[alpha()]);
    let runtime = ScriptedRuntime::new().on(alpha(), "write", |state, _| {
        state.put_storage(b"a", Some(b"1"), CompletionSink::discard())?;
        Ok(Value::Null)
    });
    let mut session = metered(&host, runtime);
    let request = invoke_with(alpha(), "write", vec![], 0, 50, OptionFlags::default());

    let result = run_one(&mut session, &host, request);

    assert_eq!(result.kind, ResultKind::StepLimitExceeded);
    assert_eq!(result.steps_used, 50);
    assert_eq!(host.op_names(), vec!["invoke_result"]);
    assert_eq!(host.storage(&alpha(), b"a"), None);
}

// ── Property: every read reflects the newest issued write ──

fn model_reads(ops: &[(u8, Option<Vec<u8>>)]) -> Vec<Value> {
    let mut model: [Option<Vec<u8>>; 3] = Default::default();
    let mut reads = Vec::new();
    for (key, value) in ops {
        model[*key as usize] = value.clone();
        for slot in &model {
            reads.push(opt(slot.clone().map(Bytes::from)));
        }
    }
    reads
}

proptest! {
    #[test]
    fn test_reads_follow_issued_writes(
        ops in vec((0u8..3, proptest::option::of(vec(any::<u8>(), 0..4))), 0..24)
    ) {
        let host = host_with(&[alpha()]);
        let script = ops.clone();
        let runtime = ScriptedRuntime::new().on(alpha(), "run", move |state, _| {
            let mut reads = Vec::new();
            for (key, value) in &script {
                state.put_storage(&[*key], value.as_deref(), CompletionSink::discard())?;
                for k in 0u8..3 {
                    reads.push(opt(state.get_storage(&[k])?));
                }
            }
            Ok(Value::List(reads))
        });
        let mut session = session(&host, runtime);

        let result = run_one(&mut session, &host, invoke(alpha(), "run", vec![]));

        prop_assert_eq!(result.value, Value::List(model_reads(&ops)));
        let expected = model_reads(&ops);
        let last_round = expected.len().saturating_sub(3);
        for k in 0u8..3 {
            let final_value = expected.get(last_round + k as usize).cloned().unwrap_or(Value::Null);
            prop_assert_eq!(opt(host.storage(&alpha(), &[k])), final_value);
        }
    }
}
