//! Event emitter.

use bytes::Bytes;
use statebridge_hostapi::BridgeError;
use statebridge_primitives::HostOp;

use crate::registry::{CompletionRegistry, Sink};
use crate::session::Frame;

/// Fire an event to the host. The ticket is tracked only so a host error
/// surfaces and the context drains it before ending.
pub(crate) fn log(
    registry: &mut CompletionRegistry,
    frame: &Frame,
    indexed: Vec<Bytes>,
    data: Vec<Bytes>,
) -> Result<(), BridgeError> {
    registry.issue(
        Some(frame.scope),
        frame.request(HostOp::Log { indexed, data }),
        None,
        Sink::Discard,
    )?;
    Ok(())
}

/// Total payload size of an event, used for metering.
pub(crate) fn payload_len(indexed: &[Bytes], data: &[Bytes]) -> usize {
    indexed.iter().chain(data).map(Bytes::len).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use statebridge_hostapi::{MemHost, StepMeter};
    use statebridge_primitives::{Address, OptionFlags, ADDRESS_LEN};

    #[test]
    fn test_log_reaches_host() {
        let host = MemHost::new();
        let mut registry = CompletionRegistry::new(Box::new(host.clone()));
        let contract = Address::new([2; ADDRESS_LEN]);
        let scope = registry.open_scope();
        let frame = Frame::new(contract, scope, OptionFlags::default(), StepMeter::new(0));

        log(
            &mut registry,
            &frame,
            vec![Bytes::from_static(b"Transfer(Address,int)")],
            vec![Bytes::from_static(b"\x01")],
        )
        .unwrap();
        assert_eq!(registry.outstanding(scope), 1);

        registry.wait_all(scope).unwrap();
        let events = host.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].contract, contract);
        assert_eq!(events[0].data, vec![Bytes::from_static(b"\x01")]);
    }

    #[test]
    fn test_payload_len() {
        let indexed = vec![Bytes::from_static(b"abc")];
        let data = vec![Bytes::from_static(b"de"), Bytes::new()];
        assert_eq!(payload_len(&indexed, &data), 5);
        assert_eq!(payload_len(&[], &[]), 0);
    }
}
