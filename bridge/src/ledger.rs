//! Ledger queries.
//!
//! Balance, block and owner reads. None of them registers a pending write.
//! The host applies requests in send order, so a balance read observes every
//! request issued before it, including value moved by completed calls.
//! Block height and timestamp are fixed for one top-level invocation and
//! fetched at most once.

use statebridge_hostapi::BridgeError;
use statebridge_primitives::{Address, Amount, BlockHeight, HostOp, HostResponse, Timestamp};

use crate::registry::{unexpected_response, CompletionRegistry};
use crate::session::Frame;

/// Block context cached for one top-level invocation.
#[derive(Debug, Clone, Default)]
pub(crate) struct BlockCache {
    height: Option<BlockHeight>,
    timestamp: Option<Timestamp>,
}

impl BlockCache {
    pub(crate) fn clear(&mut self) {
        *self = Self::default();
    }
}

pub(crate) fn get_balance(
    registry: &mut CompletionRegistry,
    frame: &Frame,
    address: &Address,
) -> Result<Amount, BridgeError> {
    match registry.request(frame.request(HostOp::GetBalance(*address)))? {
        HostResponse::Balance(amount) => Ok(amount),
        other => Err(unexpected_response("get_balance", &other)),
    }
}

pub(crate) fn get_block_height(
    registry: &mut CompletionRegistry,
    frame: &Frame,
    cache: &mut BlockCache,
) -> Result<BlockHeight, BridgeError> {
    if let Some(height) = cache.height {
        return Ok(height);
    }
    let height = match registry.request(frame.request(HostOp::GetBlockHeight))? {
        HostResponse::BlockHeight(height) => height,
        other => return Err(unexpected_response("get_block_height", &other)),
    };
    cache.height = Some(height);
    Ok(height)
}

pub(crate) fn get_block_timestamp(
    registry: &mut CompletionRegistry,
    frame: &Frame,
    cache: &mut BlockCache,
) -> Result<Timestamp, BridgeError> {
    if let Some(timestamp) = cache.timestamp {
        return Ok(timestamp);
    }
    let timestamp = match registry.request(frame.request(HostOp::GetBlockTimestamp))? {
        HostResponse::BlockTimestamp(timestamp) => timestamp,
        other => return Err(unexpected_response("get_block_timestamp", &other)),
    };
    cache.timestamp = Some(timestamp);
    Ok(timestamp)
}

pub(crate) fn get_owner(
    registry: &mut CompletionRegistry,
    frame: &Frame,
) -> Result<Address, BridgeError> {
    match registry.request(frame.request(HostOp::GetOwner))? {
        HostResponse::Owner(owner) => Ok(owner),
        other => Err(unexpected_response("get_owner", &other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use statebridge_hostapi::{MemHost, StepMeter};
    use statebridge_primitives::{BlockContext, OptionFlags, ADDRESS_LEN};

    const CONTRACT: Address = Address::new([5; ADDRESS_LEN]);

    fn setup() -> (MemHost, CompletionRegistry, Frame) {
        let host = MemHost::new();
        let mut registry = CompletionRegistry::new(Box::new(host.clone()));
        let scope = registry.open_scope();
        let frame = Frame::new(CONTRACT, scope, OptionFlags::default(), StepMeter::new(0));
        (host, registry, frame)
    }

    #[test]
    fn test_unknown_address_has_zero_balance() {
        let (_host, mut registry, frame) = setup();
        let stranger = Address::new([0xAB; ADDRESS_LEN]);
        assert_eq!(get_balance(&mut registry, &frame, &stranger).unwrap(), 0);
    }

    #[test]
    fn test_block_context_is_cached() {
        let (host, mut registry, frame) = setup();
        host.set_block(BlockContext {
            height: 1_204,
            timestamp: 1_700_000_000,
        });
        let mut cache = BlockCache::default();
        for _ in 0..3 {
            assert_eq!(get_block_height(&mut registry, &frame, &mut cache).unwrap(), 1_204);
            assert_eq!(
                get_block_timestamp(&mut registry, &frame, &mut cache).unwrap(),
                1_700_000_000
            );
        }
        assert_eq!(host.op_names(), vec!["get_block_height", "get_block_timestamp"]);

        cache.clear();
        get_block_height(&mut registry, &frame, &mut cache).unwrap();
        assert_eq!(host.requests().len(), 3);
    }

    #[test]
    fn test_owner() {
        let (host, mut registry, frame) = setup();
        let owner = Address::new([9; ADDRESS_LEN]);
        host.set_owner(CONTRACT, owner);
        assert_eq!(get_owner(&mut registry, &frame).unwrap(), owner);
    }

    #[test]
    fn test_ledger_reads_register_nothing() {
        let (_host, mut registry, frame) = setup();
        get_balance(&mut registry, &frame, &CONTRACT).unwrap();
        get_owner(&mut registry, &frame).unwrap();
        assert_eq!(registry.pending_count(), 0);
        assert_eq!(registry.outstanding(frame.scope), 0);
    }
}
