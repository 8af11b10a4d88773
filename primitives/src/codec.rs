//! Deterministic binary encoding of the host protocol.
//!
//! Encoding format:
//! - Fixed-size integers are little-endian (`u8`, `u32`, `u64`, `u128`, `i128`)
//! - `Address` is written as its 32 raw bytes
//! - Variable-length fields (bytes, strings) are length-prefixed (u32 LE)
//! - Repeated fields are count-prefixed (u32 LE) then concatenated
//! - Optional fields: 1-byte flag (0=None, 1=Some) followed by the value
//! - Enums: 1-byte tag followed by the variant payload
//!
//! A request frame is `[ticket: 8] [contract: 32] [options: 4] [op tag: 1] [payload]`.
//! A message frame is `[tag: 1] [payload]`.

use bytes::Bytes;

use crate::error::{CodecError, ResultKind};
use crate::execution::{CallRequest, CallResult, InvokeRequest, OptionFlags, Value};
use crate::message::{HostMessage, HostOp, HostRequest, HostResponse, Ticket};
use crate::types::{Address, ADDRESS_LEN};

/// Deepest `Value::List` nesting accepted by the decoder.
pub const MAX_VALUE_DEPTH: usize = 32;

/// A cursor for reading bytes during decoding.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        if n > self.remaining() {
            return Err(CodecError::Truncated);
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.read_bytes(N)?);
        Ok(buf)
    }

    fn read_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.read_bytes(1)?[0])
    }

    fn read_u32(&mut self) -> Result<u32, CodecError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    fn read_u64(&mut self) -> Result<u64, CodecError> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    fn read_u128(&mut self) -> Result<u128, CodecError> {
        Ok(u128::from_le_bytes(self.read_array()?))
    }

    fn read_i128(&mut self) -> Result<i128, CodecError> {
        Ok(i128::from_le_bytes(self.read_array()?))
    }

    fn read_bool(&mut self) -> Result<bool, CodecError> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(CodecError::Invalid("bool value")),
        }
    }

    fn read_flag(&mut self) -> Result<bool, CodecError> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(CodecError::Invalid("optional flag")),
        }
    }

    fn read_address(&mut self) -> Result<Address, CodecError> {
        Ok(Address::new(self.read_array::<ADDRESS_LEN>()?))
    }

    fn read_var_bytes(&mut self) -> Result<Bytes, CodecError> {
        let len = self.read_u32()? as usize;
        Ok(Bytes::copy_from_slice(self.read_bytes(len)?))
    }

    fn read_optional_bytes(&mut self) -> Result<Option<Bytes>, CodecError> {
        if self.read_flag()? {
            Ok(Some(self.read_var_bytes()?))
        } else {
            Ok(None)
        }
    }

    fn read_string(&mut self) -> Result<String, CodecError> {
        let bytes = self.read_var_bytes()?;
        String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::Invalid("UTF-8"))
    }

    fn read_count(&mut self) -> Result<usize, CodecError> {
        let count = self.read_u32()? as usize;
        // Every element takes at least one byte; reject counts the buffer
        // cannot possibly hold before allocating for them.
        if count > self.remaining() {
            return Err(CodecError::Truncated);
        }
        Ok(count)
    }

    fn read_bytes_list(&mut self) -> Result<Vec<Bytes>, CodecError> {
        let count = self.read_count()?;
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            items.push(self.read_var_bytes()?);
        }
        Ok(items)
    }

    fn finish(self) -> Result<(), CodecError> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(CodecError::TrailingBytes(n)),
        }
    }
}

// ── Encoding helpers ──

fn write_u8(buf: &mut Vec<u8>, v: u8) {
    buf.push(v);
}

fn write_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn write_u64(buf: &mut Vec<u8>, v: u64) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn write_u128(buf: &mut Vec<u8>, v: u128) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn write_bool(buf: &mut Vec<u8>, v: bool) {
    buf.push(if v { 1 } else { 0 });
}

fn write_address(buf: &mut Vec<u8>, addr: &Address) {
    buf.extend_from_slice(addr.as_bytes());
}

fn write_var_bytes(buf: &mut Vec<u8>, data: &[u8]) {
    write_u32(buf, data.len() as u32);
    buf.extend_from_slice(data);
}

fn write_optional_bytes(buf: &mut Vec<u8>, data: &Option<Bytes>) {
    match data {
        None => buf.push(0),
        Some(bytes) => {
            buf.push(1);
            write_var_bytes(buf, bytes);
        }
    }
}

fn write_string(buf: &mut Vec<u8>, s: &str) {
    write_var_bytes(buf, s.as_bytes());
}

fn write_bytes_list(buf: &mut Vec<u8>, items: &[Bytes]) {
    write_u32(buf, items.len() as u32);
    for item in items {
        write_var_bytes(buf, item);
    }
}

// ── Values ──

const VALUE_NULL: u8 = 0;
const VALUE_BOOL: u8 = 1;
const VALUE_INT: u8 = 2;
const VALUE_STR: u8 = 3;
const VALUE_BYTES: u8 = 4;
const VALUE_ADDRESS: u8 = 5;
const VALUE_LIST: u8 = 6;

fn encode_value(buf: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Null => write_u8(buf, VALUE_NULL),
        Value::Bool(b) => {
            write_u8(buf, VALUE_BOOL);
            write_bool(buf, *b);
        }
        Value::Int(v) => {
            write_u8(buf, VALUE_INT);
            buf.extend_from_slice(&v.to_le_bytes());
        }
        Value::Str(s) => {
            write_u8(buf, VALUE_STR);
            write_string(buf, s);
        }
        Value::Bytes(b) => {
            write_u8(buf, VALUE_BYTES);
            write_var_bytes(buf, b);
        }
        Value::Address(a) => {
            write_u8(buf, VALUE_ADDRESS);
            write_address(buf, a);
        }
        Value::List(items) => {
            write_u8(buf, VALUE_LIST);
            encode_values(buf, items);
        }
    }
}

fn encode_values(buf: &mut Vec<u8>, values: &[Value]) {
    write_u32(buf, values.len() as u32);
    for value in values {
        encode_value(buf, value);
    }
}

fn decode_value(r: &mut Reader<'_>, depth: usize) -> Result<Value, CodecError> {
    let tag = r.read_u8()?;
    Ok(match tag {
        VALUE_NULL => Value::Null,
        VALUE_BOOL => Value::Bool(r.read_bool()?),
        VALUE_INT => Value::Int(r.read_i128()?),
        VALUE_STR => Value::Str(r.read_string()?),
        VALUE_BYTES => Value::Bytes(r.read_var_bytes()?),
        VALUE_ADDRESS => Value::Address(r.read_address()?),
        VALUE_LIST => {
            if depth >= MAX_VALUE_DEPTH {
                return Err(CodecError::Invalid("value nesting depth"));
            }
            Value::List(decode_values(r, depth + 1)?)
        }
        tag => return Err(CodecError::UnknownTag { what: "value", tag }),
    })
}

fn decode_values(r: &mut Reader<'_>, depth: usize) -> Result<Vec<Value>, CodecError> {
    let count = r.read_count()?;
    let mut values = Vec::with_capacity(count);
    for _ in 0..count {
        values.push(decode_value(r, depth)?);
    }
    Ok(values)
}

// ── Calls ──

fn encode_call_request(buf: &mut Vec<u8>, call: &CallRequest) {
    write_address(buf, &call.target);
    write_string(buf, &call.method);
    encode_values(buf, &call.params);
    write_u128(buf, call.value);
    write_u64(buf, call.step_limit);
}

fn decode_call_request(r: &mut Reader<'_>) -> Result<CallRequest, CodecError> {
    Ok(CallRequest {
        target: r.read_address()?,
        method: r.read_string()?,
        params: decode_values(r, 0)?,
        value: r.read_u128()?,
        step_limit: r.read_u64()?,
    })
}

fn encode_call_result(buf: &mut Vec<u8>, result: &CallResult) {
    write_u64(buf, result.kind.code());
    encode_value(buf, &result.value);
    write_u64(buf, result.steps_used);
}

fn decode_call_result(r: &mut Reader<'_>) -> Result<CallResult, CodecError> {
    let kind = ResultKind::from_code(r.read_u64()?)
        .ok_or(CodecError::Invalid("result kind"))?;
    Ok(CallResult {
        kind,
        value: decode_value(r, 0)?,
        steps_used: r.read_u64()?,
    })
}

fn encode_invoke(buf: &mut Vec<u8>, invoke: &InvokeRequest) {
    write_address(buf, &invoke.contract);
    write_address(buf, &invoke.caller);
    write_string(buf, &invoke.method);
    encode_values(buf, &invoke.params);
    write_u128(buf, invoke.value);
    write_u64(buf, invoke.step_limit);
    write_u32(buf, invoke.options.bits());
}

fn decode_invoke(r: &mut Reader<'_>) -> Result<InvokeRequest, CodecError> {
    Ok(InvokeRequest {
        contract: r.read_address()?,
        caller: r.read_address()?,
        method: r.read_string()?,
        params: decode_values(r, 0)?,
        value: r.read_u128()?,
        step_limit: r.read_u64()?,
        options: OptionFlags::from_bits(r.read_u32()?),
    })
}

// ── Requests ──

const OP_GET_CODE: u8 = 1;
const OP_GET_TRANSFORMED_CODE: u8 = 2;
const OP_SET_TRANSFORMED_CODE: u8 = 3;
const OP_GET_OBJECT_GRAPH: u8 = 4;
const OP_PUT_OBJECT_GRAPH: u8 = 5;
const OP_GET_STORAGE: u8 = 6;
const OP_PUT_STORAGE: u8 = 7;
const OP_GET_BALANCE: u8 = 8;
const OP_GET_BLOCK_HEIGHT: u8 = 9;
const OP_GET_BLOCK_TIMESTAMP: u8 = 10;
const OP_GET_OWNER: u8 = 11;
const OP_LOG: u8 = 12;
const OP_CALL: u8 = 13;
const OP_INVOKE_RESULT: u8 = 14;

/// Encode a request together with the ticket it was issued under.
pub fn encode_request(ticket: Ticket, request: &HostRequest) -> Vec<u8> {
    let mut buf = Vec::with_capacity(64);
    write_u64(&mut buf, ticket.0);
    write_address(&mut buf, &request.contract);
    write_u32(&mut buf, request.options.bits());
    match &request.op {
        HostOp::GetCode => write_u8(&mut buf, OP_GET_CODE),
        HostOp::GetTransformedCode => write_u8(&mut buf, OP_GET_TRANSFORMED_CODE),
        HostOp::SetTransformedCode(code) => {
            write_u8(&mut buf, OP_SET_TRANSFORMED_CODE);
            write_var_bytes(&mut buf, code);
        }
        HostOp::GetObjectGraph => write_u8(&mut buf, OP_GET_OBJECT_GRAPH),
        HostOp::PutObjectGraph(graph) => {
            write_u8(&mut buf, OP_PUT_OBJECT_GRAPH);
            write_var_bytes(&mut buf, graph);
        }
        HostOp::GetStorage(key) => {
            write_u8(&mut buf, OP_GET_STORAGE);
            write_var_bytes(&mut buf, key);
        }
        HostOp::PutStorage { key, value } => {
            write_u8(&mut buf, OP_PUT_STORAGE);
            write_var_bytes(&mut buf, key);
            write_optional_bytes(&mut buf, value);
        }
        HostOp::GetBalance(addr) => {
            write_u8(&mut buf, OP_GET_BALANCE);
            write_address(&mut buf, addr);
        }
        HostOp::GetBlockHeight => write_u8(&mut buf, OP_GET_BLOCK_HEIGHT),
        HostOp::GetBlockTimestamp => write_u8(&mut buf, OP_GET_BLOCK_TIMESTAMP),
        HostOp::GetOwner => write_u8(&mut buf, OP_GET_OWNER),
        HostOp::Log { indexed, data } => {
            write_u8(&mut buf, OP_LOG);
            write_bytes_list(&mut buf, indexed);
            write_bytes_list(&mut buf, data);
        }
        HostOp::Call(call) => {
            write_u8(&mut buf, OP_CALL);
            encode_call_request(&mut buf, call);
        }
        HostOp::InvokeResult(result) => {
            write_u8(&mut buf, OP_INVOKE_RESULT);
            encode_call_result(&mut buf, result);
        }
    }
    buf
}

/// Decode a request frame produced by [`encode_request`].
pub fn decode_request(data: &[u8]) -> Result<(Ticket, HostRequest), CodecError> {
    let mut r = Reader::new(data);
    let ticket = Ticket(r.read_u64()?);
    let contract = r.read_address()?;
    let options = OptionFlags::from_bits(r.read_u32()?);
    let op = match r.read_u8()? {
        OP_GET_CODE => HostOp::GetCode,
        OP_GET_TRANSFORMED_CODE => HostOp::GetTransformedCode,
        OP_SET_TRANSFORMED_CODE => HostOp::SetTransformedCode(r.read_var_bytes()?),
        OP_GET_OBJECT_GRAPH => HostOp::GetObjectGraph,
        OP_PUT_OBJECT_GRAPH => HostOp::PutObjectGraph(r.read_var_bytes()?),
        OP_GET_STORAGE => HostOp::GetStorage(r.read_var_bytes()?),
        OP_PUT_STORAGE => HostOp::PutStorage {
            key: r.read_var_bytes()?,
            value: r.read_optional_bytes()?,
        },
        OP_GET_BALANCE => HostOp::GetBalance(r.read_address()?),
        OP_GET_BLOCK_HEIGHT => HostOp::GetBlockHeight,
        OP_GET_BLOCK_TIMESTAMP => HostOp::GetBlockTimestamp,
        OP_GET_OWNER => HostOp::GetOwner,
        OP_LOG => HostOp::Log {
            indexed: r.read_bytes_list()?,
            data: r.read_bytes_list()?,
        },
        OP_CALL => HostOp::Call(decode_call_request(&mut r)?),
        OP_INVOKE_RESULT => HostOp::InvokeResult(decode_call_result(&mut r)?),
        tag => return Err(CodecError::UnknownTag { what: "op", tag }),
    };
    r.finish()?;
    Ok((ticket, HostRequest { contract, options, op }))
}

// ── Messages ──

const MSG_COMPLETION: u8 = 1;
const MSG_INVOKE: u8 = 2;
const MSG_CLOSE: u8 = 3;

const RESP_ACK: u8 = 1;
const RESP_VALUE: u8 = 2;
const RESP_STORED: u8 = 3;
const RESP_BALANCE: u8 = 4;
const RESP_BLOCK_HEIGHT: u8 = 5;
const RESP_BLOCK_TIMESTAMP: u8 = 6;
const RESP_OWNER: u8 = 7;
const RESP_CALL: u8 = 8;
const RESP_ERROR: u8 = 9;

fn encode_response(buf: &mut Vec<u8>, response: &HostResponse) {
    match response {
        HostResponse::Ack => write_u8(buf, RESP_ACK),
        HostResponse::Value(value) => {
            write_u8(buf, RESP_VALUE);
            write_optional_bytes(buf, value);
        }
        HostResponse::Stored { previous_len } => {
            write_u8(buf, RESP_STORED);
            match previous_len {
                None => write_u8(buf, 0),
                Some(len) => {
                    write_u8(buf, 1);
                    write_u32(buf, *len);
                }
            }
        }
        HostResponse::Balance(amount) => {
            write_u8(buf, RESP_BALANCE);
            write_u128(buf, *amount);
        }
        HostResponse::BlockHeight(height) => {
            write_u8(buf, RESP_BLOCK_HEIGHT);
            write_u64(buf, *height);
        }
        HostResponse::BlockTimestamp(ts) => {
            write_u8(buf, RESP_BLOCK_TIMESTAMP);
            write_u64(buf, *ts);
        }
        HostResponse::Owner(addr) => {
            write_u8(buf, RESP_OWNER);
            write_address(buf, addr);
        }
        HostResponse::Call(result) => {
            write_u8(buf, RESP_CALL);
            encode_call_result(buf, result);
        }
        HostResponse::Error(msg) => {
            write_u8(buf, RESP_ERROR);
            write_string(buf, msg);
        }
    }
}

fn decode_response(r: &mut Reader<'_>) -> Result<HostResponse, CodecError> {
    Ok(match r.read_u8()? {
        RESP_ACK => HostResponse::Ack,
        RESP_VALUE => HostResponse::Value(r.read_optional_bytes()?),
        RESP_STORED => {
            let previous_len = if r.read_flag()? {
                Some(r.read_u32()?)
            } else {
                None
            };
            HostResponse::Stored { previous_len }
        }
        RESP_BALANCE => HostResponse::Balance(r.read_u128()?),
        RESP_BLOCK_HEIGHT => HostResponse::BlockHeight(r.read_u64()?),
        RESP_BLOCK_TIMESTAMP => HostResponse::BlockTimestamp(r.read_u64()?),
        RESP_OWNER => HostResponse::Owner(r.read_address()?),
        RESP_CALL => HostResponse::Call(decode_call_result(r)?),
        RESP_ERROR => HostResponse::Error(r.read_string()?),
        tag => return Err(CodecError::UnknownTag { what: "response", tag }),
    })
}

/// Encode a host → bridge message.
pub fn encode_message(message: &HostMessage) -> Vec<u8> {
    let mut buf = Vec::with_capacity(32);
    match message {
        HostMessage::Completion { ticket, response } => {
            write_u8(&mut buf, MSG_COMPLETION);
            write_u64(&mut buf, ticket.0);
            encode_response(&mut buf, response);
        }
        HostMessage::Invoke(invoke) => {
            write_u8(&mut buf, MSG_INVOKE);
            encode_invoke(&mut buf, invoke);
        }
        HostMessage::Close => write_u8(&mut buf, MSG_CLOSE),
    }
    buf
}

/// Decode a host → bridge message produced by [`encode_message`].
pub fn decode_message(data: &[u8]) -> Result<HostMessage, CodecError> {
    let mut r = Reader::new(data);
    let message = match r.read_u8()? {
        MSG_COMPLETION => HostMessage::Completion {
            ticket: Ticket(r.read_u64()?),
            response: decode_response(&mut r)?,
        },
        MSG_INVOKE => HostMessage::Invoke(decode_invoke(&mut r)?),
        MSG_CLOSE => HostMessage::Close,
        tag => return Err(CodecError::UnknownTag { what: "message", tag }),
    };
    r.finish()?;
    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        Address::new([n; ADDRESS_LEN])
    }

    fn sample_call() -> HostRequest {
        HostRequest {
            contract: addr(1),
            options: OptionFlags {
                read_only: false,
                trace: true,
            },
            op: HostOp::Call(CallRequest {
                target: addr(2),
                method: "transfer".into(),
                params: vec![
                    Value::Address(addr(3)),
                    Value::Int(-100),
                    Value::List(vec![Value::Bool(true), Value::Null]),
                ],
                value: 1_000_000_000_000_000_000,
                step_limit: 50_000,
            }),
        }
    }

    #[test]
    fn test_call_request_roundtrip() {
        let request = sample_call();
        let bytes = encode_request(Ticket(9), &request);
        let (ticket, decoded) = decode_request(&bytes).unwrap();
        assert_eq!(ticket, Ticket(9));
        assert_eq!(decoded, request);
    }

    #[test]
    fn test_empty_value_distinct_from_delete() {
        let put_empty = HostRequest {
            contract: addr(1),
            options: OptionFlags::default(),
            op: HostOp::PutStorage {
                key: Bytes::from_static(b"k"),
                value: Some(Bytes::new()),
            },
        };
        let delete = HostRequest {
            op: HostOp::PutStorage {
                key: Bytes::from_static(b"k"),
                value: None,
            },
            ..put_empty.clone()
        };
        let a = encode_request(Ticket(1), &put_empty);
        let b = encode_request(Ticket(1), &delete);
        assert_ne!(a, b);
        assert_eq!(decode_request(&a).unwrap().1, put_empty);
        assert_eq!(decode_request(&b).unwrap().1, delete);
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let request = sample_call();
        assert_eq!(
            encode_request(Ticket(3), &request),
            encode_request(Ticket(3), &request)
        );
    }

    #[test]
    fn test_completion_with_call_result() {
        let message = HostMessage::Completion {
            ticket: Ticket(77),
            response: HostResponse::Call(CallResult {
                kind: ResultKind::Reverted(5),
                value: Value::Null,
                steps_used: 1234,
            }),
        };
        let decoded = decode_message(&encode_message(&message)).unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn test_revert_code_at_u32_max_survives_wire() {
        for user in [u32::MAX, u32::MAX - 32] {
            let message = HostMessage::Completion {
                ticket: Ticket(3),
                response: HostResponse::Call(CallResult::failure(ResultKind::Reverted(user), 0)),
            };
            assert_eq!(decode_message(&encode_message(&message)).unwrap(), message);
        }
    }

    #[test]
    fn test_invoke_message() {
        let message = HostMessage::Invoke(InvokeRequest {
            contract: addr(4),
            caller: addr(5),
            method: "onCall".into(),
            params: vec![Value::Str("hi".into())],
            value: 0,
            step_limit: 10,
            options: OptionFlags::read_only(),
        });
        assert_eq!(decode_message(&encode_message(&message)).unwrap(), message);
    }

    #[test]
    fn test_decode_truncated_data() {
        let bytes = encode_request(Ticket(1), &sample_call());
        for cut in [0, 7, 40, bytes.len() - 1] {
            assert!(decode_request(&bytes[..cut]).is_err(), "cut at {}", cut);
        }
    }

    #[test]
    fn test_decode_trailing_bytes() {
        let mut bytes = encode_message(&HostMessage::Close);
        bytes.push(0);
        assert_eq!(decode_message(&bytes), Err(CodecError::TrailingBytes(1)));
    }

    #[test]
    fn test_decode_unknown_tags() {
        assert_eq!(
            decode_message(&[0xEE]),
            Err(CodecError::UnknownTag {
                what: "message",
                tag: 0xEE
            })
        );
        let mut bytes = encode_request(
            Ticket(1),
            &HostRequest {
                contract: addr(1),
                options: OptionFlags::default(),
                op: HostOp::GetCode,
            },
        );
        let last = bytes.len() - 1;
        bytes[last] = 200;
        assert!(matches!(
            decode_request(&bytes),
            Err(CodecError::UnknownTag { what: "op", tag: 200 })
        ));
    }

    #[test]
    fn test_decode_rejects_deep_nesting() {
        let mut value = Value::Null;
        for _ in 0..=MAX_VALUE_DEPTH {
            value = Value::List(vec![value]);
        }
        let message = HostMessage::Invoke(InvokeRequest {
            contract: addr(1),
            caller: addr(2),
            method: "m".into(),
            params: vec![value],
            value: 0,
            step_limit: 0,
            options: OptionFlags::default(),
        });
        assert_eq!(
            decode_message(&encode_message(&message)),
            Err(CodecError::Invalid("value nesting depth"))
        );
    }

    #[test]
    fn test_decode_rejects_oversized_count() {
        // Log with an indexed count far larger than the remaining buffer.
        let mut bytes = Vec::new();
        write_u64(&mut bytes, 1);
        write_address(&mut bytes, &addr(1));
        write_u32(&mut bytes, 0);
        write_u8(&mut bytes, OP_LOG);
        write_u32(&mut bytes, u32::MAX);
        assert_eq!(decode_request(&bytes), Err(CodecError::Truncated));
    }
}
