//! Length-prefixed transport over any byte stream.
//!
//! Frame layout: `u32` little-endian body length, then the body encoded
//! with [`statebridge_primitives::codec`]. Requests travel bridge → host,
//! messages host → bridge. Tickets are allocated here, counting from 1.

use std::io::{self, Read, Write};

use statebridge_hostapi::{Transport, TransportError};
use statebridge_primitives::codec::{decode_message, encode_request};
use statebridge_primitives::{HostMessage, HostRequest, Ticket};

/// Largest frame body accepted by default (16 MiB).
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Write one length-prefixed frame.
pub fn write_frame(writer: &mut impl Write, body: &[u8]) -> Result<(), TransportError> {
    let len = u32::try_from(body.len())
        .map_err(|_| TransportError::Malformed(format!("frame of {} bytes", body.len())))?;
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(body)?;
    writer.flush()?;
    Ok(())
}

/// Read one length-prefixed frame. End of stream before the length prefix
/// is a disconnect; end of stream inside a frame is malformed.
pub fn read_frame(reader: &mut impl Read, max_len: usize) -> Result<Vec<u8>, TransportError> {
    let mut prefix = [0u8; 4];
    match reader.read_exact(&mut prefix) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => {
            return Err(TransportError::Disconnected)
        }
        Err(err) => return Err(err.into()),
    }
    let len = u32::from_le_bytes(prefix) as usize;
    if len > max_len {
        return Err(TransportError::Malformed(format!(
            "frame of {} bytes exceeds {}",
            len, max_len
        )));
    }
    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).map_err(|err| match err.kind() {
        io::ErrorKind::UnexpectedEof => TransportError::Malformed("truncated frame".into()),
        _ => TransportError::Io(err),
    })?;
    Ok(body)
}

/// Host connection over a reader/writer pair, e.g. the two halves of a
/// socket or a child process's stdio.
#[derive(Debug)]
pub struct StreamTransport<R, W> {
    reader: R,
    writer: W,
    next_ticket: u64,
    max_frame_len: usize,
}

impl<R: Read, W: Write> StreamTransport<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            next_ticket: 1,
            max_frame_len: MAX_FRAME_LEN,
        }
    }

    /// Override the largest accepted frame body.
    pub fn with_max_frame_len(mut self, max_frame_len: usize) -> Self {
        self.max_frame_len = max_frame_len;
        self
    }

    pub fn into_inner(self) -> (R, W) {
        (self.reader, self.writer)
    }
}

impl<R: Read, W: Write> Transport for StreamTransport<R, W> {
    fn send(&mut self, request: HostRequest) -> Result<Ticket, TransportError> {
        let ticket = Ticket(self.next_ticket);
        write_frame(&mut self.writer, &encode_request(ticket, &request))?;
        self.next_ticket += 1;
        tracing::trace!(ticket = %ticket, op = request.op.name(), "request sent");
        Ok(ticket)
    }

    fn recv(&mut self) -> Result<HostMessage, TransportError> {
        let body = read_frame(&mut self.reader, self.max_frame_len)?;
        Ok(decode_message(&body)?)
    }
}
