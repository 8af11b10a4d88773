//! Completion payloads for asynchronous storage writes.

use std::fmt;

/// Outcome delivered to a [`CompletionSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// The host stored the write. `previous_len` is the size of the value
    /// it replaced, `None` if the key was absent.
    Stored { previous_len: Option<usize> },
    /// The host could not apply the write.
    Failed { reason: String },
}

impl Completion {
    /// Previous value size with `-1` standing for "no previous value".
    ///
    /// Returns `None` for a failed write.
    pub fn previous_size(&self) -> Option<i64> {
        match self {
            Self::Stored { previous_len: Some(len) } => Some(*len as i64),
            Self::Stored { previous_len: None } => Some(-1),
            Self::Failed { .. } => None,
        }
    }
}

/// Single-shot handler for the completion of one storage write.
///
/// The registry invokes it exactly once, synchronously, from whichever
/// wait observes the host's acknowledgement.
pub struct CompletionSink(Box<dyn FnOnce(Completion)>);

impl CompletionSink {
    /// Wrap a closure.
    pub fn new(f: impl FnOnce(Completion) + 'static) -> Self {
        Self(Box::new(f))
    }

    /// A sink that ignores the completion.
    pub fn discard() -> Self {
        Self::new(|_| {})
    }

    /// Deliver the completion, consuming the sink.
    pub fn complete(self, completion: Completion) {
        (self.0)(completion)
    }
}

impl fmt::Debug for CompletionSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CompletionSink(..)")
    }
}
