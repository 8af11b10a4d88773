//! Result kinds and codec errors.
//!
//! `ResultKind` is the outcome table of a contract call. Every kind is an
//! ordinary value handed back to the caller's contract logic; none of them
//! aborts the surrounding execution.

use core::fmt;

/// First code used for contract-defined reverts. `Reverted(n)` encodes as
/// `REVERT_BASE + n`, so the full `u32` user range has distinct codes.
pub const REVERT_BASE: u64 = 32;

/// Outcome of a contract call.
///
/// The numeric codes are part of the host protocol and MUST stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultKind {
    Success,
    UnknownFailure,
    /// Target address has no executable code.
    NoCode,
    MethodNotFound,
    /// A mutating operation was attempted from a read-only context.
    ReadOnlyViolation,
    StepLimitExceeded,
    InsufficientBalance,
    /// The host refused to nest the call any deeper.
    StackOverflow,
    /// The host reported a communication failure while running the callee.
    TransportFailure,
    /// Contract-defined revert with a user code.
    Reverted(u32),
}

impl ResultKind {
    /// Return the numeric code of this kind.
    pub fn code(self) -> u64 {
        match self {
            Self::Success => 0,
            Self::UnknownFailure => 1,
            Self::NoCode => 2,
            Self::MethodNotFound => 3,
            Self::ReadOnlyViolation => 9,
            Self::StepLimitExceeded => 10,
            Self::InsufficientBalance => 11,
            Self::TransportFailure => 12,
            Self::StackOverflow => 13,
            Self::Reverted(user) => REVERT_BASE + u64::from(user),
        }
    }

    /// Convert from a numeric code.
    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            0 => Some(Self::Success),
            1 => Some(Self::UnknownFailure),
            2 => Some(Self::NoCode),
            3 => Some(Self::MethodNotFound),
            9 => Some(Self::ReadOnlyViolation),
            10 => Some(Self::StepLimitExceeded),
            11 => Some(Self::InsufficientBalance),
            12 => Some(Self::TransportFailure),
            13 => Some(Self::StackOverflow),
            c if c >= REVERT_BASE => u32::try_from(c - REVERT_BASE).ok().map(Self::Reverted),
            _ => None,
        }
    }

    /// Returns true if this is the `Success` kind.
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for ResultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "SUCCESS"),
            Self::UnknownFailure => write!(f, "UNKNOWN_FAILURE"),
            Self::NoCode => write!(f, "NO_CODE"),
            Self::MethodNotFound => write!(f, "METHOD_NOT_FOUND"),
            Self::ReadOnlyViolation => write!(f, "READ_ONLY_VIOLATION"),
            Self::StepLimitExceeded => write!(f, "STEP_LIMIT_EXCEEDED"),
            Self::InsufficientBalance => write!(f, "INSUFFICIENT_BALANCE"),
            Self::StackOverflow => write!(f, "STACK_OVERFLOW"),
            Self::TransportFailure => write!(f, "TRANSPORT_FAILURE"),
            Self::Reverted(code) => write!(f, "REVERTED({})", code),
        }
    }
}

/// Wire codec failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("unexpected end of data")]
    Truncated,

    #[error("unknown {what} tag {tag}")]
    UnknownTag { what: &'static str, tag: u8 },

    #[error("invalid {0}")]
    Invalid(&'static str),

    #[error("{0} trailing bytes after message")]
    TrailingBytes(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_kind_codes_are_stable() {
        let cases: &[(ResultKind, u64)] = &[
            (ResultKind::Success, 0),
            (ResultKind::UnknownFailure, 1),
            (ResultKind::NoCode, 2),
            (ResultKind::MethodNotFound, 3),
            (ResultKind::ReadOnlyViolation, 9),
            (ResultKind::StepLimitExceeded, 10),
            (ResultKind::InsufficientBalance, 11),
            (ResultKind::TransportFailure, 12),
            (ResultKind::StackOverflow, 13),
            (ResultKind::Reverted(0), 32),
            (ResultKind::Reverted(7), 39),
            (ResultKind::Reverted(u32::MAX), 32 + u64::from(u32::MAX)),
        ];
        for &(kind, code) in cases {
            assert_eq!(kind.code(), code);
            assert_eq!(ResultKind::from_code(code), Some(kind));
        }
    }

    #[test]
    fn test_unassigned_codes_rejected() {
        for code in [4u64, 5, 8, 14, 31, 33 + u64::from(u32::MAX)] {
            assert_eq!(ResultKind::from_code(code), None);
        }
    }

    #[test]
    fn test_revert_codes_near_u32_max_stay_distinct() {
        let high = ResultKind::Reverted(u32::MAX);
        let lower = ResultKind::Reverted(u32::MAX - 32);
        assert_ne!(high.code(), lower.code());
        assert_eq!(ResultKind::from_code(high.code()), Some(high));
        assert_eq!(ResultKind::from_code(lower.code()), Some(lower));
    }

    #[test]
    fn test_is_success() {
        assert!(ResultKind::Success.is_success());
        assert!(!ResultKind::NoCode.is_success());
        assert!(!ResultKind::Reverted(0).is_success());
    }

    #[test]
    fn test_display() {
        assert_eq!(ResultKind::NoCode.to_string(), "NO_CODE");
        assert_eq!(ResultKind::Reverted(3).to_string(), "REVERTED(3)");
        assert!(CodecError::UnknownTag { what: "op", tag: 99 }
            .to_string()
            .contains("99"));
    }
}
