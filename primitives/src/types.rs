//! Core type aliases and the account address type.

use core::fmt;

/// Width of an [`Address`] in bytes.
pub const ADDRESS_LEN: usize = 32;

/// Native token amount. Balances never go negative.
pub type Amount = u128;

/// Block height (monotonically increasing).
pub type BlockHeight = u64;

/// Block timestamp as reported by the host.
pub type Timestamp = u64;

/// Account or contract identifier.
///
/// Opaque to the bridge. 256-bit identifiers are stored as-is; 160-bit
/// identifiers are left-padded with zeros via [`Address::from_short`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    /// The all-zero address.
    pub const ZERO: Address = Address([0u8; ADDRESS_LEN]);

    /// Wrap a full-width identifier.
    pub const fn new(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Left-pad a 160-bit identifier to full width.
    pub fn from_short(bytes: [u8; 20]) -> Self {
        let mut full = [0u8; ADDRESS_LEN];
        full[ADDRESS_LEN - 20..].copy_from_slice(&bytes);
        Self(full)
    }

    /// Build an address from a slice of either 20 or 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        match bytes.len() {
            ADDRESS_LEN => {
                let mut full = [0u8; ADDRESS_LEN];
                full.copy_from_slice(bytes);
                Some(Self(full))
            }
            20 => {
                let mut short = [0u8; 20];
                short.copy_from_slice(bytes);
                Some(Self::from_short(short))
            }
            _ => None,
        }
    }

    /// Raw bytes of the address.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// Returns true for the all-zero address.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; ADDRESS_LEN]
    }
}

impl From<[u8; ADDRESS_LEN]> for Address {
    fn from(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}
