use core::fmt;

use primitive_types::U256;
use serde::{Deserialize, Serialize};

/// The prime modulus of the field used for keys, priorities and hashes.
///
/// This is the BN254 scalar field prime, a concrete choice for the abstract
/// prime field the algorithmic core is specified over. Nothing in the tree,
/// rotator or proof logic performs field arithmetic beyond reduction after
/// hashing, so any prime of comparable size is a drop-in replacement.
pub const FIELD_MODULUS: U256 = U256([
    0x43e1f593f0000001,
    0x2833e84879b97091,
    0xb85045b68181585d,
    0x30644e72e131a029,
]);

/// An element of the prime field backing keys, priorities and hashes.
///
/// Ordering (`Ord`/`PartialOrd`) compares raw 256-bit magnitude, not
/// field-arithmetic residue class ordering. Every comparison of keys,
/// priorities or hashes anywhere in this workspace must go through this
/// type precisely so that the tree engine, the proof builder, the
/// verifier and the persistent arena all agree on the same total order.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Field(pub U256);

impl Field {
    /// The distinguished sentinel for "empty subtree hash" / "no child".
    ///
    /// Never coincides with `node_hash` of a real node with overwhelming
    /// probability (see [`crate::hash::Hasher::node_hash`]).
    pub const ZERO: Field = Field(U256::zero());

    /// Lifts a native `u64` into the field. Convenience for tests and for
    /// callers modelling keys as small integers.
    pub const fn from_u64(n: u64) -> Self {
        Field(U256([n, 0, 0, 0]))
    }

    /// Reduces an arbitrary 256-bit value modulo [`FIELD_MODULUS`].
    pub fn reduce(raw: U256) -> Self {
        Field(raw % FIELD_MODULUS)
    }

    /// Returns `true` if this is the empty-subtree sentinel.
    pub fn is_zero(&self) -> bool {
        *self == Field::ZERO
    }

    /// Big-endian 32-byte encoding, used as the hasher's input/output wire
    /// representation.
    pub fn to_be_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        self.0.to_big_endian(&mut out);
        out
    }

    /// Parses a big-endian 32-byte encoding back into a field element,
    /// reducing it modulo [`FIELD_MODULUS`] so the result is always
    /// canonical.
    pub fn from_be_bytes(bytes: &[u8; 32]) -> Self {
        Field::reduce(U256::from_big_endian(bytes))
    }
}

impl From<u64> for Field {
    fn from(n: u64) -> Self {
        Field::from_u64(n)
    }
}

impl TryFrom<u128> for Field {
    type Error = core::convert::Infallible;

    fn try_from(n: u128) -> Result<Self, Self::Error> {
        Ok(Field(U256::from(n)))
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Field(0x{:x})", self.0)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_default() {
        assert_eq!(Field::default(), Field::ZERO);
        assert!(Field::ZERO.is_zero());
    }

    #[test]
    fn magnitude_order_matches_u256() {
        let a = Field::from_u64(30);
        let b = Field::from_u64(70);

        assert!(a < b);
        assert!(b > a);
    }

    #[test]
    fn round_trips_through_bytes() {
        let f = Field::from_u64(123_456_789);
        let bytes = f.to_be_bytes();

        assert_eq!(Field::from_be_bytes(&bytes), f);
    }

    #[test]
    fn reduce_wraps_values_at_or_above_modulus() {
        let above = Field::reduce(FIELD_MODULUS + U256::from(5u64));

        assert_eq!(above, Field::from_u64(5));
    }
}
