#![warn(missing_docs)]
#![cfg_attr(not(feature = "std"), no_std)]

//! Field element and hasher primitives shared by the Cartesian Merkle Tree
//! engine (`cmt`) and its persistent arena realization (`cmt-arena`).
//!
//! Keeping these in their own crate is what lets the two tree realizations
//! produce bit-identical root hashes for the same key sequence: both
//! depend on the exact same [`Field`] ordering and [`Hasher`] contract
//! instead of each rolling their own.

mod field;
mod hash;

pub use field::{Field, FIELD_MODULUS};
pub use hash::{canonical_pair, Blake3FieldHasher, Hasher};
