use crate::field::Field;

/// A collision-resistant hash producing field elements, used uniformly for
/// both the key-derived priority and the Merkle commitment of a node.
///
/// Kept as a trait so the tree engine and proof logic are generic over
/// the concrete permutation, and a different choice (e.g. a circuit-native
/// sponge) can be swapped in without touching `cmt`'s rotation or proof
/// code.
pub trait Hasher {
    /// `H(key)`. Deterministic and a pure function of `key` alone.
    fn priority(key: Field) -> Field;

    /// `H_node(key, a, b)`. Callers pass the two child hashes in either
    /// order; implementations must make this canonically symmetric in
    /// `(a, b)` per [`canonical_pair`] so that tree shape never affects the
    /// resulting hash for a fixed key set.
    fn node_hash(key: Field, a: Field, b: Field) -> Field;
}

/// Reorders a pair of hashes into `(min, max)` by field magnitude.
///
/// Returns the reordered pair along with whether a swap occurred, so
/// callers that need to record a direction bit (the proof builder) and
/// callers that only need the canonical order (the hasher itself) can
/// share one implementation.
pub fn canonical_pair(a: Field, b: Field) -> (Field, Field, bool) {
    if a <= b {
        (a, b, false)
    } else {
        (b, a, true)
    }
}

/// The shipped [`Hasher`] implementation: keyed BLAKE3 over big-endian
/// field encodings, with domain-separating prefixes mirroring the
/// teacher's `Blake3Hasher` (`DATA_PREFIX` for single-input hashes,
/// `MERGE_PREFIX` for two-input merges), extended here with a third
/// prefix for the three-input node hash. The digest is reduced modulo the
/// field prime so every output is a valid [`Field`] element.
pub struct Blake3FieldHasher;

impl Blake3FieldHasher {
    /// Prefix for the priority hash (single field element input).
    pub const PRIORITY_PREFIX: &'static [u8] = &[0x00];
    /// Prefix for the three-input node hash (key, min-child, max-child).
    pub const NODE_PREFIX: &'static [u8] = &[0x01];
}

impl Hasher for Blake3FieldHasher {
    fn priority(key: Field) -> Field {
        let digest = blake3::Hasher::new()
            .update(Self::PRIORITY_PREFIX)
            .update(&key.to_be_bytes())
            .finalize();

        Field::from_be_bytes(digest.as_bytes())
    }

    fn node_hash(key: Field, a: Field, b: Field) -> Field {
        let (lo, hi, _swapped) = canonical_pair(a, b);

        let digest = blake3::Hasher::new()
            .update(Self::NODE_PREFIX)
            .update(&key.to_be_bytes())
            .update(&lo.to_be_bytes())
            .update(&hi.to_be_bytes())
            .finalize();

        Field::from_be_bytes(digest.as_bytes())
    }
}
