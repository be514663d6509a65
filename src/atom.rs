//! The smallest unit of removal.

/// An atom is an opaque byte slice together with its serialized form.
///
/// For a line atomizer, an atom's bytes are a single line including its
/// trailing newline; for a char atomizer, a single code point's UTF-8
/// encoding. Whatever the atomizer, concatenating an atom's bytes in order
/// with its neighbors reproduces the original reducible region exactly.
///
/// Strategies generally should not need to inspect an atom's contents — the
/// chunk-halving minimizer never does — but some (`MinimizeBalancedPairs`,
/// `CollapseEmptyBraces`) match specific bracket bytes, so the bytes are
/// public.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Atom {
    bytes: Vec<u8>,
}

impl Atom {
    /// Construct a new atom from its serialized bytes.
    pub fn new(bytes: Vec<u8>) -> Atom {
        Atom { bytes }
    }

    /// The atom's serialized bytes, as they should appear on disk.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The length, in bytes, of this atom's serialized form.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Is this atom's serialized form a single byte equal to `b`?
    pub fn is_byte(&self, b: u8) -> bool {
        self.bytes.len() == 1 && self.bytes[0] == b
    }
}
