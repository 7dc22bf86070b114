//! Capability descriptors and the equivalence/intersection algebra over
//! them.
//!
//! A capability describes a single layout feature a device can provide
//! (pitch-linear, tiled, vendor-private vidmem placement, ...). Capabilities
//! are compared bytewise, ignoring the `required` flag, and intersected list
//! against list rather than merged value-by-value the way constraints are.

use crate::header::Header;

/// A single capability a device is willing to offer, with its `required`
/// flag.
///
/// `length_in_words` from the wire header is not stored redundantly: it is
/// always `payload.len()` and is validated against the wire value on
/// decode (see [`crate::codec`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capability {
    pub header: Header,
    /// If `true`, dropping this capability during intersection invalidates
    /// the whole operation for the producer that required it.
    pub required: bool,
    /// Payload words following the header. Empty for a *binary* capability
    /// (presence alone conveys meaning, e.g. `CAP_BASE_PITCH_LINEAR`).
    pub payload: Vec<u32>,
}

impl Capability {
    #[must_use]
    pub fn new(header: Header, required: bool, payload: Vec<u32>) -> Self {
        Self {
            header,
            required,
            payload,
        }
    }

    /// A capability is *binary* when it carries no payload words — its
    /// presence alone conveys meaning.
    #[must_use]
    pub fn is_binary(&self) -> bool {
        self.payload.is_empty()
    }

    /// Two capabilities are equivalent iff they share `length_in_words`
    /// (equivalently, `payload.len()`), the same header, and bitwise-equal
    /// payload. `required` is deliberately excluded — the source's own
    /// choice, preserved here (see DESIGN.md Open Questions).
    #[must_use]
    pub fn equivalent(&self, other: &Self) -> bool {
        self.header == other.header && self.payload == other.payload
    }
}
