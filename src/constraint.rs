//! Per-constraint-name merge functions.
//!
//! A [`Constraint`] is a numeric restriction (alignment, ceiling) a device
//! places on any allocation satisfying one of its capability sets. Merging
//! two constraints of the same kind must be associative and commutative so
//! that folding `N` constraint lists in any order yields the same result.

use crate::util::lcm;
use thiserror::Error;

/// Wire names for the standard constraint kinds.
pub mod name {
    pub const ADDRESS_ALIGNMENT: u32 = 0;
    pub const PITCH_ALIGNMENT: u32 = 1;
    pub const MAX_PITCH: u32 = 2;
}

/// A single constraint value, tagged by kind.
///
/// Represented as a genuine Rust sum type rather than a `(name, value)` pair
/// dispatched through a numeric table: there is no way to construct a
/// `Constraint` with an out-of-range name, which is the hazard the "Tagged
/// unions" design note calls out in the original C table-lookup dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    /// Byte alignment required for the allocation's base address.
    AddressAlignment(u64),
    /// Byte alignment required for each row's stride.
    PitchAlignment(u32),
    /// Maximum byte pitch (row stride) the producer can honor.
    MaxPitch(u32),
}

/// A constraint merge was asked to combine incompatible kinds.
///
/// This can only happen if a caller builds the two inputs by hand with
/// mismatched kinds for the same wire name; [`merge_constraints`] in
/// [`crate::capability_set`] only ever pairs constraints whose
/// [`Constraint::name`] already agree, so in practice this variant is
/// unreachable through the public API.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("cannot merge mismatched constraint kinds: {a_name} vs {b_name}")]
pub struct ConstraintError {
    a_name: u32,
    b_name: u32,
}

impl Constraint {
    /// The wire name (§3 constraint name) for this constraint's kind.
    #[must_use]
    pub const fn name(&self) -> u32 {
        match self {
            Self::AddressAlignment(_) => name::ADDRESS_ALIGNMENT,
            Self::PitchAlignment(_) => name::PITCH_ALIGNMENT,
            Self::MaxPitch(_) => name::MAX_PITCH,
        }
    }

    /// Merge two constraints of the same kind into one satisfying both.
    ///
    /// - `AddressAlignment`/`PitchAlignment`: least common multiple (both
    ///   inputs are preconditioned to be powers of two, so this reduces to
    ///   `max`).
    /// - `MaxPitch`: minimum.
    ///
    /// # Errors
    ///
    /// Returns [`ConstraintError`] if `self` and `other` are different
    /// kinds.
    pub const fn merge(self, other: Self) -> Result<Self, ConstraintError> {
        match (self, other) {
            (Self::AddressAlignment(a), Self::AddressAlignment(b)) => {
                Ok(Self::AddressAlignment(lcm(a, b)))
            }
            (Self::PitchAlignment(a), Self::PitchAlignment(b)) => {
                Ok(Self::PitchAlignment(lcm(a as u64, b as u64) as u32))
            }
            (Self::MaxPitch(a), Self::MaxPitch(b)) => {
                Ok(Self::MaxPitch(if a < b { a } else { b }))
            }
            _ => Err(ConstraintError {
                a_name: self.name(),
                b_name: other.name(),
            }),
        }
    }
}
