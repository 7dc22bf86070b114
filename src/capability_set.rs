//! Capability sets and the two set-algebra primitives that compose them:
//! [`merge_constraints`] and [`intersect_capabilities`], plus the outer
//! [`derive_capabilities`] cross-product driver.

use thiserror::Error;

use crate::capability::Capability;
use crate::constraint::{Constraint, ConstraintError};

/// An immutable bundle of capabilities plus the constraints they imply.
///
/// Invariants, enforced by [`CapabilitySet::new`] rather than by caller
/// convention:
/// - each constraint kind appears at most once;
/// - each `(vendor, name)` capability pair appears at most once;
/// - the set contains at least one capability (the *primary*, conventionally
///   a layout descriptor such as `CAP_BASE_PITCH_LINEAR`, is `capabilities[0]`
///   and is never dropped by intersection).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilitySet {
    constraints: Vec<Constraint>,
    capabilities: Vec<Capability>,
}

/// A capability set failed to satisfy the structural invariants in §3.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CapabilitySetError {
    #[error("capability set must contain at least one capability")]
    Empty,
    #[error("constraint name {0} appears more than once in the same set")]
    DuplicateConstraint(u32),
    #[error("capability (vendor {vendor}, name {name:#x}) appears more than once in the same set")]
    DuplicateCapability { vendor: u32, name: u16 },
}

impl CapabilitySet {
    /// Build a capability set, validating the invariants from §3.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilitySetError`] if `capabilities` is empty or either
    /// list contains a duplicate name.
    pub fn new(
        constraints: Vec<Constraint>,
        capabilities: Vec<Capability>,
    ) -> Result<Self, CapabilitySetError> {
        if capabilities.is_empty() {
            return Err(CapabilitySetError::Empty);
        }

        for (i, a) in constraints.iter().enumerate() {
            for b in &constraints[i + 1..] {
                if a.name() == b.name() {
                    return Err(CapabilitySetError::DuplicateConstraint(a.name()));
                }
            }
        }

        for (i, a) in capabilities.iter().enumerate() {
            for b in &capabilities[i + 1..] {
                if a.header.vendor == b.header.vendor && a.header.name == b.header.name {
                    return Err(CapabilitySetError::DuplicateCapability {
                        vendor: a.header.vendor.into(),
                        name: a.header.name,
                    });
                }
            }
        }

        Ok(Self {
            constraints,
            capabilities,
        })
    }

    #[must_use]
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    #[must_use]
    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    /// The distinguished primary capability: `capabilities()[0]`.
    ///
    /// Never panics: [`CapabilitySet::new`] refuses to construct a set with
    /// an empty capability list.
    #[must_use]
    pub fn primary(&self) -> &Capability {
        &self.capabilities[0]
    }
}

/// Merge two constraint lists (§4.2).
///
/// The result's names are the union of the two inputs' names; entries
/// present in only one input are copied verbatim, entries present in both
/// are combined via [`Constraint::merge`].
///
/// # Errors
///
/// Fails if any shared constraint name fails to merge. Failure never
/// leaves a partially built list visible to the caller: the in-progress
/// `Vec` is simply dropped.
pub fn merge_constraints(
    a: &[Constraint],
    b: &[Constraint],
) -> Result<Vec<Constraint>, ConstraintError> {
    let mut merged = Vec::with_capacity(a.len() + b.len());

    for &ca in a {
        match b.iter().find(|cb| cb.name() == ca.name()) {
            Some(&cb) => merged.push(ca.merge(cb)?),
            None => merged.push(ca),
        }
    }

    for &cb in b {
        if !a.iter().any(|ca| ca.name() == cb.name()) {
            merged.push(cb);
        }
    }

    Ok(merged)
}

/// A required capability could not survive intersection, or the two sets'
/// primary capabilities disagree.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CapabilityError {
    #[error("either capability list was empty")]
    EmptyInput,
    #[error("primary capabilities are not equivalent")]
    PrimaryMismatch,
    #[error("a required capability was dropped during intersection")]
    RequiredCapabilityDropped,
}

/// Intersect two capability lists (§4.3).
///
/// Both inputs must be non-empty and their first ("primary") capabilities
/// must be equivalent. Every other capability is kept only if an
/// equivalent capability exists in the other list (its `required` flag is
/// OR-ed in); a `required` capability with no equivalent on the other side
/// fails the whole intersection.
///
/// # Errors
///
/// Returns [`CapabilityError`] per the rules above. The result is always
/// non-empty on success, since it always contains the primary.
pub fn intersect_capabilities(
    a: &[Capability],
    b: &[Capability],
) -> Result<Vec<Capability>, CapabilityError> {
    if a.is_empty() || b.is_empty() {
        return Err(CapabilityError::EmptyInput);
    }

    if !a[0].equivalent(&b[0]) {
        return Err(CapabilityError::PrimaryMismatch);
    }

    let mut matched_b = vec![false; b.len()];
    let mut result = Vec::with_capacity(a.len().min(b.len()));

    for ca in a {
        match b.iter().position(|cb| ca.equivalent(cb)) {
            Some(idx) => {
                matched_b[idx] = true;
                let mut copy = ca.clone();
                copy.required |= b[idx].required;
                result.push(copy);
            }
            None if ca.required => return Err(CapabilityError::RequiredCapabilityDropped),
            None => {}
        }
    }

    if b.iter()
        .zip(&matched_b)
        .any(|(cb, &matched)| !matched && cb.required)
    {
        return Err(CapabilityError::RequiredCapabilityDropped);
    }

    Ok(result)
}

/// Given two lists of capability sets, find every pair whose constraints
/// merge and whose capabilities intersect successfully (§4.4).
///
/// Incompatible pairs are skipped, never reported as an error: the purpose
/// of this operation is to discover which pairs compose, so an empty result
/// with no other error simply means "nothing in common" (§7).
///
/// Identity (`derive_capabilities(l, l)` is element-wise equivalent to `l`),
/// commutativity up to element order, and monotonicity
/// (`result.len() <= l0.len() * l1.len()`) all hold by construction.
#[must_use]
pub fn derive_capabilities(l0: &[CapabilitySet], l1: &[CapabilitySet]) -> Vec<CapabilitySet> {
    let mut out = Vec::new();

    for s0 in l0 {
        for s1 in l1 {
            let Ok(constraints) = merge_constraints(s0.constraints(), s1.constraints()) else {
                continue;
            };

            let Ok(capabilities) = intersect_capabilities(s0.capabilities(), s1.capabilities())
            else {
                continue;
            };

            // Both invariants re-checked here are already guaranteed by
            // construction (non-empty capabilities, no duplicate names
            // survive a merge/intersect of two valid sets), so this can
            // never fail — but `new` is still the single place the
            // invariants are enforced, so every `CapabilitySet` in
            // existence, including this one, went through it.
            if let Ok(set) = CapabilitySet::new(constraints, capabilities) {
                out.push(set);
            }
        }
    }

    out
}
