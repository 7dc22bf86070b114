//! Deterministic byte-stream serialization for a [`CapabilitySet`] (§4.5).
//!
//! Wire layout, little-endian, word-oriented:
//!
//! ```text
//! u32  num_constraints
//! u32  num_capabilities
//! num_constraints * sizeof(Constraint)        // fixed-size records
//! for each capability i:
//!     sizeof(CapabilityHeader) bytes          // header + required + padding
//!     capability[i].length_in_words * 4 bytes // payload
//! ```
//!
//! This is the sole stability contract with peer processes: any two
//! implementations of this format must be able to exchange a chosen
//! capability set alongside a buffer handle.

use thiserror::Error;

use crate::capability::Capability;
use crate::capability_set::{CapabilitySet, CapabilitySetError};
use crate::constraint::Constraint;
use crate::header::{Header, VendorId};

/// On-wire size of a single constraint record: `u32 name + u64 value`,
/// padded to the widest variant (`AddressAlignment`'s `u64`).
const CONSTRAINT_RECORD_SIZE: usize = 12;

/// On-wire size of a capability header: `vendor(4) + name(2) +
/// length_in_words(2) + required(1) + 3 bytes padding`.
const CAPABILITY_HEADER_SIZE: usize = 12;

/// Deserialization failed: the input was malformed or truncated.
///
/// Every read is bounds-checked against the input length; truncation at any
/// byte position is reported here, never silently treated as an empty or
/// partial set.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("input truncated while reading {field}")]
    Truncated { field: &'static str },
    #[error("unknown constraint name {0} in serialized stream")]
    UnknownConstraintName(u32),
    #[error(transparent)]
    InvalidSet(#[from] CapabilitySetError),
}

fn write_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn write_u64(out: &mut Vec<u8>, value: u64) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn write_constraint(out: &mut Vec<u8>, constraint: &Constraint) {
    let start = out.len();
    write_u32(out, constraint.name());

    let value: u64 = match *constraint {
        Constraint::AddressAlignment(v) => v,
        Constraint::PitchAlignment(v) | Constraint::MaxPitch(v) => u64::from(v),
    };
    write_u64(out, value);

    debug_assert_eq!(out.len() - start, CONSTRAINT_RECORD_SIZE);
}

fn write_capability(out: &mut Vec<u8>, capability: &Capability) {
    write_u32(out, capability.header.vendor.into());
    out.extend_from_slice(&capability.header.name.to_le_bytes());
    let length_in_words = capability.payload.len() as u16;
    out.extend_from_slice(&length_in_words.to_le_bytes());
    out.push(u8::from(capability.required));
    out.extend_from_slice(&[0u8; 3]); // zeroed padding, kept for bytewise-equal round trips

    for word in &capability.payload {
        write_u32(out, *word);
    }
}

/// Serialize a capability set to the wire format described in §4.5.
#[must_use]
pub fn serialize_capability_set(set: &CapabilitySet) -> Vec<u8> {
    let mut out = Vec::new();

    write_u32(&mut out, set.constraints().len() as u32);
    write_u32(&mut out, set.capabilities().len() as u32);

    for constraint in set.constraints() {
        write_constraint(&mut out, constraint);
    }

    for capability in set.capabilities() {
        write_capability(&mut out, capability);
    }

    out
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    const fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, len: usize, field: &'static str) -> Result<&'a [u8], CodecError> {
        let end = self.pos.checked_add(len).ok_or(CodecError::Truncated { field })?;
        let slice = self
            .data
            .get(self.pos..end)
            .ok_or(CodecError::Truncated { field })?;
        self.pos = end;
        Ok(slice)
    }

    fn u32(&mut self, field: &'static str) -> Result<u32, CodecError> {
        let bytes = self.take(4, field)?;
        Ok(u32::from_le_bytes(bytes.try_into().unwrap()))
    }

    fn u64(&mut self, field: &'static str) -> Result<u64, CodecError> {
        let bytes = self.take(8, field)?;
        Ok(u64::from_le_bytes(bytes.try_into().unwrap()))
    }

    fn u16(&mut self, field: &'static str) -> Result<u16, CodecError> {
        let bytes = self.take(2, field)?;
        Ok(u16::from_le_bytes(bytes.try_into().unwrap()))
    }

    fn u8(&mut self, field: &'static str) -> Result<u8, CodecError> {
        let bytes = self.take(1, field)?;
        Ok(bytes[0])
    }
}

fn read_constraint(reader: &mut Reader<'_>) -> Result<Constraint, CodecError> {
    let name = reader.u32("constraint.name")?;
    let value = reader.u64("constraint.value")?;

    match name {
        crate::constraint::name::ADDRESS_ALIGNMENT => Ok(Constraint::AddressAlignment(value)),
        crate::constraint::name::PITCH_ALIGNMENT => Ok(Constraint::PitchAlignment(value as u32)),
        crate::constraint::name::MAX_PITCH => Ok(Constraint::MaxPitch(value as u32)),
        other => Err(CodecError::UnknownConstraintName(other)),
    }
}

fn read_capability(reader: &mut Reader<'_>) -> Result<Capability, CodecError> {
    let vendor = VendorId::from(reader.u32("capability.header.vendor")?);
    let name = reader.u16("capability.header.name")?;
    let length_in_words = reader.u16("capability.header.length_in_words")?;
    let required = reader.u8("capability.required")? != 0;
    let _padding = reader.take(3, "capability.padding")?;

    // Reading exactly `length_in_words` words either succeeds with a
    // payload of that length or fails early via `?` on truncation; there
    // is no path back to here with a mismatched length to check for.
    let mut payload = Vec::with_capacity(length_in_words as usize);
    for _ in 0..length_in_words {
        payload.push(reader.u32("capability.payload")?);
    }

    Ok(Capability::new(Header::new(vendor, name, length_in_words), required, payload))
}

/// Deserialize a capability set previously produced by
/// [`serialize_capability_set`].
///
/// # Errors
///
/// Returns [`CodecError`] if `data` is truncated, names an unknown
/// constraint, or fails the [`CapabilitySet`] structural invariants.
pub fn deserialize_capability_set(data: &[u8]) -> Result<CapabilitySet, CodecError> {
    let mut reader = Reader::new(data);

    let num_constraints = reader.u32("num_constraints")?;
    let num_capabilities = reader.u32("num_capabilities")?;

    let mut constraints = Vec::with_capacity(num_constraints as usize);
    for _ in 0..num_constraints {
        constraints.push(read_constraint(&mut reader)?);
    }

    let mut capabilities = Vec::with_capacity(num_capabilities as usize);
    for _ in 0..num_capabilities {
        capabilities.push(read_capability(&mut reader)?);
    }

    Ok(CapabilitySet::new(constraints, capabilities)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::VendorId;

    fn sample_set() -> CapabilitySet {
        CapabilitySet::new(
            vec![
                Constraint::AddressAlignment(4096),
                Constraint::PitchAlignment(128),
                Constraint::MaxPitch(0x7FFF_FFFF),
            ],
            vec![
                Capability::new(Header::new(VendorId::BASE, 0x0000, 0), true, vec![]),
                Capability::new(Header::new(VendorId::NVIDIA, 0xF000, 0), false, vec![]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn round_trip_preserves_all_observable_fields() {
        let set = sample_set();
        let bytes = serialize_capability_set(&set);
        let decoded = deserialize_capability_set(&bytes).unwrap();
        assert_eq!(decoded, set);
    }

    #[test]
    fn serialized_length_matches_s5_formula() {
        let set = sample_set();
        let bytes = serialize_capability_set(&set);
        let expected = 8 + 3 * CONSTRAINT_RECORD_SIZE + 2 * CAPABILITY_HEADER_SIZE;
        assert_eq!(bytes.len(), expected);
    }

    #[test]
    fn round_trip_preserves_non_trivial_payload() {
        let set = CapabilitySet::new(
            vec![],
            vec![Capability::new(
                Header::new(VendorId::ARM, 0x0042, 3),
                true,
                vec![0xDEAD_BEEF, 0x0000_0001, 0xCAFE_F00D],
            )],
        )
        .unwrap();

        let bytes = serialize_capability_set(&set);
        let decoded = deserialize_capability_set(&bytes).unwrap();
        assert_eq!(decoded, set);
    }

    #[test]
    fn truncation_at_every_byte_position_fails_cleanly() {
        let set = sample_set();
        let bytes = serialize_capability_set(&set);

        for len in 0..bytes.len() {
            assert!(
                deserialize_capability_set(&bytes[..len]).is_err(),
                "truncating to {len} bytes should fail, not silently succeed"
            );
        }

        // The full buffer must still succeed.
        assert!(deserialize_capability_set(&bytes).is_ok());
    }

    #[test]
    fn binary_capability_serializes_with_zero_length() {
        let set = CapabilitySet::new(
            vec![],
            vec![Capability::new(Header::new(VendorId::BASE, 0x0000, 0), true, vec![])],
        )
        .unwrap();

        let bytes = serialize_capability_set(&set);
        assert_eq!(bytes.len(), 8 + CAPABILITY_HEADER_SIZE);
    }

    #[test]
    fn unknown_constraint_name_is_rejected() {
        let mut bytes = Vec::new();
        write_u32(&mut bytes, 1); // num_constraints
        write_u32(&mut bytes, 1); // num_capabilities
        write_u32(&mut bytes, 0xFFFF_FFFF); // bogus constraint name
        write_u64(&mut bytes, 0);
        write_capability(
            &mut bytes,
            &Capability::new(Header::new(VendorId::BASE, 0x0000, 0), true, vec![]),
        );

        assert!(matches!(
            deserialize_capability_set(&bytes),
            Err(CodecError::UnknownConstraintName(0xFFFF_FFFF))
        ));
    }
}
