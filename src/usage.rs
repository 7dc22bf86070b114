//! Application-declared usages, assertions, and assertion hints.
//!
//! An [`Assertion`] is the required geometric/format properties of a
//! surface; it is immutable once presented to the engine. A [`UsageAtom`] is
//! an application-declared intended use (texture, display), optionally
//! scoped to a single device. An [`AssertionHint`] is read-only advisory
//! guidance a device gives back for a usage so the application can pick a
//! workable assertion before requesting capabilities.

use crate::header::usage_base;

/// Opaque pixel-format token.
///
/// The source marks the canonical name of the pixel-format field as
/// undecided (Khronos data format vs. fourcc); this crate treats it as a
/// permanently opaque token the core never interprets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FormatToken(pub u32);

/// Display rotation plus mirror, encoded as a bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RotationMask(pub u32);

impl RotationMask {
    pub const ROTATION_0: u32 = 0x0000_0000;
    pub const ROTATION_90: u32 = 0x0000_0001;
    pub const ROTATION_180: u32 = 0x0000_0002;
    pub const ROTATION_270: u32 = 0x0000_0003;
    pub const MIRROR: u32 = 0x0000_0004;

    #[must_use]
    pub const fn contains(self, bit: u32) -> bool {
        (self.0 & bit) == bit
    }
}

/// Opaque handle identifying a device within a negotiation. A [`UsageAtom`]
/// with `dev: None` applies to every device in the allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceId(pub u64);

/// A single usage descriptor an application attaches to a device (or to all
/// devices, via `dev: None`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageAtom {
    pub dev: Option<DeviceId>,
    pub usage: UsageDescriptor,
}

/// The standard, cross-vendor usage kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageDescriptor {
    /// `USAGE_BASE_TEXTURE`: binary, no payload.
    Texture,
    /// `USAGE_BASE_DISPLAY`: carries a rotation/mirror bitmask.
    Display { rotation: RotationMask },
}

impl UsageDescriptor {
    #[must_use]
    pub const fn name(&self) -> u16 {
        match self {
            Self::Texture => usage_base::TEXTURE,
            Self::Display { .. } => usage_base::DISPLAY,
        }
    }
}

/// The parameters an application supplies when requesting a surface
/// allocation or capabilities. Immutable once presented to the engine.
///
/// The source's `ext` opaque extension pointer has no Rust counterpart
/// here: nothing in this crate reads or writes through it, so carrying a
/// `Box<dyn Any>` field purely for ABI-extensibility would be dead weight.
/// `#[non_exhaustive]` gives the same forward-compatibility property —
/// new fields can be added later without breaking callers — without
/// requiring every caller to thread a dummy extension value through
/// [`Assertion::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub struct Assertion {
    pub width: u32,
    pub height: u32,
    pub format: Option<FormatToken>,
}

impl Assertion {
    #[must_use]
    pub const fn new(width: u32, height: u32, format: Option<FormatToken>) -> Self {
        Self {
            width,
            height,
            format,
        }
    }
}

/// Advisory guidance a device returns for a declared usage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionHint {
    pub max_width: u32,
    pub max_height: u32,
    pub formats: Vec<FormatToken>,
}

/// Return whether `uses` contains an atom that applies to `dev` (either
/// explicitly or via a device-agnostic `None`).
#[must_use]
pub fn applies_to(uses: &[UsageAtom], dev: DeviceId) -> bool {
    uses.iter().any(|u| u.dev.is_none() || u.dev == Some(dev))
}

/// Return whether `uses` contains a usage with the given wire name, scoped
/// to `dev` or device-agnostic.
#[must_use]
pub fn find_use_by_name(uses: &[UsageAtom], dev: DeviceId, name: u16) -> Option<&UsageAtom> {
    uses.iter()
        .find(|u| (u.dev.is_none() || u.dev == Some(dev)) && u.usage.name() == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applies_to_matches_explicit_device() {
        let dev = DeviceId(1);
        let uses = [UsageAtom {
            dev: Some(dev),
            usage: UsageDescriptor::Texture,
        }];
        assert!(applies_to(&uses, dev));
        assert!(!applies_to(&uses, DeviceId(2)));
    }

    #[test]
    fn applies_to_matches_device_agnostic_use() {
        let uses = [UsageAtom {
            dev: None,
            usage: UsageDescriptor::Texture,
        }];
        assert!(applies_to(&uses, DeviceId(42)));
    }

    #[test]
    fn rotation_mask_contains_checks_bits() {
        let mask = RotationMask(RotationMask::ROTATION_90 | RotationMask::MIRROR);
        assert!(mask.contains(RotationMask::ROTATION_90));
        assert!(mask.contains(RotationMask::MIRROR));
        assert!(!mask.contains(RotationMask::ROTATION_180));
    }

    #[test]
    fn find_use_by_name_respects_scoping() {
        let dev = DeviceId(1);
        let uses = [UsageAtom {
            dev: Some(DeviceId(2)),
            usage: UsageDescriptor::Texture,
        }];
        assert!(find_use_by_name(&uses, dev, usage_base::TEXTURE).is_none());
    }
}
