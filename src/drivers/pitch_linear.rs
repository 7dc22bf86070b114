//! A reference driver modeling a simple pitch-linear-only GPU, in the style
//! of a display-class device whose only layout feature is a linear row
//! pitch with an alignment and a maximum.
//!
//! Vendor-private capabilities (`vidmem`, `contig`) are published the same
//! way a real vendor driver would extend the base pitch-linear capability:
//! additional, non-conflicting entries in the same capability set, some
//! `required` and some advisory.

use std::sync::atomic::{AtomicI64, Ordering};

use tracing::debug;

use crate::capability::Capability;
use crate::capability_set::CapabilitySet;
use crate::constraint::Constraint;
use crate::device::{Allocation, DeviceError, Driver, DriverResource, TransportHandle};
use crate::header::{cap_base, usage_base, Header, VendorId};
use crate::usage::{Assertion, AssertionHint, UsageAtom};
use crate::util::{align_up, find_capability, find_constraint, next_power_of_two};

/// Vendor-private capability name: this allocation should live in
/// device-local video memory.
pub const CAP_VIDMEM_NAME: u16 = 0xF000;
/// Vendor-private capability name: this allocation must be physically
/// contiguous (required for scanout on this reference device).
pub const CAP_CONTIG_NAME: u16 = 0xF001;

/// Fixed per-device layout properties. A real driver would read these off
/// hardware; this reference driver is configured at construction time.
#[derive(Debug, Clone, Copy)]
pub struct PitchLinearProperties {
    pub address_alignment: u64,
    pub pitch_alignment: u32,
    pub max_pitch: u32,
    pub max_dimensions: u32,
}

impl PitchLinearProperties {
    /// Properties representative of a modern discrete GPU generation.
    #[must_use]
    pub const fn modern() -> Self {
        Self {
            address_alignment: 4096,
            pitch_alignment: 128,
            max_pitch: i32::MAX as u32,
            max_dimensions: 16384,
        }
    }

    /// Properties representative of an older, more tightly aligned part.
    #[must_use]
    pub const fn legacy() -> Self {
        Self {
            address_alignment: 4096,
            pitch_alignment: 64,
            max_pitch: i32::MAX as u32,
            max_dimensions: 16384,
        }
    }
}

/// Backing resource for an allocation produced by [`PitchLinearDriver`].
/// Carries nothing beyond the assigned size: a real backend would hold a
/// buffer-object handle or dma-buf fd here.
#[derive(Debug)]
struct PitchLinearResource {
    handle: i64,
}

impl DriverResource for PitchLinearResource {
    fn as_any(&self) -> &dyn core::any::Any {
        self
    }
}

/// Assigns sequential, process-unique transport handles to allocations
/// produced by this driver; stands in for a real fd-returning `mmap`/`dup`
/// call.
fn next_handle() -> i64 {
    static COUNTER: AtomicI64 = AtomicI64::new(1);
    COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// A reference driver that only ever offers one capability set: a
/// pitch-linear surface with this device's alignment constraints, plus two
/// vendor-private capabilities describing placement.
#[derive(Debug)]
pub struct PitchLinearDriver {
    properties: PitchLinearProperties,
}

impl PitchLinearDriver {
    #[must_use]
    pub const fn new(properties: PitchLinearProperties) -> Self {
        Self { properties }
    }

    /// Mirrors the source driver's own `check_uses`: a reference device
    /// only answers for callers that actually declared a use for it.
    fn check_uses(&self, uses: &[UsageAtom]) -> bool {
        !uses.is_empty()
    }
}

impl Driver for PitchLinearDriver {
    fn get_capabilities(
        &self,
        _assertion: &Assertion,
        uses: &[UsageAtom],
    ) -> Result<Vec<CapabilitySet>, DeviceError> {
        if !self.check_uses(uses) {
            return Ok(Vec::new());
        }

        let is_display = uses
            .iter()
            .any(|u| u.usage.name() == usage_base::DISPLAY);

        let constraints = vec![
            Constraint::AddressAlignment(self.properties.address_alignment),
            Constraint::PitchAlignment(self.properties.pitch_alignment),
            Constraint::MaxPitch(self.properties.max_pitch),
        ];

        let mut capabilities = vec![
            Capability::new(Header::new(VendorId::BASE, cap_base::PITCH_LINEAR, 0), true, vec![]),
            Capability::new(Header::new(VendorId::NVIDIA, CAP_VIDMEM_NAME, 0), false, vec![]),
        ];

        if is_display {
            capabilities.push(Capability::new(
                Header::new(VendorId::NVIDIA, CAP_CONTIG_NAME, 0),
                true,
                vec![],
            ));
        }

        let set = CapabilitySet::new(constraints, capabilities)
            .map_err(|e| DeviceError::DriverRejected(e.to_string()))?;

        debug!(is_display, "pitch-linear driver produced one capability set");
        Ok(vec![set])
    }

    fn get_assertion_hints(&self, uses: &[UsageAtom]) -> Result<Vec<AssertionHint>, DeviceError> {
        if !self.check_uses(uses) {
            return Ok(Vec::new());
        }

        Ok(vec![AssertionHint {
            max_width: self.properties.max_dimensions,
            max_height: self.properties.max_dimensions,
            formats: Vec::new(),
        }])
    }

    fn create_allocation(
        &self,
        assertion: &Assertion,
        capability_set: &CapabilitySet,
    ) -> Result<Allocation, DeviceError> {
        let is_contig = find_capability(capability_set, VendorId::NVIDIA, CAP_CONTIG_NAME).is_some();

        let pitch_alignment = find_constraint(capability_set, crate::constraint::name::PITCH_ALIGNMENT)
            .map_or(1, |c| match c {
                Constraint::PitchAlignment(v) => u64::from(*v),
                _ => 1,
            });

        const BYTES_PER_PIXEL: u32 = 4;
        let raw_pitch = u64::from(assertion.width) * u64::from(BYTES_PER_PIXEL);
        let pitch = align_up(raw_pitch, pitch_alignment);

        // Generous prefetch padding: allocate as if the surface were tiled.
        let height = next_power_of_two(assertion.height.max(8));

        let size = pitch * u64::from(height);

        debug!(pitch, height, size, is_contig, "pitch-linear driver sized allocation");

        Ok(Allocation::new(
            capability_set.clone(),
            size,
            Box::new(PitchLinearResource { handle: next_handle() }),
        ))
    }

    fn get_allocation_handle(&self, allocation: &Allocation) -> Result<TransportHandle, DeviceError> {
        let resource = allocation
            .resource()
            .as_any()
            .downcast_ref::<PitchLinearResource>()
            .ok_or_else(|| DeviceError::DriverRejected("allocation not owned by this driver".into()))?;
        Ok(TransportHandle(resource.handle))
    }
}
