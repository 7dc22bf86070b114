//! End-to-end negotiation scenarios across the public API: a caller only
//! ever sees [`bufneg::device::Device`], [`bufneg::capability_set`], and
//! [`bufneg::codec`] — never the reference driver's internals.

use bufneg::capability::Capability;
use bufneg::capability_set::{derive_capabilities, CapabilitySet};
use bufneg::codec::{deserialize_capability_set, serialize_capability_set};
use bufneg::constraint::Constraint;
use bufneg::device::Device;
use bufneg::drivers::pitch_linear::{PitchLinearDriver, PitchLinearProperties};
use bufneg::header::{cap_base, Header, VendorId};
use bufneg::usage::{Assertion, DeviceId, RotationMask, UsageAtom, UsageDescriptor};

fn texture_uses() -> Vec<UsageAtom> {
    vec![UsageAtom {
        dev: None,
        usage: UsageDescriptor::Texture,
    }]
}

fn gpu() -> Device {
    Device::from_driver(
        DeviceId(0),
        Box::new(PitchLinearDriver::new(PitchLinearProperties::modern())),
    )
}

/// S1: a single device queried for a texture usage returns exactly one
/// capability set with the expected constraint and capability shape.
#[test]
fn single_device_texture_negotiation() {
    let assertion = Assertion::new(1920, 1080, None);
    let sets = gpu().get_capabilities(&assertion, &texture_uses()).unwrap();

    assert_eq!(sets.len(), 1);
    let set = &sets[0];
    assert_eq!(set.constraints().len(), 3);
    assert_eq!(set.capabilities().len(), 2);
    assert_eq!(set.primary().header.name, cap_base::PITCH_LINEAR);
}

/// S2: deriving a set against itself is the identity.
#[test]
fn derive_identity() {
    let assertion = Assertion::new(1920, 1080, None);
    let sets = gpu().get_capabilities(&assertion, &texture_uses()).unwrap();

    let derived = derive_capabilities(&sets, &sets);
    assert_eq!(derived, sets);
}

/// S3: a required capability present on one side and absent on the other
/// drops the whole pair, without erroring.
#[test]
fn required_capability_conflict_yields_empty_result() {
    let a = CapabilitySet::new(
        vec![],
        vec![
            Capability::new(Header::new(VendorId::BASE, cap_base::PITCH_LINEAR, 0), true, vec![]),
            Capability::new(Header::new(VendorId::NVIDIA, 0xF001, 0), true, vec![]),
        ],
    )
    .unwrap();

    let b = CapabilitySet::new(
        vec![],
        vec![Capability::new(Header::new(VendorId::BASE, cap_base::PITCH_LINEAR, 0), true, vec![])],
    )
    .unwrap();

    let derived = derive_capabilities(std::slice::from_ref(&a), std::slice::from_ref(&b));
    assert!(derived.is_empty());
}

/// S4: alignment constraints merge via LCM.
#[test]
fn alignment_merge_uses_lcm() {
    assert_eq!(
        Constraint::AddressAlignment(256)
            .merge(Constraint::AddressAlignment(4096))
            .unwrap(),
        Constraint::AddressAlignment(4096)
    );
    assert_eq!(
        Constraint::PitchAlignment(64)
            .merge(Constraint::PitchAlignment(128))
            .unwrap(),
        Constraint::PitchAlignment(128)
    );
}

/// S5: the wire encoding of a negotiated set round-trips byte for byte.
#[test]
fn serialization_round_trip() {
    let assertion = Assertion::new(1920, 1080, None);
    let sets = gpu().get_capabilities(&assertion, &texture_uses()).unwrap();
    let set = &sets[0];

    let bytes = serialize_capability_set(set);
    let expected_len = 8 + 3 * 12 + 2 * 12;
    assert_eq!(bytes.len(), expected_len);

    let decoded = deserialize_capability_set(&bytes).unwrap();
    assert_eq!(&decoded, set);
}

/// S6: adding a display usage pulls in a required contiguity capability
/// that a texture-only peer cannot satisfy.
#[test]
fn display_usage_adds_required_capability_that_texture_only_peer_rejects() {
    let assertion = Assertion::new(1920, 1080, None);
    let device = gpu();

    let texture_sets = device.get_capabilities(&assertion, &texture_uses()).unwrap();

    let display_uses = vec![UsageAtom {
        dev: Some(DeviceId(0)),
        usage: UsageDescriptor::Display {
            rotation: RotationMask(RotationMask::ROTATION_0),
        },
    }];
    let display_sets = device.get_capabilities(&assertion, &display_uses).unwrap();

    assert!(display_sets[0].capabilities().len() > texture_sets[0].capabilities().len());

    let derived = derive_capabilities(&display_sets, &texture_sets);
    assert!(derived.is_empty());
}

/// A usage scoped to one device must not be forwarded to a different
/// device's capability query: `dev: Some(id)` means "only device `id`",
/// not "every device in the negotiation".
#[test]
fn usage_scoped_to_other_device_is_not_forwarded() {
    let assertion = Assertion::new(1920, 1080, None);
    let gpu = gpu();
    let display = Device::from_driver(
        DeviceId(1),
        Box::new(PitchLinearDriver::new(PitchLinearProperties::legacy())),
    );

    let uses = vec![
        UsageAtom {
            dev: None,
            usage: UsageDescriptor::Texture,
        },
        UsageAtom {
            dev: Some(DeviceId(1)),
            usage: UsageDescriptor::Display {
                rotation: RotationMask(RotationMask::ROTATION_0),
            },
        },
    ];

    let gpu_sets = gpu.get_capabilities(&assertion, &uses).unwrap();
    let display_sets = display.get_capabilities(&assertion, &uses).unwrap();

    // The display-scoped usage must not leak into the gpu (id 0) device's
    // capability set: it should see only the device-agnostic texture use.
    assert_eq!(gpu_sets[0].capabilities().len(), 2);
    // The display device (id 1) is the one the usage targets, so it picks
    // up the extra required contiguity capability.
    assert_eq!(display_sets[0].capabilities().len(), 3);
}

/// An allocation created from a negotiated set can be exported and its
/// metadata re-deserialized into a structurally identical capability set.
#[test]
fn allocation_export_round_trips_through_the_codec() {
    let assertion = Assertion::new(256, 64, None);
    let device = gpu();
    let sets = device.get_capabilities(&assertion, &texture_uses()).unwrap();

    let allocation = device.create_allocation(&assertion, &sets[0]).unwrap();
    let (metadata, handle, size) = device.export_allocation(&allocation).unwrap();

    assert!(handle.0 > 0);
    assert_eq!(size, allocation.size());

    let decoded = deserialize_capability_set(&metadata).unwrap();
    assert_eq!(&decoded, allocation.capability_set());
}
