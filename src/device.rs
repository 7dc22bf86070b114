//! The driver-facing façade: [`Device`] dispatches capability, allocation,
//! and export requests to a selected [`Driver`] implementation, and
//! [`DriverRegistry`] is the one-shot-latched, process-wide list of
//! available drivers (§5, §6).
//!
//! Actually scanning a filesystem directory for driver config records and
//! `dlopen`-ing a shared library is the excluded external collaborator
//! (§1); this module only models the trait boundary it would plug into, so
//! an in-process reference driver (see [`crate::drivers::pitch_linear`])
//! can stand in for it in tests and the demo binary.

use std::fmt;
use std::sync::OnceLock;

use thiserror::Error;
use tracing::{debug, trace};

use crate::capability_set::CapabilitySet;
use crate::usage::{applies_to, Assertion, AssertionHint, DeviceId, UsageAtom};

/// A raw device file descriptor, as handed to [`Device::create`].
///
/// Modeled as a plain integer rather than `std::os::fd::RawFd` so the core
/// stays portable; a real driver backend is free to interpret it as an `fd`
/// on platforms that have one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawDeviceFd(pub i32);

/// An opaque, driver-private handle exported alongside a capability set so
/// a peer process can import the same allocation (§3 "Allocation handle").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransportHandle(pub i64);

/// Failures reported by the device façade and the drivers behind it.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// `Device::create` found no driver willing to accept the descriptor.
    #[error("no registered driver accepts device fd {0:?}")]
    UnknownDevice(RawDeviceFd),
    /// A driver rejected a request (e.g. no uses on this device, or an
    /// assertion it cannot satisfy).
    #[error("driver rejected request: {0}")]
    DriverRejected(String),
}

/// Driver-private resource backing an [`Allocation`]. Drivers implement
/// this with whatever private state they need (a buffer-object handle, a
/// dma-buf fd, ...); the core never inspects it. `as_any` lets a driver
/// recover its own concrete type out of an [`Allocation`] it previously
/// created, without the core needing to know about it.
pub trait DriverResource: fmt::Debug + Send + Sync {
    fn as_any(&self) -> &dyn core::any::Any;
}

/// An allocation created by [`Driver::create_allocation`].
///
/// Owns a deep copy of the capability set it was built against — per the
/// ownership redesign in §9, the caller's original set may be dropped
/// immediately after the call returns.
#[derive(Debug)]
pub struct Allocation {
    capability_set: CapabilitySet,
    size: u64,
    resource: Box<dyn DriverResource>,
}

impl Allocation {
    #[must_use]
    pub fn new(capability_set: CapabilitySet, size: u64, resource: Box<dyn DriverResource>) -> Self {
        Self {
            capability_set,
            size,
            resource,
        }
    }

    #[must_use]
    pub const fn capability_set(&self) -> &CapabilitySet {
        &self.capability_set
    }

    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }

    #[must_use]
    pub fn resource(&self) -> &dyn DriverResource {
        self.resource.as_ref()
    }
}

/// The six operations a driver backend implements (§4.6).
///
/// `destroy`/`destroy_allocation` from the conceptual C API have no
/// counterpart here: Rust's `Drop` does that work, which is also the fix
/// for the aliased-pointer ownership the source's design notes call out.
pub trait Driver: fmt::Debug + Send + Sync {
    /// Query this device's capabilities and constraints for a usage.
    fn get_capabilities(
        &self,
        assertion: &Assertion,
        uses: &[UsageAtom],
    ) -> Result<Vec<CapabilitySet>, DeviceError>;

    /// Query advisory assertion hints for a usage.
    fn get_assertion_hints(&self, uses: &[UsageAtom]) -> Result<Vec<AssertionHint>, DeviceError>;

    /// Create an allocation conforming to an assertion and a capability set
    /// this device produced (or was derived from one it produced).
    fn create_allocation(
        &self,
        assertion: &Assertion,
        capability_set: &CapabilitySet,
    ) -> Result<Allocation, DeviceError>;

    /// Export an allocation's driver-private transport handle (e.g. a
    /// dma-buf fd) so a peer process can import it.
    fn get_allocation_handle(&self, allocation: &Allocation) -> Result<TransportHandle, DeviceError>;
}

/// An initialized device context: the object against which allocation
/// requests are made (§3).
///
/// Carries the [`DeviceId`] an application uses to scope a [`UsageAtom`]
/// to it (or leave it device-agnostic via `dev: None`, per §3). Every
/// usage-bearing call filters its `uses` slice down to the atoms that
/// apply to `self.id` with [`applies_to`] before forwarding to the
/// driver, so a usage scoped to a different device never leaks into this
/// one's negotiation.
#[derive(Debug)]
pub struct Device {
    id: DeviceId,
    driver: Box<dyn Driver>,
}

impl Device {
    /// Initialize a device context on `fd` by asking every registered
    /// driver, in enumeration order, whether it supports the descriptor.
    ///
    /// The resulting device's identity is derived from `fd` itself — the
    /// excluded driver-discovery collaborator (§1) would otherwise assign
    /// it from whatever topology it enumerates the device under.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::UnknownDevice`] if no registered driver
    /// accepts `fd`.
    pub fn create(fd: RawDeviceFd) -> Result<Self, DeviceError> {
        DriverRegistry::global().create(fd).map(|driver| Self {
            id: DeviceId(fd.0 as u64),
            driver,
        })
    }

    /// Wrap an already-constructed driver directly under the given
    /// identity, bypassing registry lookup. Used by tests and the demo
    /// binary to talk to an in-process reference driver without going
    /// through fd-based discovery.
    #[must_use]
    pub fn from_driver(id: DeviceId, driver: Box<dyn Driver>) -> Self {
        Self { id, driver }
    }

    #[must_use]
    pub const fn id(&self) -> DeviceId {
        self.id
    }

    /// Usages that target a different device than this one are not this
    /// device's business; keep only the atoms that apply here.
    fn scoped_uses(&self, uses: &[UsageAtom]) -> Vec<UsageAtom> {
        uses.iter()
            .filter(|u| applies_to(std::slice::from_ref(u), self.id))
            .copied()
            .collect()
    }

    pub fn get_capabilities(
        &self,
        assertion: &Assertion,
        uses: &[UsageAtom],
    ) -> Result<Vec<CapabilitySet>, DeviceError> {
        trace!(?assertion, "requesting capabilities");
        let uses = self.scoped_uses(uses);
        self.driver.get_capabilities(assertion, &uses)
    }

    pub fn get_assertion_hints(
        &self,
        uses: &[UsageAtom],
    ) -> Result<Vec<AssertionHint>, DeviceError> {
        let uses = self.scoped_uses(uses);
        self.driver.get_assertion_hints(&uses)
    }

    pub fn create_allocation(
        &self,
        assertion: &Assertion,
        capability_set: &CapabilitySet,
    ) -> Result<Allocation, DeviceError> {
        debug!(size_hint = assertion.width * assertion.height, "creating allocation");
        self.driver.create_allocation(assertion, capability_set)
    }

    /// Compose [`crate::codec::serialize_capability_set`] with
    /// [`Driver::get_allocation_handle`] to produce everything a peer
    /// process needs to import this allocation.
    pub fn export_allocation(
        &self,
        allocation: &Allocation,
    ) -> Result<(Vec<u8>, TransportHandle, u64), DeviceError> {
        let handle = self.driver.get_allocation_handle(allocation)?;
        let metadata = crate::codec::serialize_capability_set(allocation.capability_set());
        Ok((metadata, handle, allocation.size()))
    }
}

/// A factory that knows how to probe and initialize a driver for a given
/// fd. This is the trait boundary the excluded "driver discovery" external
/// collaborator (scanning config files, `dlopen`) plugs into.
pub trait DriverFactory: fmt::Debug + Send + Sync {
    fn is_fd_supported(&self, fd: RawDeviceFd) -> bool;
    fn create(&self, fd: RawDeviceFd) -> Result<Box<dyn Driver>, DeviceError>;
}

/// Process-wide, one-shot-latched list of available driver factories
/// (§5: "written once, read-only thereafter").
///
/// Uses [`OnceLock`] rather than hand-rolled double-checked locking: the
/// first caller to reach [`DriverRegistry::global`] pays the cost of
/// populating the list, every later caller reads the frozen `Vec` with no
/// locking at all.
pub struct DriverRegistry {
    factories: Vec<Box<dyn DriverFactory>>,
}

static REGISTRY: OnceLock<DriverRegistry> = OnceLock::new();

impl DriverRegistry {
    /// Access the process-wide registry, populating it on first use with
    /// [`register_builtin_factories`].
    pub fn global() -> &'static Self {
        REGISTRY.get_or_init(|| {
            debug!("initializing driver registry");
            Self {
                factories: register_builtin_factories(),
            }
        })
    }

    /// Iterate registered factories in enumeration order and use the first
    /// whose `is_fd_supported` returns true (§6).
    fn create(&self, fd: RawDeviceFd) -> Result<Box<dyn Driver>, DeviceError> {
        self.factories
            .iter()
            .find(|f| f.is_fd_supported(fd))
            .ok_or(DeviceError::UnknownDevice(fd))?
            .create(fd)
    }
}

impl fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("factories", &self.factories.len())
            .finish()
    }
}

/// The crate ships no real hardware driver: out-of-process driver
/// discovery (scanning `/etc/allocator.d`-style config directories for
/// `dlopen`-able libraries) is explicitly out of scope (§1). Tests and the
/// demo binary use [`Device::from_driver`] with
/// [`crate::drivers::pitch_linear::PitchLinearDriver`] directly instead of
/// going through fd-based discovery.
fn register_builtin_factories() -> Vec<Box<dyn DriverFactory>> {
    Vec::new()
}
