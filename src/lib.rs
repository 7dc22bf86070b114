//! Cross-vendor buffer capability negotiation engine.
//!
//! An application declares its intended uses of a shared surface
//! ([`usage`]); each device in the chain reports the capability sets it is
//! willing to offer for those uses ([`device`]); [`capability_set`] folds
//! every device's offer down to the intersection every participant can
//! live with; [`codec`] hands the winning set to a peer process over IPC.

pub mod capability;
pub mod capability_set;
pub mod codec;
pub mod constraint;
pub mod device;
pub mod drivers;
pub mod header;
pub mod usage;
pub mod util;
