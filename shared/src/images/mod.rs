//! Registry of boot payloads.
//!
//! A loader stages a fixed set of payloads (kernel, initramfs, device tree,
//! command line, firmware blobs) into fixed physical regions before handing
//! off to the next stage. Each payload moves through `ImageState`:
//!
//!  1. `ImageRegistry::create` records what a header says about it
//!  2. `ImageRegistry::unpack` has an `Unpacker` move its bytes into place
//!  3. `ImageRegistry::complete` checksums everything once, before handoff
//!  4. `ImageRegistry::find` or `ImageRegistry::handoff` give out the results
//!
//! `ImageRegistry::dump_stats` prints the table for the operator at any point.

mod error;
mod handoff;
mod layout;
mod region;
mod registry;
mod report;
mod state;
mod tag;
mod unpack;
mod verify;

#[cfg(test)]
mod testutil;

pub use error::ImageError;
pub use handoff::{HandoffEntry, HandoffTable};
pub use layout::{DEFAULT_LAYOUT, VERIFIED_LAYOUT};
pub use region::{Placement, Region, RegionConfig, RuntimeAttrs, StaticAttrs, Status};
pub use registry::ImageRegistry;
pub use state::{state_code, ImageState};
pub use tag::{ImageTag, MAX_TAG, TABLE_LEN};
pub use unpack::{BufferHandle, UnpackOutcome, UnpackReport, Unpacker};
pub use verify::{Checksum, PhysCrc32, SweepPolicy, SweepSummary};
