//! Payload records passed to the next boot stage.
//!
//! The next stage may be built separately, so the layout is `#[repr(C)]` with
//! a fixed size and the state travels as a raw byte.

use static_assertions::assert_eq_size;

use super::registry::ImageRegistry;
use super::state::{state_code, ImageState};
use super::tag::{ImageTag, MAX_TAG};
use crate::memory::{Length, PhysAddress, PhysExtent};

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct HandoffEntry {
    pub tag: u8,
    pub state: u8,
    pub _reserved: [u8; 2],
    pub checksum: u32,
    pub address: u64,
    pub size: u64,
}

assert_eq_size!(HandoffEntry, [u8; 24]);

impl HandoffEntry {
    /// Decoded state, or `None` if the byte is not a known state.
    pub fn state(&self) -> Option<ImageState> {
        ImageState::from_raw(self.state)
    }

    /// Diagnostic character for the state byte.
    pub fn code(&self) -> char {
        state_code(self.state)
    }

    pub fn extent(&self) -> PhysExtent {
        PhysExtent {
            address: PhysAddress::from_raw(self.address),
            length: Length::from_raw(self.size),
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct HandoffTable {
    /// Entry `i` describes tag `i + 1`.
    pub entries: [HandoffEntry; MAX_TAG as usize],
}

impl HandoffTable {
    /// The payload for `tag`, if it completed. Everything else is withheld so
    /// the next stage cannot jump into unfinished or corrupt bytes.
    pub fn get(&self, tag: ImageTag) -> Option<PhysExtent> {
        let entry = &self.entries[tag.index() - 1];
        match entry.state() {
            Some(ImageState::Completed) => Some(entry.extent()),
            _ => None,
        }
    }
}

impl ImageRegistry {
    /// Snapshot of every payload for the next stage. Run the verification
    /// sweep first.
    pub fn handoff(&self) -> HandoffTable {
        let mut entries = [HandoffEntry::default(); MAX_TAG as usize];
        for ((tag, region), entry) in self.iter().zip(entries.iter_mut()) {
            *entry = HandoffEntry {
                tag: tag.as_raw(),
                state: region.state().as_raw(),
                _reserved: [0; 2],
                checksum: region.status.checksum,
                address: region.status.address.as_raw(),
                size: region.status.size.as_raw(),
            };
        }
        HandoffTable { entries }
    }
}
