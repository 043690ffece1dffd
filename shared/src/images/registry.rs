//! The payload registry: one region descriptor per tag, indexed by tag.

use log::debug;

use super::error::ImageError;
use super::layout::DEFAULT_LAYOUT;
use super::region::{Region, RegionConfig, RuntimeAttrs};
use super::state::ImageState;
use super::tag::{ImageTag, MAX_TAG, TABLE_LEN};
use crate::memory::{Length, PhysExtent};

/// Owns every region descriptor for one boot cycle.
///
/// There is exactly one owner, the boot sequence driver. Everything that
/// changes a descriptor takes `&mut self`, so no other code can observe a
/// descriptor mid-update and no locking is needed. Code that needs to share
/// the registry (e.g. from a `static`) must wrap it in a lock itself.
#[derive(Clone, Debug)]
pub struct ImageRegistry {
    regions: [Region; TABLE_LEN],
    /// Verification sweeps run so far.
    pub(super) sweeps: u32,
}

impl ImageRegistry {
    /// A fresh table with every status zeroed.
    pub const fn new(layout: [RegionConfig; TABLE_LEN]) -> ImageRegistry {
        let mut regions = [Region::new(RegionConfig::UNUSED); TABLE_LEN];
        let mut i = 0;
        while i < TABLE_LEN {
            regions[i] = Region::new(layout[i]);
            i += 1;
        }
        ImageRegistry { regions, sweeps: 0 }
    }

    pub const fn with_default_layout() -> ImageRegistry {
        Self::new(DEFAULT_LAYOUT)
    }

    /// Descriptor for `tag`. Never touches the table for an invalid tag.
    pub fn region<T: Into<u8>>(&self, tag: T) -> Result<&Region, ImageError> {
        let index = slot(tag.into())?;
        Ok(&self.regions[index])
    }

    pub(super) fn region_mut<T: Into<u8>>(&mut self, tag: T) -> Result<&mut Region, ImageError> {
        let index = slot(tag.into())?;
        Ok(&mut self.regions[index])
    }

    /// Every descriptor with its tag, in ascending tag order.
    pub fn iter(&self) -> impl Iterator<Item = (ImageTag, &Region)> + '_ {
        ImageTag::ALL
            .into_iter()
            .map(move |tag| (tag, &self.regions[tag.index()]))
    }

    pub(super) fn iter_mut(&mut self) -> impl Iterator<Item = (ImageTag, &mut Region)> + '_ {
        // Slot 0 is reserved; every other slot index is a valid tag.
        self.regions
            .iter_mut()
            .enumerate()
            .skip(1)
            .filter_map(|(i, region)| Some((ImageTag::from_raw(i as u8)?, region)))
    }

    /// Records what a header told us about a payload before its bytes
    /// arrive: its size, its checksum and how to treat it.
    ///
    /// Moves the payload from `None` to `Created`.
    pub fn create<T: Into<u8>>(
        &mut self,
        tag: T,
        size: Length,
        checksum: u32,
        attrs: RuntimeAttrs,
    ) -> Result<(), ImageError> {
        let raw = tag.into();
        let region = self.region_mut(raw)?;

        if region.state() != ImageState::None {
            return Err(ImageError::AlreadyDone);
        }
        if let Some(capacity) = region.capacity() {
            if size > capacity {
                return Err(ImageError::Overflow);
            }
        }

        region.status.size = size;
        region.status.checksum = checksum;
        region.status.attrs = attrs;
        region.status.state = ImageState::Created;
        debug!(
            "tag {}: created, {:#x} bytes, checksum {:08x}",
            raw,
            size.as_raw(),
            checksum
        );
        Ok(())
    }

    /// View of a completed payload.
    ///
    /// Fails with `NotReady` unless the payload is `Completed`, so callers
    /// never get a pointer to unfinished or corrupt bytes.
    pub fn find<T: Into<u8>>(&self, tag: T) -> Result<PhysExtent, ImageError> {
        let region = self.region(tag)?;
        match region.state() {
            ImageState::Completed => Ok(region.view()),
            _ => Err(ImageError::NotReady),
        }
    }

    /// Like `find`, but says why a payload is unusable.
    pub fn check<T: Into<u8>>(&self, tag: T) -> Result<PhysExtent, ImageError> {
        let region = self.region(tag)?;
        match region.state() {
            ImageState::Completed => Ok(region.view()),
            ImageState::None | ImageState::Created => Err(ImageError::NotReady),
            ImageState::CrcError => Err(ImageError::CrcError),
            ImageState::Overflow => Err(ImageError::Overflow),
            ImageState::Error => Err(ImageError::TransferError),
        }
    }
}

impl Default for ImageRegistry {
    fn default() -> Self {
        Self::with_default_layout()
    }
}

fn slot(raw: u8) -> Result<usize, ImageError> {
    if raw == 0 || raw > MAX_TAG {
        return Err(ImageError::InvalidTag);
    }
    Ok(raw as usize)
}
