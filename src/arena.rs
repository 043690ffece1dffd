//! Simulated physical RAM backing the board's payload regions.

use std::collections::BTreeMap;

use shared::images::{
    BufferHandle, Checksum, ImageTag, Placement, RegionConfig, UnpackOutcome, UnpackReport,
    Unpacker, TABLE_LEN,
};
use shared::memory::{Length, PhysAddress, PhysExtent};

/// Where payloads without a fixed destination are staged.
pub const SCRATCH: PhysExtent = PhysExtent::from_raw(0x9200_0000, 0x40_0000);

struct Bank {
    extent: PhysExtent,
    bytes: Vec<u8>,
}

/// One RAM bank per fixed region plus a scratch bank. Payloads are queued
/// with `feed` and copied in when the registry asks the arena to unpack them.
pub struct Arena {
    banks: Vec<Bank>,
    placements: [Placement; TABLE_LEN],
    pending: BTreeMap<ImageTag, Vec<u8>>,
}

impl Arena {
    pub fn new(layout: &[RegionConfig; TABLE_LEN]) -> Arena {
        let mut banks = Vec::new();
        for config in &layout[1..] {
            if let Placement::Fixed(extent) = config.placement {
                banks.push(Bank::zeroed(extent));
            }
        }
        banks.push(Bank::zeroed(SCRATCH));

        Arena {
            banks,
            placements: (*layout).map(|c| c.placement),
            pending: BTreeMap::new(),
        }
    }

    pub fn feed(&mut self, tag: ImageTag, bytes: Vec<u8>) {
        self.pending.insert(tag, bytes);
    }

    /// Destination the driver offers for `tag`: its fixed region, or the
    /// scratch bank.
    pub fn window(&self, tag: ImageTag) -> PhysExtent {
        match self.placements[tag.index()] {
            Placement::Fixed(extent) => extent,
            Placement::Caller => SCRATCH,
        }
    }

    pub fn read(&self, extent: PhysExtent) -> Option<&[u8]> {
        let bank = self.banks.iter().find(|b| b.extent.contains(extent))?;
        let start = bank.offset_of(extent.address());
        Some(&bank.bytes[start..start + extent.length().as_raw() as usize])
    }

    /// Flips the byte at `address`. Returns false if no bank backs it.
    pub fn corrupt(&mut self, address: PhysAddress) -> bool {
        let extent = PhysExtent::from_raw(address.as_raw(), 1);
        match self.banks.iter_mut().find(|b| b.extent.contains(extent)) {
            Some(bank) => {
                let offset = bank.offset_of(address);
                bank.bytes[offset] ^= 0xff;
                true
            }
            None => false,
        }
    }
}

impl Bank {
    fn zeroed(extent: PhysExtent) -> Bank {
        Bank {
            extent,
            bytes: vec![0; extent.length().as_raw() as usize],
        }
    }

    fn offset_of(&self, address: PhysAddress) -> usize {
        (address.as_raw() - self.extent.address().as_raw()) as usize
    }
}

impl Unpacker for Arena {
    fn unpack(&mut self, dest: PhysAddress, handle: &BufferHandle) -> UnpackReport {
        let Some(source) = self.pending.remove(&handle.tag) else {
            log::warn!("{}: nothing queued", handle.tag);
            return UnpackReport::failed(UnpackOutcome::Error, Length::zero());
        };

        let written = source.len().min(handle.limit.as_raw() as usize);
        let Some(target) = PhysExtent::new_checked(dest, Length::from_raw(written as u64)) else {
            return UnpackReport::failed(UnpackOutcome::Error, Length::zero());
        };
        let Some(bank) = self.banks.iter_mut().find(|b| b.extent.contains(target)) else {
            log::warn!("{}: {:#x} is not backed by RAM", handle.tag, dest.as_raw());
            return UnpackReport::failed(UnpackOutcome::Error, Length::zero());
        };

        let offset = bank.offset_of(dest);
        bank.bytes[offset..offset + written].copy_from_slice(&source[..written]);

        let size = Length::from_raw(written as u64);
        if written < source.len() {
            UnpackReport::failed(UnpackOutcome::Overflow, size)
        } else {
            UnpackReport::completed(size)
        }
    }
}

impl Checksum for Arena {
    fn checksum(&self, extent: PhysExtent) -> u32 {
        // An unbacked extent can't match anything a header promised.
        self.read(extent).map_or(!0, crc32fast::hash)
    }
}
