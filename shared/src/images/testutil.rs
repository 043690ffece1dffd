//! Simulated physical memory for tests.

use std::collections::BTreeMap;

use super::region::{Placement, RegionConfig};
use super::tag::{ImageTag, TABLE_LEN};
use super::unpack::{BufferHandle, UnpackOutcome, UnpackReport, Unpacker};
use super::verify::Checksum;
use crate::memory::{Length, PhysAddress, PhysExtent};

/// Where caller-placed payloads go.
pub const SCRATCH: PhysExtent = PhysExtent::from_raw(0x9200_0000, 0x10_0000);

/// RAM banks covering each fixed region plus `SCRATCH`, and one pending
/// source per tag for the unpacker to copy from.
pub struct FakeRam {
    banks: Vec<(PhysExtent, Vec<u8>)>,
    placements: [Placement; TABLE_LEN],
    sources: BTreeMap<ImageTag, Vec<u8>>,
}

impl FakeRam {
    pub fn new(layout: &[RegionConfig; TABLE_LEN]) -> FakeRam {
        let mut banks: Vec<(PhysExtent, Vec<u8>)> = layout
            .iter()
            .skip(1)
            .filter_map(|c| match c.placement {
                Placement::Fixed(extent) => Some(extent),
                Placement::Caller => None,
            })
            .map(|extent| (extent, vec![0; extent.length().as_raw() as usize]))
            .collect();
        banks.push((SCRATCH, vec![0; SCRATCH.length().as_raw() as usize]));

        FakeRam {
            banks,
            placements: (*layout).map(|c| c.placement),
            sources: BTreeMap::new(),
        }
    }

    /// Deterministic, non-repeating-looking bytes.
    pub fn pattern(len: usize, seed: u8) -> Vec<u8> {
        (0..len)
            .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed) ^ (i >> 8) as u8)
            .collect()
    }

    pub fn crc(bytes: &[u8]) -> u32 {
        crc32fast::hash(bytes)
    }

    /// Makes `bytes` the source of the next unpack of `tag`.
    pub fn feed(&mut self, tag: ImageTag, bytes: &[u8]) {
        self.sources.insert(tag, bytes.to_vec());
    }

    /// The whole destination available to `tag`.
    pub fn bank(&self, tag: ImageTag) -> PhysExtent {
        match self.placements[tag.index()] {
            Placement::Fixed(extent) => extent,
            Placement::Caller => SCRATCH,
        }
    }

    pub fn read(&self, extent: PhysExtent) -> &[u8] {
        let (bank, bytes) = self.find_bank(extent);
        let start = (extent.address().as_raw() - bank.address().as_raw()) as usize;
        &bytes[start..start + extent.length().as_raw() as usize]
    }

    /// Flips every bit of the byte at `address`.
    pub fn corrupt(&mut self, address: PhysAddress) {
        let extent = PhysExtent::from_raw(address.as_raw(), 1);
        let (bank, bytes) = self.find_bank_mut(extent);
        let offset = (address.as_raw() - bank.address().as_raw()) as usize;
        bytes[offset] ^= 0xff;
    }

    fn find_bank(&self, extent: PhysExtent) -> (PhysExtent, &[u8]) {
        self.banks
            .iter()
            .find(|(bank, _)| bank.contains(extent))
            .map(|(bank, bytes)| (*bank, bytes.as_slice()))
            .unwrap_or_else(|| panic!("{:?} is not backed by RAM", extent))
    }

    fn find_bank_mut(&mut self, extent: PhysExtent) -> (PhysExtent, &mut [u8]) {
        self.banks
            .iter_mut()
            .find(|(bank, _)| bank.contains(extent))
            .map(|(bank, bytes)| (*bank, bytes.as_mut_slice()))
            .unwrap_or_else(|| panic!("{:?} is not backed by RAM", extent))
    }
}

impl Unpacker for FakeRam {
    fn unpack(&mut self, dest: PhysAddress, handle: &BufferHandle) -> UnpackReport {
        let source = match self.sources.remove(&handle.tag) {
            Some(source) => source,
            None => return UnpackReport::failed(UnpackOutcome::Error, Length::zero()),
        };

        let limit = handle.limit.as_raw() as usize;
        let written = source.len().min(limit);
        let extent = PhysExtent::from_raw(dest.as_raw(), written as u64);
        let (bank, bytes) = self.find_bank_mut(extent);
        let offset = (dest.as_raw() - bank.address().as_raw()) as usize;
        bytes[offset..offset + written].copy_from_slice(&source[..written]);

        if source.len() > limit {
            UnpackReport::failed(UnpackOutcome::Overflow, Length::from_raw(written as u64))
        } else {
            UnpackReport::completed(Length::from_raw(written as u64))
        }
    }
}

impl Checksum for FakeRam {
    fn checksum(&self, extent: PhysExtent) -> u32 {
        crc32fast::hash(self.read(extent))
    }
}
