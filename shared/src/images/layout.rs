//! Board layout of payload regions.
//!
//! These addresses are specific to the reference board (RAM at 0x90000000).
//! Porting to another board means writing another table, not changing the
//! registry.

use super::region::{RegionConfig, StaticAttrs};
use super::tag::{ImageTag, TABLE_LEN};
use crate::memory::Length;

pub const DEFAULT_LAYOUT: [RegionConfig; TABLE_LEN] = {
    let mut layout = [RegionConfig::UNUSED; TABLE_LEN];
    layout[ImageTag::Linux.index()] = RegionConfig::fixed(0x9000_8000, Length::mib(2));
    layout[ImageTag::Initramfs.index()] = RegionConfig::fixed(0x9080_0000, Length::mib(2));
    layout[ImageTag::FlatTree.index()] = RegionConfig::fixed(0x9100_0000, Length::mib(1));
    layout[ImageTag::Cmdline.index()] = RegionConfig::fixed(0x9110_0000, Length::from_raw(1024));
    layout[ImageTag::UsbFirmware.index()] = RegionConfig::fixed(0x9111_0000, Length::kib(16));
    layout[ImageTag::BpLoader.index()] = RegionConfig::fixed(0x9112_0000, Length::kib(16));
    layout[ImageTag::BpFirmware.index()] = RegionConfig::lazy();
    layout
};

/// Same regions as `DEFAULT_LAYOUT`, but every one of them is checksummed
/// during the sweep.
pub const VERIFIED_LAYOUT: [RegionConfig; TABLE_LEN] = {
    let mut layout = DEFAULT_LAYOUT;
    let mut i = 1;
    while i < TABLE_LEN {
        layout[i] = layout[i].with_attrs(StaticAttrs::VERIFY);
        i += 1;
    }
    layout
};
