//! Payload tags.

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use static_assertions::const_assert_eq;

/// Largest valid tag. Tag 0 is reserved.
pub const MAX_TAG: u8 = 7;

/// Number of slots in a region table. Slot 0 is never used so that the index
/// of a slot is its tag.
pub const TABLE_LEN: usize = MAX_TAG as usize + 1;

/// One kind of boot payload.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd, Hash, FromPrimitive)]
#[repr(u8)]
pub enum ImageTag {
    /// Kernel image
    Linux = 1,
    Initramfs = 2,
    /// Flattened device tree blob
    FlatTree = 3,
    /// Kernel command line
    Cmdline = 4,
    UsbFirmware = 5,
    /// Baseband processor loader
    BpLoader = 6,
    /// Baseband processor firmware
    BpFirmware = 7,
}

const_assert_eq!(ImageTag::BpFirmware as u8, MAX_TAG);

impl ImageTag {
    /// Every tag, in ascending order.
    pub const ALL: [ImageTag; MAX_TAG as usize] = [
        ImageTag::Linux,
        ImageTag::Initramfs,
        ImageTag::FlatTree,
        ImageTag::Cmdline,
        ImageTag::UsbFirmware,
        ImageTag::BpLoader,
        ImageTag::BpFirmware,
    ];

    pub fn from_raw(raw: u8) -> Option<ImageTag> {
        ImageTag::from_u8(raw)
    }

    pub const fn as_raw(self) -> u8 {
        self as u8
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn name(self) -> &'static str {
        match self {
            ImageTag::Linux => "linux",
            ImageTag::Initramfs => "initramfs",
            ImageTag::FlatTree => "flattree",
            ImageTag::Cmdline => "cmdline",
            ImageTag::UsbFirmware => "usbfw",
            ImageTag::BpLoader => "bploader",
            ImageTag::BpFirmware => "bpfw",
        }
    }
}

impl From<ImageTag> for u8 {
    fn from(tag: ImageTag) -> u8 {
        tag.as_raw()
    }
}

impl core::fmt::Display for ImageTag {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}
