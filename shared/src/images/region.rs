//! Region descriptors: where each payload goes and what we know about it so
//! far.

use bitflags::bitflags;

use super::state::ImageState;
use crate::memory::{Length, PhysAddress, PhysExtent};

bitflags! {
    /// Attributes fixed by the board layout.
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
    pub struct StaticAttrs: u32 {
        /// Checksum the payload during the verification sweep.
        const VERIFY = 1 << 0;
        /// The payload may legitimately never show up.
        const LAZY = 1 << 1;
    }
}

bitflags! {
    /// Attributes set while a payload is described or populated.
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
    pub struct RuntimeAttrs: u32 {
        /// Checksum this particular instance during the verification sweep.
        const VERIFY = 1 << 0;
    }
}

/// Where a payload's bytes go.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Placement {
    /// A fixed destination. The extent's length is the region's capacity.
    Fixed(PhysExtent),
    /// No fixed destination; the caller's view supplies address and capacity
    /// when the payload is populated.
    Caller,
}

/// Build-time configuration of one region.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RegionConfig {
    pub placement: Placement,
    pub attrs: StaticAttrs,
}

impl RegionConfig {
    /// Configuration of the reserved slot 0.
    pub const UNUSED: RegionConfig = RegionConfig {
        placement: Placement::Caller,
        attrs: StaticAttrs::empty(),
    };

    pub const fn fixed(address: u64, capacity: Length) -> RegionConfig {
        RegionConfig {
            placement: Placement::Fixed(PhysExtent::from_raw(address, capacity.as_raw())),
            attrs: StaticAttrs::empty(),
        }
    }

    pub const fn lazy() -> RegionConfig {
        RegionConfig {
            placement: Placement::Caller,
            attrs: StaticAttrs::LAZY,
        }
    }

    pub const fn with_attrs(self, attrs: StaticAttrs) -> RegionConfig {
        RegionConfig {
            placement: self.placement,
            attrs: attrs.union(self.attrs),
        }
    }
}

/// Mutable part of a region descriptor.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Status {
    pub state: ImageState,
    /// Expected size while `Created`, actual size afterwards.
    pub size: Length,
    /// Expected checksum of the payload.
    pub checksum: u32,
    pub attrs: RuntimeAttrs,
    /// Where the bytes landed. Zero until populated.
    pub address: PhysAddress,
}

impl Status {
    pub const fn new() -> Status {
        Status {
            state: ImageState::None,
            size: Length::zero(),
            checksum: 0,
            attrs: RuntimeAttrs::empty(),
            address: PhysAddress::zero(),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Region {
    pub config: RegionConfig,
    pub status: Status,
}

impl Region {
    pub const fn new(config: RegionConfig) -> Region {
        Region {
            config,
            status: Status::new(),
        }
    }

    /// Fixed destination, or zero if the caller chooses.
    pub fn destination(&self) -> PhysAddress {
        match self.config.placement {
            Placement::Fixed(extent) => extent.address(),
            Placement::Caller => PhysAddress::zero(),
        }
    }

    /// Fixed capacity, or `None` if the caller's view decides.
    pub fn capacity(&self) -> Option<Length> {
        match self.config.placement {
            Placement::Fixed(extent) => Some(extent.length()),
            Placement::Caller => None,
        }
    }

    pub fn state(&self) -> ImageState {
        self.status.state
    }

    pub fn is_lazy(&self) -> bool {
        self.config.attrs.contains(StaticAttrs::LAZY)
    }

    /// Whether the sweep should checksum this payload.
    pub fn wants_verify(&self) -> bool {
        self.config.attrs.contains(StaticAttrs::VERIFY)
            || self.status.attrs.contains(RuntimeAttrs::VERIFY)
    }

    /// Address shown to operators: where the bytes landed if they have, else
    /// the fixed destination.
    pub fn display_address(&self) -> PhysAddress {
        if self.status.address.is_zero() {
            self.destination()
        } else {
            self.status.address
        }
    }

    /// The populated bytes. Only meaningful once populated.
    pub fn view(&self) -> PhysExtent {
        PhysExtent {
            address: self.status.address,
            length: self.status.size,
        }
    }
}
