use core::fmt;

/// A physical memory address. Payload destinations are physical addresses
/// handed to us by the board layout or by the caller.
#[derive(Clone, Copy, Eq, Ord, PartialEq, PartialOrd, Debug, Hash, Default)]
pub struct PhysAddress(u64);

impl PhysAddress {
    pub const fn from_raw(val: u64) -> Self {
        Self(val)
    }

    pub const fn zero() -> Self {
        Self::from_raw(0)
    }

    pub const fn as_raw(self) -> u64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn offset_by_checked(self, length: Length) -> Option<Self> {
        self.0.checked_add(length.as_raw()).map(Self::from_raw)
    }
}

impl fmt::LowerHex for PhysAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

/// A byte count.
#[derive(Clone, Copy, Eq, Ord, PartialEq, PartialOrd, Debug, Hash, Default)]
pub struct Length(u64);

impl Length {
    pub const fn from_raw(val: u64) -> Length {
        Length(val)
    }

    pub const fn kib(n: u64) -> Length {
        Length(n * 1024)
    }

    pub const fn mib(n: u64) -> Length {
        Length(n * 1024 * 1024)
    }

    pub const fn zero() -> Length {
        Length(0)
    }

    pub const fn as_raw(self) -> u64 {
        self.0
    }
}

impl fmt::LowerHex for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

/// A contiguous range of physical memory. Unlike a page extent, an empty
/// range is allowed: a zero-byte payload is still a payload.
#[derive(Clone, Copy, Eq, PartialEq, Debug, Hash)]
pub struct PhysExtent {
    pub address: PhysAddress,
    pub length: Length,
}

impl PhysExtent {
    /// Returns `None` if the range would wrap around the end of the address
    /// space.
    pub fn new_checked(address: PhysAddress, length: Length) -> Option<Self> {
        address.offset_by_checked(length)?;
        Some(Self { address, length })
    }

    /// `const` constructor for compiled-in tables. Wraparound is a compile
    /// error when used in a `const` context.
    pub const fn from_raw(address: u64, length: u64) -> Self {
        assert!(length <= u64::MAX - address);
        Self {
            address: PhysAddress::from_raw(address),
            length: Length::from_raw(length),
        }
    }

    pub const fn empty() -> Self {
        Self::from_raw(0, 0)
    }

    pub fn address(self) -> PhysAddress {
        self.address
    }

    pub fn length(self) -> Length {
        self.length
    }

    /// The first address just outside us, to the right. Saturates for an
    /// extent built by hand that runs off the end of the address space.
    pub fn end_address(self) -> PhysAddress {
        PhysAddress::from_raw(self.address.as_raw().saturating_add(self.length.as_raw()))
    }

    /// Whether `other` lies entirely within `self`. An empty `other` is
    /// contained if its address is within `[address, end_address]`.
    pub fn contains(self, other: PhysExtent) -> bool {
        other.address >= self.address && other.end_address() <= self.end_address()
    }
}
