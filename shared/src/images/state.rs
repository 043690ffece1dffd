use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

/// Lifecycle state of one payload.
///
/// ```text
/// None -> Created -> Completed -> CrcError
///            |
///            +-----> Overflow
///            +-----> Error
/// ```
///
/// Everything but `None` and `Created` is terminal for the boot cycle.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, FromPrimitive)]
#[repr(u8)]
pub enum ImageState {
    /// Nothing is known about the payload yet
    #[default]
    None = 0,
    /// Size and checksum are known but the bytes have not been transferred
    Created = 1,
    /// Bytes are in place
    Completed = 2,
    /// Bytes are in place but do not match the expected checksum
    CrcError = 3,
    /// The payload did not fit its destination
    Overflow = 4,
    /// The transfer failed
    Error = 5,
}

impl ImageState {
    pub fn from_raw(raw: u8) -> Option<ImageState> {
        ImageState::from_u8(raw)
    }

    pub const fn as_raw(self) -> u8 {
        self as u8
    }

    pub const fn is_terminal(self) -> bool {
        !matches!(self, ImageState::None | ImageState::Created)
    }

    /// Single-character summary used by the diagnostic report.
    pub const fn code(self) -> char {
        match self {
            ImageState::None => '-',
            ImageState::Created => '*',
            ImageState::Completed => '+',
            ImageState::CrcError => '!',
            ImageState::Overflow => '^',
            ImageState::Error => '#',
        }
    }
}

/// Like `ImageState::code` for a raw state byte, e.g. from a handoff record.
/// Unknown values render as `'?'`.
pub fn state_code(raw: u8) -> char {
    ImageState::from_raw(raw).map_or('?', ImageState::code)
}
