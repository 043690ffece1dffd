use core::fmt;

/// Why a registry operation was refused.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd, Hash)]
pub enum ImageError {
    /// The tag is outside `1..=MAX_TAG`
    InvalidTag,
    /// The payload is not in a state that allows the operation yet
    NotReady,
    /// The payload already reached a terminal state
    AlreadyDone,
    /// The payload does not fit the destination
    Overflow,
    /// The payload's contents do not match its expected checksum
    CrcError,
    /// The unpacker reported a failure
    TransferError,
    /// The destination view does not start at the region's fixed destination
    Misplaced,
}

impl fmt::Display for ImageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            ImageError::InvalidTag => "invalid tag",
            ImageError::NotReady => "payload not ready",
            ImageError::AlreadyDone => "payload already finished",
            ImageError::Overflow => "payload does not fit its destination",
            ImageError::CrcError => "checksum mismatch",
            ImageError::TransferError => "transfer failed",
            ImageError::Misplaced => "destination does not match region",
        };
        f.write_str(msg)
    }
}
