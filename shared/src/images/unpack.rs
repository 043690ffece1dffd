//! Populating a payload's destination.
//!
//! The registry never moves bytes itself. An `Unpacker` does the transfer from
//! whatever feeds the loader (serial, USB, a compressed blob in flash) and
//! reports what happened; the registry validates the request beforehand and
//! records the outcome afterwards.

use log::{debug, error, warn};

use super::error::ImageError;
use super::region::{Placement, RuntimeAttrs};
use super::registry::ImageRegistry;
use super::state::ImageState;
use super::tag::ImageTag;
use crate::memory::{Length, PhysAddress, PhysExtent};

/// What an `Unpacker` may know about the payload it is transferring.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BufferHandle {
    pub tag: ImageTag,
    /// Size announced by the payload's header.
    pub expected_size: Length,
    /// Checksum announced by the payload's header.
    pub expected_checksum: u32,
    /// The most bytes that may be written at the destination.
    pub limit: Length,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UnpackOutcome {
    Completed,
    /// The source held more bytes than `BufferHandle::limit`
    Overflow,
    /// Any other failure, including timeouts
    Error,
}

/// What an `Unpacker` reports back once it is done.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct UnpackReport {
    pub outcome: UnpackOutcome,
    /// Bytes written at the destination.
    pub size: Length,
    /// Checksum learned during the transfer, e.g. from a trailer. Replaces the
    /// expected checksum.
    pub checksum: Option<u32>,
    /// Extra attributes for this instance.
    pub attrs: RuntimeAttrs,
}

impl UnpackReport {
    pub fn completed(size: Length) -> UnpackReport {
        UnpackReport {
            outcome: UnpackOutcome::Completed,
            size,
            checksum: None,
            attrs: RuntimeAttrs::empty(),
        }
    }

    pub fn failed(outcome: UnpackOutcome, size: Length) -> UnpackReport {
        UnpackReport {
            outcome,
            size,
            checksum: None,
            attrs: RuntimeAttrs::empty(),
        }
    }
}

/// The byte-transfer primitive.
///
/// Runs synchronously and may take as long as the source needs. An
/// implementation wanting a timeout must enforce it itself and report
/// `UnpackOutcome::Error`.
pub trait Unpacker {
    /// Write the payload described by `handle` starting at `dest`, writing no
    /// more than `handle.limit` bytes.
    fn unpack(&mut self, dest: PhysAddress, handle: &BufferHandle) -> UnpackReport;
}

impl<U: Unpacker + ?Sized> Unpacker for &mut U {
    fn unpack(&mut self, dest: PhysAddress, handle: &BufferHandle) -> UnpackReport {
        (**self).unpack(dest, handle)
    }
}

impl ImageRegistry {
    /// Transfers the bytes of a `Created` payload into `dest`, whose length is
    /// the capacity the caller vouches for.
    ///
    /// Requests that fail validation leave the descriptor untouched. Once the
    /// unpacker runs, the descriptor always ends in a terminal state, and the
    /// returned error matches it.
    pub fn unpack<T: Into<u8>, U: Unpacker>(
        &mut self,
        tag: T,
        dest: PhysExtent,
        mut unpacker: U,
    ) -> Result<PhysExtent, ImageError> {
        let raw = tag.into();
        let region = self.region_mut(raw)?;
        // `region_mut` accepted the tag.
        let tag = ImageTag::from_raw(raw).ok_or(ImageError::InvalidTag)?;

        match region.state() {
            ImageState::Created => (),
            ImageState::None => return Err(ImageError::NotReady),
            _ => return Err(ImageError::AlreadyDone),
        }

        let expected_size = region.status.size;
        if dest.length() < expected_size {
            debug!(
                "{}: view of {:#x} bytes is smaller than {:#x}",
                tag,
                dest.length().as_raw(),
                expected_size.as_raw()
            );
            return Err(ImageError::Overflow);
        }

        let limit = match region.config.placement {
            Placement::Fixed(extent) => {
                if dest.address() != extent.address() {
                    return Err(ImageError::Misplaced);
                }
                extent.length().min(dest.length())
            }
            Placement::Caller => dest.length(),
        };

        let handle = BufferHandle {
            tag,
            expected_size,
            expected_checksum: region.status.checksum,
            limit,
        };
        let report = unpacker.unpack(dest.address(), &handle);

        region.status.address = dest.address();
        region.status.size = report.size.min(limit);
        region.status.attrs |= report.attrs;
        if let Some(checksum) = report.checksum {
            region.status.checksum = checksum;
        }

        let outcome = if report.size > limit {
            UnpackOutcome::Overflow
        } else {
            report.outcome
        };

        match outcome {
            UnpackOutcome::Completed => {
                if region.status.size != expected_size {
                    warn!(
                        "{}: header promised {:#x} bytes, got {:#x}",
                        tag,
                        expected_size.as_raw(),
                        region.status.size.as_raw()
                    );
                }
                region.status.state = ImageState::Completed;
                debug!(
                    "{}: completed, {:#x} bytes at {:#x}",
                    tag,
                    region.status.size.as_raw(),
                    dest.address().as_raw()
                );
                Ok(region.view())
            }
            UnpackOutcome::Overflow => {
                region.status.state = ImageState::Overflow;
                error!(
                    "{}: overflowed {:#x} byte limit at {:#x}",
                    tag,
                    limit.as_raw(),
                    dest.address().as_raw()
                );
                Err(ImageError::Overflow)
            }
            UnpackOutcome::Error => {
                region.status.state = ImageState::Error;
                error!("{}: transfer failed", tag);
                Err(ImageError::TransferError)
            }
        }
    }
}
