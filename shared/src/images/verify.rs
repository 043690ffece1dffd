//! The verification sweep, run once all payloads have been populated and
//! before anything trusts them.

use log::{debug, error, info, warn};

use super::registry::ImageRegistry;
use super::state::ImageState;
use crate::memory::PhysExtent;

/// Integrity check over a range of physical memory.
pub trait Checksum {
    fn checksum(&self, extent: PhysExtent) -> u32;
}

impl<C: Checksum + ?Sized> Checksum for &C {
    fn checksum(&self, extent: PhysExtent) -> u32 {
        (**self).checksum(extent)
    }
}

/// CRC32 of physical memory read through an identity mapping.
pub struct PhysCrc32 {
    _phantom: core::marker::PhantomData<*const u8>,
}

impl PhysCrc32 {
    /// # Safety
    ///
    /// Caller must ensure physical memory is identity mapped and that every
    /// completed payload's extent is readable for as long as this exists.
    pub unsafe fn new() -> Self {
        PhysCrc32 {
            _phantom: core::marker::PhantomData,
        }
    }
}

impl Checksum for PhysCrc32 {
    fn checksum(&self, extent: PhysExtent) -> u32 {
        if extent.length().as_raw() == 0 {
            return crc32fast::hash(&[]);
        }
        // SAFETY: `new`'s contract makes the extent readable at its physical
        // address.
        let bytes = unsafe {
            core::slice::from_raw_parts(
                extent.address().as_raw() as usize as *const u8,
                extent.length().as_raw() as usize,
            )
        };
        crc32fast::hash(bytes)
    }
}

/// What to do with payloads that were described but never finished.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SweepPolicy {
    /// Leave them `Created`; the driver decides.
    Lenient,
    /// Mark them `Error`.
    Strict,
}

impl Default for SweepPolicy {
    #[cfg(not(feature = "strict"))]
    fn default() -> Self {
        SweepPolicy::Lenient
    }

    #[cfg(feature = "strict")]
    fn default() -> Self {
        SweepPolicy::Strict
    }
}

/// Tally of one sweep. Every tag lands in exactly one bucket.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SweepSummary {
    /// Completed and either checksummed successfully or not subject to
    /// verification
    pub verified: usize,
    /// Completed but failed verification in this sweep or an earlier one
    pub corrupt: usize,
    /// Left `Created` by a lenient sweep
    pub pending: usize,
    /// `Created` entries a strict sweep marked as errors
    pub abandoned: usize,
    /// Never described, and not lazy
    pub missing: usize,
    /// Never described, and lazy; not an error
    pub absent: usize,
    /// Overflowed or failed to transfer
    pub failed: usize,
}

impl SweepSummary {
    /// Whether every payload that isn't lazy made it intact.
    pub fn is_bootable(&self) -> bool {
        self.corrupt == 0
            && self.pending == 0
            && self.abandoned == 0
            && self.missing == 0
            && self.failed == 0
    }
}

impl ImageRegistry {
    /// Checks every payload once, tag 1 through `MAX_TAG`.
    ///
    /// Completed payloads that ask for verification are checksummed; a
    /// mismatch moves them to `CrcError`. Nothing else changes, except that
    /// `SweepPolicy::Strict` moves `Created` payloads to `Error`. Running the
    /// sweep again changes nothing.
    pub fn complete<C: Checksum>(&mut self, checksum: C, policy: SweepPolicy) -> SweepSummary {
        if self.sweeps > 0 {
            warn!("verification sweep repeated ({} before)", self.sweeps);
        }
        self.sweeps += 1;

        let mut summary = SweepSummary::default();
        for (tag, region) in self.iter_mut() {
            match region.status.state {
                ImageState::None if region.is_lazy() => summary.absent += 1,
                ImageState::None => summary.missing += 1,
                ImageState::Created => match policy {
                    SweepPolicy::Lenient => {
                        warn!("{}: never finished", tag);
                        summary.pending += 1;
                    }
                    SweepPolicy::Strict => {
                        warn!("{}: never finished, marking failed", tag);
                        region.status.state = ImageState::Error;
                        summary.abandoned += 1;
                    }
                },
                ImageState::Completed if region.wants_verify() => {
                    let actual = checksum.checksum(region.view());
                    if actual == region.status.checksum {
                        debug!("{}: checksum {:08x} ok", tag, actual);
                        summary.verified += 1;
                    } else {
                        error!(
                            "{}: checksum {:08x}, expected {:08x}",
                            tag, actual, region.status.checksum
                        );
                        region.status.state = ImageState::CrcError;
                        summary.corrupt += 1;
                    }
                }
                ImageState::Completed => summary.verified += 1,
                ImageState::CrcError => summary.corrupt += 1,
                ImageState::Overflow | ImageState::Error => summary.failed += 1,
            }
        }

        info!("verification sweep: {:?}", summary);
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::images::layout::{DEFAULT_LAYOUT, VERIFIED_LAYOUT};
    use crate::images::region::RuntimeAttrs;
    use crate::images::tag::{ImageTag, MAX_TAG};
    use crate::images::testutil::FakeRam;
    use crate::memory::{Length, PhysAddress};

    use test_log::test;

    fn states(registry: &ImageRegistry) -> std::vec::Vec<ImageState> {
        registry.iter().map(|(_, r)| r.state()).collect()
    }

    /// Describes and populates `tag` from `payload`, with `checksum` as the
    /// header's claim.
    fn stage(
        registry: &mut ImageRegistry,
        ram: &mut FakeRam,
        tag: ImageTag,
        payload: &[u8],
        checksum: u32,
        attrs: RuntimeAttrs,
    ) {
        let size = Length::from_raw(payload.len() as u64);
        registry.create(tag, size, checksum, attrs).unwrap();
        ram.feed(tag, payload);
        let dest = ram.bank(tag);
        registry.unpack(tag, dest, &mut *ram).unwrap();
    }

    #[test]
    fn matching_checksum_stays_completed() {
        let mut ram = FakeRam::new(&VERIFIED_LAYOUT);
        let mut registry = ImageRegistry::new(VERIFIED_LAYOUT);
        let payload = FakeRam::pattern(4000, 1);
        stage(
            &mut registry,
            &mut ram,
            ImageTag::FlatTree,
            &payload,
            FakeRam::crc(&payload),
            RuntimeAttrs::empty(),
        );

        let summary = registry.complete(&ram, SweepPolicy::Lenient);
        assert_eq!(summary.verified, 1);
        assert_eq!(summary.corrupt, 0);
        assert_eq!(
            registry.region(ImageTag::FlatTree).unwrap().state(),
            ImageState::Completed
        );
    }

    #[test]
    fn corrupted_payload_becomes_crc_error() {
        let mut ram = FakeRam::new(&VERIFIED_LAYOUT);
        let mut registry = ImageRegistry::new(VERIFIED_LAYOUT);
        let payload = FakeRam::pattern(4000, 2);
        stage(
            &mut registry,
            &mut ram,
            ImageTag::Linux,
            &payload,
            FakeRam::crc(&payload),
            RuntimeAttrs::empty(),
        );
        ram.corrupt(PhysAddress::from_raw(0x9000_8000 + 17));

        let summary = registry.complete(&ram, SweepPolicy::Lenient);
        assert_eq!(summary.corrupt, 1);
        assert!(!summary.is_bootable());
        assert_eq!(
            registry.region(ImageTag::Linux).unwrap().state(),
            ImageState::CrcError
        );
        assert_eq!(registry.find(ImageTag::Linux), Err(crate::images::ImageError::NotReady));
        assert_eq!(
            registry.check(ImageTag::Linux),
            Err(crate::images::ImageError::CrcError)
        );
    }

    #[test]
    fn runtime_verify_flag_enables_check() {
        let mut ram = FakeRam::new(&DEFAULT_LAYOUT);
        let mut registry = ImageRegistry::with_default_layout();
        let payload = FakeRam::pattern(64, 3);

        // Wrong checksum, but nobody asked to verify.
        stage(
            &mut registry,
            &mut ram,
            ImageTag::UsbFirmware,
            &payload,
            0,
            RuntimeAttrs::empty(),
        );
        // Wrong checksum, and this instance asks to be verified.
        stage(
            &mut registry,
            &mut ram,
            ImageTag::BpLoader,
            &payload,
            0,
            RuntimeAttrs::VERIFY,
        );

        let summary = registry.complete(&ram, SweepPolicy::Lenient);
        assert_eq!(summary.verified, 1);
        assert_eq!(summary.corrupt, 1);
        assert_eq!(
            registry.region(ImageTag::UsbFirmware).unwrap().state(),
            ImageState::Completed
        );
        assert_eq!(
            registry.region(ImageTag::BpLoader).unwrap().state(),
            ImageState::CrcError
        );
    }

    #[test]
    fn lazy_absence_is_not_missing() {
        let mut registry = ImageRegistry::with_default_layout();
        let summary = registry.complete(&FakeRam::new(&DEFAULT_LAYOUT), SweepPolicy::Strict);

        assert_eq!(summary.absent, 1);
        assert_eq!(summary.missing, MAX_TAG as usize - 1);
        assert!(!summary.is_bootable());
        assert!(states(&registry).iter().all(|&s| s == ImageState::None));
    }

    #[test]
    fn refused_header_leaves_payload_missing() {
        let mut registry = ImageRegistry::with_default_layout();
        assert_eq!(
            registry.create(ImageTag::Cmdline, Length::from_raw(2048), 0, RuntimeAttrs::empty()),
            Err(crate::images::ImageError::Overflow)
        );

        let summary = registry.complete(&FakeRam::new(&DEFAULT_LAYOUT), SweepPolicy::Strict);
        assert_eq!(summary.missing, MAX_TAG as usize - 1);
        assert!(!summary.is_bootable());
    }

    #[test]
    fn only_lazy_payloads_may_be_absent() {
        let mut ram = FakeRam::new(&DEFAULT_LAYOUT);
        let mut registry = ImageRegistry::with_default_layout();
        let payload = FakeRam::pattern(32, 7);
        for tag in ImageTag::ALL {
            if !registry.region(tag).unwrap().is_lazy() {
                stage(&mut registry, &mut ram, tag, &payload, 0, RuntimeAttrs::empty());
            }
        }

        let summary = registry.complete(&ram, SweepPolicy::Strict);
        assert_eq!(summary.absent, 1);
        assert_eq!(summary.missing, 0);
        assert_eq!(summary.verified, MAX_TAG as usize - 1);
        assert!(summary.is_bootable());
        assert_eq!(
            registry.region(ImageTag::BpFirmware).unwrap().state(),
            ImageState::None
        );
    }

    #[test]
    fn lenient_sweep_leaves_created_alone() {
        let mut registry = ImageRegistry::with_default_layout();
        registry
            .create(ImageTag::Initramfs, Length::kib(4), 0, RuntimeAttrs::empty())
            .unwrap();

        let summary = registry.complete(&FakeRam::new(&DEFAULT_LAYOUT), SweepPolicy::Lenient);
        assert_eq!(summary.pending, 1);
        assert!(!summary.is_bootable());
        assert_eq!(
            registry.region(ImageTag::Initramfs).unwrap().state(),
            ImageState::Created
        );
    }

    #[test]
    fn strict_sweep_fails_created() {
        let mut registry = ImageRegistry::with_default_layout();
        registry
            .create(ImageTag::Initramfs, Length::kib(4), 0, RuntimeAttrs::empty())
            .unwrap();

        let summary = registry.complete(&FakeRam::new(&DEFAULT_LAYOUT), SweepPolicy::Strict);
        assert_eq!(summary.abandoned, 1);
        assert_eq!(
            registry.region(ImageTag::Initramfs).unwrap().state(),
            ImageState::Error
        );

        // The next sweep sees an ordinary failure.
        let again = registry.complete(&FakeRam::new(&DEFAULT_LAYOUT), SweepPolicy::Strict);
        assert_eq!(again.abandoned, 0);
        assert_eq!(again.failed, 1);
    }

    #[test]
    fn failed_entries_are_left_alone() {
        let mut registry = ImageRegistry::with_default_layout();
        registry.region_mut(ImageTag::Linux).unwrap().status.state = ImageState::Overflow;
        registry.region_mut(ImageTag::Cmdline).unwrap().status.state = ImageState::Error;

        let summary = registry.complete(&FakeRam::new(&DEFAULT_LAYOUT), SweepPolicy::Strict);
        assert_eq!(summary.failed, 2);
        assert_eq!(
            registry.region(ImageTag::Linux).unwrap().state(),
            ImageState::Overflow
        );
        assert_eq!(
            registry.region(ImageTag::Cmdline).unwrap().state(),
            ImageState::Error
        );
    }

    #[test]
    fn sweep_is_idempotent() {
        let mut ram = FakeRam::new(&VERIFIED_LAYOUT);
        let mut registry = ImageRegistry::new(VERIFIED_LAYOUT);

        let good = FakeRam::pattern(300, 4);
        let good_crc = FakeRam::crc(&good);
        stage(&mut registry, &mut ram, ImageTag::Linux, &good, good_crc, RuntimeAttrs::empty());
        let bad = FakeRam::pattern(200, 5);
        let bad_crc = FakeRam::crc(&bad) ^ 1;
        stage(&mut registry, &mut ram, ImageTag::Cmdline, &bad, bad_crc, RuntimeAttrs::empty());
        registry
            .create(ImageTag::Initramfs, Length::kib(1), 0, RuntimeAttrs::empty())
            .unwrap();

        for policy in [SweepPolicy::Lenient, SweepPolicy::Strict] {
            let mut once = registry.clone();
            once.complete(&ram, policy);
            let mut twice = once.clone();
            twice.complete(&ram, policy);
            assert_eq!(states(&once), states(&twice), "{:?}", policy);
        }
    }

    #[test]
    fn summary_buckets_cover_every_tag() {
        let mut ram = FakeRam::new(&DEFAULT_LAYOUT);
        let mut registry = ImageRegistry::with_default_layout();
        let payload = FakeRam::pattern(10, 6);
        stage(&mut registry, &mut ram, ImageTag::Linux, &payload, 0, RuntimeAttrs::empty());
        registry
            .create(ImageTag::FlatTree, Length::from_raw(10), 0, RuntimeAttrs::empty())
            .unwrap();

        let s = registry.complete(&ram, SweepPolicy::Lenient);
        assert_eq!(
            s.verified + s.corrupt + s.pending + s.abandoned + s.missing + s.absent + s.failed,
            MAX_TAG as usize
        );
    }

    #[test]
    fn strict_is_default_only_with_feature() {
        let expected = if cfg!(feature = "strict") {
            SweepPolicy::Strict
        } else {
            SweepPolicy::Lenient
        };
        assert_eq!(SweepPolicy::default(), expected);
    }
}
