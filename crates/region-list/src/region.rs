//! Partitioning of caller-supplied memory.

use core::mem;

use snafu::{Snafu, ensure};
use snafu_utils::{Located, Location};
use tls_error::{Classify, ErrorSource, LocalReason, ReportExt as _};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum RegionError {
    #[snafu(display(
        "region exhausted: {requested} bytes aligned to {align} requested, {remaining} remaining"
    ))]
    Exhausted {
        requested: usize,
        align: usize,
        remaining: usize,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("alignment {align} is not a power of two"))]
    InvalidAlign {
        align: usize,
        #[snafu(implicit)]
        location: Location,
    },
}

impl Located for RegionError {
    fn location(&self) -> Location {
        match self {
            Self::Exhausted { location, .. } | Self::InvalidAlign { location, .. } => *location,
        }
    }
}

impl Classify for RegionError {
    fn classify(&self) -> (ErrorSource, i32) {
        let reason = match self {
            Self::Exhausted { .. } => LocalReason::OutOfMemory,
            Self::InvalidAlign { .. } => LocalReason::InvalidArgument,
        };
        (ErrorSource::Library, reason.into())
    }
}

/// A span of caller-owned memory that is handed out in disjoint pieces.
///
/// Every piece returned by [`carve`](Self::carve) is an exclusive borrow of
/// the span it was created from, so two structures built on one region can never
/// overlap. Nothing is ever returned to the region; the whole span becomes
/// available to the caller again once the region and all pieces are dropped.
#[derive(Debug)]
pub struct Region<'m> {
    bytes: &'m mut [u8],
    capacity: usize,
}

impl<'m> Region<'m> {
    pub fn new(bytes: &'m mut [u8]) -> Self {
        let capacity = bytes.len();
        Self { bytes, capacity }
    }

    /// Size of the span the region was created from.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes not yet carved out, including any alignment padding a future
    /// carve may consume.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Splits off `size` bytes starting at the next multiple of `align`.
    ///
    /// On failure the region is left unchanged and the error is recorded in
    /// the calling thread's error context.
    #[track_caller]
    pub fn carve(&mut self, size: usize, align: usize) -> Result<&'m mut [u8], RegionError> {
        self.try_carve(size, align).reported()
    }

    #[track_caller]
    pub(crate) fn try_carve(
        &mut self,
        size: usize,
        align: usize,
    ) -> Result<&'m mut [u8], RegionError> {
        ensure!(align.is_power_of_two(), InvalidAlignSnafu { align });

        let remaining = self.bytes.len();
        let padding = self.bytes.as_ptr().align_offset(align);
        let fits = padding
            .checked_add(size)
            .is_some_and(|needed| needed <= remaining);
        ensure!(
            fits,
            ExhaustedSnafu {
                requested: size,
                align,
                remaining,
            }
        );

        let bytes = mem::take(&mut self.bytes);
        let (_padding, rest) = bytes.split_at_mut(padding);
        let (piece, rest) = rest.split_at_mut(size);
        self.bytes = rest;
        Ok(piece)
    }
}

#[cfg(test)]
mod tests {
    use dataview::PodMethods as _;
    use tls_error::context;

    use super::*;

    fn bind() {
        let buffer = Box::leak(vec![0; context::required_size()].into_boxed_slice());
        context::init(buffer).unwrap();
    }

    #[test]
    fn test_carve_disjoint_pieces() {
        let mut backing = [0_u64; 4];
        let mut region = Region::new(backing.as_bytes_mut());
        assert_eq!(region.capacity(), 32);

        let a = region.carve(8, 8).unwrap();
        let b = region.carve(16, 8).unwrap();
        a.fill(0x11);
        b.fill(0x22);
        assert_eq!(region.remaining(), 8);
        assert!(a.iter().all(|&x| x == 0x11));
        assert!(b.iter().all(|&x| x == 0x22));
        assert_eq!(a.as_ptr().wrapping_add(8), b.as_ptr());
    }

    #[test]
    fn test_carve_skips_padding() {
        let mut backing = [0_u64; 4];
        let mut region = Region::new(backing.as_bytes_mut());

        let byte = region.carve(1, 1).unwrap();
        assert_eq!(byte.len(), 1);
        let word = region.carve(8, 8).unwrap();
        assert!(word.as_ptr().cast::<u64>().is_aligned());
        assert_eq!(region.remaining(), 16);
    }

    #[test]
    fn test_carve_exact_fit_exhausts() {
        let mut backing = [0_u64; 2];
        let mut region = Region::new(backing.as_bytes_mut());
        region.carve(16, 8).unwrap();
        assert!(region.is_exhausted());
        assert!(region.carve(0, 1).unwrap().is_empty());
    }

    #[test]
    fn test_carve_too_large_fails() {
        bind();
        let mut backing = [0_u64; 2];
        let mut region = Region::new(backing.as_bytes_mut());

        let err = region.carve(17, 1).unwrap_err();
        assert!(matches!(
            err,
            RegionError::Exhausted {
                requested: 17,
                remaining: 16,
                ..
            }
        ));
        assert_eq!(region.remaining(), 16);
        assert!(context::test(ErrorSource::Library, LocalReason::OutOfMemory));

        region.carve(usize::MAX, 1).unwrap_err();
        assert_eq!(region.remaining(), 16);
    }

    #[test]
    fn test_carve_rejects_bad_alignment() {
        bind();
        let mut backing = [0_u64; 2];
        let mut region = Region::new(backing.as_bytes_mut());

        assert!(matches!(
            region.carve(4, 3),
            Err(RegionError::InvalidAlign { align: 3, .. })
        ));
        assert!(matches!(
            region.carve(4, 0),
            Err(RegionError::InvalidAlign { align: 0, .. })
        ));
        assert!(context::test(
            ErrorSource::Library,
            LocalReason::InvalidArgument
        ));
        assert_eq!(region.remaining(), 16);
    }

    #[test]
    fn test_carve_failure_location_is_caller() {
        bind();
        let mut backing = [0_u64; 1];
        let mut region = Region::new(backing.as_bytes_mut());
        let line = line!() + 1;
        let err = region.carve(9, 1).unwrap_err();
        assert_eq!(err.location().line(), line);
        let record = context::get().unwrap();
        assert_eq!((record.file(), record.line()), (file!(), line));
    }
}
