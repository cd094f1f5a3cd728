//! Fixed-capacity sequence stored in a [`Region`].
//!
//! A [`List`] owns `capacity` element slots carved out of a region when it is
//! created. It never grows, never allocates, and never drops its elements:
//! element types are [`Pod`], so a slot is just bytes and a fresh slot is
//! all-zero.
//!
//! Alongside the usual indexed and iterator access the list carries a single
//! embedded cursor (`iter_begin`, `iter_current`, `iter_advance`). Any
//! structural mutation resets the cursor, so a position can never outlive the
//! layout it refers to.

use core::{fmt, mem, ops, slice};

use dataview::{DataView, Pod, PodMethods as _};
use snafu::{IntoError as _, OptionExt as _, Snafu, ensure};
use snafu_utils::{Located, Location};
use tls_error::{Classify, ErrorSource, LocalReason, ReportExt as _};

use crate::region::{Region, RegionError};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ListError {
    #[snafu(display("zero-sized element types cannot be stored"))]
    ZeroSizedElement {
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("storage for {capacity} elements overflows usize"))]
    SizeOverflow {
        capacity: usize,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("region too small for {capacity} elements"))]
    RegionTooSmall {
        capacity: usize,
        #[snafu(implicit)]
        location: Location,
        source: RegionError,
    },
    #[snafu(display("carved storage is misaligned for the element type"))]
    Misaligned {
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("list is full ({capacity} elements)"))]
    Full {
        capacity: usize,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("index {index} out of bounds for length {len}"))]
    IndexOutOfBounds {
        index: usize,
        len: usize,
        #[snafu(implicit)]
        location: Location,
    },
}

impl Located for ListError {
    fn location(&self) -> Location {
        match self {
            Self::ZeroSizedElement { location }
            | Self::SizeOverflow { location, .. }
            | Self::RegionTooSmall { location, .. }
            | Self::Misaligned { location }
            | Self::Full { location, .. }
            | Self::IndexOutOfBounds { location, .. } => *location,
        }
    }

    fn located_source(&self) -> Option<&dyn Located> {
        match self {
            Self::RegionTooSmall { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl Classify for ListError {
    fn classify(&self) -> (ErrorSource, i32) {
        let reason = match self {
            Self::ZeroSizedElement { .. }
            | Self::SizeOverflow { .. }
            | Self::RegionTooSmall { .. }
            | Self::Misaligned { .. } => LocalReason::InvalidArgument,
            Self::Full { .. } | Self::IndexOutOfBounds { .. } => LocalReason::OutOfBounds,
        };
        (ErrorSource::Library, reason.into())
    }
}

/// The end of a [`List`] an element is pushed to or popped from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum End {
    Front,
    Back,
}

pub struct List<'m, T> {
    slots: &'m mut [T],
    len: usize,
    cursor: Option<usize>,
}

impl<'m, T> List<'m, T>
where
    T: Pod,
{
    /// Number of region bytes needed for `capacity` elements, excluding
    /// alignment padding.
    ///
    /// Returns `None` if the size overflows `usize`.
    #[must_use]
    pub const fn region_size(capacity: usize) -> Option<usize> {
        mem::size_of::<T>().checked_mul(capacity)
    }

    /// Creates an empty list with room for `capacity` elements.
    ///
    /// The storage is carved from `region`, aligned for `T`. Fails with an
    /// invalid-argument error if `T` is zero-sized or the region cannot hold
    /// `capacity` elements; the region is unchanged in that case. A list of
    /// capacity zero takes nothing from the region.
    #[track_caller]
    pub fn new(region: &mut Region<'m>, capacity: usize) -> Result<Self, ListError> {
        Self::try_new(region, capacity).reported()
    }

    #[track_caller]
    fn try_new(region: &mut Region<'m>, capacity: usize) -> Result<Self, ListError> {
        ensure!(mem::size_of::<T>() != 0, ZeroSizedElementSnafu);
        let size = Self::region_size(capacity).context(SizeOverflowSnafu { capacity })?;
        if capacity == 0 {
            return Ok(Self {
                slots: &mut [],
                len: 0,
                cursor: None,
            });
        }
        let bytes = match region.try_carve(size, mem::align_of::<T>()) {
            Ok(bytes) => bytes,
            Err(source) => return Err(RegionTooSmallSnafu { capacity }.into_error(source)),
        };
        let slots = DataView::from_mut(bytes)
            .try_slice_mut::<T>(0, capacity)
            .context(MisalignedSnafu)?;
        tls_error::trace!(
            "list of {capacity} x {} bytes at {:p}",
            mem::size_of::<T>(),
            slots.as_ptr()
        );
        Ok(Self {
            slots,
            len: 0,
            cursor: None,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.as_slice().get(index)
    }

    #[must_use]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.as_mut_slice().get_mut(index)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.slots[..self.len]
    }

    #[must_use]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.slots[..self.len]
    }

    pub fn iter(&self) -> slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    pub fn iter_mut(&mut self) -> slice::IterMut<'_, T> {
        self.as_mut_slice().iter_mut()
    }

    /// Inserts a zero-filled element at `end` and returns it for the caller
    /// to populate.
    ///
    /// Pushing to the front shifts every existing element up by one.
    #[track_caller]
    pub fn push(&mut self, end: End) -> Result<&mut T, ListError> {
        self.cursor = None;
        self.check_vacancy().reported()?;

        let index = self.len;
        self.len += 1;
        let index = match end {
            End::Back => index,
            End::Front => {
                self.slots[..self.len].rotate_right(1);
                0
            }
        };
        let slot = &mut self.slots[index];
        *slot = T::zeroed();
        Ok(slot)
    }

    #[track_caller]
    pub fn push_back(&mut self) -> Result<&mut T, ListError> {
        self.push(End::Back)
    }

    #[track_caller]
    pub fn push_front(&mut self) -> Result<&mut T, ListError> {
        self.push(End::Front)
    }

    /// Removes the element at `end`; does nothing if the list is empty.
    ///
    /// Popping from the front shifts every remaining element down by one.
    pub fn pop(&mut self, end: End) {
        self.cursor = None;
        if self.len == 0 {
            return;
        }
        if end == End::Front {
            self.slots[..self.len].rotate_left(1);
        }
        self.len -= 1;
    }

    pub fn pop_back(&mut self) {
        self.pop(End::Back);
    }

    pub fn pop_front(&mut self) {
        self.pop(End::Front);
    }

    /// Exchanges the elements at `i` and `j`.
    #[track_caller]
    pub fn swap(&mut self, i: usize, j: usize) -> Result<(), ListError> {
        self.cursor = None;
        self.check_index(i).reported()?;
        self.check_index(j).reported()?;
        self.slots.swap(i, j);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.cursor = None;
        self.len = 0;
    }

    /// Places the cursor on the first element and returns it.
    ///
    /// On an empty list the cursor is placed past the end and `None` is
    /// returned.
    pub fn iter_begin(&mut self) -> Option<&mut T> {
        self.cursor = Some(0);
        self.as_mut_slice().first_mut()
    }

    /// Element under the cursor.
    ///
    /// `None` if the cursor was never placed, was reset by a mutation, or has
    /// moved past the last element.
    #[must_use]
    pub fn iter_current(&self) -> Option<&T> {
        self.cursor.and_then(|index| self.get(index))
    }

    #[must_use]
    pub fn iter_current_mut(&mut self) -> Option<&mut T> {
        self.cursor.and_then(|index| self.get_mut(index))
    }

    /// Moves the cursor one position forward.
    ///
    /// Returns `true` if the cursor now rests on an element. Advancing from
    /// the last element moves the cursor past the end and returns `false`;
    /// further calls leave it there.
    pub fn iter_advance(&mut self) -> bool {
        let Some(index) = self.cursor else {
            return false;
        };
        if index >= self.len {
            return false;
        }
        let next = index + 1;
        self.cursor = Some(next);
        next < self.len
    }

    #[track_caller]
    fn check_vacancy(&self) -> Result<(), ListError> {
        let capacity = self.capacity();
        ensure!(self.len < capacity, FullSnafu { capacity });
        Ok(())
    }

    #[track_caller]
    fn check_index(&self, index: usize) -> Result<(), ListError> {
        let len = self.len;
        ensure!(index < len, IndexOutOfBoundsSnafu { index, len });
        Ok(())
    }
}

impl<T> ops::Index<usize> for List<'_, T>
where
    T: Pod,
{
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        &self.as_slice()[index]
    }
}

impl<T> ops::IndexMut<usize> for List<'_, T>
where
    T: Pod,
{
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.as_mut_slice()[index]
    }
}

impl<'a, T> IntoIterator for &'a List<'_, T>
where
    T: Pod,
{
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T> IntoIterator for &'a mut List<'_, T>
where
    T: Pod,
{
    type Item = &'a mut T;
    type IntoIter = slice::IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<T> fmt::Debug for List<'_, T>
where
    T: Pod + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
