//! Bridging typed errors into the error context.
//!
//! Every fallible operation in this workspace returns a `snafu` error that
//! implements [`Classify`] and [`Located`]. [`ReportExt::reported`] records
//! such an error in the calling thread's context before it is propagated, so
//! an `Err` return always comes with a populated context.

use core::error::Error;

use snafu_utils::{Located, Report};

use crate::{context, taxonomy::ErrorSource};

/// Maps an error value onto the `(source, reason)` pair stored in the
/// error context.
pub trait Classify {
    fn classify(&self) -> (ErrorSource, i32);
}

impl<E> Classify for &E
where
    E: Classify + ?Sized,
{
    fn classify(&self) -> (ErrorSource, i32) {
        (**self).classify()
    }
}

/// Records `error` in the error context at the location it was raised.
pub fn report_error<E>(error: &E)
where
    E: Error + Classify + Located,
{
    let (source, reason) = error.classify();
    let location = error.location();
    crate::trace!("{}", Report::new(error));
    context::report_at(source, reason, location.file(), location.line());
}

pub trait ReportExt {
    /// Records the error, if any, and returns `self` unchanged.
    #[must_use]
    fn reported(self) -> Self;
}

impl<T, E> ReportExt for Result<T, E>
where
    E: Error + Classify + Located,
{
    fn reported(self) -> Self {
        if let Err(error) = &self {
            report_error(error);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use snafu::{Snafu, ensure};
    use snafu_utils::Location;

    use super::*;
    use crate::{Alert, LocalReason};

    #[derive(Debug, Snafu)]
    enum DecodeError {
        #[snafu(display("length field disagrees with payload"))]
        Mismatch {
            #[snafu(implicit)]
            location: Location,
        },
        #[snafu(display("unknown message type {ty}"))]
        UnknownType {
            ty: u8,
            #[snafu(implicit)]
            location: Location,
        },
    }

    impl Located for DecodeError {
        fn location(&self) -> Location {
            match self {
                Self::Mismatch { location } | Self::UnknownType { location, .. } => *location,
            }
        }
    }

    impl Classify for DecodeError {
        fn classify(&self) -> (ErrorSource, i32) {
            match self {
                Self::Mismatch { .. } => (ErrorSource::Library, LocalReason::LengthMismatch.into()),
                Self::UnknownType { .. } => (ErrorSource::Library, Alert::UnexpectedMessage.into()),
            }
        }
    }

    fn decode(len: usize, ty: u8) -> Result<(), DecodeError> {
        ensure!(len == 4, MismatchSnafu);
        ensure!(ty == 1, UnknownTypeSnafu { ty });
        Ok(())
    }

    fn bind() {
        let buffer = Box::leak(vec![0; context::required_size()].into_boxed_slice());
        context::init(buffer).unwrap();
    }

    #[test]
    fn test_reported_records_error_location() {
        bind();
        let err = decode(3, 1).reported().unwrap_err();
        assert!(context::test(
            ErrorSource::Library,
            LocalReason::LengthMismatch
        ));
        let record = context::get().unwrap();
        assert_eq!(record.file(), err.location().file());
        assert_eq!(record.line(), err.location().line());
    }

    #[test]
    fn test_reported_leaves_ok_untouched() {
        bind();
        context::report_alert(Alert::DecodeError);
        decode(4, 1).reported().unwrap();
        assert!(context::test(ErrorSource::Library, Alert::DecodeError));
    }

    #[test]
    fn test_outermost_report_is_visible() {
        bind();
        let inner = decode(4, 9).reported().unwrap_err();
        assert!(context::test(
            ErrorSource::Library,
            Alert::UnexpectedMessage
        ));

        // A caller unwinding through the failure reports its own
        // classification, hiding the root cause.
        context::report_local(LocalReason::InvalidState);
        assert!(context::test(ErrorSource::Library, LocalReason::InvalidState));
        assert!(!context::test(
            ErrorSource::Library,
            Alert::UnexpectedMessage
        ));
        assert_eq!(inner.classify().1, i32::from(Alert::UnexpectedMessage));
    }
}
