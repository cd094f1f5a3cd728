//! Helpers shared by the `snafu` error types of this workspace.
//!
//! [`Location`] is used as an implicit field so every error remembers the
//! source position it was raised from, and [`Report`] renders an error
//! together with that position and its `source()` chain.

#![cfg_attr(not(test), no_std)]

use core::{error::Error, fmt};

use snafu::GenerateImplicitData;

/// Source position captured with `#[track_caller]`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Location(&'static core::panic::Location<'static>);

impl Default for Location {
    #[track_caller]
    fn default() -> Self {
        Self(core::panic::Location::caller())
    }
}

impl GenerateImplicitData for Location {
    #[track_caller]
    fn generate() -> Self {
        Self::default()
    }
}

impl Location {
    /// Returns the location of the caller.
    #[must_use]
    #[track_caller]
    pub fn caller() -> Self {
        Self::default()
    }

    /// Returns the source file name.
    #[must_use]
    pub fn file(&self) -> &'static str {
        self.0.file()
    }

    /// Returns the line number.
    #[must_use]
    pub fn line(&self) -> u32 {
        self.0.line()
    }

    /// Returns the column number.
    #[must_use]
    pub fn column(&self) -> u32 {
        self.0.column()
    }
}

impl fmt::Debug for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Errors that know where they were raised.
pub trait Located {
    fn location(&self) -> Location;

    /// The error's `source()`, if it is also [`Located`].
    fn located_source(&self) -> Option<&dyn Located> {
        None
    }
}

impl<E> Located for &E
where
    E: Located + ?Sized,
{
    fn location(&self) -> Location {
        (**self).location()
    }

    fn located_source(&self) -> Option<&dyn Located> {
        (**self).located_source()
    }
}

/// Multi-line rendering of an error and its causes.
///
/// Each cause reachable through [`Located::located_source`] is printed with
/// its location; the chain continues without locations past the first cause
/// that does not provide one.
pub struct Report<E> {
    error: E,
}

impl<E> fmt::Debug for Report<E>
where
    E: Error + Located,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl<E> fmt::Display for Report<E>
where
    E: Error + Located,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Error: {}", self.error)?;
        writeln!(f, "  at {}", self.error.location())?;
        let mut source = self.error.source();
        if source.is_some() {
            writeln!(f)?;
            writeln!(f, "Caused by:")?;
        }
        let mut located = self.error.located_source();
        let mut index = 0;
        while let Some(s) = source {
            writeln!(f, "{index:4}: {s}")?;
            if let Some(l) = located {
                writeln!(f, "        at {}", l.location())?;
                located = l.located_source();
            }
            source = s.source();
            index += 1;
        }
        Ok(())
    }
}

impl<E> Report<E> {
    pub fn new(error: E) -> Self {
        Self { error }
    }

    pub fn into_inner(self) -> E {
        self.error
    }
}

#[cfg(test)]
mod tests {
    use snafu::{Snafu, ensure};

    use super::*;

    #[derive(Debug, Snafu)]
    enum Inner {
        #[snafu(display("inner failure"))]
        Failure {
            #[snafu(implicit)]
            location: Location,
        },
    }

    #[derive(Debug, Snafu)]
    enum Outer {
        #[snafu(display("outer failure"))]
        Wrapped {
            #[snafu(source)]
            source: Inner,
            #[snafu(implicit)]
            location: Location,
        },
    }

    impl Located for Inner {
        fn location(&self) -> Location {
            match self {
                Self::Failure { location } => *location,
            }
        }
    }

    impl Located for Outer {
        fn location(&self) -> Location {
            match self {
                Self::Wrapped { location, .. } => *location,
            }
        }

        fn located_source(&self) -> Option<&dyn Located> {
            match self {
                Self::Wrapped { source, .. } => Some(source),
            }
        }
    }

    fn fail_inner() -> Result<(), Inner> {
        ensure!(false, FailureSnafu);
        Ok(())
    }

    #[test]
    fn test_location_points_at_caller() {
        let expected_line = line!() + 1;
        let location = Location::caller();
        assert_eq!(location.file(), file!());
        assert_eq!(location.line(), expected_line);
    }

    #[test]
    fn test_implicit_location_is_recorded() {
        let Err(Inner::Failure { location }) = fail_inner() else {
            panic!("expected failure");
        };
        assert_eq!(location.file(), file!());
        assert!(location.line() > 0);
    }

    #[test]
    fn test_report_lists_causes() {
        use snafu::ResultExt as _;

        let err = fail_inner().context(WrappedSnafu).unwrap_err();
        let rendered = Report::new(&err).to_string();
        assert!(rendered.starts_with("Error: outer failure\n"));
        assert!(rendered.contains(&format!("  at {}", err.location())));
        assert!(rendered.contains("Caused by:\n"));
        assert!(rendered.contains("   0: inner failure\n"));
        let Outer::Wrapped { source, .. } = &err;
        let expected = format!("   0: inner failure\n        at {}\n", source.location());
        assert!(rendered.contains(&expected));
    }

    #[test]
    fn test_report_without_located_source() {
        let err = Outer::Wrapped {
            source: fail_inner().unwrap_err(),
            location: Location::caller(),
        };
        let rendered = Report::new(Plain(&err)).to_string();
        assert!(rendered.ends_with("   0: inner failure\n"));
    }

    #[derive(Debug)]
    struct Plain<'a>(&'a Outer);

    impl fmt::Display for Plain<'_> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            fmt::Display::fmt(self.0, f)
        }
    }

    impl Error for Plain<'_> {
        fn source(&self) -> Option<&(dyn Error + 'static)> {
            self.0.source()
        }
    }

    impl Located for Plain<'_> {
        fn location(&self) -> Location {
            self.0.location()
        }
    }

    #[test]
    fn test_report_into_inner() {
        let err = Outer::Wrapped {
            source: fail_inner().unwrap_err(),
            location: Location::caller(),
        };
        let report = Report::new(&err);
        assert_eq!(report.into_inner().location(), err.location());
    }
}
