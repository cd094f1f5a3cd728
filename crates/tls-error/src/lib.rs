//! Error reporting substrate for an allocation-free TLS stack.
//!
//! Failures are not propagated as rich objects through the protocol layers.
//! Instead every layer records the failure in a single, thread-scoped slot
//! (the [error context](context)) and returns a plain `Err`. Callers at the
//! top inspect the slot with [`context::get`] or assert on it with
//! [`context::test`].
//!
//! A recorded error is the 4-tuple `(source, reason, file, line)`. The
//! meaning of the numeric reason depends on the [`ErrorSource`]; see the
//! [`taxonomy`] module for the TLS alert values and the library-local
//! reasons.
//!
//! The context lives in memory supplied by the caller, sized with
//! [`context::required_size`]; nothing here allocates.
//!
//! # Example
//!
//! ```
//! use tls_error::{Alert, ErrorSource, LocalReason, context};
//!
//! let buffer = Box::leak(vec![0; context::required_size()].into_boxed_slice());
//! context::init(buffer).unwrap();
//!
//! context::report_local(LocalReason::LengthMismatch);
//!
//! let record = context::get().unwrap();
//! assert_eq!(record.source(), ErrorSource::Library);
//! assert_eq!(record.alert_to_send(), Some(Alert::DecodeError));
//! assert!(context::test(ErrorSource::Library, LocalReason::LengthMismatch));
//!
//! context::cleanup().unwrap();
//! ```

pub mod context;
pub mod log;
mod report;
pub mod taxonomy;

pub use self::{
    context::{ContextError, ErrorRecord, InitError},
    report::{Classify, ReportExt, report_error},
    taxonomy::{Alert, AlertLevel, ErrorSource, LocalReason, Reason},
};
