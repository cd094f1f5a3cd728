//! The thread-scoped error context.
//!
//! Each thread may bind one caller-supplied buffer with [`init`]. While bound,
//! every [`report`] overwrites the single error record stored in that buffer;
//! there is no stacking, the last report wins. [`get`] and [`test`] inspect
//! the record, and [`cleanup`] unbinds the buffer and hands it back.
//!
//! ```
//! use tls_error::{ErrorSource, context};
//!
//! let buffer = Box::leak(vec![0; context::required_size()].into_boxed_slice());
//! context::init(buffer).unwrap();
//!
//! context::report_at(ErrorSource::Crypto, 0x10, "handshake.c", 42);
//! assert!(context::test(ErrorSource::Crypto, 0x10));
//! assert!(!context::test(ErrorSource::Platform, 0x10));
//!
//! let buffer = context::cleanup().unwrap();
//! assert_eq!(buffer.len(), context::required_size());
//! assert!(context::get().is_err());
//! ```

use core::{cell::RefCell, fmt, ptr, slice, str};

use dataview::{DataView, Pod, PodMethods as _};
use snafu::{IntoError as _, OptionExt as _, Snafu, ensure};
use snafu_utils::{Located, Location};

use crate::{
    report::Classify,
    taxonomy::{Alert, ErrorSource, LocalReason, Reason},
};

/// Errors from the error context itself.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ContextError {
    #[snafu(display("error context is not initialized on this thread"))]
    NotInitialized {
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("error context is already initialized on this thread"))]
    AlreadyInitialized {
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("error context buffer too small: {len} < {required} bytes"))]
    BufferTooSmall {
        len: usize,
        required: usize,
        #[snafu(implicit)]
        location: Location,
    },
}

impl Located for ContextError {
    fn location(&self) -> Location {
        match self {
            Self::NotInitialized { location }
            | Self::AlreadyInitialized { location }
            | Self::BufferTooSmall { location, .. } => *location,
        }
    }
}

impl Classify for ContextError {
    fn classify(&self) -> (ErrorSource, i32) {
        let reason = match self {
            Self::NotInitialized { .. } | Self::AlreadyInitialized { .. } => {
                LocalReason::InvalidState
            }
            Self::BufferTooSmall { .. } => LocalReason::InvalidArgument,
        };
        (ErrorSource::Library, reason.into())
    }
}

/// A rejected [`init`]; the buffer is handed back untouched.
#[derive(Debug, Snafu)]
#[snafu(display("failed to bind error context: {source}"))]
pub struct InitError {
    #[snafu(source)]
    source: ContextError,
    buffer: &'static mut [u8],
}

impl InitError {
    #[must_use]
    pub fn error(&self) -> &ContextError {
        &self.source
    }

    #[must_use]
    pub fn into_buffer(self) -> &'static mut [u8] {
        self.buffer
    }
}

/// The most recently reported error: `(source, reason, file, line)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorRecord {
    source: ErrorSource,
    reason: i32,
    file: &'static str,
    line: u32,
}

impl ErrorRecord {
    /// Reported when nothing has failed since the last reset: every field is
    /// zero or empty.
    pub const EMPTY: Self = Self {
        source: ErrorSource::Platform,
        reason: 0,
        file: "",
        line: 0,
    };

    #[must_use]
    pub const fn new(source: ErrorSource, reason: i32, file: &'static str, line: u32) -> Self {
        Self {
            source,
            reason,
            file,
            line,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }

    #[must_use]
    pub fn source(&self) -> ErrorSource {
        self.source
    }

    #[must_use]
    pub fn reason(&self) -> i32 {
        self.reason
    }

    #[must_use]
    pub fn file(&self) -> &'static str {
        self.file
    }

    #[must_use]
    pub fn line(&self) -> u32 {
        self.line
    }

    #[must_use]
    pub fn decoded_reason(&self) -> Reason {
        Reason::decode(self.source, self.reason)
    }

    #[must_use]
    pub fn matches(&self, source: ErrorSource, reason: i32) -> bool {
        self.source == source && self.reason == reason
    }

    /// Alert to send to the peer for this error, if connected.
    ///
    /// Alerts received from the peer are never echoed back. Platform and
    /// crypto library failures are local faults and map to `internal_error`.
    #[must_use]
    pub fn alert_to_send(&self) -> Option<Alert> {
        if self.is_empty() {
            return None;
        }
        match self.source {
            ErrorSource::Peer => None,
            ErrorSource::Platform | ErrorSource::Crypto => Some(Alert::InternalError),
            ErrorSource::Library => match self.decoded_reason() {
                Reason::Alert(alert) => Some(alert),
                Reason::Local(local) => local.alert(),
                Reason::Opaque(_) => Some(Alert::InternalError),
            },
        }
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("no error");
        }
        write!(
            f,
            "{} error {} at {}:{}",
            self.source,
            self.decoded_reason(),
            self.file,
            self.line
        )
    }
}

/// Layout of the record inside the bound buffer.
///
/// The file name is kept as the address and length of a `&'static str`.
#[derive(Debug, Clone, Copy, Pod)]
#[repr(C)]
struct RawRecord {
    present: u32,
    source: u32,
    reason: i32,
    line: u32,
    file_addr: usize,
    file_len: usize,
}

impl RawRecord {
    fn encode(record: &ErrorRecord) -> Self {
        Self {
            present: 1,
            source: record.source.code(),
            reason: record.reason,
            line: record.line,
            file_addr: record.file.as_ptr().expose_provenance(),
            file_len: record.file.len(),
        }
    }

    fn decode(&self) -> ErrorRecord {
        if self.present == 0 {
            return ErrorRecord::EMPTY;
        }
        let Some(source) = ErrorSource::from_code(self.source) else {
            return ErrorRecord::EMPTY;
        };
        // SAFETY: records are only written by `encode`, from a live
        // `&'static str`, into a buffer this module holds exclusively.
        let file = unsafe {
            let bytes =
                slice::from_raw_parts(ptr::with_exposed_provenance::<u8>(self.file_addr), self.file_len);
            str::from_utf8_unchecked(bytes)
        };
        ErrorRecord::new(source, self.reason, file, self.line)
    }
}

const _: () = assert!(size_of::<RawRecord>() == 16 + 2 * size_of::<usize>());

std::thread_local! {
    static CONTEXT: RefCell<Option<&'static mut [u8]>> = const { RefCell::new(None) };
}

fn read_record(buffer: &[u8]) -> ErrorRecord {
    DataView::from(buffer)
        .try_read::<RawRecord>(0)
        .map_or(ErrorRecord::EMPTY, |raw| raw.decode())
}

fn write_record(buffer: &mut [u8], record: &ErrorRecord) {
    buffer[..required_size()].copy_from_slice(RawRecord::encode(record).as_bytes());
}

fn zero_record(buffer: &mut [u8]) {
    buffer[..required_size()].fill(0);
}

/// Number of bytes [`init`] needs.
#[must_use]
pub const fn required_size() -> usize {
    size_of::<RawRecord>()
}

/// Returns `true` if this thread has a bound error context.
#[must_use]
pub fn is_initialized() -> bool {
    CONTEXT.with_borrow(Option::is_some)
}

/// Binds `buffer` as this thread's error context.
///
/// Fails if the buffer is shorter than [`required_size`] or if a buffer is
/// already bound; in both cases nothing changes and the buffer is returned
/// inside the error.
#[track_caller]
pub fn init(buffer: &'static mut [u8]) -> Result<(), InitError> {
    if let Err(source) = check_bindable(buffer.len()) {
        return Err(InitSnafu { buffer }.into_error(source));
    }

    zero_record(buffer);
    CONTEXT.with_borrow_mut(|slot| *slot = Some(buffer));
    crate::trace!("error context bound");
    Ok(())
}

#[track_caller]
fn check_bindable(len: usize) -> Result<(), ContextError> {
    ensure!(!is_initialized(), AlreadyInitializedSnafu);
    ensure!(
        len >= required_size(),
        BufferTooSmallSnafu {
            len,
            required: required_size(),
        }
    );
    Ok(())
}

/// Returns the most recent error of this thread.
///
/// If nothing was reported since the context was bound or cleared,
/// [`ErrorRecord::EMPTY`] is returned.
#[track_caller]
pub fn get() -> Result<ErrorRecord, ContextError> {
    CONTEXT
        .with_borrow(|slot| slot.as_deref().map(read_record))
        .context(NotInitializedSnafu)
}

/// Returns `true` if [`get`] would yield exactly `source` and `reason`.
///
/// An unbound context never matches.
pub fn test(source: ErrorSource, reason: impl Into<i32>) -> bool {
    let reason = reason.into();
    CONTEXT.with_borrow(|slot| {
        slot.as_deref()
            .is_some_and(|buffer| read_record(buffer).matches(source, reason))
    })
}

/// Unbinds this thread's error context and returns its buffer.
///
/// The recorded error is erased first. Returns `None` if nothing is bound.
pub fn cleanup() -> Option<&'static mut [u8]> {
    let buffer = CONTEXT.with_borrow_mut(Option::take)?;
    zero_record(buffer);
    crate::trace!("error context released");
    Some(buffer)
}

/// Resets the record to "no error" without unbinding.
pub fn clear() {
    CONTEXT.with_borrow_mut(|slot| {
        if let Some(buffer) = slot.as_deref_mut() {
            zero_record(buffer);
        }
    });
}

/// Records an error, replacing whatever was recorded before.
///
/// Reports made while no context is bound are dropped.
pub fn report_at(source: ErrorSource, reason: impl Into<i32>, file: &'static str, line: u32) {
    let record = ErrorRecord::new(source, reason.into(), file, line);
    let stored = CONTEXT.with_borrow_mut(|slot| {
        slot.as_deref_mut()
            .map(|buffer| write_record(buffer, &record))
            .is_some()
    });
    if stored {
        crate::debug!("recorded {record}");
    } else {
        crate::warn!("dropped {record}: error context is not initialized");
    }
}

/// Records an error at the caller's location.
#[track_caller]
pub fn report(source: ErrorSource, reason: impl Into<i32>) {
    let location = Location::caller();
    report_at(source, reason, location.file(), location.line());
}

/// Records a library error carrying a TLS alert.
#[track_caller]
pub fn report_alert(alert: Alert) {
    report(ErrorSource::Library, alert);
}

/// Records a library-local error.
#[track_caller]
pub fn report_local(reason: LocalReason) {
    report(ErrorSource::Library, reason);
}
