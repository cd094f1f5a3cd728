//! Error sources, TLS alerts and library-local reasons.
//!
//! A reported error is the pair `(source, reason)`. The reason is a plain
//! `i32` whose meaning depends on the source: the same numeric value may be an
//! `errno` for [`ErrorSource::Platform`] and a TLS alert for
//! [`ErrorSource::Peer`]. [`Reason::decode`] recovers the typed meaning.

use core::fmt;

/// Where an error was generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u32)]
pub enum ErrorSource {
    /// The C library or operating system. The reason is platform specific,
    /// e.g. an `errno` value.
    Platform = 0,
    /// The cryptographic library. The reason is library specific.
    Crypto = 1,
    /// An alert received from the remote peer. The reason is an [`Alert`].
    Peer = 2,
    /// This library. The reason is an [`Alert`] or a [`LocalReason`].
    Library = 3,
}

impl ErrorSource {
    pub const ALL: [Self; 4] = [Self::Platform, Self::Crypto, Self::Peer, Self::Library];

    #[must_use]
    pub const fn code(self) -> u32 {
        self as u32
    }

    #[must_use]
    pub const fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Self::Platform),
            1 => Some(Self::Crypto),
            2 => Some(Self::Peer),
            3 => Some(Self::Library),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Platform => "platform",
            Self::Crypto => "crypto",
            Self::Peer => "peer",
            Self::Library => "library",
        };
        f.write_str(name)
    }
}

/// Severity carried next to an alert on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum AlertLevel {
    Warning = 1,
    Fatal = 2,
}

macro_rules! alerts {
    ($($(#[$attr:meta])* $name:ident = $code:literal => $wire:literal,)+) => {
        /// TLS alert descriptions (RFC 5246, section 7.2).
        ///
        /// These may be received from the peer or generated locally, in which
        /// case the alert is sent to the peer if connected.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[repr(u8)]
        pub enum Alert {
            $($(#[$attr])* $name = $code,)+
        }

        impl Alert {
            pub const ALL: &[Self] = &[$(Self::$name,)+];

            #[must_use]
            pub const fn from_code(code: i32) -> Option<Self> {
                match code {
                    $($code => Some(Self::$name),)+
                    _ => None,
                }
            }

            /// Name of the alert as spelled in the RFC.
            #[must_use]
            pub const fn name(self) -> &'static str {
                match self {
                    $(Self::$name => $wire,)+
                }
            }
        }
    };
}

alerts! {
    /// The sender is closing the connection.
    CloseNotify = 0 => "close_notify",
    /// A message arrived out of order or had an unknown type.
    UnexpectedMessage = 10 => "unexpected_message",
    /// A record failed decryption or MAC verification.
    BadRecordMac = 20 => "bad_record_mac",
    /// A record exceeded the maximum fragment length.
    RecordOverflow = 22 => "record_overflow",
    /// No acceptable set of security parameters could be negotiated.
    HandshakeFailure = 40 => "handshake_failure",
    /// A certificate failed to decode or its signature did not verify.
    BadCertificate = 42 => "bad_certificate",
    UnsupportedCertificate = 43 => "unsupported_certificate",
    CertificateRevoked = 44 => "certificate_revoked",
    CertificateExpired = 45 => "certificate_expired",
    /// Unspecified problem while processing a certificate.
    CertificateUnknown = 46 => "certificate_unknown",
    /// A field was out of range or inconsistent with earlier messages.
    IllegalParameter = 47 => "illegal_parameter",
    /// The chain did not match any trusted certificate.
    UnknownCa = 48 => "unknown_ca",
    /// A message had a bad length or an unrecognized enumerated value.
    DecodeError = 50 => "decode_error",
    /// Key exchange signature or Finished verification failed.
    DecryptError = 51 => "decrypt_error",
    ProtocolVersion = 70 => "protocol_version",
    /// The server requires stronger parameters than are available.
    InsufficientSecurity = 71 => "insufficient_security",
    /// Out of memory or some other local failure.
    InternalError = 80 => "internal_error",
    /// Renegotiation was requested and is not supported.
    NoRenegotiation = 100 => "no_renegotiation",
    /// A duplicate or unrequested extension was received.
    UnsupportedExtension = 110 => "unsupported_extension",
}

impl Alert {
    /// Value of the alert description byte on the wire.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub const fn level(self) -> AlertLevel {
        match self {
            Self::CloseNotify | Self::NoRenegotiation => AlertLevel::Warning,
            _ => AlertLevel::Fatal,
        }
    }

    #[must_use]
    pub const fn is_fatal(self) -> bool {
        matches!(self.level(), AlertLevel::Fatal)
    }
}

impl From<Alert> for i32 {
    fn from(alert: Alert) -> Self {
        Self::from(alert.code())
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// First code that is not a valid alert description.
pub const LOCAL_REASON_BASE: i32 = 256;

/// Reasons generated by the library that are never put on the wire as-is.
///
/// When one of these is detected while connected, [`LocalReason::alert`]
/// names the alert to send instead, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(i32)]
pub enum LocalReason {
    /// The peer sent an alert that could not be understood.
    BadAlert = LOCAL_REASON_BASE,
    /// The peer sent too many empty fragments.
    TooManyEmptyChunks,
    /// The peer sent too many non-fatal alerts.
    TooManyWarnings,
    /// Inner field lengths of a structure disagree with the outer length.
    LengthMismatch,
    /// The transport closed without a close_notify.
    Disconnected,
    /// More memory was needed than was supplied.
    OutOfMemory,
    /// A fixed-size counter overflowed.
    IntegerOverflow,
    /// An internal buffer access was out of range.
    OutOfBounds,
    /// An API call had missing or incorrect arguments.
    InvalidArgument,
    /// An API call was made at the wrong time.
    InvalidState,
    /// The algorithm is known but the crypto library does not provide it.
    UnsupportedAlgorithm,
    /// The configuration leaves no acceptable security parameters.
    NoAvailableOptions,
    /// A resumed read or write was given a different buffer.
    BufferChanged,
    /// An unimplemented path was taken.
    NotImplemented,
}

impl LocalReason {
    pub const ALL: [Self; 14] = [
        Self::BadAlert,
        Self::TooManyEmptyChunks,
        Self::TooManyWarnings,
        Self::LengthMismatch,
        Self::Disconnected,
        Self::OutOfMemory,
        Self::IntegerOverflow,
        Self::OutOfBounds,
        Self::InvalidArgument,
        Self::InvalidState,
        Self::UnsupportedAlgorithm,
        Self::NoAvailableOptions,
        Self::BufferChanged,
        Self::NotImplemented,
    ];

    #[must_use]
    pub const fn code(self) -> i32 {
        self as i32
    }

    #[must_use]
    pub fn from_code(code: i32) -> Option<Self> {
        let index = usize::try_from(code.checked_sub(LOCAL_REASON_BASE)?).ok()?;
        Self::ALL.get(index).copied()
    }

    /// Alert sent to the peer when this condition is detected while
    /// connected.
    ///
    /// `None` for conditions that only concern the calling application, or
    /// where there is no connection left to send on.
    #[must_use]
    pub const fn alert(self) -> Option<Alert> {
        match self {
            Self::TooManyEmptyChunks | Self::TooManyWarnings => Some(Alert::UnexpectedMessage),
            Self::LengthMismatch => Some(Alert::DecodeError),
            Self::OutOfMemory | Self::IntegerOverflow | Self::OutOfBounds | Self::NotImplemented => {
                Some(Alert::InternalError)
            }
            Self::UnsupportedAlgorithm => Some(Alert::HandshakeFailure),
            Self::BadAlert
            | Self::Disconnected
            | Self::InvalidArgument
            | Self::InvalidState
            | Self::NoAvailableOptions
            | Self::BufferChanged => None,
        }
    }
}

impl From<LocalReason> for i32 {
    fn from(reason: LocalReason) -> Self {
        reason.code()
    }
}

impl fmt::Display for LocalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::BadAlert => "unrecognized alert",
            Self::TooManyEmptyChunks => "too many empty fragments",
            Self::TooManyWarnings => "too many warnings",
            Self::LengthMismatch => "nested length mismatch",
            Self::Disconnected => "disconnected without close_notify",
            Self::OutOfMemory => "out of memory",
            Self::IntegerOverflow => "counter overflow",
            Self::OutOfBounds => "out of bounds",
            Self::InvalidArgument => "invalid argument",
            Self::InvalidState => "invalid state",
            Self::UnsupportedAlgorithm => "unsupported algorithm",
            Self::NoAvailableOptions => "no available options",
            Self::BufferChanged => "buffer changed",
            Self::NotImplemented => "not implemented",
        };
        f.write_str(msg)
    }
}

/// Typed view of a reason code, given its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reason {
    Alert(Alert),
    Local(LocalReason),
    /// Platform or crypto library code, or a value outside the taxonomy.
    Opaque(i32),
}

impl Reason {
    #[must_use]
    pub fn decode(source: ErrorSource, code: i32) -> Self {
        match source {
            ErrorSource::Platform | ErrorSource::Crypto => Self::Opaque(code),
            ErrorSource::Peer => Alert::from_code(code).map_or(Self::Opaque(code), Self::Alert),
            ErrorSource::Library => {
                if let Some(alert) = Alert::from_code(code) {
                    Self::Alert(alert)
                } else if let Some(local) = LocalReason::from_code(code) {
                    Self::Local(local)
                } else {
                    Self::Opaque(code)
                }
            }
        }
    }

    #[must_use]
    pub fn code(self) -> i32 {
        match self {
            Self::Alert(alert) => alert.into(),
            Self::Local(local) => local.into(),
            Self::Opaque(code) => code,
        }
    }
}

impl From<Alert> for Reason {
    fn from(alert: Alert) -> Self {
        Self::Alert(alert)
    }
}

impl From<LocalReason> for Reason {
    fn from(reason: LocalReason) -> Self {
        Self::Local(reason)
    }
}

impl From<Reason> for i32 {
    fn from(reason: Reason) -> Self {
        reason.code()
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Alert(alert) => write!(f, "{alert} ({})", alert.code()),
            Self::Local(local) => write!(f, "{local} ({})", local.code()),
            Self::Opaque(code) => write!(f, "{code:#x}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_codes_match_wire_values() {
        assert_eq!(Alert::CloseNotify.code(), 0);
        assert_eq!(Alert::UnexpectedMessage.code(), 10);
        assert_eq!(Alert::BadRecordMac.code(), 20);
        assert_eq!(Alert::RecordOverflow.code(), 22);
        assert_eq!(Alert::HandshakeFailure.code(), 40);
        assert_eq!(Alert::UnknownCa.code(), 48);
        assert_eq!(Alert::DecodeError.code(), 50);
        assert_eq!(Alert::ProtocolVersion.code(), 70);
        assert_eq!(Alert::InternalError.code(), 80);
        assert_eq!(Alert::NoRenegotiation.code(), 100);
        assert_eq!(Alert::UnsupportedExtension.code(), 110);
    }

    #[test]
    fn test_alert_from_code() {
        for &alert in Alert::ALL {
            assert_eq!(Alert::from_code(i32::from(alert)), Some(alert));
        }
        assert_eq!(Alert::from_code(1), None);
        assert_eq!(Alert::from_code(-1), None);
        assert_eq!(Alert::from_code(256), None);
    }

    #[test]
    fn test_alert_level() {
        assert_eq!(Alert::CloseNotify.level(), AlertLevel::Warning);
        assert_eq!(Alert::NoRenegotiation.level(), AlertLevel::Warning);
        assert!(Alert::BadRecordMac.is_fatal());
        assert!(!Alert::CloseNotify.is_fatal());
    }

    #[test]
    fn test_local_reasons_start_past_alerts() {
        assert_eq!(LocalReason::BadAlert.code(), 256);
        assert_eq!(LocalReason::TooManyEmptyChunks.code(), 257);
        assert_eq!(LocalReason::InvalidArgument.code(), 264);
        assert_eq!(LocalReason::NotImplemented.code(), 269);
        for local in LocalReason::ALL {
            assert!(local.code() > i32::from(u8::MAX));
            assert_eq!(LocalReason::from_code(local.code()), Some(local));
        }
        assert_eq!(LocalReason::from_code(255), None);
        assert_eq!(LocalReason::from_code(270), None);
        assert_eq!(LocalReason::from_code(i32::MIN), None);
    }

    #[test]
    fn test_local_reason_alert_mapping() {
        assert_eq!(
            LocalReason::TooManyEmptyChunks.alert(),
            Some(Alert::UnexpectedMessage)
        );
        assert_eq!(
            LocalReason::TooManyWarnings.alert(),
            Some(Alert::UnexpectedMessage)
        );
        assert_eq!(LocalReason::LengthMismatch.alert(), Some(Alert::DecodeError));
        assert_eq!(LocalReason::OutOfMemory.alert(), Some(Alert::InternalError));
        assert_eq!(LocalReason::OutOfBounds.alert(), Some(Alert::InternalError));
        assert_eq!(
            LocalReason::UnsupportedAlgorithm.alert(),
            Some(Alert::HandshakeFailure)
        );
        assert_eq!(LocalReason::BadAlert.alert(), None);
        assert_eq!(LocalReason::Disconnected.alert(), None);
        assert_eq!(LocalReason::InvalidArgument.alert(), None);
        assert_eq!(LocalReason::BufferChanged.alert(), None);
    }

    #[test]
    fn test_reason_depends_on_source() {
        assert_eq!(Reason::decode(ErrorSource::Platform, 22), Reason::Opaque(22));
        assert_eq!(
            Reason::decode(ErrorSource::Peer, 22),
            Reason::Alert(Alert::RecordOverflow)
        );
        assert_eq!(
            Reason::decode(ErrorSource::Library, 22),
            Reason::Alert(Alert::RecordOverflow)
        );
        assert_eq!(
            Reason::decode(ErrorSource::Library, 263),
            Reason::Local(LocalReason::OutOfBounds)
        );
        assert_eq!(Reason::decode(ErrorSource::Peer, 263), Reason::Opaque(263));
        assert_eq!(Reason::decode(ErrorSource::Crypto, 0x10).code(), 0x10);
    }

    #[test]
    fn test_error_source_codes() {
        for source in ErrorSource::ALL {
            assert_eq!(ErrorSource::from_code(source.code()), Some(source));
        }
        assert_eq!(ErrorSource::from_code(4), None);
    }
}
