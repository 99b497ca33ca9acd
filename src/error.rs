//! Unified error types for the comms engine.
//!
//! Protocol failures (modem `ERROR`, timeouts, malformed frames) are never
//! surfaced as `Err`: they are state transitions inside the sequencer and
//! show up only in the log and the ack hook. This enum covers the
//! remaining fallible surfaces: configuration, console commands, control
//! pins and raw console writes. All variants are `Copy`.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The serial link refused or truncated an operation.
    Link(LinkError),
    /// Configuration is invalid or could not be decoded.
    Config(ConfigError),
    /// A console command could not be parsed.
    Command(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Link(e) => write!(f, "link: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Command(msg) => write!(f, "command: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Link errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    /// A command line did not fit the fixed command buffer.
    CommandTooLong,
    /// The transport accepted fewer bytes than requested.
    ShortWrite,
    /// A control line (boot/reset pin) could not be driven.
    Pin,
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CommandTooLong => write!(f, "command too long"),
            Self::ShortWrite => write!(f, "short write"),
            Self::Pin => write!(f, "control pin write failed"),
        }
    }
}

impl From<LinkError> for Error {
    fn from(e: LinkError) -> Self {
        Self::Link(e)
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Field holds non-printable or non-ASCII characters.
    NotPrintable(&'static str),
    /// Field value longer than its fixed capacity.
    TooLong(&'static str),
    /// Numeric field out of its allowed range.
    OutOfRange(&'static str),
    /// Field must be hexadecimal of a fixed width.
    BadHex(&'static str),
    /// No field with the given name.
    UnknownField,
    /// Configuration could not be serialized.
    Encode,
    /// Serialized blob could not be decoded.
    Decode,
    /// Persistent storage refused the read or write.
    Storage,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotPrintable(field) => write!(f, "{field}: not printable ASCII"),
            Self::TooLong(field) => write!(f, "{field}: too long"),
            Self::OutOfRange(field) => write!(f, "{field}: out of range"),
            Self::BadHex(field) => write!(f, "{field}: bad hex"),
            Self::UnknownField => write!(f, "unknown field"),
            Self::Encode => write!(f, "encode failed"),
            Self::Decode => write!(f, "decode failed"),
            Self::Storage => write!(f, "storage I/O failed"),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
