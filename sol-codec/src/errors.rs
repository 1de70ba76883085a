use core::fmt;
use nom::error::{ErrorKind, FromExternalError, ParseError};
use thiserror::Error;

/// The back-reference table an index pointed into
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ReferenceTable {
    /// Complex values (objects, arrays, dates, ...)
    Object,
    /// AMF3 strings
    String,
    /// AMF3 traits
    Trait,
}

impl fmt::Display for ReferenceTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceTable::Object => f.write_str("object"),
            ReferenceTable::String => f.write_str("string"),
            ReferenceTable::Trait => f.write_str("trait"),
        }
    }
}

/// Enum for representing decoding, editing and encoding errors
#[derive(Error, Debug)]
pub enum Error {
    /// The input buffer was empty
    #[error("input is empty")]
    EmptyInput,

    /// The input does not follow the `.sol` / AMF format
    #[error("invalid data at byte {offset}: {reason}")]
    Format {
        /// Offset of the offending byte from the start of the file
        offset: usize,
        /// What was wrong
        reason: String,
    },

    /// The input ended before the value being decoded was complete
    #[error("input ends unexpectedly at byte {offset}")]
    TruncatedInput {
        /// Offset from the start of the file at which more data was needed
        offset: usize,
    },

    /// A back-reference could not be resolved
    #[error("{table} reference {index} at byte {offset} {reason}")]
    Reference {
        /// Offset of the reference from the start of the file
        offset: usize,
        /// The index that was looked up
        index: usize,
        /// The table that was searched
        table: ReferenceTable,
        /// Why the lookup failed
        reason: &'static str,
    },

    /// The input uses a part of the format that can't be decoded
    #[error("unsupported feature: {0}")]
    UnsupportedFeature(String),

    /// A path could not be followed
    #[error("invalid path `{path}`: {reason}")]
    Path {
        /// The path up to and including the segment that failed
        path: String,
        /// Why the segment couldn't be followed
        reason: String,
    },

    /// Text could not be converted into the required kind of value
    #[error("expected {expected}: {reason}")]
    Conversion {
        /// The kind of value that was required
        expected: &'static str,
        /// Why the conversion failed
        reason: String,
    },

    /// The document can't be represented in the binary format
    #[error("cannot serialize: {0}")]
    Serialization(String),

    /// Reading or writing failed
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised inside the nom parsers, carrying the input that remained when they happened
#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) enum DecodeError<'a> {
    /// More input was needed
    Truncated(&'a [u8]),

    /// The bytes at this position are invalid
    Format(&'a [u8], String),

    /// A back-reference at this position is invalid
    Reference(&'a [u8], usize, ReferenceTable, &'static str),

    /// The input needs a feature this crate doesn't implement
    Unsupported(String),

    /// A nom internal error
    Nom(&'a [u8], ErrorKind),
}

impl<'a> DecodeError<'a> {
    /// Convert into a public error, `full` must be the buffer the parse was started on
    pub(crate) fn into_error(self, full: &[u8]) -> Error {
        let offset = |rest: &[u8]| full.len().saturating_sub(rest.len());
        match self {
            DecodeError::Truncated(rest) => Error::TruncatedInput {
                offset: offset(rest),
            },
            DecodeError::Format(rest, reason) => Error::Format {
                offset: offset(rest),
                reason,
            },
            DecodeError::Reference(rest, index, table, reason) => Error::Reference {
                offset: offset(rest),
                index,
                table,
                reason,
            },
            DecodeError::Unsupported(what) => Error::UnsupportedFeature(what),
            DecodeError::Nom(rest, kind) => Error::Format {
                offset: offset(rest),
                reason: format!("parser failed ({})", kind.description()),
            },
        }
    }
}

/// Convert the error of a parse started on `full` into a public error
pub(crate) fn from_nom(err: nom::Err<DecodeError<'_>>, full: &[u8]) -> Error {
    match err {
        nom::Err::Error(e) | nom::Err::Failure(e) => e.into_error(full),
        nom::Err::Incomplete(_) => Error::TruncatedInput { offset: full.len() },
    }
}

impl<'a> ParseError<&'a [u8]> for DecodeError<'a> {
    fn from_error_kind(input: &'a [u8], kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::Eof => DecodeError::Truncated(input),
            _ => DecodeError::Nom(input, kind),
        }
    }

    fn append(_: &[u8], _: ErrorKind, other: Self) -> Self {
        other
    }
}

impl<'a, E> FromExternalError<&'a [u8], E> for DecodeError<'a> {
    fn from_external_error(input: &'a [u8], kind: ErrorKind, _e: E) -> Self {
        DecodeError::Nom(input, kind)
    }
}
