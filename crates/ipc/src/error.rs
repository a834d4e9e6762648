//! # Error Definitions
//!
//! Failures while building or reading a [`Parcel`](crate::Parcel).

use crate::parcel::Tag;

/// Parcel serialization and deserialization errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Writing would grow the parcel past its configured capacity.
    CapacityExceeded { requested: usize, capacity: usize },
    /// Blob, string, or record length exceeds what the length prefix can hold.
    BlobTooLarge(usize),
    /// The object side table is full.
    TooManyObjects(usize),
    /// The descriptor side table is full.
    TooManyFds(usize),
    /// The descriptor could not be duplicated into the parcel.
    BadFileDescriptor(String),
    /// Buffer exhausted while reading.
    UnexpectedEnd,
    /// Byte does not correspond to a valid `Tag`.
    InvalidTag(u8),
    /// The next field has a different kind than the one requested.
    TagMismatch { expected: Tag, found: Tag },
    /// String data is not valid UTF-8.
    InvalidUtf8,
    /// String data is not valid UTF-16.
    InvalidUtf16,
    /// A sequence count was negative.
    NegativeLength(i32),
    /// A record that must be present was null or failed to decode.
    MissingRecord,
    /// A record decoded but one of its fields holds a value outside its domain.
    InvalidValue(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::CapacityExceeded { requested, capacity } => {
                write!(f, "Capacity exceeded: {} bytes requested, {} allowed", requested, capacity)
            }
            Error::InvalidTag(b) => write!(f, "Invalid Tag byte: {:#04x}", b),
            Error::TagMismatch { expected, found } => {
                write!(f, "Tag Mismatch: expected {:?}, found {:?}", expected, found)
            }
            Error::InvalidValue(msg) => write!(f, "Invalid value: {}", msg),
            _ => write!(f, "{:?}", self),
        }
    }
}

impl std::error::Error for Error {}

/// Specialized `Result` for parcel operations.
pub type Result<T> = std::result::Result<T, Error>;
