//! tierstore-core error type.

use std::error;
use std::fmt::{self, Display};
use std::result;

/// tierstore-core generic result type.
pub type Result<T> = result::Result<T, Error>;

/// A list specifying general errors for the store.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[non_exhaustive]
pub enum ErrorKind {
    /// A `null`/empty key or element was supplied where one is not permitted.
    NullArgument,
    /// A view operation that the view does not support (e.g. `add` on a key view).
    Unsupported,
    /// An unrecognized lock kind was requested from the sync adapter.
    InvalidArgument,
    /// The writer manager failed to persist a `put`/`remove` after the
    /// in-core mutation already committed.
    StoreUpdate,
    /// The store has been disposed, or not yet marked alive.
    NotAlive,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NullArgument => "null argument",
            ErrorKind::Unsupported => "unsupported operation",
            ErrorKind::InvalidArgument => "invalid argument",
            ErrorKind::StoreUpdate => "store update failed",
            ErrorKind::NotAlive => "store is not alive",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The primary and general error type for tierstore-core.
#[derive(Debug)]
pub enum Error {
    Simple(ErrorKind),
    Message(ErrorKind, String),
    /// A writer manager failure, surfaced after the in-core mutation already
    /// committed. The core never rolls back an in-core mutation because a
    /// downstream write-behind call failed.
    StoreUpdate {
        source: Box<dyn error::Error + Send + Sync>,
    },
    Custom(ErrorKind, Box<dyn error::Error + Send + Sync>),
}

impl Error {
    pub fn new<E>(error_kind: ErrorKind, inner_error: E) -> Self
    where
        E: Into<Box<dyn error::Error + Send + Sync>>,
    {
        Self::Custom(error_kind, inner_error.into())
    }

    /// Wraps a writer-manager failure observed after a committed mutation.
    pub fn store_update<E>(source: E) -> Self
    where
        E: Into<Box<dyn error::Error + Send + Sync>>,
    {
        Self::StoreUpdate {
            source: source.into(),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Simple(error_kind) => {
                write!(f, "{error_kind}")
            }
            Error::Message(error_kind, string) => {
                write!(f, "{error_kind}: {string}")
            }
            Error::StoreUpdate { source } => {
                write!(f, "store update failed: {source}")
            }
            Error::Custom(error_kind, ref box_error) => {
                write!(f, "{error_kind}, error: {}", *box_error)
            }
        }
    }
}

impl error::Error for Error {}

impl From<ErrorKind> for Error {
    fn from(error_kind: ErrorKind) -> Self {
        Self::Simple(error_kind)
    }
}

impl<S: ToString> From<(ErrorKind, S)> for Error {
    fn from((error_kind, stringable): (ErrorKind, S)) -> Self {
        Self::Message(error_kind, stringable.to_string())
    }
}
