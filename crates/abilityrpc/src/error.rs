//! # Error Definitions
//!
//! The central ledger of result codes shared by every contract, and the typed
//! error proxies hand back to callers.
//!
//! Codes travel on the wire as `i32`. `0` always means success.

use tracing::error;

pub const ERR_OK: i32 = 0;
/// An argument was absent or could not be decoded.
pub const ERR_INVALID_VALUE: i32 = -22;
/// A request reached a stub for a different contract.
pub const ERR_INVALID_STATE: i32 = -77;

/// Base of the ability manager's own codes.
pub const ABILITY_MGR_ERR_OFFSET: i32 = 0x0020_0000;
/// The proxy could not build or finish a request locally.
pub const INNER_ERR: i32 = ABILITY_MGR_ERR_OFFSET;
pub const RESOLVE_ABILITY_ERR: i32 = ABILITY_MGR_ERR_OFFSET + 1;
pub const GET_ABILITY_SERVICE_FAILED: i32 = ABILITY_MGR_ERR_OFFSET + 2;
pub const ABILITY_SERVICE_NOT_CONNECTED: i32 = ABILITY_MGR_ERR_OFFSET + 3;
pub const RESOLVE_APP_ERR: i32 = ABILITY_MGR_ERR_OFFSET + 4;
pub const TARGET_ABILITY_NOT_SERVICE: i32 = ABILITY_MGR_ERR_OFFSET + 5;
pub const CONNECTION_NOT_EXIST: i32 = ABILITY_MGR_ERR_OFFSET + 6;
pub const REMOVE_MISSION_ID_NOT_EXIST: i32 = ABILITY_MGR_ERR_OFFSET + 7;
pub const REMOVE_STACK_ID_NOT_EXIST: i32 = ABILITY_MGR_ERR_OFFSET + 8;
pub const MOVE_MISSION_FAILED: i32 = ABILITY_MGR_ERR_OFFSET + 9;
pub const KILL_PROCESS_FAILED: i32 = ABILITY_MGR_ERR_OFFSET + 10;
pub const UNINSTALL_APP_FAILED: i32 = ABILITY_MGR_ERR_OFFSET + 11;
pub const DATA_ABILITY_NOT_FOUND: i32 = ABILITY_MGR_ERR_OFFSET + 12;

/// Why a contract call did not succeed.
///
/// Proxies produce every variant. Stubs turn a service's `Err` into its
/// [`code`](Self::code) on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The request could not be built or the reply could not be read.
    Inner,
    /// The transport refused or failed the request with this status.
    Transport(i32),
    /// An argument was absent where one is required, or could not be decoded.
    InvalidValue,
    /// The remote service answered with this non-zero result code.
    Application(i32),
}

impl Error {
    /// The wire code for this error.
    pub fn code(&self) -> i32 {
        match self {
            Error::Inner => INNER_ERR,
            Error::Transport(status) => *status,
            Error::InvalidValue => ERR_INVALID_VALUE,
            Error::Application(code) => *code,
        }
    }

    /// Maps a non-zero result code read from a reply.
    pub fn from_code(code: i32) -> Self {
        match code {
            ERR_INVALID_VALUE => Error::InvalidValue,
            INNER_ERR => Error::Inner,
            other => Error::Application(other),
        }
    }

    /// A request parcel could not be written.
    pub(crate) fn request(err: ipc::Error) -> Self {
        error!(%err, "failed to write request");
        Error::Inner
    }

    /// A reply parcel could not be read or written.
    pub(crate) fn reply(err: ipc::Error) -> Self {
        error!(%err, "failed to handle reply");
        Error::Inner
    }

    /// A stub could not decode an argument.
    pub(crate) fn argument(err: ipc::Error) -> Self {
        error!(%err, "failed to read argument");
        Error::InvalidValue
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Inner => write!(f, "Inner error"),
            Error::Transport(status) => write!(f, "Transport failed with status {}", status),
            Error::InvalidValue => write!(f, "Invalid value"),
            Error::Application(code) => write!(f, "Service returned {:#x}", code),
        }
    }
}

impl std::error::Error for Error {}

/// A specialized Result type for contract calls.
pub type Result<T> = std::result::Result<T, Error>;
