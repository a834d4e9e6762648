//! Transport-level status codes returned by [`RemoteObject::send_request`].
//!
//! Values follow the negative-errno convention of binder drivers so they never
//! collide with the positive codes services put in their replies.
//!
//! [`RemoteObject::send_request`]: crate::RemoteObject::send_request

/// The transaction was delivered and a reply was produced.
pub const ERR_NONE: i32 = 0;
/// The request data could not be read by the receiving stub.
pub const ERR_INVALID_DATA: i32 = -22;
/// The remote endpoint is gone.
pub const ERR_DEAD_OBJECT: i32 = -32;
/// The transaction was accepted but its handler never produced a reply.
pub const ERR_TRANSACTION_FAILED: i32 = -70;
/// The stub does not know the transaction code.
pub const ERR_UNKNOWN_TRANSACTION: i32 = -74;
