//! # ipc
//!
//! Parcels, remote objects and death notification: the plumbing under every
//! cross-process contract.
//!
//! ## Layers
//!
//! - [`Parcel`]: the ordered message a request or reply travels in.
//! - [`RemoteObject`] / [`RemoteStub`]: the caller and callee sides of a contract.
//! - [`Transport`] / [`RemoteProxy`]: how a request leaves the process.
//! - [`DeathRecipient`]: how a holder learns its remote object is gone.

pub mod channel;
pub mod death;
pub mod error;
pub mod object;
pub mod parcel;
pub mod status;
pub mod transport;

pub use channel::ChannelConfig;
pub use channel::ChannelServer;
pub use channel::channel;
pub use death::DeathNotifier;
pub use death::DeathRecipient;
pub use error::Error;
pub use error::Result;
pub use object::INTERFACE_TRANSACTION;
pub use object::LocalObject;
pub use object::MessageOption;
pub use object::PING_TRANSACTION;
pub use object::RemoteHandle;
pub use object::RemoteObject;
pub use object::RemoteStub;
pub use object::default_on_remote_request;
pub use object::interface_descriptor;
pub use object::ping;
pub use parcel::Parcel;
pub use parcel::ParcelConfig;
pub use parcel::Parcelable;
pub use parcel::Tag;
pub use transport::RemoteProxy;
pub use transport::Transport;

#[cfg(test)]
mod tests;
