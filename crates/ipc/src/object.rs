//! # Remote Objects
//!
//! The two halves of a cross-process call.
//!
//! - [`RemoteObject`] is what a caller holds: something a request can be sent to.
//! - [`RemoteStub`] is what a service implements: something that answers requests.
//!
//! [`LocalObject`] joins the two inside one process. [`RemoteProxy`](crate::RemoteProxy)
//! joins them across a [`Transport`](crate::Transport).

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::death::DeathRecipient;
use crate::parcel::Parcel;
use crate::status::ERR_INVALID_DATA;
use crate::status::ERR_NONE;
use crate::status::ERR_UNKNOWN_TRANSACTION;

/// A shared, thread-safe reference to a remote object.
///
/// Reference counting is the `Arc`'s; dropping the last handle releases the object.
pub type RemoteHandle = Arc<dyn RemoteObject>;

/// Delivery options for one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageOption {
    flags: u32,
    wait_time: u32,
}

impl MessageOption {
    /// Wait for the reply.
    pub const TF_SYNC: u32 = 0x00;
    /// Fire and forget. The reply parcel stays empty.
    pub const TF_ASYNC: u32 = 0x01;
    /// Seconds a synchronous caller is willing to wait.
    pub const DEFAULT_WAIT_TIME: u32 = 8;

    pub fn new(flags: u32, wait_time: u32) -> Self {
        Self { flags, wait_time }
    }

    pub fn sync() -> Self {
        Self::new(Self::TF_SYNC, Self::DEFAULT_WAIT_TIME)
    }

    pub fn one_way() -> Self {
        Self::new(Self::TF_ASYNC, Self::DEFAULT_WAIT_TIME)
    }

    pub fn flags(&self) -> u32 {
        self.flags
    }

    pub fn wait_time(&self) -> u32 {
        self.wait_time
    }

    pub fn is_async(&self) -> bool {
        self.flags & Self::TF_ASYNC != 0
    }
}

impl Default for MessageOption {
    fn default() -> Self {
        Self::sync()
    }
}

/// Something requests can be sent to.
///
/// This trait is designed to be object-safe (`Arc<dyn RemoteObject>`).
#[async_trait]
pub trait RemoteObject: Send + Sync {
    /// Sends `data` under `code` and fills `reply`.
    ///
    /// Returns a transport status: [`ERR_NONE`] when the request was delivered and
    /// answered, anything else when it was not. A service's own result lives in
    /// the reply, never in this status.
    async fn send_request(
        &self,
        code: u32,
        data: &mut Parcel,
        reply: &mut Parcel,
        option: MessageOption,
    ) -> i32;

    /// Registers `recipient` to hear about this object's death.
    ///
    /// Returns `false` when the object cannot die (it is local) or is already dead.
    fn add_death_recipient(&self, recipient: Arc<dyn DeathRecipient>) -> bool;

    /// Returns `true` if `recipient` was registered and has not been notified yet.
    fn remove_death_recipient(&self, recipient: &Arc<dyn DeathRecipient>) -> bool;

    /// `true` when requests travel through a transport.
    fn is_proxy(&self) -> bool;

    fn is_dead(&self) -> bool {
        false
    }
}

/// The receiving side of a contract.
#[async_trait]
pub trait RemoteStub: Send + Sync + 'static {
    /// The interface token every request to this stub must carry.
    fn descriptor(&self) -> &str;

    /// Handles one request. Returns a transport status as in
    /// [`RemoteObject::send_request`].
    async fn on_remote_request(
        &self,
        code: u32,
        data: &mut Parcel,
        reply: &mut Parcel,
        option: MessageOption,
    ) -> i32;
}

/// Liveness check understood by every stub.
pub const PING_TRANSACTION: u32 = u32::from_be_bytes(*b"_PNG");
/// Asks a stub for its descriptor.
pub const INTERFACE_TRANSACTION: u32 = u32::from_be_bytes(*b"_NTF");

/// Handles the codes a stub's own dispatch table does not know.
pub fn default_on_remote_request(descriptor: &str, code: u32, reply: &mut Parcel) -> i32 {
    match code {
        PING_TRANSACTION => ERR_NONE,
        INTERFACE_TRANSACTION => match reply.write_string16(descriptor) {
            Ok(()) => ERR_NONE,
            Err(_) => ERR_INVALID_DATA,
        },
        _ => {
            warn!(code, descriptor, "unknown transaction code");
            ERR_UNKNOWN_TRANSACTION
        }
    }
}

/// Sends a ping carrying `descriptor` as the interface token.
pub async fn ping(remote: &RemoteHandle, descriptor: &str) -> i32 {
    let mut data = Parcel::new();
    if data.write_interface_token(descriptor).is_err() {
        return ERR_INVALID_DATA;
    }
    let mut reply = Parcel::new();
    remote.send_request(PING_TRANSACTION, &mut data, &mut reply, MessageOption::sync()).await
}

/// Asks `remote` for the descriptor of the stub behind it.
pub async fn interface_descriptor(remote: &RemoteHandle, descriptor: &str) -> Result<String, i32> {
    let mut data = Parcel::new();
    data.write_interface_token(descriptor).map_err(|_| ERR_INVALID_DATA)?;
    let mut reply = Parcel::new();
    let status = remote
        .send_request(INTERFACE_TRANSACTION, &mut data, &mut reply, MessageOption::sync())
        .await;
    if status != ERR_NONE {
        return Err(status);
    }
    reply.read_string16().map_err(|_| ERR_INVALID_DATA)
}

/// A stub reachable from inside its own process.
///
/// Requests go straight to the stub. A local object never dies, so death
/// registration is refused.
pub struct LocalObject {
    stub: Arc<dyn RemoteStub>,
}

impl LocalObject {
    pub fn new(stub: Arc<dyn RemoteStub>) -> Self {
        Self { stub }
    }

    /// Wraps `stub` into a handle that can be written into parcels.
    pub fn handle(stub: Arc<dyn RemoteStub>) -> RemoteHandle {
        Arc::new(Self::new(stub))
    }

    pub fn stub(&self) -> &Arc<dyn RemoteStub> {
        &self.stub
    }
}

#[async_trait]
impl RemoteObject for LocalObject {
    async fn send_request(
        &self,
        code: u32,
        data: &mut Parcel,
        reply: &mut Parcel,
        option: MessageOption,
    ) -> i32 {
        data.rewind();
        let status = self.stub.on_remote_request(code, data, reply, option).await;
        if option.is_async() {
            *reply = Parcel::new();
        }
        status
    }

    fn add_death_recipient(&self, _recipient: Arc<dyn DeathRecipient>) -> bool {
        false
    }

    fn remove_death_recipient(&self, _recipient: &Arc<dyn DeathRecipient>) -> bool {
        false
    }

    fn is_proxy(&self) -> bool {
        false
    }
}
