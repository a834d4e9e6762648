//! # Ability Connection
//!
//! The callback a client hands to `connect_ability`. The manager reports
//! through it when the service ability has connected or disconnected.
//!
//! Both calls are notifications: the reply is empty and failures are logged.

use std::sync::Arc;

use async_trait::async_trait;
use ipc::LocalObject;
use ipc::MessageOption;
use ipc::Parcel;
use ipc::ParcelConfig;
use ipc::RemoteHandle;
use ipc::RemoteStub;
use tracing::error;

use crate::codes::ABILITY_CONNECTION_TOKEN;
use crate::codes::AbilityConnectionCode;
use crate::error::ERR_INVALID_STATE;
use crate::error::Result;
use crate::rpc;
use crate::want::ElementName;

#[async_trait]
pub trait AbilityConnection: Send + Sync + 'static {
    /// `remote` is the connected ability's service object, if it returned one.
    async fn on_ability_connect_done(&self, element: &ElementName, remote: Option<RemoteHandle>, result_code: i32);

    async fn on_ability_disconnect_done(&self, element: &ElementName, result_code: i32);
}

// ============================================================================
// Proxy
// ============================================================================

/// Client side of [`AbilityConnection`].
pub struct AbilityConnectionProxy {
    remote: RemoteHandle,
    config: ParcelConfig,
}

impl AbilityConnectionProxy {
    pub fn new(remote: RemoteHandle) -> Self {
        Self { remote, config: ParcelConfig::default() }
    }

    pub fn remote(&self) -> &RemoteHandle {
        &self.remote
    }

    async fn notify<F>(&self, code: AbilityConnectionCode, write: F)
    where
        F: FnOnce(&mut Parcel) -> ipc::Result<()>,
    {
        let code = code as u32;
        let sent = match rpc::request(ABILITY_CONNECTION_TOKEN, self.config, code, write) {
            Ok(mut data) => rpc::send(&self.remote, code, &mut data).await.map(drop),
            Err(err) => Err(err),
        };
        if let Err(err) = sent {
            error!(code, %err, "connection callback failed");
        }
    }
}

#[async_trait]
impl AbilityConnection for AbilityConnectionProxy {
    async fn on_ability_connect_done(&self, element: &ElementName, remote: Option<RemoteHandle>, result_code: i32) {
        self.notify(AbilityConnectionCode::OnAbilityConnectDone, |data| {
            data.write_parcelable(Some(element))?;
            data.write_remote_object(remote.as_ref())?;
            data.write_i32(result_code)
        })
        .await
    }

    async fn on_ability_disconnect_done(&self, element: &ElementName, result_code: i32) {
        self.notify(AbilityConnectionCode::OnAbilityDisconnectDone, |data| {
            data.write_parcelable(Some(element))?;
            data.write_i32(result_code)
        })
        .await
    }
}

// ============================================================================
// Stub
// ============================================================================

/// Server side of [`AbilityConnection`].
pub struct AbilityConnectionStub {
    connection: Arc<dyn AbilityConnection>,
}

impl AbilityConnectionStub {
    pub fn new(connection: Arc<dyn AbilityConnection>) -> Self {
        Self { connection }
    }

    /// Wraps `connection` into an in-process handle, ready for `connect_ability`.
    pub fn local(connection: Arc<dyn AbilityConnection>) -> RemoteHandle {
        LocalObject::handle(Arc::new(Self::new(connection)))
    }

    async fn connect_done(&self, data: &mut Parcel) -> Result<()> {
        let element: ElementName = rpc::required(data, "element")?;
        let remote = data.read_remote_object();
        let result_code = rpc::arg(data.read_i32())?;
        self.connection.on_ability_connect_done(&element, remote, result_code).await;
        Ok(())
    }

    async fn disconnect_done(&self, data: &mut Parcel) -> Result<()> {
        let element: ElementName = rpc::required(data, "element")?;
        let result_code = rpc::arg(data.read_i32())?;
        self.connection.on_ability_disconnect_done(&element, result_code).await;
        Ok(())
    }
}

#[async_trait]
impl RemoteStub for AbilityConnectionStub {
    fn descriptor(&self) -> &str {
        ABILITY_CONNECTION_TOKEN
    }

    async fn on_remote_request(
        &self,
        code: u32,
        data: &mut Parcel,
        reply: &mut Parcel,
        _option: MessageOption,
    ) -> i32 {
        if !rpc::check_token(data, ABILITY_CONNECTION_TOKEN, code) {
            return ERR_INVALID_STATE;
        }
        let result = match AbilityConnectionCode::from_u32(code) {
            Some(AbilityConnectionCode::OnAbilityConnectDone) => self.connect_done(data).await,
            Some(AbilityConnectionCode::OnAbilityDisconnectDone) => self.disconnect_done(data).await,
            None => return ipc::default_on_remote_request(self.descriptor(), code, reply),
        };
        rpc::status(code, result)
    }
}
