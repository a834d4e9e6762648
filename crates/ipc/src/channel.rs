//! In-process transport over tokio channels.
//!
//! Serves a [`RemoteStub`] on its own task so callers go through the same
//! proxy, parcel hand-off and death path as a cross-process peer.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::trace;

use crate::object::MessageOption;
use crate::object::RemoteHandle;
use crate::object::RemoteStub;
use crate::parcel::Parcel;
use crate::status::ERR_DEAD_OBJECT;
use crate::status::ERR_NONE;
use crate::status::ERR_TRANSACTION_FAILED;
use crate::transport::RemoteProxy;
use crate::transport::Transport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Transactions that may wait for the server before senders block.
    pub queue_depth: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self { queue_depth: 64 }
    }
}

struct Transaction {
    code: u32,
    data: Parcel,
    option: MessageOption,
    reply: Option<oneshot::Sender<(i32, Parcel)>>,
}

/// Client half of [`channel`].
pub struct ChannelTransport {
    tx: mpsc::Sender<Transaction>,
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn transact(
        &self,
        code: u32,
        data: Parcel,
        option: MessageOption,
    ) -> Result<Parcel, i32> {
        if option.is_async() {
            let txn = Transaction { code, data, option, reply: None };
            self.tx.send(txn).await.map_err(|_| ERR_DEAD_OBJECT)?;
            return Ok(Parcel::new());
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        let txn = Transaction { code, data, option, reply: Some(reply_tx) };
        self.tx.send(txn).await.map_err(|_| ERR_DEAD_OBJECT)?;
        // A dropped reply with the server still up means the handler itself died.
        let (status, reply) = reply_rx.await.map_err(|_| {
            if self.tx.is_closed() { ERR_DEAD_OBJECT } else { ERR_TRANSACTION_FAILED }
        })?;
        if status != ERR_NONE {
            return Err(status);
        }
        Ok(reply)
    }

    async fn closed(&self) {
        self.tx.closed().await
    }
}

/// Server half of [`channel`]. Dropping it kills the endpoint.
pub struct ChannelServer {
    task: JoinHandle<()>,
}

impl ChannelServer {
    /// Stops serving. Proxies observe this as the death of the remote object.
    pub fn shutdown(self) {
        drop(self)
    }
}

impl Drop for ChannelServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Serves `stub` on a background task and returns a proxy handle to it.
///
/// Each transaction runs on its own task, so a slow request does not hold up
/// the ones behind it.
pub fn channel(stub: Arc<dyn RemoteStub>, config: ChannelConfig) -> (RemoteHandle, ChannelServer) {
    let (tx, mut rx) = mpsc::channel::<Transaction>(config.queue_depth.max(1));

    let task = tokio::spawn(async move {
        while let Some(txn) = rx.recv().await {
            let stub = Arc::clone(&stub);
            tokio::spawn(async move {
                let Transaction { code, mut data, option, reply } = txn;
                let mut answer = Parcel::new();
                let status = stub.on_remote_request(code, &mut data, &mut answer, option).await;
                trace!(code, status, "channel transaction served");
                if let Some(reply) = reply {
                    let _ = reply.send((status, answer));
                }
            });
        }
    });

    let proxy: RemoteHandle = RemoteProxy::new(Arc::new(ChannelTransport { tx }));
    (proxy, ChannelServer { task })
}
