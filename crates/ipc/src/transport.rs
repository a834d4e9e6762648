//! # Transport Abstraction
//!
//! A minimal, async interface for moving parcels between processes.
//!
//! ## Philosophy
//!
//! - **Parcel-Oriented**: The transport knows nothing about contracts or codes.
//!   It moves a request parcel one way and a reply parcel back.
//! - **Observable Death**: A transport reports when its peer is gone, and
//!   [`RemoteProxy`] turns that into death notifications.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::oneshot;
use tracing::debug;

use crate::death::DeathNotifier;
use crate::death::DeathRecipient;
use crate::object::MessageOption;
use crate::object::RemoteObject;
use crate::parcel::Parcel;
use crate::status::ERR_DEAD_OBJECT;
use crate::status::ERR_NONE;

/// A mechanism to send a request parcel and receive a reply parcel.
///
/// This trait is designed to be object-safe (`Arc<dyn Transport>`).
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Delivers one transaction.
    ///
    /// # invariants
    /// - Must return `Ok(reply)` when the peer handled the request, whatever the
    ///   service's own result was.
    /// - Must return `Err(status)` with a non-zero status when it was not handled,
    ///   and `Err(ERR_DEAD_OBJECT)` when the peer is gone.
    async fn transact(
        &self,
        code: u32,
        data: Parcel,
        option: MessageOption,
    ) -> Result<Parcel, i32>;

    /// Resolves once the peer can no longer receive transactions.
    async fn closed(&self);
}

/// A remote object reached through a [`Transport`].
///
/// Must be created inside a tokio runtime: a background task watches the
/// transport and fires death notification when it closes.
pub struct RemoteProxy {
    transport: Arc<dyn Transport>,
    death: Arc<DeathNotifier>,
    /// Dropping this stops the watcher.
    _watch: oneshot::Sender<()>,
}

impl RemoteProxy {
    pub fn new(transport: Arc<dyn Transport>) -> Arc<Self> {
        let death = Arc::new(DeathNotifier::new());
        let (watch, cancel) = oneshot::channel();

        let watched = Arc::clone(&transport);
        let notifier = Arc::clone(&death);
        tokio::spawn(async move {
            tokio::select! {
                _ = watched.closed() => {
                    notifier.notify();
                }
                _ = cancel => {
                    debug!("remote proxy dropped before its peer");
                }
            }
        });

        Arc::new(Self { transport, death, _watch: watch })
    }

    /// Fires death notification without waiting for the transport.
    pub fn notify_remote_died(&self) -> usize {
        self.death.notify()
    }
}

#[async_trait]
impl RemoteObject for RemoteProxy {
    async fn send_request(
        &self,
        code: u32,
        data: &mut Parcel,
        reply: &mut Parcel,
        option: MessageOption,
    ) -> i32 {
        if self.death.is_dead() {
            return ERR_DEAD_OBJECT;
        }
        let request = std::mem::take(data);
        match self.transport.transact(code, request, option).await {
            Ok(answer) => {
                *reply = answer;
                ERR_NONE
            }
            Err(status) => {
                if status == ERR_DEAD_OBJECT {
                    self.death.notify();
                }
                status
            }
        }
    }

    fn add_death_recipient(&self, recipient: Arc<dyn DeathRecipient>) -> bool {
        self.death.add(recipient)
    }

    fn remove_death_recipient(&self, recipient: &Arc<dyn DeathRecipient>) -> bool {
        self.death.remove(recipient)
    }

    fn is_proxy(&self) -> bool {
        true
    }

    fn is_dead(&self) -> bool {
        self.death.is_dead()
    }
}
