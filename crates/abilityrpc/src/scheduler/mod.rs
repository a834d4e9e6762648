//! # Ability Scheduler
//!
//! The application-side contract. The manager drives an ability's lifecycle
//! through it, and clients of a data ability reach its rows through it.
//!
//! ## Lifecycle notifications
//!
//! Transaction, result, connect, disconnect, command and restore calls return
//! nothing. They are still sent synchronously, but the caller never sees the
//! outcome; failures are only logged.
//!
//! ## Data access
//!
//! Every data operation is addressed by a [`Uri`]. Rows travel as
//! [`ValuesBucket`]s, filters as [`DataAbilityPredicates`] and query output as
//! a [`ResultSet`]. None of them are interpreted here.

use std::os::fd::OwnedFd;

use async_trait::async_trait;

use crate::data::DataAbilityPredicates;
use crate::data::FileMode;
use crate::data::ResultSet;
use crate::data::Uri;
use crate::data::ValuesBucket;
use crate::error::Result;
use crate::lifecycle::LifeCycleStateInfo;
use crate::want::PacMap;
use crate::want::Want;

mod proxy;
mod stub;

pub use proxy::AbilitySchedulerProxy;
pub use stub::AbilitySchedulerStub;

#[async_trait]
pub trait AbilityScheduler: Send + Sync + 'static {
    /// Moves the ability into `state_info.state`.
    async fn schedule_ability_transaction(&self, want: &Want, state_info: &LifeCycleStateInfo);

    /// Delivers the result of an ability this one started with `request_code`.
    async fn send_result(&self, request_code: i32, result_code: i32, result_want: &Want);

    async fn schedule_connect_ability(&self, want: &Want);

    async fn schedule_disconnect_ability(&self, want: &Want);

    async fn schedule_command_ability(&self, want: &Want, restart: bool, start_id: i32);

    async fn schedule_save_ability_state(&self) -> Result<PacMap>;

    async fn schedule_restore_ability_state(&self, state: &PacMap);

    /// MIME types of the files under `uri` that match `mime_filter`.
    async fn get_file_types(&self, uri: &Uri, mime_filter: &str) -> Result<Vec<String>>;

    async fn open_file(&self, uri: &Uri, mode: FileMode) -> Result<OwnedFd>;

    async fn open_raw_file(&self, uri: &Uri, mode: FileMode) -> Result<OwnedFd>;

    /// Returns the index of the inserted row.
    async fn insert(&self, uri: &Uri, value: &ValuesBucket) -> Result<i32>;

    /// Returns the number of rows updated.
    async fn update(&self, uri: &Uri, value: &ValuesBucket, predicates: &DataAbilityPredicates) -> Result<i32>;

    /// Returns the number of rows deleted.
    async fn delete(&self, uri: &Uri, predicates: &DataAbilityPredicates) -> Result<i32>;

    /// `Ok(None)` when the data ability produced no result set.
    async fn query(
        &self,
        uri: &Uri,
        columns: &[String],
        predicates: &DataAbilityPredicates,
    ) -> Result<Option<ResultSet>>;

    /// MIME type of the data at `uri`.
    async fn get_type(&self, uri: &Uri) -> Result<String>;

    async fn reload(&self, uri: &Uri, extras: &PacMap) -> Result<bool>;

    /// Returns the number of rows inserted.
    async fn batch_insert(&self, uri: &Uri, values: &[ValuesBucket]) -> Result<i32>;
}
