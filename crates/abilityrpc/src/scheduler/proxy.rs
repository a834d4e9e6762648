use std::os::fd::OwnedFd;

use async_trait::async_trait;
use ipc::Parcel;
use ipc::ParcelConfig;
use ipc::RemoteHandle;
use tracing::error;

use super::AbilityScheduler;
use crate::codes::ABILITY_SCHEDULER_TOKEN;
use crate::codes::AbilitySchedulerCode;
use crate::data::DataAbilityPredicates;
use crate::data::FileMode;
use crate::data::ResultSet;
use crate::data::Uri;
use crate::data::ValuesBucket;
use crate::error::Error;
use crate::error::Result;
use crate::lifecycle::LifeCycleStateInfo;
use crate::rpc;
use crate::want::PacMap;
use crate::want::Want;

/// Client side of [`AbilityScheduler`], bound to one remote handle.
pub struct AbilitySchedulerProxy {
    remote: RemoteHandle,
    config: ParcelConfig,
}

impl AbilitySchedulerProxy {
    pub fn new(remote: RemoteHandle) -> Self {
        Self::with_config(remote, ParcelConfig::default())
    }

    pub fn with_config(remote: RemoteHandle, config: ParcelConfig) -> Self {
        Self { remote, config }
    }

    pub fn remote(&self) -> &RemoteHandle {
        &self.remote
    }

    async fn transact<F>(&self, code: AbilitySchedulerCode, write: F) -> Result<Parcel>
    where
        F: FnOnce(&mut Parcel) -> ipc::Result<()>,
    {
        let code = code as u32;
        let mut data = rpc::request(ABILITY_SCHEDULER_TOKEN, self.config, code, write)?;
        rpc::send(&self.remote, code, &mut data).await
    }

    /// Sends a lifecycle notification. The reply is empty and the outcome only logged.
    async fn notify<F>(&self, code: AbilitySchedulerCode, write: F)
    where
        F: FnOnce(&mut Parcel) -> ipc::Result<()>,
    {
        if let Err(err) = self.transact(code, write).await {
            error!(code = code as u32, %err, "scheduler notification failed");
        }
    }

    async fn open(&self, code: AbilitySchedulerCode, uri: &Uri, mode: FileMode) -> Result<OwnedFd> {
        let mut reply = self
            .transact(code, |data| {
                data.write_parcelable(Some(uri))?;
                data.write_string(mode.as_str())
            })
            .await?;
        rpc::read_result(&mut reply)?;
        reply.read_file_descriptor().ok_or_else(|| {
            error!(uri = %uri, %mode, "open reply carries no descriptor");
            Error::Inner
        })
    }
}

#[async_trait]
impl AbilityScheduler for AbilitySchedulerProxy {
    async fn schedule_ability_transaction(&self, want: &Want, state_info: &LifeCycleStateInfo) {
        self.notify(AbilitySchedulerCode::ScheduleAbilityTransaction, |data| {
            data.write_parcelable(Some(want))?;
            data.write_parcelable(Some(state_info))
        })
        .await
    }

    async fn send_result(&self, request_code: i32, result_code: i32, result_want: &Want) {
        self.notify(AbilitySchedulerCode::SendResult, |data| {
            data.write_i32(request_code)?;
            data.write_i32(result_code)?;
            data.write_parcelable(Some(result_want))
        })
        .await
    }

    async fn schedule_connect_ability(&self, want: &Want) {
        self.notify(AbilitySchedulerCode::ScheduleAbilityConnect, |data| data.write_parcelable(Some(want)))
            .await
    }

    async fn schedule_disconnect_ability(&self, want: &Want) {
        self.notify(AbilitySchedulerCode::ScheduleAbilityDisconnect, |data| data.write_parcelable(Some(want)))
            .await
    }

    async fn schedule_command_ability(&self, want: &Want, restart: bool, start_id: i32) {
        self.notify(AbilitySchedulerCode::ScheduleAbilityCommand, |data| {
            data.write_parcelable(Some(want))?;
            data.write_bool(restart)?;
            data.write_i32(start_id)
        })
        .await
    }

    async fn schedule_save_ability_state(&self) -> Result<PacMap> {
        let mut reply = self.transact(AbilitySchedulerCode::ScheduleSaveAbilityState, |_| Ok(())).await?;
        rpc::read_value(&mut reply, |r| r.read_parcelable().ok_or(ipc::Error::MissingRecord))
    }

    async fn schedule_restore_ability_state(&self, state: &PacMap) {
        self.notify(AbilitySchedulerCode::ScheduleRestoreAbilityState, |data| {
            data.write_parcelable(Some(state))
        })
        .await
    }

    async fn get_file_types(&self, uri: &Uri, mime_filter: &str) -> Result<Vec<String>> {
        let mut reply = self
            .transact(AbilitySchedulerCode::ScheduleGetFileTypes, |data| {
                data.write_parcelable(Some(uri))?;
                data.write_string(mime_filter)
            })
            .await?;
        rpc::read_sequence(&mut reply, Parcel::read_string_vector)
    }

    async fn open_file(&self, uri: &Uri, mode: FileMode) -> Result<OwnedFd> {
        self.open(AbilitySchedulerCode::ScheduleOpenFile, uri, mode).await
    }

    async fn open_raw_file(&self, uri: &Uri, mode: FileMode) -> Result<OwnedFd> {
        self.open(AbilitySchedulerCode::ScheduleOpenRawFile, uri, mode).await
    }

    async fn insert(&self, uri: &Uri, value: &ValuesBucket) -> Result<i32> {
        let mut reply = self
            .transact(AbilitySchedulerCode::ScheduleInsert, |data| {
                data.write_parcelable(Some(uri))?;
                data.write_parcelable(Some(value))
            })
            .await?;
        rpc::read_value(&mut reply, Parcel::read_i32)
    }

    async fn update(&self, uri: &Uri, value: &ValuesBucket, predicates: &DataAbilityPredicates) -> Result<i32> {
        let mut reply = self
            .transact(AbilitySchedulerCode::ScheduleUpdate, |data| {
                data.write_parcelable(Some(uri))?;
                data.write_parcelable(Some(value))?;
                data.write_parcelable(Some(predicates))
            })
            .await?;
        rpc::read_value(&mut reply, Parcel::read_i32)
    }

    async fn delete(&self, uri: &Uri, predicates: &DataAbilityPredicates) -> Result<i32> {
        let mut reply = self
            .transact(AbilitySchedulerCode::ScheduleDelete, |data| {
                data.write_parcelable(Some(uri))?;
                data.write_parcelable(Some(predicates))
            })
            .await?;
        rpc::read_value(&mut reply, Parcel::read_i32)
    }

    async fn query(
        &self,
        uri: &Uri,
        columns: &[String],
        predicates: &DataAbilityPredicates,
    ) -> Result<Option<ResultSet>> {
        let mut reply = self
            .transact(AbilitySchedulerCode::ScheduleQuery, |data| {
                data.write_parcelable(Some(uri))?;
                data.write_string_vector(columns)?;
                data.write_parcelable(Some(predicates))
            })
            .await?;
        rpc::read_value(&mut reply, Parcel::read_optional_parcelable)
    }

    async fn get_type(&self, uri: &Uri) -> Result<String> {
        let mut reply =
            self.transact(AbilitySchedulerCode::ScheduleGetType, |data| data.write_parcelable(Some(uri))).await?;
        rpc::read_value(&mut reply, Parcel::read_string)
    }

    async fn reload(&self, uri: &Uri, extras: &PacMap) -> Result<bool> {
        let mut reply = self
            .transact(AbilitySchedulerCode::ScheduleReload, |data| {
                data.write_parcelable(Some(uri))?;
                data.write_parcelable(Some(extras))
            })
            .await?;
        rpc::read_value(&mut reply, Parcel::read_bool)
    }

    async fn batch_insert(&self, uri: &Uri, values: &[ValuesBucket]) -> Result<i32> {
        let mut reply = self
            .transact(AbilitySchedulerCode::ScheduleBatchInsert, |data| {
                data.write_parcelable(Some(uri))?;
                data.write_parcelable_vector(values)
            })
            .await?;
        rpc::read_value(&mut reply, Parcel::read_i32)
    }
}
