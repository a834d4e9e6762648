use async_trait::async_trait;
use ipc::Parcel;
use ipc::ParcelConfig;
use ipc::RemoteHandle;
use tracing::error;

use super::AbilityManager;
use crate::codes::ABILITY_MANAGER_TOKEN;
use crate::codes::AbilityManagerCode;
use crate::data::Uri;
use crate::error::Error;
use crate::error::Result;
use crate::lifecycle::AbilityLifeCycleState;
use crate::mission::MissionSnapshotInfo;
use crate::mission::RecentMissionInfo;
use crate::mission::StackInfo;
use crate::rpc;
use crate::want::Want;

/// Client side of [`AbilityManager`], bound to one remote handle.
pub struct AbilityManagerProxy {
    remote: RemoteHandle,
    config: ParcelConfig,
}

impl AbilityManagerProxy {
    pub fn new(remote: RemoteHandle) -> Self {
        Self::with_config(remote, ParcelConfig::default())
    }

    /// Requests are built with `config` limits.
    pub fn with_config(remote: RemoteHandle, config: ParcelConfig) -> Self {
        Self { remote, config }
    }

    pub fn remote(&self) -> &RemoteHandle {
        &self.remote
    }

    async fn transact<F>(&self, code: AbilityManagerCode, write: F) -> Result<Parcel>
    where
        F: FnOnce(&mut Parcel) -> ipc::Result<()>,
    {
        let code = code as u32;
        let mut data = rpc::request(ABILITY_MANAGER_TOKEN, self.config, code, write)?;
        rpc::send(&self.remote, code, &mut data).await
    }

    /// Sends a request whose reply is a bare result code.
    async fn call<F>(&self, code: AbilityManagerCode, write: F) -> Result<()>
    where
        F: FnOnce(&mut Parcel) -> ipc::Result<()>,
    {
        let mut reply = self.transact(code, write).await?;
        rpc::read_result(&mut reply)
    }
}

#[async_trait]
impl AbilityManager for AbilityManagerProxy {
    async fn start_ability(&self, want: &Want, request_code: i32) -> Result<()> {
        self.call(AbilityManagerCode::StartAbility, |data| {
            data.write_parcelable(Some(want))?;
            data.write_i32(request_code)
        })
        .await
    }

    async fn start_ability_with_caller(
        &self,
        want: &Want,
        caller_token: Option<RemoteHandle>,
        request_code: i32,
    ) -> Result<()> {
        self.call(AbilityManagerCode::StartAbilityAddCaller, |data| {
            data.write_parcelable(Some(want))?;
            data.write_remote_object(caller_token.as_ref())?;
            data.write_i32(request_code)
        })
        .await
    }

    async fn terminate_ability(
        &self,
        token: RemoteHandle,
        result_code: i32,
        result_want: Option<&Want>,
    ) -> Result<()> {
        let result_want = rpc::present(result_want, "result_want")?;
        self.call(AbilityManagerCode::TerminateAbility, |data| {
            data.write_remote_object(Some(&token))?;
            data.write_i32(result_code)?;
            data.write_parcelable(Some(result_want))
        })
        .await
    }

    async fn terminate_ability_by_caller(&self, caller_token: RemoteHandle, request_code: i32) -> Result<()> {
        self.call(AbilityManagerCode::TerminateAbilityByCaller, |data| {
            data.write_remote_object(Some(&caller_token))?;
            data.write_i32(request_code)
        })
        .await
    }

    async fn terminate_ability_result(&self, token: RemoteHandle, start_id: i32) -> Result<()> {
        self.call(AbilityManagerCode::TerminateAbilityResult, |data| {
            data.write_remote_object(Some(&token))?;
            data.write_i32(start_id)
        })
        .await
    }

    async fn stop_service_ability(&self, want: &Want) -> Result<()> {
        self.call(AbilityManagerCode::StopServiceAbility, |data| data.write_parcelable(Some(want))).await
    }

    async fn connect_ability(
        &self,
        want: &Want,
        connect: Option<RemoteHandle>,
        caller_token: Option<RemoteHandle>,
    ) -> Result<()> {
        let connect = rpc::present(connect, "connect")?;
        self.call(AbilityManagerCode::ConnectAbility, |data| {
            data.write_parcelable(Some(want))?;
            data.write_remote_object(Some(&connect))?;
            data.write_remote_object(caller_token.as_ref())
        })
        .await
    }

    async fn disconnect_ability(&self, connect: Option<RemoteHandle>) -> Result<()> {
        let connect = rpc::present(connect, "connect")?;
        self.call(AbilityManagerCode::DisconnectAbility, |data| data.write_remote_object(Some(&connect)))
            .await
    }

    async fn acquire_data_ability(
        &self,
        uri: &Uri,
        try_bind: bool,
        caller_token: Option<RemoteHandle>,
    ) -> Result<RemoteHandle> {
        let caller_token = rpc::present(caller_token, "caller_token")?;
        let mut reply = self
            .transact(AbilityManagerCode::AcquireDataAbility, |data| {
                data.write_string(uri.as_str())?;
                data.write_bool(try_bind)?;
                data.write_remote_object(Some(&caller_token))
            })
            .await?;
        rpc::read_result(&mut reply)?;
        reply.read_remote_object().ok_or_else(|| {
            error!(uri = %uri, "data ability reply carries no scheduler");
            Error::Inner
        })
    }

    async fn release_data_ability(
        &self,
        scheduler: Option<RemoteHandle>,
        caller_token: Option<RemoteHandle>,
    ) -> Result<()> {
        let scheduler = rpc::present(scheduler, "scheduler")?;
        let caller_token = rpc::present(caller_token, "caller_token")?;
        self.call(AbilityManagerCode::ReleaseDataAbility, |data| {
            data.write_remote_object(Some(&scheduler))?;
            data.write_remote_object(Some(&caller_token))
        })
        .await
    }

    async fn attach_ability_thread(&self, scheduler: Option<RemoteHandle>, token: RemoteHandle) -> Result<()> {
        let scheduler = rpc::present(scheduler, "scheduler")?;
        self.call(AbilityManagerCode::AttachAbilityThread, |data| {
            data.write_remote_object(Some(&scheduler))?;
            data.write_remote_object(Some(&token))
        })
        .await
    }

    async fn ability_transition_done(&self, token: RemoteHandle, state: AbilityLifeCycleState) -> Result<()> {
        self.call(AbilityManagerCode::AbilityTransitionDone, |data| {
            data.write_remote_object(Some(&token))?;
            data.write_i32(state as i32)
        })
        .await
    }

    async fn schedule_connect_ability_done(
        &self,
        token: RemoteHandle,
        remote_object: Option<RemoteHandle>,
    ) -> Result<()> {
        self.call(AbilityManagerCode::ConnectAbilityDone, |data| {
            data.write_remote_object(Some(&token))?;
            data.write_remote_object(remote_object.as_ref())
        })
        .await
    }

    async fn schedule_disconnect_ability_done(&self, token: RemoteHandle) -> Result<()> {
        self.call(AbilityManagerCode::DisconnectAbilityDone, |data| data.write_remote_object(Some(&token)))
            .await
    }

    async fn schedule_command_ability_done(&self, token: RemoteHandle) -> Result<()> {
        self.call(AbilityManagerCode::CommandAbilityDone, |data| data.write_remote_object(Some(&token)))
            .await
    }

    async fn add_window_info(&self, token: RemoteHandle, window_token: i32) {
        let sent = self
            .transact(AbilityManagerCode::AddWindowInfo, |data| {
                data.write_remote_object(Some(&token))?;
                data.write_i32(window_token)
            })
            .await;
        if let Err(err) = sent {
            error!(%err, window_token, "add window info failed");
        }
    }

    async fn dump_state(&self, args: &str) -> Vec<String> {
        let lines = match self.transact(AbilityManagerCode::DumpState, |data| data.write_string(args)).await {
            Ok(mut reply) => reply.read_string_vector().map_err(Error::reply),
            Err(err) => Err(err),
        };
        lines.unwrap_or_else(|err| {
            error!(%err, "dump state failed");
            Vec::new()
        })
    }

    async fn get_all_stack_info(&self) -> Result<StackInfo> {
        let mut reply = self.transact(AbilityManagerCode::ListStackInfo, |_| Ok(())).await?;
        rpc::read_value(&mut reply, |r| r.read_parcelable().ok_or(ipc::Error::MissingRecord))
    }

    async fn get_recent_missions(&self, num_max: i32, flags: i32) -> Result<Vec<RecentMissionInfo>> {
        let mut reply = self
            .transact(AbilityManagerCode::GetRecentMission, |data| {
                data.write_i32(num_max)?;
                data.write_i32(flags)
            })
            .await?;
        rpc::read_sequence(&mut reply, Parcel::read_parcelable_vector)
    }

    async fn get_mission_snapshot(&self, mission_id: i32) -> Result<MissionSnapshotInfo> {
        let mut reply =
            self.transact(AbilityManagerCode::GetMissionSnapshot, |data| data.write_i32(mission_id)).await?;
        rpc::read_value(&mut reply, |r| r.read_parcelable().ok_or(ipc::Error::MissingRecord))
    }

    async fn move_mission_to_top(&self, mission_id: i32) -> Result<()> {
        self.call(AbilityManagerCode::MoveMissionToTop, |data| data.write_i32(mission_id)).await
    }

    async fn remove_mission(&self, mission_id: i32) -> Result<()> {
        self.call(AbilityManagerCode::RemoveMission, |data| data.write_i32(mission_id)).await
    }

    async fn remove_stack(&self, stack_id: i32) -> Result<()> {
        self.call(AbilityManagerCode::RemoveStack, |data| data.write_i32(stack_id)).await
    }

    async fn kill_process(&self, bundle_name: &str) -> Result<()> {
        self.call(AbilityManagerCode::KillProcess, |data| data.write_string(bundle_name)).await
    }

    async fn uninstall_app(&self, bundle_name: &str) -> Result<()> {
        self.call(AbilityManagerCode::UninstallApp, |data| data.write_string(bundle_name)).await
    }
}
