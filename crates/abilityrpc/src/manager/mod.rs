//! # Ability Manager
//!
//! The system-side contract: starting, stopping and connecting abilities,
//! hearing back from their schedulers, and managing missions.
//!
//! [`AbilityManagerProxy`] implements the trait over a [`RemoteHandle`].
//! [`AbilityManagerStub`] serves any implementation of it.

use async_trait::async_trait;
use ipc::RemoteHandle;

use crate::data::Uri;
use crate::error::Result;
use crate::lifecycle::AbilityLifeCycleState;
use crate::mission::MissionSnapshotInfo;
use crate::mission::RecentMissionInfo;
use crate::mission::StackInfo;
use crate::want::Want;

mod proxy;
mod stub;

pub use proxy::AbilityManagerProxy;
pub use stub::AbilityManagerStub;

/// Operations the ability manager service offers.
///
/// Remote object arguments are `Option` where the caller may legitimately
/// hold none. Where one is required, `None` fails with
/// [`Error::InvalidValue`](crate::Error::InvalidValue) before any I/O.
#[async_trait]
pub trait AbilityManager: Send + Sync + 'static {
    async fn start_ability(&self, want: &Want, request_code: i32) -> Result<()>;

    /// Starts an ability on behalf of the ability behind `caller_token`.
    async fn start_ability_with_caller(
        &self,
        want: &Want,
        caller_token: Option<RemoteHandle>,
        request_code: i32,
    ) -> Result<()>;

    /// Terminates the ability behind `token`, handing `result_want` back to
    /// its starter. `result_want` is required.
    async fn terminate_ability(
        &self,
        token: RemoteHandle,
        result_code: i32,
        result_want: Option<&Want>,
    ) -> Result<()>;

    /// Terminates the ability the caller started with `request_code`.
    async fn terminate_ability_by_caller(&self, caller_token: RemoteHandle, request_code: i32) -> Result<()>;

    async fn terminate_ability_result(&self, token: RemoteHandle, start_id: i32) -> Result<()>;

    async fn stop_service_ability(&self, want: &Want) -> Result<()>;

    /// `connect` is the caller's connection callback and is required.
    async fn connect_ability(
        &self,
        want: &Want,
        connect: Option<RemoteHandle>,
        caller_token: Option<RemoteHandle>,
    ) -> Result<()>;

    async fn disconnect_ability(&self, connect: Option<RemoteHandle>) -> Result<()>;

    /// Returns the scheduler of the data ability serving `uri`. `caller_token`
    /// is required.
    async fn acquire_data_ability(
        &self,
        uri: &Uri,
        try_bind: bool,
        caller_token: Option<RemoteHandle>,
    ) -> Result<RemoteHandle>;

    /// Both `scheduler` and `caller_token` are required.
    async fn release_data_ability(
        &self,
        scheduler: Option<RemoteHandle>,
        caller_token: Option<RemoteHandle>,
    ) -> Result<()>;

    /// An ability's thread announces its scheduler.
    async fn attach_ability_thread(&self, scheduler: Option<RemoteHandle>, token: RemoteHandle) -> Result<()>;

    async fn ability_transition_done(&self, token: RemoteHandle, state: AbilityLifeCycleState) -> Result<()>;

    async fn schedule_connect_ability_done(
        &self,
        token: RemoteHandle,
        remote_object: Option<RemoteHandle>,
    ) -> Result<()>;

    async fn schedule_disconnect_ability_done(&self, token: RemoteHandle) -> Result<()>;

    async fn schedule_command_ability_done(&self, token: RemoteHandle) -> Result<()>;

    /// Records the window bound to an ability. The caller sees no outcome.
    async fn add_window_info(&self, token: RemoteHandle, window_token: i32);

    /// Human-readable state, one line per entry.
    async fn dump_state(&self, args: &str) -> Vec<String>;

    async fn get_all_stack_info(&self) -> Result<StackInfo>;

    /// At most `num_max` recent missions, filtered by the `RECENT_*` bits in `flags`.
    async fn get_recent_missions(&self, num_max: i32, flags: i32) -> Result<Vec<RecentMissionInfo>>;

    async fn get_mission_snapshot(&self, mission_id: i32) -> Result<MissionSnapshotInfo>;

    async fn move_mission_to_top(&self, mission_id: i32) -> Result<()>;

    async fn remove_mission(&self, mission_id: i32) -> Result<()>;

    async fn remove_stack(&self, stack_id: i32) -> Result<()>;

    async fn kill_process(&self, bundle_name: &str) -> Result<()>;

    async fn uninstall_app(&self, bundle_name: &str) -> Result<()>;
}
