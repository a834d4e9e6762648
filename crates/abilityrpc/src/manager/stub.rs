use std::collections::HashMap;
use std::sync::Arc;
use std::sync::LazyLock;

use async_trait::async_trait;
use futures::future::BoxFuture;
use ipc::LocalObject;
use ipc::MessageOption;
use ipc::Parcel;
use ipc::RemoteHandle;
use ipc::RemoteStub;
use tracing::error;

use super::AbilityManager;
use crate::codes::ABILITY_MANAGER_TOKEN;
use crate::codes::AbilityManagerCode;
use crate::data::Uri;
use crate::error::ERR_INVALID_STATE;
use crate::error::Error;
use crate::error::Result;
use crate::lifecycle::AbilityLifeCycleState;
use crate::rpc;
use crate::want::Want;

/// Decodes one request, calls the service and encodes its reply.
type Handler =
    for<'a> fn(&'a dyn AbilityManager, &'a mut Parcel, &'a mut Parcel) -> BoxFuture<'a, Result<()>>;

/// Code to handler. Built on first use, never mutated afterwards.
static HANDLERS: LazyLock<HashMap<u32, Handler>> = LazyLock::new(|| {
    let table: [(AbilityManagerCode, Handler); 25] = [
        (AbilityManagerCode::TerminateAbility, terminate_ability),
        (AbilityManagerCode::AttachAbilityThread, attach_ability_thread),
        (AbilityManagerCode::AbilityTransitionDone, ability_transition_done),
        (AbilityManagerCode::ConnectAbilityDone, connect_ability_done),
        (AbilityManagerCode::DisconnectAbilityDone, disconnect_ability_done),
        (AbilityManagerCode::AddWindowInfo, add_window_info),
        (AbilityManagerCode::TerminateAbilityResult, terminate_ability_result),
        (AbilityManagerCode::ListStackInfo, list_stack_info),
        (AbilityManagerCode::GetRecentMission, get_recent_missions),
        (AbilityManagerCode::RemoveMission, remove_mission),
        (AbilityManagerCode::RemoveStack, remove_stack),
        (AbilityManagerCode::CommandAbilityDone, command_ability_done),
        (AbilityManagerCode::GetMissionSnapshot, get_mission_snapshot),
        (AbilityManagerCode::AcquireDataAbility, acquire_data_ability),
        (AbilityManagerCode::ReleaseDataAbility, release_data_ability),
        (AbilityManagerCode::MoveMissionToTop, move_mission_to_top),
        (AbilityManagerCode::KillProcess, kill_process),
        (AbilityManagerCode::UninstallApp, uninstall_app),
        (AbilityManagerCode::TerminateAbilityByCaller, terminate_ability_by_caller),
        (AbilityManagerCode::StartAbility, start_ability),
        (AbilityManagerCode::StartAbilityAddCaller, start_ability_with_caller),
        (AbilityManagerCode::StopServiceAbility, stop_service_ability),
        (AbilityManagerCode::ConnectAbility, connect_ability),
        (AbilityManagerCode::DisconnectAbility, disconnect_ability),
        (AbilityManagerCode::DumpState, dump_state),
    ];
    table.into_iter().map(|(code, handler)| (code as u32, handler)).collect()
});

/// Server side of [`AbilityManager`].
///
/// Checks the interface token, decodes the arguments of the requested
/// operation and hands them to the wrapped service. Decoded records live on
/// the handler's stack and are dropped on every exit path.
pub struct AbilityManagerStub {
    service: Arc<dyn AbilityManager>,
}

impl AbilityManagerStub {
    pub fn new(service: Arc<dyn AbilityManager>) -> Self {
        Self { service }
    }

    /// Wraps `service` into an in-process handle.
    pub fn local(service: Arc<dyn AbilityManager>) -> RemoteHandle {
        LocalObject::handle(Arc::new(Self::new(service)))
    }

    pub fn service(&self) -> &Arc<dyn AbilityManager> {
        &self.service
    }
}

#[async_trait]
impl RemoteStub for AbilityManagerStub {
    fn descriptor(&self) -> &str {
        ABILITY_MANAGER_TOKEN
    }

    async fn on_remote_request(
        &self,
        code: u32,
        data: &mut Parcel,
        reply: &mut Parcel,
        _option: MessageOption,
    ) -> i32 {
        if !rpc::check_token(data, ABILITY_MANAGER_TOKEN, code) {
            return ERR_INVALID_STATE;
        }
        let Some(handler) = HANDLERS.get(&code) else {
            return ipc::default_on_remote_request(self.descriptor(), code, reply);
        };
        rpc::status(code, handler(self.service.as_ref(), data, reply).await)
    }
}

// ============================================================================
// Starting and stopping
// ============================================================================

fn start_ability<'a>(
    svc: &'a dyn AbilityManager,
    data: &'a mut Parcel,
    reply: &'a mut Parcel,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let want: Want = rpc::required(data, "want")?;
        let request_code = rpc::arg(data.read_i32())?;
        let result = svc.start_ability(&want, request_code).await;
        rpc::write_result(reply, result)
    })
}

fn start_ability_with_caller<'a>(
    svc: &'a dyn AbilityManager,
    data: &'a mut Parcel,
    reply: &'a mut Parcel,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let want: Want = rpc::required(data, "want")?;
        let caller_token = data.read_remote_object();
        let request_code = rpc::arg(data.read_i32())?;
        let result = svc.start_ability_with_caller(&want, caller_token, request_code).await;
        rpc::write_result(reply, result)
    })
}

fn terminate_ability<'a>(
    svc: &'a dyn AbilityManager,
    data: &'a mut Parcel,
    reply: &'a mut Parcel,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let token = rpc::required_object(data, "token")?;
        let result_code = rpc::arg(data.read_i32())?;
        let result_want: Want = rpc::required(data, "result_want")?;
        let result = svc.terminate_ability(token, result_code, Some(&result_want)).await;
        rpc::write_result(reply, result)
    })
}

fn terminate_ability_by_caller<'a>(
    svc: &'a dyn AbilityManager,
    data: &'a mut Parcel,
    reply: &'a mut Parcel,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let caller_token = rpc::required_object(data, "caller_token")?;
        let request_code = rpc::arg(data.read_i32())?;
        let result = svc.terminate_ability_by_caller(caller_token, request_code).await;
        rpc::write_result(reply, result)
    })
}

fn terminate_ability_result<'a>(
    svc: &'a dyn AbilityManager,
    data: &'a mut Parcel,
    reply: &'a mut Parcel,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let token = rpc::required_object(data, "token")?;
        let start_id = rpc::arg(data.read_i32())?;
        let result = svc.terminate_ability_result(token, start_id).await;
        rpc::write_result(reply, result)
    })
}

fn stop_service_ability<'a>(
    svc: &'a dyn AbilityManager,
    data: &'a mut Parcel,
    reply: &'a mut Parcel,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let want: Want = rpc::required(data, "want")?;
        let result = svc.stop_service_ability(&want).await;
        rpc::write_result(reply, result)
    })
}

// ============================================================================
// Connections and data abilities
// ============================================================================

fn connect_ability<'a>(
    svc: &'a dyn AbilityManager,
    data: &'a mut Parcel,
    reply: &'a mut Parcel,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let want: Want = rpc::required(data, "want")?;
        let connect = rpc::required_object(data, "connect")?;
        let caller_token = data.read_remote_object();
        let result = svc.connect_ability(&want, Some(connect), caller_token).await;
        rpc::write_result(reply, result)
    })
}

fn disconnect_ability<'a>(
    svc: &'a dyn AbilityManager,
    data: &'a mut Parcel,
    reply: &'a mut Parcel,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let connect = rpc::required_object(data, "connect")?;
        let result = svc.disconnect_ability(Some(connect)).await;
        rpc::write_result(reply, result)
    })
}

fn acquire_data_ability<'a>(
    svc: &'a dyn AbilityManager,
    data: &'a mut Parcel,
    reply: &'a mut Parcel,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let uri = Uri::new(rpc::arg(data.read_string())?);
        let try_bind = rpc::arg(data.read_bool())?;
        let caller_token = rpc::required_object(data, "caller_token")?;
        let result = svc.acquire_data_ability(&uri, try_bind, Some(caller_token)).await;
        rpc::write_value(reply, result, |r, scheduler| r.write_remote_object(Some(&scheduler)))
    })
}

fn release_data_ability<'a>(
    svc: &'a dyn AbilityManager,
    data: &'a mut Parcel,
    reply: &'a mut Parcel,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let scheduler = rpc::required_object(data, "scheduler")?;
        let caller_token = rpc::required_object(data, "caller_token")?;
        let result = svc.release_data_ability(Some(scheduler), Some(caller_token)).await;
        rpc::write_result(reply, result)
    })
}

// ============================================================================
// Reports from ability threads
// ============================================================================

fn attach_ability_thread<'a>(
    svc: &'a dyn AbilityManager,
    data: &'a mut Parcel,
    reply: &'a mut Parcel,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let scheduler = rpc::required_object(data, "scheduler")?;
        let token = rpc::required_object(data, "token")?;
        let result = svc.attach_ability_thread(Some(scheduler), token).await;
        rpc::write_result(reply, result)
    })
}

fn ability_transition_done<'a>(
    svc: &'a dyn AbilityManager,
    data: &'a mut Parcel,
    reply: &'a mut Parcel,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let token = rpc::required_object(data, "token")?;
        let raw = rpc::arg(data.read_i32())?;
        let state = AbilityLifeCycleState::from_i32(raw).ok_or_else(|| {
            error!(state = raw, "unknown lifecycle state");
            Error::InvalidValue
        })?;
        let result = svc.ability_transition_done(token, state).await;
        rpc::write_result(reply, result)
    })
}

fn connect_ability_done<'a>(
    svc: &'a dyn AbilityManager,
    data: &'a mut Parcel,
    reply: &'a mut Parcel,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let token = rpc::required_object(data, "token")?;
        let remote_object = data.read_remote_object();
        let result = svc.schedule_connect_ability_done(token, remote_object).await;
        rpc::write_result(reply, result)
    })
}

fn disconnect_ability_done<'a>(
    svc: &'a dyn AbilityManager,
    data: &'a mut Parcel,
    reply: &'a mut Parcel,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let token = rpc::required_object(data, "token")?;
        let result = svc.schedule_disconnect_ability_done(token).await;
        rpc::write_result(reply, result)
    })
}

fn command_ability_done<'a>(
    svc: &'a dyn AbilityManager,
    data: &'a mut Parcel,
    reply: &'a mut Parcel,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let token = rpc::required_object(data, "token")?;
        let result = svc.schedule_command_ability_done(token).await;
        rpc::write_result(reply, result)
    })
}

fn add_window_info<'a>(
    svc: &'a dyn AbilityManager,
    data: &'a mut Parcel,
    _reply: &'a mut Parcel,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let token = rpc::required_object(data, "token")?;
        let window_token = rpc::arg(data.read_i32())?;
        svc.add_window_info(token, window_token).await;
        Ok(())
    })
}

// ============================================================================
// Missions and stacks
// ============================================================================

fn dump_state<'a>(
    svc: &'a dyn AbilityManager,
    data: &'a mut Parcel,
    reply: &'a mut Parcel,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let args = rpc::arg(data.read_string())?;
        if args.is_empty() {
            error!("dump state without arguments");
            return Err(Error::InvalidValue);
        }
        let lines = svc.dump_state(&args).await;
        reply.write_string_vector(&lines).map_err(Error::reply)
    })
}

fn list_stack_info<'a>(
    svc: &'a dyn AbilityManager,
    _data: &'a mut Parcel,
    reply: &'a mut Parcel,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let result = svc.get_all_stack_info().await;
        rpc::write_value(reply, result, |r, info| r.write_parcelable(Some(&info)))
    })
}

fn get_recent_missions<'a>(
    svc: &'a dyn AbilityManager,
    data: &'a mut Parcel,
    reply: &'a mut Parcel,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let num_max = rpc::arg(data.read_i32())?;
        let flags = rpc::arg(data.read_i32())?;
        let result = svc.get_recent_missions(num_max, flags).await;
        rpc::write_sequence(reply, result, Parcel::write_parcelable_vector)
    })
}

fn get_mission_snapshot<'a>(
    svc: &'a dyn AbilityManager,
    data: &'a mut Parcel,
    reply: &'a mut Parcel,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let mission_id = rpc::arg(data.read_i32())?;
        let result = svc.get_mission_snapshot(mission_id).await;
        rpc::write_value(reply, result, |r, snapshot| r.write_parcelable(Some(&snapshot)))
    })
}

fn move_mission_to_top<'a>(
    svc: &'a dyn AbilityManager,
    data: &'a mut Parcel,
    reply: &'a mut Parcel,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let mission_id = rpc::arg(data.read_i32())?;
        let result = svc.move_mission_to_top(mission_id).await;
        rpc::write_result(reply, result)
    })
}

fn remove_mission<'a>(
    svc: &'a dyn AbilityManager,
    data: &'a mut Parcel,
    reply: &'a mut Parcel,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let mission_id = rpc::arg(data.read_i32())?;
        let result = svc.remove_mission(mission_id).await;
        rpc::write_result(reply, result)
    })
}

fn remove_stack<'a>(
    svc: &'a dyn AbilityManager,
    data: &'a mut Parcel,
    reply: &'a mut Parcel,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let stack_id = rpc::arg(data.read_i32())?;
        let result = svc.remove_stack(stack_id).await;
        rpc::write_result(reply, result)
    })
}

// ============================================================================
// Processes and bundles
// ============================================================================

fn kill_process<'a>(
    svc: &'a dyn AbilityManager,
    data: &'a mut Parcel,
    reply: &'a mut Parcel,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let bundle_name = rpc::arg(data.read_string())?;
        let result = svc.kill_process(&bundle_name).await;
        rpc::write_result(reply, result)
    })
}

fn uninstall_app<'a>(
    svc: &'a dyn AbilityManager,
    data: &'a mut Parcel,
    reply: &'a mut Parcel,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let bundle_name = rpc::arg(data.read_string())?;
        let result = svc.uninstall_app(&bundle_name).await;
        rpc::write_result(reply, result)
    })
}
