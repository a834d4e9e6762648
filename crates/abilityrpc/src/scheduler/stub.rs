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

use super::AbilityScheduler;
use crate::codes::ABILITY_SCHEDULER_TOKEN;
use crate::codes::AbilitySchedulerCode;
use crate::data::DataAbilityPredicates;
use crate::data::FileMode;
use crate::data::Uri;
use crate::data::ValuesBucket;
use crate::error::ERR_INVALID_STATE;
use crate::error::Error;
use crate::error::Result;
use crate::lifecycle::LifeCycleStateInfo;
use crate::rpc;
use crate::want::PacMap;
use crate::want::Want;

type Handler =
    for<'a> fn(&'a dyn AbilityScheduler, &'a mut Parcel, &'a mut Parcel) -> BoxFuture<'a, Result<()>>;

static HANDLERS: LazyLock<HashMap<u32, Handler>> = LazyLock::new(|| {
    let table: [(AbilitySchedulerCode, Handler); 17] = [
        (AbilitySchedulerCode::ScheduleAbilityTransaction, schedule_ability_transaction),
        (AbilitySchedulerCode::SendResult, send_result),
        (AbilitySchedulerCode::ScheduleAbilityConnect, schedule_connect_ability),
        (AbilitySchedulerCode::ScheduleAbilityDisconnect, schedule_disconnect_ability),
        (AbilitySchedulerCode::ScheduleAbilityCommand, schedule_command_ability),
        (AbilitySchedulerCode::ScheduleSaveAbilityState, schedule_save_ability_state),
        (AbilitySchedulerCode::ScheduleRestoreAbilityState, schedule_restore_ability_state),
        (AbilitySchedulerCode::ScheduleGetFileTypes, get_file_types),
        (AbilitySchedulerCode::ScheduleOpenFile, open_file),
        (AbilitySchedulerCode::ScheduleOpenRawFile, open_raw_file),
        (AbilitySchedulerCode::ScheduleInsert, insert),
        (AbilitySchedulerCode::ScheduleUpdate, update),
        (AbilitySchedulerCode::ScheduleDelete, delete),
        (AbilitySchedulerCode::ScheduleQuery, query),
        (AbilitySchedulerCode::ScheduleGetType, get_type),
        (AbilitySchedulerCode::ScheduleReload, reload),
        (AbilitySchedulerCode::ScheduleBatchInsert, batch_insert),
    ];
    table.into_iter().map(|(code, handler)| (code as u32, handler)).collect()
});

/// Server side of [`AbilityScheduler`].
pub struct AbilitySchedulerStub {
    scheduler: Arc<dyn AbilityScheduler>,
}

impl AbilitySchedulerStub {
    pub fn new(scheduler: Arc<dyn AbilityScheduler>) -> Self {
        Self { scheduler }
    }

    /// Wraps `scheduler` into an in-process handle.
    pub fn local(scheduler: Arc<dyn AbilityScheduler>) -> RemoteHandle {
        LocalObject::handle(Arc::new(Self::new(scheduler)))
    }
}

#[async_trait]
impl RemoteStub for AbilitySchedulerStub {
    fn descriptor(&self) -> &str {
        ABILITY_SCHEDULER_TOKEN
    }

    async fn on_remote_request(
        &self,
        code: u32,
        data: &mut Parcel,
        reply: &mut Parcel,
        _option: MessageOption,
    ) -> i32 {
        if !rpc::check_token(data, ABILITY_SCHEDULER_TOKEN, code) {
            return ERR_INVALID_STATE;
        }
        let Some(handler) = HANDLERS.get(&code) else {
            return ipc::default_on_remote_request(self.descriptor(), code, reply);
        };
        rpc::status(code, handler(self.scheduler.as_ref(), data, reply).await)
    }
}

fn file_mode(data: &mut Parcel) -> Result<FileMode> {
    rpc::arg(data.read_string())?.parse().map_err(Error::argument)
}

// --- Lifecycle ---

fn schedule_ability_transaction<'a>(
    svc: &'a dyn AbilityScheduler,
    data: &'a mut Parcel,
    _reply: &'a mut Parcel,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let want: Want = rpc::required(data, "want")?;
        let state_info: LifeCycleStateInfo = rpc::required(data, "state_info")?;
        svc.schedule_ability_transaction(&want, &state_info).await;
        Ok(())
    })
}

fn send_result<'a>(
    svc: &'a dyn AbilityScheduler,
    data: &'a mut Parcel,
    _reply: &'a mut Parcel,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let request_code = rpc::arg(data.read_i32())?;
        let result_code = rpc::arg(data.read_i32())?;
        let want: Want = rpc::required(data, "result_want")?;
        svc.send_result(request_code, result_code, &want).await;
        Ok(())
    })
}

fn schedule_connect_ability<'a>(
    svc: &'a dyn AbilityScheduler,
    data: &'a mut Parcel,
    _reply: &'a mut Parcel,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let want: Want = rpc::required(data, "want")?;
        svc.schedule_connect_ability(&want).await;
        Ok(())
    })
}

fn schedule_disconnect_ability<'a>(
    svc: &'a dyn AbilityScheduler,
    data: &'a mut Parcel,
    _reply: &'a mut Parcel,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let want: Want = rpc::required(data, "want")?;
        svc.schedule_disconnect_ability(&want).await;
        Ok(())
    })
}

fn schedule_command_ability<'a>(
    svc: &'a dyn AbilityScheduler,
    data: &'a mut Parcel,
    _reply: &'a mut Parcel,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let want: Want = rpc::required(data, "want")?;
        let restart = rpc::arg(data.read_bool())?;
        let start_id = rpc::arg(data.read_i32())?;
        svc.schedule_command_ability(&want, restart, start_id).await;
        Ok(())
    })
}

fn schedule_save_ability_state<'a>(
    svc: &'a dyn AbilityScheduler,
    _data: &'a mut Parcel,
    reply: &'a mut Parcel,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let result = svc.schedule_save_ability_state().await;
        rpc::write_value(reply, result, |r, state| r.write_parcelable(Some(&state)))
    })
}

fn schedule_restore_ability_state<'a>(
    svc: &'a dyn AbilityScheduler,
    data: &'a mut Parcel,
    _reply: &'a mut Parcel,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let state: PacMap = rpc::required(data, "state")?;
        svc.schedule_restore_ability_state(&state).await;
        Ok(())
    })
}

// --- Data access ---

fn get_file_types<'a>(
    svc: &'a dyn AbilityScheduler,
    data: &'a mut Parcel,
    reply: &'a mut Parcel,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let uri: Uri = rpc::required(data, "uri")?;
        let mime_filter = rpc::arg(data.read_string())?;
        let result = svc.get_file_types(&uri, &mime_filter).await;
        rpc::write_sequence(reply, result, Parcel::write_string_vector)
    })
}

fn open_file<'a>(
    svc: &'a dyn AbilityScheduler,
    data: &'a mut Parcel,
    reply: &'a mut Parcel,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let uri: Uri = rpc::required(data, "uri")?;
        let mode = file_mode(data)?;
        let result = svc.open_file(&uri, mode).await;
        rpc::write_value(reply, result, |r, fd| r.write_file_descriptor(&fd))
    })
}

fn open_raw_file<'a>(
    svc: &'a dyn AbilityScheduler,
    data: &'a mut Parcel,
    reply: &'a mut Parcel,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let uri: Uri = rpc::required(data, "uri")?;
        let mode = file_mode(data)?;
        let result = svc.open_raw_file(&uri, mode).await;
        rpc::write_value(reply, result, |r, fd| r.write_file_descriptor(&fd))
    })
}

fn insert<'a>(
    svc: &'a dyn AbilityScheduler,
    data: &'a mut Parcel,
    reply: &'a mut Parcel,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let uri: Uri = rpc::required(data, "uri")?;
        let value: ValuesBucket = rpc::required(data, "value")?;
        let result = svc.insert(&uri, &value).await;
        rpc::write_value(reply, result, Parcel::write_i32)
    })
}

fn update<'a>(
    svc: &'a dyn AbilityScheduler,
    data: &'a mut Parcel,
    reply: &'a mut Parcel,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let uri: Uri = rpc::required(data, "uri")?;
        let value: ValuesBucket = rpc::required(data, "value")?;
        let predicates: DataAbilityPredicates = rpc::required(data, "predicates")?;
        let result = svc.update(&uri, &value, &predicates).await;
        rpc::write_value(reply, result, Parcel::write_i32)
    })
}

fn delete<'a>(
    svc: &'a dyn AbilityScheduler,
    data: &'a mut Parcel,
    reply: &'a mut Parcel,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let uri: Uri = rpc::required(data, "uri")?;
        let predicates: DataAbilityPredicates = rpc::required(data, "predicates")?;
        let result = svc.delete(&uri, &predicates).await;
        rpc::write_value(reply, result, Parcel::write_i32)
    })
}

fn query<'a>(
    svc: &'a dyn AbilityScheduler,
    data: &'a mut Parcel,
    reply: &'a mut Parcel,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let uri: Uri = rpc::required(data, "uri")?;
        let columns = rpc::arg(data.read_string_vector())?;
        let predicates: DataAbilityPredicates = rpc::required(data, "predicates")?;
        let result = svc.query(&uri, &columns, &predicates).await;
        rpc::write_value(reply, result, |r, set| r.write_parcelable(set.as_ref()))
    })
}

fn get_type<'a>(
    svc: &'a dyn AbilityScheduler,
    data: &'a mut Parcel,
    reply: &'a mut Parcel,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let uri: Uri = rpc::required(data, "uri")?;
        let result = svc.get_type(&uri).await;
        rpc::write_value(reply, result, |r, mime| r.write_string(&mime))
    })
}

fn reload<'a>(
    svc: &'a dyn AbilityScheduler,
    data: &'a mut Parcel,
    reply: &'a mut Parcel,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let uri: Uri = rpc::required(data, "uri")?;
        let extras: PacMap = rpc::required(data, "extras")?;
        let result = svc.reload(&uri, &extras).await;
        rpc::write_value(reply, result, Parcel::write_bool)
    })
}

fn batch_insert<'a>(
    svc: &'a dyn AbilityScheduler,
    data: &'a mut Parcel,
    reply: &'a mut Parcel,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let uri: Uri = rpc::required(data, "uri")?;
        let values: Vec<ValuesBucket> = rpc::arg(data.read_parcelable_vector())?;
        let result = svc.batch_insert(&uri, &values).await;
        rpc::write_value(reply, result, Parcel::write_i32)
    })
}
