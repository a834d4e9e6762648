mod common;

use std::os::fd::AsRawFd;
use std::sync::Arc;

use abilityrpc::*;
use ipc::ChannelConfig;
use ipc::MessageOption;
use ipc::Parcel;
use ipc::RemoteStub;

use common::*;

// ============================================================================
//  HELPERS
// ============================================================================

fn uri() -> Uri {
    Uri::new("dataability:///com.example.notes/note")
}

fn row(title: &str) -> ValuesBucket {
    let mut row = ValuesBucket::new();
    row.put_string("title", title).put_int("stars", 3);
    row
}

fn over_channel(scheduler: Arc<RecordingScheduler>) -> (AbilitySchedulerProxy, ipc::ChannelServer) {
    init_tracing();
    let stub = Arc::new(AbilitySchedulerStub::new(scheduler));
    let (remote, server) = ipc::channel(stub, ChannelConfig::default());
    (AbilitySchedulerProxy::new(remote), server)
}

fn request() -> anyhow::Result<Parcel> {
    let mut data = Parcel::new();
    data.write_interface_token(ABILITY_SCHEDULER_TOKEN)?;
    Ok(data)
}

async fn dispatch(stub: &AbilitySchedulerStub, code: AbilitySchedulerCode, data: &mut Parcel) -> (i32, Parcel) {
    let mut reply = Parcel::new();
    let status = stub.on_remote_request(code as u32, data, &mut reply, MessageOption::sync()).await;
    (status, reply)
}

// ============================================================================
//  LIFECYCLE
// ============================================================================

#[tokio::test]
async fn test_lifecycle_notifications() -> anyhow::Result<()> {
    let scheduler = Arc::new(RecordingScheduler::default());
    let (proxy, _server) = over_channel(scheduler.clone());
    let want = Want::make_main_ability(ElementName::new("", "b", "a"));

    let info = LifeCycleStateInfo::new(AbilityLifeCycleState::Active, false);
    proxy.schedule_ability_transaction(&want, &info).await;
    proxy.send_result(1, -1, &want).await;
    proxy.schedule_connect_ability(&want).await;
    proxy.schedule_disconnect_ability(&want).await;
    proxy.schedule_command_ability(&want, true, 4).await;

    assert_eq!(
        scheduler.calls.take(),
        [
            "transaction /b/a Active false",
            "send_result 1 -1 action.system.home",
            "connect /b/a",
            "disconnect /b/a",
            "command true 4",
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_save_and_restore_state() -> anyhow::Result<()> {
    let mut saved = PacMap::new();
    saved.set("scroll", 120);
    saved.set("draft", "hello");
    let scheduler = Arc::new(RecordingScheduler { saved: saved.clone(), ..Default::default() });
    let (proxy, _server) = over_channel(scheduler.clone());

    let state = proxy.schedule_save_ability_state().await?;
    assert_eq!(state, saved);

    proxy.schedule_restore_ability_state(&state).await;
    assert_eq!(scheduler.restored.lock().unwrap().as_ref(), Some(&saved));
    Ok(())
}

#[tokio::test]
async fn test_notification_failure_is_not_surfaced() {
    init_tracing();
    let remote = ScriptedRemote::new(7, vec![]);
    let proxy = AbilitySchedulerProxy::new(remote.clone());
    proxy.schedule_connect_ability(&Want::new()).await;
    assert_eq!(remote.sends(), 1);
}

// ============================================================================
//  DATA ACCESS
// ============================================================================

#[tokio::test]
async fn test_crud_over_channel() -> anyhow::Result<()> {
    let scheduler = Arc::new(RecordingScheduler::default());
    let (proxy, _server) = over_channel(scheduler.clone());
    let all = DataAbilityPredicates::new("1 = 1");

    assert_eq!(proxy.insert(&uri(), &row("first")).await?, 0);
    assert_eq!(proxy.batch_insert(&uri(), &[row("second"), row("third")]).await?, 2);

    let mut stars = ValuesBucket::new();
    stars.put_int("stars", 5);
    assert_eq!(proxy.update(&uri(), &stars, &all).await?, 3);

    let columns = vec!["title".to_string(), "stars".to_string()];
    let set = proxy.query(&uri(), &columns, &all).await?.expect("result set");
    assert_eq!(set.row_count(), 3);
    assert_eq!(set.get(2, "title"), Some(&ValueObject::String("third".into())));
    assert_eq!(set.get(0, "stars"), Some(&ValueObject::Int(5)));

    assert_eq!(proxy.get_type(&uri()).await?, "text/plain");
    assert_eq!(proxy.get_file_types(&uri(), "text/*").await?, ["text/plain", "text/html"]);

    let mut extras = PacMap::new();
    extras.set("force", true);
    assert!(proxy.reload(&uri(), &extras).await?);
    assert!(!proxy.reload(&uri(), &PacMap::new()).await?);

    assert_eq!(proxy.delete(&uri(), &all).await?, 3);
    assert!(scheduler.rows.lock().unwrap().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_query_without_result_set() -> anyhow::Result<()> {
    let scheduler = Arc::new(RecordingScheduler { empty_query: true, ..Default::default() });
    let (proxy, _server) = over_channel(scheduler.clone());

    let columns = vec!["col1".to_string(), "col2".to_string()];
    let predicates = DataAbilityPredicates::new("col1 = ?").with_args(["x"]);
    assert_eq!(proxy.query(&uri(), &columns, &predicates).await?, None);
    assert_eq!(scheduler.calls.take(), [format!("query {} col1,col2", uri())]);
    Ok(())
}

#[tokio::test]
async fn test_open_file_hands_over_a_descriptor() -> anyhow::Result<()> {
    let scheduler = Arc::new(RecordingScheduler::default());
    let (proxy, _server) = over_channel(scheduler.clone());

    let fd = proxy.open_file(&uri(), FileMode::Read).await?;
    assert!(fd.as_raw_fd() >= 0);
    let raw = proxy.open_raw_file(&uri(), FileMode::ReadWriteTruncate).await?;
    assert_ne!(fd.as_raw_fd(), raw.as_raw_fd());
    assert_eq!(
        scheduler.calls.take(),
        [format!("open_file {} r", uri()), format!("open_raw_file {} rwt", uri())]
    );
    Ok(())
}

#[tokio::test]
async fn test_unknown_file_mode_is_rejected() -> anyhow::Result<()> {
    let scheduler = Arc::new(RecordingScheduler::default());
    let stub = AbilitySchedulerStub::new(scheduler.clone());

    let mut data = request()?;
    data.write_parcelable(Some(&uri()))?;
    data.write_string("rx")?;
    let (status, _) = dispatch(&stub, AbilitySchedulerCode::ScheduleOpenFile, &mut data).await;
    assert_eq!(status, ERR_INVALID_VALUE);
    assert!(scheduler.calls.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_insert_releases_rows_on_every_path() -> anyhow::Result<()> {
    init_tracing();
    let scheduler = Arc::new(RecordingScheduler::default());
    let stub = AbilitySchedulerStub::new(scheduler.clone());

    for i in 0..4 {
        let mut data = request()?;
        data.write_parcelable(Some(&uri()))?;
        data.write_parcelable(Some(&row("kept")))?;
        let (status, mut reply) = dispatch(&stub, AbilitySchedulerCode::ScheduleInsert, &mut data).await;
        assert_eq!(status, ERR_OK);
        assert_eq!(reply.read_i32()?, ERR_OK);
        assert_eq!(reply.read_i32()?, i);

        let mut data = request()?;
        data.write_parcelable(Some(&uri()))?;
        data.write_parcelable::<ValuesBucket>(None)?;
        let (status, reply) = dispatch(&stub, AbilitySchedulerCode::ScheduleInsert, &mut data).await;
        assert_eq!(status, ERR_INVALID_VALUE);
        assert_eq!(reply.data_size(), 0);
    }

    assert_eq!(scheduler.calls.len(), 4);
    assert_eq!(scheduler.rows.lock().unwrap().len(), 4);
    // The stub holds the only other reference.
    assert_eq!(Arc::strong_count(&scheduler), 2);
    Ok(())
}

#[tokio::test]
async fn test_stub_rejects_absent_filters() -> anyhow::Result<()> {
    init_tracing();
    let scheduler = Arc::new(RecordingScheduler::default());
    let stub = AbilitySchedulerStub::new(scheduler.clone());

    let mut data = request()?;
    data.write_parcelable(Some(&uri()))?;
    data.write_parcelable(Some(&row("x")))?;
    data.write_parcelable::<DataAbilityPredicates>(None)?;
    assert_eq!(dispatch(&stub, AbilitySchedulerCode::ScheduleUpdate, &mut data).await.0, ERR_INVALID_VALUE);

    let mut data = request()?;
    data.write_parcelable(Some(&uri()))?;
    data.write_parcelable::<DataAbilityPredicates>(None)?;
    assert_eq!(dispatch(&stub, AbilitySchedulerCode::ScheduleDelete, &mut data).await.0, ERR_INVALID_VALUE);

    let mut data = request()?;
    data.write_parcelable::<Uri>(None)?;
    assert_eq!(dispatch(&stub, AbilitySchedulerCode::ScheduleGetType, &mut data).await.0, ERR_INVALID_VALUE);

    let mut data = request()?;
    data.write_parcelable(Some(&uri()))?;
    data.write_string_vector(&["a".to_string()])?;
    data.write_parcelable::<DataAbilityPredicates>(None)?;
    assert_eq!(dispatch(&stub, AbilitySchedulerCode::ScheduleQuery, &mut data).await.0, ERR_INVALID_VALUE);

    assert!(scheduler.calls.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_token_gate_covers_every_scheduler_code() -> anyhow::Result<()> {
    let scheduler = Arc::new(RecordingScheduler::default());
    let stub = AbilitySchedulerStub::new(scheduler.clone());

    for code in AbilitySchedulerCode::ALL {
        let mut data = Parcel::new();
        data.write_interface_token(ABILITY_MANAGER_TOKEN)?;
        data.write_parcelable(Some(&uri()))?;
        assert_eq!(dispatch(&stub, code, &mut data).await.0, ERR_INVALID_STATE, "{:?}", code);
    }
    assert!(scheduler.calls.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_get_file_types_reply_layout() -> anyhow::Result<()> {
    let scheduler = Arc::new(RecordingScheduler::default());
    let stub = AbilitySchedulerStub::new(scheduler);

    let mut data = request()?;
    data.write_parcelable(Some(&uri()))?;
    data.write_string("text/*")?;
    let (status, mut reply) = dispatch(&stub, AbilitySchedulerCode::ScheduleGetFileTypes, &mut data).await;
    assert_eq!(status, ERR_OK);
    assert_eq!(reply.read_string_vector()?, ["text/plain", "text/html"]);
    assert_eq!(reply.read_i32()?, ERR_OK);
    assert_eq!(reply.remaining(), 0);
    Ok(())
}
