//! Test doubles shared by the contract tests.

#![allow(dead_code)]

use std::os::fd::OwnedFd;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::Once;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use abilityrpc::*;
use async_trait::async_trait;
use ipc::DeathRecipient;
use ipc::MessageOption;
use ipc::Parcel;
use ipc::RemoteHandle;
use ipc::RemoteObject;
use ipc::RemoteStub;

static TRACING: Once = Once::new();

/// Routes `tracing` output through the test harness. `RUST_LOG` picks the level.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Call log shared by the recording services.
#[derive(Default)]
pub struct Calls(Mutex<Vec<String>>);

impl Calls {
    pub fn push(&self, call: String) {
        self.0.lock().unwrap().push(call);
    }

    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }

    pub fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn outcome(fail_with: Option<i32>) -> Result<()> {
    match fail_with {
        Some(code) => Err(Error::Application(code)),
        None => Ok(()),
    }
}

/// A stub-side object handed out as a token. Answers nothing.
pub struct Token;

#[async_trait]
impl RemoteStub for Token {
    fn descriptor(&self) -> &str {
        "test.Token"
    }

    async fn on_remote_request(&self, code: u32, _: &mut Parcel, reply: &mut Parcel, _: MessageOption) -> i32 {
        ipc::default_on_remote_request(self.descriptor(), code, reply)
    }
}

pub fn token() -> RemoteHandle {
    ipc::LocalObject::handle(Arc::new(Token))
}

// ============================================================================
//  ABILITY MANAGER
// ============================================================================

/// Records every call. Returns `fail_with` as an application error when set.
#[derive(Default)]
pub struct RecordingManager {
    pub calls: Calls,
    pub fail_with: Option<i32>,
    pub recent: Vec<RecentMissionInfo>,
    pub stacks: StackInfo,
    pub data_ability: Option<RemoteHandle>,
    pub last_want: Mutex<Option<Want>>,
}

impl RecordingManager {
    fn record(&self, call: String, want: Option<&Want>) -> Result<()> {
        self.calls.push(call);
        if let Some(want) = want {
            *self.last_want.lock().unwrap() = Some(want.clone());
        }
        outcome(self.fail_with)
    }

    pub fn last_want(&self) -> Option<Want> {
        self.last_want.lock().unwrap().clone()
    }
}

#[async_trait]
impl AbilityManager for RecordingManager {
    async fn start_ability(&self, want: &Want, request_code: i32) -> Result<()> {
        self.record(format!("start_ability {}", request_code), Some(want))
    }

    async fn start_ability_with_caller(
        &self,
        want: &Want,
        caller_token: Option<RemoteHandle>,
        request_code: i32,
    ) -> Result<()> {
        let call = format!("start_ability_with_caller {} {}", caller_token.is_some(), request_code);
        self.record(call, Some(want))
    }

    async fn terminate_ability(&self, _token: RemoteHandle, result_code: i32, result_want: Option<&Want>) -> Result<()> {
        self.record(format!("terminate_ability {}", result_code), result_want)
    }

    async fn terminate_ability_by_caller(&self, _caller_token: RemoteHandle, request_code: i32) -> Result<()> {
        self.record(format!("terminate_ability_by_caller {}", request_code), None)
    }

    async fn terminate_ability_result(&self, _token: RemoteHandle, start_id: i32) -> Result<()> {
        self.record(format!("terminate_ability_result {}", start_id), None)
    }

    async fn stop_service_ability(&self, want: &Want) -> Result<()> {
        self.record("stop_service_ability".into(), Some(want))
    }

    async fn connect_ability(
        &self,
        want: &Want,
        connect: Option<RemoteHandle>,
        caller_token: Option<RemoteHandle>,
    ) -> Result<()> {
        let call = format!("connect_ability {} {}", connect.is_some(), caller_token.is_some());
        if let Some(connect) = connect {
            AbilityConnectionProxy::new(connect).on_ability_connect_done(want.element(), None, 0).await;
        }
        self.record(call, Some(want))
    }

    async fn disconnect_ability(&self, connect: Option<RemoteHandle>) -> Result<()> {
        self.record(format!("disconnect_ability {}", connect.is_some()), None)
    }

    async fn acquire_data_ability(
        &self,
        uri: &Uri,
        try_bind: bool,
        _caller_token: Option<RemoteHandle>,
    ) -> Result<RemoteHandle> {
        self.record(format!("acquire_data_ability {} {}", uri, try_bind), None)?;
        self.data_ability.clone().ok_or(Error::Application(error::DATA_ABILITY_NOT_FOUND))
    }

    async fn release_data_ability(
        &self,
        scheduler: Option<RemoteHandle>,
        caller_token: Option<RemoteHandle>,
    ) -> Result<()> {
        let call = format!("release_data_ability {} {}", scheduler.is_some(), caller_token.is_some());
        self.record(call, None)
    }

    async fn attach_ability_thread(&self, scheduler: Option<RemoteHandle>, _token: RemoteHandle) -> Result<()> {
        self.record(format!("attach_ability_thread {}", scheduler.is_some()), None)
    }

    async fn ability_transition_done(&self, _token: RemoteHandle, state: AbilityLifeCycleState) -> Result<()> {
        self.record(format!("ability_transition_done {:?}", state), None)
    }

    async fn schedule_connect_ability_done(
        &self,
        _token: RemoteHandle,
        remote_object: Option<RemoteHandle>,
    ) -> Result<()> {
        self.record(format!("schedule_connect_ability_done {}", remote_object.is_some()), None)
    }

    async fn schedule_disconnect_ability_done(&self, _token: RemoteHandle) -> Result<()> {
        self.record("schedule_disconnect_ability_done".into(), None)
    }

    async fn schedule_command_ability_done(&self, _token: RemoteHandle) -> Result<()> {
        self.record("schedule_command_ability_done".into(), None)
    }

    async fn add_window_info(&self, _token: RemoteHandle, window_token: i32) {
        self.calls.push(format!("add_window_info {}", window_token));
    }

    async fn dump_state(&self, args: &str) -> Vec<String> {
        self.calls.push(format!("dump_state {}", args));
        vec![format!("dump {}", args), "done".to_string()]
    }

    async fn get_all_stack_info(&self) -> Result<StackInfo> {
        self.record("get_all_stack_info".into(), None)?;
        Ok(self.stacks.clone())
    }

    async fn get_recent_missions(&self, num_max: i32, flags: i32) -> Result<Vec<RecentMissionInfo>> {
        self.record(format!("get_recent_missions {} {}", num_max, flags), None)?;
        let take = usize::try_from(num_max).unwrap_or(0);
        Ok(self.recent.iter().take(take).cloned().collect())
    }

    async fn get_mission_snapshot(&self, mission_id: i32) -> Result<MissionSnapshotInfo> {
        self.record(format!("get_mission_snapshot {}", mission_id), None)?;
        Ok(MissionSnapshotInfo { width: 1, height: 1, pixels: vec![mission_id as u8; 4], ..Default::default() })
    }

    async fn move_mission_to_top(&self, mission_id: i32) -> Result<()> {
        self.record(format!("move_mission_to_top {}", mission_id), None)
    }

    async fn remove_mission(&self, mission_id: i32) -> Result<()> {
        self.record(format!("remove_mission {}", mission_id), None)
    }

    async fn remove_stack(&self, stack_id: i32) -> Result<()> {
        self.record(format!("remove_stack {}", stack_id), None)
    }

    async fn kill_process(&self, bundle_name: &str) -> Result<()> {
        self.record(format!("kill_process {}", bundle_name), None)
    }

    async fn uninstall_app(&self, bundle_name: &str) -> Result<()> {
        self.record(format!("uninstall_app {}", bundle_name), None)
    }
}

// ============================================================================
//  ABILITY SCHEDULER
// ============================================================================

/// A data ability over one in-memory table, plus a lifecycle call log.
#[derive(Default)]
pub struct RecordingScheduler {
    pub calls: Calls,
    pub rows: Mutex<Vec<ValuesBucket>>,
    pub saved: PacMap,
    pub restored: Mutex<Option<PacMap>>,
    /// `query` answers with no result set when set.
    pub empty_query: bool,
}

impl RecordingScheduler {
    fn open(&self) -> Result<OwnedFd> {
        std::fs::File::open("/dev/null").map(OwnedFd::from).map_err(|_| Error::Application(-2))
    }
}

#[async_trait]
impl AbilityScheduler for RecordingScheduler {
    async fn schedule_ability_transaction(&self, want: &Want, state_info: &LifeCycleStateInfo) {
        let call =
            format!("transaction {} {:?} {}", want.element(), state_info.state, state_info.is_new_want);
        self.calls.push(call);
    }

    async fn send_result(&self, request_code: i32, result_code: i32, result_want: &Want) {
        self.calls.push(format!("send_result {} {} {}", request_code, result_code, result_want.action()));
    }

    async fn schedule_connect_ability(&self, want: &Want) {
        self.calls.push(format!("connect {}", want.element()));
    }

    async fn schedule_disconnect_ability(&self, want: &Want) {
        self.calls.push(format!("disconnect {}", want.element()));
    }

    async fn schedule_command_ability(&self, _want: &Want, restart: bool, start_id: i32) {
        self.calls.push(format!("command {} {}", restart, start_id));
    }

    async fn schedule_save_ability_state(&self) -> Result<PacMap> {
        self.calls.push("save".into());
        Ok(self.saved.clone())
    }

    async fn schedule_restore_ability_state(&self, state: &PacMap) {
        self.calls.push("restore".into());
        *self.restored.lock().unwrap() = Some(state.clone());
    }

    async fn get_file_types(&self, uri: &Uri, mime_filter: &str) -> Result<Vec<String>> {
        self.calls.push(format!("get_file_types {} {}", uri, mime_filter));
        Ok(vec!["text/plain".into(), "text/html".into()])
    }

    async fn open_file(&self, uri: &Uri, mode: FileMode) -> Result<OwnedFd> {
        self.calls.push(format!("open_file {} {}", uri, mode));
        self.open()
    }

    async fn open_raw_file(&self, uri: &Uri, mode: FileMode) -> Result<OwnedFd> {
        self.calls.push(format!("open_raw_file {} {}", uri, mode));
        self.open()
    }

    async fn insert(&self, uri: &Uri, value: &ValuesBucket) -> Result<i32> {
        self.calls.push(format!("insert {}", uri));
        let mut rows = self.rows.lock().unwrap();
        rows.push(value.clone());
        Ok(rows.len() as i32 - 1)
    }

    async fn update(&self, uri: &Uri, value: &ValuesBucket, predicates: &DataAbilityPredicates) -> Result<i32> {
        self.calls.push(format!("update {} {}", uri, predicates.where_clause));
        let mut rows = self.rows.lock().unwrap();
        for row in rows.iter_mut() {
            for (column, v) in value.iter() {
                row.put(column, v.clone());
            }
        }
        Ok(rows.len() as i32)
    }

    async fn delete(&self, uri: &Uri, predicates: &DataAbilityPredicates) -> Result<i32> {
        self.calls.push(format!("delete {} {}", uri, predicates.where_clause));
        let mut rows = self.rows.lock().unwrap();
        let removed = rows.len() as i32;
        rows.clear();
        Ok(removed)
    }

    async fn query(
        &self,
        uri: &Uri,
        columns: &[String],
        _predicates: &DataAbilityPredicates,
    ) -> Result<Option<ResultSet>> {
        self.calls.push(format!("query {} {}", uri, columns.join(",")));
        if self.empty_query {
            return Ok(None);
        }
        let mut set = ResultSet::new(columns.to_vec());
        for row in self.rows.lock().unwrap().iter() {
            let cells = columns.iter().map(|c| row.get(c).cloned().unwrap_or_default()).collect();
            set.push_row(cells);
        }
        Ok(Some(set))
    }

    async fn get_type(&self, uri: &Uri) -> Result<String> {
        self.calls.push(format!("get_type {}", uri));
        Ok("text/plain".into())
    }

    async fn reload(&self, uri: &Uri, extras: &PacMap) -> Result<bool> {
        self.calls.push(format!("reload {} {}", uri, extras.len()));
        Ok(!extras.is_empty())
    }

    async fn batch_insert(&self, uri: &Uri, values: &[ValuesBucket]) -> Result<i32> {
        self.calls.push(format!("batch_insert {} {}", uri, values.len()));
        self.rows.lock().unwrap().extend_from_slice(values);
        Ok(values.len() as i32)
    }
}

// ============================================================================
//  ABILITY CONNECTION
// ============================================================================

#[derive(Default)]
pub struct RecordingConnection {
    pub calls: Calls,
}

#[async_trait]
impl AbilityConnection for RecordingConnection {
    async fn on_ability_connect_done(&self, element: &ElementName, remote: Option<RemoteHandle>, result_code: i32) {
        self.calls.push(format!("connected {} {} {}", element, remote.is_some(), result_code));
    }

    async fn on_ability_disconnect_done(&self, element: &ElementName, result_code: i32) {
        self.calls.push(format!("disconnected {} {}", element, result_code));
    }
}

// ============================================================================
//  TRANSPORT DOUBLES
// ============================================================================

/// A remote object that answers every request with `status`. On success the
/// reply holds the i32s in `reply`.
pub struct ScriptedRemote {
    pub status: i32,
    pub reply: Vec<i32>,
    pub sends: AtomicUsize,
    pub last_request: Mutex<Option<(u32, Parcel)>>,
}

impl ScriptedRemote {
    pub fn new(status: i32, reply: Vec<i32>) -> Arc<Self> {
        Arc::new(Self { status, reply, sends: AtomicUsize::new(0), last_request: Mutex::new(None) })
    }

    pub fn sends(&self) -> usize {
        self.sends.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteObject for ScriptedRemote {
    async fn send_request(
        &self,
        code: u32,
        data: &mut Parcel,
        reply: &mut Parcel,
        _option: MessageOption,
    ) -> i32 {
        self.sends.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some((code, std::mem::take(data)));
        if self.status == ERR_OK {
            for v in &self.reply {
                reply.write_i32(*v).unwrap();
            }
        }
        self.status
    }

    fn add_death_recipient(&self, _recipient: Arc<dyn DeathRecipient>) -> bool {
        false
    }

    fn remove_death_recipient(&self, _recipient: &Arc<dyn DeathRecipient>) -> bool {
        false
    }

    fn is_proxy(&self) -> bool {
        true
    }
}

#[derive(Default)]
pub struct CountingRecipient {
    pub deaths: AtomicUsize,
}

impl DeathRecipient for CountingRecipient {
    fn on_remote_died(&self) {
        self.deaths.fetch_add(1, Ordering::SeqCst);
    }
}

impl CountingRecipient {
    pub fn deaths(&self) -> usize {
        self.deaths.load(Ordering::SeqCst)
    }

    pub async fn wait_for(&self, expected: usize) {
        for _ in 0..200 {
            if self.deaths() >= expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}
