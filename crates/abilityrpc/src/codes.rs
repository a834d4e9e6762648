//! Interface tokens and command codes.
//!
//! These tables are the wire protocol's opcodes. Proxies and stubs built from
//! different revisions interoperate only while the numbers stay put.

pub const ABILITY_MANAGER_TOKEN: &str = "ohos.aafwk.AbilityManager";
pub const ABILITY_SCHEDULER_TOKEN: &str = "ohos.aafwk.AbilityScheduler";
pub const ABILITY_CONNECTION_TOKEN: &str = "ohos.aafwk.AbilityConnection";

/// Operations of the ability manager contract.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AbilityManagerCode {
    // Reported by ability threads
    TerminateAbility = 1,
    AttachAbilityThread = 2,
    AbilityTransitionDone = 3,
    ConnectAbilityDone = 4,
    DisconnectAbilityDone = 5,
    AddWindowInfo = 6,
    TerminateAbilityResult = 7,
    ListStackInfo = 8,
    GetRecentMission = 9,
    RemoveMission = 10,
    RemoveStack = 11,
    CommandAbilityDone = 12,
    GetMissionSnapshot = 13,
    AcquireDataAbility = 14,
    ReleaseDataAbility = 15,
    MoveMissionToTop = 16,
    KillProcess = 17,
    UninstallApp = 18,
    TerminateAbilityByCaller = 19,

    // Starting abilities
    StartAbility = 1001,
    StartAbilityAddCaller = 1002,
    StopServiceAbility = 1003,

    // Service connections
    ConnectAbility = 1101,
    DisconnectAbility = 1102,

    DumpState = 2001,
}

impl AbilityManagerCode {
    pub const ALL: [Self; 25] = [
        Self::TerminateAbility,
        Self::AttachAbilityThread,
        Self::AbilityTransitionDone,
        Self::ConnectAbilityDone,
        Self::DisconnectAbilityDone,
        Self::AddWindowInfo,
        Self::TerminateAbilityResult,
        Self::ListStackInfo,
        Self::GetRecentMission,
        Self::RemoveMission,
        Self::RemoveStack,
        Self::CommandAbilityDone,
        Self::GetMissionSnapshot,
        Self::AcquireDataAbility,
        Self::ReleaseDataAbility,
        Self::MoveMissionToTop,
        Self::KillProcess,
        Self::UninstallApp,
        Self::TerminateAbilityByCaller,
        Self::StartAbility,
        Self::StartAbilityAddCaller,
        Self::StopServiceAbility,
        Self::ConnectAbility,
        Self::DisconnectAbility,
        Self::DumpState,
    ];

    pub fn from_u32(code: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|c| *c as u32 == code)
    }
}

/// Operations of the ability scheduler contract.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AbilitySchedulerCode {
    // Lifecycle
    ScheduleAbilityTransaction = 1,
    SendResult = 2,
    ScheduleAbilityConnect = 3,
    ScheduleAbilityDisconnect = 4,
    ScheduleAbilityCommand = 5,
    ScheduleSaveAbilityState = 6,
    ScheduleRestoreAbilityState = 7,

    // Data access
    ScheduleGetFileTypes = 8,
    ScheduleOpenFile = 9,
    ScheduleOpenRawFile = 10,
    ScheduleInsert = 11,
    ScheduleUpdate = 12,
    ScheduleDelete = 13,
    ScheduleQuery = 14,
    ScheduleGetType = 15,
    ScheduleReload = 16,
    ScheduleBatchInsert = 17,
}

impl AbilitySchedulerCode {
    pub const ALL: [Self; 17] = [
        Self::ScheduleAbilityTransaction,
        Self::SendResult,
        Self::ScheduleAbilityConnect,
        Self::ScheduleAbilityDisconnect,
        Self::ScheduleAbilityCommand,
        Self::ScheduleSaveAbilityState,
        Self::ScheduleRestoreAbilityState,
        Self::ScheduleGetFileTypes,
        Self::ScheduleOpenFile,
        Self::ScheduleOpenRawFile,
        Self::ScheduleInsert,
        Self::ScheduleUpdate,
        Self::ScheduleDelete,
        Self::ScheduleQuery,
        Self::ScheduleGetType,
        Self::ScheduleReload,
        Self::ScheduleBatchInsert,
    ];

    pub fn from_u32(code: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|c| *c as u32 == code)
    }
}

/// Callbacks of the ability connection contract.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AbilityConnectionCode {
    OnAbilityConnectDone = 1,
    OnAbilityDisconnectDone = 2,
}

impl AbilityConnectionCode {
    pub const ALL: [Self; 2] = [Self::OnAbilityConnectDone, Self::OnAbilityDisconnectDone];

    pub fn from_u32(code: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|c| *c as u32 == code)
    }
}
