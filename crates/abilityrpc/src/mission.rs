//! # Mission Records
//!
//! What the ability manager reports about its stacks and missions.
//!
//! `StackInfo` holds mission stacks, a stack holds missions, and a mission holds
//! the ability records started inside it.

use ipc::Parcel;
use ipc::Parcelable;

use crate::want::ElementName;
use crate::want::Want;

/// Include missions excluded from the recents list.
pub const RECENT_WITH_EXCLUDED: i32 = 0x0000_0001;
/// Skip missions whose abilities can no longer be started.
pub const RECENT_IGNORE_UNAVAILABLE: i32 = 0x0000_0002;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AbilityRecordInfo {
    pub id: i32,
    pub element: ElementName,
    pub main_name: String,
    pub state: i32,
    pub app_name: String,
    pub start_time: String,
}

impl Parcelable for AbilityRecordInfo {
    fn marshal(&self, parcel: &mut Parcel) -> ipc::Result<()> {
        parcel.write_i32(self.id)?;
        parcel.write_parcelable(Some(&self.element))?;
        parcel.write_string16(&self.main_name)?;
        parcel.write_i32(self.state)?;
        parcel.write_string16(&self.app_name)?;
        parcel.write_string16(&self.start_time)
    }

    fn unmarshal(parcel: &mut Parcel) -> ipc::Result<Self> {
        Ok(Self {
            id: parcel.read_i32()?,
            element: parcel.read_parcelable().ok_or(ipc::Error::MissingRecord)?,
            main_name: parcel.read_string16()?,
            state: parcel.read_i32()?,
            app_name: parcel.read_string16()?,
            start_time: parcel.read_string16()?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MissionRecordInfo {
    pub id: i32,
    pub abilities: Vec<AbilityRecordInfo>,
}

impl Parcelable for MissionRecordInfo {
    fn marshal(&self, parcel: &mut Parcel) -> ipc::Result<()> {
        parcel.write_i32(self.id)?;
        parcel.write_parcelable_vector(&self.abilities)
    }

    fn unmarshal(parcel: &mut Parcel) -> ipc::Result<Self> {
        Ok(Self { id: parcel.read_i32()?, abilities: parcel.read_parcelable_vector()? })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MissionStackInfo {
    pub id: i32,
    pub missions: Vec<MissionRecordInfo>,
}

impl Parcelable for MissionStackInfo {
    fn marshal(&self, parcel: &mut Parcel) -> ipc::Result<()> {
        parcel.write_i32(self.id)?;
        parcel.write_parcelable_vector(&self.missions)
    }

    fn unmarshal(parcel: &mut Parcel) -> ipc::Result<Self> {
        Ok(Self { id: parcel.read_i32()?, missions: parcel.read_parcelable_vector()? })
    }
}

/// Every mission stack the manager holds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StackInfo {
    pub stacks: Vec<MissionStackInfo>,
}

impl Parcelable for StackInfo {
    fn marshal(&self, parcel: &mut Parcel) -> ipc::Result<()> {
        parcel.write_parcelable_vector(&self.stacks)
    }

    fn unmarshal(parcel: &mut Parcel) -> ipc::Result<Self> {
        Ok(Self { stacks: parcel.read_parcelable_vector()? })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MissionDescriptionInfo {
    pub label: String,
    pub icon_path: String,
}

impl Parcelable for MissionDescriptionInfo {
    fn marshal(&self, parcel: &mut Parcel) -> ipc::Result<()> {
        parcel.write_string16(&self.label)?;
        parcel.write_string16(&self.icon_path)
    }

    fn unmarshal(parcel: &mut Parcel) -> ipc::Result<Self> {
        Ok(Self { label: parcel.read_string16()?, icon_path: parcel.read_string16()? })
    }
}

/// One entry of the recent missions list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecentMissionInfo {
    pub id: i32,
    pub run_state: i32,
    pub base_want: Want,
    pub top_ability: ElementName,
    pub base_ability: ElementName,
    /// Number of abilities in the mission.
    pub size: i32,
    pub description: MissionDescriptionInfo,
}

impl Parcelable for RecentMissionInfo {
    fn marshal(&self, parcel: &mut Parcel) -> ipc::Result<()> {
        parcel.write_i32(self.id)?;
        parcel.write_i32(self.run_state)?;
        parcel.write_parcelable(Some(&self.base_want))?;
        parcel.write_parcelable(Some(&self.top_ability))?;
        parcel.write_parcelable(Some(&self.base_ability))?;
        parcel.write_i32(self.size)?;
        parcel.write_parcelable(Some(&self.description))
    }

    fn unmarshal(parcel: &mut Parcel) -> ipc::Result<Self> {
        Ok(Self {
            id: parcel.read_i32()?,
            run_state: parcel.read_i32()?,
            base_want: parcel.read_parcelable().ok_or(ipc::Error::MissingRecord)?,
            top_ability: parcel.read_parcelable().ok_or(ipc::Error::MissingRecord)?,
            base_ability: parcel.read_parcelable().ok_or(ipc::Error::MissingRecord)?,
            size: parcel.read_i32()?,
            description: parcel.read_parcelable().ok_or(ipc::Error::MissingRecord)?,
        })
    }
}

/// The last rendered frame of a mission's top ability.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MissionSnapshotInfo {
    pub top_ability: ElementName,
    pub width: i32,
    pub height: i32,
    /// Raw pixel bytes, row-major.
    pub pixels: Vec<u8>,
}

impl Parcelable for MissionSnapshotInfo {
    fn marshal(&self, parcel: &mut Parcel) -> ipc::Result<()> {
        parcel.write_parcelable(Some(&self.top_ability))?;
        parcel.write_i32(self.width)?;
        parcel.write_i32(self.height)?;
        parcel.write_buffer(&self.pixels)
    }

    fn unmarshal(parcel: &mut Parcel) -> ipc::Result<Self> {
        Ok(Self {
            top_ability: parcel.read_parcelable().ok_or(ipc::Error::MissingRecord)?,
            width: parcel.read_i32()?,
            height: parcel.read_i32()?,
            pixels: parcel.read_buffer()?,
        })
    }
}
