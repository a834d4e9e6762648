use ipc::Parcel;
use ipc::Parcelable;

/// Where an ability is in its lifecycle.
#[repr(i32)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum AbilityLifeCycleState {
    #[default]
    Initial = 0,
    Inactive = 1,
    Active = 2,
    Suspended = 3,
    Background = 4,
    Foreground = 5,
}

impl AbilityLifeCycleState {
    pub fn from_i32(v: i32) -> Option<Self> {
        match v {
            0 => Some(Self::Initial),
            1 => Some(Self::Inactive),
            2 => Some(Self::Active),
            3 => Some(Self::Suspended),
            4 => Some(Self::Background),
            5 => Some(Self::Foreground),
            _ => None,
        }
    }
}

/// The state a scheduler is told to move its ability into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LifeCycleStateInfo {
    pub state: AbilityLifeCycleState,
    /// The want accompanying the transition is a redelivery, not a fresh start.
    pub is_new_want: bool,
}

impl LifeCycleStateInfo {
    pub fn new(state: AbilityLifeCycleState, is_new_want: bool) -> Self {
        Self { state, is_new_want }
    }
}

impl Parcelable for LifeCycleStateInfo {
    fn marshal(&self, parcel: &mut Parcel) -> ipc::Result<()> {
        parcel.write_i32(self.state as i32)?;
        parcel.write_bool(self.is_new_want)
    }

    fn unmarshal(parcel: &mut Parcel) -> ipc::Result<Self> {
        let raw = parcel.read_i32()?;
        let state = AbilityLifeCycleState::from_i32(raw)
            .ok_or_else(|| ipc::Error::InvalidValue(format!("unknown lifecycle state {}", raw)))?;
        Ok(Self { state, is_new_want: parcel.read_bool()? })
    }
}
