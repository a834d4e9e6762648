use std::fmt;

use ipc::Parcel;
use ipc::Parcelable;

/// Identifies one ability: which device, which bundle, which ability in it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ElementName {
    pub device_id: String,
    pub bundle_name: String,
    pub ability_name: String,
}

impl ElementName {
    pub fn new(
        device_id: impl Into<String>,
        bundle_name: impl Into<String>,
        ability_name: impl Into<String>,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            bundle_name: bundle_name.into(),
            ability_name: ability_name.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.device_id.is_empty() && self.bundle_name.is_empty() && self.ability_name.is_empty()
    }
}

/// `device/bundle/ability`.
impl fmt::Display for ElementName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.device_id, self.bundle_name, self.ability_name)
    }
}

impl Parcelable for ElementName {
    fn marshal(&self, parcel: &mut Parcel) -> ipc::Result<()> {
        parcel.write_string16(&self.device_id)?;
        parcel.write_string16(&self.bundle_name)?;
        parcel.write_string16(&self.ability_name)
    }

    fn unmarshal(parcel: &mut Parcel) -> ipc::Result<Self> {
        Ok(Self {
            device_id: parcel.read_string16()?,
            bundle_name: parcel.read_string16()?,
            ability_name: parcel.read_string16()?,
        })
    }
}
