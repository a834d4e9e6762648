//! # Want
//!
//! The intent descriptor every ability operation is addressed with: what to do
//! (action, entities, flags), to whom (element), on what (uri, type), and with
//! which extra parameters.

mod element;
mod params;
mod uri;

pub use element::ElementName;
pub use params::*;

use ipc::Parcel;
use ipc::Parcelable;

/// A structured intent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Want {
    action: String,
    uri: String,
    entities: Vec<String>,
    flags: u32,
    element: ElementName,
    params: WantParams,
    mime_type: String,
    bundle: String,
}

impl Want {
    pub const ACTION_HOME: &'static str = "action.system.home";
    pub const ENTITY_HOME: &'static str = "entity.system.home";

    pub const FLAG_AUTH_READ_URI_PERMISSION: u32 = 0x0000_0001;
    pub const FLAG_AUTH_WRITE_URI_PERMISSION: u32 = 0x0000_0002;
    pub const FLAG_ABILITY_FORWARD_RESULT: u32 = 0x0000_0004;
    pub const FLAG_ABILITY_CONTINUATION: u32 = 0x0000_0008;
    pub const FLAG_NOT_OHOS_COMPONENT: u32 = 0x0000_0010;
    pub const FLAG_ABILITY_FORM_ENABLED: u32 = 0x0000_0020;
    pub const FLAG_ABILITY_NEW_MISSION: u32 = 0x1000_0000;
    pub const FLAG_ABILITY_CLEAR_MISSION: u32 = 0x0000_8000;

    pub fn new() -> Self {
        Self::default()
    }

    /// A want that starts the main ability of the application `element` names.
    pub fn make_main_ability(element: ElementName) -> Self {
        let mut want = Self::new();
        want.set_action(Self::ACTION_HOME);
        want.add_entity(Self::ENTITY_HOME);
        want.set_element(element);
        want
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn set_action(&mut self, action: impl Into<String>) -> &mut Self {
        self.action = action.into();
        self
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn set_uri(&mut self, uri: impl Into<String>) -> &mut Self {
        self.uri = uri.into();
        self
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn set_type(&mut self, mime_type: impl Into<String>) -> &mut Self {
        self.mime_type = mime_type.into();
        self
    }

    pub fn bundle(&self) -> &str {
        &self.bundle
    }

    /// Restricts resolution to abilities of `bundle`.
    pub fn set_bundle(&mut self, bundle: impl Into<String>) -> &mut Self {
        self.bundle = bundle.into();
        self
    }

    pub fn flags(&self) -> u32 {
        self.flags
    }

    pub fn set_flags(&mut self, flags: u32) -> &mut Self {
        self.flags = flags;
        self
    }

    pub fn add_flags(&mut self, flags: u32) -> &mut Self {
        self.flags |= flags;
        self
    }

    pub fn remove_flags(&mut self, flags: u32) -> &mut Self {
        self.flags &= !flags;
        self
    }

    pub fn entities(&self) -> &[String] {
        &self.entities
    }

    /// Adds `entity` unless it is already present.
    pub fn add_entity(&mut self, entity: impl Into<String>) -> &mut Self {
        let entity = entity.into();
        if !self.has_entity(&entity) {
            self.entities.push(entity);
        }
        self
    }

    pub fn remove_entity(&mut self, entity: &str) -> &mut Self {
        self.entities.retain(|e| e != entity);
        self
    }

    pub fn has_entity(&self, entity: &str) -> bool {
        self.entities.iter().any(|e| e == entity)
    }

    pub fn element(&self) -> &ElementName {
        &self.element
    }

    pub fn set_element(&mut self, element: ElementName) -> &mut Self {
        self.element = element;
        self
    }

    pub fn set_element_name(
        &mut self,
        bundle_name: impl Into<String>,
        ability_name: impl Into<String>,
    ) -> &mut Self {
        self.element.bundle_name = bundle_name.into();
        self.element.ability_name = ability_name.into();
        self
    }

    pub fn params(&self) -> &WantParams {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut WantParams {
        &mut self.params
    }

    pub fn set_params(&mut self, params: WantParams) -> &mut Self {
        self.params = params;
        self
    }

    pub fn set_param(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> &mut Self {
        self.params.set(key, value);
        self
    }

    pub fn param(&self, key: &str) -> Option<&ParamValue> {
        self.params.get(key)
    }

    pub fn has_param(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    pub fn remove_param(&mut self, key: &str) -> Option<ParamValue> {
        self.params.remove(key)
    }

    pub fn bool_param(&self, key: &str, default: bool) -> bool {
        self.param(key).and_then(ParamValue::as_bool).unwrap_or(default)
    }

    pub fn int_param(&self, key: &str, default: i32) -> i32 {
        self.param(key).and_then(ParamValue::as_i32).unwrap_or(default)
    }

    pub fn long_param(&self, key: &str, default: i64) -> i64 {
        self.param(key).and_then(ParamValue::as_i64).unwrap_or(default)
    }

    pub fn string_param(&self, key: &str) -> Option<&str> {
        self.param(key).and_then(ParamValue::as_str)
    }
}

impl Parcelable for Want {
    fn marshal(&self, parcel: &mut Parcel) -> ipc::Result<()> {
        parcel.write_string16(&self.action)?;
        parcel.write_string16(&self.uri)?;
        parcel.write_string16_vector(&self.entities)?;
        parcel.write_u32(self.flags)?;
        let element = (!self.element.is_empty()).then_some(&self.element);
        parcel.write_parcelable(element)?;
        let params = (!self.params.is_empty()).then_some(&self.params);
        parcel.write_parcelable(params)?;
        parcel.write_string16(&self.mime_type)?;
        parcel.write_string16(&self.bundle)
    }

    fn unmarshal(parcel: &mut Parcel) -> ipc::Result<Self> {
        let action = parcel.read_string16()?;
        let uri = parcel.read_string16()?;
        let entities = parcel.read_string16_vector()?;
        let flags = parcel.read_u32()?;
        let element = parcel.read_optional_parcelable()?.unwrap_or_default();
        let params = parcel.read_optional_parcelable()?.unwrap_or_default();
        Ok(Self {
            action,
            uri,
            entities,
            flags,
            element,
            params,
            mime_type: parcel.read_string16()?,
            bundle: parcel.read_string16()?,
        })
    }
}
