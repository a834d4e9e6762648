//! # Parameter Bags
//!
//! A string-keyed map of typed values carried inside a [`Want`](super::Want),
//! and on its own as a [`PacMap`].
//!
//! ## Format
//!
//! `[I32 count]` then per entry `[String16 key][I32 type][value]`. The type tag
//! tells the reader which variant to rebuild, so a value always comes back as
//! the variant it was written as.

use std::collections::BTreeMap;

use ipc::Parcel;
use ipc::Parcelable;

pub const VALUE_TYPE_BOOLEAN: i32 = 1;
pub const VALUE_TYPE_BYTE: i32 = 2;
pub const VALUE_TYPE_CHAR: i32 = 3;
pub const VALUE_TYPE_SHORT: i32 = 4;
pub const VALUE_TYPE_INT: i32 = 5;
pub const VALUE_TYPE_LONG: i32 = 6;
pub const VALUE_TYPE_FLOAT: i32 = 7;
pub const VALUE_TYPE_DOUBLE: i32 = 8;
pub const VALUE_TYPE_STRING: i32 = 9;
pub const VALUE_TYPE_BOOLEAN_ARRAY: i32 = 11;
pub const VALUE_TYPE_BYTE_ARRAY: i32 = 12;
pub const VALUE_TYPE_CHAR_ARRAY: i32 = 13;
pub const VALUE_TYPE_SHORT_ARRAY: i32 = 14;
pub const VALUE_TYPE_INT_ARRAY: i32 = 15;
pub const VALUE_TYPE_LONG_ARRAY: i32 = 16;
pub const VALUE_TYPE_FLOAT_ARRAY: i32 = 17;
pub const VALUE_TYPE_DOUBLE_ARRAY: i32 = 18;
pub const VALUE_TYPE_STRING_ARRAY: i32 = 19;
pub const VALUE_TYPE_WANT_PARAMS: i32 = 101;

/// One typed value in a parameter bag.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Bool(bool),
    Byte(i8),
    Char(char),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    BoolArray(Vec<bool>),
    ByteArray(Vec<i8>),
    CharArray(Vec<char>),
    ShortArray(Vec<i16>),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
    FloatArray(Vec<f32>),
    DoubleArray(Vec<f64>),
    StringArray(Vec<String>),
    Params(WantParams),
}

impl ParamValue {
    /// The `VALUE_TYPE_*` tag written ahead of this value.
    pub fn value_type(&self) -> i32 {
        match self {
            Self::Bool(_) => VALUE_TYPE_BOOLEAN,
            Self::Byte(_) => VALUE_TYPE_BYTE,
            Self::Char(_) => VALUE_TYPE_CHAR,
            Self::Short(_) => VALUE_TYPE_SHORT,
            Self::Int(_) => VALUE_TYPE_INT,
            Self::Long(_) => VALUE_TYPE_LONG,
            Self::Float(_) => VALUE_TYPE_FLOAT,
            Self::Double(_) => VALUE_TYPE_DOUBLE,
            Self::String(_) => VALUE_TYPE_STRING,
            Self::BoolArray(_) => VALUE_TYPE_BOOLEAN_ARRAY,
            Self::ByteArray(_) => VALUE_TYPE_BYTE_ARRAY,
            Self::CharArray(_) => VALUE_TYPE_CHAR_ARRAY,
            Self::ShortArray(_) => VALUE_TYPE_SHORT_ARRAY,
            Self::IntArray(_) => VALUE_TYPE_INT_ARRAY,
            Self::LongArray(_) => VALUE_TYPE_LONG_ARRAY,
            Self::FloatArray(_) => VALUE_TYPE_FLOAT_ARRAY,
            Self::DoubleArray(_) => VALUE_TYPE_DOUBLE_ARRAY,
            Self::StringArray(_) => VALUE_TYPE_STRING_ARRAY,
            Self::Params(_) => VALUE_TYPE_WANT_PARAMS,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Long(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_params(&self) -> Option<&WantParams> {
        match self {
            Self::Params(v) => Some(v),
            _ => None,
        }
    }

    fn marshal(&self, parcel: &mut Parcel) -> ipc::Result<()> {
        match self {
            Self::Bool(v) => parcel.write_bool(*v),
            Self::Byte(v) => parcel.write_i8(*v),
            Self::Char(v) => parcel.write_i32(*v as i32),
            Self::Short(v) => parcel.write_i16(*v),
            Self::Int(v) => parcel.write_i32(*v),
            Self::Long(v) => parcel.write_i64(*v),
            Self::Float(v) => parcel.write_f32(*v),
            Self::Double(v) => parcel.write_f64(*v),
            Self::String(v) => parcel.write_string16(v),
            Self::BoolArray(v) => parcel.write_bool_vector(v),
            Self::ByteArray(v) => parcel.write_i8_vector(v),
            Self::CharArray(v) => {
                let codes: Vec<i32> = v.iter().map(|c| *c as i32).collect();
                parcel.write_i32_vector(&codes)
            }
            Self::ShortArray(v) => parcel.write_i16_vector(v),
            Self::IntArray(v) => parcel.write_i32_vector(v),
            Self::LongArray(v) => parcel.write_i64_vector(v),
            Self::FloatArray(v) => parcel.write_f32_vector(v),
            Self::DoubleArray(v) => parcel.write_f64_vector(v),
            Self::StringArray(v) => parcel.write_string16_vector(v),
            Self::Params(v) => parcel.write_parcelable(Some(v)),
        }
    }

    fn unmarshal(value_type: i32, parcel: &mut Parcel) -> ipc::Result<Self> {
        Ok(match value_type {
            VALUE_TYPE_BOOLEAN => Self::Bool(parcel.read_bool()?),
            VALUE_TYPE_BYTE => Self::Byte(parcel.read_i8()?),
            VALUE_TYPE_CHAR => Self::Char(char_from_code(parcel.read_i32()?)?),
            VALUE_TYPE_SHORT => Self::Short(parcel.read_i16()?),
            VALUE_TYPE_INT => Self::Int(parcel.read_i32()?),
            VALUE_TYPE_LONG => Self::Long(parcel.read_i64()?),
            VALUE_TYPE_FLOAT => Self::Float(parcel.read_f32()?),
            VALUE_TYPE_DOUBLE => Self::Double(parcel.read_f64()?),
            VALUE_TYPE_STRING => Self::String(parcel.read_string16()?),
            VALUE_TYPE_BOOLEAN_ARRAY => Self::BoolArray(parcel.read_bool_vector()?),
            VALUE_TYPE_BYTE_ARRAY => Self::ByteArray(parcel.read_i8_vector()?),
            VALUE_TYPE_CHAR_ARRAY => Self::CharArray(
                parcel
                    .read_i32_vector()?
                    .into_iter()
                    .map(char_from_code)
                    .collect::<ipc::Result<Vec<char>>>()?,
            ),
            VALUE_TYPE_SHORT_ARRAY => Self::ShortArray(parcel.read_i16_vector()?),
            VALUE_TYPE_INT_ARRAY => Self::IntArray(parcel.read_i32_vector()?),
            VALUE_TYPE_LONG_ARRAY => Self::LongArray(parcel.read_i64_vector()?),
            VALUE_TYPE_FLOAT_ARRAY => Self::FloatArray(parcel.read_f32_vector()?),
            VALUE_TYPE_DOUBLE_ARRAY => Self::DoubleArray(parcel.read_f64_vector()?),
            VALUE_TYPE_STRING_ARRAY => Self::StringArray(parcel.read_string16_vector()?),
            VALUE_TYPE_WANT_PARAMS => {
                Self::Params(parcel.read_parcelable().ok_or(ipc::Error::MissingRecord)?)
            }
            other => return Err(ipc::Error::InvalidValue(format!("unknown value type {}", other))),
        })
    }
}

fn char_from_code(code: i32) -> ipc::Result<char> {
    u32::try_from(code)
        .ok()
        .and_then(char::from_u32)
        .ok_or_else(|| ipc::Error::InvalidValue(format!("invalid char code {}", code)))
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for ParamValue {
                fn from(v: $ty) -> Self {
                    Self::$variant(v)
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool,
    i8 => Byte,
    char => Char,
    i16 => Short,
    i32 => Int,
    i64 => Long,
    f32 => Float,
    f64 => Double,
    String => String,
    Vec<bool> => BoolArray,
    Vec<i8> => ByteArray,
    Vec<char> => CharArray,
    Vec<i16> => ShortArray,
    Vec<i32> => IntArray,
    Vec<i64> => LongArray,
    Vec<f32> => FloatArray,
    Vec<f64> => DoubleArray,
    Vec<String> => StringArray,
    WantParams => Params,
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

/// String keys to typed values. Keys are unique; order is not significant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WantParams {
    params: BTreeMap<String, ParamValue>,
}

/// The bag used to save and restore ability state, and to pass data-access extras.
pub type PacMap = WantParams;

impl WantParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `value` under `key`, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.params.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.params.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<ParamValue> {
        self.params.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.params.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl Parcelable for WantParams {
    fn marshal(&self, parcel: &mut Parcel) -> ipc::Result<()> {
        let count = i32::try_from(self.params.len())
            .map_err(|_| ipc::Error::BlobTooLarge(self.params.len()))?;
        parcel.write_i32(count)?;
        for (key, value) in &self.params {
            parcel.write_string16(key)?;
            parcel.write_i32(value.value_type())?;
            value.marshal(parcel)?;
        }
        Ok(())
    }

    fn unmarshal(parcel: &mut Parcel) -> ipc::Result<Self> {
        let count = parcel.read_i32()?;
        if count < 0 {
            return Err(ipc::Error::NegativeLength(count));
        }
        let mut params = BTreeMap::new();
        for _ in 0..count {
            let key = parcel.read_string16()?;
            let value_type = parcel.read_i32()?;
            let value = ParamValue::unmarshal(value_type, parcel)?;
            params.insert(key, value);
        }
        Ok(Self { params })
    }
}
