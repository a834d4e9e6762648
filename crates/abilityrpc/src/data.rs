//! # Data-Access Records
//!
//! The payloads of the data-access operations: the resource they address, the
//! rows they write, the filter they apply and the table they return. The RPC
//! layer moves these intact and never interprets them.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use ipc::Parcel;
use ipc::Parcelable;

/// A resource identifier such as `dataability://device/com.example.db/table`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Uri(String);

impl Uri {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The part before `:`, if any.
    pub fn scheme(&self) -> Option<&str> {
        self.0.split_once(':').map(|(scheme, _)| scheme)
    }

    /// The part between `//` and the next `/`, if the uri has one.
    pub fn authority(&self) -> Option<&str> {
        let rest = self.0.split_once("://")?.1;
        Some(rest.split('/').next().unwrap_or(rest))
    }

    /// Everything after the authority, starting with `/`.
    pub fn path(&self) -> &str {
        match self.0.split_once("://") {
            Some((_, rest)) => rest.find('/').map_or("", |i| &rest[i..]),
            None => self.0.split_once(':').map_or(self.0.as_str(), |(_, rest)| rest),
        }
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Uri {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl Parcelable for Uri {
    fn marshal(&self, parcel: &mut Parcel) -> ipc::Result<()> {
        parcel.write_string(&self.0)
    }

    fn unmarshal(parcel: &mut Parcel) -> ipc::Result<Self> {
        Ok(Self(parcel.read_string()?))
    }
}

/// How a data ability should open a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileMode {
    /// `r`
    Read,
    /// `w`
    WriteTruncate,
    /// `wa`
    WriteAppend,
    /// `rw`
    ReadWrite,
    /// `rwt`
    ReadWriteTruncate,
}

impl FileMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileMode::Read => "r",
            FileMode::WriteTruncate => "w",
            FileMode::WriteAppend => "wa",
            FileMode::ReadWrite => "rw",
            FileMode::ReadWriteTruncate => "rwt",
        }
    }
}

impl FromStr for FileMode {
    type Err = ipc::Error;

    fn from_str(s: &str) -> ipc::Result<Self> {
        match s {
            "r" => Ok(FileMode::Read),
            "w" => Ok(FileMode::WriteTruncate),
            "wa" => Ok(FileMode::WriteAppend),
            "rw" => Ok(FileMode::ReadWrite),
            "rwt" => Ok(FileMode::ReadWriteTruncate),
            other => Err(ipc::Error::InvalidValue(format!("unknown file mode {:?}", other))),
        }
    }
}

impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const VALUE_NULL: i32 = 0;
const VALUE_INT: i32 = 1;
const VALUE_DOUBLE: i32 = 2;
const VALUE_STRING: i32 = 3;
const VALUE_BOOL: i32 = 4;
const VALUE_BLOB: i32 = 5;

/// One cell of a row.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ValueObject {
    #[default]
    Null,
    Int(i64),
    Double(f64),
    String(String),
    Bool(bool),
    Blob(Vec<u8>),
}

impl Parcelable for ValueObject {
    fn marshal(&self, parcel: &mut Parcel) -> ipc::Result<()> {
        match self {
            ValueObject::Null => parcel.write_i32(VALUE_NULL),
            ValueObject::Int(v) => {
                parcel.write_i32(VALUE_INT)?;
                parcel.write_i64(*v)
            }
            ValueObject::Double(v) => {
                parcel.write_i32(VALUE_DOUBLE)?;
                parcel.write_f64(*v)
            }
            ValueObject::String(v) => {
                parcel.write_i32(VALUE_STRING)?;
                parcel.write_string16(v)
            }
            ValueObject::Bool(v) => {
                parcel.write_i32(VALUE_BOOL)?;
                parcel.write_bool(*v)
            }
            ValueObject::Blob(v) => {
                parcel.write_i32(VALUE_BLOB)?;
                parcel.write_buffer(v)
            }
        }
    }

    fn unmarshal(parcel: &mut Parcel) -> ipc::Result<Self> {
        Ok(match parcel.read_i32()? {
            VALUE_NULL => ValueObject::Null,
            VALUE_INT => ValueObject::Int(parcel.read_i64()?),
            VALUE_DOUBLE => ValueObject::Double(parcel.read_f64()?),
            VALUE_STRING => ValueObject::String(parcel.read_string16()?),
            VALUE_BOOL => ValueObject::Bool(parcel.read_bool()?),
            VALUE_BLOB => ValueObject::Blob(parcel.read_buffer()?),
            other => {
                return Err(ipc::Error::InvalidValue(format!("unknown value object type {}", other)));
            }
        })
    }
}

/// A row to insert or apply as an update: column name to value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValuesBucket {
    values: BTreeMap<String, ValueObject>,
}

impl ValuesBucket {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, column: impl Into<String>, value: ValueObject) -> &mut Self {
        self.values.insert(column.into(), value);
        self
    }

    pub fn put_int(&mut self, column: impl Into<String>, v: i64) -> &mut Self {
        self.put(column, ValueObject::Int(v))
    }

    pub fn put_double(&mut self, column: impl Into<String>, v: f64) -> &mut Self {
        self.put(column, ValueObject::Double(v))
    }

    pub fn put_string(&mut self, column: impl Into<String>, v: impl Into<String>) -> &mut Self {
        self.put(column, ValueObject::String(v.into()))
    }

    pub fn put_bool(&mut self, column: impl Into<String>, v: bool) -> &mut Self {
        self.put(column, ValueObject::Bool(v))
    }

    pub fn put_blob(&mut self, column: impl Into<String>, v: Vec<u8>) -> &mut Self {
        self.put(column, ValueObject::Blob(v))
    }

    pub fn put_null(&mut self, column: impl Into<String>) -> &mut Self {
        self.put(column, ValueObject::Null)
    }

    pub fn get(&self, column: &str) -> Option<&ValueObject> {
        self.values.get(column)
    }

    pub fn remove(&mut self, column: &str) -> Option<ValueObject> {
        self.values.remove(column)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ValueObject)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl Parcelable for ValuesBucket {
    fn marshal(&self, parcel: &mut Parcel) -> ipc::Result<()> {
        let count =
            i32::try_from(self.values.len()).map_err(|_| ipc::Error::BlobTooLarge(self.values.len()))?;
        parcel.write_i32(count)?;
        for (column, value) in &self.values {
            parcel.write_string16(column)?;
            value.marshal(parcel)?;
        }
        Ok(())
    }

    fn unmarshal(parcel: &mut Parcel) -> ipc::Result<Self> {
        let count = parcel.read_i32()?;
        if count < 0 {
            return Err(ipc::Error::NegativeLength(count));
        }
        let mut values = BTreeMap::new();
        for _ in 0..count {
            let column = parcel.read_string16()?;
            values.insert(column, ValueObject::unmarshal(parcel)?);
        }
        Ok(Self { values })
    }
}

/// A filter for update, delete and query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataAbilityPredicates {
    pub where_clause: String,
    pub where_args: Vec<String>,
    pub order: String,
    pub group: String,
    pub index: String,
    /// `-1` for no limit.
    pub limit: i32,
    /// `-1` for no offset.
    pub offset: i32,
    pub distinct: bool,
}

impl DataAbilityPredicates {
    pub fn new(where_clause: impl Into<String>) -> Self {
        Self { where_clause: where_clause.into(), ..Self::default() }
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.where_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn order_by(mut self, order: impl Into<String>) -> Self {
        self.order = order.into();
        self
    }

    pub fn group_by(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    pub fn limit(mut self, limit: i32) -> Self {
        self.limit = limit;
        self
    }

    pub fn offset(mut self, offset: i32) -> Self {
        self.offset = offset;
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }
}

impl Default for DataAbilityPredicates {
    fn default() -> Self {
        Self {
            where_clause: String::new(),
            where_args: Vec::new(),
            order: String::new(),
            group: String::new(),
            index: String::new(),
            limit: -1,
            offset: -1,
            distinct: false,
        }
    }
}

impl Parcelable for DataAbilityPredicates {
    fn marshal(&self, parcel: &mut Parcel) -> ipc::Result<()> {
        parcel.write_string16(&self.where_clause)?;
        parcel.write_string16_vector(&self.where_args)?;
        parcel.write_string16(&self.order)?;
        parcel.write_string16(&self.group)?;
        parcel.write_string16(&self.index)?;
        parcel.write_i32(self.limit)?;
        parcel.write_i32(self.offset)?;
        parcel.write_bool(self.distinct)
    }

    fn unmarshal(parcel: &mut Parcel) -> ipc::Result<Self> {
        Ok(Self {
            where_clause: parcel.read_string16()?,
            where_args: parcel.read_string16_vector()?,
            order: parcel.read_string16()?,
            group: parcel.read_string16()?,
            index: parcel.read_string16()?,
            limit: parcel.read_i32()?,
            offset: parcel.read_i32()?,
            distinct: parcel.read_bool()?,
        })
    }
}

/// Tabular query output: named columns and rows of cells.
///
/// Every row has exactly one cell per column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    columns: Vec<String>,
    rows: Vec<Vec<ValueObject>>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns, rows: Vec::new() }
    }

    /// Appends `row`. Returns `false`, leaving the set unchanged, if its width
    /// does not match the columns.
    pub fn push_row(&mut self, row: Vec<ValueObject>) -> bool {
        if row.len() != self.columns.len() {
            return false;
        }
        self.rows.push(row);
        true
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn row(&self, index: usize) -> Option<&[ValueObject]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&ValueObject> {
        let col = self.column_index(column)?;
        self.rows.get(row)?.get(col)
    }
}

impl Parcelable for ResultSet {
    fn marshal(&self, parcel: &mut Parcel) -> ipc::Result<()> {
        parcel.write_string16_vector(&self.columns)?;
        let count =
            i32::try_from(self.rows.len()).map_err(|_| ipc::Error::BlobTooLarge(self.rows.len()))?;
        parcel.write_i32(count)?;
        for row in &self.rows {
            for cell in row {
                cell.marshal(parcel)?;
            }
        }
        Ok(())
    }

    fn unmarshal(parcel: &mut Parcel) -> ipc::Result<Self> {
        let columns = parcel.read_string16_vector()?;
        let count = parcel.read_i32()?;
        if count < 0 {
            return Err(ipc::Error::NegativeLength(count));
        }
        if columns.is_empty() && count != 0 {
            return Err(ipc::Error::InvalidValue("rows without columns".into()));
        }
        let mut rows = Vec::new();
        for _ in 0..count {
            let row = (0..columns.len())
                .map(|_| ValueObject::unmarshal(parcel))
                .collect::<ipc::Result<Vec<_>>>()?;
            rows.push(row);
        }
        Ok(Self { columns, rows })
    }
}
