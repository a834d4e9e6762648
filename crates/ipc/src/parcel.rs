//! # Parcel
//!
//! An ordered, bounded message buffer for one request or one reply.
//!
//! ## Philosophy
//!
//! - **Ordered**: Fields are read back in the order they were written. There are no
//!   field names; both sides agree on the sequence.
//! - **Tagged**: Every field carries a one-byte kind so a reader asking for the wrong
//!   kind fails instead of reinterpreting bytes.
//! - **Bounded**: Writes past the configured capacity fail and leave the parcel as it
//!   was before the write began. Reads refuse records nested deeper than the
//!   configured depth.
//!
//! ## Format
//!
//! - **Scalars**: `[Tag: 1b][Data: N]`
//! - **Strings/Buffers**: `[Tag: 1b][Len: 4b][Data]` (String16 counts UTF-16 units)
//! - **Records**: `[Tag: 1b][Len: 4b][Body: Len]`, or a bare `[Null]`
//! - **Objects/Fds**: `[Tag: 1b][Index: 4b]` into the parcel's side tables
//! - **Sequences**: an `I32` count followed by the elements
//!
//! All integers are Little-Endian.

use std::fmt;
use std::os::fd::AsFd;
use std::os::fd::OwnedFd;
use std::sync::Arc;

use tracing::warn;

use crate::error::Error;
use crate::error::Result;
use crate::object::RemoteHandle;

/// Identifies the kind of an encoded field.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    /// An absent record or object.
    Null = 0x00,

    // Fixed-width scalars
    BoolTrue = 0x01,
    BoolFalse = 0x02,
    I8 = 0x03,
    I16 = 0x04,
    I32 = 0x05,
    I64 = 0x06,
    U32 = 0x07,
    U64 = 0x08,
    F32 = 0x09,
    F64 = 0x0A,

    // Variable-width blobs
    String8 = 0x10,
    String16 = 0x11,
    Buffer = 0x12,
    Token = 0x13,

    // Containers
    Parcelable = 0x20,

    // Side-table references
    Object = 0x30,
    Fd = 0x31,
}

impl Tag {
    pub fn from_u8(b: u8) -> Option<Self> {
        match b {
            0x00 => Some(Self::Null),
            0x01 => Some(Self::BoolTrue),
            0x02 => Some(Self::BoolFalse),
            0x03 => Some(Self::I8),
            0x04 => Some(Self::I16),
            0x05 => Some(Self::I32),
            0x06 => Some(Self::I64),
            0x07 => Some(Self::U32),
            0x08 => Some(Self::U64),
            0x09 => Some(Self::F32),
            0x0A => Some(Self::F64),
            0x10 => Some(Self::String8),
            0x11 => Some(Self::String16),
            0x12 => Some(Self::Buffer),
            0x13 => Some(Self::Token),
            0x20 => Some(Self::Parcelable),
            0x30 => Some(Self::Object),
            0x31 => Some(Self::Fd),
            _ => None,
        }
    }
}

/// Limits applied to a single parcel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParcelConfig {
    /// Maximum number of data bytes.
    pub max_capacity: usize,
    /// Maximum number of remote object references.
    pub max_objects: usize,
    /// Maximum number of file descriptors.
    pub max_fds: usize,
    /// Maximum nesting of records read back from the parcel.
    pub max_depth: usize,
}

impl ParcelConfig {
    pub const DEFAULT_CAPACITY: usize = 200 * 1024;
    pub const DEFAULT_MAX_OBJECTS: usize = 64;
    pub const DEFAULT_MAX_FDS: usize = 32;
    pub const DEFAULT_MAX_DEPTH: usize = 64;

    pub fn with_max_capacity(mut self, max_capacity: usize) -> Self {
        self.max_capacity = max_capacity;
        self
    }

    pub fn with_max_objects(mut self, max_objects: usize) -> Self {
        self.max_objects = max_objects;
        self
    }

    pub fn with_max_fds(mut self, max_fds: usize) -> Self {
        self.max_fds = max_fds;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

impl Default for ParcelConfig {
    fn default() -> Self {
        Self {
            max_capacity: Self::DEFAULT_CAPACITY,
            max_objects: Self::DEFAULT_MAX_OBJECTS,
            max_fds: Self::DEFAULT_MAX_FDS,
            max_depth: Self::DEFAULT_MAX_DEPTH,
        }
    }
}

/// A structured record that knows how to write itself into a parcel.
///
/// `unmarshal` must read exactly what `marshal` wrote. [`Parcel::read_parcelable`]
/// rejects records whose body is not consumed completely.
pub trait Parcelable: Sized {
    fn marshal(&self, parcel: &mut Parcel) -> Result<()>;
    fn unmarshal(parcel: &mut Parcel) -> Result<Self>;
}

/// An ordered message with separate write and read cursors.
///
/// Writes always append. Reads start at the beginning and move forward, so a
/// parcel filled by a proxy can be handed to a stub as-is.
pub struct Parcel {
    buf: Vec<u8>,
    read_pos: usize,
    /// End offsets of the records currently being read, innermost last.
    limits: Vec<usize>,
    objects: Vec<RemoteHandle>,
    fds: Vec<Option<OwnedFd>>,
    config: ParcelConfig,
}

impl Parcel {
    pub fn new() -> Self {
        Self::with_config(ParcelConfig::default())
    }

    pub fn with_config(config: ParcelConfig) -> Self {
        Self {
            buf: Vec::new(),
            read_pos: 0,
            limits: Vec::new(),
            objects: Vec::new(),
            fds: Vec::new(),
            config,
        }
    }

    pub fn config(&self) -> &ParcelConfig {
        &self.config
    }

    /// Number of data bytes written so far.
    pub fn data_size(&self) -> usize {
        self.buf.len()
    }

    pub fn read_position(&self) -> usize {
        self.read_pos
    }

    /// Bytes left before the end of the data, or of the record being read.
    pub fn remaining(&self) -> usize {
        self.limit().saturating_sub(self.read_pos)
    }

    /// Moves the read cursor back to the first field.
    pub fn rewind(&mut self) {
        self.read_pos = 0;
        self.limits.clear();
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn fd_count(&self) -> usize {
        self.fds.len()
    }

    // --- Writing ---

    pub fn write_bool(&mut self, v: bool) -> Result<()> {
        self.put(if v { Tag::BoolTrue } else { Tag::BoolFalse }, &[])
    }

    pub fn write_i8(&mut self, v: i8) -> Result<()> {
        self.put(Tag::I8, &v.to_le_bytes())
    }

    pub fn write_i16(&mut self, v: i16) -> Result<()> {
        self.put(Tag::I16, &v.to_le_bytes())
    }

    pub fn write_i32(&mut self, v: i32) -> Result<()> {
        self.put(Tag::I32, &v.to_le_bytes())
    }

    pub fn write_i64(&mut self, v: i64) -> Result<()> {
        self.put(Tag::I64, &v.to_le_bytes())
    }

    pub fn write_u32(&mut self, v: u32) -> Result<()> {
        self.put(Tag::U32, &v.to_le_bytes())
    }

    pub fn write_u64(&mut self, v: u64) -> Result<()> {
        self.put(Tag::U64, &v.to_le_bytes())
    }

    pub fn write_f32(&mut self, v: f32) -> Result<()> {
        self.put(Tag::F32, &v.to_le_bytes())
    }

    pub fn write_f64(&mut self, v: f64) -> Result<()> {
        self.put(Tag::F64, &v.to_le_bytes())
    }

    /// Writes a UTF-8 string.
    pub fn write_string(&mut self, v: &str) -> Result<()> {
        self.put_blob(Tag::String8, v.len(), v.as_bytes())
    }

    /// Writes a string as UTF-16 code units.
    pub fn write_string16(&mut self, v: &str) -> Result<()> {
        self.put_utf16(Tag::String16, v)
    }

    pub fn write_buffer(&mut self, v: &[u8]) -> Result<()> {
        self.put_blob(Tag::Buffer, v.len(), v)
    }

    /// Writes the descriptor that identifies which contract a request targets.
    pub fn write_interface_token(&mut self, descriptor: &str) -> Result<()> {
        self.put_utf16(Tag::Token, descriptor)
    }

    /// Writes a record, or a null marker for `None`.
    pub fn write_parcelable<T: Parcelable>(&mut self, value: Option<&T>) -> Result<()> {
        let Some(value) = value else {
            return self.put(Tag::Null, &[]);
        };
        self.atomic(|p| {
            p.ensure(5)?;
            p.buf.push(Tag::Parcelable as u8);
            let len_pos = p.buf.len();
            p.buf.extend_from_slice(&[0; 4]);

            value.marshal(p)?;

            let body = p.buf.len() - len_pos - 4;
            let len = u32::try_from(body).map_err(|_| Error::BlobTooLarge(body))?;
            p.buf[len_pos..len_pos + 4].copy_from_slice(&len.to_le_bytes());
            Ok(())
        })
    }

    /// Writes a reference to a remote object, or a null marker for `None`.
    ///
    /// The parcel holds its own reference until it is dropped.
    pub fn write_remote_object(&mut self, object: Option<&RemoteHandle>) -> Result<()> {
        let Some(object) = object else {
            return self.put(Tag::Null, &[]);
        };
        if self.objects.len() >= self.config.max_objects {
            return Err(Error::TooManyObjects(self.config.max_objects));
        }
        let index = self.objects.len() as u32;
        self.put(Tag::Object, &index.to_le_bytes())?;
        self.objects.push(Arc::clone(object));
        Ok(())
    }

    /// Duplicates `fd` into the parcel. The caller keeps its own descriptor.
    pub fn write_file_descriptor(&mut self, fd: impl AsFd) -> Result<()> {
        if self.fds.len() >= self.config.max_fds {
            return Err(Error::TooManyFds(self.config.max_fds));
        }
        let owned = fd
            .as_fd()
            .try_clone_to_owned()
            .map_err(|e| Error::BadFileDescriptor(e.to_string()))?;
        let index = self.fds.len() as u32;
        self.put(Tag::Fd, &index.to_le_bytes())?;
        self.fds.push(Some(owned));
        Ok(())
    }

    pub fn write_bool_vector(&mut self, v: &[bool]) -> Result<()> {
        self.write_vec(v, |p, x| p.write_bool(*x))
    }

    pub fn write_i8_vector(&mut self, v: &[i8]) -> Result<()> {
        self.write_vec(v, |p, x| p.write_i8(*x))
    }

    pub fn write_i16_vector(&mut self, v: &[i16]) -> Result<()> {
        self.write_vec(v, |p, x| p.write_i16(*x))
    }

    pub fn write_i32_vector(&mut self, v: &[i32]) -> Result<()> {
        self.write_vec(v, |p, x| p.write_i32(*x))
    }

    pub fn write_i64_vector(&mut self, v: &[i64]) -> Result<()> {
        self.write_vec(v, |p, x| p.write_i64(*x))
    }

    pub fn write_f32_vector(&mut self, v: &[f32]) -> Result<()> {
        self.write_vec(v, |p, x| p.write_f32(*x))
    }

    pub fn write_f64_vector(&mut self, v: &[f64]) -> Result<()> {
        self.write_vec(v, |p, x| p.write_f64(*x))
    }

    pub fn write_string_vector(&mut self, v: &[String]) -> Result<()> {
        self.write_vec(v, |p, x| p.write_string(x))
    }

    pub fn write_string16_vector(&mut self, v: &[String]) -> Result<()> {
        self.write_vec(v, |p, x| p.write_string16(x))
    }

    /// Writes a count followed by each record. Elements are never null.
    pub fn write_parcelable_vector<T: Parcelable>(&mut self, v: &[T]) -> Result<()> {
        self.write_vec(v, |p, x| p.write_parcelable(Some(x)))
    }

    // --- Reading ---

    pub fn read_bool(&mut self) -> Result<bool> {
        match self.peek_tag()? {
            Tag::BoolTrue => {
                self.read_pos += 1;
                Ok(true)
            }
            Tag::BoolFalse => {
                self.read_pos += 1;
                Ok(false)
            }
            found => Err(Error::TagMismatch { expected: Tag::BoolTrue, found }),
        }
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        self.expect_tag(Tag::I8)?;
        Ok(i8::from_le_bytes(self.take_array()?))
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        self.expect_tag(Tag::I16)?;
        Ok(i16::from_le_bytes(self.take_array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        self.expect_tag(Tag::I32)?;
        Ok(i32::from_le_bytes(self.take_array()?))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        self.expect_tag(Tag::I64)?;
        Ok(i64::from_le_bytes(self.take_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.expect_tag(Tag::U32)?;
        Ok(u32::from_le_bytes(self.take_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        self.expect_tag(Tag::U64)?;
        Ok(u64::from_le_bytes(self.take_array()?))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        self.expect_tag(Tag::F32)?;
        Ok(f32::from_le_bytes(self.take_array()?))
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        self.expect_tag(Tag::F64)?;
        Ok(f64::from_le_bytes(self.take_array()?))
    }

    /// Reads a UTF-8 string written by [`write_string`](Self::write_string).
    pub fn read_string(&mut self) -> Result<String> {
        let start = self.read_pos;
        self.expect_tag(Tag::String8)?;
        let bytes = self.read_len().and_then(|len| self.take(len).map(<[u8]>::to_vec));
        let bytes = self.or_rewind(start, bytes)?;
        String::from_utf8(bytes).map_err(|_| {
            self.read_pos = start;
            Error::InvalidUtf8
        })
    }

    /// Reads a string written by [`write_string16`](Self::write_string16).
    pub fn read_string16(&mut self) -> Result<String> {
        self.take_utf16(Tag::String16)
    }

    pub fn read_buffer(&mut self) -> Result<Vec<u8>> {
        let start = self.read_pos;
        self.expect_tag(Tag::Buffer)?;
        let bytes = self.read_len().and_then(|len| self.take(len).map(<[u8]>::to_vec));
        self.or_rewind(start, bytes)
    }

    pub fn read_interface_token(&mut self) -> Result<String> {
        self.take_utf16(Tag::Token)
    }

    /// Reads a record written by [`write_parcelable`](Self::write_parcelable).
    ///
    /// Returns `None` for a null marker, for a field that is not a record, and for
    /// a record that fails to decode or leaves part of its body unread. A record
    /// nested deeper than [`ParcelConfig::max_depth`] is not decoded at all. In the
    /// last three cases the cursor still moves past the whole record.
    pub fn read_parcelable<T: Parcelable>(&mut self) -> Option<T> {
        match self.peek_tag().ok()? {
            Tag::Null => {
                self.read_pos += 1;
                return None;
            }
            Tag::Parcelable => {}
            _ => return None,
        }
        let start = self.read_pos;
        self.read_pos += 1;
        let Ok(len) = self.read_len() else {
            self.read_pos = start;
            return None;
        };
        let body_end = match self.read_pos.checked_add(len) {
            Some(end) if end <= self.limit() => end,
            _ => {
                self.read_pos = start;
                return None;
            }
        };

        if self.limits.len() >= self.config.max_depth {
            warn!(depth = self.limits.len(), "record nested too deeply");
            self.read_pos = body_end;
            return None;
        }

        self.limits.push(body_end);
        let value = T::unmarshal(self);
        self.limits.pop();

        let complete = self.read_pos == body_end;
        self.read_pos = body_end;
        match value {
            Ok(v) if complete => Some(v),
            _ => None,
        }
    }

    /// Like [`read_parcelable`](Self::read_parcelable), but tells a null marker apart
    /// from a record that is malformed.
    pub fn read_optional_parcelable<T: Parcelable>(&mut self) -> Result<Option<T>> {
        if self.peek_tag()? == Tag::Null {
            self.read_pos += 1;
            return Ok(None);
        }
        self.read_parcelable().map(Some).ok_or(Error::MissingRecord)
    }

    /// Reads a remote object reference. `None` for a null marker or any other field.
    pub fn read_remote_object(&mut self) -> Option<RemoteHandle> {
        match self.peek_tag().ok()? {
            Tag::Null => {
                self.read_pos += 1;
                None
            }
            Tag::Object => {
                let index = self.read_index()?;
                self.objects.get(index).cloned()
            }
            _ => None,
        }
    }

    /// Takes ownership of a file descriptor. Each descriptor can be taken once.
    pub fn read_file_descriptor(&mut self) -> Option<OwnedFd> {
        match self.peek_tag().ok()? {
            Tag::Fd => {
                let index = self.read_index()?;
                self.fds.get_mut(index)?.take()
            }
            _ => None,
        }
    }

    pub fn read_bool_vector(&mut self) -> Result<Vec<bool>> {
        self.read_vec(Self::read_bool)
    }

    pub fn read_i8_vector(&mut self) -> Result<Vec<i8>> {
        self.read_vec(Self::read_i8)
    }

    pub fn read_i16_vector(&mut self) -> Result<Vec<i16>> {
        self.read_vec(Self::read_i16)
    }

    pub fn read_i32_vector(&mut self) -> Result<Vec<i32>> {
        self.read_vec(Self::read_i32)
    }

    pub fn read_i64_vector(&mut self) -> Result<Vec<i64>> {
        self.read_vec(Self::read_i64)
    }

    pub fn read_f32_vector(&mut self) -> Result<Vec<f32>> {
        self.read_vec(Self::read_f32)
    }

    pub fn read_f64_vector(&mut self) -> Result<Vec<f64>> {
        self.read_vec(Self::read_f64)
    }

    pub fn read_string_vector(&mut self) -> Result<Vec<String>> {
        self.read_vec(Self::read_string)
    }

    pub fn read_string16_vector(&mut self) -> Result<Vec<String>> {
        self.read_vec(Self::read_string16)
    }

    /// Reads a count followed by that many records. Any absent element fails the read.
    pub fn read_parcelable_vector<T: Parcelable>(&mut self) -> Result<Vec<T>> {
        self.read_vec(|p| p.read_parcelable().ok_or(Error::MissingRecord))
    }

    // --- Internals ---

    fn limit(&self) -> usize {
        self.limits.last().copied().unwrap_or(self.buf.len())
    }

    fn ensure(&self, additional: usize) -> Result<()> {
        let requested = self.buf.len().saturating_add(additional);
        if requested > self.config.max_capacity {
            return Err(Error::CapacityExceeded { requested, capacity: self.config.max_capacity });
        }
        Ok(())
    }

    /// Runs `f`, undoing every write it made if it fails.
    fn atomic<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        let (len, objects, fds) = (self.buf.len(), self.objects.len(), self.fds.len());
        let res = f(self);
        if res.is_err() {
            self.buf.truncate(len);
            self.objects.truncate(objects);
            self.fds.truncate(fds);
        }
        res
    }

    fn put(&mut self, tag: Tag, data: &[u8]) -> Result<()> {
        self.ensure(1 + data.len())?;
        self.buf.push(tag as u8);
        self.buf.extend_from_slice(data);
        Ok(())
    }

    fn put_blob(&mut self, tag: Tag, len: usize, data: &[u8]) -> Result<()> {
        let len = u32::try_from(len).map_err(|_| Error::BlobTooLarge(len))?;
        self.ensure(5 + data.len())?;
        self.buf.push(tag as u8);
        self.buf.extend_from_slice(&len.to_le_bytes());
        self.buf.extend_from_slice(data);
        Ok(())
    }

    fn put_utf16(&mut self, tag: Tag, v: &str) -> Result<()> {
        let units: Vec<u16> = v.encode_utf16().collect();
        let bytes: Vec<u8> = units.iter().flat_map(|u| u.to_le_bytes()).collect();
        self.put_blob(tag, units.len(), &bytes)
    }

    fn write_vec<T>(
        &mut self,
        items: &[T],
        mut f: impl FnMut(&mut Self, &T) -> Result<()>,
    ) -> Result<()> {
        let count = i32::try_from(items.len()).map_err(|_| Error::BlobTooLarge(items.len()))?;
        self.atomic(|p| {
            p.write_i32(count)?;
            for item in items {
                f(p, item)?;
            }
            Ok(())
        })
    }

    fn read_vec<T>(&mut self, mut f: impl FnMut(&mut Self) -> Result<T>) -> Result<Vec<T>> {
        let start = self.read_pos;
        let res = self.read_count().and_then(|count| {
            let mut out = Vec::with_capacity(count);
            for _ in 0..count {
                out.push(f(self)?);
            }
            Ok(out)
        });
        self.or_rewind(start, res)
    }

    /// Reads a sequence count, rejecting counts the remaining bytes cannot hold.
    fn read_count(&mut self) -> Result<usize> {
        let start = self.read_pos;
        let count = self.read_i32()?;
        if count < 0 {
            self.read_pos = start;
            return Err(Error::NegativeLength(count));
        }
        // Every element takes at least its tag byte.
        let count = count as usize;
        if count > self.remaining() {
            self.read_pos = start;
            return Err(Error::UnexpectedEnd);
        }
        Ok(count)
    }

    fn peek_tag(&self) -> Result<Tag> {
        if self.read_pos >= self.limit() {
            return Err(Error::UnexpectedEnd);
        }
        let b = self.buf[self.read_pos];
        Tag::from_u8(b).ok_or(Error::InvalidTag(b))
    }

    /// Consumes the tag byte if it matches. The cursor does not move otherwise.
    fn expect_tag(&mut self, expected: Tag) -> Result<()> {
        let found = self.peek_tag()?;
        if found != expected {
            return Err(Error::TagMismatch { expected, found });
        }
        self.read_pos += 1;
        Ok(())
    }

    fn take(&mut self, n: usize) -> Result<&[u8]> {
        let end = self.read_pos.checked_add(n).ok_or(Error::UnexpectedEnd)?;
        if end > self.limit() {
            return Err(Error::UnexpectedEnd);
        }
        let start = self.read_pos;
        self.read_pos = end;
        Ok(&self.buf[start..end])
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let bytes = self.take(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    fn read_len(&mut self) -> Result<usize> {
        Ok(u32::from_le_bytes(self.take_array()?) as usize)
    }

    fn read_index(&mut self) -> Option<usize> {
        let start = self.read_pos;
        self.read_pos += 1;
        match self.take_array() {
            Ok(bytes) => Some(u32::from_le_bytes(bytes) as usize),
            Err(_) => {
                self.read_pos = start;
                None
            }
        }
    }

    fn take_utf16(&mut self, tag: Tag) -> Result<String> {
        let start = self.read_pos;
        self.expect_tag(tag)?;
        let units = self.read_len().and_then(|n| {
            let bytes = self.take(n.checked_mul(2).ok_or(Error::UnexpectedEnd)?)?;
            Ok(bytes
                .chunks_exact(2)
                .map(|c| u16::from_le_bytes([c[0], c[1]]))
                .collect::<Vec<u16>>())
        });
        let units = self.or_rewind(start, units)?;
        char::decode_utf16(units)
            .collect::<std::result::Result<String, _>>()
            .map_err(|_| {
                self.read_pos = start;
                Error::InvalidUtf16
            })
    }

    /// Restores the cursor to `start` when `res` is an error.
    fn or_rewind<T>(&mut self, start: usize, res: Result<T>) -> Result<T> {
        if res.is_err() {
            self.read_pos = start;
        }
        res
    }
}

impl Default for Parcel {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Parcel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parcel")
            .field("data_size", &self.buf.len())
            .field("read_pos", &self.read_pos)
            .field("objects", &self.objects.len())
            .field("fds", &self.fds.len())
            .finish()
    }
}
