//! Request and reply plumbing shared by every proxy and stub.
//!
//! ## Reply layout
//!
//! - Replies carrying a sequence write the count, the elements, then the result code.
//! - Every other reply writes the result code first. Payload fields follow only
//!   when the code is [`ERR_OK`].

use ipc::MessageOption;
use ipc::Parcel;
use ipc::ParcelConfig;
use ipc::Parcelable;
use ipc::RemoteHandle;
use tracing::debug;
use tracing::error;
use tracing::warn;

use crate::error::ERR_OK;
use crate::error::Error;
use crate::error::Result;

// --- Proxy side ---

/// Builds a request: the interface token, then whatever `write` adds.
///
/// Any failed write aborts the call before anything is sent.
pub(crate) fn request<F>(token: &str, config: ParcelConfig, code: u32, write: F) -> Result<Parcel>
where
    F: FnOnce(&mut Parcel) -> ipc::Result<()>,
{
    let mut data = Parcel::with_config(config);
    data.write_interface_token(token).map_err(|err| {
        error!(code, %err, "failed to write interface token");
        Error::Inner
    })?;
    write(&mut data).map_err(Error::request)?;
    Ok(data)
}

/// Rejects an absent argument before anything is written.
pub(crate) fn present<T>(value: Option<T>, what: &'static str) -> Result<T> {
    value.ok_or_else(|| {
        error!(what, "required argument is absent");
        Error::InvalidValue
    })
}

/// Sends `data` and waits for the reply. A non-zero status is returned as-is
/// and the reply is never read.
pub(crate) async fn send(remote: &RemoteHandle, code: u32, data: &mut Parcel) -> Result<Parcel> {
    let option = MessageOption::sync();
    let mut reply = Parcel::with_config(*data.config());
    let status = remote.send_request(code, data, &mut reply, option).await;
    if status != ERR_OK {
        error!(code, status, flags = option.flags(), "send request failed");
        return Err(Error::Transport(status));
    }
    Ok(reply)
}

/// Reads the result code at the head of a reply.
pub(crate) fn read_result(reply: &mut Parcel) -> Result<()> {
    let code = reply.read_i32().map_err(Error::reply)?;
    if code != ERR_OK {
        debug!(code, "service returned an error");
        return Err(Error::from_code(code));
    }
    Ok(())
}

/// Reads the result code, then the payload if the code is [`ERR_OK`].
pub(crate) fn read_value<T, F>(reply: &mut Parcel, read: F) -> Result<T>
where
    F: FnOnce(&mut Parcel) -> ipc::Result<T>,
{
    read_result(reply)?;
    read(reply).map_err(Error::reply)
}

/// Reads a sequence reply: the elements, then the trailing result code.
pub(crate) fn read_sequence<T, F>(reply: &mut Parcel, read: F) -> Result<Vec<T>>
where
    F: FnOnce(&mut Parcel) -> ipc::Result<Vec<T>>,
{
    let items = read(reply).map_err(Error::reply)?;
    read_result(reply)?;
    Ok(items)
}

// --- Stub side ---

/// Checks the interface token at the head of a request.
pub(crate) fn check_token(data: &mut Parcel, expected: &str, code: u32) -> bool {
    match data.read_interface_token() {
        Ok(token) if token == expected => true,
        Ok(token) => {
            warn!(code, %token, expected, "interface token mismatch");
            false
        }
        Err(err) => {
            warn!(code, %err, "request has no interface token");
            false
        }
    }
}

/// Reads a record that must be present.
pub(crate) fn required<T: Parcelable>(data: &mut Parcel, what: &'static str) -> Result<T> {
    data.read_parcelable().ok_or_else(|| {
        error!(what, "required record is absent");
        Error::InvalidValue
    })
}

/// Reads a remote object that must be present.
pub(crate) fn required_object(data: &mut Parcel, what: &'static str) -> Result<RemoteHandle> {
    data.read_remote_object().ok_or_else(|| {
        error!(what, "required remote object is absent");
        Error::InvalidValue
    })
}

/// Maps a scalar argument read.
pub(crate) fn arg<T>(value: ipc::Result<T>) -> Result<T> {
    value.map_err(Error::argument)
}

/// Writes the result code of an operation without payload.
pub(crate) fn write_result(reply: &mut Parcel, result: Result<()>) -> Result<()> {
    write_value(reply, result, |_, ()| Ok(()))
}

/// Writes the result code, then the payload when the operation succeeded.
pub(crate) fn write_value<T, F>(reply: &mut Parcel, result: Result<T>, write: F) -> Result<()>
where
    F: FnOnce(&mut Parcel, T) -> ipc::Result<()>,
{
    match result {
        Ok(value) => {
            reply.write_i32(ERR_OK).map_err(Error::reply)?;
            write(reply, value).map_err(Error::reply)
        }
        Err(err) => reply.write_i32(err.code()).map_err(Error::reply),
    }
}

/// Writes a sequence reply: the elements (none on error), then the result code.
pub(crate) fn write_sequence<T, F>(reply: &mut Parcel, result: Result<Vec<T>>, write: F) -> Result<()>
where
    F: FnOnce(&mut Parcel, &[T]) -> ipc::Result<()>,
{
    let (items, code) = match result {
        Ok(items) => (items, ERR_OK),
        Err(err) => (Vec::new(), err.code()),
    };
    write(reply, &items).map_err(Error::reply)?;
    reply.write_i32(code).map_err(Error::reply)
}

/// The transport status for a handled request.
pub(crate) fn status(code: u32, result: Result<()>) -> i32 {
    match result {
        Ok(()) => ERR_OK,
        Err(err) => {
            warn!(code, status = err.code(), "request failed in stub");
            err.code()
        }
    }
}
