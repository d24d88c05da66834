use libsqlite3_sys::*;
use std::ffi::{CStr, c_char, c_int, c_void};
use transactor_core::{Error, Result, Value};

/// Position in the query parameters of the statement parameter `index`.
///
/// Numbered parameters (`?2`, `$2`, `:2`) refer to the parameter with that
/// number, anonymous `?` ones to their own index. Anything else is refused.
pub(crate) fn parameter_position(statement: *mut sqlite3_stmt, index: c_int) -> Result<usize> {
    let name = unsafe { sqlite3_bind_parameter_name(statement, index) };
    if name.is_null() {
        return Ok(index as usize);
    }
    let name = unsafe { CStr::from_ptr(name) }.to_str()?;
    name.get(1..)
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|v| *v > 0)
        .ok_or_else(|| {
            Error::msg(format!(
                "Parameter `{}` is not supported, use numbered parameters like `$1`",
                name
            ))
        })
}

pub(crate) fn bind_parameters(statement: *mut sqlite3_stmt, params: &[Value]) -> Result<()> {
    let count = unsafe { sqlite3_bind_parameter_count(statement) };
    for index in 1..=count {
        let position = parameter_position(statement, index)?;
        let value = params.get(position - 1).ok_or_else(|| {
            Error::msg(format!(
                "Missing value for parameter {}, the query has {} parameters",
                position,
                params.len()
            ))
        })?;
        bind_value(statement, index, value)?;
    }
    Ok(())
}

pub(crate) fn bind_value(statement: *mut sqlite3_stmt, index: c_int, value: &Value) -> Result<()> {
    let rc = unsafe {
        match value {
            Value::Null => sqlite3_bind_null(statement, index),
            Value::Boolean(v) => sqlite3_bind_int(statement, index, *v as c_int),
            Value::Int64(v) => sqlite3_bind_int64(statement, index, *v),
            Value::Float64(v) => sqlite3_bind_double(statement, index, *v),
            Value::Varchar(v) => sqlite3_bind_text(
                statement,
                index,
                v.as_ptr() as *const c_char,
                v.len() as c_int,
                SQLITE_TRANSIENT(),
            ),
            Value::Blob(v) => sqlite3_bind_blob(
                statement,
                index,
                v.as_ptr() as *const c_void,
                v.len() as c_int,
                SQLITE_TRANSIENT(),
            ),
        }
    };
    if rc != SQLITE_OK {
        return Err(Error::msg(format!(
            "Could not bind the {} value {} to parameter {}",
            value.type_name(),
            value,
            index
        )));
    }
    Ok(())
}
