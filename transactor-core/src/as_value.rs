use crate::{Error, Result, Value};
use std::any;

/// Conversion between native Rust types and the dynamically typed [`Value`]
/// carried by query parameters and rows.
///
/// Integer types accept any `Value::Int64` that fits their range, floats
/// accept integers, and `Option<T>` maps `Value::Null` to `None`.
///
/// # Examples
/// ```rust
/// use transactor_core::{AsValue, Value};
/// let v = 42i32.as_value();
/// assert_eq!(v, Value::Int64(42));
/// let n: i32 = AsValue::try_from_value(v).unwrap();
/// assert_eq!(n, 42);
/// ```
pub trait AsValue {
    fn as_value(self) -> Value;
    fn try_from_value(value: Value) -> Result<Self>
    where
        Self: Sized;
}

fn mismatch<T>(value: &Value) -> Error {
    Error::msg(format!(
        "Cannot convert `{}` ({}) into {}",
        value,
        value.type_name(),
        any::type_name::<T>()
    ))
}

macro_rules! impl_as_value_integer {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl AsValue for $ty {
                fn as_value(self) -> Value {
                    Value::Int64(self as i64)
                }
                fn try_from_value(value: Value) -> Result<Self> {
                    match value {
                        Value::Int64(v) => <$ty>::try_from(v).map_err(|_| {
                            Error::msg(format!(
                                "Value `{}` is out of range for {}",
                                v,
                                any::type_name::<$ty>()
                            ))
                        }),
                        Value::Boolean(v) => Ok(v as $ty),
                        _ => Err(mismatch::<$ty>(&value)),
                    }
                }
            }

            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    value.as_value()
                }
            }
        )+
    };
}

impl_as_value_integer!(i8, i16, i32, i64, u8, u16, u32);

impl AsValue for u64 {
    fn as_value(self) -> Value {
        // Drivers store 64 bit signed integers, larger values saturate
        Value::Int64(i64::try_from(self).unwrap_or(i64::MAX))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Int64(v) => u64::try_from(v)
                .map_err(|_| Error::msg(format!("Value `{}` is out of range for u64", v))),
            _ => Err(mismatch::<u64>(&value)),
        }
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        value.as_value()
    }
}

impl AsValue for bool {
    fn as_value(self) -> Value {
        Value::Boolean(self)
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Boolean(v) => Ok(v),
            Value::Int64(v) => Ok(v != 0),
            _ => Err(mismatch::<bool>(&value)),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl AsValue for f64 {
    fn as_value(self) -> Value {
        Value::Float64(self)
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Float64(v) => Ok(v),
            Value::Int64(v) => Ok(v as f64),
            _ => Err(mismatch::<f64>(&value)),
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float64(value)
    }
}

impl AsValue for f32 {
    fn as_value(self) -> Value {
        Value::Float64(self as f64)
    }
    fn try_from_value(value: Value) -> Result<Self> {
        f64::try_from_value(value).map(|v| v as f32)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        value.as_value()
    }
}

impl AsValue for String {
    fn as_value(self) -> Value {
        Value::Varchar(self)
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Varchar(v) => Ok(v),
            Value::Blob(v) => String::from_utf8(v.into_vec())
                .map_err(|e| Error::new(e).context("The blob is not a valid UTF-8 string")),
            _ => Err(mismatch::<String>(&value)),
        }
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Varchar(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Varchar(value.to_owned())
    }
}

impl AsValue for Vec<u8> {
    fn as_value(self) -> Value {
        Value::Blob(self.into_boxed_slice())
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Blob(v) => Ok(v.into_vec()),
            Value::Varchar(v) => Ok(v.into_bytes()),
            _ => Err(mismatch::<Vec<u8>>(&value)),
        }
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        value.as_value()
    }
}

impl From<&[u8]> for Value {
    fn from(value: &[u8]) -> Self {
        Value::Blob(value.into())
    }
}

impl<T: AsValue> AsValue for Option<T> {
    fn as_value(self) -> Value {
        match self {
            Some(v) => v.as_value(),
            None => Value::Null,
        }
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            v => T::try_from_value(v).map(Some),
        }
    }
}

impl<T: AsValue> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.as_value()
    }
}

impl AsValue for Value {
    fn as_value(self) -> Value {
        self
    }
    fn try_from_value(value: Value) -> Result<Self> {
        Ok(value)
    }
}
