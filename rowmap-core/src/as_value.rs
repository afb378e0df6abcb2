use crate::{Error, Result, Value};
use rust_decimal::Decimal;
use std::any;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};
use uuid::Uuid;

/// Conversion between native Rust types and the dynamically typed [`Value`].
///
/// `as_value` wraps a native value in its canonical variant; `try_from_value`
/// goes back, accepting the canonical variant plus the lossless widenings
/// listed per implementation. Everything else is a descriptive error: schema
/// and typing live in the database, so a mismatch here means the caller's
/// factory disagrees with the actual column type.
pub trait AsValue {
    /// NULL of this type's canonical variant.
    fn as_empty_value() -> Value;
    /// Wrap into the canonical [`Value`] variant.
    fn as_value(self) -> Value;
    /// Recover the native value, or explain why the variant does not fit.
    fn try_from_value(value: Value) -> Result<Self>
    where
        Self: Sized;
}

impl<T: AsValue> From<T> for Value {
    fn from(value: T) -> Self {
        value.as_value()
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Varchar(Some(value.to_owned()))
    }
}

impl<T: AsValue> AsValue for Option<T> {
    fn as_empty_value() -> Value {
        T::as_empty_value()
    }
    fn as_value(self) -> Value {
        match self {
            Some(v) => v.as_value(),
            None => T::as_empty_value(),
        }
    }
    fn try_from_value(value: Value) -> Result<Self> {
        if value.is_null() {
            Ok(None)
        } else {
            T::try_from_value(value).map(Some)
        }
    }
}

macro_rules! impl_as_value {
    ($source:ty, $variant:path $(, $pat_rest:pat => $expr_rest:expr)* $(,)?) => {
        impl AsValue for $source {
            fn as_empty_value() -> Value {
                $variant(None)
            }
            fn as_value(self) -> Value {
                $variant(Some(self.into()))
            }
            fn try_from_value(value: Value) -> Result<Self> {
                match value {
                    $variant(Some(v)) => Ok(v.into()),
                    $($pat_rest => $expr_rest,)*
                    other => Err(Error::msg(format!(
                        "Cannot convert {:?} into {}",
                        other,
                        any::type_name::<Self>(),
                    ))),
                }
            }
        }
    };
}

impl_as_value!(bool, Value::Boolean);
impl_as_value!(i16, Value::Int16);
impl_as_value!(
    i32,
    Value::Int32,
    Value::Int16(Some(v)) => Ok(v as i32),
);
impl_as_value!(
    i64,
    Value::Int64,
    Value::Int16(Some(v)) => Ok(v as i64),
    Value::Int32(Some(v)) => Ok(v as i64),
);
impl_as_value!(f32, Value::Float32);
impl_as_value!(
    f64,
    Value::Float64,
    Value::Float32(Some(v)) => Ok(v as f64),
);
impl_as_value!(Decimal, Value::Decimal);
impl_as_value!(String, Value::Varchar);
impl_as_value!(Box<[u8]>, Value::Blob);
impl_as_value!(Vec<u8>, Value::Blob);
impl_as_value!(Date, Value::Date);
impl_as_value!(Time, Value::Time);
impl_as_value!(PrimitiveDateTime, Value::Timestamp);
impl_as_value!(OffsetDateTime, Value::TimestampWithTimezone);
impl_as_value!(Uuid, Value::Uuid);
