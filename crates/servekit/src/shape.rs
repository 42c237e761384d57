//! Declared shapes for decode destinations.
//!
//! Strict decoding needs to know, before building a value, which keys a
//! destination accepts and which JSON type each of them takes. serde's
//! `Deserialize` does not expose that, so every destination also implements
//! [`Decodable`], which describes its JSON form as a [`JsonType`].
//!
//! Primitives, `Option`, `Vec`, string-keyed maps and `serde_json::Value`
//! are covered here. Structs declare their fields with [`decodable!`]:
//!
//! ```
//! use serde::Deserialize;
//! use servekit::decodable;
//!
//! #[derive(Debug, Deserialize)]
//! struct CreateUser {
//!     name: String,
//!     #[serde(rename = "emailAddress")]
//!     email: Option<String>,
//! }
//!
//! decodable!(CreateUser {
//!     "name": String,
//!     "emailAddress": Option<String>,
//! });
//! ```

use std::collections::{BTreeMap, HashMap};

use serde::de::DeserializeOwned;
use serde_json::{Number, Value};

use crate::error::{Error, FieldError, Result};

/// JSON form accepted by a destination.
#[derive(Debug, Clone)]
pub enum JsonType {
    /// Any JSON value, including `null`.
    Any,
    Bool,
    /// A JSON number whose magnitude is at most `max`.
    Number { max: f64 },
    /// A JSON number without a fractional part, within `min..=max`.
    Integer { min: i128, max: i128 },
    String,
    /// An array whose elements all have the given form.
    Array(Box<JsonType>),
    /// An object with arbitrary keys whose values all have the given form.
    Map(Box<JsonType>),
    /// An object with a fixed set of keys. Expanded lazily so shapes may
    /// refer to themselves.
    Object(fn() -> Vec<Field>),
    /// The given form, or `null`.
    Nullable(Box<JsonType>),
}

/// A named member of a [`JsonType::Object`].
#[derive(Debug, Clone)]
pub struct Field {
    pub name: &'static str,
    pub ty: JsonType,
}

impl Field {
    pub fn new(name: &'static str, ty: JsonType) -> Self {
        Self { name, ty }
    }
}

/// A destination that strict decoding can fill.
pub trait Decodable: DeserializeOwned {
    /// The JSON form this type accepts.
    fn shape() -> JsonType;
}

/// Implement [`Decodable`] for a struct from its JSON field names and types.
///
/// Field names are the names as they appear in JSON, i.e. after any serde
/// `rename`. The listed types must implement [`Decodable`] themselves.
#[macro_export]
macro_rules! decodable {
    ($ty:ty { $($name:literal : $field:ty),* $(,)? }) => {
        impl $crate::Decodable for $ty {
            fn shape() -> $crate::JsonType {
                $crate::JsonType::Object(|| {
                    ::std::vec![
                        $($crate::Field::new(
                            $name,
                            <$field as $crate::Decodable>::shape(),
                        )),*
                    ]
                })
            }
        }
    };
}

macro_rules! primitive {
    ($shape:expr => $($ty:ty),+) => {
        $(impl Decodable for $ty {
            fn shape() -> JsonType {
                $shape
            }
        })+
    };
}

macro_rules! integer {
    ($($ty:ty),+) => {
        $(impl Decodable for $ty {
            fn shape() -> JsonType {
                JsonType::Integer {
                    min: i128::try_from(<$ty>::MIN).unwrap_or(i128::MIN),
                    max: i128::try_from(<$ty>::MAX).unwrap_or(i128::MAX),
                }
            }
        })+
    };
}

primitive!(JsonType::Bool => bool);
primitive!(JsonType::String => String);
primitive!(JsonType::Number { max: f32::MAX as f64 } => f32);
primitive!(JsonType::Number { max: f64::MAX } => f64);
primitive!(JsonType::Any => Value);
integer!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

impl<T: Decodable> Decodable for Option<T> {
    fn shape() -> JsonType {
        JsonType::Nullable(Box::new(T::shape()))
    }
}

impl<T: Decodable> Decodable for Vec<T> {
    fn shape() -> JsonType {
        JsonType::Array(Box::new(T::shape()))
    }
}

impl<T: Decodable> Decodable for HashMap<String, T> {
    fn shape() -> JsonType {
        JsonType::Map(Box::new(T::shape()))
    }
}

impl<T: Decodable> Decodable for BTreeMap<String, T> {
    fn shape() -> JsonType {
        JsonType::Map(Box::new(T::shape()))
    }
}

/// Check `value` against `shape`, reporting the first violation in document
/// order.
///
/// `top_offset` is reported when the top-level value itself has the wrong
/// type, since there is no field name to blame.
pub(crate) fn check(value: &Value, shape: &JsonType, top_offset: u64) -> Result<()> {
    match check_at(value, shape, "") {
        Ok(()) => Ok(()),
        Err(Mismatch::Type(path)) if path.is_empty() => Err(Error::Syntax {
            offset: Some(top_offset),
        }),
        Err(Mismatch::Type(path)) => Err(FieldError::invalid_type(path).into()),
        Err(Mismatch::UnknownKey(key)) => Err(FieldError::unknown_key(key).into()),
    }
}

enum Mismatch {
    /// Wrong type at the given dotted path; empty for the top level.
    Type(String),
    UnknownKey(String),
}

fn check_at(value: &Value, shape: &JsonType, path: &str) -> std::result::Result<(), Mismatch> {
    match (shape, value) {
        (JsonType::Any, _) => Ok(()),
        (JsonType::Nullable(_), Value::Null) => Ok(()),
        (JsonType::Nullable(inner), _) => check_at(value, inner, path),
        (JsonType::Bool, Value::Bool(_)) => Ok(()),
        (JsonType::String, Value::String(_)) => Ok(()),
        (JsonType::Number { max }, Value::Number(n))
            if n.as_f64().is_some_and(|v| v.abs() <= *max) =>
        {
            Ok(())
        }
        (JsonType::Integer { min, max }, Value::Number(n))
            if as_integer(n).is_some_and(|v| (*min..=*max).contains(&v)) =>
        {
            Ok(())
        }
        (JsonType::Array(element), Value::Array(items)) => items
            .iter()
            .try_for_each(|item| check_at(item, element, path)),
        (JsonType::Map(element), Value::Object(entries)) => {
            entries.iter().try_for_each(|(key, item)| {
                check_at(item, element, &join(path, key))
            })
        }
        (JsonType::Object(fields), Value::Object(entries)) => {
            let fields = fields();
            for (key, item) in entries {
                let Some(field) = fields.iter().find(|f| f.name == key.as_str()) else {
                    return Err(Mismatch::UnknownKey(key.clone()));
                };
                check_at(item, &field.ty, &join(path, key))?;
            }
            Ok(())
        }
        _ => Err(Mismatch::Type(path.to_string())),
    }
}

fn as_integer(n: &Number) -> Option<i128> {
    n.as_i64()
        .map(i128::from)
        .or_else(|| n.as_u64().map(i128::from))
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}
