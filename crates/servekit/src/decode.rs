//! Strict, size-bounded JSON body decoding.
//!
//! [`read_json`] reads exactly one JSON value from a byte stream into a
//! [`Decodable`] destination and classifies every failure into the crate's
//! error taxonomy:
//!
//! | condition | result |
//! |---|---|
//! | malformed JSON | [`ErrorKind::JsonParsing`], with byte offset |
//! | truncated JSON | [`ErrorKind::JsonParsing`] |
//! | wrong type, or a number out of range, for a field | [`FieldError`] `InvalidType` |
//! | wrong type for the whole body | [`ErrorKind::JsonParsing`], with byte offset |
//! | no bytes, or only whitespace | [`ErrorKind::JsonEmpty`] |
//! | undeclared key | [`FieldError`] `UnknownKey` |
//! | more than `max_bytes` | [`ErrorKind::JsonTooLarge`] |
//! | a second value after the first | [`ErrorKind::JsonSingleValue`] |
//!
//! Anything else is returned unclassified ([`Error::Json`] or [`Error::Io`]).
//! Since the destination is the return value, an error never leaves a
//! partially-filled value behind.
//!
//! [`ErrorKind::JsonParsing`]: crate::ErrorKind::JsonParsing
//! [`ErrorKind::JsonEmpty`]: crate::ErrorKind::JsonEmpty
//! [`ErrorKind::JsonTooLarge`]: crate::ErrorKind::JsonTooLarge
//! [`ErrorKind::JsonSingleValue`]: crate::ErrorKind::JsonSingleValue
//! [`FieldError`]: crate::FieldError

use std::cell::{Cell, RefCell};
use std::fmt;
use std::io::{self, BufReader, Read};

use axum::body::Body;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use serde::de::{DeserializeSeed, Deserializer, MapAccess, SeqAccess, Visitor};
use serde_json::error::Category;
use serde_json::{Map, Number, Value};

use crate::error::{Error, ErrorKind, FieldError, Result};
use crate::shape::{self, Decodable};

/// Default body budget: 1 MiB.
pub const MAX_BYTES: u64 = 1_048_576;

/// Decode one JSON value of type `T` from `body`, reading at most
/// `max_bytes + 1` bytes from it.
///
/// The extra byte is what distinguishes a body of exactly `max_bytes` from
/// one that is too large.
///
/// # Example
///
/// ```
/// use std::collections::HashMap;
/// use servekit::{read_json, ErrorKind};
///
/// let map: HashMap<String, String> = read_json(&br#"{"key":"value"}"#[..], 16).unwrap();
/// assert_eq!(map["key"], "value");
///
/// let err = read_json::<HashMap<String, String>, _>(&b""[..], 16).unwrap_err();
/// assert!(err.is(ErrorKind::JsonEmpty));
/// ```
pub fn read_json<T, R>(body: R, max_bytes: u64) -> Result<T>
where
    T: Decodable,
    R: Read,
{
    let budget = Budget::new(max_bytes);
    let mut reader = BudgetReader {
        inner: BufReader::new(body.take(max_bytes.saturating_add(1))),
        budget: &budget,
    };

    let path = RefCell::new(Vec::new());
    let mut de = serde_json::Deserializer::from_reader(&mut reader);
    let value = Tracked { path: &path }
        .deserialize(&mut de)
        .map_err(|err| classify(err, &budget, &path.borrow()))?;
    // A wrong top-level container is blamed on its opening token, a wrong
    // scalar on the end of the literal.
    let top_offset = match (&value, budget.content_start.get()) {
        (Value::Array(_) | Value::Object(_), Some(start)) => start + 1,
        _ => budget.consumed.get(),
    };

    shape::check(&value, &T::shape(), top_offset)?;
    let decoded = serde_json::from_value(value).map_err(Error::Json)?;

    let trailing = de.end();
    drop(de);
    if let Err(err) = trailing {
        return Err(classify_trailing(err, &mut reader, &budget));
    }

    Ok(decoded)
}

/// [`read_json`] with the default [`MAX_BYTES`] budget.
pub fn read_json_with_default_limit<T, R>(body: R) -> Result<T>
where
    T: Decodable,
    R: Read,
{
    read_json(body, MAX_BYTES)
}

/// Collect an axum request body under a `max_bytes` budget and decode it
/// with [`read_json`].
///
/// A body that grows past the budget is rejected as too large without being
/// buffered further.
pub async fn read_json_body<T: Decodable>(body: Body, max_bytes: u64) -> Result<T> {
    let limit = usize::try_from(max_bytes).unwrap_or(usize::MAX);

    let bytes = match Limited::new(body, limit).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) if err.is::<LengthLimitError>() => {
            return Err(Error::TooLarge { limit: max_bytes })
        }
        Err(err) => return Err(Error::Io(io::Error::other(err))),
    };

    read_json(&bytes[..], max_bytes)
}

/// Byte accounting shared between the reader and the classifier.
struct Budget {
    limit: u64,
    consumed: Cell<u64>,
    exceeded: Cell<bool>,
    /// Offset of the first non-whitespace byte.
    content_start: Cell<Option<u64>>,
}

impl Budget {
    fn new(limit: u64) -> Self {
        Self {
            limit,
            consumed: Cell::new(0),
            exceeded: Cell::new(false),
            content_start: Cell::new(None),
        }
    }
}

/// Reader that fails once more than `budget.limit` bytes have been read.
///
/// serde_json pulls one byte at a time, so `consumed` doubles as the offset
/// at which a syntax error was detected.
struct BudgetReader<'a, R> {
    inner: R,
    budget: &'a Budget,
}

impl<R: Read> Read for BudgetReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.budget.exceeded.get() {
            return Err(too_large());
        }

        let n = self.inner.read(buf)?;
        let consumed = self.budget.consumed.get() + n as u64;
        self.budget.consumed.set(consumed);

        if consumed > self.budget.limit {
            self.budget.exceeded.set(true);
            return Err(too_large());
        }

        if self.budget.content_start.get().is_none() {
            let start = buf[..n]
                .iter()
                .position(|b| !matches!(b, b' ' | b'\t' | b'\n' | b'\r'));
            if let Some(index) = start {
                let before = consumed - n as u64;
                self.budget.content_start.set(Some(before + index as u64));
            }
        }

        Ok(n)
    }
}

fn too_large() -> io::Error {
    io::Error::other("request body too large")
}

/// Builds a `Value` while keeping `path` pointed at the object key being
/// parsed. After a failure it still names the innermost key.
#[derive(Clone, Copy)]
struct Tracked<'a> {
    path: &'a RefCell<Vec<String>>,
}

impl<'de> DeserializeSeed<'de> for Tracked<'_> {
    type Value = Value;

    fn deserialize<D>(self, deserializer: D) -> std::result::Result<Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(self)
    }
}

impl<'de> Visitor<'de> for Tracked<'_> {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any JSON value")
    }

    fn visit_bool<E>(self, v: bool) -> std::result::Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E>(self, v: i64) -> std::result::Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_u64<E>(self, v: u64) -> std::result::Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_f64<E>(self, v: f64) -> std::result::Result<Value, E> {
        Ok(Number::from_f64(v).map_or(Value::Null, Value::Number))
    }

    fn visit_str<E>(self, v: &str) -> std::result::Result<Value, E> {
        Ok(Value::String(v.to_string()))
    }

    fn visit_string<E>(self, v: String) -> std::result::Result<Value, E> {
        Ok(Value::String(v))
    }

    fn visit_unit<E>(self) -> std::result::Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<Value, A::Error> {
        let mut items = Vec::new();
        while let Some(item) = seq.next_element_seed(self)? {
            items.push(item);
        }
        Ok(Value::Array(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Value, A::Error> {
        let mut entries = Map::new();
        while let Some(key) = map.next_key::<String>()? {
            self.path.borrow_mut().push(key.clone());
            let value = map.next_value_seed(self)?;
            self.path.borrow_mut().pop();
            entries.insert(key, value);
        }
        Ok(Value::Object(entries))
    }
}

/// serde_json reports an overflowing number as a syntax error; there is no
/// finer category to match on.
fn is_number_out_of_range(err: &serde_json::Error) -> bool {
    err.classify() == Category::Syntax && err.to_string().starts_with("number out of range")
}

/// Classify a failure to parse the first value. `path` holds the keys that
/// were open when parsing stopped.
fn classify(err: serde_json::Error, budget: &Budget, path: &[String]) -> Error {
    let classified = match err.classify() {
        Category::Syntax if !path.is_empty() && is_number_out_of_range(&err) => {
            FieldError::invalid_type(path.join(".")).into()
        }
        Category::Io if budget.exceeded.get() => Error::TooLarge {
            limit: budget.limit,
        },
        Category::Io => Error::Io(err.into()),
        Category::Eof if budget.content_start.get().is_none() => ErrorKind::JsonEmpty.into(),
        Category::Eof => Error::Syntax { offset: None },
        Category::Syntax => Error::Syntax {
            offset: Some(budget.consumed.get()),
        },
        Category::Data => Error::Json(err),
    };
    tracing::debug!(error = %classified, "rejected request body");
    classified
}

/// Classify whatever followed the first value.
///
/// The rest of the budget is drained first, so a body that is both too large
/// and carries a second value reports the size.
fn classify_trailing<R: Read>(err: serde_json::Error, reader: &mut R, budget: &Budget) -> Error {
    if err.classify() == Category::Io && !budget.exceeded.get() {
        return Error::Io(err.into());
    }

    if !budget.exceeded.get() {
        let _ = io::copy(reader, &mut io::sink());
    }

    let classified = if budget.exceeded.get() {
        Error::TooLarge {
            limit: budget.limit,
        }
    } else {
        ErrorKind::JsonSingleValue.into()
    };
    tracing::debug!(error = %classified, "rejected request body");
    classified
}
