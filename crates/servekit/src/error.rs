//! Error taxonomy shared by the decoder, the response writer and the
//! authorization helpers.
//!
//! Failures fall into two tiers:
//!
//! - [`ErrorKind`]: sentinel conditions that carry no data (empty body,
//!   missing authorization header, ...).
//! - [`FieldError`]: conditions tied to a specific JSON key (wrong type,
//!   unknown key).
//!
//! Both are folded into [`Error`], whose [`Error::kind`] lets callers branch
//! on the category without matching message text.

use std::fmt;

use thiserror::Error;

/// Convenient result alias for this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Closed set of error categories.
///
/// Kinds compare by identity, so callers can map them to HTTP statuses
/// regardless of how the accompanying message is worded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ErrorKind {
    #[error("internal server error")]
    InternalServer,

    #[error("resource not found")]
    NotFound,

    #[error("no authorization header provided")]
    NoAuthHeader,

    #[error("forbidden")]
    Forbidden,

    #[error("unauthorized")]
    Unauthorized,

    #[error("invalid authorization header")]
    InvalidAuthHeader,

    #[error("bad request")]
    BadRequest,

    /// Malformed or truncated JSON, or a top-level type mismatch.
    #[error("body contains badly-formed JSON")]
    JsonParsing,

    /// The body held no JSON value at all.
    #[error("body must not be empty")]
    JsonEmpty,

    /// The body held more than one JSON value.
    #[error("body must only contain a single JSON value")]
    JsonSingleValue,

    /// The body exceeded the byte budget.
    #[error("body must not be larger than the allowed size")]
    JsonTooLarge,

    /// A field carried a JSON type the destination does not accept.
    #[error("body contains incorrect JSON type")]
    JsonInvalidType,

    /// A key was present that the destination does not declare.
    #[error("body contains unknown key")]
    JsonUnknownKey,
}

/// Category of a [`FieldError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldErrorKind {
    /// The JSON value's type does not match the field's declared type.
    InvalidType,
    /// The JSON object contains a key the destination does not declare.
    UnknownKey,
}

/// Error tied to a specific JSON key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    kind: FieldErrorKind,
    key: String,
}

impl FieldError {
    /// Create a field error.
    ///
    /// # Panics
    ///
    /// Panics if `key` is empty. A field error without a key is a bug in the
    /// code constructing it, not a client error.
    pub fn new(kind: FieldErrorKind, key: impl Into<String>) -> Self {
        let key = key.into();
        assert!(!key.is_empty(), "FieldError initialized without a key");
        Self { kind, key }
    }

    pub fn invalid_type(key: impl Into<String>) -> Self {
        Self::new(FieldErrorKind::InvalidType, key)
    }

    pub fn unknown_key(key: impl Into<String>) -> Self {
        Self::new(FieldErrorKind::UnknownKey, key)
    }

    pub fn kind(&self) -> FieldErrorKind {
        self.kind
    }

    /// The offending key, or dotted path for nested fields.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The sentinel kind this field error belongs to.
    pub fn error_kind(&self) -> ErrorKind {
        match self.kind {
            FieldErrorKind::InvalidType => ErrorKind::JsonInvalidType,
            FieldErrorKind::UnknownKey => ErrorKind::JsonUnknownKey,
        }
    }
}

// Keys are rendered with `{:?}` so quotes inside a key stay escaped.
impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            FieldErrorKind::InvalidType => {
                write!(f, "body contains incorrect JSON type for field {:?}", self.key)
            }
            FieldErrorKind::UnknownKey => write!(f, "body contains unknown key {:?}", self.key),
        }
    }
}

impl std::error::Error for FieldError {}

/// Top-level error type.
#[derive(Debug, Error)]
pub enum Error {
    /// A sentinel condition with no associated data.
    #[error(transparent)]
    Kind(#[from] ErrorKind),

    /// Badly-formed JSON. `offset` is the number of bytes read when the
    /// problem was detected, when known.
    #[error("{}{}", ErrorKind::JsonParsing, format_offset(.offset))]
    Syntax { offset: Option<u64> },

    /// The body exceeded `limit` bytes.
    #[error("body must not be larger than {limit} bytes")]
    TooLarge { limit: u64 },

    /// An error tied to a specific key.
    #[error(transparent)]
    Field(#[from] FieldError),

    /// A decode failure that fits no category, e.g. a missing required
    /// field or an integer out of range.
    #[error(transparent)]
    Json(serde_json::Error),

    /// The body stream failed for a reason other than its size.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A response payload could not be serialized.
    #[error("error marshalling JSON: {0}")]
    Serialize(#[source] serde_json::Error),
}

fn format_offset(offset: &Option<u64>) -> String {
    match offset {
        Some(offset) => format!(" (at character {offset})"),
        None => String::new(),
    }
}

impl Error {
    /// The category of this error, or `None` for unclassified failures.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Kind(kind) => Some(*kind),
            Self::Syntax { .. } => Some(ErrorKind::JsonParsing),
            Self::TooLarge { .. } => Some(ErrorKind::JsonTooLarge),
            Self::Field(field) => Some(field.error_kind()),
            Self::Json(_) | Self::Io(_) | Self::Serialize(_) => None,
        }
    }

    /// Whether this error belongs to `kind`.
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind() == Some(kind)
    }

    /// The field error carried by this error, if any.
    pub fn as_field(&self) -> Option<&FieldError> {
        match self {
            Self::Field(field) => Some(field),
            _ => None,
        }
    }
}

impl PartialEq<ErrorKind> for Error {
    fn eq(&self, other: &ErrorKind) -> bool {
        self.is(*other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_messages() {
        assert_eq!(ErrorKind::JsonEmpty.to_string(), "body must not be empty");
        assert_eq!(
            ErrorKind::NoAuthHeader.to_string(),
            "no authorization header provided"
        );
        assert_eq!(
            ErrorKind::JsonSingleValue.to_string(),
            "body must only contain a single JSON value"
        );
    }

    #[test]
    fn test_field_error_messages() {
        let err = FieldError::unknown_key("unknownField");
        assert_eq!(err.to_string(), r#"body contains unknown key "unknownField""#);

        let err = FieldError::invalid_type("age");
        assert_eq!(
            err.to_string(),
            r#"body contains incorrect JSON type for field "age""#
        );
    }

    #[test]
    fn test_field_error_escapes_quotes() {
        let err = FieldError::unknown_key(r#"a"b"#);
        assert_eq!(err.to_string(), r#"body contains unknown key "a\"b""#);
    }

    #[test]
    #[should_panic(expected = "without a key")]
    fn test_field_error_empty_key_panics() {
        let _ = FieldError::new(FieldErrorKind::InvalidType, "");
    }

    #[test]
    fn test_syntax_message_with_offset() {
        let err = Error::Syntax { offset: Some(7) };
        assert_eq!(
            err.to_string(),
            "body contains badly-formed JSON (at character 7)"
        );
        assert_eq!(
            Error::Syntax { offset: None }.to_string(),
            "body contains badly-formed JSON"
        );
    }

    #[test]
    fn test_error_kind_mapping() {
        assert_eq!(Error::TooLarge { limit: 10 }.kind(), Some(ErrorKind::JsonTooLarge));
        assert_eq!(
            Error::from(FieldError::unknown_key("x")).kind(),
            Some(ErrorKind::JsonUnknownKey)
        );
        assert_eq!(Error::from(ErrorKind::Forbidden), ErrorKind::Forbidden);

        let io = Error::from(std::io::Error::other("boom"));
        assert_eq!(io.kind(), None);
        assert!(!io.is(ErrorKind::InternalServer));
    }

    #[test]
    fn test_too_large_message_includes_limit() {
        let err = Error::TooLarge { limit: 1_048_576 };
        assert_eq!(err.to_string(), "body must not be larger than 1048576 bytes");
    }
}
