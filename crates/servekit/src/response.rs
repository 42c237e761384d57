//! JSON response writing.

use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// String-keyed response payload.
///
/// # Example
///
/// ```
/// use servekit::Envelope;
///
/// let envelope = Envelope::new()
///     .with("status", "available")
///     .with("version", 3);
/// assert_eq!(
///     serde_json::to_string(&envelope).unwrap(),
///     r#"{"status":"available","version":3}"#
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Envelope(Map<String, Value>);

impl Envelope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry, replacing any previous value under `key`.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Add an entry from any serializable value.
    pub fn try_with<T>(mut self, key: impl Into<String>, value: &T) -> Result<Self>
    where
        T: Serialize + ?Sized,
    {
        let value = serde_json::to_value(value).map_err(Error::Serialize)?;
        self.0.insert(key.into(), value);
        Ok(self)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Envelope {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

impl From<Map<String, Value>> for Envelope {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        write_json(StatusCode::OK, &self, None).unwrap_or_else(|err| {
            tracing::error!(error = %err, "failed to write envelope");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        })
    }
}

/// Serialize `data` and build a JSON response with `status`.
///
/// Serialization happens first; if it fails nothing is built and the error is
/// returned as [`Error::Serialize`]. Each header in `headers` replaces any
/// existing values of the same name. `Content-Type: application/json` is set
/// last and always wins.
pub fn write_json<T>(status: StatusCode, data: &T, headers: Option<&HeaderMap>) -> Result<Response>
where
    T: Serialize + ?Sized,
{
    let body = serde_json::to_vec(data).map_err(Error::Serialize)?;

    let mut response = Response::new(Body::from(body));
    if let Some(extra) = headers {
        let target = response.headers_mut();
        for name in extra.keys() {
            target.remove(name);
            for value in extra.get_all(name) {
                target.append(name.clone(), value.clone());
            }
        }
    }

    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    *response.status_mut() = status;

    Ok(response)
}

/// Error body with a numeric code and a human-readable reason.
///
/// # Example
///
/// ```
/// use axum::http::StatusCode;
/// use servekit::ApiError;
///
/// let error = ApiError::new(StatusCode::NOT_FOUND, "resource not found");
/// assert_eq!(
///     serde_json::to_string(&error).unwrap(),
///     r#"{"code":404,"reason":"resource not found"}"#
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub code: u16,
    pub reason: String,
}

impl ApiError {
    pub fn new(status: StatusCode, reason: impl Into<String>) -> Self {
        Self {
            code: status.as_u16(),
            reason: reason.into(),
        }
    }

    /// Status to answer with; unknown codes fall back to 500.
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.reason)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        write_json(status, &self, None).unwrap_or_else(|_| status.into_response())
    }
}
