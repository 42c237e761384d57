//! axum extractor for strictly decoded JSON bodies.

use axum::{
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::decode::{read_json_body, MAX_BYTES};
use crate::error::{Error, ErrorKind};
use crate::response::ApiError;
use crate::shape::Decodable;

/// Extractor that decodes the request body with
/// [`read_json_body`](crate::read_json_body) under the [`MAX_BYTES`] budget.
///
/// ```no_run
/// use serde::Deserialize;
/// use servekit::{decodable, Envelope, StrictJson};
///
/// #[derive(Deserialize)]
/// struct CreateMovie {
///     title: String,
///     year: i32,
/// }
///
/// decodable!(CreateMovie { "title": String, "year": i32 });
///
/// async fn create_movie(StrictJson(movie): StrictJson<CreateMovie>) -> Envelope {
///     Envelope::new().with("title", movie.title).with("year", movie.year)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct StrictJson<T>(pub T);

impl<T, S> FromRequest<S> for StrictJson<T>
where
    T: Decodable + Send,
    S: Send + Sync,
{
    type Rejection = JsonRejection;

    async fn from_request(req: Request, _state: &S) -> Result<Self, Self::Rejection> {
        read_json_body(req.into_body(), MAX_BYTES)
            .await
            .map(StrictJson)
            .map_err(JsonRejection)
    }
}

/// Rejection produced by [`StrictJson`].
///
/// Answers with an [`ApiError`] body: 413 for an oversized body, 500 when
/// the body stream itself failed, 400 for any other problem with the body.
#[derive(Debug)]
pub struct JsonRejection(pub Error);

impl JsonRejection {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            Error::TooLarge { .. } | Error::Kind(ErrorKind::JsonTooLarge) => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            Error::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    fn reason(&self) -> String {
        match self.status() {
            StatusCode::INTERNAL_SERVER_ERROR => ErrorKind::InternalServer.to_string(),
            _ => self.0.to_string(),
        }
    }
}

impl std::fmt::Display for JsonRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for JsonRejection {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

impl IntoResponse for JsonRejection {
    fn into_response(self) -> Response {
        ApiError::new(self.status(), self.reason()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FieldError;

    #[test]
    fn test_rejection_status() {
        let too_large = JsonRejection(Error::TooLarge { limit: 1 });
        assert_eq!(too_large.status(), StatusCode::PAYLOAD_TOO_LARGE);

        let unknown = JsonRejection(FieldError::unknown_key("x").into());
        assert_eq!(unknown.status(), StatusCode::BAD_REQUEST);

        let empty = JsonRejection(ErrorKind::JsonEmpty.into());
        assert_eq!(empty.status(), StatusCode::BAD_REQUEST);
        assert_eq!(empty.to_string(), "body must not be empty");
    }

    #[test]
    fn test_stream_failure_hides_details() {
        let rejection = JsonRejection(Error::Io(std::io::Error::other("tls alert")));

        assert_eq!(rejection.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(rejection.reason(), "internal server error");
        assert_eq!(rejection.to_string(), "tls alert");
    }

    #[tokio::test]
    async fn test_extracts_from_request() {
        use axum::body::Body;
        use std::collections::HashMap;

        let req = Request::new(Body::from(r#"{"a":1}"#));
        let StrictJson(map) = StrictJson::<HashMap<String, u8>>::from_request(req, &())
            .await
            .unwrap();
        assert_eq!(map["a"], 1);

        let req = Request::new(Body::from(r#"{"a":1} {"a":2}"#));
        let rejection = StrictJson::<HashMap<String, u8>>::from_request(req, &())
            .await
            .unwrap_err();
        assert_eq!(rejection.status(), StatusCode::BAD_REQUEST);
        assert!(rejection.0.is(ErrorKind::JsonSingleValue));
    }
}
