use std::collections::HashMap;
use std::io::{self, Read};

use serde::Deserialize;
use servekit::{
    decodable, read_json, read_json_with_default_limit, Error, ErrorKind, FieldErrorKind,
};

#[derive(Debug, PartialEq, Deserialize)]
struct Movie {
    title: String,
    year: i32,
    runtime: Option<u32>,
    genres: Vec<String>,
}

decodable!(Movie {
    "title": String,
    "year": i32,
    "runtime": Option<u32>,
    "genres": Vec<String>,
});

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct Listing {
    movie: Movie,
}

decodable!(Listing { "movie": Movie });

fn decode_movie(body: &str) -> Result<Movie, Error> {
    read_json(body.as_bytes(), 1024)
}

#[test]
fn decodes_a_complete_body() {
    let movie = decode_movie(
        r#"{"title":"Moana","year":2016,"runtime":107,"genres":["animation","adventure"]}"#,
    )
    .unwrap();

    assert_eq!(
        movie,
        Movie {
            title: "Moana".to_string(),
            year: 2016,
            runtime: Some(107),
            genres: vec!["animation".to_string(), "adventure".to_string()],
        }
    );
}

#[test]
fn surrounding_whitespace_is_accepted() {
    let movie = decode_movie("\n  {\"title\":\"Up\",\"year\":2009,\"genres\":[]}\r\n\t").unwrap();
    assert_eq!(movie.title, "Up");
    assert_eq!(movie.runtime, None);
}

#[test]
fn field_type_errors_name_the_field() {
    let err = decode_movie(r#"{"title":"Up","year":"2009","genres":[]}"#).unwrap_err();

    let field = err.as_field().expect("field error");
    assert_eq!(field.kind(), FieldErrorKind::InvalidType);
    assert_eq!(field.key(), "year");
    assert_eq!(err, ErrorKind::JsonInvalidType);
    assert_eq!(err.to_string(), r#"body contains incorrect JSON type for field "year""#);
}

#[test]
fn nested_type_errors_use_a_dotted_path() {
    let body = r#"{"movie":{"title":"Up","year":2009,"genres":[1]}}"#;
    let err = read_json::<Listing, _>(body.as_bytes(), 1024).unwrap_err();

    assert_eq!(err.as_field().unwrap().key(), "movie.genres");
}

#[test]
fn unknown_keys_are_rejected() {
    let err = decode_movie(r#"{"title":"Up","rating":"PG"}"#).unwrap_err();

    let field = err.as_field().expect("field error");
    assert_eq!(field.kind(), FieldErrorKind::UnknownKey);
    assert_eq!(field.key(), "rating");
    assert_eq!(err.to_string(), r#"body contains unknown key "rating""#);
}

#[test]
fn first_problem_in_document_order_wins() {
    let err = decode_movie(r#"{"rating":"PG","year":"x"}"#).unwrap_err();
    assert_eq!(err, ErrorKind::JsonUnknownKey);

    let err = decode_movie(r#"{"year":"x","rating":"PG"}"#).unwrap_err();
    assert_eq!(err, ErrorKind::JsonInvalidType);
}

#[test]
fn malformed_json_reports_an_offset() {
    let err = decode_movie(r#"{"title": "Up",}"#).unwrap_err();

    assert!(matches!(err, Error::Syntax { offset: Some(_) }));
    assert!(err
        .to_string()
        .starts_with("body contains badly-formed JSON (at character "));
}

#[test]
fn truncated_json_has_no_offset() {
    let err = decode_movie(r#"{"title": "Up""#).unwrap_err();

    assert!(matches!(err, Error::Syntax { offset: None }));
    assert_eq!(err.to_string(), "body contains badly-formed JSON");
}

#[test]
fn top_level_type_mismatch_is_a_syntax_error() {
    let err = decode_movie(r#"["Up"]"#).unwrap_err();

    assert_eq!(err, ErrorKind::JsonParsing);
    assert!(matches!(err, Error::Syntax { offset: Some(1) }));

    let err = decode_movie("\n  [\"Up\"]").unwrap_err();
    assert!(matches!(err, Error::Syntax { offset: Some(4) }));

    let err = decode_movie(r#""Up""#).unwrap_err();
    assert!(matches!(err, Error::Syntax { offset: Some(4) }));
}

#[test]
fn top_level_null_needs_an_optional_destination() {
    let err = decode_movie("null").unwrap_err();
    assert_eq!(err, ErrorKind::JsonParsing);
    assert!(matches!(err, Error::Syntax { offset: Some(4) }));

    let movie: Option<Movie> = read_json(&b"null"[..], 1024).unwrap();
    assert_eq!(movie, None);
}

#[test]
fn empty_and_blank_bodies() {
    assert_eq!(decode_movie("").unwrap_err(), ErrorKind::JsonEmpty);
    assert_eq!(decode_movie(" \n\t ").unwrap_err(), ErrorKind::JsonEmpty);
}

#[test]
fn a_second_value_is_rejected() {
    let up = r#"{"title":"Up","year":2009,"genres":[]}"#;

    let err = decode_movie(&format!("{up}{up}")).unwrap_err();
    assert_eq!(err, ErrorKind::JsonSingleValue);

    let err = decode_movie(&format!("{up} x")).unwrap_err();
    assert_eq!(err, ErrorKind::JsonSingleValue);
    assert_eq!(err.to_string(), "body must only contain a single JSON value");
}

#[test]
fn size_limit_is_exact() {
    let body = r#"{"key":"value"}"#;
    let limit = body.len() as u64;

    let map: HashMap<String, String> = read_json(body.as_bytes(), limit).unwrap();
    assert_eq!(map["key"], "value");

    let err = read_json::<HashMap<String, String>, _>(body.as_bytes(), limit - 1).unwrap_err();
    assert_eq!(err, ErrorKind::JsonTooLarge);
    assert_eq!(
        err.to_string(),
        format!("body must not be larger than {} bytes", limit - 1)
    );
}

#[test]
fn oversized_body_with_trailing_value_reports_size() {
    let body = r#"{"key":"value"} {"key":"value"}"#;
    let err = read_json::<HashMap<String, String>, _>(body.as_bytes(), 20).unwrap_err();

    assert_eq!(err, ErrorKind::JsonTooLarge);
}

#[test]
fn out_of_range_numbers_name_the_field() {
    let err = decode_movie(r#"{"title":"Up","year":2009,"runtime":-1,"genres":[]}"#).unwrap_err();
    assert_eq!(err, ErrorKind::JsonInvalidType);
    assert_eq!(err.as_field().unwrap().key(), "runtime");

    let err = decode_movie(r#"{"title":"Up","year":3000000000,"genres":[]}"#).unwrap_err();
    assert_eq!(err.as_field().unwrap().key(), "year");

    let err = decode_movie(r#"{"title":"Up","year":1e400,"genres":[]}"#).unwrap_err();
    assert_eq!(err.as_field().unwrap().key(), "year");
    assert_eq!(
        err.to_string(),
        r#"body contains incorrect JSON type for field "year""#
    );
}

#[test]
fn missing_required_field_is_unclassified() {
    let err = decode_movie(r#"{"title":"Up"}"#).unwrap_err();

    assert!(matches!(err, Error::Json(_)));
    assert_eq!(err.kind(), None);
}

#[test]
fn null_only_fits_optional_fields() {
    let movie = decode_movie(r#"{"title":"Up","year":2009,"runtime":null,"genres":[]}"#).unwrap();
    assert_eq!(movie.runtime, None);

    let err = decode_movie(r#"{"title":null,"year":2009,"genres":[]}"#).unwrap_err();
    assert_eq!(err.as_field().unwrap().key(), "title");
}

#[test]
fn default_limit_accepts_ordinary_bodies() {
    let map: HashMap<String, i64> = read_json_with_default_limit(&br#"{"a":1,"b":2}"#[..]).unwrap();
    assert_eq!(map.len(), 2);
}

struct BrokenStream;

impl Read for BrokenStream {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::ConnectionReset, "peer went away"))
    }
}

#[test]
fn stream_failures_pass_through() {
    let err = read_json::<HashMap<String, String>, _>(BrokenStream, 1024).unwrap_err();

    match err {
        Error::Io(io) => assert_eq!(io.kind(), io::ErrorKind::ConnectionReset),
        other => panic!("expected an I/O error, got {other:?}"),
    }
}
