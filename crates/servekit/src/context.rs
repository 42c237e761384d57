//! Request-scoped values and bearer-token extraction.
//!
//! Middleware attaches values to a request with [`context_set`] and handlers
//! read them back with [`context_get`]. Keys are typed, so a value can only be
//! read back as the type it was stored with:
//!
//! ```
//! use axum::http::Request;
//! use servekit::{context_get, context_set, ContextKey};
//!
//! #[derive(Clone)]
//! struct User {
//!     id: u64,
//! }
//!
//! const USER: ContextKey<User> = ContextKey::new("user");
//!
//! let req = Request::new(());
//! let req = context_set(req, &USER, User { id: 7 });
//! assert_eq!(context_get(&req, &USER).id, 7);
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use http::{header::AUTHORIZATION, HeaderMap, Request};

use crate::error::ErrorKind;

/// Typed key for a request-scoped value.
pub struct ContextKey<T> {
    name: &'static str,
    _value: PhantomData<fn() -> T>,
}

impl<T> ContextKey<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _value: PhantomData,
        }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> fmt::Debug for ContextKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ContextKey").field(&self.name).finish()
    }
}

/// Values attached to a request, stored in its extensions.
#[derive(Clone, Default)]
struct RequestContext {
    values: HashMap<&'static str, Arc<dyn Any + Send + Sync>>,
}

/// Return `req` with `value` associated to `key`.
///
/// A value previously stored under the same key is replaced.
pub fn context_set<B, T>(mut req: Request<B>, key: &ContextKey<T>, value: T) -> Request<B>
where
    T: Send + Sync + 'static,
{
    let mut context = req
        .extensions_mut()
        .remove::<RequestContext>()
        .unwrap_or_default();
    context.values.insert(key.name, Arc::new(value));
    req.extensions_mut().insert(context);
    req
}

/// Read the value associated to `key`.
///
/// # Panics
///
/// Panics if nothing was stored under `key`, or if a value of another type
/// was stored under the same name. Either means the middleware chain is
/// wired incorrectly.
pub fn context_get<B, T>(req: &Request<B>, key: &ContextKey<T>) -> T
where
    T: Clone + Send + Sync + 'static,
{
    let Some(value) = lookup(req, key) else {
        panic!("key: {} doesn't exist on context", key.name);
    };
    match value.downcast_ref::<T>() {
        Some(value) => value.clone(),
        None => panic!(
            "key: {} holds a value of another type than {}",
            key.name,
            std::any::type_name::<T>()
        ),
    }
}

/// Read the value associated to `key`, or `None` if it was never set.
///
/// # Panics
///
/// Panics if a value of another type was stored under the same name.
pub fn context_try_get<B, T>(req: &Request<B>, key: &ContextKey<T>) -> Option<T>
where
    T: Clone + Send + Sync + 'static,
{
    lookup(req, key).map(|_| context_get(req, key))
}

fn lookup<'a, B, T>(
    req: &'a Request<B>,
    key: &ContextKey<T>,
) -> Option<&'a (dyn Any + Send + Sync + 'static)> {
    req.extensions()
        .get::<RequestContext>()
        .and_then(|context| context.values.get(key.name))
        .map(Arc::as_ref)
}

/// Extract the token from an `Authorization: Bearer <token>` header.
///
/// The token is returned verbatim; verifying it is up to the caller.
///
/// # Errors
///
/// - [`ErrorKind::NoAuthHeader`] if the header is missing or empty.
/// - [`ErrorKind::InvalidAuthHeader`] unless the header is exactly two parts
///   separated by a single space, the first being `Bearer` in any case and
///   the second valid UTF-8.
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, ErrorKind> {
    let Some(header) = headers.get(AUTHORIZATION) else {
        return Err(ErrorKind::NoAuthHeader);
    };
    if header.is_empty() {
        return Err(ErrorKind::NoAuthHeader);
    }

    // Header values may carry non-ASCII bytes; only the token has to be text.
    match header.as_bytes().split(|b| *b == b' ').collect::<Vec<_>>().as_slice() {
        [scheme, token] if scheme.eq_ignore_ascii_case(b"bearer") => {
            std::str::from_utf8(*token).map_err(|_| ErrorKind::InvalidAuthHeader)
        }
        _ => Err(ErrorKind::InvalidAuthHeader),
    }
}
