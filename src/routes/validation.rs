use axum::{
    async_trait,
    extract::{
        rejection::{JsonRejection, PathRejection},
        FromRequest, FromRequestParts, OriginalUri, Path, Request,
    },
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use std::convert::Infallible;

use crate::error::{AppError, Result};

/// JSON body extractor whose rejections use the application error body
pub struct AppJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for AppJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(AppJson(value)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

fn json_rejection(rejection: JsonRejection) -> AppError {
    tracing::debug!("Rejected JSON body: {}", rejection.body_text());
    AppError::validation("body", rejection.body_text())
}

/// Path parameter extractor whose rejections use the application error body
///
/// Every path parameter in the API is a numeric id, so a value that does not
/// parse is reported against `id`.
pub struct AppPath<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for AppPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(AppPath(value)),
            Err(rejection) => Err(path_rejection(rejection)),
        }
    }
}

fn path_rejection(rejection: PathRejection) -> AppError {
    tracing::debug!("Rejected path parameters: {}", rejection.body_text());
    AppError::validation("id", "A valid integer is required")
}

/// Raw query string split into decoded pairs, keeping repeated keys
///
/// Filters such as `tags=a&tags=b` need every value, which the stock `Query`
/// extractor does not keep.
#[derive(Debug, Clone, Default)]
pub struct QueryParams {
    path: String,
    pairs: Vec<(String, String)>,
}

#[async_trait]
impl<S> FromRequestParts<S> for QueryParams
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        // Nested routers strip their prefix from `parts.uri`; page links need
        // the full path
        let uri = parts
            .extensions
            .get::<OriginalUri>()
            .map(|original| &original.0)
            .unwrap_or(&parts.uri);
        Ok(QueryParams::parse(uri.path(), uri.query().unwrap_or_default()))
    }
}

impl QueryParams {
    pub fn parse(path: &str, query: &str) -> Self {
        let pairs = url::form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        Self {
            path: path.to_string(),
            pairs,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// First value for `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Every non-empty value for `key`, in order
    pub fn get_all(&self, key: &str) -> Vec<String> {
        self.pairs
            .iter()
            .filter(|(k, v)| k == key && !v.is_empty())
            .map(|(_, v)| v.clone())
            .collect()
    }

    pub fn get_i64(&self, key: &'static str) -> Result<Option<i64>> {
        match self.get(key).filter(|v| !v.is_empty()) {
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|_| AppError::validation(key, "A valid integer is required")),
            None => Ok(None),
        }
    }

    /// Booleans accept `1/0`, `true/false` and `True/False`
    pub fn get_bool(&self, key: &'static str) -> Result<Option<bool>> {
        match self.get(key).filter(|v| !v.is_empty()) {
            Some(raw) => parse_flag(raw)
                .map(Some)
                .ok_or_else(|| AppError::validation(key, "Must be a valid boolean")),
            None => Ok(None),
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw {
        "1" | "true" | "True" => Some(true),
        "0" | "false" | "False" => Some(false),
        _ => None,
    }
}
