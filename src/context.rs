use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use hyper::HeaderMap;
use serde_json::{Map, Value};

use crate::errors::ApiError;
use crate::models::ListParams;

/// Controller action being served
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Index,
    Show,
    Store,
    Update,
    Destroy,
    Restore,
    Metadata,
}

impl Action {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Index => "index",
            Self::Show => "show",
            Self::Store => "store",
            Self::Update => "update",
            Self::Destroy => "destroy",
            Self::Restore => "restore",
            Self::Metadata => "metadata",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything an action knows about the incoming request.
///
/// Handlers build it from axum extractors; tests build it directly.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub action: Action,
    pub headers: HeaderMap,
    /// Raw query string pairs, for filters the resource defines itself
    pub query: HashMap<String, String>,
    pub params: ListParams,
    /// Path key for show/update/destroy/restore
    pub key: Option<String>,
    /// JSON object body for store/update
    pub body: Map<String, Value>,
}

impl RequestContext {
    #[must_use]
    pub fn new(action: Action) -> Self {
        Self {
            action,
            headers: HeaderMap::new(),
            query: HashMap::new(),
            params: ListParams::default(),
            key: None,
            body: Map::new(),
        }
    }

    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    #[must_use]
    pub fn with_query(mut self, query: HashMap<String, String>) -> Self {
        self.query = query;
        self
    }

    #[must_use]
    pub fn with_params(mut self, params: ListParams) -> Self {
        self.params = params;
        self
    }

    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Use a JSON value as the body; anything but an object is rejected.
    ///
    /// # Errors
    /// Returns `ApiError::BadRequest` for non-object payloads.
    pub fn with_body(mut self, body: Value) -> Result<Self, ApiError> {
        match body {
            Value::Object(map) => {
                self.body = map;
                Ok(self)
            }
            Value::Null => Ok(self),
            _ => Err(ApiError::bad_request("Request body must be a JSON object")),
        }
    }

    /// A raw query parameter by name
    #[must_use]
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    pub(crate) fn key_or_empty(&self) -> &str {
        self.key.as_deref().unwrap_or_default()
    }
}

/// Pre-action request check, run before any query or mutation.
///
/// Use it for authorization and for validation that needs more than the
/// field rules (headers, query parameters, cross-field checks). Return
/// `ApiError::ValidationFailed` for 406 or `ApiError::Forbidden` for 403.
///
/// # Example
/// ```rust,ignore
/// struct RequireEditor;
///
/// #[async_trait]
/// impl RequestValidator for RequireEditor {
///     async fn validate(&self, ctx: &RequestContext) -> Result<(), ApiError> {
///         match ctx.headers.get("x-role").and_then(|v| v.to_str().ok()) {
///             Some("editor") => Ok(()),
///             _ => Err(ApiError::forbidden("Editors only")),
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait RequestValidator: Send + Sync {
    async fn validate(&self, ctx: &RequestContext) -> Result<(), ApiError>;
}
