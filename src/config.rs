//! Controller and error-rendering configuration.
//!
//! ```rust,ignore
//! let config = ControllerConfig::new()
//!     .items_per_page(PerPage::Count(20))
//!     .sort("created_at")
//!     .allowed_with(["comments", "author"])
//!     .appends(Appends::mapped([("comment_count", "comments")]))
//!     .validator(Action::Store, RequireEditor);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use sea_orm::Order;

use crate::context::{Action, RequestValidator};
use crate::models::{Flag, PerPage};

/// Computed attributes added to every rendered item
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Appends {
    #[default]
    None,
    /// Always appended
    Attributes(Vec<String>),
    /// Attribute → relation it reads; appended only when that relation was loaded
    Mapped(Vec<(String, String)>),
}

impl Appends {
    pub fn attributes<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Attributes(names.into_iter().map(Into::into).collect())
    }

    pub fn mapped<I, A, R>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (A, R)>,
        A: Into<String>,
        R: Into<String>,
    {
        Self::Mapped(pairs.into_iter().map(|(a, r)| (a.into(), r.into())).collect())
    }

    /// Attributes to append given the relations that were actually loaded
    #[must_use]
    pub fn resolve(&self, loaded: &[String]) -> Vec<&str> {
        match self {
            Self::None => Vec::new(),
            Self::Attributes(names) => names.iter().map(String::as_str).collect(),
            Self::Mapped(pairs) => pairs
                .iter()
                .filter(|(_, relation)| loaded.contains(relation))
                .map(|(attribute, _)| attribute.as_str())
                .collect(),
        }
    }
}

/// Per-controller options; every field has a default
#[derive(Clone)]
pub struct ControllerConfig {
    pub items_per_page: PerPage,
    /// Default sort column; `None` means the primary key
    pub sort: Option<String>,
    pub order: Order,
    /// Server-side projection; `None` means every column
    pub fields: Option<Vec<String>>,
    /// Relations a client may request through `with`
    pub allowed_with: Vec<String>,
    /// Lookup column for keyed actions; `None` means the primary key
    pub get_item_by: Option<String>,
    pub appends: Appends,
    validators: HashMap<Action, Arc<dyn RequestValidator>>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            items_per_page: PerPage::default(),
            sort: None,
            order: Order::Desc,
            fields: None,
            allowed_with: Vec::new(),
            get_item_by: None,
            appends: Appends::None,
            validators: HashMap::new(),
        }
    }
}

impl fmt::Debug for ControllerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut validated: Vec<&str> = self.validators.keys().map(|a| a.as_str()).collect();
        validated.sort_unstable();
        f.debug_struct("ControllerConfig")
            .field("items_per_page", &self.items_per_page)
            .field("sort", &self.sort)
            .field("order", &self.order)
            .field("fields", &self.fields)
            .field("allowed_with", &self.allowed_with)
            .field("get_item_by", &self.get_item_by)
            .field("appends", &self.appends)
            .field("validators", &validated)
            .finish()
    }
}

impl ControllerConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn items_per_page(mut self, per_page: PerPage) -> Self {
        self.items_per_page = per_page;
        self
    }

    #[must_use]
    pub fn sort(mut self, column: impl Into<String>) -> Self {
        self.sort = Some(column.into());
        self
    }

    #[must_use]
    pub fn order(mut self, order: Order) -> Self {
        self.order = order;
        self
    }

    #[must_use]
    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn allowed_with<I, S>(mut self, relations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_with = relations.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn get_item_by(mut self, column: impl Into<String>) -> Self {
        self.get_item_by = Some(column.into());
        self
    }

    #[must_use]
    pub fn appends(mut self, appends: Appends) -> Self {
        self.appends = appends;
        self
    }

    /// Run `validator` before `action`
    #[must_use]
    pub fn validator(mut self, action: Action, validator: impl RequestValidator + 'static) -> Self {
        self.validators.insert(action, Arc::new(validator));
        self
    }

    #[must_use]
    pub fn validator_for(&self, action: Action) -> Option<&Arc<dyn RequestValidator>> {
        self.validators.get(&action)
    }
}

/// Settings for [`render_errors`](crate::errors::render_errors)
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorConfig {
    /// Expose internal error details in 500 responses, including backtrace
    /// frames captured where the error was raised
    pub debug: bool,
}

impl ErrorConfig {
    /// Read `APP_DEBUG`; unset or unparsable means production mode
    #[must_use]
    pub fn from_env() -> Self {
        let debug = std::env::var("APP_DEBUG")
            .ok()
            .and_then(|value| value.parse::<Flag>().ok())
            .is_some_and(|flag| flag.0);
        Self { debug }
    }
}
