//! Startup-time mapping from URL segments to resource controllers.
//!
//! ```rust,ignore
//! let app = ResourceRegistry::new(db)
//!     .register("posts", PostResource, ControllerConfig::new().allowed_with(["comments"]))?
//!     .register("tags", TagResource, ControllerConfig::new())?
//!     .with_error_config(ErrorConfig::from_env())
//!     .into_router();
//! ```

use std::str::FromStr;

use axum::{Router, middleware};
use sea_orm::DatabaseConnection;

use crate::config::{ControllerConfig, ErrorConfig};
use crate::controller::ResourceController;
use crate::errors::render_errors;
use crate::routes::resource_router;
use crate::traits::Resource;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("resource '{0}' is already registered")]
    Duplicate(String),
    #[error("invalid resource name '{0}': use lowercase ASCII letters, digits, '-' or '_'")]
    InvalidName(String),
    #[error("resource '{resource}' has no column '{column}'")]
    UnknownColumn { resource: String, column: String },
}

pub struct ResourceRegistry {
    db: DatabaseConnection,
    routes: Vec<(String, Router)>,
    error_config: ErrorConfig,
}

impl ResourceRegistry {
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            routes: Vec::new(),
            error_config: ErrorConfig::default(),
        }
    }

    /// Mount `resource` under `/{name}`.
    ///
    /// # Errors
    /// Returns `RegistryError` for a taken or malformed name, or when
    /// `get_item_by` names a column the entity does not have.
    pub fn register<R: Resource>(
        mut self,
        name: impl Into<String>,
        resource: R,
        config: ControllerConfig,
    ) -> Result<Self, RegistryError> {
        let name = name.into();
        if !is_valid_name(&name) {
            return Err(RegistryError::InvalidName(name));
        }
        if self.routes.iter().any(|(taken, _)| *taken == name) {
            return Err(RegistryError::Duplicate(name));
        }
        if let Some(column) = &config.get_item_by {
            if R::Column::from_str(column).is_err() {
                return Err(RegistryError::UnknownColumn {
                    resource: name,
                    column: column.clone(),
                });
            }
        }

        tracing::debug!(resource = %name, entity = R::RESOURCE_NAME_PLURAL, "Registered resource");
        let controller = ResourceController::new(resource, config, self.db.clone()).into_shared();
        self.routes.push((name, resource_router(controller)));
        Ok(self)
    }

    #[must_use]
    pub fn with_error_config(mut self, config: ErrorConfig) -> Self {
        self.error_config = config;
        self
    }

    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.routes.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// One router serving every registered resource
    #[must_use]
    pub fn into_router(self) -> Router {
        let router = self
            .routes
            .into_iter()
            .fold(Router::new(), |router, (name, routes)| {
                router.nest(&format!("/{name}"), routes)
            });
        router.layer(middleware::from_fn_with_state(self.error_config, render_errors))
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
}
