//! Generic REST resource controllers for sea-orm entities, served with axum.
//!
//! Implement [`Resource`] for an entity, register it with a
//! [`ResourceRegistry`] and mount the resulting router.

pub mod config;
pub mod context;
pub mod controller;
pub mod errors;
pub mod models;
pub mod pagination;
pub mod query;
pub mod registry;
pub mod routes;
pub mod sort;
pub mod traits;
pub mod validation;

pub use config::{Appends, ControllerConfig, ErrorConfig};
pub use context::{Action, RequestContext, RequestValidator};
pub use controller::{ListResponse, ResourceController};
pub use errors::{ApiError, ErrorDetails, render_errors};
pub use models::{Flag, ListParams, PerPage, Trashed};
pub use query::QuerySpec;
pub use registry::{RegistryError, ResourceRegistry};
pub use traits::{MergeIntoActiveModel, Resource};
pub use validation::{Presence, Rule, Rules, ValidationError, ValidationErrors};
