use sea_orm::Order;

use crate::config::ControllerConfig;
use crate::models::{ListParams, PerPage, Trashed};
use crate::sort::parse_order;

/// Request-scoped query specification.
///
/// Built from the query parameters on top of the controller defaults;
/// relation names are already filtered through the allow-list.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySpec {
    pub per_page: PerPage,
    /// 1-based
    pub page: u64,
    /// Sort column requested by the client
    pub sort: Option<String>,
    /// Configured default sort column; `None` means the primary key
    pub default_sort: Option<String>,
    pub order: Order,
    /// Fields to keep in rendered items; `None` keeps everything
    pub fields: Option<Vec<String>>,
    /// Relations to load, allow-listed
    pub with: Vec<String>,
    pub trashed: Trashed,
    pub only_data: bool,
    pub only_meta: bool,
}

impl QuerySpec {
    #[must_use]
    pub fn resolve(params: &ListParams, config: &ControllerConfig) -> Self {
        Self {
            per_page: params.items_per_page.unwrap_or(config.items_per_page),
            page: params.page.unwrap_or(1).max(1),
            sort: params.sort.clone(),
            default_sort: config.sort.clone(),
            order: params
                .order
                .as_deref()
                .map_or_else(|| config.order.clone(), parse_order),
            fields: project_fields(params.fields.as_deref(), config.fields.as_deref()),
            with: allowed_relations(params.with.as_deref().unwrap_or_default(), &config.allowed_with),
            trashed: params.show_trashed.unwrap_or_default(),
            only_data: params.only_data.is_some_and(|f| f.0),
            only_meta: params.only_meta.is_some_and(|f| f.0),
        }
    }
}

/// Intersect the client's relation list with the server allow-list.
///
/// Keeps the client's order and drops duplicates and blanks.
#[must_use]
pub fn allowed_relations(requested: &[String], allowed: &[String]) -> Vec<String> {
    let mut honored: Vec<String> = Vec::new();
    for name in requested.iter().map(|r| r.trim()).filter(|r| !r.is_empty()) {
        if !allowed.iter().any(|a| a == name) {
            tracing::debug!(relation = name, "Ignoring relation outside the allow-list");
            continue;
        }
        if !honored.iter().any(|h| h == name) {
            honored.push(name.to_string());
        }
    }
    honored
}

/// Client fields narrowed by the server projection, if one is configured
fn project_fields(requested: Option<&[String]>, configured: Option<&[String]>) -> Option<Vec<String>> {
    let requested: Vec<String> = requested
        .unwrap_or_default()
        .iter()
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty())
        .collect();
    match (requested.is_empty(), configured) {
        (true, configured) => configured.map(<[String]>::to_vec),
        (false, Some(configured)) => Some(
            requested
                .into_iter()
                .filter(|f| configured.contains(f))
                .collect(),
        ),
        (false, None) => Some(requested),
    }
}
