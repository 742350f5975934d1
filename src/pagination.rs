use hyper::HeaderMap;
use serde::Serialize;
use serde_json::{Map, Value};

/// Sanitize resource name by removing control characters for HTTP headers
fn sanitize_resource_name(name: &str) -> String {
    name.chars().filter(|c| c.is_ascii() && !c.is_ascii_control()).collect()
}

/// Build the `Content-Range` header for a page of results.
///
/// # Arguments
///
/// * `offset` - The starting point of the range.
/// * `count` - How many items the page actually holds.
/// * `total_count` - The total number of items available.
/// * `resource_name` - The name of the resource being paginated.
#[must_use]
pub fn calculate_content_range(offset: u64, count: u64, total_count: u64, resource_name: &str) -> HeaderMap {
    let last = if count == 0 { offset } else { offset + count - 1 };
    let safe_name = sanitize_resource_name(resource_name);
    let content_range = format!("{safe_name} {offset}-{last}/{total_count}");

    let mut headers = HeaderMap::new();
    if let Ok(value) = content_range.parse() {
        headers.insert("Content-Range", value);
    }
    headers
}

/// Pagination block merged into `meta` of list responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    pub total: u64,
    pub per_page: u64,
    pub current_page: u64,
    pub last_page: u64,
    /// 1-based position of the first item on the page; `None` when empty
    pub from: Option<u64>,
    pub to: Option<u64>,
}

impl PageMeta {
    /// `page` is 1-based; `count` is the number of items actually returned
    #[must_use]
    pub fn new(total: u64, per_page: u64, page: u64, count: u64) -> Self {
        let per_page = per_page.max(1);
        let page = page.max(1);
        let offset = (page - 1).saturating_mul(per_page);
        Self {
            total,
            per_page,
            current_page: page,
            last_page: total.div_ceil(per_page).max(1),
            from: (count > 0).then_some(offset.saturating_add(1)),
            to: (count > 0).then_some(offset.saturating_add(count)),
        }
    }

    /// Meta for an unpaginated (`items_per_page=all`) listing
    #[must_use]
    pub fn all(total: u64) -> Self {
        Self {
            total,
            per_page: total,
            current_page: 1,
            last_page: 1,
            from: (total > 0).then_some(1),
            to: (total > 0).then_some(total),
        }
    }

    #[must_use]
    pub fn offset(&self) -> u64 {
        self.from.map_or(0, |from| from - 1)
    }

    #[must_use]
    pub fn into_map(self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}
