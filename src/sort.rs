use sea_orm::{ColumnTrait, sea_query::Order};

/// Convert an `order` parameter to a direction; anything but `asc` sorts descending
#[must_use]
pub fn parse_order(sort_order: &str) -> Order {
    if sort_order.trim().eq_ignore_ascii_case("asc") {
        Order::Asc
    } else {
        Order::Desc
    }
}

/// Find column by name or return default
pub fn find_column<S, C>(column_name: &str, columns: &[(S, C)], default: C) -> C
where
    S: AsRef<str>,
    C: ColumnTrait + Copy,
{
    columns
        .iter()
        .find(|(col_name, _)| col_name.as_ref() == column_name)
        .map_or(default, |&(_, col)| col)
}

/// Resolve the requested sort column against the sortable list.
///
/// Unknown names fall back to `default_column`, so a client can never order
/// by something the resource does not expose.
pub fn resolve_sort<S, C>(sort: Option<&str>, order_column_logic: &[(S, C)], default_column: C) -> C
where
    S: AsRef<str>,
    C: ColumnTrait + Copy,
{
    sort.map_or(default_column, |name| {
        find_column(name.trim(), order_column_logic, default_column)
    })
}
