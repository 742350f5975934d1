use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde_with::{DisplayFromStr, StringWithSeparator, formats::CommaSeparator, serde_as};
use utoipa::IntoParams;

/// Query parameters understood by the `index` and `show` actions.
///
/// # Pagination
/// `items_per_page` takes a positive number or `all`; `page` is 1-based:
/// ```text
/// GET /posts?items_per_page=10&page=2
/// ```
///
/// # Sorting
/// `sort` names a column, `order` is `asc` or `desc`:
/// ```text
/// GET /posts?sort=title&order=asc
/// ```
///
/// # Relations and projection
/// `with` and `fields` are comma separated. Relations outside the
/// controller's allow-list are ignored:
/// ```text
/// GET /posts?with=comments,author&fields=id,title
/// ```
///
/// # Envelope flags
/// `only_meta` returns metadata without items, `only_data` skips generated
/// metadata, `show_trashed` is `true`, `false` or `only`.
#[serde_as]
#[derive(Debug, Clone, Deserialize, IntoParams, Default)]
#[into_params(parameter_in = Query)]
pub struct ListParams {
    /// Page size, or `all` to disable pagination.
    ///
    /// Example: `25`
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[param(value_type = Option<String>, example = "25")]
    pub items_per_page: Option<PerPage>,
    /// Page number (1-based).
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[param(value_type = Option<u64>, example = 1)]
    pub page: Option<u64>,
    /// Column to sort by.
    #[param(example = "created_at")]
    pub sort: Option<String>,
    /// Sort direction (`asc` or `desc`).
    #[param(example = "desc")]
    pub order: Option<String>,
    /// Return only the metadata envelope.
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[param(value_type = Option<String>, example = "1")]
    pub only_meta: Option<Flag>,
    /// Skip generated metadata.
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[param(value_type = Option<String>, example = "0")]
    pub only_data: Option<Flag>,
    /// Relations to eager-load, comma separated.
    #[serde_as(as = "Option<StringWithSeparator::<CommaSeparator, String>>")]
    #[param(value_type = Option<String>, example = "comments")]
    pub with: Option<Vec<String>>,
    /// Include soft-deleted rows (`true`), or return only them (`only`).
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[param(value_type = Option<String>, example = "true")]
    pub show_trashed: Option<Trashed>,
    /// Fields to return, comma separated.
    #[serde_as(as = "Option<StringWithSeparator::<CommaSeparator, String>>")]
    #[param(value_type = Option<String>, example = "id,title")]
    pub fields: Option<Vec<String>>,
}

/// Page size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerPage {
    Count(u64),
    All,
}

impl Default for PerPage {
    fn default() -> Self {
        Self::Count(50)
    }
}

impl FromStr for PerPage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        // LIMIT is bound as a signed 64-bit integer
        match s.parse::<u64>() {
            Ok(n) if n > 0 && i64::try_from(n).is_ok() => Ok(Self::Count(n)),
            _ => Err(format!("items_per_page must be a positive number or 'all', got '{s}'")),
        }
    }
}

impl fmt::Display for PerPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count(n) => write!(f, "{n}"),
            Self::All => f.write_str("all"),
        }
    }
}

/// Boolean query flag: `1/0`, `true/false`, `yes/no`, `on/off`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Flag(pub bool);

impl FromStr for Flag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Self(true)),
            "" | "0" | "false" | "no" | "off" => Ok(Self(false)),
            other => Err(format!("expected a boolean flag, got '{other}'")),
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which rows soft-deletable resources return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Trashed {
    #[default]
    Without,
    With,
    Only,
}

impl FromStr for Trashed {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("only") {
            return Ok(Self::Only);
        }
        s.parse::<Flag>()
            .map(|flag| if flag.0 { Self::With } else { Self::Without })
            .map_err(|_| format!("show_trashed must be true, false or 'only', got '{s}'"))
    }
}

impl fmt::Display for Trashed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Without => "false",
            Self::With => "true",
            Self::Only => "only",
        })
    }
}
