use reqwest::Url;

use crate::normalize::normalize_header;

/// Category used when searching for spreadsheet documents.
pub const SPREADSHEET_CATEGORY: &str = "spreadsheet";

/// Which rows of a sheet an operation applies to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RowQuery {
    /// Every row in the sheet.
    #[default]
    All,
    /// A structured query expression sent to the service verbatim.
    Structured(String),
    /// Exact matches on field values, all of which must hold.
    Fields(Vec<(String, String)>),
}

impl RowQuery {
    pub fn structured(sq: impl Into<String>) -> Self {
        Self::Structured(sq.into())
    }

    pub fn fields<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::Fields(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Render into the list query sent to the service, `None` meaning no
    /// filtering at all.
    pub fn to_list_query(&self) -> Option<ListQuery> {
        match self {
            Self::All => None,
            Self::Structured(sq) => Some(ListQuery { sq: sq.clone() }),
            Self::Fields(fields) if fields.is_empty() => None,
            Self::Fields(fields) => Some(ListQuery {
                sq: structured_query(fields),
            }),
        }
    }
}

/// Build `field1 = "value1" and field2 = "value2"` from exact-match filters.
///
/// Field names are normalized, values are quoted as JSON string literals.
pub fn structured_query(fields: &[(String, String)]) -> String {
    fields
        .iter()
        .map(|(k, v)| {
            // Serializing a str can't fail.
            let v = serde_json::to_string(v).unwrap_or_default();
            format!("{} = {}", normalize_header(k), v)
        })
        .collect::<Vec<_>>()
        .join(" and ")
}

/// Query parameters for the list (row) feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub sq: String,
}

impl ListQuery {
    pub fn apply(&self, url: &mut Url) {
        url.query_pairs_mut().append_pair("sq", &self.sq);
    }
}

/// Query parameters for the cell feed. Bounds are inclusive and 1-based.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CellQuery {
    pub min_row: Option<u32>,
    pub max_row: Option<u32>,
    pub min_col: Option<u32>,
    pub max_col: Option<u32>,
}

impl CellQuery {
    /// Only the first row, where the headers live.
    pub fn header_row() -> Self {
        Self {
            max_row: Some(1),
            ..Default::default()
        }
    }

    pub fn contains(&self, row: u32, col: u32) -> bool {
        self.min_row.is_none_or(|min| row >= min)
            && self.max_row.is_none_or(|max| row <= max)
            && self.min_col.is_none_or(|min| col >= min)
            && self.max_col.is_none_or(|max| col <= max)
    }

    pub fn apply(&self, url: &mut Url) {
        let mut pairs = url.query_pairs_mut();
        let params = [
            ("min-row", self.min_row),
            ("max-row", self.max_row),
            ("min-col", self.min_col),
            ("max-col", self.max_col),
        ];
        for (key, val) in params {
            if let Some(val) = val {
                pairs.append_pair(key, &val.to_string());
            }
        }
    }
}

/// Document search by category and title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocsQuery {
    pub category: String,
    pub title: String,
    /// Ask the service for exact title matches only. The service ignores
    /// case even then, so results are still checked client side.
    pub title_exact: bool,
}

impl DocsQuery {
    pub fn spreadsheets_titled(title: impl Into<String>) -> Self {
        Self {
            category: SPREADSHEET_CATEGORY.to_string(),
            title: title.into(),
            title_exact: true,
        }
    }

    pub fn matches_title(&self, title: &str) -> bool {
        if self.title_exact {
            title.to_lowercase() == self.title.to_lowercase()
        } else {
            title.to_lowercase().contains(&self.title.to_lowercase())
        }
    }

    pub fn apply(&self, url: &mut Url) {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("title", &self.title);
        if self.title_exact {
            pairs.append_pair("title-exact", "true");
        }
    }
}
