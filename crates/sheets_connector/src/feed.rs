//! Feed and entry shapes as returned by the remote services in their JSON
//! (`alt=json`) encoding.
//!
//! Text nodes are objects of the form `{"$t": "..."}`, numbers travel as
//! decimal strings, and list-feed row values are keyed `gsx$<field>`.

use std::fmt;
use std::num::ParseIntError;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, SheetsError};

/// A row as seen by callers: normalized field name -> text value.
pub type Row = IndexMap<String, String>;

/// Prefix of list-feed keys holding row values.
pub const FIELD_PREFIX: &str = "gsx$";

/// Marker in resource ids preceding the spreadsheet key (url-encoded ':').
const RESOURCE_ID_SEPARATOR: &str = "%3A";

const EDIT_REL: &str = "edit";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Text {
    #[serde(rename = "$t", default)]
    pub t: String,
}

impl Text {
    pub fn new(t: impl Into<String>) -> Self {
        Self { t: t.into() }
    }
}

impl fmt::Display for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.t)
    }
}

/// Unsigned count wrapped in a text node, e.g. `{"$t": "10"}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Text", into = "Text")]
pub struct TextCount(pub u32);

impl TryFrom<Text> for TextCount {
    type Error = ParseIntError;

    fn try_from(value: Text) -> Result<Self, Self::Error> {
        Ok(Self(value.t.trim().parse()?))
    }
}

impl From<TextCount> for Text {
    fn from(value: TextCount) -> Self {
        Text::new(value.0.to_string())
    }
}

/// Unsigned integer carried as a bare decimal string, e.g. `"3"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Index(pub u32);

impl TryFrom<String> for Index {
    type Error = ParseIntError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Ok(Self(value.trim().parse()?))
    }
}

impl From<Index> for String {
    fn from(value: Index) -> Self {
        value.0.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub rel: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,
    pub href: String,
}

impl Link {
    pub fn edit(href: impl Into<String>) -> Self {
        Self {
            rel: EDIT_REL.to_string(),
            r#type: Some("application/atom+xml".to_string()),
            href: href.into(),
        }
    }
}

fn edit_link<'a>(links: &'a [Link], id: &Text) -> Result<&'a str> {
    links
        .iter()
        .find(|l| l.rel == EDIT_REL)
        .map(|l| l.href.as_str())
        .ok_or_else(|| SheetsError::InvalidFeed(format!("entry '{id}' has no edit link")))
}

/// Last `/`-separated segment of an entry id url.
fn id_tail(id: &str) -> &str {
    id.rsplit('/').next().unwrap_or(id)
}

/// Top level of a feed response.
#[derive(Debug, Deserialize)]
pub struct FeedEnvelope<T> {
    pub feed: T,
}

/// Top level of a single entry response.
#[derive(Debug, Serialize, Deserialize)]
pub struct EntryEnvelope<T> {
    pub entry: T,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct WorksheetFeed {
    #[serde(default)]
    pub title: Text,
    #[serde(default)]
    pub entry: Vec<WorksheetEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorksheetEntry {
    #[serde(default, skip_serializing_if = "is_empty_text")]
    pub id: Text,
    pub title: Text,
    #[serde(rename = "gs$rowCount")]
    pub row_count: TextCount,
    #[serde(rename = "gs$colCount")]
    pub col_count: TextCount,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub link: Vec<Link>,
}

fn is_empty_text(t: &Text) -> bool {
    t.t.is_empty()
}

impl WorksheetEntry {
    /// Entry for a worksheet that doesn't exist yet.
    pub fn new(title: impl Into<String>, rows: u32, cols: u32) -> Self {
        Self {
            id: Text::default(),
            title: Text::new(title),
            row_count: TextCount(rows),
            col_count: TextCount(cols),
            link: Vec::new(),
        }
    }

    /// Worksheet id, the last path segment of the entry id.
    pub fn worksheet_id(&self) -> &str {
        id_tail(&self.id.t)
    }

    pub fn title(&self) -> &str {
        &self.title.t
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = Text::new(title);
    }

    pub fn row_count(&self) -> u32 {
        self.row_count.0
    }

    pub fn col_count(&self) -> u32 {
        self.col_count.0
    }

    pub fn set_col_count(&mut self, cols: u32) {
        self.col_count = TextCount(cols);
    }

    pub fn edit_url(&self) -> Result<&str> {
        edit_link(&self.link, &self.id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CellFeed {
    #[serde(default)]
    pub entry: Vec<CellEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellEntry {
    #[serde(rename = "gs$cell")]
    pub cell: Cell,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cell {
    pub row: Index,
    pub col: Index,
    #[serde(default)]
    pub input_value: String,
    /// Displayed (computed) text.
    #[serde(rename = "$t", default)]
    pub text: String,
}

impl CellEntry {
    pub fn new(row: u32, col: u32, value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            cell: Cell {
                row: Index(row),
                col: Index(col),
                input_value: value.clone(),
                text: value,
            },
        }
    }

    pub fn row(&self) -> u32 {
        self.cell.row.0
    }

    pub fn col(&self) -> u32 {
        self.cell.col.0
    }

    pub fn text(&self) -> &str {
        &self.cell.text
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ListFeed {
    #[serde(default)]
    pub entry: Vec<ListEntry>,
}

/// One row of a list feed.
///
/// Only the id, links and `gsx$` fields are interpreted, everything else
/// the service sends along (updated, category, content) is kept opaque.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListEntry {
    pub id: Text,
    #[serde(default)]
    pub link: Vec<Link>,
    #[serde(flatten)]
    pub fields: IndexMap<String, serde_json::Value>,
}

impl ListEntry {
    pub fn new(id: impl Into<String>, edit_url: impl Into<String>, row: &Row) -> Self {
        Self {
            id: Text::new(id),
            link: vec![Link::edit(edit_url)],
            fields: row_fields(row),
        }
    }

    /// Row id, the last path segment of the entry id.
    pub fn row_id(&self) -> &str {
        id_tail(&self.id.t)
    }

    pub fn edit_url(&self) -> Result<&str> {
        edit_link(&self.link, &self.id)
    }

    /// The row values keyed by normalized field name.
    pub fn custom(&self) -> Row {
        self.fields
            .iter()
            .filter_map(|(k, v)| {
                let name = k.strip_prefix(FIELD_PREFIX)?;
                let text = match v.get("$t") {
                    Some(serde_json::Value::String(s)) => s.clone(),
                    _ => String::new(),
                };
                Some((name.to_string(), text))
            })
            .collect()
    }
}

/// Encode row values as list-feed fields.
pub fn row_fields(row: &Row) -> IndexMap<String, serde_json::Value> {
    row.iter()
        .map(|(k, v)| {
            (
                format!("{FIELD_PREFIX}{k}"),
                serde_json::json!({ "$t": v }),
            )
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ResourceFeed {
    #[serde(default)]
    pub entry: Vec<ResourceEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceEntry {
    pub id: Text,
    pub title: Text,
}

impl ResourceEntry {
    pub fn title(&self) -> &str {
        &self.title.t
    }

    /// Spreadsheet key embedded in the resource id, e.g. the `0Abc` in
    /// `.../feeds/id/spreadsheet%3A0Abc`.
    pub fn resource_id(&self) -> &str {
        let id = self.id.t.as_str();
        id.rsplit(RESOURCE_ID_SEPARATOR).next().unwrap_or(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_worksheet_feed() {
        let body = r#"{
            "version": "1.0",
            "encoding": "UTF-8",
            "feed": {
                "title": {"type": "text", "$t": "Contacts"},
                "entry": [{
                    "id": {"$t": "https://spreadsheets.google.com/feeds/worksheets/0Abc/private/full/od6"},
                    "updated": {"$t": "2013-01-01T00:00:00.000Z"},
                    "title": {"type": "text", "$t": "Sheet1"},
                    "link": [
                        {"rel": "self", "type": "application/atom+xml", "href": "https://example.test/self"},
                        {"rel": "edit", "type": "application/atom+xml", "href": "https://example.test/edit/od6"}
                    ],
                    "gs$rowCount": {"$t": "100"},
                    "gs$colCount": {"$t": "20"}
                }]
            }
        }"#;

        let feed: FeedEnvelope<WorksheetFeed> = serde_json::from_str(body).unwrap();
        let feed = feed.feed;
        assert_eq!("Contacts", feed.title.t);
        assert_eq!(1, feed.entry.len());

        let ws = &feed.entry[0];
        assert_eq!("od6", ws.worksheet_id());
        assert_eq!("Sheet1", ws.title());
        assert_eq!(100, ws.row_count());
        assert_eq!(20, ws.col_count());
        assert_eq!("https://example.test/edit/od6", ws.edit_url().unwrap());
    }

    #[test]
    fn empty_feed_has_no_entries() {
        let feed: FeedEnvelope<ListFeed> =
            serde_json::from_str(r#"{"feed": {"title": {"$t": "Sheet1"}}}"#).unwrap();
        assert!(feed.feed.entry.is_empty());
    }

    #[test]
    fn bad_count_is_an_error() {
        let res = serde_json::from_str::<WorksheetEntry>(
            r#"{"title": {"$t": "x"}, "gs$rowCount": {"$t": "many"}, "gs$colCount": {"$t": "1"}}"#,
        );
        assert!(res.is_err());
    }

    #[test]
    fn worksheet_entry_round_trips_counts_as_text() {
        let mut ws = WorksheetEntry::new("People", 10, 10);
        ws.set_col_count(11);
        let value = serde_json::to_value(&ws).unwrap();
        assert_eq!(
            serde_json::json!({
                "title": {"$t": "People"},
                "gs$rowCount": {"$t": "10"},
                "gs$colCount": {"$t": "11"},
            }),
            value
        );
    }

    #[test]
    fn parse_cells() {
        let body = r#"{"feed": {"entry": [
            {"gs$cell": {"row": "1", "col": "1", "inputValue": "Name", "$t": "Name"}},
            {"gs$cell": {"row": "1", "col": "3", "inputValue": "=1+1", "$t": "2"}}
        ]}}"#;
        let feed: FeedEnvelope<CellFeed> = serde_json::from_str(body).unwrap();
        let cells = feed.feed.entry;
        assert_eq!(vec![1, 3], cells.iter().map(|c| c.col()).collect::<Vec<_>>());
        assert_eq!("2", cells[1].text());
        assert_eq!("=1+1", cells[1].cell.input_value);
    }

    #[test]
    fn list_entry_custom_fields() {
        let body = r#"{
            "id": {"$t": "https://spreadsheets.google.com/feeds/list/0Abc/od6/private/full/cokwr"},
            "updated": {"$t": "2013-01-01T00:00:00.000Z"},
            "category": [{"scheme": "http://schemas.google.com/spreadsheets/2006", "term": "list"}],
            "title": {"type": "text", "$t": "Ann"},
            "link": [{"rel": "edit", "href": "https://example.test/edit/cokwr"}],
            "gsx$name": {"$t": "Ann"},
            "gsx$age": {"$t": "30"},
            "gsx$email": {"$t": ""}
        }"#;
        let entry: ListEntry = serde_json::from_str(body).unwrap();

        assert_eq!("cokwr", entry.row_id());
        let row = entry.custom();
        let expected: Row = [("name", "Ann"), ("age", "30"), ("email", "")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert_eq!(expected, row);
    }

    #[test]
    fn missing_edit_link() {
        let entry = ListEntry {
            id: Text::new("row1"),
            link: Vec::new(),
            fields: IndexMap::new(),
        };
        assert!(matches!(entry.edit_url(), Err(SheetsError::InvalidFeed(_))));
    }

    #[test]
    fn resource_id_from_entry() {
        let entry = ResourceEntry {
            id: Text::new("https://docs.google.com/feeds/id/spreadsheet%3A0AbcDEF"),
            title: Text::new("Contacts"),
        };
        assert_eq!("0AbcDEF", entry.resource_id());
    }
}
