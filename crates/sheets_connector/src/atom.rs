//! Atom entries sent as request bodies.
//!
//! The feeds answer in JSON when asked to, but only accept writes as Atom
//! `<entry>` documents. Each type here serializes to the children and
//! attributes of that root element through `quick_xml::se`.

use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};

use crate::errors::Result;
use crate::feed::{CellEntry, Link, ListEntry, Row, WorksheetEntry};

pub const ATOM_CONTENT_TYPE: &str = "application/atom+xml";

const ENTRY_TAG: &str = "entry";
const ATOM_NS: &str = "http://www.w3.org/2005/Atom";
const GS_NS: &str = "http://schemas.google.com/spreadsheets/2006";
const GSX_NS: &str = "http://schemas.google.com/spreadsheets/2006/extended";

const KIND_SCHEME: &str = "http://schemas.google.com/g/2005#kind";
const KIND_TERM_PREFIX: &str = "http://schemas.google.com/docs/2007#";

/// Serialize `entry` as an `<entry>` document.
pub fn to_entry_xml<T: Serialize + ?Sized>(entry: &T) -> Result<String> {
    Ok(quick_xml::se::to_string_with_root(ENTRY_TAG, entry)?)
}

#[derive(Debug, Serialize)]
struct AtomLink<'a> {
    #[serde(rename = "@rel")]
    rel: &'a str,
    #[serde(rename = "@type", skip_serializing_if = "Option::is_none")]
    kind: Option<&'a str>,
    #[serde(rename = "@href")]
    href: &'a str,
}

impl<'a> From<&'a Link> for AtomLink<'a> {
    fn from(link: &'a Link) -> Self {
        Self {
            rel: &link.rel,
            kind: link.r#type.as_deref(),
            href: &link.href,
        }
    }
}

#[derive(Debug, Serialize)]
struct Category<'a> {
    #[serde(rename = "@scheme")]
    scheme: &'a str,
    #[serde(rename = "@term")]
    term: String,
}

/// New document in the documents list.
#[derive(Debug, Serialize)]
pub struct ResourceWrite<'a> {
    #[serde(rename = "@xmlns")]
    xmlns: &'static str,
    category: Category<'a>,
    title: &'a str,
}

impl<'a> ResourceWrite<'a> {
    pub fn new(kind: &str, title: &'a str) -> Self {
        Self {
            xmlns: ATOM_NS,
            category: Category {
                scheme: KIND_SCHEME,
                term: format!("{KIND_TERM_PREFIX}{kind}"),
            },
            title,
        }
    }
}

/// Worksheet title and dimensions. Carries the id and links when updating
/// an existing worksheet.
#[derive(Debug, Serialize)]
pub struct WorksheetWrite<'a> {
    #[serde(rename = "@xmlns")]
    xmlns: &'static str,
    #[serde(rename = "@xmlns:gs")]
    xmlns_gs: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<&'a str>,
    title: &'a str,
    #[serde(rename = "gs:rowCount")]
    row_count: u32,
    #[serde(rename = "gs:colCount")]
    col_count: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    link: Vec<AtomLink<'a>>,
}

impl<'a> From<&'a WorksheetEntry> for WorksheetWrite<'a> {
    fn from(ws: &'a WorksheetEntry) -> Self {
        Self {
            xmlns: ATOM_NS,
            xmlns_gs: GS_NS,
            id: Some(ws.id.t.as_str()).filter(|id| !id.is_empty()),
            title: ws.title(),
            row_count: ws.row_count(),
            col_count: ws.col_count(),
            link: ws.link.iter().map(AtomLink::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct CellAttrs<'a> {
    #[serde(rename = "@row")]
    row: u32,
    #[serde(rename = "@col")]
    col: u32,
    #[serde(rename = "@inputValue")]
    input_value: &'a str,
}

/// Single cell update, addressed by the cell's own url.
#[derive(Debug, Serialize)]
pub struct CellWrite<'a> {
    #[serde(rename = "@xmlns")]
    xmlns: &'static str,
    #[serde(rename = "@xmlns:gs")]
    xmlns_gs: &'static str,
    id: &'a str,
    link: AtomLink<'a>,
    #[serde(rename = "gs:cell")]
    cell: CellAttrs<'a>,
}

impl<'a> CellWrite<'a> {
    pub fn new(url: &'a str, cell: &'a CellEntry) -> Self {
        Self {
            xmlns: ATOM_NS,
            xmlns_gs: GS_NS,
            id: url,
            link: AtomLink {
                rel: "edit",
                kind: Some(ATOM_CONTENT_TYPE),
                href: url,
            },
            cell: CellAttrs {
                row: cell.row(),
                col: cell.col(),
                input_value: &cell.cell.input_value,
            },
        }
    }
}

/// List-feed row with one `gsx:<field>` element per value.
#[derive(Debug)]
pub struct RowWrite<'a> {
    existing: Option<&'a ListEntry>,
    row: &'a Row,
}

impl<'a> RowWrite<'a> {
    pub fn insert(row: &'a Row) -> Self {
        Self {
            existing: None,
            row,
        }
    }

    /// Replacement for `entry`, keeping its id and links.
    pub fn update(entry: &'a ListEntry, row: &'a Row) -> Self {
        Self {
            existing: Some(entry),
            row,
        }
    }
}

impl Serialize for RowWrite<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("@xmlns", ATOM_NS)?;
        map.serialize_entry("@xmlns:gsx", GSX_NS)?;
        if let Some(entry) = self.existing {
            map.serialize_entry("id", &entry.id.t)?;
            let links: Vec<_> = entry.link.iter().map(AtomLink::from).collect();
            map.serialize_entry("link", &links)?;
        }
        for (field, value) in self.row {
            map.serialize_entry(&format!("gsx:{field}"), value)?;
        }
        map.end()
    }
}
