//! Seams to the two remote collaborators.
//!
//! Everything the rest of the crate knows about the outside world goes
//! through these traits. [`crate::http::HttpBackend`] talks to the hosted
//! services, [`crate::memory::MemoryBackend`] keeps everything in process.

use std::fmt::Debug;

use futures::future::BoxFuture;

use crate::config::Credentials;
use crate::errors::Result;
use crate::feed::{CellEntry, ListEntry, ResourceEntry, Row, WorksheetEntry, WorksheetFeed};
use crate::query::{CellQuery, DocsQuery, ListQuery};

/// Kind of document to create through the documents service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Spreadsheet,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Spreadsheet => "spreadsheet",
        }
    }
}

/// Document search and creation.
pub trait DocsService: Debug + Sync + Send {
    /// Search documents, returning candidates in service order.
    fn search<'a>(&'a self, query: &'a DocsQuery) -> BoxFuture<'a, Result<Vec<ResourceEntry>>>;

    fn create_resource<'a>(
        &'a self,
        kind: ResourceKind,
        title: &'a str,
    ) -> BoxFuture<'a, Result<ResourceEntry>>;

    fn get_resource<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<ResourceEntry>>;
}

/// Worksheet, cell and row operations on a single spreadsheet identified by
/// `key`.
pub trait SpreadsheetService: Debug + Sync + Send {
    fn worksheets_feed<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<WorksheetFeed>>;

    fn add_worksheet<'a>(
        &'a self,
        key: &'a str,
        title: &'a str,
        rows: u32,
        cols: u32,
    ) -> BoxFuture<'a, Result<WorksheetEntry>>;

    /// Persist title and dimensions, returning the updated entry.
    fn update_worksheet<'a>(
        &'a self,
        key: &'a str,
        worksheet: &'a WorksheetEntry,
    ) -> BoxFuture<'a, Result<WorksheetEntry>>;

    fn delete_worksheet<'a>(
        &'a self,
        key: &'a str,
        worksheet: &'a WorksheetEntry,
    ) -> BoxFuture<'a, Result<()>>;

    fn cells<'a>(
        &'a self,
        key: &'a str,
        worksheet_id: &'a str,
        query: &'a CellQuery,
    ) -> BoxFuture<'a, Result<Vec<CellEntry>>>;

    fn update_cell<'a>(
        &'a self,
        key: &'a str,
        worksheet_id: &'a str,
        row: u32,
        col: u32,
        value: &'a str,
    ) -> BoxFuture<'a, Result<CellEntry>>;

    fn list_feed<'a>(
        &'a self,
        key: &'a str,
        worksheet_id: &'a str,
        query: Option<&'a ListQuery>,
    ) -> BoxFuture<'a, Result<Vec<ListEntry>>>;

    fn insert_row<'a>(
        &'a self,
        key: &'a str,
        worksheet_id: &'a str,
        row: &'a Row,
    ) -> BoxFuture<'a, Result<ListEntry>>;

    /// Replace the values of an existing row.
    fn update_row<'a>(
        &'a self,
        key: &'a str,
        worksheet_id: &'a str,
        entry: &'a ListEntry,
        row: &'a Row,
    ) -> BoxFuture<'a, Result<ListEntry>>;

    fn delete_row<'a>(
        &'a self,
        key: &'a str,
        worksheet_id: &'a str,
        entry: &'a ListEntry,
    ) -> BoxFuture<'a, Result<()>>;
}

/// Produces authenticated service handles.
///
/// Each login is performed once per connection, the resulting handle is
/// reused for the connection's lifetime.
pub trait Backend: Debug + Sync + Send + 'static {
    type Docs: DocsService + 'static;
    type Sheets: SpreadsheetService + 'static;

    fn login_docs<'a>(&'a self, credentials: &'a Credentials) -> BoxFuture<'a, Result<Self::Docs>>;

    fn login_sheets<'a>(
        &'a self,
        credentials: &'a Credentials,
    ) -> BoxFuture<'a, Result<Self::Sheets>>;
}
