use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::cache::Cached;
use crate::connection::Connection;
use crate::errors::Result;
use crate::feed::{ResourceEntry, WorksheetFeed};
use crate::http::HttpBackend;
use crate::query::DocsQuery;
use crate::service::{Backend, DocsService, ResourceKind, SpreadsheetService};
use crate::sheet::Sheet;

/// Id of the worksheet every spreadsheet is created with.
pub const DEFAULT_SHEET_ID: &str = "od6";

/// Rows and columns of worksheets created by [`Spreadsheet::create_sheet`].
pub const NEW_SHEET_ROWS: u32 = 10;
pub const NEW_SHEET_COLS: u32 = 10;

/// A spreadsheet document. All data lives in its sheets.
#[derive(Debug)]
pub struct Spreadsheet<B: Backend = HttpBackend> {
    id: String,
    conn: Arc<Connection<B>>,
    worksheets: Cached<WorksheetFeed>,
    resource: Cached<ResourceEntry>,
}

async fn worksheet_feed<'a, B: Backend>(
    conn: &Connection<B>,
    id: &str,
    cache: &'a mut Cached<WorksheetFeed>,
) -> Result<&'a WorksheetFeed> {
    let refetch = cache.is_invalidated();
    let feed = match cache.take() {
        Some(feed) => feed,
        None => {
            debug!(spreadsheet = %id, %refetch, "fetching worksheets");
            conn.sheets().await?.worksheets_feed(id).await?
        }
    };
    Ok(cache.insert(feed))
}

impl<B: Backend> Spreadsheet<B> {
    /// Open a spreadsheet by its key. Existence is not checked until the
    /// first remote call.
    pub fn by_id(id: impl Into<String>, conn: Arc<Connection<B>>) -> Self {
        Spreadsheet {
            id: id.into(),
            conn,
            worksheets: Cached::default(),
            resource: Cached::default(),
        }
    }

    /// Open the first spreadsheet returned by search whose title is exactly
    /// `title`.
    pub async fn by_title(title: &str, conn: Arc<Connection<B>>) -> Result<Option<Self>> {
        let query = DocsQuery::spreadsheets_titled(title);
        let entries = conn.docs().await?.search(&query).await?;
        let id = entries
            .iter()
            .find(|entry| entry.title() == title)
            .map(|entry| entry.resource_id().to_string());

        debug!(%title, found = ?id, "searched spreadsheets by title");
        Ok(id.map(|id| Self::by_id(id, conn)))
    }

    /// Create a new, empty spreadsheet.
    pub async fn create(title: &str, conn: Arc<Connection<B>>) -> Result<Self> {
        let res = conn
            .docs()
            .await?
            .create_resource(ResourceKind::Spreadsheet, title)
            .await?;
        debug!(%title, id = %res.resource_id(), "created spreadsheet");

        let mut spreadsheet = Self::by_id(res.resource_id(), conn);
        spreadsheet.resource.insert(res);
        Ok(spreadsheet)
    }

    /// Open the spreadsheet titled `title`, creating it if no such
    /// spreadsheet exists.
    ///
    /// The lookup and the creation are separate requests. Two callers racing
    /// on the same title can both end up creating one.
    pub async fn open(title: &str, conn: Arc<Connection<B>>) -> Result<Self> {
        match Self::by_title(title, conn.clone()).await? {
            Some(spreadsheet) => Ok(spreadsheet),
            None => Self::create(title, conn).await,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn connection(&self) -> &Arc<Connection<B>> {
        &self.conn
    }

    pub async fn title(&mut self) -> Result<&str> {
        let feed = worksheet_feed(&self.conn, &self.id, &mut self.worksheets).await?;
        Ok(&feed.title.t)
    }

    /// Document entry of this spreadsheet, fetched on first use.
    pub async fn resource(&mut self) -> Result<&ResourceEntry> {
        let res = match self.resource.take() {
            Some(res) => res,
            None => self.conn.docs().await?.get_resource(&self.id).await?,
        };
        Ok(self.resource.insert(res))
    }

    /// All sheets, in the order the service lists them.
    pub async fn sheets(&mut self) -> Result<Vec<Sheet<B>>> {
        let feed = worksheet_feed(&self.conn, &self.id, &mut self.worksheets).await?;
        Ok(feed
            .entry
            .iter()
            .map(|ws| Sheet::new(self.conn.clone(), self.id.clone(), ws.clone()))
            .collect())
    }

    /// First sheet whose id or title equals `key`. When nothing matches and
    /// `create_missing` is set, a new sheet titled `key` is created.
    pub async fn get(&mut self, key: &str, create_missing: bool) -> Result<Option<Sheet<B>>> {
        let found = self
            .sheets()
            .await?
            .into_iter()
            .find(|sheet| sheet.id() == key || sheet.title() == key);

        match found {
            Some(sheet) => Ok(Some(sheet)),
            None if create_missing => self.create_sheet(key).await.map(Some),
            None => Ok(None),
        }
    }

    /// The sheet the spreadsheet was created with, created if it was
    /// removed.
    pub async fn default_sheet(&mut self) -> Result<Sheet<B>> {
        match self.get(DEFAULT_SHEET_ID, false).await? {
            Some(sheet) => Ok(sheet),
            None => self.create_sheet(DEFAULT_SHEET_ID).await,
        }
    }

    /// Add a worksheet titled `title`. Titles are not checked for
    /// duplicates.
    pub async fn create_sheet(&mut self, title: &str) -> Result<Sheet<B>> {
        let ws = self
            .conn
            .sheets()
            .await?
            .add_worksheet(&self.id, title, NEW_SHEET_ROWS, NEW_SHEET_COLS)
            .await?;
        debug!(spreadsheet = %self.id, sheet = %ws.worksheet_id(), %title, "created sheet");

        self.invalidate();
        Ok(Sheet::new(self.conn.clone(), self.id.clone(), ws))
    }

    /// Forget the cached worksheet list.
    pub fn invalidate(&mut self) {
        self.worksheets.invalidate();
    }
}

impl<B: Backend> fmt::Display for Spreadsheet<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.worksheets.get() {
            Some(feed) => write!(f, "{}", feed.title),
            None => write!(f, "{}", self.id),
        }
    }
}
