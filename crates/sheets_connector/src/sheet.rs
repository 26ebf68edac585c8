use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use crate::cache::Cached;
use crate::connection::Connection;
use crate::errors::Result;
use crate::feed::{CellEntry, ListEntry, Row, WorksheetEntry};
use crate::http::HttpBackend;
use crate::normalize::normalize_header;
use crate::query::{CellQuery, RowQuery};
use crate::service::{Backend, SpreadsheetService};
use crate::value::RowValue;

/// A single table of data inside a spreadsheet.
///
/// Rows are mappings from normalized header name to text. The header row is
/// fetched on first use and cached until columns are added.
#[derive(Debug)]
pub struct Sheet<B: Backend = HttpBackend> {
    conn: Arc<Connection<B>>,
    spreadsheet_id: String,
    id: String,
    worksheet: WorksheetEntry,
    headers: Cached<Vec<CellEntry>>,
}

/// Rows returned by [`Sheet::find`], converted as they are iterated.
#[derive(Debug)]
pub struct Rows {
    entries: std::vec::IntoIter<ListEntry>,
}

impl Iterator for Rows {
    type Item = Row;

    fn next(&mut self) -> Option<Self::Item> {
        self.entries.next().map(|entry| entry.custom())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}

impl ExactSizeIterator for Rows {}

fn row_pairs<I, K, V>(row: I) -> Vec<(String, String)>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: RowValue,
{
    row.into_iter()
        .map(|(k, v)| (k.into(), v.into_cell_text()))
        .collect()
}

impl<B: Backend> Sheet<B> {
    pub(crate) fn new(conn: Arc<Connection<B>>, spreadsheet_id: String, worksheet: WorksheetEntry) -> Self {
        Sheet {
            id: worksheet.worksheet_id().to_string(),
            conn,
            spreadsheet_id,
            worksheet,
            headers: Cached::default(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    pub fn worksheet(&self) -> &WorksheetEntry {
        &self.worksheet
    }

    pub fn title(&self) -> &str {
        self.worksheet.title()
    }

    /// Rename the sheet. The new title is persisted right away.
    pub async fn set_title(&mut self, title: impl Into<String>) -> Result<()> {
        let mut worksheet = self.worksheet.clone();
        worksheet.set_title(title);
        self.update_metadata(worksheet).await
    }

    /// Declared number of rows of the worksheet.
    ///
    /// This is the size of the grid, not the number of rows holding data.
    pub fn len(&self) -> usize {
        self.worksheet.row_count() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Delete the whole worksheet.
    pub async fn delete(self) -> Result<()> {
        debug!(sheet = %self.id, "deleting worksheet");
        self.conn
            .sheets()
            .await?
            .delete_worksheet(&self.spreadsheet_id, &self.worksheet)
            .await
    }

    /// Persist `worksheet` and adopt the stored entry. The local entry is
    /// left as is when the update fails.
    async fn update_metadata(&mut self, worksheet: WorksheetEntry) -> Result<()> {
        let updated = self
            .conn
            .sheets()
            .await?
            .update_worksheet(&self.spreadsheet_id, &worksheet)
            .await?;
        self.worksheet = updated;
        Ok(())
    }

    async fn header_cells(&mut self) -> Result<&mut Vec<CellEntry>> {
        let refetch = self.headers.is_invalidated();
        let cells = match self.headers.take() {
            Some(cells) => cells,
            None => {
                debug!(sheet = %self.id, %refetch, "fetching header row");
                self.conn
                    .sheets()
                    .await?
                    .cells(&self.spreadsheet_id, &self.id, &CellQuery::header_row())
                    .await?
            }
        };
        Ok(self.headers.insert(cells))
    }

    /// Normalized names of all headers, in column order.
    pub async fn headers(&mut self) -> Result<Vec<String>> {
        let cells = self.header_cells().await?;
        Ok(cells.iter().map(|c| normalize_header(c.text())).collect())
    }

    /// Append a column labeled `label` after the last existing one, growing
    /// the worksheet first if it is too narrow. Rows address the column by
    /// `field`, the normalized label.
    pub async fn add_column(&mut self, label: &str, field: &str) -> Result<()> {
        let last = self
            .header_cells()
            .await?
            .iter()
            .map(CellEntry::col)
            .max()
            .unwrap_or(0);
        let col = last + 1;

        if self.worksheet.col_count() < col {
            debug!(sheet = %self.id, cols = col, "growing worksheet");
            let mut worksheet = self.worksheet.clone();
            worksheet.set_col_count(col);
            self.update_metadata(worksheet).await?;
        }

        debug!(sheet = %self.id, %label, %field, col, "adding column");
        let cell = self
            .conn
            .sheets()
            .await?
            .update_cell(&self.spreadsheet_id, &self.id, 1, col, label)
            .await?;
        self.header_cells().await?.push(cell);
        Ok(())
    }

    /// Make sure every given column exists, adding the missing ones in the
    /// order they first appear. Returns the number of columns added.
    pub async fn create_columns<I, S>(&mut self, columns: I) -> Result<usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        // Normalized name -> label. A later label for the same name wins but
        // the first position is kept.
        let mut wanted: IndexMap<String, String> = IndexMap::new();
        for label in columns {
            let label = label.as_ref();
            let field = normalize_header(label);
            if !field.is_empty() {
                wanted.insert(field, label.to_string());
            }
        }

        let existing = self.headers().await?;
        let mut added = 0;
        for (field, label) in wanted {
            if existing.contains(&field) {
                continue;
            }
            self.add_column(&label, &field).await?;
            added += 1;
        }

        if added > 0 {
            debug!(sheet = %self.id, added, "invalidating header cache");
            self.headers.invalidate();
        }
        Ok(added)
    }

    /// Create any missing columns and turn the pairs into a row keyed by
    /// normalized name.
    async fn convert_row(&mut self, pairs: Vec<(String, String)>) -> Result<Row> {
        self.create_columns(pairs.iter().map(|(k, _)| k.as_str()))
            .await?;

        let mut row = Row::new();
        for (k, v) in pairs {
            let field = normalize_header(&k);
            if !field.is_empty() {
                row.insert(field, v);
            }
        }
        Ok(row)
    }

    /// Append a row to the end of the sheet, adding columns for unknown
    /// fields.
    pub async fn insert<I, K, V>(&mut self, row: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: RowValue,
    {
        self.insert_pairs(row_pairs(row)).await
    }

    async fn insert_pairs(&mut self, pairs: Vec<(String, String)>) -> Result<()> {
        let data = self.convert_row(pairs).await?;
        self.conn
            .sheets()
            .await?
            .insert_row(&self.spreadsheet_id, &self.id, &data)
            .await?;
        Ok(())
    }

    /// Overwrite the given fields in every row whose `keys` fields equal the
    /// new values. With no keys every row matches.
    ///
    /// Returns the number of rows changed.
    pub async fn update<I, K, V>(&mut self, row: I, keys: &[&str]) -> Result<usize>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: RowValue,
    {
        self.update_pairs(row_pairs(row), keys).await
    }

    async fn update_pairs(&mut self, pairs: Vec<(String, String)>, keys: &[&str]) -> Result<usize> {
        let data = self.convert_row(pairs).await?;
        let filters = keys.iter().map(|k| {
            let k = normalize_header(k);
            let v = data.get(&k).cloned().unwrap_or_default();
            (k, v)
        });
        let entries = self.find_entries(&RowQuery::fields(filters)).await?;

        let service = self.conn.sheets().await?;
        for entry in &entries {
            let mut values = entry.custom();
            values.extend(data.iter().map(|(k, v)| (k.clone(), v.clone())));
            service
                .update_row(&self.spreadsheet_id, &self.id, entry, &values)
                .await?;
        }
        Ok(entries.len())
    }

    /// Update matching rows, inserting `row` when none matched. Returns
    /// whether a row was inserted.
    pub async fn upsert<I, K, V>(&mut self, row: I, keys: &[&str]) -> Result<bool>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: RowValue,
    {
        let pairs = row_pairs(row);
        if self.update_pairs(pairs.clone(), keys).await? > 0 {
            return Ok(false);
        }
        self.insert_pairs(pairs).await?;
        Ok(true)
    }

    /// Delete every row matching `query`. [`RowQuery::All`] truncates the
    /// sheet.
    pub async fn remove(&self, query: &RowQuery) -> Result<usize> {
        let entries = self.find_entries(query).await?;
        let service = self.conn.sheets().await?;
        for entry in &entries {
            service
                .delete_row(&self.spreadsheet_id, &self.id, entry)
                .await?;
        }
        debug!(sheet = %self.id, removed = entries.len(), "removed rows");
        Ok(entries.len())
    }

    async fn find_entries(&self, query: &RowQuery) -> Result<Vec<ListEntry>> {
        let list_query = query.to_list_query();
        debug!(sheet = %self.id, query = ?list_query, "listing rows");
        self.conn
            .sheets()
            .await?
            .list_feed(&self.spreadsheet_id, &self.id, list_query.as_ref())
            .await
    }

    /// Rows matching `query`.
    pub async fn find(&self, query: &RowQuery) -> Result<Rows> {
        let entries = self.find_entries(query).await?;
        Ok(Rows {
            entries: entries.into_iter(),
        })
    }

    pub async fn find_one(&self, query: &RowQuery) -> Result<Option<Row>> {
        Ok(self.find(query).await?.next())
    }

    /// Every row of the sheet.
    pub async fn rows(&self) -> Result<Rows> {
        self.find(&RowQuery::All).await
    }
}

impl<B: Backend> fmt::Display for Sheet<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credentials;
    use crate::memory::MemoryBackend;

    async fn sheet_with_headers(labels: &[&str]) -> (MemoryBackend, Sheet<MemoryBackend>) {
        let backend = MemoryBackend::new();
        let key = backend.add_spreadsheet("Test");
        backend.set_headers(&key, "od6", labels).unwrap();

        let conn = Arc::new(Connection::new(backend.clone(), Credentials::new("ann", "pw")));
        let ws = backend.worksheet(&key, "od6").unwrap();
        (backend, Sheet::new(conn, key, ws))
    }

    #[tokio::test]
    async fn headers_are_normalized_and_cached() {
        let (backend, mut sheet) = sheet_with_headers(&["First Name", "E-Mail"]).await;

        assert_eq!(vec!["firstname", "email"], sheet.headers().await.unwrap());
        assert_eq!(vec!["firstname", "email"], sheet.headers().await.unwrap());
        assert_eq!(1, backend.stats().cell_feeds);
    }

    #[tokio::test]
    async fn create_columns_in_first_appearance_order() {
        let (backend, mut sheet) = sheet_with_headers(&["name"]).await;

        let added = sheet
            .create_columns(["Zip", "name", "Age", "ZIP", "!!"])
            .await
            .unwrap();
        assert_eq!(2, added);
        assert_eq!(
            vec!["name", "ZIP", "Age"],
            backend.headers(sheet.spreadsheet_id(), "od6").unwrap()
        );
        assert_eq!(vec!["name", "zip", "age"], sheet.headers().await.unwrap());
    }

    #[tokio::test]
    async fn add_column_grows_narrow_worksheet() {
        let backend = MemoryBackend::new();
        let key = backend.add_spreadsheet("Narrow");
        let ws = backend.add_worksheet(&key, "Tiny", 10, 1).await.unwrap();
        let conn = Arc::new(Connection::new(backend.clone(), Credentials::new("ann", "pw")));
        let mut sheet = Sheet::new(conn, key.clone(), ws);

        sheet.add_column("A", "a").await.unwrap();
        sheet.add_column("B", "b").await.unwrap();
        assert_eq!(2, sheet.worksheet().col_count());
        assert_eq!(2, backend.worksheet(&key, sheet.id()).unwrap().col_count());
        assert_eq!(1, backend.stats().worksheet_updates);
    }

    #[tokio::test]
    async fn failed_metadata_update_keeps_local_entry() {
        let backend = MemoryBackend::new();
        let key = backend.add_spreadsheet("Gone");
        let ws = backend.add_worksheet(&key, "Tiny", 10, 1).await.unwrap();
        let conn = Arc::new(Connection::new(backend.clone(), Credentials::new("ann", "pw")));
        let mut sheet = Sheet::new(conn, key.clone(), ws.clone());
        sheet.add_column("A", "a").await.unwrap();

        backend.delete_worksheet(&key, &ws).await.unwrap();

        assert!(sheet.set_title("Renamed").await.is_err());
        assert_eq!("Tiny", sheet.title());

        assert!(sheet.add_column("B", "b").await.is_err());
        assert_eq!(1, sheet.worksheet().col_count());
        assert_eq!(&ws, sheet.worksheet());
    }

    #[tokio::test]
    async fn none_is_stored_as_empty() {
        let (backend, mut sheet) = sheet_with_headers(&["name", "age"]).await;
        sheet
            .insert([("Name", Some("Ann")), ("Age", None)])
            .await
            .unwrap();

        let rows = backend.rows(sheet.spreadsheet_id(), "od6").unwrap();
        assert_eq!("Ann", rows[0]["name"]);
        assert_eq!("", rows[0]["age"]);
    }

    #[tokio::test]
    async fn update_with_missing_key_matches_empty() {
        let (_, mut sheet) = sheet_with_headers(&["name", "nick"]).await;
        sheet.insert([("name", "Ann")]).await.unwrap();
        sheet.insert([("name", "Bob"), ("nick", "b")]).await.unwrap();

        let changed = sheet.update([("name", "Anna")], &["nick"]).await.unwrap();
        assert_eq!(1, changed);

        let names: Vec<_> = sheet
            .rows()
            .await
            .unwrap()
            .map(|r| r["name"].clone())
            .collect();
        assert_eq!(vec!["Anna", "Bob"], names);
    }

    #[tokio::test]
    async fn update_without_keys_touches_every_row() {
        let (_, mut sheet) = sheet_with_headers(&["name", "flag"]).await;
        sheet.insert([("name", "Ann")]).await.unwrap();
        sheet.insert([("name", "Bob")]).await.unwrap();

        assert_eq!(2, sheet.update([("flag", "x")], &[]).await.unwrap());
        assert!(sheet.rows().await.unwrap().all(|r| r["flag"] == "x"));
    }

    #[tokio::test]
    async fn title_is_persisted() {
        let (backend, mut sheet) = sheet_with_headers(&[]).await;
        sheet.set_title("Renamed").await.unwrap();
        assert_eq!("Renamed", sheet.to_string());
        assert_eq!(
            "Renamed",
            backend.worksheet(sheet.spreadsheet_id(), "od6").unwrap().title()
        );
    }

    #[tokio::test]
    async fn find_structured_query() {
        let (_, mut sheet) = sheet_with_headers(&["name", "age"]).await;
        sheet.insert([("name", "Ann"), ("age", "30")]).await.unwrap();
        sheet.insert([("name", "Bob"), ("age", "40")]).await.unwrap();

        let found = sheet
            .find_one(&RowQuery::structured(r#"age = "40""#))
            .await
            .unwrap()
            .unwrap();
        assert_eq!("Bob", found["name"]);

        let none = sheet
            .find_one(&RowQuery::fields([("name", "Carl")]))
            .await
            .unwrap();
        assert_eq!(None, none);
    }
}
