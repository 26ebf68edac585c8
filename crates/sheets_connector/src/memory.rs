use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use reqwest::StatusCode;

use crate::config::Credentials;
use crate::errors::{Result, SheetsError};
use crate::feed::{
    CellEntry, Link, ListEntry, ResourceEntry, Row, Text, TextCount, WorksheetEntry, WorksheetFeed,
};
use crate::normalize::normalize_header;
use crate::query::{CellQuery, DocsQuery, ListQuery, SPREADSHEET_CATEGORY};
use crate::service::{Backend, DocsService, ResourceKind, SpreadsheetService};

const DOCS_BASE: &str = "https://docs.memory.test/feeds";
const SHEETS_BASE: &str = "https://spreadsheets.memory.test/feeds";

/// Dimensions of the worksheet every new spreadsheet starts with.
const DEFAULT_WORKSHEET_ROWS: u32 = 100;
const DEFAULT_WORKSHEET_COLS: u32 = 20;

/// Leading field name of a structured query term. Matches the word
/// characters kept by `normalize_header`.
static FIELD_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\w+").expect("static regex is valid"));

/// Number of calls made against a [`MemoryBackend`], by kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryStats {
    pub logins: usize,
    pub searches: usize,
    pub worksheet_feeds: usize,
    pub worksheet_updates: usize,
    pub cell_feeds: usize,
    pub cell_updates: usize,
    pub list_feeds: usize,
    pub row_inserts: usize,
    pub row_updates: usize,
    pub row_deletes: usize,
}

/// In-process stand-in for both remote services.
///
/// Clones share the same underlying store, so a backend handed to a
/// connection can still be inspected and seeded from the outside.
///
/// List rows are derived from the header row the same way the hosted service
/// does it: each non-blank header cell defines a field named by its
/// normalized text. Values for unknown fields are dropped on insert.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<MemoryState>>,
}

#[derive(Debug, Default)]
struct MemoryState {
    next_id: u64,
    spreadsheets: IndexMap<String, MemorySpreadsheet>,
    stats: MemoryStats,
}

#[derive(Debug)]
struct MemorySpreadsheet {
    title: String,
    next_worksheet: u32,
    worksheets: Vec<MemoryWorksheet>,
}

#[derive(Debug)]
struct MemoryWorksheet {
    id: String,
    title: String,
    rows: u32,
    cols: u32,
    /// Row 1, column -> label.
    headers: BTreeMap<u32, String>,
    /// Rows 2 and onward, in sheet order.
    records: Vec<MemoryRecord>,
}

#[derive(Debug, Clone)]
struct MemoryRecord {
    id: String,
    values: BTreeMap<u32, String>,
}

impl MemoryState {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn create_spreadsheet(&mut self, title: &str) -> String {
        let key = format!("mem{:04}", self.next_id());
        let mut spreadsheet = MemorySpreadsheet {
            title: title.to_string(),
            next_worksheet: 0,
            worksheets: Vec::new(),
        };
        spreadsheet.add_worksheet("Sheet1", DEFAULT_WORKSHEET_ROWS, DEFAULT_WORKSHEET_COLS);
        self.spreadsheets.insert(key.clone(), spreadsheet);
        key
    }

    fn spreadsheet_mut(&mut self, key: &str) -> Result<&mut MemorySpreadsheet> {
        self.spreadsheets
            .get_mut(key)
            .ok_or_else(|| SheetsError::not_found(format!("spreadsheet '{key}' does not exist")))
    }

    fn worksheet_mut(&mut self, key: &str, worksheet_id: &str) -> Result<&mut MemoryWorksheet> {
        self.spreadsheet_mut(key)?
            .worksheets
            .iter_mut()
            .find(|ws| ws.id == worksheet_id)
            .ok_or_else(|| {
                SheetsError::not_found(format!(
                    "worksheet '{worksheet_id}' does not exist in spreadsheet '{key}'"
                ))
            })
    }

    /// Write a single cell. Rows below the last record are filled with empty
    /// records so the sheet stays contiguous.
    fn write_cell(
        &mut self,
        key: &str,
        worksheet_id: &str,
        row: u32,
        col: u32,
        value: &str,
    ) -> Result<CellEntry> {
        let missing = {
            let ws = self.worksheet_mut(key, worksheet_id)?;
            if row == 0 || col == 0 || row > ws.rows || col > ws.cols {
                return Err(SheetsError::remote(
                    StatusCode::BAD_REQUEST,
                    format!(
                        "cell R{row}C{col} is outside of the {}x{} worksheet",
                        ws.rows, ws.cols
                    ),
                ));
            }
            if row == 1 {
                ws.headers.insert(col, value.to_string());
                return Ok(CellEntry::new(row, col, value));
            }
            ((row - 1) as usize).saturating_sub(ws.records.len())
        };

        let ids: Vec<_> = (0..missing).map(|_| format!("r{}", self.next_id())).collect();
        let ws = self.worksheet_mut(key, worksheet_id)?;
        ws.records.extend(ids.into_iter().map(|id| MemoryRecord {
            id,
            values: BTreeMap::new(),
        }));
        ws.records[(row - 2) as usize]
            .values
            .insert(col, value.to_string());
        Ok(CellEntry::new(row, col, value))
    }
}

impl MemorySpreadsheet {
    fn add_worksheet(&mut self, title: &str, rows: u32, cols: u32) -> &MemoryWorksheet {
        let id = format!("od{}", 6 + self.next_worksheet);
        self.next_worksheet += 1;
        self.worksheets.push(MemoryWorksheet {
            id,
            title: title.to_string(),
            rows,
            cols,
            headers: BTreeMap::new(),
            records: Vec::new(),
        });
        &self.worksheets[self.worksheets.len() - 1]
    }
}

impl MemoryWorksheet {
    fn entry(&self, key: &str) -> WorksheetEntry {
        let id = format!("{SHEETS_BASE}/worksheets/{key}/private/full/{}", self.id);
        WorksheetEntry {
            link: vec![Link::edit(format!("{id}/version"))],
            id: Text::new(id),
            title: Text::new(&self.title),
            row_count: TextCount(self.rows),
            col_count: TextCount(self.cols),
        }
    }

    /// Field name -> column, in column order.
    fn fields(&self) -> IndexMap<String, u32> {
        let mut fields = IndexMap::new();
        for (col, label) in &self.headers {
            let name = normalize_header(label);
            if !name.is_empty() && !fields.contains_key(&name) {
                fields.insert(name, *col);
            }
        }
        fields
    }

    fn record_row(&self, fields: &IndexMap<String, u32>, record: &MemoryRecord) -> Row {
        fields
            .iter()
            .map(|(name, col)| {
                let val = record.values.get(col).cloned().unwrap_or_default();
                (name.clone(), val)
            })
            .collect()
    }

    fn list_entry(&self, key: &str, fields: &IndexMap<String, u32>, record: &MemoryRecord) -> ListEntry {
        let id = format!("{SHEETS_BASE}/list/{key}/{}/private/full/{}", self.id, record.id);
        let edit = format!("{id}/version");
        ListEntry::new(id, edit, &self.record_row(fields, record))
    }

    fn record_index(&self, entry: &ListEntry) -> Result<usize> {
        let row_id = entry.row_id();
        self.records
            .iter()
            .position(|r| r.id == row_id)
            .ok_or_else(|| SheetsError::not_found(format!("row '{row_id}' does not exist")))
    }

    fn set_values(&mut self, idx: usize, row: &Row) {
        let fields = self.fields();
        let record = &mut self.records[idx];
        for (name, value) in row {
            if let Some(col) = fields.get(name) {
                record.values.insert(*col, value.clone());
            }
        }
    }

    fn cells(&self, query: &CellQuery) -> Vec<CellEntry> {
        let header_cells = self.headers.iter().map(|(col, v)| (1, *col, v));
        let record_cells = self.records.iter().enumerate().flat_map(|(idx, record)| {
            let row = idx as u32 + 2;
            record.values.iter().map(move |(col, v)| (row, *col, v))
        });

        header_cells
            .chain(record_cells)
            .filter(|(row, col, v)| !v.is_empty() && query.contains(*row, *col))
            .map(|(row, col, v)| CellEntry::new(row, col, v.clone()))
            .collect()
    }

    fn grow_rows_to_fit(&mut self) {
        let needed = self.records.len() as u32 + 1;
        if self.rows < needed {
            self.rows = needed;
        }
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a spreadsheet with a single empty worksheet (`od6`), returning
    /// its key.
    pub fn add_spreadsheet(&self, title: &str) -> String {
        self.state.lock().create_spreadsheet(title)
    }

    /// Overwrite the header row of a worksheet, growing it if needed.
    pub fn set_headers(&self, key: &str, worksheet_id: &str, labels: &[&str]) -> Result<()> {
        let mut state = self.state.lock();
        let ws = state.worksheet_mut(key, worksheet_id)?;
        ws.headers = labels
            .iter()
            .enumerate()
            .map(|(idx, label)| (idx as u32 + 1, label.to_string()))
            .collect();
        ws.cols = ws.cols.max(labels.len() as u32);
        Ok(())
    }

    /// Header labels in column order, blanks included as empty strings.
    pub fn headers(&self, key: &str, worksheet_id: &str) -> Result<Vec<String>> {
        let mut state = self.state.lock();
        let ws = state.worksheet_mut(key, worksheet_id)?;
        let max = ws.headers.keys().next_back().copied().unwrap_or(0);
        Ok((1..=max)
            .map(|col| ws.headers.get(&col).cloned().unwrap_or_default())
            .collect())
    }

    /// All rows of a worksheet as the list feed would return them.
    pub fn rows(&self, key: &str, worksheet_id: &str) -> Result<Vec<Row>> {
        let mut state = self.state.lock();
        let ws = state.worksheet_mut(key, worksheet_id)?;
        let fields = ws.fields();
        Ok(ws
            .records
            .iter()
            .map(|r| ws.record_row(&fields, r))
            .collect())
    }

    pub fn worksheet(&self, key: &str, worksheet_id: &str) -> Result<WorksheetEntry> {
        let mut state = self.state.lock();
        Ok(state.worksheet_mut(key, worksheet_id)?.entry(key))
    }

    pub fn worksheet_ids(&self, key: &str) -> Result<Vec<String>> {
        let mut state = self.state.lock();
        Ok(state
            .spreadsheet_mut(key)?
            .worksheets
            .iter()
            .map(|ws| ws.id.clone())
            .collect())
    }

    pub fn stats(&self) -> MemoryStats {
        self.state.lock().stats
    }

    fn login(&self, credentials: &Credentials) -> Result<Self> {
        credentials.require()?;
        self.state.lock().stats.logins += 1;
        Ok(self.clone())
    }
}

impl Backend for MemoryBackend {
    type Docs = MemoryBackend;
    type Sheets = MemoryBackend;

    fn login_docs<'a>(&'a self, credentials: &'a Credentials) -> BoxFuture<'a, Result<Self::Docs>> {
        let result = self.login(credentials);
        async move { result }.boxed()
    }

    fn login_sheets<'a>(
        &'a self,
        credentials: &'a Credentials,
    ) -> BoxFuture<'a, Result<Self::Sheets>> {
        let result = self.login(credentials);
        async move { result }.boxed()
    }
}

fn resource_entry(key: &str, title: &str) -> ResourceEntry {
    ResourceEntry {
        id: Text::new(format!("{DOCS_BASE}/id/{SPREADSHEET_CATEGORY}%3A{key}")),
        title: Text::new(title),
    }
}

impl DocsService for MemoryBackend {
    fn search<'a>(&'a self, query: &'a DocsQuery) -> BoxFuture<'a, Result<Vec<ResourceEntry>>> {
        let mut state = self.state.lock();
        state.stats.searches += 1;
        let found: Vec<ResourceEntry> = if query.category == SPREADSHEET_CATEGORY {
            state
                .spreadsheets
                .iter()
                .filter(|(_, ss)| query.matches_title(&ss.title))
                .map(|(key, ss)| resource_entry(key, &ss.title))
                .collect()
        } else {
            Vec::new()
        };
        async move { Ok(found) }.boxed()
    }

    fn create_resource<'a>(
        &'a self,
        kind: ResourceKind,
        title: &'a str,
    ) -> BoxFuture<'a, Result<ResourceEntry>> {
        let result = match kind {
            ResourceKind::Spreadsheet => {
                let key = self.state.lock().create_spreadsheet(title);
                Ok(resource_entry(&key, title))
            }
        };
        async move { result }.boxed()
    }

    fn get_resource<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<ResourceEntry>> {
        let mut state = self.state.lock();
        let result = state
            .spreadsheet_mut(id)
            .map(|ss| resource_entry(id, &ss.title));
        async move { result }.boxed()
    }
}

impl SpreadsheetService for MemoryBackend {
    fn worksheets_feed<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<WorksheetFeed>> {
        let mut state = self.state.lock();
        state.stats.worksheet_feeds += 1;
        let result = state.spreadsheet_mut(key).map(|ss| WorksheetFeed {
            title: Text::new(&ss.title),
            entry: ss.worksheets.iter().map(|ws| ws.entry(key)).collect(),
        });
        async move { result }.boxed()
    }

    fn add_worksheet<'a>(
        &'a self,
        key: &'a str,
        title: &'a str,
        rows: u32,
        cols: u32,
    ) -> BoxFuture<'a, Result<WorksheetEntry>> {
        let mut state = self.state.lock();
        let result = state
            .spreadsheet_mut(key)
            .map(|ss| ss.add_worksheet(title, rows, cols).entry(key));
        async move { result }.boxed()
    }

    fn update_worksheet<'a>(
        &'a self,
        key: &'a str,
        worksheet: &'a WorksheetEntry,
    ) -> BoxFuture<'a, Result<WorksheetEntry>> {
        let mut state = self.state.lock();
        state.stats.worksheet_updates += 1;
        let result = state
            .worksheet_mut(key, worksheet.worksheet_id())
            .map(|ws| {
                ws.title = worksheet.title().to_string();
                ws.rows = worksheet.row_count();
                ws.cols = worksheet.col_count();
                ws.entry(key)
            });
        async move { result }.boxed()
    }

    fn delete_worksheet<'a>(
        &'a self,
        key: &'a str,
        worksheet: &'a WorksheetEntry,
    ) -> BoxFuture<'a, Result<()>> {
        let mut state = self.state.lock();
        let result = state.spreadsheet_mut(key).and_then(|ss| {
            let id = worksheet.worksheet_id();
            let before = ss.worksheets.len();
            ss.worksheets.retain(|ws| ws.id != id);
            if ss.worksheets.len() == before {
                return Err(SheetsError::not_found(format!(
                    "worksheet '{id}' does not exist"
                )));
            }
            Ok(())
        });
        async move { result }.boxed()
    }

    fn cells<'a>(
        &'a self,
        key: &'a str,
        worksheet_id: &'a str,
        query: &'a CellQuery,
    ) -> BoxFuture<'a, Result<Vec<CellEntry>>> {
        let mut state = self.state.lock();
        state.stats.cell_feeds += 1;
        let result = state
            .worksheet_mut(key, worksheet_id)
            .map(|ws| ws.cells(query));
        async move { result }.boxed()
    }

    fn update_cell<'a>(
        &'a self,
        key: &'a str,
        worksheet_id: &'a str,
        row: u32,
        col: u32,
        value: &'a str,
    ) -> BoxFuture<'a, Result<CellEntry>> {
        let mut state = self.state.lock();
        state.stats.cell_updates += 1;
        let result = state.write_cell(key, worksheet_id, row, col, value);
        async move { result }.boxed()
    }

    fn list_feed<'a>(
        &'a self,
        key: &'a str,
        worksheet_id: &'a str,
        query: Option<&'a ListQuery>,
    ) -> BoxFuture<'a, Result<Vec<ListEntry>>> {
        let mut state = self.state.lock();
        state.stats.list_feeds += 1;
        let result = state.worksheet_mut(key, worksheet_id).and_then(|ws| {
            let filters = match query {
                Some(q) => parse_structured_query(&q.sq)?,
                None => Vec::new(),
            };
            let fields = ws.fields();
            let entries = ws
                .records
                .iter()
                .filter(|record| {
                    let row = ws.record_row(&fields, record);
                    filters
                        .iter()
                        .all(|(k, v)| row.get(k).map(String::as_str).unwrap_or("") == v)
                })
                .map(|record| ws.list_entry(key, &fields, record))
                .collect();
            Ok(entries)
        });
        async move { result }.boxed()
    }

    fn insert_row<'a>(
        &'a self,
        key: &'a str,
        worksheet_id: &'a str,
        row: &'a Row,
    ) -> BoxFuture<'a, Result<ListEntry>> {
        let mut state = self.state.lock();
        state.stats.row_inserts += 1;
        let id = format!("r{}", state.next_id());
        let result = state.worksheet_mut(key, worksheet_id).map(|ws| {
            ws.records.push(MemoryRecord {
                id,
                values: BTreeMap::new(),
            });
            let idx = ws.records.len() - 1;
            ws.set_values(idx, row);
            ws.grow_rows_to_fit();
            ws.list_entry(key, &ws.fields(), &ws.records[idx])
        });
        async move { result }.boxed()
    }

    fn update_row<'a>(
        &'a self,
        key: &'a str,
        worksheet_id: &'a str,
        entry: &'a ListEntry,
        row: &'a Row,
    ) -> BoxFuture<'a, Result<ListEntry>> {
        let mut state = self.state.lock();
        state.stats.row_updates += 1;
        let result = state.worksheet_mut(key, worksheet_id).and_then(|ws| {
            let idx = ws.record_index(entry)?;
            ws.set_values(idx, row);
            Ok(ws.list_entry(key, &ws.fields(), &ws.records[idx]))
        });
        async move { result }.boxed()
    }

    fn delete_row<'a>(
        &'a self,
        key: &'a str,
        worksheet_id: &'a str,
        entry: &'a ListEntry,
    ) -> BoxFuture<'a, Result<()>> {
        let mut state = self.state.lock();
        state.stats.row_deletes += 1;
        let result = state.worksheet_mut(key, worksheet_id).and_then(|ws| {
            let idx = ws.record_index(entry)?;
            ws.records.remove(idx);
            Ok(())
        });
        async move { result }.boxed()
    }
}

fn invalid_query(sq: &str) -> SheetsError {
    SheetsError::remote(
        StatusCode::BAD_REQUEST,
        format!("unsupported structured query: {sq}"),
    )
}

/// Parse `field = "value" and field = "value" ...`.
///
/// Only the subset of the query language this crate generates is
/// understood: exact matches against JSON string literals joined by `and`.
fn parse_structured_query(sq: &str) -> Result<Vec<(String, String)>> {
    let mut filters = Vec::new();
    let mut rest = sq.trim_start();

    loop {
        let name_len = FIELD_NAME
            .find(rest)
            .map(|m| m.end())
            .ok_or_else(|| invalid_query(sq))?;
        let (name, tail) = rest.split_at(name_len);

        let tail = tail
            .trim_start()
            .strip_prefix('=')
            .ok_or_else(|| invalid_query(sq))?
            .trim_start();
        let (value, tail) = split_string_literal(tail).ok_or_else(|| invalid_query(sq))?;
        filters.push((name.to_string(), value));

        let tail = tail.trim_start();
        if tail.is_empty() {
            return Ok(filters);
        }
        rest = strip_keyword(tail, "and")
            .ok_or_else(|| invalid_query(sq))?
            .trim_start();
    }
}

/// Split a leading JSON string literal off `s`, returning its decoded value
/// and the remainder.
fn split_string_literal(s: &str) -> Option<(String, &str)> {
    if !s.starts_with('"') {
        return None;
    }

    let mut escaped = false;
    for (idx, c) in s.char_indices().skip(1) {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => {
                let end = idx + 1;
                let value: String = serde_json::from_str(&s[..end]).ok()?;
                return Some((value, &s[end..]));
            }
            _ => (),
        }
    }
    None
}

fn strip_keyword<'a>(s: &'a str, keyword: &str) -> Option<&'a str> {
    let head = s.get(..keyword.len())?;
    if !head.eq_ignore_ascii_case(keyword) {
        return None;
    }
    let tail = &s[keyword.len()..];
    tail.starts_with(char::is_whitespace).then_some(tail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::structured_query;

    fn row(pairs: &[(&str, &str)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn parse_generated_queries() {
        let fields = vec![
            ("name".to_string(), "Ann \"the\" and".to_string()),
            ("age".to_string(), "30".to_string()),
        ];
        let sq = structured_query(&fields);
        assert_eq!(fields, parse_structured_query(&sq).unwrap());

        assert_eq!(
            vec![("name".to_string(), "Bob".to_string())],
            parse_structured_query(r#"  name="Bob"  "#).unwrap()
        );
        assert_eq!(2, parse_structured_query(r#"a = "1" AND b = "2""#).unwrap().len());
    }

    #[test]
    fn parse_field_names_with_marks_and_connectors() {
        let fields = vec![
            (normalize_header("Cafe\u{301}"), "x".to_string()),
            (normalize_header("a\u{203F}b"), "y".to_string()),
        ];
        assert_eq!("cafe\u{301}", fields[0].0);
        let sq = structured_query(&fields);
        assert_eq!(fields, parse_structured_query(&sq).unwrap());
    }

    #[test]
    fn reject_unsupported_queries() {
        for sq in [
            "",
            "age > 25",
            r#"name = Bob"#,
            r#"name = "Bob" or age = "3""#,
            r#"name = "Bob"and"#,
            r#"name = "unterminated"#,
        ] {
            let err = parse_structured_query(sq).unwrap_err();
            assert!(
                matches!(err, SheetsError::Remote { status, .. } if status == StatusCode::BAD_REQUEST),
                "query: {sq}"
            );
        }
    }

    #[tokio::test]
    async fn rows_follow_header_fields() {
        let backend = MemoryBackend::new();
        let key = backend.add_spreadsheet("People");
        backend.set_headers(&key, "od6", &["Name", "", "E-Mail"]).unwrap();

        let entry = backend
            .insert_row(&key, "od6", &row(&[("name", "Ann"), ("unknown", "x")]))
            .await
            .unwrap();
        assert_eq!(row(&[("name", "Ann"), ("email", "")]), entry.custom());

        let found = backend
            .list_feed(
                &key,
                "od6",
                Some(&ListQuery {
                    sq: r#"name = "Ann""#.to_string(),
                }),
            )
            .await
            .unwrap();
        assert_eq!(1, found.len());

        let updated = backend
            .update_row(&key, "od6", &found[0], &row(&[("email", "ann@example.com")]))
            .await
            .unwrap();
        assert_eq!(
            row(&[("name", "Ann"), ("email", "ann@example.com")]),
            updated.custom()
        );

        backend.delete_row(&key, "od6", &found[0]).await.unwrap();
        assert!(backend.rows(&key, "od6").unwrap().is_empty());
        assert!(backend.delete_row(&key, "od6", &found[0]).await.is_err());
    }

    #[tokio::test]
    async fn cell_writes_are_bounded_by_dimensions() {
        let backend = MemoryBackend::new();
        let key = backend.add_spreadsheet("Bounded");
        let ws = backend.add_worksheet(&key, "Small", 10, 2).await.unwrap();
        let id = ws.worksheet_id().to_string();
        assert_eq!("od7", id);

        backend.update_cell(&key, &id, 1, 2, "b").await.unwrap();
        let err = backend.update_cell(&key, &id, 1, 3, "c").await.unwrap_err();
        assert!(matches!(err, SheetsError::Remote { .. }));

        let mut ws = backend.worksheet(&key, &id).unwrap();
        ws.set_col_count(3);
        backend.update_worksheet(&key, &ws).await.unwrap();
        backend.update_cell(&key, &id, 1, 3, "c").await.unwrap();

        let cells = backend
            .cells(&key, &id, &CellQuery::header_row())
            .await
            .unwrap();
        assert_eq!(
            vec![(2, "b"), (3, "c")],
            cells.iter().map(|c| (c.col(), c.text())).collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn cell_writes_below_header_create_rows() {
        let backend = MemoryBackend::new();
        let key = backend.add_spreadsheet("Grid");
        backend.set_headers(&key, "od6", &["a"]).unwrap();
        backend.update_cell(&key, "od6", 3, 1, "x").await.unwrap();

        assert_eq!(
            vec![row(&[("a", "")]), row(&[("a", "x")])],
            backend.rows(&key, "od6").unwrap()
        );

        let inserted = backend
            .insert_row(&key, "od6", &row(&[("a", "y")]))
            .await
            .unwrap();
        let ids: Vec<_> = backend
            .list_feed(&key, "od6", None)
            .await
            .unwrap()
            .iter()
            .map(|e| e.row_id().to_string())
            .collect();
        assert_eq!(3, ids.len());
        assert_eq!(inserted.row_id(), ids[2]);
        assert_ne!(ids[0], ids[2]);
        assert_ne!(ids[1], ids[2]);
    }

    #[tokio::test]
    async fn unknown_spreadsheet_is_not_found() {
        let backend = MemoryBackend::new();
        let err = backend.worksheets_feed("missing").await.unwrap_err();
        assert!(matches!(err, SheetsError::Remote { status, .. } if status == StatusCode::NOT_FOUND));
    }

    #[tokio::test]
    async fn search_by_title() {
        let backend = MemoryBackend::new();
        let key = backend.add_spreadsheet("Budget");
        backend.add_spreadsheet("Budget 2014");

        let found = backend
            .search(&DocsQuery::spreadsheets_titled("Budget"))
            .await
            .unwrap();
        assert_eq!(1, found.len());
        assert_eq!(key, found[0].resource_id());

        let loose = DocsQuery {
            title_exact: false,
            ..DocsQuery::spreadsheets_titled("budget")
        };
        assert_eq!(2, backend.search(&loose).await.unwrap().len());
    }

    #[tokio::test]
    async fn login_requires_credentials() {
        let backend = MemoryBackend::new();
        assert!(backend.login_sheets(&Credentials::default()).await.is_err());
        backend
            .login_docs(&Credentials::new("ann", "pw"))
            .await
            .unwrap();
        assert_eq!(1, backend.stats().logins);
    }
}
