use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use reqwest::Url;

use crate::atom::{CellWrite, ResourceWrite, RowWrite, WorksheetWrite};
use crate::auth::{AuthService, Token, client_login};
use crate::config::Credentials;
use crate::errors::Result;
use crate::feed::{
    CellEntry, CellFeed, EntryEnvelope, FeedEnvelope, ListEntry, ListFeed, ResourceEntry,
    ResourceFeed, Row, WorksheetEntry, WorksheetFeed,
};
use crate::query::{CellQuery, DocsQuery, ListQuery};
use crate::req::{EmptySerde, ExecMethod, GDataClient, GDataClientBuilder};
use crate::service::{Backend, DocsService, ResourceKind, SpreadsheetService};

pub const DEFAULT_AUTH_URL: &str = "https://www.google.com/accounts/ClientLogin";
pub const DEFAULT_DOCS_URL: &str = "https://docs.google.com";
pub const DEFAULT_SHEETS_URL: &str = "https://spreadsheets.google.com";

/// Base urls of the hosted services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub auth: String,
    pub docs: String,
    pub sheets: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            auth: DEFAULT_AUTH_URL.to_string(),
            docs: DEFAULT_DOCS_URL.to_string(),
            sheets: DEFAULT_SHEETS_URL.to_string(),
        }
    }
}

/// Backend talking to the hosted services over HTTP.
#[derive(Debug, Clone, Default)]
pub struct HttpBackend {
    endpoints: Endpoints,
    client: GDataClientBuilder,
}

impl HttpBackend {
    pub fn new(endpoints: Endpoints) -> Self {
        Self {
            endpoints,
            client: GDataClient::builder(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = self.client.timeout(timeout);
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.client = self.client.connect_timeout(timeout);
        self
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    async fn login(
        &self,
        credentials: &Credentials,
        service: AuthService,
    ) -> Result<(GDataClient, Token)> {
        let client = self.client.clone().build()?;
        let auth_url = Url::parse(&self.endpoints.auth)?;
        let token = client_login(&client, &auth_url, credentials, service).await?;
        Ok((client, token))
    }
}

impl Backend for HttpBackend {
    type Docs = HttpDocsService;
    type Sheets = HttpSpreadsheetService;

    fn login_docs<'a>(&'a self, credentials: &'a Credentials) -> BoxFuture<'a, Result<Self::Docs>> {
        async move {
            let (client, token) = self.login(credentials, AuthService::Documents).await?;
            Ok(HttpDocsService {
                client,
                token,
                base: Url::parse(&self.endpoints.docs)?,
            })
        }
        .boxed()
    }

    fn login_sheets<'a>(
        &'a self,
        credentials: &'a Credentials,
    ) -> BoxFuture<'a, Result<Self::Sheets>> {
        async move {
            let (client, token) = self.login(credentials, AuthService::Spreadsheets).await?;
            Ok(HttpSpreadsheetService {
                client,
                token,
                base: Url::parse(&self.endpoints.sheets)?,
            })
        }
        .boxed()
    }
}

#[derive(Debug)]
pub struct HttpDocsService {
    client: GDataClient,
    token: Token,
    base: Url,
}

impl HttpDocsService {
    fn url(&self, path: &str) -> Result<Url> {
        Ok(self.base.join(path)?)
    }
}

impl DocsService for HttpDocsService {
    fn search<'a>(&'a self, query: &'a DocsQuery) -> BoxFuture<'a, Result<Vec<ResourceEntry>>> {
        async move {
            let mut url = self.url(&format!(
                "/feeds/default/private/full/-/{}",
                query.category
            ))?;
            query.apply(&mut url);
            let feed: FeedEnvelope<ResourceFeed> = self
                .client
                .execute(ExecMethod::Get, url, EmptySerde::none(), Some(&self.token))
                .await?;
            Ok(feed.feed.entry)
        }
        .boxed()
    }

    fn create_resource<'a>(
        &'a self,
        kind: ResourceKind,
        title: &'a str,
    ) -> BoxFuture<'a, Result<ResourceEntry>> {
        async move {
            let url = self.url("/feeds/default/private/full")?;
            let body = ResourceWrite::new(kind.as_str(), title);
            let res: EntryEnvelope<ResourceEntry> = self
                .client
                .execute(ExecMethod::Post, url, Some(&body), Some(&self.token))
                .await?;
            Ok(res.entry)
        }
        .boxed()
    }

    fn get_resource<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<ResourceEntry>> {
        async move {
            let url = self.url(&format!(
                "/feeds/default/private/full/{}%3A{id}",
                ResourceKind::Spreadsheet.as_str()
            ))?;
            let res: EntryEnvelope<ResourceEntry> = self
                .client
                .execute(ExecMethod::Get, url, EmptySerde::none(), Some(&self.token))
                .await?;
            Ok(res.entry)
        }
        .boxed()
    }
}

#[derive(Debug)]
pub struct HttpSpreadsheetService {
    client: GDataClient,
    token: Token,
    base: Url,
}

impl HttpSpreadsheetService {
    fn worksheets_url(&self, key: &str) -> Result<Url> {
        Ok(self
            .base
            .join(&format!("/feeds/worksheets/{key}/private/full"))?)
    }

    fn cells_url(&self, key: &str, worksheet_id: &str) -> Result<Url> {
        Ok(self
            .base
            .join(&format!("/feeds/cells/{key}/{worksheet_id}/private/full"))?)
    }

    fn cell_url(&self, key: &str, worksheet_id: &str, row: u32, col: u32) -> Result<Url> {
        Ok(self.base.join(&format!(
            "/feeds/cells/{key}/{worksheet_id}/private/full/R{row}C{col}"
        ))?)
    }

    fn list_url(&self, key: &str, worksheet_id: &str) -> Result<Url> {
        Ok(self
            .base
            .join(&format!("/feeds/list/{key}/{worksheet_id}/private/full"))?)
    }
}

impl SpreadsheetService for HttpSpreadsheetService {
    fn worksheets_feed<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<WorksheetFeed>> {
        async move {
            let url = self.worksheets_url(key)?;
            let feed: FeedEnvelope<WorksheetFeed> = self
                .client
                .execute(ExecMethod::Get, url, EmptySerde::none(), Some(&self.token))
                .await?;
            Ok(feed.feed)
        }
        .boxed()
    }

    fn add_worksheet<'a>(
        &'a self,
        key: &'a str,
        title: &'a str,
        rows: u32,
        cols: u32,
    ) -> BoxFuture<'a, Result<WorksheetEntry>> {
        async move {
            let url = self.worksheets_url(key)?;
            let entry = WorksheetEntry::new(title, rows, cols);
            let body = WorksheetWrite::from(&entry);
            let res: EntryEnvelope<WorksheetEntry> = self
                .client
                .execute(ExecMethod::Post, url, Some(&body), Some(&self.token))
                .await?;
            Ok(res.entry)
        }
        .boxed()
    }

    fn update_worksheet<'a>(
        &'a self,
        _key: &'a str,
        worksheet: &'a WorksheetEntry,
    ) -> BoxFuture<'a, Result<WorksheetEntry>> {
        async move {
            let url = Url::parse(worksheet.edit_url()?)?;
            let body = WorksheetWrite::from(worksheet);
            let res: EntryEnvelope<WorksheetEntry> = self
                .client
                .execute(ExecMethod::Put, url, Some(&body), Some(&self.token))
                .await?;
            Ok(res.entry)
        }
        .boxed()
    }

    fn delete_worksheet<'a>(
        &'a self,
        _key: &'a str,
        worksheet: &'a WorksheetEntry,
    ) -> BoxFuture<'a, Result<()>> {
        async move {
            let url = Url::parse(worksheet.edit_url()?)?;
            self.client
                .execute_empty(ExecMethod::Delete, url, EmptySerde::none(), Some(&self.token))
                .await
        }
        .boxed()
    }

    fn cells<'a>(
        &'a self,
        key: &'a str,
        worksheet_id: &'a str,
        query: &'a CellQuery,
    ) -> BoxFuture<'a, Result<Vec<CellEntry>>> {
        async move {
            let mut url = self.cells_url(key, worksheet_id)?;
            query.apply(&mut url);
            let feed: FeedEnvelope<CellFeed> = self
                .client
                .execute(ExecMethod::Get, url, EmptySerde::none(), Some(&self.token))
                .await?;
            Ok(feed.feed.entry)
        }
        .boxed()
    }

    fn update_cell<'a>(
        &'a self,
        key: &'a str,
        worksheet_id: &'a str,
        row: u32,
        col: u32,
        value: &'a str,
    ) -> BoxFuture<'a, Result<CellEntry>> {
        async move {
            let url = self.cell_url(key, worksheet_id, row, col)?;
            let cell = CellEntry::new(row, col, value);
            let body = CellWrite::new(url.as_str(), &cell);
            let res: EntryEnvelope<CellEntry> = self
                .client
                .execute(ExecMethod::Put, url.clone(), Some(&body), Some(&self.token))
                .await?;
            Ok(res.entry)
        }
        .boxed()
    }

    fn list_feed<'a>(
        &'a self,
        key: &'a str,
        worksheet_id: &'a str,
        query: Option<&'a ListQuery>,
    ) -> BoxFuture<'a, Result<Vec<ListEntry>>> {
        async move {
            let mut url = self.list_url(key, worksheet_id)?;
            if let Some(query) = query {
                query.apply(&mut url);
            }
            let feed: FeedEnvelope<ListFeed> = self
                .client
                .execute(ExecMethod::Get, url, EmptySerde::none(), Some(&self.token))
                .await?;
            Ok(feed.feed.entry)
        }
        .boxed()
    }

    fn insert_row<'a>(
        &'a self,
        key: &'a str,
        worksheet_id: &'a str,
        row: &'a Row,
    ) -> BoxFuture<'a, Result<ListEntry>> {
        async move {
            let url = self.list_url(key, worksheet_id)?;
            let body = RowWrite::insert(row);
            let res: EntryEnvelope<ListEntry> = self
                .client
                .execute(ExecMethod::Post, url, Some(&body), Some(&self.token))
                .await?;
            Ok(res.entry)
        }
        .boxed()
    }

    fn update_row<'a>(
        &'a self,
        _key: &'a str,
        _worksheet_id: &'a str,
        entry: &'a ListEntry,
        row: &'a Row,
    ) -> BoxFuture<'a, Result<ListEntry>> {
        async move {
            let url = Url::parse(entry.edit_url()?)?;
            let body = RowWrite::update(entry, row);
            let res: EntryEnvelope<ListEntry> = self
                .client
                .execute(ExecMethod::Put, url, Some(&body), Some(&self.token))
                .await?;
            Ok(res.entry)
        }
        .boxed()
    }

    fn delete_row<'a>(
        &'a self,
        _key: &'a str,
        _worksheet_id: &'a str,
        entry: &'a ListEntry,
    ) -> BoxFuture<'a, Result<()>> {
        async move {
            let url = Url::parse(entry.edit_url()?)?;
            self.client
                .execute_empty(ExecMethod::Delete, url, EmptySerde::none(), Some(&self.token))
                .await
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::to_entry_xml;

    fn sheets_service() -> HttpSpreadsheetService {
        HttpSpreadsheetService {
            client: GDataClient::builder().build().unwrap(),
            token: Token::new("tok"),
            base: Url::parse(DEFAULT_SHEETS_URL).unwrap(),
        }
    }

    #[test]
    fn feed_urls() {
        let svc = sheets_service();
        assert_eq!(
            "https://spreadsheets.google.com/feeds/worksheets/0Abc/private/full",
            svc.worksheets_url("0Abc").unwrap().as_str()
        );
        assert_eq!(
            "https://spreadsheets.google.com/feeds/cells/0Abc/od6/private/full",
            svc.cells_url("0Abc", "od6").unwrap().as_str()
        );
        assert_eq!(
            "https://spreadsheets.google.com/feeds/list/0Abc/od7/private/full",
            svc.list_url("0Abc", "od7").unwrap().as_str()
        );
    }

    #[test]
    fn resource_url_keeps_encoded_separator() {
        let svc = HttpDocsService {
            client: GDataClient::builder().build().unwrap(),
            token: Token::new("tok"),
            base: Url::parse(DEFAULT_DOCS_URL).unwrap(),
        };
        let url = svc
            .url("/feeds/default/private/full/spreadsheet%3A0Abc")
            .unwrap();
        assert_eq!(
            "https://docs.google.com/feeds/default/private/full/spreadsheet%3A0Abc",
            url.as_str()
        );
    }

    #[test]
    fn cell_body_addresses_cell_url() {
        let svc = sheets_service();
        let url = svc.cell_url("0Abc", "od6", 1, 4).unwrap();
        assert_eq!(
            "https://spreadsheets.google.com/feeds/cells/0Abc/od6/private/full/R1C4",
            url.as_str()
        );

        let cell = CellEntry::new(1, 4, "city");
        let xml = to_entry_xml(&CellWrite::new(url.as_str(), &cell)).unwrap();
        assert!(xml.starts_with("<entry "));
        assert!(xml.contains(&format!("<id>{url}</id>")));
        assert!(xml.contains(r#"<gs:cell row="1" col="4" inputValue="city"/>"#));
    }

    #[test]
    fn worksheet_body_for_resize() {
        let mut ws = WorksheetEntry::new("Sheet1", 100, 20);
        ws.set_col_count(21);
        let xml = to_entry_xml(&WorksheetWrite::from(&ws)).unwrap();
        assert!(xml.contains(r#"xmlns:gs="http://schemas.google.com/spreadsheets/2006""#));
        assert!(xml.contains("<title>Sheet1</title>"));
        assert!(xml.contains("<gs:rowCount>100</gs:rowCount><gs:colCount>21</gs:colCount>"));
        assert!(!xml.contains('{'));
    }

    #[test]
    fn row_body_uses_extended_namespace() {
        let row: Row = [("name", "Ann"), ("age", "30")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let xml = to_entry_xml(&RowWrite::insert(&row)).unwrap();
        assert!(xml.contains(
            r#"xmlns:gsx="http://schemas.google.com/spreadsheets/2006/extended""#
        ));
        assert!(xml.ends_with("<gsx:name>Ann</gsx:name><gsx:age>30</gsx:age></entry>"));
        assert!(!xml.contains("gsx$"));
    }
}
