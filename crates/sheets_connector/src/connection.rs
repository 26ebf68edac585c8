use std::sync::Arc;
use std::time::Duration;

use tokio::sync::OnceCell;
use tracing::debug;

use crate::config::Credentials;
use crate::errors::Result;
use crate::http::{Endpoints, HttpBackend};
use crate::service::Backend;

#[derive(Debug, Default)]
pub struct ConnectionBuilder {
    user: Option<String>,
    password: Option<String>,

    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,

    auth_url: Option<String>,
    docs_url: Option<String>,
    sheets_url: Option<String>,
}

macro_rules! builder_fn {
    ($name:ident, $ty:ty) => {
        pub fn $name(mut self, $name: $ty) -> Self {
            self.$name = Some($name);
            self
        }
    };
}

impl ConnectionBuilder {
    builder_fn! {user, String}

    builder_fn! {password, String}

    builder_fn! {timeout, Duration}

    builder_fn! {connect_timeout, Duration}

    builder_fn! {auth_url, String}

    builder_fn! {docs_url, String}

    builder_fn! {sheets_url, String}

    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve credentials and build a connection to the hosted services.
    ///
    /// Nothing is sent over the network until a service handle is first
    /// needed.
    pub fn build(self) -> Result<Connection> {
        let credentials = Credentials::resolve(self.user, self.password);
        credentials.require()?;

        let defaults = Endpoints::default();
        let endpoints = Endpoints {
            auth: self.auth_url.unwrap_or(defaults.auth),
            docs: self.docs_url.unwrap_or(defaults.docs),
            sheets: self.sheets_url.unwrap_or(defaults.sheets),
        };

        let mut backend = HttpBackend::new(endpoints);
        if let Some(timeout) = self.timeout {
            backend = backend.with_timeout(timeout);
        }
        if let Some(timeout) = self.connect_timeout {
            backend = backend.with_connect_timeout(timeout);
        }

        Ok(Connection::new(backend, credentials))
    }
}

/// Credentials plus one lazily logged-in handle per remote service.
///
/// A connection is meant to be shared (behind an [`Arc`]) by every
/// spreadsheet opened with it. Each handle logs in at most once and is
/// reused for the lifetime of the connection.
#[derive(Debug)]
pub struct Connection<B: Backend = HttpBackend> {
    credentials: Credentials,
    backend: B,

    docs: OnceCell<B::Docs>,
    sheets: OnceCell<B::Sheets>,
}

impl Connection {
    pub fn builder() -> ConnectionBuilder {
        ConnectionBuilder::new()
    }
}

impl<B: Backend> Connection<B> {
    pub fn new(backend: B, credentials: Credentials) -> Self {
        Self {
            credentials,
            backend,
            docs: OnceCell::new(),
            sheets: OnceCell::new(),
        }
    }

    /// Reuse `existing` when given, otherwise create a new connection.
    pub fn connect(existing: Option<Arc<Self>>, backend: B, credentials: Credentials) -> Arc<Self> {
        existing.unwrap_or_else(|| Arc::new(Self::new(backend, credentials)))
    }

    pub fn user(&self) -> Option<&str> {
        self.credentials.user()
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Document search client, logging in on first use.
    pub async fn docs(&self) -> Result<&B::Docs> {
        self.docs
            .get_or_try_init(|| async {
                debug!(user = ?self.user(), "creating docs client");
                self.backend.login_docs(&self.credentials).await
            })
            .await
    }

    /// Spreadsheet data client, logging in on first use.
    pub async fn sheets(&self) -> Result<&B::Sheets> {
        self.sheets
            .get_or_try_init(|| async {
                debug!(user = ?self.user(), "creating spreadsheet client");
                self.backend.login_sheets(&self.credentials).await
            })
            .await
    }
}
