use std::time::Duration;

use reqwest::{
    Client, Method, Url,
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, IF_MATCH},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{debug, trace};

use crate::{
    atom::{ATOM_CONTENT_TYPE, to_entry_xml},
    auth::Token,
    errors::{Result, SheetsError},
};

const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
const REQ_ACCEPT: &str = "application/json";
const GDATA_VERSION_HEADER: &str = "gdata-version";
const GDATA_VERSION: &str = "3.0";

/// Placeholder for requests and responses without a body.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct EmptySerde {}

impl EmptySerde {
    pub fn none() -> Option<&'static Self> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl From<ExecMethod> for Method {
    fn from(value: ExecMethod) -> Self {
        match value {
            ExecMethod::Get => Method::GET,
            ExecMethod::Post => Method::POST,
            ExecMethod::Put => Method::PUT,
            ExecMethod::Delete => Method::DELETE,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct GDataClientBuilder {
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
}

impl GDataClientBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = Some(connect_timeout);
        self
    }

    pub fn build(self) -> Result<GDataClient> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(ACCEPT, HeaderValue::from_static(REQ_ACCEPT));
        default_headers.insert(
            HeaderName::from_static(GDATA_VERSION_HEADER),
            HeaderValue::from_static(GDATA_VERSION),
        );

        let mut builder = Client::builder()
            .user_agent(APP_USER_AGENT)
            .default_headers(default_headers);

        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        if let Some(connect_timeout) = self.connect_timeout {
            builder = builder.connect_timeout(connect_timeout);
        }

        let client = builder.build()?;
        Ok(GDataClient { inner: client })
    }
}

/// Thin wrapper around a `reqwest` client speaking the feeds protocol.
#[derive(Debug, Clone)]
pub struct GDataClient {
    inner: Client,
}

impl GDataClient {
    pub fn builder() -> GDataClientBuilder {
        GDataClientBuilder::default()
    }

    /// Send a request with an optional Atom `<entry>` body and decode the
    /// JSON response.
    pub async fn execute<B, R>(
        &self,
        method: ExecMethod,
        url: Url,
        body: Option<&B>,
        token: Option<&Token>,
    ) -> Result<R>
    where
        B: Serialize,
        R: DeserializeOwned,
    {
        let res = self.send(method, url, body, token).await?;
        let res: R = serde_json::from_str(&res)?;
        Ok(res)
    }

    /// Send a request whose response body we don't care about.
    pub async fn execute_empty<B>(
        &self,
        method: ExecMethod,
        url: Url,
        body: Option<&B>,
        token: Option<&Token>,
    ) -> Result<()>
    where
        B: Serialize,
    {
        let _ = self.send(method, url, body, token).await?;
        Ok(())
    }

    /// Post a url-encoded form and return the raw response text along with
    /// the status.
    ///
    /// Used for the login handshake which doesn't speak json.
    pub async fn post_form<F>(&self, url: Url, form: &F) -> Result<(reqwest::StatusCode, String)>
    where
        F: Serialize + ?Sized,
    {
        debug!(%url, "POST form");
        let res = self.inner.post(url).form(form).send().await?;
        let status = res.status();
        let text = res.text().await?;
        Ok((status, text))
    }

    async fn send<B>(
        &self,
        method: ExecMethod,
        mut url: Url,
        body: Option<&B>,
        token: Option<&Token>,
    ) -> Result<String>
    where
        B: Serialize,
    {
        url.query_pairs_mut().append_pair("alt", "json");
        debug!(?method, %url, "request");

        let mut req = self.inner.request(method.into(), url);
        if let Some(body) = body {
            let body = to_entry_xml(body)?;
            trace!(%body, "request body");
            req = req
                .header(CONTENT_TYPE, HeaderValue::from_static(ATOM_CONTENT_TYPE))
                .body(body);
        }
        if matches!(method, ExecMethod::Put | ExecMethod::Delete) {
            // Unconditional write, we never track etags.
            req = req.header(IF_MATCH, HeaderValue::from_static("*"));
        }
        if let Some(token) = token {
            req = req.header(AUTHORIZATION, token.header_value()?);
        }

        let res = req.send().await?;
        let status = res.status();
        let text = res.text().await?;
        trace!(%status, %text, "response");

        if !status.is_success() {
            return Err(SheetsError::remote(status, text));
        }

        Ok(text)
    }
}
