use std::collections::HashMap;
use std::fmt;

use reqwest::Url;
use reqwest::header::HeaderValue;
use serde::Serialize;
use tracing::debug;

use crate::config::{Credentials, Sensitive};
use crate::errors::{Result, SheetsError};
use crate::req::GDataClient;

/// Name this client identifies itself with during login.
pub const SOURCE_NAME: &str = "Rust sheets_connector";

const ACCOUNT_TYPE: &str = "HOSTED_OR_GOOGLE";

/// The remote service a login token is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthService {
    /// Document listing and search.
    Documents,
    /// Worksheet, cell and list feeds.
    Spreadsheets,
}

impl AuthService {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Documents => "writely",
            Self::Spreadsheets => "wise",
        }
    }
}

#[derive(Clone)]
pub struct Token {
    value: Sensitive,
}

impl Token {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: Sensitive::new(value),
        }
    }

    pub fn value(&self) -> &str {
        self.value.expose()
    }

    pub fn header_value(&self) -> Result<HeaderValue> {
        let val = format!("GoogleLogin auth={}", self.value());
        HeaderValue::from_str(&val).map_err(|_| {
            SheetsError::AuthError {
                code: "InvalidToken".to_string(),
                message: "login returned a token that isn't a valid header value".to_string(),
            }
        })
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token").field("value", &self.value).finish()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginForm<'a> {
    account_type: &'a str,
    #[serde(rename = "Email")]
    email: &'a str,
    #[serde(rename = "Passwd")]
    passwd: &'a str,
    service: &'a str,
    source: &'a str,
}

/// Body of a login response: one `Key=Value` pair per line.
#[derive(Debug, Default)]
struct LoginResponse {
    fields: HashMap<String, String>,
}

impl LoginResponse {
    fn parse(body: &str) -> Self {
        let fields = body
            .lines()
            .filter_map(|line| line.split_once('='))
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            .collect();
        Self { fields }
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }
}

/// Exchange account credentials for a service token.
pub(crate) async fn client_login(
    client: &GDataClient,
    url: &Url,
    credentials: &Credentials,
    service: AuthService,
) -> Result<Token> {
    let (user, password) = credentials.require()?;
    debug!(%user, service = service.as_str(), "logging in");

    let form = LoginForm {
        account_type: ACCOUNT_TYPE,
        email: user,
        passwd: password,
        service: service.as_str(),
        source: SOURCE_NAME,
    };

    let (status, body) = client.post_form(url.clone(), &form).await?;
    token_from_response(status, &body)
}

fn token_from_response(status: reqwest::StatusCode, body: &str) -> Result<Token> {
    let res = LoginResponse::parse(body);

    if !status.is_success() {
        return Err(SheetsError::AuthError {
            code: res.get("Error").unwrap_or("Unknown").to_string(),
            message: format!("login rejected with status {status}"),
        });
    }

    match res.get("Auth") {
        Some(token) if !token.is_empty() => Ok(Token::new(token)),
        _ => Err(SheetsError::AuthError {
            code: res.get("Error").unwrap_or("MissingAuth").to_string(),
            message: "login response did not contain an auth token".to_string(),
        }),
    }
}
