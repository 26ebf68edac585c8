//! Client for spreadsheet documents hosted behind the GData document and
//! spreadsheet feeds.
//!
//! A [`Connection`] holds credentials and lazily logs in to both services.
//! [`Spreadsheet`]s are opened through it, and each exposes its [`Sheet`]s,
//! which support finding, inserting, updating and removing rows keyed by
//! normalized header names.

pub use crate::cache::Cached;
pub use crate::config::{Credentials, PASSWORD_ENV_VAR, Sensitive, USER_ENV_VAR};
pub use crate::connection::{Connection, ConnectionBuilder};
pub use crate::feed::Row;
pub use crate::normalize::normalize_header;
pub use crate::query::RowQuery;
pub use crate::sheet::{Rows, Sheet};
pub use crate::spreadsheet::{DEFAULT_SHEET_ID, Spreadsheet};
pub use crate::value::RowValue;

mod atom;
mod auth;
mod cache;
mod config;
mod connection;
mod normalize;
mod req;
mod sheet;
mod spreadsheet;
mod value;

pub mod errors;
pub mod feed;
pub mod http;
pub mod memory;
pub mod query;
pub mod service;
