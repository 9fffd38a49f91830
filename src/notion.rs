//! Minimal Notion client: the two calls the sync needs.
//!
//! - `POST /v1/databases/{id}/query` for the fund directory (paginated)
//! - `POST /v1/pages` for one purchase record
//!
//! Queries retry 429 and 5xx responses with exponential backoff. Page
//! creation retries only 429s and refused connections. Every other
//! non-success status fails immediately with the message Notion returned.
//! Callers go through [`FundStore`] so they can be exercised without a
//! network.

use std::collections::HashMap;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use log::{debug, warn};
use serde::Deserialize;
use serde_json::json;
use zeroize::Zeroizing;

use crate::error::{Result, SyncError};

pub const NOTION_API_BASE: &str = "https://api.notion.com";
pub const NOTION_VERSION: &str = "2022-06-28";
pub const PAGE_SIZE: u32 = 100;
const MAX_RETRIES: u32 = 3;
const MAX_RETRY_AFTER_SECS: u64 = 60;
const USER_AGENT: &str = concat!("fundsync/", env!("CARGO_PKG_VERSION"));

// Purchase database property names.
pub const PROP_FUND: &str = "基金";
pub const PROP_AMOUNT: &str = "金额";
pub const PROP_CATEGORY: &str = "类型";
pub const PROP_DATE: &str = "日期";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Page {
    pub id: String,
    #[serde(default)]
    pub properties: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryResponse {
    pub results: Vec<Page>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct Created {
    id: String,
}

/// One purchase page to be created in the purchase database.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPurchasePage {
    pub database_id: String,
    pub fund_page_id: String,
    pub amount: f64,
    pub category: String,
    pub date: DateTime<Utc>,
}

impl NewPurchasePage {
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "parent": { "type": "database_id", "database_id": self.database_id },
            "properties": {
                PROP_FUND: { "relation": [{ "id": self.fund_page_id }] },
                PROP_AMOUNT: { "number": self.amount },
                PROP_CATEGORY: { "select": { "name": self.category } },
                PROP_DATE: {
                    "date": {
                        "start": self.date.to_rfc3339_opts(SecondsFormat::Millis, true),
                        "end": null,
                        "time_zone": null,
                    }
                },
            },
        })
    }
}

/// Which failures may be re-sent.
///
/// Page creation has no idempotency key, so a write is only retried when
/// Notion cannot have processed it: a refused connection or a 429.
#[derive(Debug, Clone, Copy, PartialEq)]
enum RetryPolicy {
    Read,
    Write,
}

impl RetryPolicy {
    fn retries_status(self, status: u16) -> bool {
        match self {
            Self::Read => status == 429 || status >= 500,
            Self::Write => status == 429,
        }
    }

    fn retries_error(self, e: &reqwest::Error) -> bool {
        match self {
            Self::Read => e.is_timeout() || e.is_connect(),
            Self::Write => e.is_connect() && !e.is_timeout(),
        }
    }
}

/// Seconds to wait on a 429, from `Retry-After` when it is a plain number.
fn retry_after_secs(header: Option<&str>, fallback: u64) -> u64 {
    header
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(fallback)
        .min(MAX_RETRY_AFTER_SECS)
}

// ---------------------------------------------------------------------------
// FundStore
// ---------------------------------------------------------------------------

/// The remote store as seen by the resolver and dispatcher.
pub trait FundStore: Sync {
    fn query_database(&self, database_id: &str, cursor: Option<&str>) -> Result<QueryResponse>;

    /// Returns the id of the created page.
    fn create_page(&self, page: &NewPurchasePage) -> Result<String>;
}

pub struct NotionClient {
    http: reqwest::blocking::Client,
    token: Zeroizing<String>,
    base_url: String,
}

impl NotionClient {
    pub fn with_base_url(token: Zeroizing<String>, base_url: String) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            http,
            token,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn post_with_retry(
        &self,
        path: &str,
        body: &serde_json::Value,
        policy: RetryPolicy,
    ) -> Result<serde_json::Value> {
        let url = format!("{}{}", self.base_url, path);
        let mut backoff_secs = 1u64;

        for attempt in 0..=MAX_RETRIES {
            let result = self
                .http
                .post(&url)
                .bearer_auth(self.token.as_str())
                .header("Notion-Version", NOTION_VERSION)
                .json(body)
                .send();

            let resp = match result {
                Ok(resp) => resp,
                Err(e) if attempt < MAX_RETRIES && policy.retries_error(&e) => {
                    warn!("retry {}/{} in {}s ({})", attempt + 1, MAX_RETRIES, backoff_secs, e);
                    thread::sleep(Duration::from_secs(backoff_secs));
                    backoff_secs *= 2;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let status = resp.status().as_u16();
            if resp.status().is_success() {
                return Ok(resp.json()?);
            }

            if policy.retries_status(status) && attempt < MAX_RETRIES {
                let wait = if status == 429 {
                    let header = resp.headers().get("retry-after").and_then(|v| v.to_str().ok());
                    retry_after_secs(header, backoff_secs)
                } else {
                    backoff_secs
                };
                warn!("retry {}/{} in {}s (HTTP {})", attempt + 1, MAX_RETRIES, wait, status);
                thread::sleep(Duration::from_secs(wait));
                backoff_secs *= 2;
                continue;
            }

            let text = resp.text().unwrap_or_default();
            let message = match serde_json::from_str::<ErrorBody>(&text) {
                Ok(err) if !err.message.is_empty() => format!("{}: {}", err.code, err.message),
                _ => text.chars().take(200).collect(),
            };
            return Err(SyncError::Api { status, message });
        }

        Err(SyncError::Api {
            status: 0,
            message: format!("gave up after {MAX_RETRIES} retries"),
        })
    }
}

impl FundStore for NotionClient {
    fn query_database(&self, database_id: &str, cursor: Option<&str>) -> Result<QueryResponse> {
        let mut body = json!({ "page_size": PAGE_SIZE });
        if let Some(cursor) = cursor {
            body["start_cursor"] = json!(cursor);
        }
        debug!("querying database {database_id} (cursor {cursor:?})");
        let value = self.post_with_retry(
            &format!("/v1/databases/{database_id}/query"),
            &body,
            RetryPolicy::Read,
        )?;
        Ok(serde_json::from_value(value)?)
    }

    fn create_page(&self, page: &NewPurchasePage) -> Result<String> {
        let value = self.post_with_retry("/v1/pages", &page.to_json(), RetryPolicy::Write)?;
        let created: Created = serde_json::from_value(value)?;
        Ok(created.id)
    }
}
