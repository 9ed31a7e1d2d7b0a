//! Search endpoint client.
//!
//! [`SearchClient`] is the seam the fetch loop talks to. [`TwitterClient`]
//! implements it against the v1.1 standard search endpoint using app-only
//! (bearer token) authentication, and blocks through rate-limit windows so
//! callers never see a 429.

use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use reqwest::header::{self, HeaderMap};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::ApiConfig;
use crate::error::{Result, XsError};
use crate::model::{PAGE_SIZE, SearchPost};

const SEARCH_PATH: &str = "/1.1/search/tweets.json";
const TOKEN_PATH: &str = "/oauth2/token";
const TWITTER_DATE_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

/// Fallback wait when a 429 carries no usable reset header (one rate window).
pub const DEFAULT_RATE_LIMIT_WAIT: Duration = Duration::from_secs(15 * 60);

/// One page request against the search endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// Full query string, e.g. `rust OR ferris`.
    pub query: String,
    /// Only posts created before this date.
    pub until: NaiveDate,
    /// Only posts with an id at or below this one; `None` for no bound.
    pub max_id: Option<u64>,
    pub lang: Option<String>,
    pub geocode: Option<String>,
    pub result_type: Option<String>,
}

/// A paged, reverse-chronological post search.
pub trait SearchClient {
    /// Fetch one page. An empty vector means nothing older matches.
    ///
    /// # Errors
    ///
    /// Returns an error for any failure other than rate limiting, which
    /// implementations must wait out themselves.
    fn search(&mut self, request: &SearchRequest) -> Result<Vec<SearchPost>>;
}

impl<C: SearchClient + ?Sized> SearchClient for &mut C {
    fn search(&mut self, request: &SearchRequest) -> Result<Vec<SearchPost>> {
        (**self).search(request)
    }
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token_type: String,
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    statuses: Vec<RawStatus>,
}

#[derive(Debug, Deserialize)]
struct RawStatus {
    id: u64,
    created_at: String,
    #[serde(default)]
    full_text: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    favorite_count: i64,
    #[serde(default)]
    retweet_count: i64,
}

impl TryFrom<RawStatus> for SearchPost {
    type Error = XsError;

    fn try_from(raw: RawStatus) -> Result<Self> {
        let created_at = parse_twitter_date(&raw.created_at).ok_or_else(|| {
            XsError::invalid_response(format!(
                "status {} has unparseable created_at '{}'",
                raw.id, raw.created_at
            ))
        })?;
        Ok(Self {
            id: raw.id,
            created_at,
            full_text: raw.full_text.or(raw.text).unwrap_or_default(),
            favorite_count: raw.favorite_count,
            retweet_count: raw.retweet_count,
        })
    }
}

/// Parse the endpoint's date format: "Fri Jan 09 15:12:21 +0000 2026".
#[must_use]
pub fn parse_twitter_date(date_str: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_str(date_str, TWITTER_DATE_FORMAT)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Build the query-string pairs for a search request.
///
/// Every page asks for [`PAGE_SIZE`] posts with untruncated text. The
/// endpoint's `max_id` is inclusive, so the cursor is sent as
/// `max_id - 1` to get strictly older posts.
#[must_use]
pub fn search_params(request: &SearchRequest) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("q", request.query.clone()),
        ("count", PAGE_SIZE.to_string()),
        ("tweet_mode", "extended".to_string()),
        ("until", request.until.format("%Y-%m-%d").to_string()),
    ];
    if let Some(max_id) = request.max_id {
        params.push(("max_id", max_id.saturating_sub(1).to_string()));
    }
    if let Some(lang) = &request.lang {
        params.push(("lang", lang.clone()));
    }
    if let Some(geocode) = &request.geocode {
        params.push(("geocode", geocode.clone()));
    }
    if let Some(result_type) = &request.result_type {
        params.push(("result_type", result_type.clone()));
    }
    params
}

/// How long to sleep after a 429, from the `x-rate-limit-reset` epoch header.
#[must_use]
pub fn rate_limit_wait(headers: &HeaderMap, now: DateTime<Utc>) -> Duration {
    headers
        .get("x-rate-limit-reset")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<i64>().ok())
        .map_or(DEFAULT_RATE_LIMIT_WAIT, |reset| {
            let secs = reset.saturating_sub(now.timestamp()).max(0);
            // one extra second so we land after the window opens
            Duration::from_secs(u64::try_from(secs).unwrap_or(0) + 1)
        })
}

// =============================================================================
// HTTP client
// =============================================================================

/// Blocking client for the standard search endpoint.
pub struct TwitterClient {
    http: Client,
    base_url: String,
    api_key: SecretString,
    api_secret: SecretString,
    bearer: Option<SecretString>,
}

impl TwitterClient {
    /// Build a client from the `[api]` configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if credentials are missing or the HTTP client cannot
    /// be constructed.
    pub fn new(api: &ApiConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(api.timeout_secs))
            .user_agent(concat!("xsent/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Self::with_http(api, http)
    }

    /// Build a client around an already configured HTTP client.
    fn with_http(api: &ApiConfig, http: Client) -> Result<Self> {
        let api_key = api
            .key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| XsError::auth("missing API key"))?;
        let api_secret = api
            .secret
            .clone()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| XsError::auth("missing API secret"))?;

        Ok(Self {
            http,
            base_url: api.base_url.trim_end_matches('/').to_string(),
            api_key: SecretString::from(api_key),
            api_secret: SecretString::from(api_secret),
            bearer: None,
        })
    }

    /// Exchange the consumer key/secret for an app-only bearer token.
    fn authenticate(&mut self) -> Result<()> {
        let url = format!("{}{TOKEN_PATH}", self.base_url);
        let response = self
            .http
            .post(&url)
            .basic_auth(
                self.api_key.expose_secret(),
                Some(self.api_secret.expose_secret()),
            )
            .header(
                header::CONTENT_TYPE,
                "application/x-www-form-urlencoded;charset=UTF-8",
            )
            .body("grant_type=client_credentials")
            .send()?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(XsError::auth(format!("token request returned {status}: {body}")));
        }

        let token: TokenResponse = response.json()?;
        if !token.token_type.eq_ignore_ascii_case("bearer") {
            return Err(XsError::auth(format!(
                "unexpected token type '{}'",
                token.token_type
            )));
        }
        info!("Obtained app-only bearer token");
        self.bearer = Some(SecretString::from(token.access_token));
        Ok(())
    }

    fn send_search(&self, params: &[(&'static str, String)]) -> Result<Response> {
        let bearer = self
            .bearer
            .as_ref()
            .ok_or_else(|| XsError::auth("not authenticated"))?;
        let url = format!("{}{SEARCH_PATH}", self.base_url);
        Ok(self
            .http
            .get(&url)
            .bearer_auth(bearer.expose_secret())
            .query(params)
            .send()?)
    }
}

impl SearchClient for TwitterClient {
    fn search(&mut self, request: &SearchRequest) -> Result<Vec<SearchPost>> {
        if self.bearer.is_none() {
            self.authenticate()?;
        }
        let params = search_params(request);
        debug!(?params, "Search request");

        loop {
            let response = self.send_search(&params)?;
            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                let wait = rate_limit_wait(response.headers(), Utc::now());
                warn!(
                    wait_secs = wait.as_secs(),
                    "Rate limit reached, waiting for the window to reset"
                );
                std::thread::sleep(wait);
                continue;
            }

            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                let body = response.text().unwrap_or_default();
                return Err(XsError::auth(format!("search returned {status}: {body}")));
            }

            if !status.is_success() {
                let body = response
                    .text()
                    .unwrap_or_else(|_| "Unknown API error".to_string());
                return Err(XsError::api(status.as_u16(), body));
            }

            let page: SearchResponse = response.json()?;
            return page.statuses.into_iter().map(SearchPost::try_from).collect();
        }
    }
}
