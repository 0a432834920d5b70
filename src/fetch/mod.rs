pub mod extractor;

use std::sync::Arc;

use encoding_rs::{Encoding, UTF_8};
use reqwest::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};
use tracing::debug;

use crate::config::ResearchConfig;

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml";

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("invalid URL: must be HTTP(S)")]
    InvalidScheme,

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("fetch timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connection(reqwest::Error),

    #[error("fetch failed: status {0}")]
    Status(u16),

    #[error("unsupported content type: {0}")]
    UnsupportedContentType(String),

    #[error("response too large (>{0} bytes)")]
    TooLarge(usize),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Connection(e)
        }
    }
}

/// A successfully downloaded text response.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

/// Retrieves a page body for the extractor.
/// Implemented by `HttpFetcher` for production; stubbed in pipeline tests.
pub trait PageFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError>;
}

#[derive(Clone)]
pub struct HttpFetcher {
    http: Client,
    config: Arc<ResearchConfig>,
}

impl HttpFetcher {
    pub fn new(http: Client, config: Arc<ResearchConfig>) -> Self {
        Self { http, config }
    }
}

impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        validate_url(url)?;

        let response = self
            .http
            .get(url)
            .header(USER_AGENT, &self.config.user_agent)
            .header(ACCEPT, ACCEPT_HTML)
            .timeout(self.config.page_timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_ascii_lowercase());

        if let Some(ct) = &content_type
            && !is_text_content(ct)
        {
            return Err(FetchError::UnsupportedContentType(ct.clone()));
        }

        let max = self.config.max_page_bytes;
        if let Some(len) = response.content_length()
            && len as usize > max
        {
            return Err(FetchError::TooLarge(max));
        }

        let mut bytes = Vec::new();
        let mut stream = response;
        while let Some(chunk) = stream.chunk().await? {
            bytes.extend_from_slice(&chunk);
            if bytes.len() > max {
                return Err(FetchError::TooLarge(max));
            }
        }

        let body = decode_body(&bytes, content_type.as_deref());
        debug!(url = %final_url, bytes = bytes.len(), "page fetched");
        Ok(FetchedPage {
            url: final_url,
            status: status.as_u16(),
            content_type,
            body,
        })
    }
}

fn validate_url(raw: &str) -> Result<(), FetchError> {
    let parsed = url::Url::parse(raw)?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        _ => Err(FetchError::InvalidScheme),
    }
}

fn is_text_content(content_type: &str) -> bool {
    let mime = content_type.split(';').next().unwrap_or("").trim();
    mime.starts_with("text/") || mime == "application/xhtml+xml" || mime.ends_with("+xml")
        || mime == "application/xml"
}

/// Decode with the charset declared in `Content-Type`, falling back to UTF-8.
fn decode_body(bytes: &[u8], content_type: Option<&str>) -> String {
    let encoding = content_type
        .and_then(charset_label)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or(UTF_8);
    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}

fn charset_label(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        (key.trim() == "charset").then(|| value.trim().trim_matches('"'))
    })
}
