//! Display names for website locations, taken from the page `<title>`.

use async_trait::async_trait;
use regex::Regex;
use reqwest::{Client, Response};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::warn;

/// The `<title>` sits in the document head; nothing past this is read.
pub const MAX_TITLE_SCAN_BYTES: usize = 64 * 1024;

static TITLE_RE: OnceLock<Regex> = OnceLock::new();
static WHITESPACE_RE: OnceLock<Regex> = OnceLock::new();

#[async_trait]
pub trait TitleFetcher: Send + Sync {
    /// Best effort: `None` when the page can't be fetched or has no title.
    async fn fetch_title(&self, url: &str) -> Option<String>;
}

pub struct HttpTitleFetcher {
    client: Client,
}

impl HttpTitleFetcher {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent("gaconnect-title-fetcher/0.1.0")
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl TitleFetcher for HttpTitleFetcher {
    async fn fetch_title(&self, url: &str) -> Option<String> {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(url, error = %e, "failed to fetch website for its title");
                return None;
            }
        };

        if !response.status().is_success() {
            warn!(url, status = %response.status(), "website returned an error status");
            return None;
        }

        match read_head(response).await {
            Ok(head) => extract_title(&String::from_utf8_lossy(&head)),
            Err(e) => {
                warn!(url, error = %e, "failed to read website body");
                None
            }
        }
    }
}

async fn read_head(mut response: Response) -> reqwest::Result<Vec<u8>> {
    let expected = response
        .content_length()
        .map_or(MAX_TITLE_SCAN_BYTES, |len| {
            usize::try_from(len).map_or(MAX_TITLE_SCAN_BYTES, |len| len.min(MAX_TITLE_SCAN_BYTES))
        });

    let mut head = Vec::with_capacity(expected);
    while head.len() < MAX_TITLE_SCAN_BYTES {
        let Some(chunk) = response.chunk().await? else {
            break;
        };
        let take = chunk.len().min(MAX_TITLE_SCAN_BYTES - head.len());
        head.extend_from_slice(&chunk[..take]);
    }
    Ok(head)
}

pub fn extract_title(html: &str) -> Option<String> {
    let title_re =
        TITLE_RE.get_or_init(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("valid title regex"));
    let whitespace_re = WHITESPACE_RE.get_or_init(|| Regex::new(r"\s+").expect("valid whitespace regex"));

    let raw = title_re.captures(html)?.get(1)?.as_str();
    let decoded = decode_entities(raw);
    let title = whitespace_re.replace_all(decoded.trim(), " ").into_owned();

    if title.is_empty() {
        None
    } else {
        Some(title)
    }
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#039;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
