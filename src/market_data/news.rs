// =============================================================================
// Headline Client — RSS feed + best-effort link shortener
// =============================================================================
//
// Reads the first few `<item>`s of an RSS 2.0 feed (`rss/channel/item`),
// keeps the title up to the first " - " (feeds append " - Publisher") and the
// link, and runs each link through the shortener.  The shortener is purely
// cosmetic: any failure keeps the original link.
//
// The fetcher never fails past its boundary: the result is a `HeadlineDigest`
// that always renders to displayable text.
// =============================================================================

use std::time::Duration;

use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::{debug, instrument, warn};

use crate::config::AppConfig;
use crate::error::FetchError;
use crate::types::Headline;

/// Number of items kept from the feed.
pub const MAX_HEADLINES: usize = 3;

/// Delimiter separating the headline from the publisher name.
const TITLE_DELIMITER: &str = " - ";

/// Outcome of a headline fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum HeadlineDigest {
    Items(Vec<Headline>),
    /// The feed was reachable but had no items.
    Empty,
    /// The feed could not be fetched or parsed.
    Failed(String),
}

impl HeadlineDigest {
    /// Pre-formatted text block for the report.
    pub fn render(&self) -> String {
        match self {
            Self::Items(items) => items
                .iter()
                .map(|h| format!("🔹 {}\n   👉 {}", h.title, h.link))
                .collect::<Vec<_>>()
                .join("\n\n"),
            Self::Empty => "Sin noticias.".to_string(),
            Self::Failed(reason) => format!("Error news: {reason}"),
        }
    }
}

// ---------------------------------------------------------------------------
// LinkShortener
// ---------------------------------------------------------------------------

/// Best-effort URL shortener (TinyURL `api-create` style: plain-text body
/// containing the short URL).
#[derive(Clone)]
pub struct LinkShortener {
    client: reqwest::Client,
    /// Endpoint template containing `{url}`.
    template: String,
    timeout: Duration,
}

impl LinkShortener {
    pub fn new(client: reqwest::Client, template: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            template: template.into(),
            timeout,
        }
    }

    /// Shorten `link`, falling back to `link` itself on any failure.
    pub async fn shorten(&self, link: &str) -> String {
        if link.is_empty() {
            return String::new();
        }
        match self.try_shorten(link).await {
            Ok(short) => short,
            Err(e) => {
                debug!(link, error = %e, "shortener failed, keeping original link");
                link.to_string()
            }
        }
    }

    async fn try_shorten(&self, link: &str) -> Result<String, FetchError> {
        let encoded: String = url::form_urlencoded::byte_serialize(link.as_bytes()).collect();
        let endpoint = self.template.replace("{url}", &encoded);

        let resp = self
            .client
            .get(&endpoint)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let body = resp.text().await?;
        let short = body.trim();
        if short.starts_with("http://") || short.starts_with("https://") {
            Ok(short.to_string())
        } else {
            Err(FetchError::malformed("shortener did not return a URL"))
        }
    }
}

// ---------------------------------------------------------------------------
// NewsClient
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct NewsClient {
    client: reqwest::Client,
    feed_url: String,
    timeout: Duration,
    shortener: LinkShortener,
}

impl NewsClient {
    pub fn new(
        client: reqwest::Client,
        feed_url: impl Into<String>,
        timeout: Duration,
        shortener: LinkShortener,
    ) -> Self {
        Self {
            client,
            feed_url: feed_url.into(),
            timeout,
            shortener,
        }
    }

    pub fn from_config(client: reqwest::Client, config: &AppConfig) -> Self {
        let shortener = LinkShortener::new(
            client.clone(),
            config.api.shortener_url.clone(),
            config.api.shortener_timeout(),
        );
        Self::new(client, config.api.news_url.clone(), config.api.news_timeout(), shortener)
    }

    /// Fetch the latest headlines. Never fails.
    #[instrument(skip_all, name = "news::headlines")]
    pub async fn headlines(&self) -> HeadlineDigest {
        let items = match self.fetch_items().await {
            Ok(items) => items,
            Err(e) => {
                warn!(error = %e, "headline fetch failed");
                return HeadlineDigest::Failed(e.to_string());
            }
        };

        if items.is_empty() {
            return HeadlineDigest::Empty;
        }

        let mut headlines = Vec::with_capacity(items.len());
        for item in items {
            let link = self.shortener.shorten(&item.link).await;
            headlines.push(Headline {
                title: clean_title(&item.title),
                link,
            });
        }
        HeadlineDigest::Items(headlines)
    }

    async fn fetch_items(&self) -> Result<Vec<RssItem>, FetchError> {
        let resp = self
            .client
            .get(&self.feed_url)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let body = resp.text().await?;
        parse_rss_items(&body, MAX_HEADLINES)
    }
}

/// Title up to the publisher delimiter, trimmed.
pub fn clean_title(raw: &str) -> String {
    raw.split(TITLE_DELIMITER).next().unwrap_or("").trim().to_string()
}

// ---------------------------------------------------------------------------
// RSS parsing
// ---------------------------------------------------------------------------

/// Raw `<item>` fields before cleaning.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RssItem {
    pub title: String,
    pub link: String,
}

#[derive(Clone, Copy, PartialEq)]
enum Field {
    Title,
    Link,
}

/// Collect up to `limit` items under `rss/channel/item`.
pub fn parse_rss_items(xml: &str, limit: usize) -> Result<Vec<RssItem>, FetchError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut items = Vec::new();
    let mut current: Option<RssItem> = None;
    let mut field: Option<Field> = None;

    loop {
        let event = reader.read_event().map_err(|e| {
            FetchError::malformed(format!(
                "RSS parse error at position {}: {e}",
                reader.error_position()
            ))
        })?;

        match event {
            Event::Start(e) => {
                let name = e.name().as_ref().to_vec();
                path.push(name);
                if is_item_path(&path) {
                    current = Some(RssItem::default());
                } else if current.is_some() && path.len() == 4 {
                    field = match path[3].as_slice() {
                        b"title" => Some(Field::Title),
                        b"link" => Some(Field::Link),
                        _ => None,
                    };
                }
            }
            Event::End(_) => {
                if is_item_path(&path) {
                    if let Some(item) = current.take() {
                        items.push(item);
                        if items.len() >= limit {
                            break;
                        }
                    }
                }
                field = None;
                path.pop();
            }
            Event::Text(t) => {
                let text = t
                    .unescape()
                    .map_err(|e| FetchError::malformed(format!("bad RSS text: {e}")))?;
                append_field(current.as_mut(), field, &text);
            }
            Event::CData(c) => {
                let text = String::from_utf8_lossy(&c.into_inner()).into_owned();
                append_field(current.as_mut(), field, &text);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(items)
}

fn is_item_path(path: &[Vec<u8>]) -> bool {
    path.len() == 3 && path[0] == b"rss" && path[1] == b"channel" && path[2] == b"item"
}

fn append_field(item: Option<&mut RssItem>, field: Option<Field>, text: &str) {
    if let (Some(item), Some(field)) = (item, field) {
        match field {
            Field::Title => item.title.push_str(text),
            Field::Link => item.link.push_str(text),
        }
    }
}
