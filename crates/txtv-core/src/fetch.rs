//! HTTP client for the remote teletext service.
//!
//! The engine only depends on the [`PageFetcher`] trait; [`HttpFetcher`] is
//! the production implementation. The service exposes one JSON document per
//! page, wrapped in a `{"teletext": {"page": {...}}}` envelope, with
//! `/next.json` and `/prev.json` variants that resolve relative moves on the
//! server side (page numbers are sparse, so the numeric neighbor is not
//! necessarily the next existing page).

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Deserializer};
use tracing::debug;

use crate::error::{Error, Result};
use crate::types::{Direction, Location, Page, Subpage};

/// Default request timeout.
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Source of remote pages.
///
/// `direction` is a hint for the server: `Some(Next)`/`Some(Prev)` ask for
/// the closest existing page after/before `page` rather than `page` itself.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch one page, optionally resolved relative to `page`.
    async fn fetch(&self, page: u16, direction: Option<Direction>) -> Result<RemotePage>;
}

/// HTTP implementation of [`PageFetcher`] backed by a shared reqwest client.
pub struct HttpFetcher {
    client: Client,
    base_url: String,
    app_query: String,
}

impl HttpFetcher {
    /// Create a fetcher for the service at `base_url`, authenticating with
    /// the given application id and key.
    pub fn new(base_url: &str, app_id: &str, app_key: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent(concat!("txtv/", env!("CARGO_PKG_VERSION")))
            .gzip(true)
            .build()
            .map_err(Error::Network)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            app_query: format!("app_id={app_id}&app_key={app_key}"),
        })
    }

    fn page_url(&self, page: u16, direction: Option<Direction>) -> String {
        let suffix = match direction {
            None => "",
            Some(Direction::Next) => "/next",
            Some(Direction::Prev) => "/prev",
        };
        format!(
            "{}/v1/teletext/pages/{page}{suffix}.json?{}",
            self.base_url, self.app_query
        )
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, page: u16, direction: Option<Direction>) -> Result<RemotePage> {
        let url = self.page_url(page, direction);
        debug!("send {url}");

        let started = std::time::Instant::now();
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        debug!("recv {url} [{status}] ({}ms)", started.elapsed().as_millis());

        if status == StatusCode::NOT_FOUND {
            return Err(Error::NotFound { page });
        }
        if !status.is_success() {
            return Err(Error::Http {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let envelope: Envelope =
            serde_json::from_str(&body).map_err(|e| Error::Decode(e.to_string()))?;
        Ok(envelope.teletext.page)
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    teletext: Teletext,
}

#[derive(Debug, Deserialize)]
struct Teletext {
    page: RemotePage,
}

/// A page as decoded from the server response, before index normalization.
#[derive(Debug, Clone, Deserialize)]
pub struct RemotePage {
    /// Page number (string-encoded on the wire).
    #[serde(deserialize_with = "u16_from_string")]
    pub number: u16,
    /// Server-side timestamp of the page, local time without offset.
    #[serde(default)]
    pub time: Option<String>,
    /// Sub-pages in response order.
    #[serde(default, rename = "subpage")]
    pub subpages: Vec<RemoteSubpage>,
}

/// One sub-page of a remote response.
///
/// The sub-page numbers the server reports are not guaranteed to be
/// contiguous or to start at 1, so they are dropped here; position within
/// [`RemotePage::subpages`] becomes the sub-page index.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteSubpage {
    /// Content runs; the run with `type == "all"` carries the full text.
    #[serde(default, rename = "content")]
    pub content: Vec<RemoteContent>,
}

/// A typed run of content lines within a sub-page.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteContent {
    /// Run type; only `"all"` is used.
    #[serde(default, rename = "type")]
    pub run_type: String,
    /// Text lines of the run.
    #[serde(default, rename = "line")]
    pub lines: Vec<RemoteLine>,
}

/// A single text line.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteLine {
    /// Line text; absent lines decode as empty.
    #[serde(default, rename = "Text")]
    pub text: String,
}

impl RemoteSubpage {
    fn display_lines(&self) -> Vec<String> {
        self.content
            .iter()
            .find(|run| run.run_type == "all")
            .map(|run| run.lines.iter().map(|l| l.text.clone()).collect())
            .unwrap_or_default()
    }
}

impl From<RemotePage> for Page {
    fn from(remote: RemotePage) -> Self {
        let timestamp = remote.time.as_deref().and_then(parse_server_time);
        let number = remote.number;
        let subpages = remote
            .subpages
            .iter()
            .enumerate()
            .map(|(index, sub)| Subpage {
                location: Location::new(number, index),
                lines: sub.display_lines(),
                timestamp,
            })
            .collect();

        Self { number, subpages }
    }
}

/// Parse the service's zoneless local timestamps (`2024-05-01T18:30:00`).
///
/// The engine only compares these values for equality, so the missing offset
/// does not matter; they are pinned to UTC for a stable representation.
fn parse_server_time(value: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

fn u16_from_string<'de, D>(deserializer: D) -> std::result::Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SAMPLE: &str = r#"{
        "teletext": {
            "page": {
                "number": "100",
                "time": "2024-05-01T18:30:00",
                "subpage": [
                    {
                        "number": "1",
                        "content": [
                            {"type": "all", "line": [{"Text": "first"}, {"Text": "second"}]},
                            {"type": "structured", "line": [{"Text": "ignored"}]}
                        ]
                    },
                    {
                        "number": "3",
                        "content": [
                            {"type": "all", "line": [{"Text": "other"}]}
                        ]
                    }
                ]
            }
        }
    }"#;

    #[test]
    fn page_built_from_remote_uses_indexes_as_sub_numbers() {
        let envelope: Envelope = serde_json::from_str(SAMPLE).expect("sample should decode");
        let page = Page::from(envelope.teletext.page);

        assert_eq!(page.number, 100);
        assert_eq!(page.subpages.len(), 2);
        // Server numbering (1, 3) is discarded; positions win.
        assert_eq!(page.subpages[0].location, Location::new(100, 0));
        assert_eq!(page.subpages[1].location, Location::new(100, 1));
        assert_eq!(page.subpages[0].lines, vec!["first", "second"]);
        assert_eq!(page.subpages[1].lines, vec!["other"]);
        assert!(page.subpages[0].timestamp.is_some());
    }

    #[test]
    fn only_the_all_run_is_kept() {
        let envelope: Envelope = serde_json::from_str(SAMPLE).expect("sample should decode");
        let page = Page::from(envelope.teletext.page);
        assert!(!page.subpages[0].lines.iter().any(|l| l == "ignored"));
    }

    #[test]
    fn timestamps_without_offset_parse() {
        assert!(parse_server_time("2024-05-01T18:30:00").is_some());
        assert!(parse_server_time("not a time").is_none());
    }

    #[tokio::test]
    async fn fetch_decodes_a_page() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/teletext/pages/100.json"))
            .and(query_param("app_id", "id"))
            .and(query_param("app_key", "key"))
            .respond_with(ResponseTemplate::new(200).set_body_string(SAMPLE))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&server.uri(), "id", "key")?;
        let remote = fetcher.fetch(100, None).await?;
        assert_eq!(remote.number, 100);
        assert_eq!(remote.subpages.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn fetch_with_direction_hits_the_next_endpoint() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/teletext/pages/100/next.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(SAMPLE))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&server.uri(), "id", "key")?;
        let remote = fetcher.fetch(100, Some(Direction::Next)).await?;
        assert_eq!(remote.number, 100);
        Ok(())
    }

    #[tokio::test]
    async fn missing_page_maps_to_not_found() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/teletext/pages/899.json"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&server.uri(), "id", "key")?;
        let err = fetcher.fetch(899, None).await.expect_err("should fail");
        assert!(matches!(err, Error::NotFound { page: 899 }));
        Ok(())
    }

    #[tokio::test]
    async fn server_errors_map_to_http() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/teletext/pages/100.json"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&server.uri(), "id", "key")?;
        let err = fetcher.fetch(100, None).await.expect_err("should fail");
        assert!(matches!(err, Error::Http { status: 503 }));
        Ok(())
    }

    #[tokio::test]
    async fn garbage_body_maps_to_decode() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/teletext/pages/100.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&server.uri(), "id", "key")?;
        let err = fetcher.fetch(100, None).await.expect_err("should fail");
        assert!(matches!(err, Error::Decode(_)));
        Ok(())
    }
}
