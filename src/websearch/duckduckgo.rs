//! DuckDuckGo search backends.
//!
//! Three keyless endpoints are supported: the HTML results page, the "lite"
//! results page and the Instant Answer JSON API. The HTML pages are parsed
//! with `scraper`; result links go through a `/l/?uddg=` redirect that is
//! decoded back to the target URL.

use super::clean::clean_text;
use super::WebSearchResult;
use crate::error::{Result, YoutubotError};
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use url::Url;

const HTML_ENDPOINT: &str = "https://html.duckduckgo.com/html/";
const LITE_ENDPOINT: &str = "https://lite.duckduckgo.com/lite/";
const INSTANT_ANSWER_ENDPOINT: &str = "https://api.duckduckgo.com/";

/// Region and safe-search options shared by the scraped endpoints.
#[derive(Debug, Clone)]
pub struct QueryOptions {
    pub region: String,
    pub safesearch: String,
    pub max_results: usize,
}

impl QueryOptions {
    /// DuckDuckGo's `kp` parameter for the configured safe-search level.
    fn kp(&self) -> &'static str {
        match self.safesearch.to_lowercase().as_str() {
            "on" | "strict" => "1",
            "off" => "-2",
            _ => "-1",
        }
    }
}

fn build_url(endpoint: &str, params: &[(&str, &str)]) -> Result<Url> {
    Url::parse_with_params(endpoint, params)
        .map_err(|e| YoutubotError::WebSearch(format!("Invalid search URL: {}", e)))
}

async fn get_text(client: &reqwest::Client, url: Url) -> Result<String> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(YoutubotError::WebSearch(format!("Search endpoint returned {}", status)));
    }
    Ok(response.text().await?)
}

/// Query the HTML results page.
pub async fn search_html(client: &reqwest::Client, query: &str, opts: &QueryOptions) -> Result<Vec<WebSearchResult>> {
    let url = build_url(HTML_ENDPOINT, &[("q", query), ("kl", opts.region.as_str()), ("kp", opts.kp())])?;
    let body = get_text(client, url).await?;
    Ok(parse_html_results(&body, opts.max_results))
}

/// Query the lite results page.
pub async fn search_lite(client: &reqwest::Client, query: &str, opts: &QueryOptions) -> Result<Vec<WebSearchResult>> {
    let url = build_url(LITE_ENDPOINT, &[("q", query), ("kl", opts.region.as_str()), ("kp", opts.kp())])?;
    let body = get_text(client, url).await?;
    Ok(parse_lite_results(&body, opts.max_results))
}

/// Query the Instant Answer API.
pub async fn search_instant_answer(client: &reqwest::Client, query: &str) -> Result<Vec<WebSearchResult>> {
    let url = build_url(
        INSTANT_ANSWER_ENDPOINT,
        &[("q", query), ("format", "json"), ("no_html", "1"), ("skip_disambig", "1")],
    )?;
    let body = get_text(client, url).await?;
    parse_instant_answer(&body, query).map(|r| r.into_iter().collect())
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid result selector")
}

/// Text content of an element with entities decoded, cleaned.
fn element_text(element: ElementRef<'_>) -> String {
    clean_text(&element.text().collect::<String>())
}

/// Turn a result link into the target URL.
///
/// Returns `None` for sponsored links and anything that does not resolve to
/// an http(s) URL.
pub fn decode_result_link(href: &str) -> Option<String> {
    let href = href.trim();
    let absolute = if href.starts_with("//") {
        format!("https:{}", href)
    } else if href.starts_with('/') {
        format!("https://duckduckgo.com{}", href)
    } else {
        href.to_string()
    };

    let url = Url::parse(&absolute).ok()?;

    let is_ddg = url
        .host_str()
        .map(|h| h == "duckduckgo.com" || h.ends_with(".duckduckgo.com"))
        .unwrap_or(false);

    if is_ddg {
        if url.path().starts_with("/y.js") {
            return None;
        }
        if url.path().starts_with("/l/") {
            let target = url.query_pairs().find(|(k, _)| k == "uddg")?.1.into_owned();
            return Url::parse(&target)
                .ok()
                .filter(|u| matches!(u.scheme(), "http" | "https"))
                .map(|u| u.to_string());
        }
        return None;
    }

    matches!(url.scheme(), "http" | "https").then(|| url.to_string())
}

/// One result as found on a page, before link decoding.
struct RawResult {
    href: String,
    title: String,
    snippet: Option<String>,
}

impl RawResult {
    fn from_link(link: ElementRef<'_>) -> Option<Self> {
        Some(Self {
            href: link.value().attr("href")?.to_string(),
            title: element_text(link),
            snippet: None,
        })
    }

    /// Resolve the link; a result without a snippet is described by its title.
    fn into_result(self) -> Option<WebSearchResult> {
        let url = decode_result_link(&self.href)?;
        if self.title.is_empty() {
            return None;
        }
        let snippet = self
            .snippet
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| self.title.clone());
        Some(WebSearchResult {
            title: self.title,
            url,
            snippet,
        })
    }
}

fn finish(raw: Vec<RawResult>, max_results: usize) -> Vec<WebSearchResult> {
    raw.into_iter()
        .filter_map(RawResult::into_result)
        .take(max_results)
        .collect()
}

/// Parse results from the HTML endpoint.
///
/// Every `.result` block carries its own title link and snippet.
pub fn parse_html_results(body: &str, max_results: usize) -> Vec<WebSearchResult> {
    let document = Html::parse_document(body);
    let result_selector = selector("div.result");
    let link_selector = selector("a.result__a");
    let snippet_selector = selector(".result__snippet");

    let raw = document
        .select(&result_selector)
        .filter_map(|block| {
            let mut result = RawResult::from_link(block.select(&link_selector).next()?)?;
            result.snippet = block.select(&snippet_selector).next().map(element_text);
            Some(result)
        })
        .collect();

    finish(raw, max_results)
}

/// Parse results from the lite endpoint.
///
/// The lite page is a table: a row with the result link, followed by a row
/// with its snippet. A snippet row belongs to the closest link row above it.
pub fn parse_lite_results(body: &str, max_results: usize) -> Vec<WebSearchResult> {
    let document = Html::parse_document(body);
    let row_selector = selector("tr");
    let link_selector = selector("a.result-link");
    let snippet_selector = selector("td.result-snippet");

    let mut raw: Vec<RawResult> = Vec::new();
    for row in document.select(&row_selector) {
        if let Some(link) = row.select(&link_selector).next() {
            if let Some(result) = RawResult::from_link(link) {
                raw.push(result);
            }
        } else if let Some(snippet) = row.select(&snippet_selector).next() {
            if let Some(last) = raw.last_mut().filter(|r| r.snippet.is_none()) {
                last.snippet = Some(element_text(snippet));
            }
        }
    }

    finish(raw, max_results)
}

#[derive(Debug, Deserialize)]
struct InstantAnswer {
    #[serde(rename = "Heading", default)]
    heading: String,
    #[serde(rename = "AbstractText", default)]
    abstract_text: String,
    #[serde(rename = "AbstractURL", default)]
    abstract_url: String,
    #[serde(rename = "RelatedTopics", default)]
    related_topics: Vec<RelatedTopic>,
}

/// Related topics are either plain entries or named groups of entries.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RelatedTopic {
    Entry {
        #[serde(rename = "Text")]
        text: String,
        #[serde(rename = "FirstURL")]
        first_url: String,
    },
    Group {
        #[serde(rename = "Topics", default)]
        topics: Vec<RelatedTopic>,
    },
}

/// Parse an Instant Answer response into at most one result.
pub fn parse_instant_answer(body: &str, query: &str) -> Result<Option<WebSearchResult>> {
    let answer: InstantAnswer = serde_json::from_str(body)?;

    if !answer.abstract_text.is_empty() && !answer.abstract_url.is_empty() {
        let title = if answer.heading.is_empty() {
            query.to_string()
        } else {
            answer.heading.clone()
        };
        return Ok(Some(WebSearchResult {
            title,
            url: answer.abstract_url,
            snippet: clean_text(&answer.abstract_text),
        }));
    }

    // Only the first related topic is considered.
    if let Some(RelatedTopic::Entry { text, first_url }) = answer.related_topics.first() {
        if !text.is_empty() && !first_url.is_empty() {
            return Ok(Some(WebSearchResult {
                title: text.chars().take(100).collect(),
                url: first_url.clone(),
                snippet: clean_text(text),
            }));
        }
    }

    Ok(None)
}
