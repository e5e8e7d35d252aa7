//! Web search tool backed by DuckDuckGo's HTML endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::Tool;
use crate::config::SearchConfig;

/// Search the web (DuckDuckGo HTML, no API key needed).
pub struct WebSearch {
    config: SearchConfig,
    client: reqwest::Client,
}

impl WebSearch {
    pub fn new(config: SearchConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("Mozilla/5.0 (compatible; SearchAgent/1.0)")
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl Tool for WebSearch {
    fn name(&self) -> &str {
        "duckduckgo_search"
    }

    fn description(&self) -> &str {
        "A wrapper around DuckDuckGo Search. Useful for when you need to answer questions about current events. Input should be a search query."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "search query to look up"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<String> {
        let query = args["query"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Missing 'query' argument"))?;

        tracing::info!("Searching for: {}", query);

        let separator = if self.config.url.contains('?') { '&' } else { '?' };
        let url = format!(
            "{}{}q={}",
            self.config.url,
            separator,
            urlencoding::encode(query)
        );

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow::anyhow!("Search request failed: HTTP {}", status));
        }
        let html = response.text().await?;

        let results = extract_ddg_results(&html, self.config.max_results);

        if results.is_empty() {
            Ok(format!("No results found for: {}", query))
        } else {
            Ok(results.join("\n\n"))
        }
    }
}

/// Extract up to `limit` search results from DuckDuckGo HTML.
fn extract_ddg_results(html: &str, limit: usize) -> Vec<String> {
    html.split("result__body\"")
        .skip(1)
        .filter_map(|chunk| {
            let title = inner_text_after(chunk, "class=\"result__a\"")?;
            if title.is_empty() {
                return None;
            }
            let snippet = inner_text_after(chunk, "class=\"result__snippet\"").unwrap_or_default();
            let url = inner_text_after(chunk, "class=\"result__url\"").unwrap_or_default();
            Some(format!(
                "**{}**\n{}\nURL: {}",
                html_decode(&title),
                html_decode(&snippet),
                url
            ))
        })
        .take(limit)
        .collect()
}

/// Text of the element whose opening tag contains `marker`, with nested tags
/// (e.g. `<b>` highlights) stripped. Void elements such as `<br>` do not open
/// a level, and tags other than inline formatting separate words.
fn inner_text_after(chunk: &str, marker: &str) -> Option<String> {
    let rest = chunk.split(marker).nth(1)?;
    let mut body = &rest[rest.find('>')? + 1..];
    let mut text = String::new();
    let mut depth = 0usize;

    loop {
        let Some(open) = body.find('<') else {
            text.push_str(body);
            break;
        };
        text.push_str(&body[..open]);
        let Some(len) = body[open..].find('>') else {
            break;
        };
        let tag = &body[open + 1..open + len];
        body = &body[open + len + 1..];

        let name = tag_name(tag);
        if !INLINE_ELEMENTS.contains(&name.as_str()) {
            text.push(' ');
        }
        if tag.starts_with('/') {
            if depth == 0 {
                break;
            }
            depth -= 1;
        } else if !tag.ends_with('/') && !VOID_ELEMENTS.contains(&name.as_str()) {
            depth += 1;
        }
    }

    Some(text.split_whitespace().collect::<Vec<_>>().join(" "))
}

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

const INLINE_ELEMENTS: &[&str] = &["a", "b", "em", "i", "span", "strong", "u"];

/// Lowercased element name of a tag body such as `br /` or `/b`.
fn tag_name(tag: &str) -> String {
    tag.trim_start_matches('/')
        .split(|c: char| c.is_whitespace() || c == '/')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase()
}

/// Basic HTML entity decoding.
fn html_decode(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}
