//! Wikipedia tools: search titles and load plain-text articles.
//!
//! Both tools share one `WikipediaApi` handle (HTTP client + MediaWiki
//! endpoint). Response parsing is kept in free functions so it can be tested
//! without network access.

use async_trait::async_trait;
use rookery_core::error::ToolError;
use rookery_core::tool::Tool;
use scraper::Html;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Articles longer than this are cut before being handed to the model.
const MAX_PAGE_CHARS: usize = 20_000;
const SEARCH_LIMIT: u64 = 5;

/// Shared MediaWiki API handle.
pub struct WikipediaApi {
    api_url: String,
    client: reqwest::Client,
}

impl WikipediaApi {
    pub fn new(api_url: impl Into<String>) -> Result<Self, ToolError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("rookery/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "wikipedia".into(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            api_url: api_url.into(),
            client,
        })
    }

    async fn query(&self, tool_name: &str, params: &[(&str, &str)]) -> Result<serde_json::Value, ToolError> {
        let failed = |reason: String| ToolError::ExecutionFailed {
            tool_name: tool_name.to_string(),
            reason,
        };

        let response = self
            .client
            .get(&self.api_url)
            .query(params)
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(failed(format!("HTTP {}", response.status().as_u16())));
        }

        response.json().await.map_err(|e| failed(e.to_string()))
    }
}

pub struct SearchWikipediaTool {
    api: Arc<WikipediaApi>,
}

impl SearchWikipediaTool {
    pub fn new(api: Arc<WikipediaApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Tool for SearchWikipediaTool {
    fn name(&self) -> &str {
        "search_wikipedia"
    }

    fn description(&self) -> &str {
        "Search Wikipedia. Returns up to five article titles with short snippets."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<String, ToolError> {
        let query = arguments["query"]
            .as_str()
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'query' argument".into()))?;

        debug!(query, "Searching Wikipedia");
        let limit = SEARCH_LIMIT.to_string();
        let body = self
            .api
            .query(
                self.name(),
                &[
                    ("action", "query"),
                    ("list", "search"),
                    ("srsearch", query),
                    ("srlimit", &limit),
                    ("format", "json"),
                ],
            )
            .await?;

        Ok(format_search_results(&body))
    }
}

pub struct LoadWikipediaPageTool {
    api: Arc<WikipediaApi>,
}

impl LoadWikipediaPageTool {
    pub fn new(api: Arc<WikipediaApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Tool for LoadWikipediaPageTool {
    fn name(&self) -> &str {
        "load_wikipedia_page"
    }

    fn description(&self) -> &str {
        "Load the plain-text content of a Wikipedia article by its exact title."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "title": {
                    "type": "string",
                    "description": "The article title, as returned by search_wikipedia"
                }
            },
            "required": ["title"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<String, ToolError> {
        let title = arguments["title"]
            .as_str()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'title' argument".into()))?;

        debug!(title, "Loading Wikipedia page");
        let body = self
            .api
            .query(
                self.name(),
                &[
                    ("action", "query"),
                    ("prop", "extracts"),
                    ("explaintext", "1"),
                    ("redirects", "1"),
                    ("titles", title),
                    ("format", "json"),
                    ("formatversion", "2"),
                ],
            )
            .await?;

        extract_page_text(&body).ok_or_else(|| ToolError::ExecutionFailed {
            tool_name: self.name().to_string(),
            reason: format!("no article titled '{title}'"),
        })
    }
}

/// Render `list=search` results as one line per hit.
fn format_search_results(body: &serde_json::Value) -> String {
    let hits = body["query"]["search"].as_array().map(Vec::as_slice).unwrap_or_default();
    if hits.is_empty() {
        return "No results found.".into();
    }

    hits.iter()
        .filter_map(|hit| {
            let title = hit["title"].as_str()?;
            let snippet = strip_tags(hit["snippet"].as_str().unwrap_or_default());
            Some(format!("- {title}: {snippet}"))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Pull the article text out of a `prop=extracts` (formatversion 2) response.
fn extract_page_text(body: &serde_json::Value) -> Option<String> {
    let page = body["query"]["pages"].get(0)?;
    if page["missing"].as_bool().unwrap_or(false) {
        return None;
    }
    let text = page["extract"].as_str()?;
    let title = page["title"].as_str().unwrap_or_default();

    let mut out = format!("# {title}\n\n");
    match text.char_indices().nth(MAX_PAGE_CHARS) {
        Some((cut, _)) => {
            out.push_str(&text[..cut]);
            out.push_str("\n\n[truncated]");
        }
        None => out.push_str(text),
    }
    Some(out)
}

/// Search snippets carry `<span class="searchmatch">` highlighting.
fn strip_tags(html: &str) -> String {
    Html::parse_fragment(html)
        .root_element()
        .text()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_search_hits() {
        let body = serde_json::json!({
            "query": { "search": [
                { "title": "Rust (programming language)", "snippet": "<span class=\"searchmatch\">Rust</span> is a language" },
                { "title": "Rust", "snippet": "iron oxide" }
            ]}
        });
        let out = format_search_results(&body);
        assert_eq!(
            out,
            "- Rust (programming language): Rust is a language\n- Rust: iron oxide"
        );
    }

    #[test]
    fn snippet_entities_are_decoded() {
        assert_eq!(
            strip_tags("O&#039;Brien wrote &lt;1984&gt; in &quot;London&quot; &amp; Paris"),
            "O'Brien wrote <1984> in \"London\" & Paris"
        );
        assert_eq!(
            strip_tags("<span class=\"searchmatch\">Orwell</span>&nbsp;essays"),
            "Orwell\u{a0}essays"
        );
    }

    #[test]
    fn empty_search_says_so() {
        let body = serde_json::json!({ "query": { "search": [] } });
        assert_eq!(format_search_results(&body), "No results found.");
    }

    #[test]
    fn extracts_page_text() {
        let body = serde_json::json!({
            "query": { "pages": [ { "title": "Paris", "extract": "Paris is the capital of France." } ] }
        });
        let text = extract_page_text(&body).unwrap();
        assert!(text.starts_with("# Paris"));
        assert!(text.contains("capital of France"));
    }

    #[test]
    fn missing_page_is_none() {
        let body = serde_json::json!({
            "query": { "pages": [ { "title": "Nowhere", "missing": true } ] }
        });
        assert!(extract_page_text(&body).is_none());
    }

    #[test]
    fn long_page_is_truncated() {
        let long = "a".repeat(MAX_PAGE_CHARS + 100);
        let body = serde_json::json!({
            "query": { "pages": [ { "title": "Long", "extract": long } ] }
        });
        let text = extract_page_text(&body).unwrap();
        assert!(text.ends_with("[truncated]"));
    }

    #[tokio::test]
    async fn search_requires_query() {
        let api = Arc::new(WikipediaApi::new("http://127.0.0.1:9").unwrap());
        let err = SearchWikipediaTool::new(api)
            .execute(serde_json::json!({ "query": "  " }))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
