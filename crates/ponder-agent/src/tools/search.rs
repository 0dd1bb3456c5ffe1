//! Web search tool.
//!
//! Uses Serper (Google results) when an API key is configured and falls back
//! to DuckDuckGo instant answers otherwise.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;

use crate::error::{AgentError, Result};
use crate::tool::{MAX_SEARCH_RESULTS, Tool, ToolResult, WebSearchParams};

const SERPER_URL: &str = "https://google.serper.dev/search";
const DUCKDUCKGO_URL: &str = "https://api.duckduckgo.com/";

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Web search provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "snake_case")]
pub enum SearchProvider {
    /// Serper (Google Search API).
    Serper { api_key: String },
    /// DuckDuckGo instant answers (no API key needed, but limited).
    DuckDuckGo,
}

impl SearchProvider {
    /// Serper when a key is available, DuckDuckGo otherwise.
    pub fn from_api_key(api_key: Option<String>) -> Self {
        match api_key {
            Some(api_key) if !api_key.trim().is_empty() => SearchProvider::Serper { api_key },
            _ => SearchProvider::DuckDuckGo,
        }
    }

    /// Provider name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            SearchProvider::Serper { .. } => "serper",
            SearchProvider::DuckDuckGo => "duckduckgo",
        }
    }
}

/// Configuration for web search.
#[derive(Debug, Clone)]
pub struct WebSearchConfig {
    pub provider: SearchProvider,
    /// Upper bound on results per query.
    pub max_results: usize,
    pub timeout: Duration,
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            provider: SearchProvider::DuckDuckGo,
            max_results: MAX_SEARCH_RESULTS as usize,
            timeout: Duration::from_secs(30),
        }
    }
}

/// A single search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub link: String,
    pub snippet: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Response parsing
// ─────────────────────────────────────────────────────────────────────────────

/// Extract results from a Serper response.
pub fn parse_serper(data: &Value, limit: usize) -> Vec<SearchResult> {
    data["organic"]
        .as_array()
        .map(|arr| {
            arr.iter()
                .filter_map(|r| {
                    Some(SearchResult {
                        title: r["title"].as_str()?.to_string(),
                        link: r["link"].as_str()?.to_string(),
                        snippet: r["snippet"].as_str().unwrap_or("").to_string(),
                    })
                })
                .take(limit)
                .collect()
        })
        .unwrap_or_default()
}

/// Extract results from a DuckDuckGo instant-answer response.
pub fn parse_duckduckgo(data: &Value, limit: usize) -> Vec<SearchResult> {
    let mut results = Vec::new();

    if let Some(abstract_text) = data["AbstractText"].as_str() {
        if !abstract_text.is_empty() {
            results.push(SearchResult {
                title: data["Heading"].as_str().unwrap_or("Result").to_string(),
                link: data["AbstractURL"].as_str().unwrap_or("").to_string(),
                snippet: abstract_text.to_string(),
            });
        }
    }

    if let Some(topics) = data["RelatedTopics"].as_array() {
        for topic in topics {
            if results.len() >= limit {
                break;
            }
            if let (Some(text), Some(link)) = (topic["Text"].as_str(), topic["FirstURL"].as_str()) {
                let title = match text.split_once(" - ") {
                    Some((head, _)) => head.to_string(),
                    None => text.chars().take(60).collect(),
                };
                results.push(SearchResult {
                    title,
                    link: link.to_string(),
                    snippet: text.to_string(),
                });
            }
        }
    }

    results.truncate(limit);
    results
}

/// Render results as a numbered list for the model.
pub fn format_results(results: &[SearchResult]) -> String {
    results
        .iter()
        .enumerate()
        .map(|(i, r)| {
            format!(
                "{}. **{}**\n   {}\n   link: {}",
                i + 1,
                r.title,
                r.snippet,
                r.link
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

// ─────────────────────────────────────────────────────────────────────────────
// Tool
// ─────────────────────────────────────────────────────────────────────────────

/// Tool for searching the web.
#[derive(Debug, Clone)]
pub struct WebSearchTool {
    client: Client,
    config: WebSearchConfig,
}

impl WebSearchTool {
    /// Create a search tool using DuckDuckGo.
    pub fn new() -> Self {
        Self::with_config(WebSearchConfig::default())
    }

    /// Create a search tool with custom configuration.
    pub fn with_config(config: WebSearchConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client, config }
    }

    /// Create a search tool using Serper.
    pub fn serper(api_key: impl Into<String>) -> Self {
        Self::with_config(WebSearchConfig {
            provider: SearchProvider::Serper {
                api_key: api_key.into(),
            },
            ..Default::default()
        })
    }

    pub fn config(&self) -> &WebSearchConfig {
        &self.config
    }

    async fn search_serper(
        &self,
        query: &str,
        api_key: &str,
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        let response = self
            .client
            .post(SERPER_URL)
            .header("X-API-KEY", api_key)
            .json(&json!({ "q": query, "num": limit }))
            .send()
            .await
            .map_err(|e| AgentError::tool(format!("Serper search failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AgentError::tool(format!(
                "Serper search error: {}",
                response.status()
            )));
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| AgentError::tool(format!("Failed to parse response: {}", e)))?;
        Ok(parse_serper(&data, limit))
    }

    async fn search_duckduckgo(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        let url = format!(
            "{}?q={}&format=json&no_html=1&skip_disambig=1",
            DUCKDUCKGO_URL,
            urlencoding::encode(query)
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AgentError::tool(format!("DuckDuckGo search failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AgentError::tool(format!(
                "DuckDuckGo search error: {}",
                response.status()
            )));
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| AgentError::tool(format!("Failed to parse response: {}", e)))?;
        Ok(parse_duckduckgo(&data, limit))
    }
}

impl Default for WebSearchTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web for up-to-date information. Returns the top results with titles, snippets and links."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "search_query": {
                    "type": "string",
                    "description": "Search keywords or a short phrase"
                },
                "max_results": {
                    "type": "integer",
                    "description": "Number of results to return (default 5)"
                }
            },
            "required": ["search_query"]
        })
    }

    async fn execute(&self, params: Value) -> Result<ToolResult> {
        let params = WebSearchParams::try_from(params)?;
        let limit = (params.max_results as usize).min(self.config.max_results).max(1);

        tracing::debug!(
            provider = self.config.provider.name(),
            query = %params.query,
            limit,
            "Running web search"
        );

        let results = match &self.config.provider {
            SearchProvider::Serper { api_key } => {
                self.search_serper(&params.query, api_key, limit).await
            }
            SearchProvider::DuckDuckGo => self.search_duckduckgo(&params.query, limit).await,
        };

        match results {
            Ok(results) if results.is_empty() => Ok(ToolResult::text("No results found")),
            Ok(results) => Ok(ToolResult::text(format_results(&results))),
            Err(e) => Ok(ToolResult::error(format!("Search failed: {}", e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_from_api_key() {
        assert_eq!(SearchProvider::from_api_key(None), SearchProvider::DuckDuckGo);
        assert_eq!(
            SearchProvider::from_api_key(Some("  ".to_string())),
            SearchProvider::DuckDuckGo
        );
        assert_eq!(
            SearchProvider::from_api_key(Some("k".to_string())).name(),
            "serper"
        );
    }

    #[test]
    fn test_provider_serde() {
        let provider: SearchProvider =
            serde_json::from_value(json!({"provider": "serper", "api_key": "k"})).unwrap();
        assert_eq!(
            provider,
            SearchProvider::Serper {
                api_key: "k".to_string()
            }
        );
        let provider: SearchProvider =
            serde_json::from_value(json!({"provider": "duck_duck_go"})).unwrap();
        assert_eq!(provider, SearchProvider::DuckDuckGo);
    }

    #[test]
    fn test_parse_serper() {
        let data = json!({
            "organic": [
                {"title": "One", "link": "https://a.test", "snippet": "first"},
                {"title": "No link"},
                {"title": "Two", "link": "https://b.test"},
                {"title": "Three", "link": "https://c.test", "snippet": "third"}
            ]
        });
        let results = parse_serper(&data, 2);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "One");
        assert_eq!(results[1].title, "Two");
        assert_eq!(results[1].snippet, "");
        assert!(parse_serper(&json!({}), 5).is_empty());
    }

    #[test]
    fn test_parse_duckduckgo() {
        let data = json!({
            "Heading": "Rust",
            "AbstractText": "A systems language.",
            "AbstractURL": "https://rust-lang.org",
            "RelatedTopics": [
                {"Text": "Cargo - the package manager", "FirstURL": "https://doc.rust-lang.org/cargo"},
                {"Name": "group without text"},
                {"Text": "Crates", "FirstURL": "https://crates.io"}
            ]
        });
        let results = parse_duckduckgo(&data, 5);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].title, "Rust");
        assert_eq!(results[1].title, "Cargo");
        assert_eq!(results[2].title, "Crates");

        assert_eq!(parse_duckduckgo(&data, 1).len(), 1);
    }

    #[test]
    fn test_format_results() {
        let results = vec![
            SearchResult {
                title: "One".to_string(),
                link: "https://a.test".to_string(),
                snippet: "first".to_string(),
            },
            SearchResult {
                title: "Two".to_string(),
                link: "https://b.test".to_string(),
                snippet: "second".to_string(),
            },
        ];
        assert_eq!(
            format_results(&results),
            "1. **One**\n   first\n   link: https://a.test\n\n2. **Two**\n   second\n   link: https://b.test"
        );
    }

    #[test]
    fn test_schema_names_search_query() {
        let tool = WebSearchTool::new();
        assert_eq!(tool.name(), "web_search");
        assert_eq!(tool.parameters()["required"], json!(["search_query"]));
    }
}
