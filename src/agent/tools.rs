//! Tool definitions and implementations for the critique agent.

use crate::error::{CriticError, Result};
use crate::gemini::{FunctionDeclaration, Tool};
use crate::search::WebSearch;
use serde_json::Value;
use std::sync::Arc;

/// Hard cap on results per search, whatever the model asks for.
const MAX_RESULTS_CAP: usize = 10;

/// Tools available to the agent.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    /// Search the web for references that support the critique.
    WebSearch { query: String, max_results: usize },
}

/// Tool execution context.
pub struct ToolContext {
    pub search: Arc<dyn WebSearch>,
    /// Results returned when the model does not ask for a specific count.
    pub default_max_results: usize,
}

impl ToolContext {
    pub fn new(search: Arc<dyn WebSearch>, default_max_results: usize) -> Self {
        Self {
            search,
            default_max_results,
        }
    }

    /// Execute a tool call and return the result as a string.
    pub async fn execute(&self, tool: &ToolCall) -> Result<String> {
        match tool {
            ToolCall::WebSearch { query, max_results } => {
                self.execute_web_search(query, *max_results).await
            }
        }
    }

    async fn execute_web_search(&self, query: &str, max_results: usize) -> Result<String> {
        let limit = max_results.clamp(1, MAX_RESULTS_CAP);
        let hits = self.search.search(query, limit).await?;

        if hits.is_empty() {
            return Ok(format!("No web results found for \"{}\".", query));
        }

        let formatted = hits
            .iter()
            .enumerate()
            .map(|(i, hit)| {
                format!(
                    "{}. {}\n   {}\n   {}",
                    i + 1,
                    hit.title,
                    hit.url,
                    hit.snippet.chars().take(400).collect::<String>()
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        Ok(format!("Found {} results:\n\n{}", hits.len(), formatted))
    }

    /// Parse a function call from the model response.
    pub fn parse_tool_call(&self, name: &str, args: &Value) -> Result<ToolCall> {
        parse_tool_call(name, args, self.default_max_results)
    }
}

/// Gemini function declarations for the agent's tools.
pub fn tool_definitions() -> Vec<Tool> {
    vec![Tool {
        function_declarations: vec![FunctionDeclaration {
            name: "web_search".to_string(),
            description: "Search the web for information that improves the critique: \
                artists, art movements, cinematographic techniques, genre conventions \
                or current trends. Returns titles, URLs and snippets."
                .to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The search query"
                    },
                    "max_results": {
                        "type": "integer",
                        "description": "Maximum number of results (default: 5)"
                    }
                },
                "required": ["query"]
            }),
        }],
    }]
}

/// Parse a tool call from the Gemini function call format.
pub fn parse_tool_call(name: &str, args: &Value, default_max_results: usize) -> Result<ToolCall> {
    match name {
        "web_search" => {
            let query = args["query"]
                .as_str()
                .filter(|q| !q.trim().is_empty())
                .ok_or_else(|| CriticError::Agent("Missing 'query' argument".to_string()))?
                .to_string();
            let max_results = args["max_results"]
                .as_u64()
                .map(|n| n as usize)
                .unwrap_or(default_max_results);
            Ok(ToolCall::WebSearch { query, max_results })
        }
        _ => Err(CriticError::Agent(format!("Unknown tool: {}", name))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::SearchHit;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    struct StubSearch {
        hits: Vec<SearchHit>,
        limits: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl WebSearch for StubSearch {
        async fn search(&self, _query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
            self.limits.lock().unwrap().push(max_results);
            Ok(self.hits.iter().take(max_results).cloned().collect())
        }
    }

    fn stub(hits: Vec<SearchHit>) -> Arc<StubSearch> {
        Arc::new(StubSearch {
            hits,
            limits: Mutex::new(Vec::new()),
        })
    }

    #[test]
    fn test_parse_web_search_tool() {
        let tool = parse_tool_call(
            "web_search",
            &json!({"query": "film noir lighting", "max_results": 3}),
            5,
        )
        .unwrap();
        assert_eq!(
            tool,
            ToolCall::WebSearch {
                query: "film noir lighting".to_string(),
                max_results: 3
            }
        );
    }

    #[test]
    fn test_parse_uses_default_limit() {
        let tool = parse_tool_call("web_search", &json!({"query": "bokeh"}), 7).unwrap();
        assert_eq!(
            tool,
            ToolCall::WebSearch {
                query: "bokeh".to_string(),
                max_results: 7
            }
        );
    }

    #[test]
    fn test_parse_rejects_bad_calls() {
        assert!(parse_tool_call("web_search", &json!({}), 5).is_err());
        assert!(parse_tool_call("web_search", &json!({"query": "  "}), 5).is_err());
        assert!(parse_tool_call("delete_everything", &json!({}), 5).is_err());
    }

    #[test]
    fn test_tool_definitions() {
        let tools = tool_definitions();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].function_declarations[0].name, "web_search");
        let value = serde_json::to_value(&tools[0]).unwrap();
        assert!(value.get("functionDeclarations").is_some());
    }

    #[tokio::test]
    async fn test_execute_formats_hits_and_caps_limit() {
        let search = stub(vec![SearchHit {
            title: "Golden hour".to_string(),
            url: "https://example.com/golden".to_string(),
            snippet: "Soft, warm light shortly after sunrise.".to_string(),
        }]);
        let context = ToolContext::new(search.clone(), 5);

        let output = context
            .execute(&ToolCall::WebSearch {
                query: "golden hour".to_string(),
                max_results: 500,
            })
            .await
            .unwrap();

        assert!(output.starts_with("Found 1 results:"));
        assert!(output.contains("https://example.com/golden"));
        assert_eq!(*search.limits.lock().unwrap(), vec![MAX_RESULTS_CAP]);
    }

    #[tokio::test]
    async fn test_execute_without_hits() {
        let context = ToolContext::new(stub(Vec::new()), 5);
        let output = context
            .execute(&ToolCall::WebSearch {
                query: "nothing".to_string(),
                max_results: 5,
            })
            .await
            .unwrap();
        assert_eq!(output, "No web results found for \"nothing\".");
    }
}
