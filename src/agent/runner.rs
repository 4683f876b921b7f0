//! Critique agent with a tool calling loop.

use super::tools::{tool_definitions, ToolContext};
use crate::error::{CriticError, Result};
use crate::gemini::{
    Content, FunctionCall, GenerateContentRequest, GenerateContentResponse, GenerativeModel, Part,
    RemoteFiles,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Agent that critiques media, optionally researching on the web first.
pub struct CritiqueAgent {
    name: String,
    model: Arc<dyn GenerativeModel>,
    files: Arc<dyn RemoteFiles>,
    tools: Option<ToolContext>,
    system_prompt: String,
    max_iterations: usize,
}

impl CritiqueAgent {
    /// Create an agent without tools.
    pub fn new(name: &str, model: Arc<dyn GenerativeModel>, files: Arc<dyn RemoteFiles>) -> Self {
        Self {
            name: name.to_string(),
            model,
            files,
            tools: None,
            system_prompt: String::new(),
            max_iterations: 8,
        }
    }

    /// Give the agent its tools.
    pub fn with_tools(mut self, tools: ToolContext) -> Self {
        self.tools = Some(tools);
        self
    }

    /// Set the system instruction.
    pub fn with_system_prompt(mut self, prompt: &str) -> Self {
        self.system_prompt = prompt.to_string();
        self
    }

    /// Set maximum iterations for the agent loop.
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max.max(1);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }

    /// Remote file storage reachable with this agent's credential.
    pub fn files(&self) -> &dyn RemoteFiles {
        self.files.as_ref()
    }

    pub fn has_tools(&self) -> bool {
        self.tools.is_some()
    }

    /// Run the agent on a task with the given media parts.
    pub async fn run(&self, task: &str, media: Vec<Part>) -> Result<AgentResponse> {
        let mut parts = media;
        parts.push(Part::text(task));
        let mut contents = vec![Content::user(parts)];

        let system_instruction =
            (!self.system_prompt.is_empty()).then(|| Content::system(&self.system_prompt));
        let tools = if self.tools.is_some() {
            tool_definitions()
        } else {
            Vec::new()
        };

        let mut iterations = 0;
        let mut tool_calls_made = Vec::new();

        loop {
            iterations += 1;
            if iterations > self.max_iterations {
                return Err(CriticError::Agent(format!(
                    "Agent exceeded maximum iterations ({})",
                    self.max_iterations
                )));
            }

            debug!("Agent iteration {}", iterations);

            let request = GenerateContentRequest {
                contents: contents.clone(),
                system_instruction: system_instruction.clone(),
                tools: tools.clone(),
            };

            let response = self.model.generate_content(&request).await?;

            let calls: Vec<FunctionCall> =
                response.function_calls().into_iter().cloned().collect();
            let Some(tool_context) = self.tools.as_ref().filter(|_| !calls.is_empty()) else {
                return Ok(self.build_response(&response, tool_calls_made, iterations));
            };

            // Echo the model turn so the function responses line up with its calls
            if let Some(content) = response.first_content() {
                contents.push(Content::model(content.parts.clone()));
            }

            let mut responses = Vec::with_capacity(calls.len());
            for call in &calls {
                let record = self.execute_tool_call(tool_context, call).await;
                responses.push(Part::function_response(
                    &record.name,
                    json!({ "name": record.name, "content": record.result }),
                ));
                tool_calls_made.push(record);
            }
            contents.push(Content::user(responses));
        }
    }

    /// Execute a single tool call and return a record of it.
    async fn execute_tool_call(&self, tools: &ToolContext, call: &FunctionCall) -> ToolCallRecord {
        let arguments = call.args.to_string();
        info!("Agent calling tool: {} with args: {}", call.name, arguments);

        let result = match tools.parse_tool_call(&call.name, &call.args) {
            Ok(tool) => match tools.execute(&tool).await {
                Ok(output) => output,
                Err(e) => format!("Tool error: {}", e),
            },
            Err(e) => format!("Failed to parse tool call: {}", e),
        };

        ToolCallRecord {
            name: call.name.clone(),
            arguments,
            result,
        }
    }

    /// Build the final agent response.
    fn build_response(
        &self,
        response: &GenerateContentResponse,
        tool_calls: Vec<ToolCallRecord>,
        iterations: usize,
    ) -> AgentResponse {
        let content = response.text();

        if content.is_none() {
            let block_reason = response
                .prompt_feedback
                .as_ref()
                .and_then(|f| f.block_reason.clone());
            let finish_reason = response
                .candidates
                .first()
                .and_then(|c| c.finish_reason.clone());
            warn!(
                "Model returned no text (block reason: {:?}, finish reason: {:?})",
                block_reason, finish_reason
            );
        }

        AgentResponse {
            content,
            tool_calls,
            iterations,
        }
    }
}

/// Response from an agent run.
#[derive(Debug)]
pub struct AgentResponse {
    /// The final text from the agent, if the model produced any.
    pub content: Option<String>,
    /// Record of all tool calls made during execution.
    pub tool_calls: Vec<ToolCallRecord>,
    /// Number of iterations (model calls) used.
    pub iterations: usize,
}

/// Record of a tool call made by the agent.
#[derive(Debug, Clone)]
pub struct ToolCallRecord {
    /// Name of the tool called.
    pub name: String,
    /// JSON arguments passed to the tool.
    pub arguments: String,
    /// Result returned by the tool.
    pub result: String,
}

impl std::fmt::Display for ToolCallRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.arguments)
    }
}
