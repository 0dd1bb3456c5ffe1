//! The ReAct loop.

use serde::{Deserialize, Serialize};

use ponder_llm::{ChatMessage, ChatRequest, SharedChatBackend};

use crate::error::{AgentError, Result};
use crate::parse::{ActionInput, ReactParser, ReactStep};
use crate::prompt::system_prompt;
use crate::tool::ToolRegistry;

/// Default chat model (served by SiliconFlow).
pub const DEFAULT_AGENT_MODEL: &str = "Qwen/Qwen3-30B-A3B-Instruct-2507";

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration for the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Model identifier to use.
    pub model: String,
    /// Maximum model calls per query.
    pub max_iterations: u32,
    /// Temperature for sampling.
    pub temperature: f32,
    /// Maximum tokens per model response.
    pub max_tokens: u32,
}

impl AgentConfig {
    /// Create a config for `model` with default sampling.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            max_iterations: 3,
            temperature: 0.6,
            max_tokens: 2000,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self::new(DEFAULT_AGENT_MODEL)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Response
// ─────────────────────────────────────────────────────────────────────────────

/// One tool call made while answering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentStep {
    pub thought: Option<String>,
    pub action: String,
    pub input: String,
    pub observation: String,
}

/// Result of running the agent on one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResponse {
    /// The answer text.
    pub answer: String,
    /// Tool calls in order.
    pub steps: Vec<AgentStep>,
    /// Number of model calls made.
    pub iterations: u32,
    /// True when the iteration limit was hit before a final answer.
    pub truncated: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Agent
// ─────────────────────────────────────────────────────────────────────────────

/// Reason/act agent over a chat backend and a tool registry.
pub struct ReactAgent {
    backend: SharedChatBackend,
    tools: ToolRegistry,
    parser: ReactParser,
    config: AgentConfig,
    system_prompt: String,
}

impl ReactAgent {
    /// Create an agent. The system prompt is built once, here.
    pub fn new(backend: SharedChatBackend, tools: ToolRegistry, config: AgentConfig) -> Result<Self> {
        if config.max_iterations == 0 {
            return Err(AgentError::Config(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        let system_prompt = system_prompt(&tools);
        Ok(Self {
            backend,
            tools,
            parser: ReactParser::new()?,
            config,
            system_prompt,
        })
    }

    /// Replace the generated system prompt.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Answer `query`, calling tools as the model asks for them.
    ///
    /// Unknown tools and tool failures are fed back as observations. Model
    /// errors end the run.
    pub async fn run(&self, query: &str) -> Result<AgentResponse> {
        let mut history: Vec<ChatMessage> = Vec::new();
        let mut current = format!("Question: {}", query);
        let mut steps = Vec::new();
        let mut last_response = String::new();

        tracing::info!(
            backend = self.backend.name(),
            model = %self.config.model,
            max_iterations = self.config.max_iterations,
            "Agent started"
        );

        for iteration in 1..=self.config.max_iterations {
            let mut messages = Vec::with_capacity(history.len() + 2);
            messages.push(ChatMessage::system(self.system_prompt.as_str()));
            messages.extend(history.iter().cloned());
            messages.push(ChatMessage::user(current.as_str()));

            let request = ChatRequest::new(self.config.model.as_str(), messages)
                .with_temperature(self.config.temperature)
                .with_max_tokens(self.config.max_tokens);

            tracing::debug!(iteration, messages = request.messages.len(), "Calling model");
            let response = self.backend.chat(request).await?;
            let text = response.content;

            match self.parser.parse(&text) {
                ReactStep::Finish { answer, .. } => {
                    tracing::info!(iteration, steps = steps.len(), "Agent finished");
                    return Ok(AgentResponse {
                        answer,
                        steps,
                        iterations: iteration,
                        truncated: false,
                    });
                }
                ReactStep::Action {
                    thought,
                    action,
                    input,
                } => {
                    let input_display = input.to_display();
                    tracing::info!(iteration, action = %action, input = %input_display, "Executing action");

                    let observation = self.observe(&action, input).await;
                    tracing::debug!(iteration, observation_len = observation.len(), "Observation");

                    history.push(ChatMessage::user(current.as_str()));
                    history.push(ChatMessage::assistant(text.as_str()));
                    current = format!("{}\nObservation: {}\n", text, observation);

                    steps.push(AgentStep {
                        thought,
                        action,
                        input: input_display,
                        observation,
                    });
                }
            }
            last_response = text;
        }

        tracing::warn!(
            iterations = self.config.max_iterations,
            "Max iterations reached without a final answer"
        );
        Ok(AgentResponse {
            answer: self.parser.format_answer(&last_response),
            steps,
            iterations: self.config.max_iterations,
            truncated: true,
        })
    }

    /// Run one action and render what happened as observation text.
    async fn observe(&self, action: &str, input: ActionInput) -> String {
        let Some(tool) = self.tools.get(action) else {
            return format!(
                "Unknown action '{}'. Available tools: [{}]",
                action,
                self.tools.names().join(", ")
            );
        };

        let arguments = input.into_arguments(&tool.parameters());
        match self.tools.execute(action, arguments).await {
            Ok(result) => result.to_observation(),
            Err(e) => {
                tracing::warn!(action, error = %e, "Tool call failed");
                format!("Error: {}", e)
            }
        }
    }
}

impl std::fmt::Debug for ReactAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReactAgent")
            .field("backend", &self.backend.name())
            .field("tools", &self.tools)
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::{MockTool, ToolResult};
    use crate::tools::CalculatorTool;
    use ponder_llm::{MockChatBackend, Role};
    use serde_json::json;
    use std::sync::Arc;

    fn agent_with(backend: Arc<MockChatBackend>, tools: ToolRegistry) -> ReactAgent {
        ReactAgent::new(backend, tools, AgentConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_immediate_final_answer() {
        let backend = Arc::new(MockChatBackend::new([
            "Thought: easy.\nFinal Answer: Paris",
        ]));
        let agent = agent_with(backend.clone(), ToolRegistry::new());

        let response = agent.run("Capital of France?").await.unwrap();
        assert_eq!(response.answer, "Paris");
        assert_eq!(response.iterations, 1);
        assert!(response.steps.is_empty());
        assert!(!response.truncated);

        let requests = backend.requests();
        let request = &requests[0];
        assert_eq!(request.model, DEFAULT_AGENT_MODEL);
        assert_eq!(request.temperature, 0.6);
        assert_eq!(request.max_tokens, 2000);
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, Role::System);
        assert_eq!(request.messages[0].content, agent.system_prompt());
        assert_eq!(request.messages[1], ChatMessage::user("Question: Capital of France?"));
    }

    #[tokio::test]
    async fn test_tool_observation_feeds_next_call() {
        let first = "Thought: need echo\nAction: echo\nAction Input: hello";
        let backend = Arc::new(MockChatBackend::new([first, "Final Answer: pong it is"]));
        let tool = Arc::new(MockTool::new("echo").with_response(ToolResult::text("pong")));
        let mut tools = ToolRegistry::new();
        tools.register_arc(tool.clone());
        let agent = agent_with(backend.clone(), tools);

        let response = agent.run("q").await.unwrap();
        assert_eq!(response.answer, "pong it is");
        assert_eq!(response.iterations, 2);
        assert_eq!(
            response.steps,
            vec![AgentStep {
                thought: Some("need echo".to_string()),
                action: "echo".to_string(),
                input: "hello".to_string(),
                observation: "pong".to_string(),
            }]
        );
        assert_eq!(tool.calls(), vec![json!({"text": "hello"})]);

        let requests = backend.requests();
        let messages = &requests[1].messages;
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1], ChatMessage::user("Question: q"));
        assert_eq!(messages[2], ChatMessage::assistant(first));
        assert_eq!(
            messages[3],
            ChatMessage::user(format!("{}\nObservation: pong\n", first))
        );
        // Only one system message, ever.
        assert_eq!(
            messages.iter().filter(|m| m.role == Role::System).count(),
            1
        );
    }

    #[tokio::test]
    async fn test_unknown_tool_becomes_observation() {
        let backend = Arc::new(MockChatBackend::new([
            "Action: teleport\nAction Input: {\"to\": \"Mars\"}",
            "Final Answer: cannot",
        ]));
        let mut tools = ToolRegistry::new();
        tools.register(CalculatorTool::new());
        let agent = agent_with(backend.clone(), tools);

        let response = agent.run("q").await.unwrap();
        assert_eq!(response.answer, "cannot");
        assert_eq!(
            response.steps[0].observation,
            "Unknown action 'teleport'. Available tools: [calculate]"
        );
        assert!(backend.requests()[1].messages[3]
            .content
            .ends_with("Observation: Unknown action 'teleport'. Available tools: [calculate]\n"));
    }

    #[tokio::test]
    async fn test_calculator_round_trip_through_agent() {
        let backend = Arc::new(MockChatBackend::new([
            "Thought: multiply\nAction: calculate\nAction Input: {\"expression\": \"15*3\"}",
            "Final Answer: 45",
        ]));
        let mut tools = ToolRegistry::new();
        tools.register(CalculatorTool::new());
        let agent = agent_with(backend, tools);

        let response = agent.run("What is 15*3?").await.unwrap();
        assert_eq!(response.steps[0].observation, "15*3 = 45");
        assert_eq!(response.answer, "45");
    }

    #[tokio::test]
    async fn test_invalid_arguments_become_observation() {
        let backend = Arc::new(MockChatBackend::new([
            "Action: calculate\nAction Input: {\"expression\": 42}",
            "Final Answer: oops",
        ]));
        let mut tools = ToolRegistry::new();
        tools.register(CalculatorTool::new());
        let agent = agent_with(backend, tools);

        let response = agent.run("q").await.unwrap();
        assert!(response.steps[0].observation.starts_with("Error: "));
        assert!(response.steps[0].observation.contains("expression"));
        assert!(!response.truncated);
    }

    #[tokio::test]
    async fn test_max_iterations_truncates() {
        let looping = "Thought: again\nAction: echo\nAction Input: x";
        let backend = Arc::new(MockChatBackend::new([looping, looping, looping, "unused"]));
        let mut tools = ToolRegistry::new();
        tools.register(MockTool::new("echo"));
        let agent = agent_with(backend.clone(), tools);

        let response = agent.run("q").await.unwrap();
        assert!(response.truncated);
        assert_eq!(response.iterations, 3);
        assert_eq!(response.steps.len(), 3);
        assert_eq!(response.answer, looping);
        assert_eq!(backend.request_count(), 3);
    }

    #[tokio::test]
    async fn test_backend_error_propagates() {
        let backend = Arc::new(MockChatBackend::new(Vec::<String>::new()));
        let agent = agent_with(backend, ToolRegistry::new());
        let err = agent.run("q").await.unwrap_err();
        assert!(matches!(err, AgentError::Llm(_)));
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let backend = Arc::new(MockChatBackend::new(Vec::<String>::new()));
        let err = ReactAgent::new(
            backend,
            ToolRegistry::new(),
            AgentConfig::default().with_max_iterations(0),
        )
        .unwrap_err();
        assert!(matches!(err, AgentError::Config(_)));
    }

    #[test]
    fn test_config_defaults() {
        let config = AgentConfig::default();
        assert_eq!(config.max_iterations, 3);
        assert_eq!(config.temperature, 0.6);
        assert_eq!(config.max_tokens, 2000);
    }
}
