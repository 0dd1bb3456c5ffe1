//! Tools the agent can call, and the table it dispatches through.
//!
//! A tool declares its arguments as a JSON Schema. [`ToolRegistry::execute`]
//! checks the arguments against that schema before the tool runs, so a
//! malformed call from the model turns into a readable error instead of a
//! half-executed tool. Each built-in tool then converts the checked object
//! into a typed parameter struct (`TryFrom<Value>`) for value-level checks.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{AgentError, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Argument Checking
// ─────────────────────────────────────────────────────────────────────────────

/// Why a tool call's arguments were rejected.
///
/// The text is shown to the model as the observation, so it says what to
/// change.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParameterValidationError {
    #[error("arguments must be a JSON object, got {actual}")]
    NotAnObject { actual: String },

    #[error("missing required parameter '{name}': {hint}")]
    MissingRequired { name: String, hint: String },

    #[error("'{name}' must be {expected}, got {actual}")]
    InvalidType {
        name: String,
        expected: String,
        actual: String,
    },

    #[error("'{name}' {problem}")]
    InvalidValue { name: String, problem: String },

    #[error("{}", join_errors(.0))]
    Multiple(Vec<ParameterValidationError>),
}

fn join_errors(errors: &[ParameterValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ParameterValidationError {
    fn missing(name: &str, hint: &str) -> Self {
        Self::MissingRequired {
            name: name.to_string(),
            hint: hint.to_string(),
        }
    }

    fn invalid(name: &str, problem: impl Into<String>) -> Self {
        Self::InvalidValue {
            name: name.to_string(),
            problem: problem.into(),
        }
    }

    /// The offending parameter, when there is exactly one.
    pub fn parameter(&self) -> Option<&str> {
        match self {
            Self::MissingRequired { name, .. }
            | Self::InvalidType { name, .. }
            | Self::InvalidValue { name, .. } => Some(name),
            Self::NotAnObject { .. } | Self::Multiple(_) => None,
        }
    }
}

impl From<ParameterValidationError> for AgentError {
    fn from(err: ParameterValidationError) -> Self {
        AgentError::InvalidToolParams(err.to_string())
    }
}

type ParamResult<T> = std::result::Result<T, ParameterValidationError>;

fn schema_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn has_type(value: &Value, expected: &str) -> bool {
    match expected {
        // integers are numbers too
        "number" => value.is_number(),
        "string" | "integer" | "boolean" | "array" | "object" | "null" => {
            schema_type(value) == expected
        }
        _ => true,
    }
}

fn properties(schema: &Value) -> Option<&Map<String, Value>> {
    schema.get("properties").and_then(Value::as_object)
}

fn required(schema: &Value) -> impl Iterator<Item = &str> {
    schema
        .get("required")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
}

/// Check `args` against a tool's parameter schema: it must be an object,
/// carry every required property, and give each declared property its
/// declared primitive type. Every problem found is reported.
pub fn validate_arguments(schema: &Value, args: &Value) -> ParamResult<()> {
    let Some(object) = args.as_object() else {
        return Err(ParameterValidationError::NotAnObject {
            actual: schema_type(args).to_string(),
        });
    };
    let declared = properties(schema);

    let mut errors: Vec<ParameterValidationError> = required(schema)
        .filter(|name| !object.contains_key(*name))
        .map(|name| {
            let hint = declared
                .and_then(|p| p.get(name))
                .and_then(|p| p.get("description"))
                .and_then(Value::as_str)
                .unwrap_or("this parameter is required");
            ParameterValidationError::missing(name, hint)
        })
        .collect();

    for (name, spec) in declared.into_iter().flatten() {
        let Some(expected) = spec.get("type").and_then(Value::as_str) else {
            continue;
        };
        if let Some(value) = object.get(name) {
            if !has_type(value, expected) {
                errors.push(ParameterValidationError::InvalidType {
                    name: name.clone(),
                    expected: expected.to_string(),
                    actual: schema_type(value).to_string(),
                });
            }
        }
    }

    match errors.len() {
        0 => Ok(()),
        1 => Err(errors.remove(0)),
        _ => Err(ParameterValidationError::Multiple(errors)),
    }
}

/// The parameter a plain-text action input is bound to: the first required
/// string property, else any string property.
pub fn primary_string_parameter(schema: &Value) -> Option<&str> {
    let declared = properties(schema)?;
    let is_string =
        |name: &str| declared.get(name).and_then(|p| p.get("type")) == Some(&Value::from("string"));

    required(schema)
        .find(|name| is_string(*name))
        .or_else(|| declared.keys().map(String::as_str).find(|name| is_string(*name)))
}

fn required_text(params: &Value, name: &str, hint: &str) -> ParamResult<String> {
    let text = params
        .get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| ParameterValidationError::missing(name, hint))?
        .trim();
    if text.is_empty() {
        return Err(ParameterValidationError::invalid(name, "cannot be empty"));
    }
    Ok(text.to_string())
}

// ─────────────────────────────────────────────────────────────────────────────
// Typed Parameters
// ─────────────────────────────────────────────────────────────────────────────

/// Arguments of `calculate`.
#[derive(Debug, Clone, PartialEq)]
pub struct CalculateParams {
    pub expression: String,
}

impl TryFrom<Value> for CalculateParams {
    type Error = ParameterValidationError;

    fn try_from(params: Value) -> ParamResult<Self> {
        Ok(Self {
            expression: required_text(
                &params,
                "expression",
                "provide an expression such as \"15*3\"",
            )?,
        })
    }
}

/// Arguments of `weather`.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherParams {
    pub city: String,
}

impl TryFrom<Value> for WeatherParams {
    type Error = ParameterValidationError;

    fn try_from(params: Value) -> ParamResult<Self> {
        Ok(Self {
            city: required_text(&params, "city", "provide a city name")?,
        })
    }
}

/// Upper bound for `max_results` in a search call.
pub const MAX_SEARCH_RESULTS: u64 = 10;

const DEFAULT_SEARCH_RESULTS: u64 = 5;

/// Arguments of `web_search`.
#[derive(Debug, Clone, PartialEq)]
pub struct WebSearchParams {
    pub query: String,
    pub max_results: u64,
}

impl TryFrom<Value> for WebSearchParams {
    type Error = ParameterValidationError;

    fn try_from(params: Value) -> ParamResult<Self> {
        let query = required_text(&params, "search_query", "provide search keywords or a phrase")?;
        let max_results = params
            .get("max_results")
            .and_then(Value::as_u64)
            .unwrap_or(DEFAULT_SEARCH_RESULTS);
        if !(1..=MAX_SEARCH_RESULTS).contains(&max_results) {
            return Err(ParameterValidationError::invalid(
                "max_results",
                format!("must be between 1 and {MAX_SEARCH_RESULTS}, got {max_results}"),
            ));
        }
        Ok(Self { query, max_results })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tool Trait and Result
// ─────────────────────────────────────────────────────────────────────────────

/// A capability the model can invoke by name.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name the model writes after `Action:`.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema of the argument object.
    fn parameters(&self) -> Value;

    /// Run the tool. Failures the model should see come back as
    /// [`ToolResult::Error`]; `Err` is reserved for broken calls.
    async fn execute(&self, params: Value) -> Result<ToolResult>;
}

/// What a tool produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolResult {
    Text(String),
    Error(String),
}

impl ToolResult {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(content.into())
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(message.into())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Text placed after `Observation:`.
    pub fn to_observation(&self) -> String {
        match self {
            Self::Text(content) => content.clone(),
            Self::Error(message) => format!("Error: {message}"),
        }
    }

    fn map(self, f: impl FnOnce(String) -> String) -> Self {
        match self {
            Self::Text(content) => Self::Text(f(content)),
            Self::Error(message) => Self::Error(f(message)),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Output Limits
// ─────────────────────────────────────────────────────────────────────────────

/// Limits applied to tool output before the model sees it.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Longest observation in bytes, marker included.
    pub max_bytes: usize,
    /// Appended when output is cut.
    pub marker: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            max_bytes: 16 * 1024,
            marker: "\n[output truncated]".to_string(),
        }
    }
}

impl OutputConfig {
    pub fn with_max_bytes(max_bytes: usize) -> Self {
        Self {
            max_bytes,
            ..Default::default()
        }
    }

    /// Drop control characters other than line breaks and tabs, then cut to
    /// `max_bytes` on a character boundary.
    pub fn apply(&self, text: &str) -> String {
        let mut out: String = text
            .chars()
            .filter(|c| !c.is_control() || matches!(c, '\n' | '\r' | '\t'))
            .collect();
        if out.len() <= self.max_bytes {
            return out;
        }
        let mut cut = self.max_bytes.saturating_sub(self.marker.len());
        while !out.is_char_boundary(cut) {
            cut -= 1;
        }
        out.truncate(cut);
        out.push_str(&self.marker);
        out
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────────────────────────────────────

/// The agent's dispatch table, keyed by action name.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
    output: OutputConfig,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output_config(mut self, output: OutputConfig) -> Self {
        self.output = output;
        self
    }

    /// Add a tool. A later tool with the same name replaces the earlier one.
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.register_arc(Arc::new(tool));
    }

    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Tool names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    /// Tools in name order.
    pub fn tools(&self) -> impl Iterator<Item = &Arc<dyn Tool>> {
        self.tools.values()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Check `params` against the tool's schema, run it and apply the
    /// output limits.
    pub async fn execute(&self, name: &str, params: Value) -> Result<ToolResult> {
        let tool = self
            .get(name)
            .ok_or_else(|| AgentError::ToolNotFound(name.to_string()))?;
        validate_arguments(&tool.parameters(), &params)?;

        tracing::debug!(tool = name, %params, "Executing tool");
        let result = tool.execute(params).await?;
        Ok(result.map(|text| self.output.apply(&text)))
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ToolRegistry").field(&self.names()).finish()
    }
}

/// Scripted tool for tests; records the arguments of every call.
#[cfg(test)]
#[derive(Debug)]
pub struct MockTool {
    name: String,
    reply: ToolResult,
    calls: std::sync::Mutex<Vec<Value>>,
}

#[cfg(test)]
impl MockTool {
    /// A tool taking one required string, `text`, that replies "mock result".
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reply: ToolResult::text("mock result"),
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn with_response(mut self, reply: ToolResult) -> Self {
        self.reply = reply;
        self
    }

    pub fn calls(&self) -> Vec<Value> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[cfg(test)]
#[async_trait]
impl Tool for MockTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Echoes for tests."
    }

    fn parameters(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {"text": {"type": "string", "description": "Input text"}},
            "required": ["text"]
        })
    }

    async fn execute(&self, params: Value) -> Result<ToolResult> {
        self.calls.lock().unwrap().push(params);
        Ok(self.reply.clone())
    }
}
