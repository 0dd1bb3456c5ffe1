//! Parsing ReAct-formatted model output.
//!
//! The model writes labelled sections, one label per line:
//!
//! ```text
//! Thought: I need the weather first.
//! Action: weather
//! Action Input: {"city": "Beijing"}
//! ```
//!
//! or finishes with `Final Answer: ...`. Chinese labels (思考, 行动, 行动输入,
//! 最终答案) with ASCII or full-width colons are accepted too. Any
//! `Observation:` the model invents is ignored.

use regex::Regex;
use serde_json::{Value, json};

use crate::error::{AgentError, Result};
use crate::tool::primary_string_parameter;

const LABEL_PATTERN: &str = r"(?mi)^[ \t]*(?:\*\*)?(thought|action input|action|final answer|observation|思考|行动输入|行动|最终答案|观察结果|观察)(?:\*\*)?[ \t]*[:：][ \t]*";

/// Argument key used when plain-text input has nowhere better to go.
pub const FALLBACK_INPUT_KEY: &str = "input";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Label {
    Thought,
    Action,
    ActionInput,
    FinalAnswer,
    Observation,
}

impl Label {
    fn from_match(label: &str) -> Self {
        match label.to_lowercase().as_str() {
            "thought" | "思考" => Label::Thought,
            "action" | "行动" => Label::Action,
            "action input" | "行动输入" => Label::ActionInput,
            "final answer" | "最终答案" => Label::FinalAnswer,
            _ => Label::Observation,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Action Input
// ─────────────────────────────────────────────────────────────────────────────

/// The argument text of an action.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionInput {
    /// A JSON object.
    Json(Value),
    /// Anything that is not a JSON object, quotes stripped.
    Text(String),
    /// No input given.
    Empty,
}

impl ActionInput {
    /// Interpret raw `Action Input:` text.
    pub fn parse(raw: &str) -> Self {
        let trimmed = strip_code_fence(raw.trim());
        if trimmed.is_empty() {
            return ActionInput::Empty;
        }

        if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
            if start < end {
                if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(&trimmed[start..=end]) {
                    return ActionInput::Json(value);
                }
            }
        }

        let text = trimmed.trim_matches(|c: char| c == '"' || c == '\'').trim();
        if text.is_empty() {
            ActionInput::Empty
        } else {
            ActionInput::Text(text.to_string())
        }
    }

    /// Turn the input into tool arguments for a tool with `schema`.
    ///
    /// Plain text binds to the tool's primary string parameter.
    pub fn into_arguments(self, schema: &Value) -> Value {
        match self {
            ActionInput::Json(value) => value,
            ActionInput::Text(text) => {
                let key = primary_string_parameter(schema).unwrap_or(FALLBACK_INPUT_KEY);
                json!({ key: text })
            }
            ActionInput::Empty => json!({}),
        }
    }

    /// Input as display text.
    pub fn to_display(&self) -> String {
        match self {
            ActionInput::Json(value) => value.to_string(),
            ActionInput::Text(text) => text.clone(),
            ActionInput::Empty => String::new(),
        }
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric());
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

// ─────────────────────────────────────────────────────────────────────────────
// Parser
// ─────────────────────────────────────────────────────────────────────────────

/// One parsed model response.
#[derive(Debug, Clone, PartialEq)]
pub enum ReactStep {
    /// Call a tool.
    Action {
        thought: Option<String>,
        action: String,
        input: ActionInput,
    },
    /// Stop and answer.
    Finish {
        thought: Option<String>,
        answer: String,
    },
}

/// Parser for ReAct-formatted responses.
#[derive(Debug, Clone)]
pub struct ReactParser {
    labels: Regex,
}

impl ReactParser {
    /// Compile the label pattern.
    pub fn new() -> Result<Self> {
        let labels = Regex::new(LABEL_PATTERN)
            .map_err(|e| AgentError::internal(format!("invalid ReAct label pattern: {}", e)))?;
        Ok(Self { labels })
    }

    /// Split a response into its labelled sections, in order.
    fn sections<'t>(&self, text: &'t str) -> Vec<(Label, &'t str)> {
        let matches: Vec<_> = self.labels.captures_iter(text).collect();
        matches
            .iter()
            .enumerate()
            .filter_map(|(i, caps)| {
                let whole = caps.get(0)?;
                let label = Label::from_match(caps.get(1)?.as_str());
                let end = matches
                    .get(i + 1)
                    .and_then(|next| next.get(0))
                    .map(|m| m.start())
                    .unwrap_or(text.len());
                Some((label, text[whole.end()..end].trim()))
            })
            .collect()
    }

    /// Parse one model response.
    ///
    /// An action wins over a final answer. A missing action, or an action
    /// named `Final Answer`, means the model is done.
    pub fn parse(&self, text: &str) -> ReactStep {
        let sections = self.sections(text);
        let first = |wanted: Label| {
            sections
                .iter()
                .find(|(label, _)| *label == wanted)
                .map(|(_, content)| *content)
        };

        let thought = first(Label::Thought)
            .filter(|t| !t.is_empty())
            .map(str::to_string);
        let action = first(Label::Action).map(clean_action_name).unwrap_or_default();
        let raw_input = first(Label::ActionInput);

        if !action.is_empty() && !is_final_answer_name(&action) {
            return ReactStep::Action {
                thought,
                action,
                input: ActionInput::parse(raw_input.unwrap_or("")),
            };
        }

        let answer = self
            .final_answer(text)
            .or_else(|| raw_input.filter(|s| !s.is_empty()).map(str::to_string))
            .unwrap_or_else(|| text.trim().to_string());

        ReactStep::Finish { thought, answer }
    }

    /// Text after the last final-answer label, if there is one.
    pub fn final_answer(&self, text: &str) -> Option<String> {
        self.labels
            .captures_iter(text)
            .filter(|caps| {
                caps.get(1)
                    .is_some_and(|m| Label::from_match(m.as_str()) == Label::FinalAnswer)
            })
            .last()
            .and_then(|caps| caps.get(0))
            .map(|m| text[m.end()..].trim().to_string())
    }

    /// The answer to report for `text`: the final-answer section if there
    /// is one, otherwise the whole response.
    pub fn format_answer(&self, text: &str) -> String {
        self.final_answer(text)
            .unwrap_or_else(|| text.trim().to_string())
    }
}

fn clean_action_name(raw: &str) -> String {
    raw.lines()
        .next()
        .unwrap_or("")
        .trim()
        .trim_matches(|c: char| matches!(c, '[' | ']' | '`' | '*' | '"' | '\''))
        .trim()
        .to_string()
}

fn is_final_answer_name(action: &str) -> bool {
    action.eq_ignore_ascii_case("final answer")
        || action.eq_ignore_ascii_case("final_answer")
        || action == "最终答案"
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> ReactParser {
        ReactParser::new().unwrap()
    }

    #[test]
    fn test_parse_action_with_json_input() {
        let step = parser().parse(
            "Thought: I should check the weather.\nAction: weather\nAction Input: {\"city\": \"Beijing\"}",
        );
        assert_eq!(
            step,
            ReactStep::Action {
                thought: Some("I should check the weather.".to_string()),
                action: "weather".to_string(),
                input: ActionInput::Json(json!({"city": "Beijing"})),
            }
        );
    }

    #[test]
    fn test_parse_chinese_labels_full_width_colon() {
        let step = parser().parse("思考：需要搜索\n行动：web_search\n行动输入：\"阅兵 原因\"");
        match step {
            ReactStep::Action { action, input, .. } => {
                assert_eq!(action, "web_search");
                assert_eq!(input, ActionInput::Text("阅兵 原因".to_string()));
            }
            other => panic!("expected action, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_multiline_json_input_ignores_invented_observation() {
        let text = "Action: calculate\nAction Input: {\n  \"expression\": \"15*3\"\n}\nObservation: 45";
        match parser().parse(text) {
            ReactStep::Action { input, .. } => {
                assert_eq!(input, ActionInput::Json(json!({"expression": "15*3"})));
            }
            other => panic!("expected action, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_final_answer() {
        let step = parser().parse("Thought: I know this.\nFinal Answer: 45\nIt is 15 times 3.");
        assert_eq!(
            step,
            ReactStep::Finish {
                thought: Some("I know this.".to_string()),
                answer: "45\nIt is 15 times 3.".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_final_answer_as_action_name() {
        let step = parser().parse("Action: Final Answer\nAction Input: Paris");
        assert_eq!(
            step,
            ReactStep::Finish {
                thought: None,
                answer: "Paris".to_string(),
            }
        );

        let step = parser().parse("行动：最终答案\n最终答案：巴黎");
        assert!(matches!(step, ReactStep::Finish { answer, .. } if answer == "巴黎"));
    }

    #[test]
    fn test_parse_unlabelled_response_is_answer() {
        let step = parser().parse("  Hello there!  ");
        assert_eq!(
            step,
            ReactStep::Finish {
                thought: None,
                answer: "Hello there!".to_string(),
            }
        );
    }

    #[test]
    fn test_action_name_cleanup() {
        match parser().parse("Action: [web_search]\nAction Input: rust") {
            ReactStep::Action { action, .. } => assert_eq!(action, "web_search"),
            other => panic!("expected action, got {:?}", other),
        }
    }

    #[test]
    fn test_final_answer_uses_last_label() {
        let text = "Final Answer: draft\nThought: wait\nFinal Answer: 42";
        assert_eq!(parser().final_answer(text), Some("42".to_string()));
        assert_eq!(parser().format_answer("no label"), "no label");
    }

    #[test]
    fn test_action_input_parse() {
        assert_eq!(ActionInput::parse(""), ActionInput::Empty);
        assert_eq!(ActionInput::parse("  \"\" "), ActionInput::Empty);
        assert_eq!(
            ActionInput::parse("'quoted'"),
            ActionInput::Text("quoted".to_string())
        );
        assert_eq!(
            ActionInput::parse("```json\n{\"a\": 1}\n```"),
            ActionInput::Json(json!({"a": 1}))
        );
        // Broken JSON falls back to text.
        assert_eq!(
            ActionInput::parse("{city: Beijing}"),
            ActionInput::Text("{city: Beijing}".to_string())
        );
        // Arrays are not objects.
        assert_eq!(
            ActionInput::parse("[1, 2]"),
            ActionInput::Text("[1, 2]".to_string())
        );
    }

    #[test]
    fn test_into_arguments_binds_text_to_primary_parameter() {
        let schema = json!({
            "type": "object",
            "properties": {"search_query": {"type": "string"}},
            "required": ["search_query"]
        });
        assert_eq!(
            ActionInput::Text("rust".to_string()).into_arguments(&schema),
            json!({"search_query": "rust"})
        );
        assert_eq!(
            ActionInput::Text("x".to_string()).into_arguments(&json!({})),
            json!({"input": "x"})
        );
        assert_eq!(ActionInput::Empty.into_arguments(&schema), json!({}));
    }
}
