//! System prompt for the ReAct agent.

use chrono::{DateTime, Local, TimeZone};

use crate::tool::ToolRegistry;

/// Build the system prompt for `tools` as of `now`.
///
/// Lists each tool with its parameter schema, then the ReAct format the
/// parser expects.
pub fn build_system_prompt<Tz>(tools: &ToolRegistry, now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let descriptions: Vec<String> = tools
        .tools()
        .map(|tool| {
            let parameters = serde_json::to_string(&tool.parameters())
                .unwrap_or_else(|_| tool.parameters().to_string());
            format!(
                "{}: {} Parameters: {}",
                tool.name(),
                tool.description(),
                parameters
            )
        })
        .collect();
    let names = tools.names().join(", ");

    format!(
        "The current time is {now}. You are a helpful assistant that can use the following tools to answer questions:

{tools}

Use the following ReAct format:

Thought: analyse the question and decide which tool to use
Action: one of [{names}]
Action Input: the tool arguments as a JSON object
Observation: the result returned by the tool

You may repeat Thought/Action/Action Input/Observation until you have enough information to answer the question.

Final Answer: the final answer, based on everything you found

Labels may also be written in Chinese (思考, 行动, 行动输入, 最终答案). Never write the Observation yourself.

Begin!",
        now = now.format("%Y-%m-%d %H:%M:%S"),
        tools = descriptions.join("\n"),
        names = names,
    )
}

/// Build the system prompt with the current local time.
pub fn system_prompt(tools: &ToolRegistry) -> String {
    build_system_prompt(tools, &Local::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::MockTool;
    use chrono::Utc;

    #[test]
    fn test_prompt_lists_tools_and_format() {
        let mut registry = ToolRegistry::new();
        registry.register(MockTool::new("echo"));
        registry.register(MockTool::new("add"));

        let now = Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 0).unwrap();
        let prompt = build_system_prompt(&registry, &now);

        assert!(prompt.starts_with("The current time is 2025-03-01 09:30:00."));
        assert!(prompt.contains("add: Echoes for tests. Parameters: {"));
        assert!(prompt.contains("\"required\":[\"text\"]"));
        assert!(prompt.contains("Action: one of [add, echo]"));
        assert!(prompt.contains("Final Answer:"));
        assert!(prompt.ends_with("Begin!"));
    }

    #[test]
    fn test_prompt_with_no_tools() {
        let prompt = system_prompt(&ToolRegistry::new());
        assert!(prompt.contains("Action: one of []"));
    }
}
