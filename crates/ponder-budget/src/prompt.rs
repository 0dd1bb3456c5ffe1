//! Prompt construction.

use ponder_llm::{ChatMessage, ChatTemplate, TemplateOptions};

use crate::error::Result;

/// Instruction sent as the system message for every reasoning run.
pub const SYSTEM_PROMPT: &str =
    "Please reason step by step, and put your final answer within \\boxed{}.";

/// Competition problem used when no question is supplied.
pub const EXAMPLE_QUESTION: &str = "There are exactly three positive real numbers $ k $ such that the function\n$ f(x) = \\frac{(x - 18)(x - 72)(x - 98)(x - k)}{x} $\ndefined over the positive real numbers achieves its minimum value at exactly two positive real numbers $ x $. Find the sum of these three values of $ k $.";

/// System instruction followed by the user's question.
pub fn build_messages(system_prompt: &str, question: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(system_prompt),
        ChatMessage::user(question),
    ]
}

/// Render the opening input: the conversation plus an assistant header with
/// thinking enabled.
pub fn render_input(template: &ChatTemplate, system_prompt: &str, question: &str) -> Result<String> {
    let options = TemplateOptions {
        add_generation_prompt: true,
        enable_thinking: true,
    };
    Ok(template.render(&build_messages(system_prompt, question), &options)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_messages() {
        let messages = build_messages(SYSTEM_PROMPT, "1+1?");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, SYSTEM_PROMPT);
        assert_eq!(messages[1].content, "1+1?");
    }

    #[test]
    fn test_render_input_opens_assistant_turn() {
        let input = render_input(&ChatTemplate::default(), SYSTEM_PROMPT, "1+1?").unwrap();
        assert!(input.contains("\\boxed{}"));
        assert!(input.ends_with("<|im_start|>assistant\n"));
    }
}
