//! Reasoning-segment markers.

use serde::{Deserialize, Serialize};

/// The strings that delimit and extend a model's reasoning segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThinkMarkers {
    /// Opens the reasoning segment.
    pub open: String,
    /// Closes the reasoning segment.
    pub close: String,
    /// Appended when the model tries to stop early, to keep it reasoning.
    pub continuation: String,
}

impl Default for ThinkMarkers {
    fn default() -> Self {
        Self {
            open: "<think>".to_string(),
            close: "</think>".to_string(),
            continuation: "\nWait!\n".to_string(),
        }
    }
}

impl ThinkMarkers {
    /// Override the continuation text.
    pub fn with_continuation(mut self, continuation: impl Into<String>) -> Self {
        self.continuation = continuation.into();
        self
    }

    /// The opening marker as it appears at the head of a reasoning block.
    pub fn open_line(&self) -> String {
        format!("{}\n", self.open)
    }

    /// Text appended to force the reasoning segment closed.
    pub fn forced_close(&self) -> String {
        format!("\n{}\n", self.close)
    }

    /// Everything after the last opening line, if there is one.
    pub fn after_last_open<'t>(&self, text: &'t str) -> Option<&'t str> {
        let open_line = self.open_line();
        text.rfind(&open_line)
            .map(|idx| &text[idx + open_line.len()..])
    }

    /// The final reasoning segment of a finished transcript: the text after
    /// the last opening marker up to the next closing marker.
    ///
    /// Without an opening marker the whole transcript is returned; without a
    /// closing marker the segment runs to the end.
    pub fn final_segment<'t>(&self, transcript: &'t str) -> &'t str {
        let start = transcript
            .rfind(&self.open)
            .map(|idx| idx + self.open.len())
            .unwrap_or(0);
        let rest = &transcript[start..];
        match rest.find(&self.close) {
            Some(end) => &rest[..end],
            None => rest,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let markers = ThinkMarkers::default();
        assert_eq!(markers.open_line(), "<think>\n");
        assert_eq!(markers.forced_close(), "\n</think>\n");
        assert_eq!(markers.continuation, "\nWait!\n");
    }

    #[test]
    fn test_after_last_open_uses_last_occurrence() {
        let markers = ThinkMarkers::default();
        let text = "<think>\nfirst</think><think>\nsecond";
        assert_eq!(markers.after_last_open(text), Some("second"));
        assert_eq!(markers.after_last_open("no markers"), None);
        // The bare marker without its newline does not count.
        assert_eq!(markers.after_last_open("<think>x"), None);
    }

    #[test]
    fn test_final_segment() {
        let markers = ThinkMarkers::default();
        assert_eq!(
            markers.final_segment("prompt<think>\nreason\n</think>\nanswer"),
            "\nreason\n"
        );
        assert_eq!(markers.final_segment("<think>open ended"), "open ended");
        assert_eq!(markers.final_segment("plain</think>tail"), "plain");
    }

    #[test]
    fn test_with_continuation() {
        let markers = ThinkMarkers::default().with_continuation("\nHmm.\n");
        assert_eq!(markers.continuation, "\nHmm.\n");
    }
}
