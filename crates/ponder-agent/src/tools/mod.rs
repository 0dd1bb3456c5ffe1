//! Built-in tools.

mod calculator;
mod search;
mod weather;

pub use calculator::{CalcError, CalculatorTool, evaluate, format_number};
pub use search::{
    SearchProvider, SearchResult, WebSearchConfig, WebSearchTool, format_results,
    parse_duckduckgo, parse_serper,
};
pub use weather::{WeatherTool, format_report};

use crate::tool::ToolRegistry;

/// Registry with every built-in tool: `calculate`, `weather`, `web_search`.
pub fn default_registry(search: WebSearchConfig) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(CalculatorTool::new());
    registry.register(WeatherTool::new());
    registry.register(WebSearchTool::with_config(search));
    registry
}
