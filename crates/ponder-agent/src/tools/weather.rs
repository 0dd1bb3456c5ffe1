//! Current-conditions weather tool backed by wttr.in.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use std::time::Duration;

use crate::error::Result;
use crate::tool::{Tool, ToolResult, WeatherParams};

const DEFAULT_WTTR_BASE: &str = "https://wttr.in";

/// Tool that reports current weather for a city.
#[derive(Debug, Clone)]
pub struct WeatherTool {
    client: Client,
    base_url: String,
}

impl WeatherTool {
    /// Create a weather tool against wttr.in.
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_WTTR_BASE)
    }

    /// Create a weather tool against another wttr-compatible server.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .user_agent("curl/8")
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url_for(&self, city: &str) -> String {
        format!("{}/{}?format=j1", self.base_url, urlencoding::encode(city))
    }
}

impl Default for WeatherTool {
    fn default() -> Self {
        Self::new()
    }
}

/// Summarise a wttr.in `format=j1` response in one line.
pub fn format_report(city: &str, data: &Value) -> Option<String> {
    let current = data["current_condition"].get(0)?;
    let description = current["weatherDesc"][0]["value"]
        .as_str()
        .unwrap_or("unknown conditions")
        .trim();
    let temp = current["temp_C"].as_str()?;

    let place = match (
        data["nearest_area"][0]["areaName"][0]["value"].as_str(),
        data["nearest_area"][0]["country"][0]["value"].as_str(),
    ) {
        (Some(area), Some(country)) => format!("{}, {}", area, country),
        (Some(area), None) => area.to_string(),
        _ => city.to_string(),
    };

    let mut report = format!("{}: {}, {}°C", place, description, temp);
    if let Some(feels) = current["FeelsLikeC"].as_str() {
        report.push_str(&format!(" (feels like {}°C)", feels));
    }
    if let Some(humidity) = current["humidity"].as_str() {
        report.push_str(&format!(", humidity {}%", humidity));
    }
    if let Some(wind) = current["windspeedKmph"].as_str() {
        let direction = current["winddir16Point"].as_str().unwrap_or("");
        report.push_str(format!(", wind {} km/h {}", wind, direction).trim_end());
    }
    Some(report)
}

#[async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> &str {
        "weather"
    }

    fn description(&self) -> &str {
        "Get the current weather for a city: conditions, temperature, humidity and wind."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "city": {
                    "type": "string",
                    "description": "City name, e.g. \"Beijing\""
                }
            },
            "required": ["city"]
        })
    }

    async fn execute(&self, params: Value) -> Result<ToolResult> {
        let params = WeatherParams::try_from(params)?;

        let response = match self.client.get(self.url_for(&params.city)).send().await {
            Ok(response) => response,
            Err(e) => return Ok(ToolResult::error(format!("weather lookup failed: {}", e))),
        };
        if !response.status().is_success() {
            return Ok(ToolResult::error(format!(
                "weather service returned {}",
                response.status()
            )));
        }

        let data: Value = match response.json().await {
            Ok(data) => data,
            Err(e) => {
                return Ok(ToolResult::error(format!(
                    "failed to parse weather response: {}",
                    e
                )));
            }
        };

        match format_report(&params.city, &data) {
            Some(report) => Ok(ToolResult::text(report)),
            None => Ok(ToolResult::error(format!(
                "no weather data for '{}'",
                params.city
            ))),
        }
    }
}
