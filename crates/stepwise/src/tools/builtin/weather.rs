//! Weather lookup tool

use anyhow::Result;
use async_trait::async_trait;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, warn};

use crate::tools::{SecurityLevel, SessionContext, Tool};

/// Observation returned for any failed lookup
pub const WEATHER_FAILURE: &str = "Something went wrong";

/// Shared HTTP client for connection pooling
static SHARED_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

fn get_shared_client() -> &'static reqwest::Client {
    SHARED_CLIENT.get_or_init(reqwest::Client::new)
}

/// Tool for looking up the current weather of a city
pub struct WeatherTool;

impl WeatherTool {
    async fn lookup(city: &str, ctx: &SessionContext) -> Result<String, String> {
        let url = format!(
            "{}/{}?format=%C+%t",
            ctx.weather_url.trim_end_matches('/'),
            urlencoding::encode(city)
        );
        debug!(%url, "Weather request");

        let resp = get_shared_client()
            .get(&url)
            .timeout(Duration::from_secs(ctx.http_timeout_secs))
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = resp.status();
        if !status.is_success() {
            return Err(format!("status {}", status));
        }

        resp.text().await.map_err(|e| e.to_string())
    }
}

#[async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> &str {
        "get_weather"
    }

    fn description(&self) -> &str {
        "Takes a city name as input and returns the current weather for that city."
    }

    fn security_level(&self) -> SecurityLevel {
        SecurityLevel::Moderate
    }

    async fn execute(&self, input: &str, ctx: &mut SessionContext) -> Result<String> {
        let city = input.trim();

        match Self::lookup(city, ctx).await {
            Ok(body) => Ok(format!("The weather in {} is {}.", city, body.trim_end())),
            Err(reason) => {
                warn!(city, %reason, "Weather lookup failed");
                Ok(WEATHER_FAILURE.to_string())
            }
        }
    }
}
