use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

use crate::error::CapabilityError;
use crate::shared::config::ToolsConfig;
use crate::tools::model::{
    ApiReply, Capability, CapabilityOutput, ParameterSchema, Parameters, param_str,
};

const FORECAST_ENTRIES: usize = 8;

/// Current weather and short-range forecasts from OpenWeatherMap.
///
/// Without an API key the tool answers with demo data flagged by `demo_mode: true`.
pub struct WeatherTool {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Units {
    Metric,
    Imperial,
}

impl Units {
    fn parse(parameters: &Parameters) -> Self {
        match param_str(parameters, "units") {
            Some(u) if u.eq_ignore_ascii_case("imperial") => Units::Imperial,
            _ => Units::Metric,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Units::Metric => "metric",
            Units::Imperial => "imperial",
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            Units::Metric => "°C",
            Units::Imperial => "°F",
        }
    }

    fn demo_temperature(self, celsius: i64) -> i64 {
        match self {
            Units::Metric => celsius,
            Units::Imperial => celsius * 9 / 5 + 32,
        }
    }
}

impl WeatherTool {
    pub fn new(config: &ToolsConfig) -> Result<Self, CapabilityError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_url: config.openweather_api_url.trim_end_matches('/').to_string(),
            api_key: config.openweather_api_key.clone().filter(|k| !k.is_empty()),
        })
    }

    pub fn is_demo(&self) -> bool {
        self.api_key.is_none()
    }

    async fn fetch(
        &self,
        endpoint: &str,
        location: &str,
        units: Units,
        api_key: &str,
    ) -> Result<ApiReply, CapabilityError> {
        let url = format!("{}/{}", self.api_url, endpoint);
        debug!(%url, %location, "OpenWeatherMap request");
        let response = self
            .client
            .get(&url)
            .query(&[("q", location), ("appid", api_key), ("units", units.as_str())])
            .send()
            .await?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| CapabilityError::Decode(e.to_string()))?;

        if !status.is_success() {
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("request failed");
            return Ok(ApiReply::Rejected(format!(
                "Weather API error ({}): {}",
                status.as_u16(),
                message
            )));
        }
        Ok(ApiReply::Body(body))
    }

    async fn current(
        &self,
        location: &str,
        units: Units,
        api_key: &str,
    ) -> Result<CapabilityOutput, CapabilityError> {
        let data = match self.fetch("weather", location, units, api_key).await? {
            ApiReply::Body(data) => data,
            ApiReply::Rejected(message) => return Ok(CapabilityOutput::failure(message)),
        };

        Ok(CapabilityOutput::ok(json!({
            "action": "current",
            "location": {
                "city": data.get("name"),
                "country": data.pointer("/sys/country"),
                "coordinates": {
                    "latitude": data.pointer("/coord/lat"),
                    "longitude": data.pointer("/coord/lon"),
                }
            },
            "weather": {
                "temperature": data.pointer("/main/temp"),
                "feels_like": data.pointer("/main/feels_like"),
                "temp_min": data.pointer("/main/temp_min"),
                "temp_max": data.pointer("/main/temp_max"),
                "unit": units.symbol(),
                "condition": data.pointer("/weather/0/main"),
                "description": data.pointer("/weather/0/description"),
                "humidity": data.pointer("/main/humidity"),
                "pressure": data.pointer("/main/pressure"),
                "wind_speed": data.pointer("/wind/speed"),
                "clouds": data.pointer("/clouds/all"),
            }
        })))
    }

    async fn forecast(
        &self,
        location: &str,
        units: Units,
        api_key: &str,
    ) -> Result<CapabilityOutput, CapabilityError> {
        let data = match self.fetch("forecast", location, units, api_key).await? {
            ApiReply::Body(data) => data,
            ApiReply::Rejected(message) => return Ok(CapabilityOutput::failure(message)),
        };

        let forecast: Vec<Value> = data
            .get("list")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .take(FORECAST_ENTRIES)
                    .map(|item| {
                        json!({
                            "datetime": item.get("dt_txt"),
                            "temperature": item.pointer("/main/temp"),
                            "condition": item.pointer("/weather/0/main"),
                            "description": item.pointer("/weather/0/description"),
                            "humidity": item.pointer("/main/humidity"),
                            "wind_speed": item.pointer("/wind/speed"),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(CapabilityOutput::ok(json!({
            "action": "forecast",
            "location": {
                "city": data.pointer("/city/name"),
                "country": data.pointer("/city/country"),
            },
            "unit": units.symbol(),
            "forecast": forecast,
        })))
    }
}

fn demo_weather(action: &str, city: &str, units: Units) -> CapabilityOutput {
    let data = if action == "forecast" {
        json!({
            "action": "forecast",
            "demo_mode": true,
            "location": {"city": city, "country": "DEMO"},
            "unit": units.symbol(),
            "forecast": [{
                "datetime": "2024-01-01 12:00:00",
                "temperature": units.demo_temperature(20),
                "condition": "Clear",
                "description": "clear sky (demo)",
                "humidity": 60,
                "wind_speed": 3.5,
            }]
        })
    } else {
        json!({
            "action": "current",
            "demo_mode": true,
            "location": {
                "city": city,
                "country": "DEMO",
                "coordinates": {"latitude": 0.0, "longitude": 0.0}
            },
            "weather": {
                "temperature": units.demo_temperature(20),
                "feels_like": units.demo_temperature(18),
                "temp_min": units.demo_temperature(15),
                "temp_max": units.demo_temperature(25),
                "unit": units.symbol(),
                "condition": "Clear",
                "description": "clear sky (demo data)",
                "humidity": 60,
                "pressure": 1013,
                "wind_speed": 3.5,
                "clouds": 10,
            }
        })
    };
    CapabilityOutput::ok(data)
}

#[async_trait]
impl Capability for WeatherTool {
    fn name(&self) -> &str {
        "weather"
    }

    fn description(&self) -> &str {
        "Get current weather information and forecasts for any city"
    }

    fn parameter_schema(&self) -> ParameterSchema {
        ParameterSchema::new()
            .param("action", "Action to perform: 'current' or 'forecast'")
            .param("city", "City name (e.g., 'London', 'New York')")
            .param("country", "Country code (optional, e.g., 'US', 'GB')")
            .param("units", "Units: 'metric' (Celsius) or 'imperial' (Fahrenheit), default: metric")
    }

    async fn invoke(&self, parameters: &Parameters) -> Result<CapabilityOutput, CapabilityError> {
        let action = param_str(parameters, "action").unwrap_or("current");
        if action != "current" && action != "forecast" {
            return Ok(CapabilityOutput::failure(format!("Unknown action: {action}")));
        }
        let Some(city) = param_str(parameters, "city") else {
            return Ok(CapabilityOutput::failure("City parameter is required"));
        };
        let units = Units::parse(parameters);

        let Some(api_key) = self.api_key.as_deref() else {
            return Ok(demo_weather(action, city, units));
        };

        let location = match param_str(parameters, "country") {
            Some(country) => format!("{city},{country}"),
            None => city.to_string(),
        };

        if action == "forecast" {
            self.forecast(&location, units, api_key).await
        } else {
            self.current(&location, units, api_key).await
        }
    }
}
