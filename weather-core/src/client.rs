use chrono::{DateTime, Utc};
use serde_json::Value;
use std::time::Duration;

use crate::{
    cache::ResponseCache,
    error::{Result, WeatherError},
    model::WeatherReading,
    throttle::Throttle,
    transport::{HttpTransport, RawResponse, Transport},
    zip::ZipCode,
};

pub const DEFAULT_BASE_URL: &str = "http://api.weatherstack.com/current";

/// Tunables for [`WeatherClient`].
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub base_url: String,
    pub cache_timeout: Duration,
    pub request_timeout: Duration,
    pub min_request_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            cache_timeout: Duration::from_secs(300),
            request_timeout: Duration::from_secs(10),
            min_request_interval: Duration::from_secs(1),
        }
    }
}

/// Current-weather client for the weatherstack `current` endpoint.
///
/// Each instance owns its response cache and request throttle. Calls take
/// `&mut self`: one logical caller per client.
#[derive(Debug)]
pub struct WeatherClient {
    api_key: String,
    base_url: String,
    request_timeout: Duration,
    transport: Box<dyn Transport>,
    cache: ResponseCache,
    throttle: Throttle,
}

impl WeatherClient {
    pub fn new(api_key: &str, config: ClientConfig) -> Result<Self> {
        Self::with_transport(api_key, config, Box::new(HttpTransport::new()))
    }

    pub fn with_transport(
        api_key: &str,
        config: ClientConfig,
        transport: Box<dyn Transport>,
    ) -> Result<Self> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(WeatherError::Configuration("API key must not be empty".to_string()));
        }

        Ok(Self {
            api_key: api_key.to_string(),
            base_url: plain_http(&config.base_url),
            request_timeout: config.request_timeout,
            transport,
            cache: ResponseCache::new(config.cache_timeout),
            throttle: Throttle::new(config.min_request_interval),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Number of cached responses still within the cache timeout.
    pub fn cached_len(&self) -> usize {
        self.cache.live_len()
    }

    /// Current conditions for `zip_code`, from cache when fresh, otherwise from the provider.
    pub async fn get_weather(&mut self, zip_code: &str) -> Result<WeatherReading> {
        let zip = ZipCode::try_from(zip_code)?;

        if let Some(cached) = self.cache.get(&zip) {
            log::debug!("Returning cached weather data for {zip}");
            return parse_reading(&zip, cached);
        }

        self.throttle.acquire().await;

        let data = self.fetch(&zip).await?;
        let reading = parse_reading(&zip, &data)?;
        self.cache.insert(zip, data);

        Ok(reading)
    }

    async fn fetch(&mut self, zip: &ZipCode) -> Result<Value> {
        log::debug!(
            "API request: {} access_key={} query={} units=f",
            self.base_url,
            mask_key(&self.api_key),
            zip
        );

        let query =
            [("access_key", self.api_key.as_str()), ("query", zip.as_str()), ("units", "f")];

        let res = self
            .transport
            .get(&self.base_url, &query, self.request_timeout)
            .await
            .inspect_err(|e| log::error!("API request for {zip} failed: {e}"))?;

        interpret(res)
    }

    /// Drops pooled connections and the cache. Safe to call repeatedly.
    pub fn cleanup(&mut self) {
        self.transport.close();
        self.cache.clear();
        log::info!("Weather client cleaned up");
    }
}

/// Turns a completed exchange into the provider JSON document, or the error it describes.
fn interpret(res: RawResponse) -> Result<Value> {
    let parsed: std::result::Result<Value, _> = serde_json::from_str(&res.body);

    if let Some(error) = parsed.as_ref().ok().and_then(|data| data.get("error")) {
        let err = provider_error(error);
        log::error!("{err}");
        return Err(err);
    }

    if !res.is_success() {
        return Err(WeatherError::network(format!(
            "HTTP status {}: {}",
            res.status,
            truncate_body(&res.body)
        )));
    }

    parsed.map_err(WeatherError::InvalidJson)
}

fn provider_error(error: &Value) -> WeatherError {
    WeatherError::Provider {
        code: error.get("code").and_then(Value::as_i64).unwrap_or_default(),
        kind: error.get("type").and_then(Value::as_str).unwrap_or("unknown").to_string(),
        message: error
            .get("info")
            .and_then(Value::as_str)
            .unwrap_or("Unknown error occurred")
            .to_string(),
    }
}

fn parse_reading(zip: &ZipCode, data: &Value) -> Result<WeatherReading> {
    let current = field(data, "current")?;
    let location = field(data, "location")?;

    let name = str_field(location, "location.name")?;
    let region = str_field(location, "location.region")?;
    let location_name = if region.trim().is_empty() {
        name.to_string()
    } else {
        format!("{name}, {region}")
    };

    let description = field(current, "current.weather_descriptions")?
        .get(0)
        .and_then(Value::as_str)
        .ok_or_else(|| WeatherError::missing("current.weather_descriptions[0]"))?
        .to_string();

    let icon_url = current
        .get("weather_icons")
        .and_then(|icons| icons.get(0))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let humidity = field(current, "current.humidity")?
        .as_u64()
        .filter(|h| *h <= 100)
        .ok_or_else(|| WeatherError::missing("current.humidity"))? as u8;

    let epoch = field(location, "location.localtime_epoch")?
        .as_i64()
        .ok_or_else(|| WeatherError::missing("location.localtime_epoch"))?;
    let observed_at: DateTime<Utc> = DateTime::from_timestamp(epoch, 0)
        .ok_or_else(|| WeatherError::missing("location.localtime_epoch"))?;

    Ok(WeatherReading {
        zip_code: zip.clone(),
        temperature: num_field(current, "current.temperature")?,
        location_name,
        description,
        humidity,
        wind_speed: num_field(current, "current.wind_speed")?,
        icon_url,
        observed_at,
    })
}

/// Looks up the last segment of the dotted `path` in `parent`.
fn field<'a>(parent: &'a Value, path: &str) -> Result<&'a Value> {
    let key = path.rsplit('.').next().unwrap_or(path);
    parent
        .get(key)
        .filter(|v| !v.is_null())
        .ok_or_else(|| WeatherError::missing(path))
}

fn str_field<'a>(parent: &'a Value, path: &str) -> Result<&'a str> {
    field(parent, path)?.as_str().ok_or_else(|| WeatherError::missing(path))
}

fn num_field(parent: &Value, path: &str) -> Result<f64> {
    field(parent, path)?.as_f64().ok_or_else(|| WeatherError::missing(path))
}

/// The free tier only serves plain HTTP.
fn plain_http(base_url: &str) -> String {
    match base_url.strip_prefix("https://") {
        Some(rest) => {
            log::warn!("Converting HTTPS to HTTP for free plan compatibility: {base_url}");
            format!("http://{rest}")
        }
        None => base_url.to_string(),
    }
}

fn mask_key(key: &str) -> String {
    let tail: String = key.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
    format!("****{tail}")
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
