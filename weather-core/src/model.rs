use chrono::{DateTime, Local, LocalResult, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::zip::ZipCode;

/// Current conditions for one ZIP code, as reported by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReading {
    pub zip_code: ZipCode,
    /// Degrees Fahrenheit.
    pub temperature: f64,
    /// "City, Region".
    pub location_name: String,
    pub description: String,
    /// Percent, 0..=100.
    pub humidity: u8,
    /// Miles per hour.
    pub wind_speed: f64,
    /// Empty when the provider sent no icon.
    pub icon_url: String,
    pub observed_at: DateTime<Utc>,
}

/// One saved location as persisted in the store file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredLocation {
    pub name: String,

    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub added_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub is_favorite: bool,
}

impl StoredLocation {
    pub fn new(name: String) -> Self {
        Self { name, added_at: Some(Utc::now()), is_favorite: false }
    }
}

/// Accepts RFC 3339 as well as the naive local `YYYY-MM-DDTHH:MM:SS[.f]` older files contain.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    let Some(raw) = raw else {
        return Ok(None);
    };

    if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(Some(ts.with_timezone(&Utc)));
    }

    let naive = NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map_err(|e| serde::de::Error::custom(format!("invalid added_at '{raw}': {e}")))?;

    Ok(Some(local_to_utc(Local.from_local_datetime(&naive), naive)))
}

/// A local time skipped by a DST change has no instant; read it as UTC instead.
fn local_to_utc(local: LocalResult<DateTime<Local>>, naive: NaiveDateTime) -> DateTime<Utc> {
    match local.earliest() {
        Some(ts) => ts.with_timezone(&Utc),
        None => naive.and_utc(),
    }
}
