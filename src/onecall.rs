//! OpenWeatherMap One Call client.
//!
//! One GET per day. Sunrise and sunset are read from the `current` block of
//! the response.

use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::config::FetchConfig;
use crate::error::FetchError;
use crate::record::DATE_FORMAT;

/// Data groups left out of the response.
const EXCLUDE: &str = "current,minutely,hourly,alerts";

#[derive(Deserialize, Debug)]
struct OneCallResp {
    current: Option<CurrentBlock>,
}

#[derive(Deserialize, Debug)]
struct CurrentBlock {
    sunrise: Option<Value>,
    sunset: Option<Value>,
}

/// Sunrise and sunset for one day, in epoch seconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SunTimes {
    pub sunrise: i64,
    pub sunset: i64,
}

#[derive(Debug, Clone)]
pub struct OneCallClient {
    client: Client,
    base_url: String,
    latitude: f64,
    longitude: f64,
    api_key: String,
    units: String,
}

impl OneCallClient {
    pub fn new(cfg: &FetchConfig) -> Result<Self, FetchError> {
        let mut builder = Client::builder();
        if let Some(timeout) = cfg.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(FetchError::Client)?;
        Ok(Self {
            client,
            base_url: cfg.base_url.clone(),
            latitude: cfg.latitude,
            longitude: cfg.longitude,
            api_key: cfg.api_key.clone(),
            units: cfg.units.clone(),
        })
    }

    /// Request URL for `date`.
    pub fn request_url(&self, date: NaiveDate) -> String {
        format!(
            "{}/onecall?lat={}&lon={}&exclude={}&units={}&appid={}&dt={}",
            self.base_url,
            self.latitude,
            self.longitude,
            EXCLUDE,
            urlencoding::encode(&self.units),
            urlencoding::encode(&self.api_key),
            date.format(DATE_FORMAT)
        )
    }

    /// Fetch and extract sunrise/sunset for `date`.
    pub async fn sun_times(&self, date: NaiveDate) -> Result<SunTimes, FetchError> {
        let url = self.request_url(date);
        debug!(%date, "requesting one call data");

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| FetchError::Network { date, source })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status { date, status });
        }

        let body = resp
            .bytes()
            .await
            .map_err(|source| FetchError::BodyRead { date, source })?;
        parse_sun_times(date, &body)
    }
}

/// Extract `current.sunrise` / `current.sunset` from a One Call body.
pub fn parse_sun_times(date: NaiveDate, body: &[u8]) -> Result<SunTimes, FetchError> {
    let parsed: OneCallResp =
        serde_json::from_slice(body).map_err(|source| FetchError::JsonParse { date, source })?;
    let current = parsed.current.ok_or(FetchError::MissingField {
        date,
        field: "current",
    })?;
    Ok(SunTimes {
        sunrise: epoch_field(date, current.sunrise, "current.sunrise")?,
        sunset: epoch_field(date, current.sunset, "current.sunset")?,
    })
}

fn epoch_field(
    date: NaiveDate,
    value: Option<Value>,
    field: &'static str,
) -> Result<i64, FetchError> {
    value
        .as_ref()
        .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)))
        .ok_or(FetchError::MissingField { date, field })
}
