use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::logging::LogSink;
use crate::models::ExchangeRateSet;
use crate::utils::dates::{format_iso, previous_business_day};

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);
pub const MAX_ATTEMPTS: usize = 3;

const SERIES_KEY: &str = "0:0:0:0:0";
const OBSERVATION_KEY: &str = "0";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("unexpected response structure: {0}")]
    Structure(String),
}

#[async_trait]
pub trait RateSource: Send + Sync {
    /// Returns the response body of the daily `<currency>.EUR` series for `date`.
    async fn daily_series(&self, currency: &str, date: NaiveDate) -> Result<String, FetchError>;
}

pub struct EcbClient {
    client: reqwest::Client,
    base_url: String,
}

impl EcbClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| FetchError::Connection(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        EcbClient {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn series_url(&self, currency: &str, date: NaiveDate) -> String {
        let day = format_iso(date);
        format!(
            "{}/D.{}.EUR.SP00.A?startPeriod={}&endPeriod={}&format=jsondata",
            self.base_url, currency, day, day
        )
    }
}

fn classify(error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Connection(error.to_string())
    }
}

#[async_trait]
impl RateSource for EcbClient {
    async fn daily_series(&self, currency: &str, date: NaiveDate) -> Result<String, FetchError> {
        let url = self.series_url(currency, date);
        tracing::debug!(%url, "querying rate service");

        let response = self.client.get(&url).send().await.map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(%status, currency, "rate service answered with non-success status");
        }

        response.text().await.map_err(classify)
    }
}

/// Extracts the single observation value from an SDMX-JSON envelope.
pub fn parse_observation(body: &str) -> Result<f64, FetchError> {
    let data: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| FetchError::Structure(format!("response is not JSON: {}", e)))?;

    let value = data
        .get("dataSets")
        .and_then(|d| d.get(0))
        .and_then(|d| d.get("series"))
        .and_then(|s| s.get(SERIES_KEY))
        .and_then(|s| s.get("observations"))
        .and_then(|o| o.get(OBSERVATION_KEY))
        .and_then(|o| o.get(0))
        .ok_or_else(|| FetchError::Structure("observation value not found".into()))?;

    match value {
        serde_json::Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| FetchError::Structure(format!("observation {} is not a float", n))),
        serde_json::Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| FetchError::Structure(format!("observation '{}' is not a number", s))),
        other => Err(FetchError::Structure(format!(
            "observation has unexpected type: {}",
            other
        ))),
    }
}

pub struct RateFetcher<'a> {
    source: &'a dyn RateSource,
    log: &'a dyn LogSink,
}

impl<'a> RateFetcher<'a> {
    pub fn new(source: &'a dyn RateSource, log: &'a dyn LogSink) -> Self {
        RateFetcher { source, log }
    }

    /// Returns the rates that resolved and the date they refer to. The first
    /// empty response moves that date to the previous business day for the
    /// rest of the run.
    pub async fn fetch(&self, currencies: &[String], date: NaiveDate) -> (ExchangeRateSet, NaiveDate) {
        let mut rates = ExchangeRateSet::new();
        let mut effective_date = date;

        for currency in currencies {
            for _attempt in 0..MAX_ATTEMPTS {
                match self.fetch_one(currency, date, &mut effective_date).await {
                    Ok(rate) => {
                        rates.insert(currency, rate);
                        self.log
                            .info(&format!("Request for {} exchange rate successful.", currency));
                        break;
                    }
                    Err(FetchError::Timeout) => {
                        self.log
                            .error(&format!("Request for {} exchange rate timed out.", currency));
                    }
                    Err(FetchError::Connection(reason)) => {
                        tracing::debug!(currency = %currency, %reason, "rate request failed");
                        self.log.error(&format!(
                            "Request for {} exchange rate failed due to connection error.",
                            currency
                        ));
                    }
                    Err(FetchError::Structure(reason)) => {
                        tracing::debug!(currency = %currency, %reason, "rate response rejected");
                        self.log.error(&format!(
                            "Request for {} failed - response structure has changed.",
                            currency
                        ));
                        break;
                    }
                }
            }
        }

        (rates, effective_date)
    }

    async fn fetch_one(
        &self,
        currency: &str,
        today: NaiveDate,
        effective_date: &mut NaiveDate,
    ) -> Result<f64, FetchError> {
        let mut body = self.source.daily_series(currency, *effective_date).await?;

        // Today's rate is not published yet
        if body.trim().is_empty() {
            *effective_date = previous_business_day(today);
            body = self.source.daily_series(currency, *effective_date).await?;
        }

        parse_observation(&body)
    }
}
