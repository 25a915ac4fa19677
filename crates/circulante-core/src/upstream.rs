//! Clients for the Olinda OData endpoints serving the cash and settlement series.

use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::config::Settings;
use crate::error::{CirculanteError, Result};

/// One denomination's circulation figures for one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyCashRecord {
    #[serde(rename = "Data")]
    pub date: String,
    #[serde(rename = "Denominacao", deserialize_with = "string_or_number")]
    pub denomination: String,
    #[serde(rename = "Quantidade")]
    pub quantity: i64,
    #[serde(rename = "Valor")]
    pub value: f64,
    #[serde(rename = "Especie", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// Daily Pix settlement statistics. `total` and `average` are served in
/// thousands of reais.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySettlementRecord {
    #[serde(rename = "Data")]
    pub date: String,
    #[serde(rename = "Total")]
    pub total: f64,
    #[serde(rename = "Media")]
    pub average: f64,
    #[serde(rename = "Quantidade")]
    pub count: i64,
}

#[derive(Debug, Deserialize)]
struct ODataEnvelope<T> {
    value: Vec<T>,
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(text) => Ok(text),
        Value::Number(number) => Ok(number
            .as_f64()
            .map(|value| format!("{value:.2}"))
            .unwrap_or_else(|| number.to_string())),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, found {other}"
        ))),
    }
}

#[async_trait]
pub trait DataSource: Send + Sync {
    /// Most recent `top` cash records, newest first.
    async fn fetch_cash(&self, top: usize) -> Result<Vec<DailyCashRecord>>;
    /// Most recent `top` settlement records, newest first.
    async fn fetch_settlement(&self, top: usize) -> Result<Vec<DailySettlementRecord>>;
}

#[derive(Debug, Clone)]
pub struct OlindaClient {
    http: Client,
    cash_url: String,
    settlement_url: String,
}

impl OlindaClient {
    pub fn new(settings: &Settings) -> Result<Self> {
        let http = Client::builder()
            .timeout(settings.http_timeout)
            .build()
            .map_err(|err| CirculanteError::Config(format!("failed to build HTTP client: {err}")))?;
        Ok(Self {
            http,
            cash_url: settings.cash_url.clone(),
            settlement_url: settings.settlement_url.clone(),
        })
    }

    fn query_url(base: &str, top: usize) -> String {
        format!("{base}?$top={top}&$format=json&$orderby=Data%20desc")
    }

    async fn fetch_series<T: DeserializeOwned>(&self, base: &str, top: usize) -> Result<Vec<T>> {
        let url = Self::query_url(base, top);
        info!(%url, top, "fetching upstream series");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|err| CirculanteError::UpstreamUnavailable(format!("{url}: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CirculanteError::UpstreamUnavailable(format!(
                "{url} returned {status}"
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| CirculanteError::UpstreamUnavailable(format!("{url}: {err}")))?;

        let records = decode_envelope::<T>(&body)?;
        debug!(%url, records = records.len(), "upstream series decoded");
        Ok(records)
    }
}

/// Decodes an OData `{"value": [...]}` body.
pub fn decode_envelope<T: DeserializeOwned>(body: &[u8]) -> Result<Vec<T>> {
    serde_json::from_slice::<ODataEnvelope<T>>(body)
        .map(|envelope| envelope.value)
        .map_err(|err| CirculanteError::UpstreamSchemaMismatch(err.to_string()))
}

#[async_trait]
impl DataSource for OlindaClient {
    async fn fetch_cash(&self, top: usize) -> Result<Vec<DailyCashRecord>> {
        self.fetch_series(&self.cash_url, top).await
    }

    async fn fetch_settlement(&self, top: usize) -> Result<Vec<DailySettlementRecord>> {
        self.fetch_series(&self.settlement_url, top).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesRequest {
    Cash(usize),
    Settlement(usize),
}

/// In-memory source that behaves like Olinda: records are served newest
/// first and truncated to `top`.
#[derive(Debug, Default)]
pub struct StaticSource {
    cash: Vec<DailyCashRecord>,
    settlement: Vec<DailySettlementRecord>,
    failure: Option<String>,
    requests: Mutex<Vec<SeriesRequest>>,
}

impl StaticSource {
    pub fn new(cash: Vec<DailyCashRecord>, settlement: Vec<DailySettlementRecord>) -> Self {
        Self {
            cash,
            settlement,
            ..Self::default()
        }
    }

    /// A source whose every fetch fails with `UpstreamUnavailable`.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            failure: Some(reason.into()),
            ..Self::default()
        }
    }

    /// Requests served so far, in call order.
    pub fn requests(&self) -> Vec<SeriesRequest> {
        self.requests
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    fn record(&self, request: SeriesRequest) -> Result<()> {
        if let Ok(mut guard) = self.requests.lock() {
            guard.push(request);
        }
        match &self.failure {
            Some(reason) => Err(CirculanteError::UpstreamUnavailable(reason.clone())),
            None => Ok(()),
        }
    }
}

fn newest_first<T: Clone>(records: &[T], date: impl Fn(&T) -> &str, top: usize) -> Vec<T> {
    let mut sorted = records.to_vec();
    sorted.sort_by(|a, b| date(b).cmp(date(a)));
    sorted.truncate(top);
    sorted
}

#[async_trait]
impl DataSource for StaticSource {
    async fn fetch_cash(&self, top: usize) -> Result<Vec<DailyCashRecord>> {
        self.record(SeriesRequest::Cash(top))?;
        Ok(newest_first(&self.cash, |r| r.date.as_str(), top))
    }

    async fn fetch_settlement(&self, top: usize) -> Result<Vec<DailySettlementRecord>> {
        self.record(SeriesRequest::Settlement(top))?;
        Ok(newest_first(&self.settlement, |r| r.date.as_str(), top))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_cash_envelope_with_numeric_denomination() {
        let body = br#"{"@odata.context":"x","value":[
            {"Data":"2022-09-15","Quantidade":120,"Valor":240.0,"Denominacao":"2.00","Especie":"Cedulas"},
            {"Data":"2022-09-15","Quantidade":3,"Valor":150.0,"Denominacao":50}
        ]}"#;
        let records: Vec<DailyCashRecord> = decode_envelope(body).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].denomination, "2.00");
        assert_eq!(records[1].denomination, "50.00");
        assert_eq!(records[1].kind, None);
    }

    #[test]
    fn missing_fields_are_a_schema_mismatch() {
        let body = br#"{"value":[{"Data":"2022-09-15","Total":1.5}]}"#;
        let err = decode_envelope::<DailySettlementRecord>(body).unwrap_err();
        assert!(matches!(err, CirculanteError::UpstreamSchemaMismatch(_)));

        let err = decode_envelope::<DailySettlementRecord>(b"<html>").unwrap_err();
        assert!(matches!(err, CirculanteError::UpstreamSchemaMismatch(_)));
    }

    #[test]
    fn query_url_orders_newest_first() {
        assert_eq!(
            OlindaClient::query_url("https://host/odata/series", 28),
            "https://host/odata/series?$top=28&$format=json&$orderby=Data%20desc"
        );
    }
}
