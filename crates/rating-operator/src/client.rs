//! Rating API client
//!
//! Implements the engine's collaborator traits over the rating API. Every
//! request carries the admin token: as a query parameter on GET, as a body
//! field on POST.

use anyhow::{anyhow, bail, Context};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rating_common::{FrameRow, RatedBatch};
use rating_engine::catalog::parse_timestamp;
use rating_engine::{FrameQuery, FrameSource, LabelSource, RatedSink, RatingHistory};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::{debug, instrument};

/// Timestamp format understood by the frame and rated endpoints
const API_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Responses wrap their payload in `results`
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    results: Option<T>,
}

#[derive(Debug, Deserialize)]
struct Column {
    column_name: String,
}

#[derive(Debug, Deserialize)]
struct LastRated {
    last_insert: Value,
}

/// HTTP client for the rating API
#[derive(Debug, Clone)]
pub struct RatingApiClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl RatingApiClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    /// Catalog versions stored by the API, as raw documents
    #[instrument(skip(self))]
    pub async fn list_configurations(&self) -> anyhow::Result<Vec<Value>> {
        let configurations: Vec<Value> = self.get("/ratingrules/list/local", Vec::new()).await?;
        Ok(configurations.into_iter().map(flatten_configuration).collect())
    }

    async fn get<T: DeserializeOwned + Default>(
        &self,
        endpoint: &str,
        mut params: Vec<(String, String)>,
    ) -> anyhow::Result<T> {
        params.push(("token".to_string(), self.token.clone()));

        let url = format!("{}{}", self.base_url, endpoint);
        debug!(%url, "GET");
        let response = self
            .http
            .get(&url)
            .query(&params)
            .send()
            .await
            .with_context(|| format!("GET {} failed", endpoint))?
            .error_for_status()
            .with_context(|| format!("GET {} returned an error status", endpoint))?;

        let envelope: Envelope<T> = response
            .json()
            .await
            .with_context(|| format!("GET {} returned an invalid body", endpoint))?;
        Ok(envelope.results.unwrap_or_default())
    }

    async fn post(&self, endpoint: &str, mut payload: Map<String, Value>) -> anyhow::Result<Value> {
        payload.insert("token".to_string(), Value::String(self.token.clone()));

        let url = format!("{}{}", self.base_url, endpoint);
        debug!(%url, "POST");
        let response = self
            .http
            .post(&url)
            .json(&payload)
            .send()
            .await
            .with_context(|| format!("POST {} failed", endpoint))?;

        match response.status() {
            StatusCode::BAD_REQUEST => {
                let body = response.text().await.unwrap_or_default();
                bail!("POST {} rejected: {}", endpoint, body)
            }
            StatusCode::NOT_FOUND => bail!("POST {}: not found", endpoint),
            status if !status.is_success() => bail!("POST {} returned {}", endpoint, status),
            _ => {}
        }

        response
            .json()
            .await
            .with_context(|| format!("POST {} returned an invalid body", endpoint))
    }
}

#[async_trait]
impl LabelSource for RatingApiClient {
    async fn table_columns(&self, table: &str) -> anyhow::Result<Vec<String>> {
        let columns: Vec<Column> = self
            .get(&format!("/presto/{}/columns", table), Vec::new())
            .await?;
        Ok(columns.into_iter().map(|c| c.column_name).collect())
    }
}

#[async_trait]
impl FrameSource for RatingApiClient {
    async fn frames(&self, query: &FrameQuery) -> anyhow::Result<Vec<FrameRow>> {
        let params = vec![
            ("labels".to_string(), label_projection(&query.labels)),
            ("column".to_string(), query.column.clone()),
            ("start".to_string(), format_timestamp(&query.begin)),
            ("end".to_string(), format_timestamp(&query.end)),
        ];
        let rows: Vec<Value> = self
            .get(&format!("/presto/{}/frames", query.table), params)
            .await?;

        rows.into_iter()
            .map(|row| match row {
                Value::Object(map) => Ok(map),
                other => Err(anyhow!("frame is not an object: {}", other)),
            })
            .collect()
    }
}

#[async_trait]
impl RatedSink for RatingApiClient {
    async fn emit(&self, batch: RatedBatch) -> anyhow::Result<()> {
        let rated_frames: Vec<Value> = batch
            .rated_records
            .iter()
            .map(|r| {
                json!([
                    r.frame_begin,
                    r.frame_end,
                    r.namespace,
                    r.node,
                    r.metric,
                    r.pod,
                    r.converted_quantity,
                    r.rated_amount,
                    r.matched_label_set
                ])
            })
            .collect();

        let mut payload = Map::new();
        payload.insert("rated_frames".into(), Value::Array(rated_frames));
        payload.insert("rated_namespaces".into(), json!(batch.distinct_namespaces));
        payload.insert("report_name".into(), json!(batch.report_name));
        payload.insert("metric".into(), json!(batch.metric_name));
        payload.insert(
            "last_insert".into(),
            json!(format_timestamp(&batch.run_timestamp)),
        );

        self.post("/rated/frames/add", payload).await?;
        Ok(())
    }
}

#[async_trait]
impl RatingHistory for RatingApiClient {
    async fn last_rated(&self, report_name: &str) -> anyhow::Result<Option<DateTime<Utc>>> {
        let results: Vec<LastRated> = self
            .get(&format!("/reports/{}/last_rated", report_name), Vec::new())
            .await?;

        match results.first() {
            None => Ok(None),
            Some(entry) => parse_last_insert(&entry.last_insert)
                .map(Some)
                .ok_or_else(|| anyhow!("unreadable last_insert: {}", entry.last_insert)),
        }
    }
}

/// Extra columns selected by the frame query, as `, a, b`
fn label_projection(labels: &[String]) -> String {
    labels.iter().map(|label| format!(", {}", label)).collect()
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(API_TIMESTAMP_FORMAT).to_string()
}

/// `last_insert` comes back as an HTTP date (`Wed, 18 Dec 2019 10:05:50 GMT`)
fn parse_last_insert(raw: &Value) -> Option<DateTime<Utc>> {
    match raw {
        Value::Null => None,
        Value::String(s) => DateTime::parse_from_rfc2822(s)
            .map(|ts| ts.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                chrono::NaiveDateTime::parse_from_str(s, API_TIMESTAMP_FORMAT)
                    .ok()
                    .map(|naive| naive.and_utc())
            })
            .or_else(|| parse_timestamp(raw)),
        other => parse_timestamp(other),
    }
}

/// The API nests definitions as `metrics.metrics` and `rules.rules`
fn flatten_configuration(mut configuration: Value) -> Value {
    if let Value::Object(map) = &mut configuration {
        for key in ["metrics", "rules"] {
            let nested = map
                .get_mut(key)
                .and_then(|inner| inner.as_object_mut())
                .and_then(|inner| inner.remove(key));
            if let Some(inner) = nested {
                map.insert(key.to_string(), inner);
            }
        }
    }
    configuration
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rating_common::RatedRecord;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[tokio::test]
    async fn test_table_columns() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/presto/report_cpu/columns"))
            .and(query_param("token", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [{"column_name": "period_start"}, {"column_name": "instance_type"}]
            })))
            .mount(&server)
            .await;

        let client = RatingApiClient::new(server.uri(), "secret").unwrap();
        let columns = client.table_columns("report_cpu").await.unwrap();
        assert_eq!(columns, vec!["period_start", "instance_type"]);
    }

    #[tokio::test]
    async fn test_frames_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/presto/report_cpu/frames"))
            .and(query_param("labels", ", instance_type, zone"))
            .and(query_param("column", "pod_usage_cpu_core_seconds"))
            .and(query_param("start", "2019-12-18 10:05:50.000"))
            .and(query_param("token", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [{"pod": "web-1", "pod_usage_cpu_core_seconds": 10}]
            })))
            .mount(&server)
            .await;

        let client = RatingApiClient::new(server.uri(), "secret").unwrap();
        let query = FrameQuery {
            table: "report_cpu".into(),
            column: "pod_usage_cpu_core_seconds".into(),
            labels: vec!["instance_type".into(), "zone".into()],
            begin: at(1_576_663_550),
            end: at(1_576_675_754),
        };
        let rows = client.frames(&query).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["pod"], "web-1");
    }

    #[tokio::test]
    async fn test_missing_results_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/reports/pod-cpu/last_rated"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let client = RatingApiClient::new(server.uri(), "secret").unwrap();
        assert_eq!(client.last_rated("pod-cpu").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_last_rated_http_date() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/reports/pod-cpu/last_rated"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [{"last_insert": "Wed, 18 Dec 2019 10:05:50 GMT"}]
            })))
            .mount(&server)
            .await;

        let client = RatingApiClient::new(server.uri(), "secret").unwrap();
        assert_eq!(
            client.last_rated("pod-cpu").await.unwrap(),
            Some(at(1_576_663_550))
        );
    }

    #[tokio::test]
    async fn test_emit_injects_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rated/frames/add"))
            .and(body_partial_json(json!({
                "token": "secret",
                "report_name": "pod-cpu-usage-hourly",
                "metric": "usage_cpu",
                "rated_namespaces": ["ns1"]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": "ok"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = RatingApiClient::new(server.uri(), "secret").unwrap();
        let mut batch = RatedBatch::new("pod-cpu-usage-hourly", "usage_cpu", at(1_576_663_550));
        batch.push(RatedRecord {
            frame_begin: "2019-12-18 10:00:00.000".into(),
            frame_end: "2019-12-18 11:00:00.000".into(),
            namespace: "ns1".into(),
            node: "node-a".into(),
            metric: "usage_cpu".into(),
            pod: "web-1".into(),
            converted_quantity: 1.0,
            rated_amount: None,
            matched_label_set: "{}".into(),
        });
        client.emit(batch).await.unwrap();
    }

    #[tokio::test]
    async fn test_rejected_post() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rated/frames/add"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad frames"))
            .mount(&server)
            .await;

        let client = RatingApiClient::new(server.uri(), "secret").unwrap();
        let batch = RatedBatch::new("r", "m", at(0));
        let err = client.emit(batch).await.unwrap_err();
        assert!(err.to_string().contains("bad frames"));
    }

    #[tokio::test]
    async fn test_server_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = RatingApiClient::new(server.uri(), "secret").unwrap();
        assert!(client.table_columns("t").await.is_err());
    }

    #[test]
    fn test_flatten_configuration() {
        let flat = flatten_configuration(json!({
            "valid_from": "1576663550",
            "metrics": {"metrics": {"usage_cpu": {}}},
            "rules": {"rules": [{"ruleset": []}]}
        }));
        assert!(flat["metrics"]["usage_cpu"].is_object());
        assert!(flat["rules"].is_array());
    }

    #[test]
    fn test_parse_last_insert_formats() {
        assert_eq!(
            parse_last_insert(&json!("2019-12-18 10:05:50.000")),
            Some(at(1_576_663_550))
        );
        assert_eq!(parse_last_insert(&json!(1_576_663_550)), Some(at(1_576_663_550)));
        assert_eq!(parse_last_insert(&Value::Null), None);
    }
}
