//! Prometheus HTTP API adapter.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use reqwest::{Client, Url};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use super::{http_error, items, json_body, AdapterError};
use crate::config::PrometheusConfig;
use crate::envelope::Envelope;
use crate::registry::BuildContext;
use crate::tool::{bind, OperationSpec, Toolset};

pub const RUN_PROMQL_QUERY: OperationSpec = OperationSpec::read(
    "run_promql_query",
    "Run an instant PromQL query (e.g. avg(rate(container_cpu_usage_seconds_total[5m]))) and return the raw result series.",
);

#[derive(Debug, Deserialize, JsonSchema)]
pub struct PromqlParams {
    #[schemars(description = "PromQL expression to evaluate")]
    pub query: String,
}

pub struct PrometheusAdapter {
    client: Client,
    base: String,
    auth: Option<(String, Option<String>)>,
}

impl PrometheusAdapter {
    pub fn new(config: &PrometheusConfig) -> anyhow::Result<Self> {
        let base = config.url.trim().trim_end_matches('/');
        anyhow::ensure!(!base.is_empty(), "prometheus.url is not set");
        Url::parse(base).with_context(|| format!("invalid prometheus.url: {base}"))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            base: base.to_string(),
            auth: config
                .username
                .clone()
                .map(|user| (user, config.password.clone())),
        })
    }

    fn query_url(&self, query: &str) -> Result<Url, AdapterError> {
        let mut url = Url::parse(&format!("{}/api/v1/query", self.base))
            .map_err(|e| AdapterError::invalid(format!("invalid Prometheus URL: {e}")))?;
        url.query_pairs_mut().append_pair("query", query);
        Ok(url)
    }

    /// Instant query. No series is an empty result, not an error.
    pub async fn run_promql_query(&self, query: &str) -> Result<Envelope, AdapterError> {
        if query.trim().is_empty() {
            return Err(AdapterError::invalid("query must not be empty"));
        }

        let mut request = self.client.get(self.query_url(query)?);
        if let Some((user, password)) = &self.auth {
            request = request.basic_auth(user, password.as_deref());
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(http_error(response).await);
        }

        let body = json_body(response).await?;
        if body["status"] != "success" {
            let message = body["error"].as_str().unwrap_or("unknown error");
            return Err(AdapterError::Parse(format!("Prometheus error: {message}")));
        }

        match &body["data"]["result"] {
            Value::Array(_) => Ok(Envelope::records(items(&body, "/data/result").to_vec())),
            // scalar and string results are a single [time, value] pair
            Value::Null => Ok(Envelope::empty()),
            other => Ok(Envelope::record(serde_json::json!({
                "result_type": body["data"]["resultType"],
                "value": other,
            }))),
        }
    }
}

pub fn toolset(ctx: &BuildContext) -> anyhow::Result<Toolset> {
    let adapter = Arc::new(PrometheusAdapter::new(&ctx.config.prometheus)?);
    Ok(vec![bind(&adapter, RUN_PROMQL_QUERY, |a, p: PromqlParams| async move {
        a.run_promql_query(&p.query).await
    })])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_is_url_encoded() {
        let adapter = PrometheusAdapter::new(&PrometheusConfig {
            url: "http://prometheus:9090/".into(),
            ..Default::default()
        })
        .unwrap();
        let url = adapter.query_url("sum(rate(x[5m])) by (pod)").unwrap();
        assert_eq!(url.path(), "/api/v1/query");
        let (key, value) = url.query_pairs().next().unwrap();
        assert_eq!(key, "query");
        assert_eq!(value, "sum(rate(x[5m])) by (pod)");
    }

    #[test]
    fn blank_url_fails_construction() {
        let config = PrometheusConfig {
            url: " ".into(),
            ..Default::default()
        };
        assert!(PrometheusAdapter::new(&config).is_err());
    }
}
