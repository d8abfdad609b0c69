//! [`ProviderSdk`] over a vendor metric gateway speaking plain JSON.
//!
//! The gateway hides vendor signing and paging behind two endpoints:
//! `POST {endpoint}/v1/metrics` and `GET {endpoint}/v1/jobs/{id}`.

use crate::client::{ApiRequest, SdkClient};
use crate::error::{CloudError, Result};
use crate::job::Job;
use crate::sdk::{MetricListOptions, MetricSeries, ProviderSdk};
use async_trait::async_trait;
use serde::Deserialize;

pub struct GatewaySdk {
    endpoint: String,
    client: SdkClient,
}

#[derive(Debug, Default, Deserialize)]
struct ListMetricsResponse {
    #[serde(default)]
    metrics: Vec<MetricSeries>,
}

impl GatewaySdk {
    pub fn new(endpoint: impl Into<String>, client: SdkClient) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            client,
        }
    }
}

/// The gateway answers 501 for metric families the vendor does not publish.
fn unimplemented_as_not_implemented(err: CloudError) -> CloudError {
    match err {
        CloudError::HttpError {
            status: 501, url, ..
        } => CloudError::NotImplemented(url),
        other => other,
    }
}

#[async_trait]
impl ProviderSdk for GatewaySdk {
    async fn list_metrics(&self, opts: &MetricListOptions) -> Result<Vec<MetricSeries>> {
        let request = ApiRequest::post(
            format!("{}/v1/metrics", self.endpoint),
            serde_json::to_value(opts)?,
        );
        let body = self
            .client
            .request(&request)
            .await
            .map_err(unimplemented_as_not_implemented)?;
        if body.is_null() {
            return Ok(Vec::new());
        }
        let response: ListMetricsResponse = serde_json::from_value(body)?;
        Ok(response.metrics)
    }

    async fn get_job(&self, service: &str, region: &str, job_id: &str) -> Result<Job> {
        let request = ApiRequest::get(format!("{}/v1/jobs/{}", self.endpoint, job_id))
            .with_query("service", service)
            .with_query("region", region);
        let body = self
            .client
            .request(&request)
            .await
            .map_err(unimplemented_as_not_implemented)?;
        Ok(serde_json::from_value(body)?)
    }
}
