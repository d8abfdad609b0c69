use crate::error::{CloudError, Result};
use crate::job::Job;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cloudmon_common::resource::ResourceKind;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

/// Resource type vocabulary understood by provider SDKs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricResourceType {
    Server,
    Host,
    Rds,
    Redis,
    Bucket,
    Lb,
    K8s,
    Storage,
    Eip,
    ModelartsPool,
}

impl From<ResourceKind> for MetricResourceType {
    fn from(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::Server => MetricResourceType::Server,
            ResourceKind::Host => MetricResourceType::Host,
            ResourceKind::DbInstance => MetricResourceType::Rds,
            ResourceKind::Redis => MetricResourceType::Redis,
            ResourceKind::Bucket => MetricResourceType::Bucket,
            ResourceKind::Loadbalancer => MetricResourceType::Lb,
            ResourceKind::K8s => MetricResourceType::K8s,
            ResourceKind::Storage => MetricResourceType::Storage,
            ResourceKind::Eip => MetricResourceType::Eip,
            ResourceKind::ModelartsPool => MetricResourceType::ModelartsPool,
        }
    }
}

/// A metric identifier of the form `family.field`.
///
/// The family becomes the measurement name and the field becomes the
/// metric key of every sample built from this type.
///
/// ```rust
/// use cloudmon_cloud::sdk::MetricType;
///
/// let mt = MetricType::new("vm_cpu.usage_active");
/// assert_eq!(mt.name(), "vm_cpu");
/// assert_eq!(mt.key(), "usage_active");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricType(Cow<'static, str>);

impl MetricType {
    pub const fn from_static(s: &'static str) -> Self {
        Self(Cow::Borrowed(s))
    }

    pub fn new(s: impl Into<String>) -> Self {
        Self(Cow::Owned(s.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Measurement family, the part before the first dot.
    pub fn name(&self) -> &str {
        self.0.split_once('.').map_or(&self.0, |(name, _)| name)
    }

    /// Metric field, the part after the first dot (`value` when there is none).
    pub fn key(&self) -> &str {
        self.0.split_once('.').map_or("value", |(_, key)| key)
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Query handed to [`ProviderSdk::list_metrics`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricListOptions {
    pub resource_type: MetricResourceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric_type: Option<MetricType>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub region_ext_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub resource_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resource_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,
}

impl MetricListOptions {
    pub fn new(
        resource_type: MetricResourceType,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Self {
        Self {
            resource_type,
            metric_type: None,
            start_time,
            end_time,
            region_ext_id: String::new(),
            resource_id: String::new(),
            resource_ids: Vec::new(),
            os_type: None,
            engine: None,
        }
    }
}

/// One point of a [`MetricSeries`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricValue {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    /// Point tags such as a device or mount point.
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl MetricValue {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self {
            timestamp,
            value,
            tags: BTreeMap::new(),
        }
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }
}

/// Values of one metric type for one resource, keyed by its external id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSeries {
    pub id: String,
    pub metric_type: MetricType,
    #[serde(default)]
    pub values: Vec<MetricValue>,
}

/// The per-vendor metric capability.
///
/// Implementations own their HTTP plumbing; collectors only see
/// normalized series.
#[async_trait]
pub trait ProviderSdk: Send + Sync {
    /// Returns the metric series matching `opts`.
    async fn list_metrics(&self, opts: &MetricListOptions) -> Result<Vec<MetricSeries>>;

    /// Fetches an asynchronous vendor job, see [`crate::job::wait_job_success`].
    async fn get_job(&self, _service: &str, _region: &str, job_id: &str) -> Result<Job> {
        Err(CloudError::NotImplemented(format!("get job {job_id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_metric_type_into_name_and_key() {
        let mt = MetricType::from_static("vm_diskio.read_bps");
        assert_eq!(mt.name(), "vm_diskio");
        assert_eq!(mt.key(), "read_bps");

        let bare = MetricType::new("uptime");
        assert_eq!(bare.name(), "uptime");
        assert_eq!(bare.key(), "value");
    }

    #[test]
    fn test_serialize_options_without_empty_fields() {
        let start = DateTime::from_timestamp(0, 0).unwrap();
        let mut opts = MetricListOptions::new(MetricResourceType::Rds, start, start);
        opts.resource_id = "rds-1".to_string();

        let json = serde_json::to_value(&opts).unwrap();
        assert_eq!(json["resource_type"], "rds");
        assert_eq!(json["resource_id"], "rds-1");
        assert!(json.get("resource_ids").is_none());
        assert!(json.get("metric_type").is_none());
    }

    #[test]
    fn test_map_resource_kinds_to_sdk_types() {
        assert_eq!(
            MetricResourceType::from(ResourceKind::DbInstance),
            MetricResourceType::Rds
        );
        assert_eq!(
            MetricResourceType::from(ResourceKind::Loadbalancer),
            MetricResourceType::Lb
        );
    }
}
