use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Capability shared by every resource detail that feeds the collectors.
///
/// `metric_tags` become sample tags, `metric_pairs` are folded into the
/// metric pairs of every sample emitted for the resource. Both return
/// fresh copies; callers are free to consume them.
pub trait MetricDetail {
    fn metric_tags(&self) -> BTreeMap<String, String>;

    fn metric_pairs(&self) -> BTreeMap<String, String>;
}

/// Resource kinds a collect driver knows how to handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Server,
    Host,
    DbInstance,
    Redis,
    Bucket,
    Loadbalancer,
    K8s,
    Storage,
    Eip,
    ModelartsPool,
}

impl ResourceKind {
    /// Every kind, in the order a collection cycle visits them.
    pub const ALL: [ResourceKind; 10] = [
        ResourceKind::DbInstance,
        ResourceKind::Server,
        ResourceKind::Host,
        ResourceKind::Storage,
        ResourceKind::Redis,
        ResourceKind::Loadbalancer,
        ResourceKind::Bucket,
        ResourceKind::K8s,
        ResourceKind::ModelartsPool,
        ResourceKind::Eip,
    ];

    /// Short name used in log lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Server => "server",
            ResourceKind::Host => "host",
            ResourceKind::DbInstance => "rds",
            ResourceKind::Redis => "redis",
            ResourceKind::Bucket => "bucket",
            ResourceKind::Loadbalancer => "slb",
            ResourceKind::K8s => "k8s",
            ResourceKind::Storage => "storage",
            ResourceKind::Eip => "eip",
            ResourceKind::ModelartsPool => "modelarts_pool",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved resource as handed over by the resource-model layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceDetail {
    pub id: String,
    pub name: String,
    pub external_id: String,
    #[serde(default, alias = "region_external_id")]
    pub region_ext_id: String,
    /// Compute instances only
    #[serde(default)]
    pub os_type: Option<String>,
    /// Compute instances only; total disk size in MiB
    #[serde(default)]
    pub disk_size_mb: i64,
    /// DB instances only
    #[serde(default)]
    pub engine: Option<String>,
    /// K8s clusters only; empty when the cluster is not mirrored locally
    #[serde(default)]
    pub external_cluster_id: Option<String>,
    #[serde(default)]
    pub metric_tags: BTreeMap<String, String>,
    #[serde(default)]
    pub metric_pairs: BTreeMap<String, String>,
}

impl MetricDetail for ResourceDetail {
    fn metric_tags(&self) -> BTreeMap<String, String> {
        self.metric_tags.clone()
    }

    fn metric_pairs(&self) -> BTreeMap<String, String> {
        self.metric_pairs.clone()
    }
}

/// Resources of one kind owned by one cloud provider, keyed by external id.
pub type ResourceMap = HashMap<String, ResourceDetail>;

/// Cloud account detail, used for account-level metrics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountDetail {
    pub id: String,
    pub name: String,
    pub provider: String,
    #[serde(default)]
    pub metric_tags: BTreeMap<String, String>,
    #[serde(default)]
    pub metric_pairs: BTreeMap<String, String>,
}

impl MetricDetail for AccountDetail {
    fn metric_tags(&self) -> BTreeMap<String, String> {
        self.metric_tags.clone()
    }

    fn metric_pairs(&self) -> BTreeMap<String, String> {
        self.metric_pairs.clone()
    }
}

/// The cloud provider (one account's connection) a collection runs for.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderDetail {
    pub id: String,
    pub name: String,
    /// Provider tag, e.g. "aliyun"
    pub provider: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_resource_with_optional_fields_missing() {
        let res: ResourceDetail = serde_json::from_value(serde_json::json!({
            "id": "vm-1",
            "name": "web",
            "external_id": "ext-vm-1",
            "region_external_id": "cn-1",
            "metric_tags": {"host": "h1"}
        }))
        .expect("resource should parse");

        assert_eq!(res.region_ext_id, "cn-1");
        assert_eq!(res.disk_size_mb, 0);
        assert!(res.os_type.is_none());
        assert_eq!(res.metric_tags().get("host").map(String::as_str), Some("h1"));
        assert!(res.metric_pairs().is_empty());
    }

    #[test]
    fn test_return_independent_copies_of_tags() {
        let mut res = ResourceDetail::default();
        res.metric_tags.insert("zone".into(), "z1".into());

        let mut tags = res.metric_tags();
        tags.insert("zone".into(), "z2".into());

        assert_eq!(res.metric_tags["zone"], "z1");
    }

    #[test]
    fn test_name_kinds_for_logging() {
        assert_eq!(ResourceKind::DbInstance.to_string(), "rds");
        assert_eq!(ResourceKind::Loadbalancer.as_str(), "slb");
        assert_eq!(ResourceKind::ALL.len(), 10);
    }
}
