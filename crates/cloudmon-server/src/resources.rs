//! Resource snapshots written by the resource-model layer, one JSON file
//! per account.

use crate::config::AccountConfig;
use anyhow::Context;
use cloudmon_cloud::collector::KindResources;
use cloudmon_common::resource::{AccountDetail, ResourceDetail, ResourceKind, ResourceMap};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Default, Deserialize)]
pub struct ResourceSnapshot {
    #[serde(default)]
    pub account: Option<AccountDetail>,
    #[serde(default)]
    pub resources: BTreeMap<ResourceKind, Vec<ResourceDetail>>,
}

impl ResourceSnapshot {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read resource snapshot {}", path.display()))?;
        let snapshot = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse resource snapshot {}", path.display()))?;
        Ok(snapshot)
    }

    /// Resources keyed by external id; entries without one cannot be joined and are dropped.
    pub fn kind_resources(&self) -> KindResources {
        self.resources
            .iter()
            .map(|(kind, list)| {
                let map: ResourceMap = list
                    .iter()
                    .filter(|res| {
                        if res.external_id.is_empty() {
                            tracing::warn!(kind = %kind, id = %res.id, "Resource without external id dropped");
                            return false;
                        }
                        true
                    })
                    .map(|res| (res.external_id.clone(), res.clone()))
                    .collect();
                (*kind, map)
            })
            .collect()
    }

    /// The snapshot's account detail, or a bare one built from `account`.
    pub fn account_detail(&self, account: &AccountConfig) -> AccountDetail {
        self.account.clone().unwrap_or_else(|| AccountDetail {
            id: account.id.clone(),
            name: account.name.clone(),
            provider: account.provider.clone(),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn account() -> AccountConfig {
        AccountConfig {
            provider: "aws".to_string(),
            id: "acc-1".to_string(),
            name: "prod".to_string(),
            sdk_endpoint: "http://gateway".to_string(),
            sdk_token: None,
            resources_file: String::new(),
        }
    }

    #[test]
    fn test_key_resources_by_external_id() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
  "resources": {{
    "server": [
      {{"id": "vm-1", "name": "web", "external_id": "i-1", "region_external_id": "r1",
        "metric_tags": {{"vm_id": "vm-1"}}, "metric_pairs": {{"vm_name": "web"}}}},
      {{"id": "vm-2", "name": "orphan", "external_id": ""}}
    ],
    "storage": [{{"id": "st-1", "name": "ssd", "external_id": "st-1"}}]
  }}
}}"#
        )
        .unwrap();

        let snapshot = ResourceSnapshot::load(file.path()).unwrap();
        let kinds = snapshot.kind_resources();
        let servers = &kinds[&ResourceKind::Server];
        assert_eq!(servers.len(), 1);
        assert_eq!(servers["i-1"].region_ext_id, "r1");
        assert_eq!(kinds[&ResourceKind::Storage].len(), 1);
        assert_eq!(snapshot.account_detail(&account()).id, "acc-1");
    }

    #[test]
    fn test_report_path_when_snapshot_is_invalid() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let err = ResourceSnapshot::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse resource snapshot"));
    }
}
