use crate::driver::by_resource::ByResourceIdStrategy;
use crate::driver::{CollectContext, CollectDriver, CollectRequest, CollectStrategy, SdkRef};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cloudmon_common::resource::{ProviderDetail, ResourceKind, ResourceMap};

/// Per-resource collection plus elastic IP and ModelArts pool metrics.
#[derive(Debug, Default)]
pub struct HuaweiDriver {
    strategy: ByResourceIdStrategy,
}

impl HuaweiDriver {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CollectDriver for HuaweiDriver {
    fn provider(&self) -> &str {
        "huawei"
    }

    fn supports_metrics(&self) -> bool {
        true
    }

    fn strategy(&self) -> Option<&dyn CollectStrategy> {
        Some(&self.strategy)
    }

    async fn collect_eip_metrics(
        &self,
        ctx: &CollectContext,
        manager: &ProviderDetail,
        sdk: &SdkRef,
        resources: &ResourceMap,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<()> {
        self.strategy
            .collect(CollectRequest {
                kind: ResourceKind::Eip,
                ctx,
                manager,
                sdk,
                resources,
                start,
                end,
            })
            .await
    }

    async fn collect_modelarts_pool_metrics(
        &self,
        ctx: &CollectContext,
        manager: &ProviderDetail,
        sdk: &SdkRef,
        resources: &ResourceMap,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<()> {
        self.strategy
            .collect(CollectRequest {
                kind: ResourceKind::ModelartsPool,
                ctx,
                manager,
                sdk,
                resources,
                start,
                end,
            })
            .await
    }
}
