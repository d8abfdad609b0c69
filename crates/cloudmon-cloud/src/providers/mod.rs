//! Built-in collect drivers.
//!
//! Most vendors are a [`StandardDriver`] around one shared strategy;
//! `huawei` and `zstack` carry vendor-specific behavior.

pub mod huawei;
pub mod standard;
pub mod zstack;

use crate::driver::batched::BatchedByRegionStrategy;
use crate::driver::by_metric_type::ByMetricTypeStrategy;
use crate::driver::by_resource::ByResourceIdStrategy;
use crate::driver::poll::PollStrategy;
use crate::driver::registry::DriverRegistry;
use std::sync::Arc;
use std::time::Duration;

pub use huawei::HuaweiDriver;
pub use standard::StandardDriver;

const BY_RESOURCE_ID_PROVIDERS: &[&str] = &[
    "aws",
    "azure",
    "google",
    "hcs",
    "hcso",
    "oracle",
    "jdcloud",
    "ecloud",
    "bingocloud",
];

/// Private-cloud providers whose monitoring catches up faster.
const SHORT_DELAY_PROVIDERS: &[&str] = &["esxi", "cloudpods"];

pub fn register_all(registry: &mut DriverRegistry) {
    for provider in ["aliyun", "apsara"] {
        registry.register(Arc::new(StandardDriver::new(
            provider,
            ByMetricTypeStrategy::new(),
        )));
    }
    registry.register(Arc::new(zstack::driver()));

    for provider in BY_RESOURCE_ID_PROVIDERS {
        registry.register(Arc::new(StandardDriver::new(*provider, ByResourceIdStrategy)));
    }
    for provider in SHORT_DELAY_PROVIDERS {
        registry.register(Arc::new(
            StandardDriver::new(*provider, ByResourceIdStrategy)
                .with_delay(Duration::from_secs(3 * 60)),
        ));
    }
    registry.register(Arc::new(HuaweiDriver::new()));

    for provider in ["qcloud", "ctyun"] {
        registry.register(Arc::new(StandardDriver::new(
            provider,
            BatchedByRegionStrategy::new(),
        )));
    }
    registry.register(Arc::new(StandardDriver::new(
        "volcengine",
        BatchedByRegionStrategy::per_metric_type(),
    )));

    registry.register(Arc::new(
        StandardDriver::new("h3c", PollStrategy).with_delay(Duration::from_secs(4 * 60)),
    ));
}

#[cfg(test)]
mod tests {
    use crate::driver::registry::DriverRegistry;
    use crate::driver::DEFAULT_COLLECT_DELAY;
    use std::time::Duration;

    #[test]
    fn test_register_every_builtin_provider() {
        let registry = DriverRegistry::default();
        for provider in [
            "aliyun", "apsara", "zstack", "aws", "azure", "google", "huawei", "hcs", "hcso",
            "esxi", "cloudpods", "oracle", "jdcloud", "ecloud", "bingocloud", "qcloud", "ctyun",
            "volcengine", "h3c",
        ] {
            let driver = registry.get(provider).unwrap();
            assert_eq!(driver.provider(), provider);
            assert!(driver.supports_metrics(), "{provider} should support metrics");
        }
    }

    #[test]
    fn test_apply_vendor_collect_delays() {
        let registry = DriverRegistry::default();
        let delay = |p: &str| registry.get(p).unwrap().collect_delay();

        assert_eq!(delay("aws"), DEFAULT_COLLECT_DELAY);
        assert_eq!(delay("esxi"), Duration::from_secs(180));
        assert_eq!(delay("cloudpods"), Duration::from_secs(180));
        assert_eq!(delay("h3c"), Duration::from_secs(240));
        assert_eq!(delay("zstack"), Duration::from_secs(240));
    }
}
