pub mod client;
pub mod collector;
pub mod driver;
pub mod error;
pub mod gateway;
pub mod job;
pub mod metric_types;
pub mod providers;
pub mod sdk;


pub use collector::{collect_provider_metrics, collect_resource_metrics, CollectWindow};
pub use driver::registry::DriverRegistry;
pub use driver::{CollectContext, CollectDriver, CollectRequest, CollectStrategy};
pub use error::{CloudError, Result};
pub use sdk::{MetricListOptions, MetricSeries, MetricType, MetricValue, ProviderSdk};
