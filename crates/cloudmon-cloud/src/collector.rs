//! Collection entry points: resolve the driver for a provider and run
//! it over each resource kind inside a delayed window.

use crate::driver::registry::DriverRegistry;
use crate::driver::{dispatch, CollectContext, CollectRequest, SdkRef};
use crate::error::{CloudError, Result};
use chrono::{DateTime, TimeDelta, Utc};
use cloudmon_common::resource::{AccountDetail, ProviderDetail, ResourceKind, ResourceMap};
use cloudmon_common::types::SampleRecord;
use std::collections::BTreeMap;
use std::time::Duration;

/// Overlap added to the window start so consecutive cycles never leave a gap.
pub const WINDOW_OVERLAP_SECS: i64 = 59;

/// Resources of one provider grouped by kind.
pub type KindResources = BTreeMap<ResourceKind, ResourceMap>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl CollectWindow {
    /// The window ending `delay` before `now` and reaching back one
    /// `interval` plus [`WINDOW_OVERLAP_SECS`].
    ///
    /// ```rust
    /// use chrono::{DateTime, TimeDelta};
    /// use cloudmon_cloud::collector::CollectWindow;
    /// use std::time::Duration;
    ///
    /// let now = DateTime::from_timestamp(3600, 0).unwrap();
    /// let w = CollectWindow::delayed(now, Duration::from_secs(360), Duration::from_secs(360));
    /// assert_eq!(w.end, now - TimeDelta::minutes(6));
    /// assert_eq!(w.start, now - TimeDelta::minutes(12) - TimeDelta::seconds(59));
    /// ```
    pub fn delayed(now: DateTime<Utc>, interval: Duration, delay: Duration) -> Self {
        let delay = TimeDelta::from_std(delay).unwrap_or(TimeDelta::zero());
        let interval = TimeDelta::from_std(interval).unwrap_or(TimeDelta::zero());
        Self {
            start: now - interval - delay - TimeDelta::seconds(WINDOW_OVERLAP_SECS),
            end: now - delay,
        }
    }
}

/// Whether `provider` appears in the skip list, compared case-insensitively.
pub fn is_skipped(skip_providers: &[String], provider: &str) -> bool {
    skip_providers
        .iter()
        .any(|p| p.eq_ignore_ascii_case(provider))
}

/// Collect one resource kind with the driver registered for `req.manager.provider`.
pub async fn collect_resource_metrics(
    registry: &DriverRegistry,
    req: CollectRequest<'_>,
) -> Result<()> {
    let driver = registry.get(&req.manager.provider)?;
    dispatch(driver.as_ref(), req).await
}

/// Collect every non-empty kind of one provider.
///
/// Drivers without metric support are skipped. Unimplemented kinds are
/// ignored and other per-kind failures are logged, so one failing kind
/// never stops the rest; only cancellation aborts the cycle.
pub async fn collect_provider_metrics(
    registry: &DriverRegistry,
    ctx: &CollectContext,
    manager: &ProviderDetail,
    sdk: &SdkRef,
    resources: &KindResources,
    now: DateTime<Utc>,
    interval: Duration,
) -> Result<()> {
    let driver = registry.get(&manager.provider)?;
    if !driver.supports_metrics() {
        tracing::debug!(
            provider = %manager.provider,
            "Provider does not support metrics, skipping"
        );
        return Ok(());
    }

    let window = CollectWindow::delayed(now, interval, driver.collect_delay());
    for kind in ResourceKind::ALL {
        let Some(kind_resources) = resources.get(&kind).filter(|r| !r.is_empty()) else {
            continue;
        };
        let req = CollectRequest {
            kind,
            ctx,
            manager,
            sdk,
            resources: kind_resources,
            start: window.start,
            end: window.end,
        };
        match dispatch(driver.as_ref(), req).await {
            Ok(()) => {}
            Err(e) if e.is_not_implemented() => {}
            Err(CloudError::Cancelled) => return Err(CloudError::Cancelled),
            Err(e) => {
                tracing::error!(
                    "Failed to collect {} metrics for {}({}): {}",
                    kind,
                    manager.name,
                    manager.id,
                    e
                );
            }
        }
    }
    Ok(())
}

/// One account sample per account whose driver can produce it.
pub async fn collect_account_metrics(
    registry: &DriverRegistry,
    accounts: &[AccountDetail],
) -> Vec<SampleRecord> {
    let mut records = Vec::new();
    for account in accounts {
        let driver = match registry.get(&account.provider) {
            Ok(driver) => driver,
            Err(e) => {
                tracing::warn!(account = %account.name, error = %e, "Skipping account metrics");
                continue;
            }
        };
        match driver.collect_account_metrics(account).await {
            Ok(record) => records.push(record),
            Err(e) if e.is_not_implemented() => {}
            Err(e) => {
                tracing::warn!(account = %account.name, error = %e, "Failed to collect account metrics");
            }
        }
    }
    records
}
