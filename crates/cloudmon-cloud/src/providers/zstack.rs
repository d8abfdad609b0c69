use super::StandardDriver;
use crate::driver::by_metric_type::ByMetricTypeStrategy;
use crate::driver::MetricAdjust;
use crate::metric_types::VM_DISK_USAGE;
use crate::sdk::MetricType;
use chrono::{DateTime, TimeDelta, Utc};
use cloudmon_common::resource::ResourceDetail;
use std::time::Duration;

/// ZStack only publishes disk usage every 30 minutes, and in bytes.
pub const DISK_USAGE_SHIFT_MINUTES: i64 = 30;

#[derive(Debug, Default, Clone, Copy)]
pub struct DiskUsageAdjust;

impl MetricAdjust for DiskUsageAdjust {
    fn window(
        &self,
        metric_type: &MetricType,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> (DateTime<Utc>, DateTime<Utc>) {
        if *metric_type != VM_DISK_USAGE {
            return (start, end);
        }
        let shift = TimeDelta::minutes(DISK_USAGE_SHIFT_MINUTES);
        (start - shift, end - shift)
    }

    /// Bytes used to percent of the declared disk size.
    fn value(&self, metric_type: &MetricType, resource: &ResourceDetail, value: f64) -> f64 {
        if *metric_type != VM_DISK_USAGE {
            return value;
        }
        let (size_mb, value) = if resource.disk_size_mb <= 0 {
            (1, 0.0)
        } else {
            (resource.disk_size_mb, value)
        };
        value / 1024.0 / 1024.0 / size_mb as f64 * 100.0
    }
}

pub fn driver() -> StandardDriver {
    StandardDriver::new("zstack", ByMetricTypeStrategy::with_adjust(DiskUsageAdjust))
        .with_delay(Duration::from_secs(4 * 60))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric_types::VM_CPU_USAGE;

    #[test]
    fn test_shift_only_disk_usage_window() {
        let end = DateTime::from_timestamp(7200, 0).unwrap();
        let start = end - TimeDelta::minutes(10);

        let (s, e) = DiskUsageAdjust.window(&VM_DISK_USAGE, start, end);
        assert_eq!(s, start - TimeDelta::minutes(30));
        assert_eq!(e, end - TimeDelta::minutes(30));

        assert_eq!(DiskUsageAdjust.window(&VM_CPU_USAGE, start, end), (start, end));
    }

    #[test]
    fn test_convert_bytes_to_percent_of_disk_size() {
        let resource = ResourceDetail {
            disk_size_mb: 10240,
            ..Default::default()
        };
        assert_eq!(DiskUsageAdjust.value(&VM_DISK_USAGE, &resource, 5_368_709_120.0), 50.0);
        assert_eq!(DiskUsageAdjust.value(&VM_CPU_USAGE, &resource, 12.0), 12.0);
    }

    #[test]
    fn test_report_zero_when_disk_size_is_unknown() {
        let resource = ResourceDetail::default();
        assert_eq!(DiskUsageAdjust.value(&VM_DISK_USAGE, &resource, 1024.0), 0.0);
    }
}
