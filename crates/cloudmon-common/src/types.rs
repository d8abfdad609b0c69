use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One key/value pair of a [`SampleRecord`], used for both tags and metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// The canonical data point handed to the time-series sink.
///
/// Tag and metric order is preserved as appended; the sink writes them
/// in this order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    pub measurement: String,
    pub timestamp: DateTime<Utc>,
    pub tags: Vec<KeyValue>,
    pub metrics: Vec<KeyValue>,
}

impl SampleRecord {
    pub fn new(measurement: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            measurement: measurement.into(),
            timestamp,
            tags: Vec::new(),
            metrics: Vec::new(),
        }
    }

    pub fn push_tag(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.tags.push(KeyValue::new(key, value));
    }

    /// Appends a numeric metric, formatted with [`format_metric_value`].
    pub fn push_value(&mut self, key: impl Into<String>, value: f64) {
        self.metrics
            .push(KeyValue::new(key, format_metric_value(value)));
    }

    pub fn push_metric(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metrics.push(KeyValue::new(key, value));
    }

    pub fn extend_tags<I, K, V>(&mut self, tags: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.tags
            .extend(tags.into_iter().map(|(k, v)| KeyValue::new(k, v)));
    }

    pub fn extend_metrics<I, K, V>(&mut self, metrics: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.metrics
            .extend(metrics.into_iter().map(|(k, v)| KeyValue::new(k, v)));
    }

    /// A record without metric pairs carries no data and must not be sent.
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

/// Format a sample value in upper-case scientific notation with the
/// shortest digits that round-trip, e.g. `42.5` becomes `4.25E+01`.
///
/// The exponent always carries a sign and at least two digits.
/// Downstream dashboards parse this exact form.
///
/// # Examples
///
/// ```
/// use cloudmon_common::types::format_metric_value;
///
/// assert_eq!(format_metric_value(42.5), "4.25E+01");
/// assert_eq!(format_metric_value(50.0), "5E+01");
/// assert_eq!(format_metric_value(0.000123), "1.23E-04");
/// assert_eq!(format_metric_value(0.0), "0E+00");
/// ```
pub fn format_metric_value(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "+Inf" } else { "-Inf" }.to_string();
    }

    let raw = format!("{value:E}");
    let (mantissa, exponent) = match raw.split_once('E') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (raw.as_str(), 0),
    };
    let sign = if exponent < 0 { '-' } else { '+' };
    format!("{mantissa}E{sign}{:02}", exponent.unsigned_abs())
}
