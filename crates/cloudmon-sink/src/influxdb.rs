use crate::error::{Result, SinkError};
use crate::SinkClient;
use async_trait::async_trait;
use cloudmon_common::types::{KeyValue, SampleRecord};
use flate2::write::GzEncoder;
use flate2::Compression;
use reqwest::header::{CONTENT_ENCODING, CONTENT_TYPE};
use reqwest::Client;
use std::fmt::Write as _;
use std::io::Write as _;
use std::time::Duration;

const DEFAULT_BATCH_SIZE: usize = 5000;

/// InfluxDB v1 sink writing line protocol over HTTP.
pub struct InfluxdbSink {
    client: Client,
    batch_size: usize,
}

impl InfluxdbSink {
    pub fn new(timeout: Duration, batch_size: usize) -> Result<Self> {
        let client = Client::builder()
            .use_rustls_tls()
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            batch_size: if batch_size == 0 {
                DEFAULT_BATCH_SIZE
            } else {
                batch_size
            },
        })
    }

    async fn write(&self, url: &str, database: &str, body: Vec<u8>, gzip: bool) -> Result<()> {
        let endpoint = format!("{}/write", url.trim_end_matches('/'));
        let mut request = self
            .client
            .post(&endpoint)
            .query(&[("db", database), ("precision", "ms")])
            .header(CONTENT_TYPE, "text/plain; charset=utf-8");
        if gzip {
            request = request.header(CONTENT_ENCODING, "gzip");
        }

        let response = request.body(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SinkError::HttpError {
                url: endpoint,
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl SinkClient for InfluxdbSink {
    async fn send_batch(
        &self,
        urls: &[String],
        database: &str,
        records: &[SampleRecord],
        gzip: bool,
    ) -> Result<()> {
        if urls.is_empty() {
            return Err(SinkError::NoEndpoint);
        }

        let records: Vec<&SampleRecord> = records.iter().filter(|r| !r.is_empty()).collect();
        for chunk in records.chunks(self.batch_size) {
            let mut body = String::new();
            for record in chunk {
                encode_line(record, &mut body);
            }
            let payload = if gzip {
                compress(body.as_bytes())?
            } else {
                body.into_bytes()
            };

            let mut last_error = None;
            for url in urls {
                match self.write(url, database, payload.clone(), gzip).await {
                    Ok(()) => {
                        last_error = None;
                        break;
                    }
                    Err(e) => {
                        tracing::warn!(url = %url, database, error = %e, "Time-series write failed");
                        last_error = Some(e);
                    }
                }
            }
            if let Some(e) = last_error {
                return Err(e);
            }
        }

        tracing::debug!(count = records.len(), database, "Time-series batch written");
        Ok(())
    }
}

/// Append one line-protocol line for `record` to `out`.
///
/// Tags with an empty key or value are skipped, since line protocol
/// cannot represent them.
pub fn encode_line(record: &SampleRecord, out: &mut String) {
    out.push_str(&escape(&record.measurement, &[',', ' ']));
    for KeyValue { key, value } in &record.tags {
        if key.is_empty() || value.is_empty() {
            continue;
        }
        let _ = write!(
            out,
            ",{}={}",
            escape(key, &[',', '=', ' ']),
            escape(value, &[',', '=', ' '])
        );
    }

    for (i, KeyValue { key, value }) in record.metrics.iter().enumerate() {
        out.push(if i == 0 { ' ' } else { ',' });
        let _ = write!(out, "{}={}", escape(key, &[',', '=', ' ']), field_value(value));
    }

    let _ = writeln!(out, " {}", record.timestamp.timestamp_millis());
}

fn escape(s: &str, special: &[char]) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        if c == '\\' || special.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Finite numbers are written bare, everything else as a quoted string.
fn field_value(value: &str) -> String {
    match value.parse::<f64>() {
        Ok(v) if v.is_finite() => value.to_string(),
        _ => format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\"")),
    }
}

fn compress(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use flate2::read::GzDecoder;
    use std::io::Read;

    fn sample() -> SampleRecord {
        let mut record = SampleRecord::new("cpu", Utc.timestamp_millis_opt(100_000).unwrap());
        record.push_tag("cpu", "0");
        record.push_tag("host", "h1");
        record.push_value("usage_active", 42.5);
        record.push_metric("cores", "2");
        record
    }

    #[test]
    fn test_encode_record_as_line_protocol() {
        let mut out = String::new();
        encode_line(&sample(), &mut out);
        assert_eq!(out, "cpu,cpu=0,host=h1 usage_active=4.25E+01,cores=2 100000\n");
    }

    #[test]
    fn test_escape_special_characters() {
        let mut record = SampleRecord::new("vm disk", Utc.timestamp_millis_opt(1).unwrap());
        record.push_tag("vm name", "a=b,c");
        record.push_tag("empty", "");
        record.push_metric("billing", "post \"paid\"");
        record.push_metric("nan", "NaN");

        let mut out = String::new();
        encode_line(&record, &mut out);
        assert_eq!(
            out,
            "vm\\ disk,vm\\ name=a\\=b\\,c billing=\"post \\\"paid\\\"\",nan=\"NaN\" 1\n"
        );
    }

    #[test]
    fn test_round_trip_gzip_payload() {
        let compressed = compress(b"cpu value=1 1\n").unwrap();
        let mut decoder = GzDecoder::new(compressed.as_slice());
        let mut plain = String::new();
        decoder.read_to_string(&mut plain).unwrap();
        assert_eq!(plain, "cpu value=1 1\n");
    }

    #[tokio::test]
    async fn test_reject_batch_without_endpoints() {
        let sink = InfluxdbSink::new(Duration::from_secs(1), 10).unwrap();
        let err = sink
            .send_batch(&[], "telegraf", &[sample()], false)
            .await
            .unwrap_err();
        assert!(matches!(err, SinkError::NoEndpoint));
    }
}
