use crate::config::{AccountConfig, ServerConfig};
use crate::resources::ResourceSnapshot;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use cloudmon_cloud::client::{HttpTransport, ReqwestTransport, SdkClient};
use cloudmon_cloud::collector::{collect_account_metrics, collect_provider_metrics, is_skipped};
use cloudmon_cloud::driver::{CollectContext, SdkRef};
use cloudmon_cloud::gateway::GatewaySdk;
use cloudmon_cloud::{CloudError, DriverRegistry};
use cloudmon_common::resource::{AccountDetail, ProviderDetail};
use cloudmon_sink::SinkClient;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::time::{interval, Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Builds the SDK used for one account.
pub trait SdkFactory: Send + Sync {
    fn build(&self, account: &AccountConfig, cancel: CancellationToken) -> Result<SdkRef>;
}

/// Talks to each account's metric gateway over `reqwest`.
pub struct GatewaySdkFactory {
    timeout: Duration,
}

impl GatewaySdkFactory {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl SdkFactory for GatewaySdkFactory {
    fn build(&self, account: &AccountConfig, cancel: CancellationToken) -> Result<SdkRef> {
        let transport: Arc<dyn HttpTransport> = Arc::new(
            ReqwestTransport::new(self.timeout, account.sdk_token.clone())
                .context("Failed to build HTTP client")?,
        );
        let client = SdkClient::new(transport, cancel);
        Ok(Arc::new(GatewaySdk::new(&account.sdk_endpoint, client)))
    }
}

pub struct CollectScheduler {
    config: Arc<ServerConfig>,
    registry: Arc<DriverRegistry>,
    sink: Arc<dyn SinkClient>,
    sdk_factory: Arc<dyn SdkFactory>,
    cancel: CancellationToken,
}

impl CollectScheduler {
    pub fn new(
        config: Arc<ServerConfig>,
        registry: Arc<DriverRegistry>,
        sink: Arc<dyn SinkClient>,
        sdk_factory: Arc<dyn SdkFactory>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            registry,
            sink,
            sdk_factory,
            cancel,
        }
    }

    pub async fn run(&self) {
        tracing::info!(
            collect_interval_mins = self.config.collect_interval_mins,
            tick_secs = self.config.tick_secs,
            accounts = self.config.accounts.len(),
            "Cloud metrics scheduler started"
        );

        let mut tick = interval(Duration::from_secs(self.config.tick_secs.max(1)));
        let mut last_cycle: Option<Instant> = None;
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = tick.tick() => {}
            }

            let due = last_cycle.map_or(true, |at| at.elapsed() >= self.config.collect_interval());
            if !due {
                continue;
            }
            last_cycle = Some(Instant::now());
            if let Err(e) = self.run_cycle(Utc::now()).await {
                tracing::error!(error = %e, "Cloud metrics collection cycle failed");
            }
        }
        tracing::info!("Cloud metrics scheduler stopped");
    }

    /// One collection cycle over every configured account, ending at `now`.
    pub async fn run_cycle(&self, now: DateTime<Utc>) -> Result<()> {
        let ctx = CollectContext::new(
            self.cancel.clone(),
            Arc::clone(&self.sink),
            self.config.tsdb_urls.clone(),
            self.config.influx_database.clone(),
        )
        .with_batch_count(
            self.config.resource_batch_count,
            self.config.oracle_resource_batch_count,
        );

        let semaphore = Arc::new(Semaphore::new(self.config.account_batch_count.max(1)));
        let mut tasks = Vec::new();
        for account in &self.config.accounts {
            let permit = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                permit = Arc::clone(&semaphore).acquire_owned() => permit?,
            };

            let account = account.clone();
            let registry = Arc::clone(&self.registry);
            let sdk_factory = Arc::clone(&self.sdk_factory);
            let config = Arc::clone(&self.config);
            let ctx = ctx.clone();
            tasks.push(tokio::spawn(async move {
                let _permit = permit;
                collect_account(&config, &registry, sdk_factory.as_ref(), &ctx, &account, now)
                    .await
            }));
        }

        let mut accounts = Vec::new();
        for task in tasks {
            match task.await {
                Ok(Some(account)) => accounts.push(account),
                Ok(None) => {}
                Err(e) => tracing::error!("Task panicked: {}", e),
            }
        }
        if self.cancel.is_cancelled() {
            return Err(CloudError::Cancelled.into());
        }

        self.send_account_metrics(&accounts).await
    }

    async fn send_account_metrics(&self, accounts: &[AccountDetail]) -> Result<()> {
        let records = collect_account_metrics(&self.registry, accounts).await;
        if records.is_empty() {
            return Ok(());
        }

        tracing::info!(
            "send {} account metrics to {}",
            records.len(),
            self.config.meter_database
        );
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(CloudError::Cancelled.into()),
            result = self.sink.send_batch(
                &self.config.tsdb_urls,
                &self.config.meter_database,
                &records,
                true,
            ) => result.context("Failed to send account metrics"),
        }
    }
}

/// Collect one account; returns its detail for the account-level sample.
async fn collect_account(
    config: &ServerConfig,
    registry: &DriverRegistry,
    sdk_factory: &dyn SdkFactory,
    ctx: &CollectContext,
    account: &AccountConfig,
    now: DateTime<Utc>,
) -> Option<AccountDetail> {
    let snapshot = match ResourceSnapshot::load(&account.resources_file) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            tracing::error!(account = %account.name, error = %e, "Failed to load resources");
            return None;
        }
    };
    let detail = snapshot.account_detail(account);

    if is_skipped(&config.skip_metric_pull_providers, &account.provider) {
        tracing::info!(
            account = %account.name,
            provider = %account.provider,
            "Skipping metric pull for provider"
        );
        return Some(detail);
    }

    let sdk = match sdk_factory.build(account, ctx.cancel.child_token()) {
        Ok(sdk) => sdk,
        Err(e) => {
            tracing::error!(account = %account.name, error = %e, "Failed to build provider SDK");
            return Some(detail);
        }
    };

    let manager = ProviderDetail {
        id: account.id.clone(),
        name: account.name.clone(),
        provider: account.provider.clone(),
    };
    if let Err(e) = collect_provider_metrics(
        registry,
        ctx,
        &manager,
        &sdk,
        &snapshot.kind_resources(),
        now,
        config.collect_interval(),
    )
    .await
    {
        tracing::error!(
            account = %account.name,
            provider = %account.provider,
            error = %e,
            "Failed to collect account metrics"
        );
    }
    Some(detail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cloudmon_cloud::sdk::{MetricListOptions, MetricSeries, MetricValue, ProviderSdk};
    use cloudmon_cloud::MetricType;
    use cloudmon_common::types::SampleRecord;
    use std::io::Write;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        batches: Mutex<Vec<(String, Vec<SampleRecord>, bool)>>,
    }

    #[async_trait]
    impl SinkClient for RecordingSink {
        async fn send_batch(
            &self,
            _urls: &[String],
            database: &str,
            records: &[SampleRecord],
            gzip: bool,
        ) -> cloudmon_sink::error::Result<()> {
            self.batches
                .lock()
                .unwrap()
                .push((database.to_string(), records.to_vec(), gzip));
            Ok(())
        }
    }

    /// Every call returns one CPU point for each requested resource id.
    #[derive(Default)]
    struct EchoSdk {
        calls: Mutex<Vec<MetricListOptions>>,
    }

    #[async_trait]
    impl ProviderSdk for EchoSdk {
        async fn list_metrics(
            &self,
            opts: &MetricListOptions,
        ) -> cloudmon_cloud::Result<Vec<MetricSeries>> {
            self.calls.lock().unwrap().push(opts.clone());
            Ok(vec![MetricSeries {
                id: opts.resource_id.clone(),
                metric_type: MetricType::new("vm_cpu.usage_active"),
                values: vec![MetricValue::new(opts.end_time, 10.0)],
            }])
        }
    }

    struct FixedSdkFactory {
        sdk: Arc<EchoSdk>,
    }

    impl SdkFactory for FixedSdkFactory {
        fn build(&self, _account: &AccountConfig, _cancel: CancellationToken) -> Result<SdkRef> {
            Ok(self.sdk.clone())
        }
    }

    fn snapshot_file(provider: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
  "account": {{"id": "acc-{provider}", "name": "{provider}-prod", "provider": "{provider}",
               "metric_tags": {{"cloudaccount_id": "acc-{provider}"}},
               "metric_pairs": {{"balance": "100"}}}},
  "resources": {{
    "server": [{{"id": "vm-1", "name": "web", "external_id": "i-1", "region_external_id": "r1"}}]
  }}
}}"#
        )
        .unwrap();
        file
    }

    fn account(provider: &str, file: &tempfile::NamedTempFile) -> AccountConfig {
        AccountConfig {
            provider: provider.to_string(),
            id: format!("acc-{provider}"),
            name: format!("{provider}-prod"),
            sdk_endpoint: "http://gateway".to_string(),
            sdk_token: None,
            resources_file: file.path().to_string_lossy().into_owned(),
        }
    }

    fn scheduler(
        config: ServerConfig,
        sink: Arc<RecordingSink>,
        sdk: Arc<EchoSdk>,
    ) -> CollectScheduler {
        CollectScheduler::new(
            Arc::new(config),
            Arc::new(DriverRegistry::default()),
            sink,
            Arc::new(FixedSdkFactory { sdk }),
            CancellationToken::new(),
        )
    }

    #[tokio::test]
    async fn test_collect_accounts_and_send_account_metrics() {
        let aws = snapshot_file("aws");
        let skipped = snapshot_file("azure");
        let mut config: ServerConfig = toml::from_str(
            r#"
tsdb_urls = ["http://influxdb:8086"]
skip_metric_pull_providers = ["AZURE"]
"#,
        )
        .unwrap();
        config.accounts = vec![account("aws", &aws), account("azure", &skipped)];

        let sink = Arc::new(RecordingSink::default());
        let sdk = Arc::new(EchoSdk::default());
        let now = DateTime::from_timestamp(7200, 0).unwrap();
        scheduler(config, sink.clone(), sdk.clone())
            .run_cycle(now)
            .await
            .unwrap();

        // only the aws account reaches the SDK, inside the delayed window
        let calls = sdk.calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].resource_id, "i-1");
        assert_eq!(calls[0].end_time, now - chrono::TimeDelta::minutes(6));

        let batches = sink.batches.lock().unwrap().clone();
        assert_eq!(batches.len(), 2);
        let (database, records, gzip) = &batches[0];
        assert_eq!(database, "telegraf");
        assert_eq!(records.len(), 1);
        assert!(!gzip);

        let (database, records, gzip) = &batches[1];
        assert_eq!(database, "meter_db");
        assert_eq!(records.len(), 2);
        assert!(gzip);
    }

    #[tokio::test]
    async fn test_skip_account_with_missing_snapshot() {
        let mut config: ServerConfig =
            toml::from_str(r#"tsdb_urls = ["http://influxdb:8086"]"#).unwrap();
        config.accounts = vec![AccountConfig {
            provider: "aws".to_string(),
            id: "acc-1".to_string(),
            name: "prod".to_string(),
            sdk_endpoint: "http://gateway".to_string(),
            sdk_token: None,
            resources_file: "/nonexistent/acc-1.json".to_string(),
        }];

        let sink = Arc::new(RecordingSink::default());
        let sdk = Arc::new(EchoSdk::default());
        scheduler(config, sink.clone(), sdk.clone())
            .run_cycle(Utc::now())
            .await
            .unwrap();

        assert!(sdk.calls.lock().unwrap().is_empty());
        assert!(sink.batches.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_run_loop_when_cancelled() {
        let config: ServerConfig = toml::from_str("").unwrap();
        let sink = Arc::new(RecordingSink::default());
        let scheduler = scheduler(config, sink, Arc::new(EchoSdk::default()));
        let cancel = scheduler.cancel.clone();

        let handle = tokio::spawn(async move { scheduler.run().await });
        tokio::time::sleep(Duration::from_secs(90)).await;
        cancel.cancel();
        handle.await.unwrap();
    }
}
