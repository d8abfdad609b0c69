use crate::driver::{CollectDriver, CollectStrategy, DEFAULT_COLLECT_DELAY};
use async_trait::async_trait;
use std::time::Duration;

/// A driver whose every kind goes through one shared strategy.
pub struct StandardDriver {
    provider: String,
    delay: Duration,
    strategy: Box<dyn CollectStrategy>,
}

impl StandardDriver {
    pub fn new(provider: impl Into<String>, strategy: impl CollectStrategy + 'static) -> Self {
        Self {
            provider: provider.into(),
            delay: DEFAULT_COLLECT_DELAY,
            strategy: Box::new(strategy),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl CollectDriver for StandardDriver {
    fn provider(&self) -> &str {
        &self.provider
    }

    fn supports_metrics(&self) -> bool {
        true
    }

    fn collect_delay(&self) -> Duration {
        self.delay
    }

    fn strategy(&self) -> Option<&dyn CollectStrategy> {
        Some(self.strategy.as_ref())
    }
}
