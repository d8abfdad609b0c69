use super::CollectDriver;
use crate::error::{CloudError, Result};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

/// Registry of [`CollectDriver`]s keyed by lowercase provider tag.
///
/// # Examples
///
/// ```
/// use cloudmon_cloud::driver::registry::DriverRegistry;
///
/// let registry = DriverRegistry::default();
/// assert!(registry.has_driver("aliyun"));
/// assert!(registry.has_driver("Huawei"));
/// assert!(registry.get("nonexistent").is_err());
/// ```
pub struct DriverRegistry {
    drivers: HashMap<String, Arc<dyn CollectDriver>>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self {
            drivers: HashMap::new(),
        }
    }

    /// Registers `driver`, replacing any driver with the same provider tag.
    pub fn register(&mut self, driver: Arc<dyn CollectDriver>) {
        let provider = driver.provider().to_ascii_lowercase();
        self.drivers.insert(provider, driver);
    }

    pub fn get(&self, provider: &str) -> Result<Arc<dyn CollectDriver>> {
        self.drivers
            .get(&provider.to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| CloudError::DriverNotFound(provider.to_string()))
    }

    pub fn has_driver(&self, provider: &str) -> bool {
        self.drivers.contains_key(&provider.to_ascii_lowercase())
    }

    pub fn providers(&self) -> Vec<&str> {
        let mut providers: Vec<&str> = self.drivers.keys().map(String::as_str).collect();
        providers.sort_unstable();
        providers
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        let mut registry = Self::new();
        crate::providers::register_all(&mut registry);
        registry
    }
}

static GLOBAL_REGISTRY: OnceLock<DriverRegistry> = OnceLock::new();

/// Process-wide registry with every built-in driver, built on first use.
pub fn global() -> &'static DriverRegistry {
    GLOBAL_REGISTRY.get_or_init(DriverRegistry::default)
}

pub fn get_driver(provider: &str) -> Result<Arc<dyn CollectDriver>> {
    global().get(provider)
}
