//! Router configuration

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::{AgreementCache, RefreshPolicy};
use crate::directory::DirectoryScope;
use crate::locator::{DEFAULT_SHIPMENT_ID_PATH, ShipmentIdLocator};
use crate::{Error, Result};

/// Settings for the agreement cache, the directory and shipment id lookup.
///
/// ```yaml
/// directory:
///   subscription_id: sub-0001
///   resource_group: logistics-rg
///   account_name: widgetco-integration
/// refresh_ttl_secs: 300
/// shipment_id_paths:
///   INITECH-WIDGETCO-004: "L11[0]/ReferenceIdentification_01"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    pub directory: Option<DirectoryScope>,
    /// Reload agreements after this many seconds; never when absent
    pub refresh_ttl_secs: Option<u64>,
    /// Agreements per directory page
    pub page_size: usize,
    /// Upper bound on pages per listing
    pub max_directory_pages: usize,
    pub default_shipment_id_path: String,
    /// Shipment id path per agreement name
    pub shipment_id_paths: BTreeMap<String, String>,
    /// Extra schema overlay files or directories
    pub schemas: Vec<PathBuf>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            directory: None,
            refresh_ttl_secs: None,
            page_size: 100,
            max_directory_pages: AgreementCache::DEFAULT_MAX_PAGES,
            default_shipment_id_path: DEFAULT_SHIPMENT_ID_PATH.to_string(),
            shipment_id_paths: BTreeMap::new(),
            schemas: Vec::new(),
        }
    }
}

impl RouterConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self =
            serde_yaml::from_str(yaml).map_err(|e| Error::Config(format!("YAML parse error: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(Error::Config("page_size must be positive".to_string()));
        }
        if self.max_directory_pages == 0 {
            return Err(Error::Config("max_directory_pages must be positive".to_string()));
        }
        if self.refresh_ttl_secs == Some(0) {
            return Err(Error::Config("refresh_ttl_secs must be positive".to_string()));
        }
        self.locator().map(|_| ())
    }

    pub fn refresh_policy(&self) -> RefreshPolicy {
        self.refresh_ttl_secs
            .map_or(RefreshPolicy::Never, |secs| RefreshPolicy::Ttl(Duration::from_secs(secs)))
    }

    pub fn locator(&self) -> Result<ShipmentIdLocator> {
        ShipmentIdLocator::from_paths(&self.default_shipment_id_path, &self.shipment_id_paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RouterConfig::from_yaml("{}").unwrap();

        assert_eq!(config, RouterConfig::default());
        assert_eq!(config.refresh_policy(), RefreshPolicy::Never);
        assert_eq!(
            config.locator().unwrap().default_path().as_str(),
            DEFAULT_SHIPMENT_ID_PATH
        );
    }

    #[test]
    fn test_full_config() {
        let yaml = r#"
directory:
  subscription_id: sub-0001
  resource_group: logistics-rg
  account_name: widgetco-integration
refresh_ttl_secs: 300
page_size: 25
shipment_id_paths:
  INITECH-WIDGETCO-004: "L11[0]/ReferenceIdentification_01"
"#;
        let config = RouterConfig::from_yaml(yaml).unwrap();

        assert_eq!(config.refresh_policy(), RefreshPolicy::Ttl(Duration::from_secs(300)));
        assert_eq!(config.page_size, 25);
        assert_eq!(
            config.directory.as_ref().map(|d| d.account_name.as_str()),
            Some("widgetco-integration")
        );

        let locator = config.locator().unwrap();
        assert_eq!(
            locator.path_for("INITECH-WIDGETCO-004").as_str(),
            "L11[0]/ReferenceIdentification_01"
        );
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(RouterConfig::from_yaml("page_size: 0").is_err());
        assert!(RouterConfig::from_yaml("refresh_ttl_secs: 0").is_err());
        assert!(RouterConfig::from_yaml("shipment_id_paths: {ACME: 'B2[/x'}").is_err());
        assert!(RouterConfig::from_yaml("unknown: [").is_err());
    }
}
