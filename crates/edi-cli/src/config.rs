//! CLI configuration: YAML file plus environment overrides

use std::path::Path;

use anyhow::{Context, Result};
use edi_fanout::{DirectoryScope, RouterConfig};
use tracing::debug;

/// Load the router configuration from an optional YAML file and apply
/// `EDI_*` environment overrides to the directory scope
pub fn load(path: Option<&Path>) -> Result<RouterConfig> {
    let config = match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            RouterConfig::from_yaml(&content).with_context(|| format!("loading config {}", path.display()))?
        }
        None => RouterConfig::default(),
    };

    Ok(apply_env(config, |key| std::env::var(key).ok()))
}

/// Override directory scope fields from a variable lookup
pub fn apply_env<F>(mut config: RouterConfig, lookup: F) -> RouterConfig
where
    F: Fn(&str) -> Option<String>,
{
    config.directory = match config.directory.take() {
        Some(scope) => Some(scope.overridden_by(&lookup)),
        None => DirectoryScope::from_lookup(&lookup).ok(),
    };
    if let Some(scope) = &config.directory {
        debug!(%scope, "directory scope configured");
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_env_overrides_file_scope() {
        let config = RouterConfig {
            directory: Some(DirectoryScope::new("sub-file", "rg-file", "acct-file")),
            ..RouterConfig::default()
        };

        let config = apply_env(config, lookup(&[("EDI_ACCOUNT_NAME", "acct-env")]));
        assert_eq!(
            config.directory,
            Some(DirectoryScope::new("sub-file", "rg-file", "acct-env"))
        );
    }

    #[test]
    fn test_env_alone_builds_scope() {
        let config = apply_env(
            RouterConfig::default(),
            lookup(&[
                ("EDI_SUBSCRIPTION_ID", "sub"),
                ("EDI_RESOURCE_GROUP", "rg"),
                ("EDI_ACCOUNT_NAME", "acct"),
            ]),
        );
        assert_eq!(config.directory, Some(DirectoryScope::new("sub", "rg", "acct")));

        let partial = apply_env(RouterConfig::default(), lookup(&[("EDI_SUBSCRIPTION_ID", "sub")]));
        assert_eq!(partial.directory, None);
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("router.yaml");
        std::fs::write(&path, "refresh_ttl_secs: 60\npage_size: 10\n").unwrap();

        let config = load(Some(&path)).unwrap();
        assert_eq!(config.page_size, 10);
        assert_eq!(config.refresh_ttl_secs, Some(60));

        assert!(load(Some(&dir.path().join("missing.yaml"))).is_err());
    }
}
