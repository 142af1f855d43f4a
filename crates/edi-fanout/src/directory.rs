//! Agreement directory collaborator
//!
//! The directory lists every agreement of an account scope as a sequence of
//! pages linked by continuation tokens. [`StaticDirectory`] serves a fixed
//! set of agreements from memory or from a JSON file.

use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace};

use crate::agreement::Agreement;

/// Directory error
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Scope is incomplete or malformed
    #[error("directory scope not configured: {0}")]
    Configuration(String),

    /// Listing request failed
    #[error("directory request failed: {0}")]
    Request(String),

    /// Agreement data could not be decoded
    #[error("invalid agreement data: {0}")]
    Format(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Account scope whose agreements are listed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryScope {
    pub subscription_id: String,
    pub resource_group: String,
    pub account_name: String,
}

impl DirectoryScope {
    pub const SUBSCRIPTION_ENV: &'static str = "EDI_SUBSCRIPTION_ID";
    pub const RESOURCE_GROUP_ENV: &'static str = "EDI_RESOURCE_GROUP";
    pub const ACCOUNT_NAME_ENV: &'static str = "EDI_ACCOUNT_NAME";

    pub fn new(
        subscription_id: impl Into<String>,
        resource_group: impl Into<String>,
        account_name: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group: resource_group.into(),
            account_name: account_name.into(),
        }
    }

    /// Scope from an arbitrary variable lookup; every variable is required
    pub fn from_lookup<F>(lookup: F) -> Result<Self, DirectoryError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| DirectoryError::Configuration(format!("{key} is not set")))
        };

        Ok(Self::new(
            required(Self::SUBSCRIPTION_ENV)?,
            required(Self::RESOURCE_GROUP_ENV)?,
            required(Self::ACCOUNT_NAME_ENV)?,
        ))
    }

    /// Replace fields for which the lookup yields a non-empty value
    #[must_use]
    pub fn overridden_by<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let fields = [
            (Self::SUBSCRIPTION_ENV, &mut self.subscription_id),
            (Self::RESOURCE_GROUP_ENV, &mut self.resource_group),
            (Self::ACCOUNT_NAME_ENV, &mut self.account_name),
        ];
        for (key, field) in fields {
            if let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) {
                *field = value;
            }
        }
        self
    }

    /// Check that every field is present
    pub fn validate(&self) -> Result<(), DirectoryError> {
        for (label, value) in [
            ("subscription_id", &self.subscription_id),
            ("resource_group", &self.resource_group),
            ("account_name", &self.account_name),
        ] {
            if value.trim().is_empty() {
                return Err(DirectoryError::Configuration(format!("{label} is empty")));
            }
        }
        Ok(())
    }
}

impl fmt::Display for DirectoryScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.subscription_id, self.resource_group, self.account_name
        )
    }
}

/// One page of a listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgreementPage {
    pub agreements: Vec<Agreement>,
    /// Continuation link; `None` on the last page
    pub next_link: Option<String>,
}

/// Paginated agreement listing service
#[async_trait]
pub trait AgreementDirectory: Send + Sync {
    /// First page of the scope's agreements
    async fn list(&self, scope: &DirectoryScope) -> Result<AgreementPage, DirectoryError>;

    /// Page behind a continuation link
    async fn list_next(&self, next_link: &str) -> Result<AgreementPage, DirectoryError>;

    /// Backend name for logging
    fn name(&self) -> &'static str {
        "directory"
    }
}

const PAGE_LINK_PREFIX: &str = "static-page:";

/// In-memory directory serving a fixed agreement set in pages
pub struct StaticDirectory {
    agreements: RwLock<Vec<Agreement>>,
    page_size: usize,
    delay: Option<Duration>,
    failing: AtomicBool,
    list_calls: AtomicUsize,
    page_requests: AtomicUsize,
}

impl StaticDirectory {
    pub const DEFAULT_PAGE_SIZE: usize = 100;

    pub fn new(agreements: Vec<Agreement>) -> Self {
        Self {
            agreements: RwLock::new(agreements),
            page_size: Self::DEFAULT_PAGE_SIZE,
            delay: None,
            failing: AtomicBool::new(false),
            list_calls: AtomicUsize::new(0),
            page_requests: AtomicUsize::new(0),
        }
    }

    /// Agreements per page (at least one)
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Sleep before answering each page request
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Load agreements from a JSON array
    pub fn from_json(json: &str) -> Result<Self, DirectoryError> {
        let agreements: Vec<Agreement> =
            serde_json::from_str(json).map_err(|e| DirectoryError::Format(e.to_string()))?;
        Ok(Self::new(agreements))
    }

    /// Load agreements from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self, DirectoryError> {
        let content = std::fs::read_to_string(path)?;
        let directory = Self::from_json(&content)
            .map_err(|e| DirectoryError::Format(format!("{}: {e}", path.display())))?;
        debug!(
            path = %path.display(),
            agreements = directory.len(),
            "loaded agreement file"
        );
        Ok(directory)
    }

    /// Replace the served agreement set
    pub fn replace(&self, agreements: Vec<Agreement>) {
        *self.agreements.write().unwrap_or_else(PoisonError::into_inner) = agreements;
    }

    /// Make subsequent requests fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of agreements served
    pub fn len(&self) -> usize {
        self.agreements
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of `list` calls, i.e. full listings started
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Number of page requests of either kind
    pub fn page_requests(&self) -> usize {
        self.page_requests.load(Ordering::SeqCst)
    }

    async fn page(&self, index: usize) -> Result<AgreementPage, DirectoryError> {
        self.page_requests.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(DirectoryError::Request("directory is unavailable".to_string()));
        }

        let agreements = self.agreements.read().unwrap_or_else(PoisonError::into_inner);
        let start = index.saturating_mul(self.page_size);
        let end = start.saturating_add(self.page_size).min(agreements.len());
        let page = agreements.get(start..end).map(<[Agreement]>::to_vec).unwrap_or_default();
        let next_link = (end < agreements.len()).then(|| format!("{PAGE_LINK_PREFIX}{}", index + 1));

        trace!(index, count = page.len(), has_next = next_link.is_some(), "serving agreement page");
        Ok(AgreementPage {
            agreements: page,
            next_link,
        })
    }
}

#[async_trait]
impl AgreementDirectory for StaticDirectory {
    async fn list(&self, scope: &DirectoryScope) -> Result<AgreementPage, DirectoryError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        debug!(%scope, "listing agreements");
        self.page(0).await
    }

    async fn list_next(&self, next_link: &str) -> Result<AgreementPage, DirectoryError> {
        let index = next_link
            .strip_prefix(PAGE_LINK_PREFIX)
            .and_then(|n| n.parse::<usize>().ok())
            .ok_or_else(|| DirectoryError::Request(format!("unknown continuation link {next_link}")))?;
        self.page(index).await
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agreement::BusinessIdentity;
    use std::collections::HashMap;

    fn agreements(count: usize) -> Vec<Agreement> {
        (0..count)
            .map(|i| {
                Agreement::new(
                    format!("AGR-{i:03}"),
                    BusinessIdentity::new("ZZ", format!("PARTNER{i}")),
                    BusinessIdentity::new("ZZ", "WIDGETCO"),
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn test_pages_follow_links() {
        let directory = StaticDirectory::new(agreements(5)).with_page_size(2);
        let scope = DirectoryScope::new("sub", "rg", "acct");

        let first = directory.list(&scope).await.unwrap();
        assert_eq!(first.agreements.len(), 2);
        let link = first.next_link.unwrap();

        let second = directory.list_next(&link).await.unwrap();
        assert_eq!(second.agreements[0].name, "AGR-002");

        let third = directory.list_next(&second.next_link.unwrap()).await.unwrap();
        assert_eq!(third.agreements.len(), 1);
        assert!(third.next_link.is_none());
        assert_eq!(directory.list_calls(), 1);
        assert_eq!(directory.page_requests(), 3);
    }

    #[tokio::test]
    async fn test_empty_directory_has_single_page() {
        let directory = StaticDirectory::new(Vec::new());
        let page = directory.list(&DirectoryScope::default()).await.unwrap();

        assert!(page.agreements.is_empty());
        assert!(page.next_link.is_none());
    }

    #[tokio::test]
    async fn test_failure_injection_and_bad_link() {
        let directory = StaticDirectory::new(agreements(1));
        directory.set_failing(true);
        assert!(matches!(
            directory.list(&DirectoryScope::default()).await,
            Err(DirectoryError::Request(_))
        ));

        directory.set_failing(false);
        assert!(directory.list_next("https://elsewhere/page/2").await.is_err());
    }

    #[test]
    fn test_scope_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("EDI_SUBSCRIPTION_ID", "sub-0001"),
            ("EDI_RESOURCE_GROUP", "logistics-rg"),
            ("EDI_ACCOUNT_NAME", "widgetco-integration"),
        ]
        .into_iter()
        .collect();

        let scope = DirectoryScope::from_lookup(|k| vars.get(k).map(|v| (*v).to_string())).unwrap();
        assert_eq!(scope.to_string(), "sub-0001/logistics-rg/widgetco-integration");
    }

    #[test]
    fn test_scope_missing_variable() {
        let err = DirectoryScope::from_lookup(|k| {
            (k != "EDI_ACCOUNT_NAME").then(|| "x".to_string())
        })
        .unwrap_err();
        assert!(err.to_string().contains("EDI_ACCOUNT_NAME"));
    }

    #[test]
    fn test_scope_override() {
        let scope = DirectoryScope::new("sub", "rg", "acct")
            .overridden_by(|k| (k == "EDI_RESOURCE_GROUP").then(|| "other-rg".to_string()));

        assert_eq!(scope, DirectoryScope::new("sub", "other-rg", "acct"));
        assert!(scope.validate().is_ok());
        assert!(DirectoryScope::default().validate().is_err());
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agreements.json");
        std::fs::write(&path, serde_json::to_string(&agreements(3)).unwrap()).unwrap();

        let directory = StaticDirectory::from_json_file(&path).unwrap();
        assert_eq!(directory.len(), 3);

        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            StaticDirectory::from_json_file(&path),
            Err(DirectoryError::Format(_))
        ));
    }
}
