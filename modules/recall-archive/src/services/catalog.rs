// Primary catalog resolver: id → record, cached per normalized id.

use std::collections::BTreeSet;
use std::sync::Arc;

use omdb_client::TitleRecord;
use recall_common::CatalogId;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;
use crate::retry::RetryPolicy;
use crate::store::Cache;
use crate::traits::MovieCatalog;

/// A catalog answer for one requested id. `record` is `None` when the catalog
/// does not know the id; that answer is cached like any other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub requested: CatalogId,
    pub record: Option<TitleRecord>,
}

impl CatalogRecord {
    pub fn is_empty(&self) -> bool {
        self.record.is_none()
    }

    pub fn title(&self) -> Option<&str> {
        self.record.as_ref().and_then(|r| r.title.as_deref())
    }

    /// The id the catalog itself reports for this record. Falls back to the
    /// requested id when the record is empty or reports nothing parseable.
    pub fn canonical_id(&self) -> CatalogId {
        self.record
            .as_ref()
            .and_then(|r| CatalogId::parse(&r.imdb_id).ok())
            .unwrap_or_else(|| self.requested.clone())
    }
}

pub struct CatalogResolver {
    catalog: Arc<dyn MovieCatalog>,
    cache: Cache,
    retry: RetryPolicy,
}

impl CatalogResolver {
    pub fn new(catalog: Arc<dyn MovieCatalog>, cache: Cache, retry: RetryPolicy) -> Self {
        Self {
            catalog,
            cache,
            retry,
        }
    }

    pub async fn get_record(&self, id: &CatalogId) -> Result<CatalogRecord> {
        if let Some(cached) = self.cache.get::<CatalogRecord>(id.as_str())? {
            debug!(catalog_id = %id, "catalog: cache hit");
            return Ok(cached);
        }

        info!(catalog_id = %id, "catalog: fetching record");
        let record = self
            .retry
            .run("catalog lookup", || self.catalog.title(id))
            .await?;

        let record = CatalogRecord {
            requested: id.clone(),
            record,
        };
        self.cache.put(id.as_str(), &record)?;
        Ok(record)
    }

    /// All synopsis entries joined by blank lines, or `None` if there are none.
    pub fn get_plot(record: &CatalogRecord) -> Option<String> {
        let plots = &record.record.as_ref()?.plots;
        if plots.is_empty() {
            return None;
        }
        Some(plots.join("\n\n"))
    }

    /// Map each id to the id the catalog reports for it, collapsing ids the
    /// catalog has merged into one title.
    pub async fn resolve_redirects(&self, ids: &BTreeSet<CatalogId>) -> Result<BTreeSet<CatalogId>> {
        let mut resolved = BTreeSet::new();
        for id in ids {
            let record = self.get_record(id).await?;
            let canonical = record.canonical_id();
            if &canonical != id {
                debug!(from = %id, to = %canonical, "catalog: id redirects");
            }
            resolved.insert(canonical);
        }
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{title_record, MockCatalog};

    fn resolver(mock: Arc<MockCatalog>, dir: &std::path::Path) -> CatalogResolver {
        CatalogResolver::new(mock, Cache::open(dir).unwrap(), RetryPolicy::none())
    }

    #[tokio::test]
    async fn record_is_fetched_once_then_cached() {
        let dir = tempfile::tempdir().unwrap();
        let mock = Arc::new(MockCatalog::new().on_title(title_record(
            "tt0133093",
            "The Matrix",
            &["A hacker learns the truth."],
        )));
        let catalog = resolver(mock.clone(), dir.path());
        let id = CatalogId::from(133093);

        let first = catalog.get_record(&id).await.unwrap();
        let second = catalog.get_record(&id).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.title(), Some("The Matrix"));
        assert_eq!(mock.calls(), 1);

        let reopened = resolver(mock.clone(), dir.path());
        reopened.get_record(&id).await.unwrap();
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn unknown_id_is_cached_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mock = Arc::new(MockCatalog::new());
        let catalog = resolver(mock.clone(), dir.path());
        let id = CatalogId::from(1);

        assert!(catalog.get_record(&id).await.unwrap().is_empty());
        assert!(catalog.get_record(&id).await.unwrap().is_empty());
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let dir = tempfile::tempdir().unwrap();
        let mock = Arc::new(
            MockCatalog::new()
                .on_title(title_record("tt0000001", "Carmencita", &[]))
                .failing_transiently(2),
        );
        let catalog = CatalogResolver::new(
            mock.clone(),
            Cache::open(dir.path()).unwrap(),
            RetryPolicy::new(3, std::time::Duration::ZERO),
        );

        let record = catalog.get_record(&CatalogId::from(1)).await.unwrap();
        assert_eq!(record.title(), Some("Carmencita"));
        assert_eq!(mock.calls(), 3);
    }

    #[test]
    fn plots_are_joined_with_blank_lines() {
        let record = CatalogRecord {
            requested: CatalogId::from(1),
            record: Some(title_record("tt0000001", "X", &["one", "two"])),
        };
        assert_eq!(CatalogResolver::get_plot(&record).as_deref(), Some("one\n\ntwo"));

        let bare = CatalogRecord {
            requested: CatalogId::from(1),
            record: Some(title_record("tt0000001", "X", &[])),
        };
        assert!(CatalogResolver::get_plot(&bare).is_none());
    }

    #[tokio::test]
    async fn merged_ids_collapse() {
        let dir = tempfile::tempdir().unwrap();
        let mock = Arc::new(
            MockCatalog::new()
                .on_title(title_record("tt0000002", "Original", &[]))
                .on_title_as("tt0000003", title_record("tt0000002", "Original", &[])),
        );
        let catalog = resolver(mock, dir.path());
        let ids: BTreeSet<CatalogId> = [CatalogId::from(2), CatalogId::from(3)].into();

        let resolved = catalog.resolve_redirects(&ids).await.unwrap();
        assert_eq!(resolved, [CatalogId::from(2)].into());
    }
}
