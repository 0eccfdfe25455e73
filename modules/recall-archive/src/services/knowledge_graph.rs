// Knowledge-graph resolver: titles → entities, typed claims, section text and
// two-way cross-verification against the primary catalog.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::LazyLock;

use recall_common::{CatalogId, Isbn, TITLE_PREFIX};
use regex::Regex;
use tracing::{debug, info};
use wikimedia_client::{Entity, PageExtract, PageMatch, PageText, SearchHit, Snak, Statement};

use crate::error::{ErrorKind, ResolveError, Result};
use crate::retry::RetryPolicy;
use crate::services::catalog::{CatalogRecord, CatalogResolver};
use crate::store::{Cache, Caches};
use crate::traits::KnowledgeGraph;

/// Section headings tried, in order, for a plot or description.
pub const PLOT_SECTIONS: &[&str] = &["Plot", "Plot summary"];

/// Claim holding the primary catalog's id.
const CATALOG_ID_PROP: &str = "P345";
const ISBN10_PROP: &str = "P957";
const ISBN13_PROP: &str = "P212";

const PAGE_RETRY_REASON: &str = "Page failed, try again";

static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(={2,})\s*(.*?)\s*={2,}\s*$").expect("valid regex"));

/// An encyclopedia page whose entity points back at the probed catalog id.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedHit {
    pub title: String,
    pub url: String,
    pub entity: Entity,
}

pub struct KnowledgeGraphResolver {
    graph: Arc<dyn KnowledgeGraph>,
    entities: Cache,
    pages: Cache,
    search: Cache,
    retry: RetryPolicy,
    search_limit: u32,
    language: String,
}

impl KnowledgeGraphResolver {
    pub fn new(
        graph: Arc<dyn KnowledgeGraph>,
        caches: &Caches,
        retry: RetryPolicy,
        search_limit: u32,
        language: &str,
    ) -> Self {
        Self {
            graph,
            entities: caches.entities.clone(),
            pages: caches.pages.clone(),
            search: caches.search.clone(),
            retry,
            search_limit,
            language: language.to_string(),
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Page title → entity ids. `None` when no page matches at all.
    pub async fn search_titles(&self, title: &str) -> Result<Option<Vec<PageMatch>>> {
        let key = format!("titles_{title}");
        if let Some(cached) = self.search.get::<Option<Vec<PageMatch>>>(&key)? {
            return Ok(cached);
        }

        debug!(title, "kg: resolving title");
        let matches = self
            .retry
            .run("title lookup", || self.graph.entity_ids_for_title(title))
            .await?;
        self.search.put(&key, &matches)?;
        Ok(matches)
    }

    async fn opensearch(&self, query: &str) -> Result<Vec<SearchHit>> {
        let key = format!("opensearch_{}_{query}", self.search_limit);
        if let Some(cached) = self.search.get::<Vec<SearchHit>>(&key)? {
            return Ok(cached);
        }

        debug!(query, limit = self.search_limit, "kg: opensearch");
        let hits = self
            .retry
            .run("opensearch", || self.graph.opensearch(query, self.search_limit))
            .await?;
        self.search.put(&key, &hits)?;
        Ok(hits)
    }

    pub async fn get_entity(&self, entity_id: &str) -> Result<Entity> {
        if let Some(reason) = self.entities.failure(entity_id)? {
            return Err(ResolveError::NotFound(reason));
        }
        if let Some(cached) = self.entities.get::<Entity>(entity_id)? {
            return Ok(cached);
        }

        info!(entity_id, "kg: fetching entity");
        let fetched = self
            .retry
            .run("entity fetch", || self.graph.entity(entity_id, &self.language))
            .await?;

        match fetched {
            Some(entity) => {
                self.entities.put(entity_id, &entity)?;
                Ok(entity)
            }
            None => {
                let reason = format!("Entity {entity_id} not found");
                self.entities.record_failure(entity_id, &reason)?;
                Err(ResolveError::NotFound(reason))
            }
        }
    }

    /// The entity's ISBN-10 and ISBN-13. Each claim must hold exactly one
    /// value of the right length.
    pub fn get_standard_ids(entity: &Entity) -> Result<(Isbn, Isbn)> {
        let isbn10 = single_value(entity, ISBN10_PROP)?;
        let isbn13 = single_value(entity, ISBN13_PROP)?;
        match (Isbn::isbn10(&isbn10), Isbn::isbn13(&isbn13)) {
            (Some(a), Some(b)) => Ok((a, b)),
            _ => Err(ResolveError::NotFound(format!(
                "Unusable ISBN values on {}: {isbn10:?} / {isbn13:?}",
                entity.id
            ))),
        }
    }

    /// The catalog id an entity cross-references.
    ///
    /// Several values are narrowed to title ids and collapsed through the
    /// catalog's redirects; more than one survivor is `Ambiguous`.
    pub async fn get_cross_reference_id(
        &self,
        entity: &Entity,
        catalog: &CatalogResolver,
    ) -> Result<CatalogId> {
        let statements = entity.statements(CATALOG_ID_PROP).ok_or_else(|| {
            ResolveError::NotFound("Doesn't have catalog id property".to_string())
        })?;

        match statements {
            [] => Err(ResolveError::NotFound(format!("Empty prop {CATALOG_ID_PROP}"))),
            [only] => {
                let raw = snak_value(&only.mainsnak)?;
                CatalogId::parse(&raw)
                    .map_err(|_| ResolveError::NotFound(format!("Invalid catalog id {raw}")))
            }
            many => {
                let mut ids = BTreeSet::new();
                let mut failures = Vec::new();
                for statement in many {
                    match statement.mainsnak.string_value() {
                        Some(v) if v.starts_with(TITLE_PREFIX) => match CatalogId::parse(v) {
                            Ok(id) => {
                                ids.insert(id);
                            }
                            Err(_) => failures.push(format!("invalid:{v}")),
                        },
                        Some(v) => failures.push(format!("non-title:{v}")),
                        None => failures.push(format!("mainsnak:{}", statement.mainsnak.snaktype)),
                    }
                }
                if ids.is_empty() {
                    return Err(ResolveError::NotFound(format!(
                        "No catalog movie ids found: {}",
                        failures.join("::")
                    )));
                }

                let resolved = catalog.resolve_redirects(&ids).await?;
                if resolved.len() > 1 {
                    return Err(ResolveError::Ambiguous {
                        entity: entity.id.clone(),
                        property: CATALOG_ID_PROP.to_string(),
                        values: resolved.iter().map(|id| id.to_string()).collect(),
                    });
                }
                resolved.into_iter().next().ok_or_else(|| {
                    ResolveError::NotFound("No catalog movie ids found".to_string())
                })
            }
        }
    }

    /// Text of the first section in `sections` present on the page.
    ///
    /// Permanent failures are remembered in the page failure cache. A cached
    /// page that turns out unusable is evicted so a later run refetches it.
    pub async fn get_section_text(&self, page_title: &str, sections: &[&str]) -> Result<String> {
        if let Some(reason) = self.pages.failure(page_title)? {
            return Err(ResolveError::NotFound(reason));
        }

        let page = match self.pages.get::<PageExtract>(page_title) {
            Ok(Some(page)) => page,
            Ok(None) => self.fetch_page(page_title).await?,
            Err(ResolveError::Corrupt { reason, .. }) => {
                debug!(page_title, %reason, "kg: cached page unreadable");
                self.pages.evict(page_title)?;
                return Err(ResolveError::NotFound(PAGE_RETRY_REASON.to_string()));
            }
            Err(e) => return Err(e),
        };

        let Some(text) = page.text.as_deref() else {
            self.pages.evict(page_title)?;
            return Err(ResolveError::NotFound(PAGE_RETRY_REASON.to_string()));
        };

        match extract_section(text, sections) {
            Some(section) => Ok(section),
            None => {
                let reason = format!("no plot found for '{page_title}'");
                self.pages.record_failure(page_title, &reason)?;
                Err(ResolveError::NotFound(reason))
            }
        }
    }

    async fn fetch_page(&self, page_title: &str) -> Result<PageExtract> {
        info!(page_title, "kg: fetching page");
        let fetched = self
            .retry
            .run("page fetch", || self.graph.page_text(page_title))
            .await?;

        let reason = match fetched {
            PageText::Found(page) => {
                self.pages.put(page_title, &page)?;
                return Ok(page);
            }
            PageText::Missing => format!("Page with page ID '{page_title}' not found"),
            PageText::Disambiguation => {
                format!("Page with page ID '{page_title}' not found was unable to be disambiguated")
            }
        };
        self.pages.record_failure(page_title, &reason)?;
        Err(ResolveError::NotFound(reason))
    }

    /// Pages titled like the catalog record whose entities point back at the
    /// same catalog id. Title collisions (remakes, namesakes) are rejected
    /// because their cross-reference id differs.
    pub async fn cross_verify(
        &self,
        primary_id: &CatalogId,
        record: &CatalogRecord,
        catalog: &CatalogResolver,
    ) -> Result<Vec<VerifiedHit>> {
        if record.is_empty() {
            return Err(ResolveError::NotFound(format!(
                "Unable to find catalog id {primary_id}"
            )));
        }
        let probe = record.canonical_id();
        let Some(title) = record.title() else {
            return Err(ResolveError::NotFound(format!(
                "Catalog record {probe} has no title"
            )));
        };

        let mut verified = Vec::new();
        for hit in self.opensearch(title).await? {
            let Some(matches) = self.search_titles(&hit.title).await? else {
                continue;
            };
            for page in matches {
                let entity = match self.get_entity(&page.entity_id).await {
                    Ok(entity) => entity,
                    Err(e) if e.kind() == ErrorKind::NotFound => continue,
                    Err(e) => return Err(e),
                };
                match self.get_cross_reference_id(&entity, catalog).await {
                    Ok(id) if id == probe => verified.push(VerifiedHit {
                        title: hit.title.clone(),
                        url: hit.url.clone(),
                        entity,
                    }),
                    Ok(other) => {
                        debug!(hit = %hit.title, %probe, %other, "kg: title collision rejected");
                    }
                    Err(e) if e.is_recordable() => {
                        debug!(hit = %hit.title, error = %e, "kg: hit has no usable catalog id");
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        if verified.is_empty() {
            return Err(ResolveError::NotFound(format!(
                "Unable to resolve {probe}<>{title}"
            )));
        }
        Ok(verified)
    }

    /// The entity's page URL on the `{lang}wiki` site, percent-decoded.
    pub async fn get_external_url(&self, entity_id: &str, lang: &str) -> Result<Option<String>> {
        let entity = self.get_entity(entity_id).await?;
        Ok(entity.sitelink_url(&format!("{lang}wiki")).map(|url| {
            urlencoding::decode(url)
                .map(|d| d.into_owned())
                .unwrap_or_else(|_| url.to_string())
        }))
    }
}

fn snak_value(snak: &Snak) -> Result<String> {
    snak.string_value()
        .map(str::to_string)
        .ok_or_else(|| ResolveError::NotFound(format!("mainsnak:{}", snak.snaktype)))
}

fn single_value(entity: &Entity, property: &str) -> Result<String> {
    let statements: &[Statement] = entity
        .statements(property)
        .ok_or_else(|| ResolveError::NotFound(format!("prop {property} doesn't exist")))?;
    match statements {
        [] => Err(ResolveError::NotFound(format!("Empty prop {property}"))),
        [only] => snak_value(&only.mainsnak),
        many => Err(ResolveError::Ambiguous {
            entity: entity.id.clone(),
            property: property.to_string(),
            values: many
                .iter()
                .map(|s| {
                    s.mainsnak
                        .string_value()
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("mainsnak:{}", s.mainsnak.snaktype))
                })
                .collect(),
        }),
    }
}

/// Body of the first heading in `names` that exists, up to the next heading
/// of any level. `None` when no heading matches or the body is empty.
pub fn extract_section(text: &str, names: &[&str]) -> Option<String> {
    for name in names {
        let mut lines = text.lines();
        let found = lines.by_ref().any(|line| {
            HEADING_RE
                .captures(line.trim())
                .is_some_and(|c| c[2].eq_ignore_ascii_case(name))
        });
        if !found {
            continue;
        }
        let body: Vec<&str> = lines
            .take_while(|line| !HEADING_RE.is_match(line.trim()))
            .collect();
        let body = body.join("\n").trim().to_string();
        return (!body.is_empty()).then_some(body);
    }
    None
}
