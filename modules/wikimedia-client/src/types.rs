use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Wikidata entities
// ---------------------------------------------------------------------------

/// A knowledge-graph entity as returned by `wbgetentities`.
///
/// Maps are ordered so that a serialized entity is byte-stable no matter
/// whether it came from the network or from a cache file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    #[serde(default)]
    pub labels: BTreeMap<String, LanguageValue>,
    #[serde(default)]
    pub claims: BTreeMap<String, Vec<Statement>>,
    #[serde(default)]
    pub sitelinks: BTreeMap<String, Sitelink>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageValue {
    pub language: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub mainsnak: Snak,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snak {
    /// `value`, `novalue` or `somevalue`.
    pub snaktype: String,
    #[serde(default)]
    pub property: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datavalue: Option<DataValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataValue {
    pub value: serde_json::Value,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sitelink {
    pub site: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Entity {
    pub fn label(&self, language: &str) -> Option<&str> {
        self.labels.get(language).map(|l| l.value.as_str())
    }

    /// All statements for a property, or `None` when the entity has no claim for it.
    pub fn statements(&self, property: &str) -> Option<&[Statement]> {
        self.claims.get(property).map(Vec::as_slice)
    }

    /// Site-link URL for a wiki site key such as `enwiki`.
    pub fn sitelink_url(&self, site: &str) -> Option<&str> {
        self.sitelinks.get(site).and_then(|s| s.url.as_deref())
    }
}

impl Snak {
    pub fn has_value(&self) -> bool {
        self.snaktype == "value" && self.datavalue.is_some()
    }

    /// The snak's value when it is a plain string (external ids, ISBNs).
    pub fn string_value(&self) -> Option<&str> {
        if self.snaktype != "value" {
            return None;
        }
        self.datavalue.as_ref().and_then(|d| d.value.as_str())
    }
}

// ---------------------------------------------------------------------------
// Wikipedia pages
// ---------------------------------------------------------------------------

/// A page whose page properties link it to a knowledge-graph entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMatch {
    /// The title after normalization and redirect resolution.
    pub title: String,
    pub entity_id: String,
}

/// One opensearch hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
}

/// Plain-text extract of a page, section headings kept as `== Heading ==` lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageExtract {
    pub page_id: u64,
    pub title: String,
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageText {
    Found(PageExtract),
    Missing,
    Disambiguation,
}

// ---------------------------------------------------------------------------
// Raw API responses (formatversion=2)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct QueryResponse {
    pub query: Option<QueryBody>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QueryBody {
    #[serde(default)]
    pub pages: Vec<RawPage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawPage {
    pub pageid: Option<u64>,
    pub title: String,
    #[serde(default)]
    pub missing: bool,
    #[serde(default)]
    pub invalid: bool,
    pub extract: Option<String>,
    pub pageprops: Option<BTreeMap<String, serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EntitiesResponse {
    #[serde(default)]
    pub entities: BTreeMap<String, serde_json::Value>,
}
