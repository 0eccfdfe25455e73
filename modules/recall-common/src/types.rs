use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::RecallError;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

static PREFIXED_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z]{2})([0-9]+)$").expect("valid regex"));
static BARE_ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]+$").expect("valid regex"));

/// Prefix the catalog uses for titles (as opposed to people, companies, ...).
pub const TITLE_PREFIX: &str = "tt";
/// The catalog zero-pads numeric parts to this width.
const CATALOG_ID_DIGITS: usize = 7;

/// Normalized primary-catalog id: lowercase two-letter prefix followed by the
/// numeric part zero-padded to seven digits (`tt0133093`).
///
/// `133093`, `"133093"`, `"tt133093"` and `"TT0133093"` all normalize to the
/// same value, so equality and hashing only ever see the normalized form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CatalogId(String);

impl CatalogId {
    pub fn from_number(number: u64) -> Self {
        Self::normalized(TITLE_PREFIX, &number.to_string())
    }

    pub fn parse(raw: &str) -> Result<Self, RecallError> {
        let raw = raw.trim();
        if let Some(caps) = PREFIXED_ID_RE.captures(raw) {
            return Ok(Self::normalized(&caps[1].to_lowercase(), &caps[2]));
        }
        if BARE_ID_RE.is_match(raw) {
            return Ok(Self::normalized(TITLE_PREFIX, raw));
        }
        Err(RecallError::InvalidCatalogId(raw.to_string()))
    }

    fn normalized(prefix: &str, digits: &str) -> Self {
        let significant = digits.trim_start_matches('0');
        let significant = if significant.is_empty() { "0" } else { significant };
        Self(format!(
            "{prefix}{significant:0>width$}",
            width = CATALOG_ID_DIGITS
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn prefix(&self) -> &str {
        &self.0[..2]
    }

    /// True for title ids (`tt...`), false for people, characters etc.
    pub fn is_title(&self) -> bool {
        self.prefix() == TITLE_PREFIX
    }
}

impl FromStr for CatalogId {
    type Err = RecallError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<u64> for CatalogId {
    fn from(number: u64) -> Self {
        Self::from_number(number)
    }
}

impl TryFrom<String> for CatalogId {
    type Error = RecallError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CatalogId> for String {
    fn from(id: CatalogId) -> Self {
        id.0
    }
}

impl fmt::Display for CatalogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Strip everything but digits from an ISBN. A trailing `X` check character
/// (ISBN-10) is kept, uppercased. Idempotent.
pub fn format_isbn(raw: &str) -> String {
    let trimmed = raw.trim();
    let mut out: String = trimmed.chars().filter(char::is_ascii_digit).collect();
    if trimmed.ends_with(['x', 'X']) && out.len() == 9 {
        out.push('X');
    }
    out
}

/// Standardized book identifier: ten characters (nine digits and a digit or
/// `X` check character) or thirteen digits, after [`format_isbn`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Isbn(String);

impl Isbn {
    /// Either form. `None` unless the formatted value is a well-formed
    /// ISBN-10 or ISBN-13.
    pub fn new(raw: &str) -> Option<Self> {
        Self::isbn13(raw).or_else(|| Self::isbn10(raw))
    }

    pub fn isbn10(raw: &str) -> Option<Self> {
        let formatted = format_isbn(raw);
        let (body, check) = formatted.split_at(formatted.len().min(9));
        let valid = body.len() == 9
            && body.bytes().all(|b| b.is_ascii_digit())
            && matches!(check.as_bytes(), [b'0'..=b'9' | b'X']);
        valid.then_some(Self(formatted))
    }

    pub fn isbn13(raw: &str) -> Option<Self> {
        let formatted = format_isbn(raw);
        let valid = formatted.len() == 13 && formatted.bytes().all(|b| b.is_ascii_digit());
        valid.then_some(Self(formatted))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_isbn10(&self) -> bool {
        self.0.len() == 10
    }

    pub fn is_isbn13(&self) -> bool {
        self.0.len() == 13
    }
}

impl TryFrom<String> for Isbn {
    type Error = RecallError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::new(&raw).ok_or(RecallError::InvalidIsbn(raw))
    }
}

impl From<Isbn> for String {
    fn from(isbn: Isbn) -> Self {
        isbn.0
    }
}

impl fmt::Display for Isbn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Candidates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieCandidate {
    pub catalog_id: CatalogId,
    pub kg_title: Option<String>,
    pub kg_url: Option<String>,
    pub plot: Option<String>,
    /// The full knowledge-graph entity, when the candidate came through one.
    pub kg_record: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookCandidate {
    pub isbn10: Option<Isbn>,
    pub isbn13: Option<Isbn>,
    pub work_id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CandidateEntity {
    Movie(MovieCandidate),
    Book(BookCandidate),
}

impl CandidateEntity {
    pub fn title(&self) -> Option<&str> {
        match self {
            CandidateEntity::Movie(m) => m.kg_title.as_deref(),
            CandidateEntity::Book(b) => b.title.as_deref(),
        }
    }
}

// ---------------------------------------------------------------------------
// Resolution results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// A primary movie-catalog link.
    Catalog,
    /// An encyclopedia link resolved through the knowledge graph.
    KnowledgeGraph,
    /// A secondary book-catalog link resolved by scraping.
    Bookshelf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub kind: SourceKind,
    pub primary_url: Option<String>,
    pub kg_url: Option<String>,
}

impl Source {
    pub fn catalog(url: &str) -> Self {
        Self {
            kind: SourceKind::Catalog,
            primary_url: Some(url.to_string()),
            kg_url: None,
        }
    }

    pub fn knowledge_graph(url: &str) -> Self {
        Self {
            kind: SourceKind::KnowledgeGraph,
            primary_url: None,
            kg_url: Some(url.to_string()),
        }
    }

    pub fn bookshelf(url: &str) -> Self {
        Self {
            kind: SourceKind::Bookshelf,
            primary_url: Some(url.to_string()),
            kg_url: None,
        }
    }

    pub fn with_kg_url(mut self, url: Option<String>) -> Self {
        if url.is_some() {
            self.kg_url = url;
        }
        self
    }
}

/// Reason recorded when a caller builds an unconfident result without one.
const UNSPECIFIED_REASON: &str = "unresolved";

/// Outcome of one resolver call.
///
/// Only constructible through [`ResolutionResult::confident`] and
/// [`ResolutionResult::unconfident`], which keep two invariants: a confident
/// result always carries a candidate, and an unconfident one always carries a
/// non-empty reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawResolutionResult")]
pub struct ResolutionResult {
    #[serde(rename = "entity")]
    candidate: Option<CandidateEntity>,
    reason: String,
    confident: bool,
    source: Source,
}

/// Wire shape of [`ResolutionResult`], checked before it becomes one.
#[derive(Deserialize)]
struct RawResolutionResult {
    #[serde(rename = "entity")]
    candidate: Option<CandidateEntity>,
    #[serde(default)]
    reason: String,
    confident: bool,
    source: Source,
}

impl TryFrom<RawResolutionResult> for ResolutionResult {
    type Error = String;

    fn try_from(raw: RawResolutionResult) -> Result<Self, Self::Error> {
        match (raw.confident, raw.candidate) {
            (true, Some(candidate)) => Ok(Self::confident(candidate, raw.source)),
            (true, None) => Err("confident result without an entity".into()),
            (false, _) if raw.reason.trim().is_empty() => {
                Err("unconfident result without a reason".into())
            }
            (false, candidate) => Ok(Self::unconfident(candidate, raw.source, raw.reason)),
        }
    }
}

impl ResolutionResult {
    pub fn confident(candidate: CandidateEntity, source: Source) -> Self {
        Self {
            candidate: Some(candidate),
            reason: String::new(),
            confident: true,
            source,
        }
    }

    pub fn unconfident(
        candidate: Option<CandidateEntity>,
        source: Source,
        reason: impl Into<String>,
    ) -> Self {
        let mut reason = reason.into();
        if reason.trim().is_empty() {
            reason = UNSPECIFIED_REASON.to_string();
        }
        Self {
            candidate,
            reason,
            confident: false,
            source,
        }
    }

    pub fn candidate(&self) -> Option<&CandidateEntity> {
        self.candidate.as_ref()
    }

    pub fn into_candidate(self) -> Option<CandidateEntity> {
        self.candidate
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn is_confident(&self) -> bool {
        self.confident
    }

    pub fn source(&self) -> &Source {
        &self.source
    }
}

// ---------------------------------------------------------------------------
// Mentions and per-thread outputs
// ---------------------------------------------------------------------------

/// One reply's text, produced while walking a thread and consumed immediately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMention {
    pub text: String,
    pub author_id: Option<String>,
    pub reply_id: String,
    pub is_original_poster: bool,
}

/// One row of a ground-truth output file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedMention {
    #[serde(flatten)]
    pub result: ResolutionResult,
    #[serde(rename = "uttrance")]
    pub utterance: RawMention,
}

/// Contents of a negative-candidate output file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NegativeSet {
    pub negatives: Vec<CandidateEntity>,
}
