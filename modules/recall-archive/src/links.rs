use std::collections::BTreeSet;
use std::sync::LazyLock;

use recall_common::CatalogId;
use regex::Regex;

/// Scheme-qualified or `www.` URLs, plus bare `host.tld/path` forms for the
/// handful of top-level domains that show up in replies.
static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)(?:https?://|www\.)[^\s<>"'`\[\]{}|\\^]+|\b(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)+(?:com|org|net|edu|gov|io|co|uk|ca|de|fr|tv|me|info)\b(?:/[^\s<>"'`\[\]{}|\\^]*)?"#,
    )
    .expect("valid regex")
});

/// Markdown escapes inside link text and targets (`\_`, `\(`, ...).
static MARKDOWN_ESCAPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\([_()*\[\]~])").expect("valid regex"));

static CATALOG_SEGMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^tt[0-9]+").expect("valid regex"));

const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', '*', '\'', '"', '>'];

/// Find every URL in free text. Schemeless matches get `https://`.
/// The set is ordered so that resolution order is reproducible.
pub fn find_urls(text: &str) -> BTreeSet<String> {
    let text = MARKDOWN_ESCAPE_RE.replace_all(text, "$1");
    URL_RE
        .find_iter(&text)
        .filter_map(|m| {
            let trimmed = trim_url(m.as_str());
            if trimmed.is_empty() {
                return None;
            }
            let lower = trimmed.to_ascii_lowercase();
            if lower.starts_with("http://") || lower.starts_with("https://") {
                Some(trimmed.to_string())
            } else {
                Some(format!("https://{trimmed}"))
            }
        })
        .collect()
}

/// Strip trailing punctuation and any closing parenthesis that has no
/// opening partner inside the URL (`(see imdb.com/title/tt1)`).
fn trim_url(raw: &str) -> &str {
    let mut url = raw;
    loop {
        let before = url.len();
        url = url.trim_end_matches(TRAILING_PUNCTUATION);
        if url.ends_with(')') && url.matches(')').count() > url.matches('(').count() {
            url = &url[..url.len() - 1];
        }
        if url.len() == before {
            return url;
        }
    }
}

/// Keep the URLs whose host contains `source_token` (case-insensitive).
pub fn classify<'a, I>(urls: I, source_token: &str) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a String>,
{
    let token = source_token.to_ascii_lowercase();
    urls.into_iter()
        .filter(|u| {
            url::Url::parse(u)
                .ok()
                .and_then(|parsed| parsed.host_str().map(|h| h.to_ascii_lowercase().contains(&token)))
                .unwrap_or(false)
        })
        .cloned()
        .collect()
}

/// Catalog title ids from every `tt<digits>` path segment.
pub fn extract_catalog_ids<'a, I>(urls: I) -> BTreeSet<CatalogId>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut ids = BTreeSet::new();
    for raw in urls {
        let Ok(parsed) = url::Url::parse(raw) else {
            continue;
        };
        let Some(segments) = parsed.path_segments() else {
            continue;
        };
        for segment in segments {
            if let Some(m) = CATALOG_SEGMENT_RE.find(segment) {
                if let Ok(id) = CatalogId::parse(m.as_str()) {
                    ids.insert(id);
                }
            }
        }
    }
    ids
}

/// Encyclopedia page titles: the last non-empty path segment, percent-decoded.
pub fn extract_page_titles<'a, I>(urls: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a String>,
{
    urls.into_iter().filter_map(|u| page_title(u)).collect()
}

pub fn page_title(raw: &str) -> Option<String> {
    let parsed = url::Url::parse(raw).ok()?;
    let last = parsed.path_segments()?.filter(|s| !s.is_empty()).last()?;
    let decoded = urlencoding::decode(last)
        .map(|d| d.into_owned())
        .unwrap_or_else(|_| last.to_string());
    (!decoded.is_empty()).then_some(decoded)
}
