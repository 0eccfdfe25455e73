// Secondary book catalog scraper: rendered detail page → description, ISBN
// pair, work id and title. Results and missing-ISBN outcomes are cached per URL.

use std::sync::{Arc, LazyLock};

use recall_common::Isbn;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ResolveError, Result};
use crate::retry::RetryPolicy;
use crate::store::Cache;
use crate::traits::PageRenderer;

static ISBN10_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]{10}$").expect("valid regex"));
static ISBN13_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]{13}$").expect("valid regex"));

static DESCRIPTION_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div#descriptionContainer").expect("valid selector"));
static SPAN_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("span").expect("valid selector"));
static INFO_ROW_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.clearFloats").expect("valid selector"));
static ROW_TITLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.infoBoxRowTitle").expect("valid selector"));
static ROW_ITEM_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.infoBoxRowItem").expect("valid selector"));
static ISBN_SPAN_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"span[itemprop="isbn"]"#).expect("valid selector"));
static TITLE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1#bookTitle").expect("valid selector"));
static EDITIONS_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.otherEditionsActions").expect("valid selector"));
static ANCHOR_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").expect("valid selector"));

/// Fields scraped from one book detail page. Both ISBNs are always present;
/// a page without them is reported as not found instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapedBook {
    /// Empty when the page has no description block.
    pub description: String,
    pub isbn10: Isbn,
    pub isbn13: Isbn,
    pub work_id: Option<String>,
    pub title: Option<String>,
}

pub struct BookshelfScraper {
    renderer: Arc<dyn PageRenderer>,
    cache: Cache,
    retry: RetryPolicy,
}

impl BookshelfScraper {
    pub fn new(renderer: Arc<dyn PageRenderer>, cache: Cache, retry: RetryPolicy) -> Self {
        Self {
            renderer,
            cache,
            retry,
        }
    }

    pub async fn scrape(&self, url: &str) -> Result<ScrapedBook> {
        if let Some(reason) = self.cache.failure(url)? {
            debug!(url, "bookshelf: cached failure");
            return Err(ResolveError::NotFound(reason));
        }
        if let Some(book) = self.cache.get::<ScrapedBook>(url)? {
            debug!(url, "bookshelf: cache hit");
            return Ok(book);
        }

        info!(url, "bookshelf: scraping");
        let html = self
            .retry
            .run("bookshelf render", || self.renderer.render(url))
            .await?;

        match parse_book_page(&html, url)? {
            Some(book) => {
                self.cache.put(url, &book)?;
                Ok(book)
            }
            None => {
                let reason = format!("Unable to find either ISBN10 or ISBN13 for: {url}");
                self.cache.record_failure(url, &reason)?;
                Err(ResolveError::NotFound(reason))
            }
        }
    }
}

/// Parse a rendered detail page. `Ok(None)` when either ISBN is missing;
/// markup that breaks the expected structure is `Corrupt`.
pub fn parse_book_page(html: &str, url: &str) -> Result<Option<ScrapedBook>> {
    let document = Html::parse_document(html);

    let description = document
        .select(&DESCRIPTION_SELECTOR)
        .next()
        .and_then(|container| container.select(&SPAN_SELECTOR).next())
        .map(element_text)
        .unwrap_or_default();

    let (isbn10, isbn13) = match isbn_row(&document) {
        Some(row) => parse_isbn_row(row, url)?,
        None => (None, None),
    };
    let (Some(isbn10), Some(isbn13)) = (isbn10, isbn13) else {
        return Ok(None);
    };

    let title = document
        .select(&TITLE_SELECTOR)
        .next()
        .map(|h1| element_text(h1).trim().to_string());

    let mut work_id = None;
    if let Some(editions) = document.select(&EDITIONS_SELECTOR).next() {
        for link in editions.select(&ANCHOR_SELECTOR) {
            let href = link
                .value()
                .attr("href")
                .ok_or_else(|| ResolveError::corrupt(url, "editions link without href"))?;
            if href.contains("editions") {
                work_id = href
                    .rsplit("editions/")
                    .next()
                    .and_then(|tail| tail.split('-').next())
                    .map(str::to_string);
            }
        }
    }

    Ok(Some(ScrapedBook {
        description,
        isbn10,
        isbn13,
        work_id,
        title,
    }))
}

/// The item cell of the last info row titled exactly "ISBN".
fn isbn_row(document: &Html) -> Option<ElementRef<'_>> {
    let mut found = None;
    for row in document.select(&INFO_ROW_SELECTOR) {
        if !element_text(row).contains("ISBN") {
            continue;
        }
        let Some(title) = row.select(&ROW_TITLE_SELECTOR).next() else {
            continue;
        };
        if element_text(title).trim() == "ISBN" {
            found = row.select(&ROW_ITEM_SELECTOR).next();
        }
    }
    found
}

fn parse_isbn_row(row: ElementRef<'_>, url: &str) -> Result<(Option<Isbn>, Option<Isbn>)> {
    let mut isbn10 = None;
    let mut isbn13 = None;
    for child in row.children() {
        match child.value() {
            Node::Text(text) => {
                let text = text.trim();
                if ISBN10_RE.is_match(text) {
                    isbn10 = Isbn::isbn10(text);
                }
            }
            Node::Element(element) => {
                if element.attr("class").is_none() {
                    return Err(ResolveError::corrupt(
                        url,
                        format!("unclassed <{}> in ISBN row", element.name()),
                    ));
                }
                let classes: Vec<&str> = element.classes().collect();
                if classes != ["greyText"] {
                    continue;
                }
                let isbn_span = ElementRef::wrap(child)
                    .and_then(|grey| grey.select(&ISBN_SPAN_SELECTOR).next())
                    .map(element_text);
                if let Some(candidate) = isbn_span {
                    let candidate = candidate.trim();
                    if ISBN13_RE.is_match(candidate) {
                        isbn13 = Isbn::isbn13(candidate);
                    }
                }
            }
            _ => {}
        }
    }
    Ok((isbn10, isbn13))
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockRenderer;

    const URL: &str = "https://www.goodreads.com/book/show/5907.The_Hobbit";

    fn book_page(isbn_row: &str) -> String {
        format!(
            r#"<html><body>
            <h1 id="bookTitle">
                The Hobbit
            </h1>
            <div id="descriptionContainer"><div><span>In a hole in the ground there lived a hobbit.</span></div></div>
            <div class="clearFloats">
                <div class="infoBoxRowTitle">Original Title</div>
                <div class="infoBoxRowItem">The Hobbit, or There and Back Again</div>
            </div>
            <div class="clearFloats">
                <div class="infoBoxRowTitle">ISBN</div>
                <div class="infoBoxRowItem">{isbn_row}</div>
            </div>
            <div class="otherEditionsActions">
                <a href="/work/editions/1540236-the-hobbit">All Editions</a>
                <a href="/book/add">Add a New Edition</a>
            </div>
            </body></html>"#
        )
    }

    const GOOD_ROW: &str = r#"
        0618260307
        <span class="greyText">(ISBN13: <span itemprop="isbn">9780618260300</span>)</span>
    "#;

    #[test]
    fn full_page_parses() {
        let book = parse_book_page(&book_page(GOOD_ROW), URL).unwrap().unwrap();
        assert_eq!(book.isbn10.as_str(), "0618260307");
        assert_eq!(book.isbn13.as_str(), "9780618260300");
        assert_eq!(book.title.as_deref(), Some("The Hobbit"));
        assert_eq!(book.work_id.as_deref(), Some("1540236"));
        assert_eq!(book.description, "In a hole in the ground there lived a hobbit.");
    }

    #[test]
    fn missing_description_is_empty_not_failure() {
        let html = book_page(GOOD_ROW).replace("descriptionContainer", "somethingElse");
        let book = parse_book_page(&html, URL).unwrap().unwrap();
        assert_eq!(book.description, "");
    }

    #[test]
    fn missing_isbn13_is_none() {
        let book = parse_book_page(&book_page("0618260307"), URL).unwrap();
        assert!(book.is_none());
    }

    #[test]
    fn unclassed_element_in_isbn_row_is_corrupt() {
        let row = r#"0618260307 <span>(ISBN13: <span itemprop="isbn">9780618260300</span>)</span>"#;
        let err = parse_book_page(&book_page(row), URL).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Corrupt);
    }

    #[test]
    fn editions_link_without_href_is_corrupt() {
        let html = book_page(GOOD_ROW).replace(r#"<a href="/book/add">"#, "<a>");
        assert!(parse_book_page(&html, URL).is_err());
    }

    #[tokio::test]
    async fn scrape_caches_success_and_failure() {
        let dir = tempfile::tempdir().unwrap();
        let bare = "https://www.goodreads.com/book/show/1.No_Isbn";
        let renderer = Arc::new(
            MockRenderer::new()
                .on_page(URL, &book_page(GOOD_ROW))
                .on_page(bare, &book_page("")),
        );
        let scraper = BookshelfScraper::new(
            renderer.clone(),
            Cache::open(dir.path()).unwrap(),
            RetryPolicy::none(),
        );

        let first = scraper.scrape(URL).await.unwrap();
        let second = scraper.scrape(URL).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(renderer.calls(), 1);

        let err = scraper.scrape(bare).await.unwrap_err();
        assert_eq!(err.to_string(), format!("Unable to find either ISBN10 or ISBN13 for: {bare}"));
        let again = scraper.scrape(bare).await.unwrap_err();
        assert_eq!(again.to_string(), err.to_string());
        assert_eq!(renderer.calls(), 2);
    }
}
