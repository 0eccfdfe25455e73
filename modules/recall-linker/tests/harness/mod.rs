//! Shared fixtures for the linker integration tests.
//!
//! Every world owns a temp directory holding its caches and outputs, plus
//! counting mocks for each external service. `linker()` builds fresh
//! resolvers over the same caches, which is what a second process run sees.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use recall_archive::testing::{
    entity_with_claims, title_record, MockCatalog, MockKnowledgeGraph, MockRenderer,
};
use recall_archive::{
    BookshelfScraper, Caches, CatalogResolver, KnowledgeGraphResolver, RetryPolicy, WorkIndex,
};
use recall_common::{RawMention, Reply, Thread};
use recall_linker::{BookLinker, MovieLinker};
use tempfile::TempDir;
use wikimedia_client::{Entity, Sitelink};

pub const MATRIX_CATALOG_URL: &str = "https://www.imdb.com/title/tt0133093/";
pub const MATRIX_WIKI_URL: &str = "https://en.wikipedia.org/wiki/The_Matrix";
pub const REMAKE_CATALOG_URL: &str = "https://www.imdb.com/title/tt9999999/";
pub const REMAKE_WIKI_URL: &str = "https://en.wikipedia.org/wiki/The_Matrix_(2031_film)";

pub const HOBBIT_SHELF_URL: &str = "https://www.goodreads.com/book/show/5907.The_Hobbit";
pub const HOBBIT_WIKI_URL: &str = "https://en.wikipedia.org/wiki/The_Hobbit";
pub const OMNIBUS_WIKI_URL: &str = "https://en.wikipedia.org/wiki/Tolkien_Omnibus";

pub fn with_sitelink(mut entity: Entity, url: &str) -> Entity {
    entity.sitelinks.insert(
        "enwiki".to_string(),
        Sitelink {
            site: "enwiki".to_string(),
            title: entity.id.clone(),
            url: Some(url.to_string()),
        },
    );
    entity
}

// ---------------------------------------------------------------------------
// Movies
// ---------------------------------------------------------------------------

/// The Matrix, its sequel (a title-search namesake), and a same-titled remake
/// whose only encyclopedia page never verifies.
pub fn matrix_catalog() -> MockCatalog {
    MockCatalog::new()
        .on_title(title_record("tt0133093", "The Matrix", &["A hacker learns the truth."]))
        .on_title(title_record("tt9999999", "The Matrix", &["A remake nobody asked for."]))
}

pub fn matrix_graph() -> MockKnowledgeGraph {
    MockKnowledgeGraph::new()
        .on_opensearch(
            "The Matrix",
            &[
                ("The Matrix", MATRIX_WIKI_URL),
                ("The Matrix Reloaded", "https://en.wikipedia.org/wiki/The_Matrix_Reloaded"),
            ],
        )
        .on_title("The Matrix", &[("The Matrix", "Q83495")])
        .on_title("The Matrix Reloaded", &[("The Matrix Reloaded", "Q189600")])
        .on_title("The_Matrix_(2031_film)", &[("The Matrix (2031 film)", "Q999")])
        .on_entity(with_sitelink(
            entity_with_claims("Q83495", &[("P345", &["tt0133093"])]),
            MATRIX_WIKI_URL,
        ))
        .on_entity(entity_with_claims("Q189600", &[("P345", &["tt0234215"])]))
        .on_entity(with_sitelink(
            entity_with_claims("Q999", &[("P345", &["tt9999999"])]),
            REMAKE_WIKI_URL,
        ))
        .on_page("The Matrix", "Intro.\n== Plot ==\nNeo wakes up in a pod.\n== Cast ==\nKeanu.")
}

pub struct MovieWorld {
    pub dir: TempDir,
    pub catalog: Arc<MockCatalog>,
    pub graph: Arc<MockKnowledgeGraph>,
}

impl MovieWorld {
    pub fn new(catalog: MockCatalog, graph: MockKnowledgeGraph) -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
            catalog: Arc::new(catalog),
            graph: Arc::new(graph),
        }
    }

    pub fn matrix() -> Self {
        Self::new(matrix_catalog(), matrix_graph())
    }

    pub fn linker(&self) -> MovieLinker {
        let caches = Caches::open(&self.dir.path().join("cache")).unwrap();
        let catalog = CatalogResolver::new(self.catalog.clone(), caches.catalog.clone(), RetryPolicy::none());
        let kg = KnowledgeGraphResolver::new(self.graph.clone(), &caches, RetryPolicy::none(), 10, "en");
        MovieLinker::new(catalog, kg, None)
    }

    pub fn external_calls(&self) -> u32 {
        self.catalog.calls() + self.graph.calls()
    }

    pub fn out_dir(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

// ---------------------------------------------------------------------------
// Books
// ---------------------------------------------------------------------------

pub const HOBBIT_PAGE: &str = r#"<html><body>
    <h1 id="bookTitle">The Hobbit</h1>
    <div id="descriptionContainer"><span>In a hole in the ground there lived a hobbit.</span></div>
    <div class="clearFloats">
        <div class="infoBoxRowTitle">ISBN</div>
        <div class="infoBoxRowItem">
            0618260307
            <span class="greyText">(ISBN13: <span itemprop="isbn">9780618260300</span>)</span>
        </div>
    </div>
    <div class="otherEditionsActions">
        <a href="/work/editions/1540236-the-hobbit">All Editions</a>
    </div>
</body></html>"#;

pub const WORKS: &str = r#"{"work_id": "1540236", "original_title": "The Hobbit, or There and Back Again"}
"#;
pub const BOOKS: &str = r#"{"book_id": "5907", "work_id": "1540236", "isbn": "0618260307", "isbn13": "9780618260300"}
"#;

pub fn hobbit_graph() -> MockKnowledgeGraph {
    MockKnowledgeGraph::new()
        .on_title("The_Hobbit", &[("The Hobbit", "Q74287")])
        .on_title("Tolkien_Omnibus", &[("Tolkien Omnibus", "Q5")])
        .on_entity(entity_with_claims(
            "Q74287",
            &[("P957", &["0-618-26030-7"]), ("P212", &["978-0-618-26030-0"])],
        ))
        .on_entity(entity_with_claims(
            "Q5",
            &[("P957", &["0261102214", "0007525508"]), ("P212", &["9780261102217"])],
        ))
        .on_page("The Hobbit", "== Plot ==\nBilbo leaves the Shire.\n== Themes ==\nx")
}

pub struct BookWorld {
    pub dir: TempDir,
    pub renderer: Arc<MockRenderer>,
    pub graph: Arc<MockKnowledgeGraph>,
}

impl BookWorld {
    pub fn hobbit() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
            renderer: Arc::new(MockRenderer::new().on_page(HOBBIT_SHELF_URL, HOBBIT_PAGE)),
            graph: Arc::new(hobbit_graph()),
        }
    }

    fn caches(&self) -> Caches {
        Caches::open(&self.dir.path().join("cache")).unwrap()
    }

    pub fn linker(&self) -> BookLinker {
        self.linker_with(None)
    }

    /// Linker backed by a one-work offline corpus.
    pub fn linker_with_works(&self) -> BookLinker {
        let corpus = self.dir.path().join("corpus");
        std::fs::create_dir_all(&corpus).unwrap();
        std::fs::write(corpus.join(recall_archive::works::WORKS_FILE), WORKS).unwrap();
        std::fs::write(corpus.join(recall_archive::works::BOOKS_FILE), BOOKS).unwrap();
        let index = WorkIndex::open(&corpus, &self.caches().bookgraph).unwrap();
        self.linker_with(Some(index))
    }

    fn linker_with(&self, works: Option<WorkIndex>) -> BookLinker {
        let caches = self.caches();
        let scraper = BookshelfScraper::new(self.renderer.clone(), caches.bookshelf.clone(), RetryPolicy::none());
        let kg = KnowledgeGraphResolver::new(self.graph.clone(), &caches, RetryPolicy::none(), 10, "en");
        BookLinker::new(scraper, kg, works)
    }
}

// ---------------------------------------------------------------------------
// Threads
// ---------------------------------------------------------------------------

pub fn mention(text: &str) -> RawMention {
    RawMention {
        text: text.to_string(),
        author_id: Some("helper".to_string()),
        reply_id: "r1".to_string(),
        is_original_poster: false,
    }
}

pub fn reply(id: &str, author: &str, body: &str, replies: Vec<Reply>) -> Reply {
    Reply {
        id: id.to_string(),
        body: body.to_string(),
        author_name: Some(author.to_string()),
        accepted: false,
        replies,
    }
}

/// A thread answered by `answer`, which the originator confirms as solved.
/// A second, unrelated branch carries `aside`.
pub fn solved_thread(id: &str, answer: &str, aside: &str) -> Thread {
    Thread {
        id: id.to_string(),
        author: Some("op".to_string()),
        title: Some("[TOMT][Movie] guy wakes up in a pod".to_string()),
        replies: vec![
            reply(
                "a",
                "helper",
                answer,
                vec![reply("b", "op", &format!("Solved! {MATRIX_CATALOG_URL} was it"), vec![])],
            ),
            reply("c", "other", aside, vec![]),
        ],
    }
}
